//! Service configuration
//!
//! Everything is read once at startup from the environment, with defaults
//! for local runs. Parse helpers are pure functions over the raw values so
//! tests never have to mutate the process environment.

use std::env;
use tracing::info;

use crate::qdrant::VectorStoreConfig;

/// Default admission threshold.
pub const DEFAULT_THETA: f32 = 0.85;

/// Default RPC listen port.
pub const DEFAULT_PORT: u16 = 50051;

/// Process-wide configuration, fixed at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Admission threshold theta in [0, 1].
    pub theta: f32,
    pub qdrant_host: String,
    pub qdrant_port: String,
    pub qdrant_collection: String,
    /// Port the service listens on.
    pub listen_port: u16,
    /// Advisory node identifier, only ever logged.
    pub node_id: String,
}

impl ServiceConfig {
    /// Read configuration from the environment.
    ///
    /// - `THETA`: admission threshold, default 0.85. Unparseable values or
    ///   values outside [0, 1] fall back to the default.
    /// - `QDRANT_HOST` / `QDRANT_PORT` / `QDRANT_COLLECTION`: vector store
    ///   address and collection name.
    /// - `PORT`: listen port, default 50051.
    /// - `NODE_ID`: advisory identifier, default "1".
    pub fn from_env() -> Self {
        let config = Self {
            theta: parse_theta(env::var("THETA").ok().as_deref()),
            qdrant_host: env_or("QDRANT_HOST", "qdrant"),
            qdrant_port: env_or("QDRANT_PORT", "6333"),
            qdrant_collection: env_or("QDRANT_COLLECTION", "dscc_memory"),
            listen_port: parse_port(env::var("PORT").ok().as_deref()),
            node_id: env_or("NODE_ID", "1"),
        };
        info!(
            theta = config.theta,
            qdrant = %format!("{}:{}", config.qdrant_host, config.qdrant_port),
            collection = %config.qdrant_collection,
            node_id = %config.node_id,
            "configuration loaded"
        );
        config
    }

    pub fn store_config(&self) -> VectorStoreConfig {
        VectorStoreConfig::new(
            self.qdrant_host.clone(),
            self.qdrant_port.clone(),
            self.qdrant_collection.clone(),
        )
    }
}

fn env_or(key: &str, fallback: &str) -> String {
    env::var(key).unwrap_or_else(|_| fallback.to_string())
}

fn parse_theta(raw: Option<&str>) -> f32 {
    match raw.and_then(|value| value.trim().parse::<f32>().ok()) {
        Some(theta) if (0.0..=1.0).contains(&theta) => theta,
        _ => DEFAULT_THETA,
    }
}

fn parse_port(raw: Option<&str>) -> u16 {
    raw.and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}
