//! HTTP service façade
//!
//! Three JSON operations: ping, acquire, release. Every reply is HTTP 200;
//! domain failure travels in the payload. The handlers only extract
//! arguments and delegate to the coordinator. Missing request fields
//! deserialize to their empty defaults and are rejected by validation,
//! the same way absent proto3 fields would be.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::coordinator::{GuardCoordinator, GuardDecision, ReleaseOutcome};

#[derive(Debug, Clone, Deserialize)]
pub struct PingRequest {
    #[serde(default)]
    pub from_node: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcquireRequest {
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseRequest {
    #[serde(default)]
    pub agent_id: String,
}

/// Build the service router around a shared coordinator.
pub fn router(coordinator: Arc<GuardCoordinator>) -> Router {
    Router::new()
        .route("/api/ping", post(ping))
        .route("/api/acquire", post(acquire_guard))
        .route("/api/release", post(release_guard))
        .with_state(coordinator)
}

async fn ping(Json(request): Json<PingRequest>) -> Json<PingResponse> {
    Json(PingResponse {
        message: format!("pong to {}", request.from_node),
    })
}

async fn acquire_guard(
    State(coordinator): State<Arc<GuardCoordinator>>,
    Json(request): Json<AcquireRequest>,
) -> Json<GuardDecision> {
    let decision = coordinator
        .acquire_guard(&request.agent_id, &request.embedding)
        .await;
    Json(decision)
}

async fn release_guard(
    State(coordinator): State<Arc<GuardCoordinator>>,
    Json(request): Json<ReleaseRequest>,
) -> Json<ReleaseOutcome> {
    Json(coordinator.release_guard(&request.agent_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ping_echoes_the_caller() {
        let response = ping(Json(PingRequest {
            from_node: "n7".to_string(),
        }))
        .await;
        assert_eq!(response.message, "pong to n7");
    }

    #[tokio::test]
    async fn ping_tolerates_missing_from_node() {
        let request: PingRequest = serde_json::from_str("{}").unwrap();
        let response = ping(Json(request)).await;
        assert_eq!(response.message, "pong to ");
    }

    #[test]
    fn acquire_request_fields_default_to_empty() {
        let request: AcquireRequest = serde_json::from_str("{}").unwrap();
        assert!(request.agent_id.is_empty());
        assert!(request.embedding.is_empty());
    }
}
