use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use semguard::api;
use semguard::config::ServiceConfig;
use semguard::coordinator::GuardCoordinator;
use semguard::lock_table::ActiveLockTable;
use semguard::qdrant::VectorStoreClient;
use semguard::tracing_setup::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = ServiceConfig::from_env();
    let table = Arc::new(ActiveLockTable::new());
    let store = VectorStoreClient::new(config.store_config())?;
    let coordinator = Arc::new(GuardCoordinator::new(table, store, config.theta));

    let addr = format!("0.0.0.0:{}", config.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(node_id = %config.node_id, %addr, "server listening");

    axum::serve(listener, api::router(coordinator)).await?;
    Ok(())
}
