//! Guard transaction coordinator
//!
//! Runs the compound acquire-and-commit operation: block in the lock
//! table, upsert the embedding to the vector store while the entry is
//! held, then release. The entry is released on every exit path; a grant
//! returned to the caller is advisory ("admitted and persisted"), not a
//! continuing lease. Later collisions in the same semantic region are
//! mediated by the vector store, not by the in-memory table.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::lock_table::ActiveLockTable;
use crate::qdrant::VectorStoreClient;

/// Outcome of an acquire. `granted == false` covers validation failures
/// and store failures alike; the message says which.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardDecision {
    pub granted: bool,
    pub message: String,
}

impl GuardDecision {
    fn granted(message: &str) -> Self {
        Self {
            granted: true,
            message: message.to_string(),
        }
    }

    fn denied(message: &str) -> Self {
        Self {
            granted: false,
            message: message.to_string(),
        }
    }
}

/// Outcome of an explicit release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    pub success: bool,
}

/// Front door for guard operations. Holds the process-wide table, the
/// server-wide theta, and the store client, all fixed at startup.
pub struct GuardCoordinator {
    table: Arc<ActiveLockTable>,
    store: VectorStoreClient,
    theta: f32,
}

impl GuardCoordinator {
    pub fn new(table: Arc<ActiveLockTable>, store: VectorStoreClient, theta: f32) -> Self {
        Self { table, store, theta }
    }

    pub fn table(&self) -> &ActiveLockTable {
        &self.table
    }

    /// Acquire a guard for `agent_id` and commit the embedding.
    ///
    /// Blocks until the embedding overlaps no held entry, then upserts it
    /// to the vector store. The table entry is held across the external
    /// write so no concurrent conflicting agent can be admitted inside the
    /// not-yet-committed window, and released before the reply either way.
    pub async fn acquire_guard(&self, agent_id: &str, embedding: &[f32]) -> GuardDecision {
        if agent_id.is_empty() {
            return GuardDecision::denied("agent_id is required");
        }
        if embedding.is_empty() {
            return GuardDecision::denied("embedding is required");
        }

        info!(agent_id, "attempting acquire");
        self.table.acquire(agent_id, embedding, self.theta).await;
        info!(agent_id, active = self.table.size(), "acquired lock");

        // Armed from admission until the explicit release below, so any
        // early return or panic in the commit path drops the entry.
        let mut guard = ReleaseGuard {
            table: self.table.as_ref(),
            agent_id,
            armed: true,
        };

        match self.store.upsert_point(agent_id, embedding).await {
            Ok(()) => {
                guard.release_once();
                GuardDecision::granted("granted and committed")
            }
            Err(err) => {
                warn!(agent_id, error = %err, "vector store commit failed");
                guard.release_once();
                GuardDecision::denied("qdrant write failed")
            }
        }
    }

    /// Release every entry held by `agent_id`.
    ///
    /// Under the normal acquire path the entry is already gone by the time
    /// the caller gets a reply; this exists for callers that acquire
    /// outside the coordinator and for clients that retry. Idempotent.
    pub fn release_guard(&self, agent_id: &str) -> ReleaseOutcome {
        if agent_id.is_empty() {
            return ReleaseOutcome { success: false };
        }

        self.table.release(agent_id);
        info!(agent_id, active = self.table.size(), "released lock");
        ReleaseOutcome { success: true }
    }
}

/// Releases the table entry exactly once, on drop or on demand.
struct ReleaseGuard<'a> {
    table: &'a ActiveLockTable,
    agent_id: &'a str,
    armed: bool,
}

impl ReleaseGuard<'_> {
    fn release_once(&mut self) {
        if self.armed {
            self.armed = false;
            self.table.release(self.agent_id);
            info!(
                agent_id = self.agent_id,
                active = self.table.size(),
                "released lock"
            );
        }
    }
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        self.release_once();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qdrant::VectorStoreConfig;
    use std::time::Duration;

    /// Coordinator whose store is a closed loopback port: every commit
    /// fails fast with a transport error.
    fn coordinator_with_dead_store() -> GuardCoordinator {
        let mut config = VectorStoreConfig::new("127.0.0.1", "9", "test_collection");
        config.timeout = Duration::from_millis(500);
        let store = VectorStoreClient::new(config).unwrap();
        GuardCoordinator::new(Arc::new(ActiveLockTable::new()), store, 0.85)
    }

    #[tokio::test]
    async fn empty_agent_id_is_denied_without_touching_table() {
        let coordinator = coordinator_with_dead_store();
        let decision = coordinator.acquire_guard("", &[1.0, 0.0]).await;
        assert!(!decision.granted);
        assert_eq!(decision.message, "agent_id is required");
        assert_eq!(coordinator.table().size(), 0);
    }

    #[tokio::test]
    async fn empty_embedding_is_denied_without_touching_table() {
        let coordinator = coordinator_with_dead_store();
        let decision = coordinator.acquire_guard("agent-1", &[]).await;
        assert!(!decision.granted);
        assert_eq!(decision.message, "embedding is required");
        assert_eq!(coordinator.table().size(), 0);
    }

    #[tokio::test]
    async fn store_failure_denies_and_releases_the_entry() {
        let coordinator = coordinator_with_dead_store();
        let decision = coordinator.acquire_guard("agent-1", &[1.0, 0.0]).await;
        assert!(!decision.granted);
        assert_eq!(decision.message, "qdrant write failed");
        // The transient entry must be gone: the lock was held only across
        // the failed commit.
        assert_eq!(coordinator.table().size(), 0);
    }

    #[tokio::test]
    async fn release_guard_requires_agent_id() {
        let coordinator = coordinator_with_dead_store();
        assert!(!coordinator.release_guard("").success);
    }

    #[tokio::test]
    async fn release_guard_on_empty_table_succeeds() {
        let coordinator = coordinator_with_dead_store();
        let outcome = coordinator.release_guard("x");
        assert!(outcome.success);
        assert_eq!(coordinator.table().size(), 0);
    }
}
