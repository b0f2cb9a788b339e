//! Active-lock table
//!
//! In-memory set of currently held semantic locks. Admission blocks until
//! the requested embedding overlaps no held entry; every release wakes all
//! waiters so each can re-evaluate its own predicate. The table is
//! process-local and cleared by restart.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::info;

use crate::similarity::cosine;

/// A held semantic lock.
#[derive(Debug, Clone)]
pub struct SemanticLock {
    /// Opaque identifier of the holding agent.
    pub agent_id: String,

    /// The embedding admitted into the table.
    pub centroid: Vec<f32>,

    /// Threshold in effect when this entry was admitted. Audit metadata:
    /// the admission predicate always uses the incoming request's theta.
    pub threshold: f32,

    /// When the entry was admitted.
    pub acquired_at: DateTime<Utc>,
}

/// Blocking, similarity-based admission control.
///
/// A single mutex covers all reads and writes of the entry list; it is
/// held only for the predicate check and the append/remove, never while
/// waiting or during any I/O. Waiters park on a [`Notify`] and are woken
/// broadcast-style on every release, since eligibility depends on each
/// waiter's own embedding.
#[derive(Default)]
pub struct ActiveLockTable {
    entries: Mutex<Vec<SemanticLock>>,
    removals: Notify,
}

impl ActiveLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `embedding` overlaps no held entry, then append it.
    ///
    /// Overlap means cosine similarity >= `theta` (inclusive) against any
    /// entry, using the caller's theta only. The check and the append are
    /// atomic under the table mutex. Callers are responsible for input
    /// validation; empty embeddings are admitted immediately because their
    /// similarity to everything is 0.
    pub async fn acquire(&self, agent_id: &str, embedding: &[f32], theta: f32) {
        loop {
            // Arm the waiter before checking the predicate so a release
            // landing between the check and the await still wakes us.
            let notified = self.removals.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let admitted = {
                let mut entries = self.entries.lock();
                if Self::overlap_exists(&entries, embedding, theta) {
                    None
                } else {
                    entries.push(SemanticLock {
                        agent_id: agent_id.to_string(),
                        centroid: embedding.to_vec(),
                        threshold: theta,
                        acquired_at: Utc::now(),
                    });
                    Some(Self::agent_ids(&entries))
                }
            };

            match admitted {
                Some(ids) => {
                    log_active(&ids);
                    return;
                }
                None => notified.await,
            }
        }
    }

    /// Remove every entry held by `agent_id` and wake all waiters.
    ///
    /// Releasing an absent agent is a no-op; the notification still fires,
    /// which is harmless.
    pub fn release(&self, agent_id: &str) {
        let ids = {
            let mut entries = self.entries.lock();
            entries.retain(|entry| entry.agent_id != agent_id);
            Self::agent_ids(&entries)
        };
        self.removals.notify_waiters();
        log_active(&ids);
    }

    /// Current entry count. Observational: the value may be stale by the
    /// time the caller looks at it.
    pub fn size(&self) -> usize {
        self.entries.lock().len()
    }

    /// Agent ids currently held, in insertion order.
    pub fn holders(&self) -> Vec<String> {
        Self::agent_ids(&self.entries.lock())
    }

    /// Clone of the current entries, for audit and inspection.
    pub fn snapshot(&self) -> Vec<SemanticLock> {
        self.entries.lock().clone()
    }

    fn overlap_exists(entries: &[SemanticLock], embedding: &[f32], theta: f32) -> bool {
        entries
            .iter()
            .any(|entry| cosine(embedding, &entry.centroid) >= theta)
    }

    fn agent_ids(entries: &[SemanticLock]) -> Vec<String> {
        entries.iter().map(|entry| entry.agent_id.clone()).collect()
    }
}

fn log_active(ids: &[String]) {
    info!("ActiveLocks: [{}]", ids.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    const THETA: f32 = 0.85;

    fn basis(dim: usize, index: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[index] = 1.0;
        v
    }

    #[tokio::test]
    async fn non_overlapping_embeddings_admit_without_blocking() {
        let table = ActiveLockTable::new();
        table.acquire("a", &basis(4, 0), THETA).await;
        table.acquire("b", &basis(4, 1), THETA).await;
        assert_eq!(table.size(), 2);
        assert_eq!(table.holders(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn overlapping_embedding_blocks_until_release() {
        let table = Arc::new(ActiveLockTable::new());
        let v = vec![1.0, 1.0, 0.0];
        table.acquire("holder", &v, THETA).await;

        let contender = {
            let table = Arc::clone(&table);
            let v = v.clone();
            tokio::spawn(async move {
                table.acquire("contender", &v, THETA).await;
            })
        };

        // The contender must still be parked while the holder is live.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());
        assert_eq!(table.holders(), vec!["holder"]);

        table.release("holder");
        timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender should be admitted after release")
            .unwrap();
        assert_eq!(table.holders(), vec!["contender"]);
    }

    #[tokio::test]
    async fn release_removes_every_occurrence() {
        let table = ActiveLockTable::new();
        table.acquire("a", &basis(4, 0), THETA).await;
        table.acquire("a", &basis(4, 1), THETA).await;
        table.acquire("b", &basis(4, 2), THETA).await;
        assert_eq!(table.size(), 3);

        table.release("a");
        assert_eq!(table.holders(), vec!["b"]);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let table = ActiveLockTable::new();
        table.acquire("a", &basis(2, 0), THETA).await;
        table.release("a");
        table.release("a");
        table.release("never-held");
        assert_eq!(table.size(), 0);
    }

    #[tokio::test]
    async fn theta_zero_serializes_all_nonzero_embeddings() {
        let table = Arc::new(ActiveLockTable::new());
        table.acquire("a", &basis(4, 0), 0.0).await;

        // Even an orthogonal embedding has similarity 0 >= theta 0.
        let blocked = timeout(
            Duration::from_millis(50),
            table.acquire("b", &basis(4, 1), 0.0),
        )
        .await;
        assert!(blocked.is_err());
    }

    #[tokio::test]
    async fn theta_one_blocks_only_identical_direction() {
        let table = ActiveLockTable::new();
        table.acquire("a", &[1.0, 2.0, 3.0], 1.0).await;

        // Similar but not colinear: admitted under theta = 1.
        table.acquire("b", &[1.0, 2.0, 3.1], 1.0).await;
        assert_eq!(table.size(), 2);

        // A positive scalar multiple of a held centroid blocks.
        let blocked = timeout(
            Duration::from_millis(50),
            table.acquire("c", &[2.0, 4.0, 6.0], 1.0),
        )
        .await;
        assert!(blocked.is_err());
    }

    #[tokio::test]
    async fn admitted_entries_record_threshold_and_time() {
        let table = ActiveLockTable::new();
        let before = Utc::now();
        table.acquire("a", &[0.5, 0.5], 0.7).await;

        let entries = table.entries.lock();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].threshold, 0.7);
        assert!(entries[0].acquired_at >= before);
    }

    #[tokio::test]
    async fn mixed_dimensionality_entries_coexist() {
        // Entries need not share a dimensionality; mismatched lengths
        // compare as similarity 0 and never conflict.
        let table = ActiveLockTable::new();
        table.acquire("a", &[1.0, 0.0], THETA).await;
        table.acquire("b", &[1.0, 0.0, 0.0], THETA).await;
        assert_eq!(table.size(), 2);
    }
}
