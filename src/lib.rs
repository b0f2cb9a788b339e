//! Semantic mutual-exclusion service
//!
//! Agents request exclusive rights to operate on a region of embedding
//! space. A guard is granted only when the requested embedding does not
//! overlap (cosine similarity >= theta) any embedding currently held by
//! another agent. Granted embeddings are committed to an external Qdrant
//! collection before the caller sees success.

pub mod api;
pub mod config;
pub mod coordinator;
pub mod lock_table;
pub mod qdrant;
pub mod similarity;
pub mod tracing_setup;

pub use config::ServiceConfig;
pub use coordinator::{GuardCoordinator, GuardDecision, ReleaseOutcome};
pub use lock_table::{ActiveLockTable, SemanticLock};
pub use qdrant::{VectorStoreClient, VectorStoreConfig};
