#[cfg(feature = "couch-store")]
pub mod couchdb;
mod memory;

pub use memory::InMemorySessionStore;

use crate::dao::models::{SessionEntity, SessionListItemEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for session documents.
pub trait SessionStore: Send + Sync {
    /// Load a session by code.
    fn find_session(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Conditionally write a session.
    ///
    /// `expected_revision` is `None` to create (the code must be free) or the revision the
    /// caller read. The returned entity carries the new revision.
    fn save_session(
        &self,
        session: SessionEntity,
        expected_revision: Option<u64>,
    ) -> BoxFuture<'static, StorageResult<SessionEntity>>;
    /// Remove a session, returning whether it existed.
    fn delete_session(&self, code: &str) -> BoxFuture<'static, StorageResult<bool>>;
    /// Summaries of every stored session.
    fn list_sessions(&self) -> BoxFuture<'static, StorageResult<Vec<SessionListItemEntity>>>;
    /// Cheap liveness probe.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
