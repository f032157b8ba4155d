use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use time::OffsetDateTime;

use crate::dao::{
    models::{SessionEntity, SessionListItemEntity},
    session_store::SessionStore,
    storage::{StorageError, StorageResult},
};

/// Process-local store. Sessions live as long as the server.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<String, SessionEntity>>,
}

impl InMemorySessionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn write(
        &self,
        mut session: SessionEntity,
        expected: Option<u64>,
    ) -> StorageResult<SessionEntity> {
        let now = OffsetDateTime::now_utc();
        session.updated_at = Some(now);

        match (self.sessions.entry(session.id.clone()), expected) {
            (Entry::Vacant(slot), None) => {
                session.revision = 1;
                session.created_at.get_or_insert(now);
                slot.insert(session.clone());
                Ok(session)
            }
            (Entry::Occupied(mut slot), Some(revision)) if slot.get().revision == revision => {
                session.revision = revision + 1;
                slot.insert(session.clone());
                Ok(session)
            }
            (Entry::Occupied(slot), expected) => Err(StorageError::Conflict {
                code: session.id,
                expected,
                actual: Some(slot.get().revision),
            }),
            (Entry::Vacant(_), expected) => Err(StorageError::Conflict {
                code: session.id,
                expected,
                actual: None,
            }),
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn find_session(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let found = self.sessions.get(code).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(found) })
    }

    fn save_session(
        &self,
        session: SessionEntity,
        expected_revision: Option<u64>,
    ) -> BoxFuture<'static, StorageResult<SessionEntity>> {
        let result = self.write(session, expected_revision);
        Box::pin(async move { result })
    }

    fn delete_session(&self, code: &str) -> BoxFuture<'static, StorageResult<bool>> {
        let removed = self.sessions.remove(code).is_some();
        Box::pin(async move { Ok(removed) })
    }

    fn list_sessions(&self) -> BoxFuture<'static, StorageResult<Vec<SessionListItemEntity>>> {
        let mut items: Vec<SessionListItemEntity> = self
            .sessions
            .iter()
            .map(|entry| SessionListItemEntity::from(entry.value()))
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Box::pin(async move { Ok(items) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
