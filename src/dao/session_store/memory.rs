use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::dao::models::SessionEntity;
use crate::dao::session_store::SessionStore;
use crate::dao::storage::{StorageError, StorageResult};

/// In-memory [`SessionStore`] used by tests and ephemeral deployments.
///
/// Snapshots live in a [`DashMap`] and disappear with the process. The store
/// can be flipped to an unavailable state to exercise outage handling.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<String, SessionEntity>>,
    offline: Arc<AtomicBool>,
}

impl InMemorySessionStore {
    /// Create an empty, available store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following operation fail as unavailable (or recover).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of snapshots currently held.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store holds no snapshot.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn check_online(&self) -> StorageResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StorageError::unavailable(
                "in-memory store switched offline".to_string(),
                io::Error::new(io::ErrorKind::ConnectionRefused, "offline"),
            ))
        } else {
            Ok(())
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn save_session(
        &self,
        room_key: String,
        session: SessionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.check_online()?;
            store.sessions.insert(room_key, session);
            Ok(())
        })
    }

    fn load_session(
        &self,
        room_key: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.check_online()?;
            Ok(store
                .sessions
                .get(&room_key)
                .map(|entry| entry.value().clone()))
        })
    }

    fn delete_session(&self, room_key: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store.check_online()?;
            Ok(store.sessions.remove(&room_key).is_some())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.check_online() })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.check_online() })
    }
}
