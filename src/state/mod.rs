pub mod ledger;
pub mod resolver;
pub mod rotation;
pub mod session;
mod sse;
pub mod state_machine;

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::{RwLock, watch};

use crate::dao::session_store::SessionStore;
use crate::error::ServiceError;
use crate::state::session::Session;

pub use self::sse::SseHub;

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Capacity of each room's SSE broadcast channel.
const ROOM_EVENT_CAPACITY: usize = 16;

/// One live room: its session data plus the event hub its watchers follow.
///
/// The session lock is the room's single-writer gate. A command holds the
/// write half for its whole validate, mutate, persist, broadcast cycle, so
/// two scorekeepers hitting the same room are serialized.
pub struct RoomHandle {
    room_key: String,
    session: RwLock<Session>,
    events: SseHub,
}

impl RoomHandle {
    fn new(room_key: String, session: Session) -> Self {
        Self {
            room_key,
            session: RwLock::new(session),
            events: SseHub::new(ROOM_EVENT_CAPACITY),
        }
    }

    /// Storage key the room is registered and persisted under.
    pub fn room_key(&self) -> &str {
        &self.room_key
    }

    /// The room's session data behind its single-writer lock.
    pub fn session(&self) -> &RwLock<Session> {
        &self.session
    }

    /// Broadcast hub for the room's SSE subscribers.
    pub fn events(&self) -> &SseHub {
        &self.events
    }
}

/// Central application state holding the room registry and storage handle.
pub struct AppState {
    session_store: RwLock<Option<Arc<dyn SessionStore>>>,
    rooms: DashMap<String, Arc<RoomHandle>>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new() -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            session_store: RwLock::new(None),
            rooms: DashMap::new(),
            degraded: degraded_tx,
        })
    }

    /// Obtain a handle to the current snapshot store, if one is installed.
    pub async fn session_store(&self) -> Option<Arc<dyn SessionStore>> {
        let guard = self.session_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the snapshot store or fail the command as degraded.
    pub async fn require_session_store(&self) -> Result<Arc<dyn SessionStore>, ServiceError> {
        self.session_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a snapshot store implementation and leave degraded mode.
    pub async fn install_session_store(&self, store: Arc<dyn SessionStore>) {
        {
            let mut guard = self.session_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current snapshot store and enter degraded mode.
    pub async fn clear_session_store(&self) {
        {
            let mut guard = self.session_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Look up a live room by its storage key.
    pub fn room(&self, room_key: &str) -> Option<Arc<RoomHandle>> {
        self.rooms.get(room_key).map(|entry| entry.value().clone())
    }

    /// Fetch the live room for `room_key`, materializing it from `build` if
    /// nobody entered it yet. When two devices enter concurrently the first
    /// insertion wins and both receive the same handle; the returned flag
    /// tells the caller whether its own session was the one installed.
    pub fn room_or_insert(
        &self,
        room_key: &str,
        build: impl FnOnce() -> Session,
    ) -> (Arc<RoomHandle>, bool) {
        match self.rooms.entry(room_key.to_string()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let handle = Arc::new(RoomHandle::new(room_key.to_string(), build()));
                entry.insert(handle.clone());
                (handle, true)
            }
        }
    }

    /// Drop a room from the registry, returning its handle if it was live.
    pub fn remove_room(&self, room_key: &str) -> Option<Arc<RoomHandle>> {
        self.rooms.remove(room_key).map(|(_, handle)| handle)
    }

    /// Number of rooms currently live in memory.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::session_store::memory::InMemorySessionStore;

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new();
        assert!(state.is_degraded());
        assert!(state.require_session_store().await.is_err());

        state
            .install_session_store(Arc::new(InMemorySessionStore::new()))
            .await;
        assert!(!state.is_degraded());
        assert!(state.require_session_store().await.is_ok());

        state.clear_session_store().await;
        assert!(state.is_degraded());
    }

    #[tokio::test]
    async fn degraded_watcher_sees_transitions() {
        let state = AppState::new();
        let mut watcher = state.degraded_watcher();
        assert!(*watcher.borrow_and_update());

        state
            .install_session_store(Arc::new(InMemorySessionStore::new()))
            .await;
        watcher.changed().await.unwrap();
        assert!(!*watcher.borrow_and_update());
    }

    #[tokio::test]
    async fn room_registry_reuses_live_handles() {
        let state = AppState::new();
        let (first, inserted) = state.room_or_insert("Mesa", || Session::new("Mesa".to_string()));
        assert!(inserted);
        let (second, inserted) = state.room_or_insert("Mesa", || Session::new("otra".to_string()));
        assert!(!inserted);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(state.room_count(), 1);

        assert!(state.remove_room("Mesa").is_some());
        assert!(state.room("Mesa").is_none());
    }
}
