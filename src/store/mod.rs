//! Progress persistence
//!
//! The engine only sees the [`ProgressStore`] trait. Local JSON files, an
//! in-memory map, and the fire-and-forget background writer all implement it.

pub mod file;
pub mod sync;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::progress::ProgressState;

pub use file::JsonFileStore;
pub use sync::{BackgroundStore, SyncReport, SyncWorker};

/// Errors from loading or saving progress
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be parsed or serialized
    #[error("Corrupt progress data: {0}")]
    Json(#[from] serde_json::Error),

    /// The background sync worker is gone
    #[error("Background sync has stopped")]
    SyncClosed,

    /// The backing store is temporarily unreachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Check if retrying the same operation later may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StoreError::Io(_) | StoreError::Unavailable(_))
    }
}

/// Durable storage of one [`ProgressState`] per user
pub trait ProgressStore {
    /// Load a user's state, or `None` if nothing has been stored yet
    fn load(&self, user_id: &str) -> Result<Option<ProgressState>, StoreError>;

    /// Replace a user's stored state
    fn save(&self, user_id: &str, state: &ProgressState) -> Result<(), StoreError>;

    /// Every user with stored state
    fn list_users(&self) -> Result<Vec<String>, StoreError>;
}

impl<S: ProgressStore + ?Sized> ProgressStore for &S {
    fn load(&self, user_id: &str) -> Result<Option<ProgressState>, StoreError> {
        (**self).load(user_id)
    }

    fn save(&self, user_id: &str, state: &ProgressState) -> Result<(), StoreError> {
        (**self).save(user_id, state)
    }

    fn list_users(&self) -> Result<Vec<String>, StoreError> {
        (**self).list_users()
    }
}

impl<S: ProgressStore + ?Sized> ProgressStore for Arc<S> {
    fn load(&self, user_id: &str) -> Result<Option<ProgressState>, StoreError> {
        (**self).load(user_id)
    }

    fn save(&self, user_id: &str, state: &ProgressState) -> Result<(), StoreError> {
        (**self).save(user_id, state)
    }

    fn list_users(&self) -> Result<Vec<String>, StoreError> {
        (**self).list_users()
    }
}

/// Progress kept in a map, for tests and embedding
///
/// Can be switched offline to simulate an unreachable store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<String, ProgressState>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every save fail (or succeed again)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Directly read what was last saved for a user
    pub fn get(&self, user_id: &str) -> Option<ProgressState> {
        self.lock().get(user_id).cloned()
    }

    /// Directly seed a user's state
    pub fn insert(&self, user_id: &str, state: ProgressState) {
        self.lock().insert(user_id.to_string(), state);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ProgressState>> {
        self.users.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ProgressStore for MemoryStore {
    fn load(&self, user_id: &str) -> Result<Option<ProgressState>, StoreError> {
        Ok(self.get(user_id))
    }

    fn save(&self, user_id: &str, state: &ProgressState) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        self.insert(user_id, state.clone());
        Ok(())
    }

    fn list_users(&self) -> Result<Vec<String>, StoreError> {
        let mut users: Vec<String> = self.lock().keys().cloned().collect();
        users.sort();
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.load("ada").unwrap().is_none());

        let state = ProgressState { points: 30, ..ProgressState::default() };
        store.save("ada", &state).unwrap();

        assert_eq!(store.load("ada").unwrap(), Some(state));
        assert_eq!(store.list_users().unwrap(), vec!["ada".to_string()]);
    }

    #[test]
    fn offline_memory_store_rejects_saves() {
        let store = MemoryStore::new();
        store.set_offline(true);

        let err = store.save("ada", &ProgressState::default()).unwrap_err();
        assert!(err.is_recoverable());
        assert!(store.get("ada").is_none());

        store.set_offline(false);
        assert!(store.save("ada", &ProgressState::default()).is_ok());
    }

    #[test]
    fn corrupt_data_is_not_recoverable() {
        let err: StoreError = serde_json::from_str::<ProgressState>("{").unwrap_err().into();
        assert!(!err.is_recoverable());
    }
}
