//! In-memory reference implementation of [`StateStore`].
//!
//! Deterministic and test-friendly; state is lost when the process exits.

use crate::model::PersistedState;
use crate::traits::StateStore;
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    state: RwLock<Option<PersistedState>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing record, e.g. one produced by a migration.
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: RwLock::new(Some(state)),
            ..Self::default()
        }
    }

    /// Number of successful `save` calls.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent `save` fail, to exercise error paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Option<PersistedState> {
        self.state.read().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self) -> StorageResult<Option<PersistedState>> {
        let guard = self
            .state
            .read()
            .map_err(|_| StorageError::Backend("state lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    async fn save(&self, state: &PersistedState) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("simulated write failure".to_string()));
        }
        let mut guard = self
            .state
            .write()
            .map_err(|_| StorageError::Backend("state lock poisoned".to_string()))?;
        *guard = Some(state.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| StorageError::Backend("state lock poisoned".to_string()))?;
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_clear() {
        let store = InMemoryStateStore::new();
        assert!(store.load().await.unwrap().is_none());

        let state = PersistedState {
            offer_code: Some("SPRING25".to_string()),
            ..Default::default()
        };
        store.save(&state).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(state));
        assert_eq!(store.writes(), 1);

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_simulated_failure_leaves_state() {
        let store = InMemoryStateStore::with_state(PersistedState::default());
        store.set_fail_writes(true);

        let changed = PersistedState {
            offer_code: Some("X".to_string()),
            ..Default::default()
        };
        assert!(store.save(&changed).await.is_err());
        assert_eq!(store.snapshot(), Some(PersistedState::default()));
        assert_eq!(store.writes(), 0);
    }
}
