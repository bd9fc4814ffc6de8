//! JSON file backend.
//!
//! Writes go to a sibling temporary file that is then renamed over the
//! target, so a crash mid-write never leaves a truncated document.

use crate::migration;
use crate::model::PersistedState;
use crate::traits::StateStore;
use crate::StorageResult;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn load(&self) -> StorageResult<Option<PersistedState>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let document: serde_json::Value = serde_json::from_slice(&bytes)?;
        migration::upgrade(document).map(Some)
    }

    async fn save(&self, state: &PersistedState) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(state)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "attribution state saved");
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageError;
    use insert_affiliate_types::DeviceId;

    #[tokio::test]
    async fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStateStore::new(dir.path().join("state.json"));
        assert!(store.load().await.unwrap().is_none());
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStateStore::new(dir.path().join("nested").join("state.json"));
        let state = PersistedState {
            device_id: Some(DeviceId::parse("0A1B2C").unwrap()),
            ..Default::default()
        };

        store.save(&state).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(state));
        assert!(!store.temp_path().exists());

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_legacy_file_is_upgraded_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"shortUniqueDeviceID":"00FF00","insertAffiliateIdentifier":"ABC-00FF00"}"#,
        )
        .unwrap();

        let state = JsonFileStateStore::new(&path).load().await.unwrap().unwrap();
        assert_eq!(state.device_id.unwrap().as_str(), "00FF00");
        assert!(state.affiliate_stored_at.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStateStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
