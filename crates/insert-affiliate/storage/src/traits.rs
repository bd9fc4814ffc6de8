use crate::model::PersistedState;
use crate::StorageResult;
use async_trait::async_trait;

/// Durable home of the SDK's [`PersistedState`].
///
/// Implementations replace the whole record on `save`; they never merge.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the record, upgrading older layouts. `None` if nothing was saved.
    async fn load(&self) -> StorageResult<Option<PersistedState>>;

    async fn save(&self, state: &PersistedState) -> StorageResult<()>;

    /// Remove everything this store holds.
    async fn clear(&self) -> StorageResult<()>;
}
