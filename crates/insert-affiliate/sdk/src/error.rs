//! Error types for the SDK core.

use insert_affiliate_client::ClientError;
use insert_affiliate_storage::StorageError;
use insert_affiliate_types::ValidationError;
use thiserror::Error;

/// Result type for SDK operations.
pub type SdkResult<T> = Result<T, SdkError>;

/// Errors that can occur in SDK operations.
///
/// None of these are fatal to the host; the facade logs them and degrades
/// the affected operation to a no-op.
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("SDK is already initialized; call reset() before initializing again")]
    AlreadyInitialized,

    #[error("SDK is not initialized")]
    NotInitialized,

    #[error("no company code configured")]
    MissingCompanyCode,

    /// No identifier is stored, or it fell outside the attribution window.
    #[error("no active affiliate identifier")]
    NoAffiliateIdentifier,

    #[error("affiliate '{0}' does not exist")]
    AffiliateNotFound(String),

    /// The configuration generation changed while the operation was in flight.
    #[error("result discarded: SDK was reset or re-initialized")]
    Superseded,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("backend error: {0}")]
    Backend(#[from] ClientError),
}
