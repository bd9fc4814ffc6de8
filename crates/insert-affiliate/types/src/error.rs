//! Validation errors for attribution identifiers.

use thiserror::Error;

/// Errors raised when a value does not satisfy an identifier format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Short codes are 3-25 ASCII alphanumeric characters.
    #[error("invalid short code '{0}': expected 3-25 alphanumeric characters")]
    InvalidShortCode(String),

    /// Device ids are exactly six uppercase hexadecimal digits.
    #[error("invalid device id '{0}': expected 6 uppercase hex digits")]
    InvalidDeviceId(String),

    /// Referral codes and links must carry at least one non-space character.
    #[error("affiliate code must not be empty")]
    EmptyCode,
}
