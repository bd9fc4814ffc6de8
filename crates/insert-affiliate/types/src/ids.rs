//! Identifier types: device ids, short codes, and composite affiliate identifiers.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Size of the space device ids are folded into (24 bits).
pub const DEVICE_ID_SPACE: u64 = 0xFF_FFFF;

/// Minimum short code length.
pub const SHORT_CODE_MIN_LEN: usize = 3;

/// Maximum short code length.
pub const SHORT_CODE_MAX_LEN: usize = 25;

/// Returns true iff `s` is 3-25 ASCII alphanumeric characters.
pub fn is_short_code(s: &str) -> bool {
    (SHORT_CODE_MIN_LEN..=SHORT_CODE_MAX_LEN).contains(&s.len())
        && s.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Short, stable per-device identifier: six uppercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Generate a fresh device id from a random UUID.
    pub fn generate() -> Self {
        let seed = Uuid::new_v4().to_string();
        let mut hasher = DefaultHasher::new();
        seed.hash(&mut hasher);
        Self::from_hash(hasher.finish())
    }

    /// Fold a 64-bit hash into the 24-bit device id space.
    pub fn from_hash(hash: u64) -> Self {
        let folded = (hash as i64).unsigned_abs() % DEVICE_ID_SPACE;
        Self(format!("{:06X}", folded))
    }

    /// Parse an existing device id.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let valid = value.len() == 6
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b));
        if valid {
            Ok(Self(value))
        } else {
            Err(ValidationError::InvalidDeviceId(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

/// A validated affiliate short code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShortCode(String);

impl ShortCode {
    /// Validate `value` as-is, without changing its case.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if is_short_code(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::InvalidShortCode(value))
        }
    }

    /// Trim, uppercase, then validate.
    pub fn normalized(value: &str) -> Result<Self, ValidationError> {
        Self::parse(value.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ShortCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ShortCode> for String {
    fn from(code: ShortCode) -> Self {
        code.0
    }
}

/// Composite `"<code>-<deviceId>"` binding a referral code to this device.
///
/// `code` is either a short code or, when link resolution failed, the raw
/// referral string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AffiliateIdentifier(String);

impl AffiliateIdentifier {
    pub fn compose(code: &str, device_id: &DeviceId) -> Self {
        Self(format!("{}-{}", code, device_id))
    }

    /// Wrap a previously persisted identifier without re-validating it.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The referral code portion, with any device id suffix removed.
    pub fn code(&self) -> &str {
        strip_device_suffix(&self.0)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AffiliateIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<AffiliateIdentifier> for String {
    fn from(id: AffiliateIdentifier) -> Self {
        id.0
    }
}

/// Remove a trailing `-<deviceId>` from `value`, if one is present.
pub fn strip_device_suffix(value: &str) -> &str {
    match value.rsplit_once('-') {
        Some((head, tail)) if !head.is_empty() && DeviceId::parse(tail).is_ok() => head,
        _ => value,
    }
}
