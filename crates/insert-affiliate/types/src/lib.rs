//! # Insert Affiliate Types
//!
//! Shared vocabulary for the Insert Affiliate attribution SDK:
//!
//! - [`DeviceId`]: six-hex-digit per-device identifier
//! - [`ShortCode`]: validated 3-25 character alphanumeric affiliate code
//! - [`AffiliateIdentifier`]: composite `"<code>-<deviceId>"` attribution key
//! - [`AttributionRecord`]: identifier plus the time it was stored
//! - [`SdkSettings`]: host configuration (company code, feature flags, window)

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
mod ids;
mod models;
mod settings;

pub use error::ValidationError;
pub use ids::{
    is_short_code, strip_device_suffix, AffiliateIdentifier, DeviceId, ShortCode,
    DEVICE_ID_SPACE, SHORT_CODE_MAX_LEN, SHORT_CODE_MIN_LEN,
};
pub use models::{AffiliateDetails, AttributionRecord, DeepLinkPayload};
pub use settings::{FeatureFlags, SdkSettings, DEFAULT_API_BASE_URL, DEFAULT_LINK_DOMAIN};
