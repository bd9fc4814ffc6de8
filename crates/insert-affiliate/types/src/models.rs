//! Attribution records and backend-derived data cached on the device.

use crate::ids::AffiliateIdentifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The stored affiliate identifier and when it was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionRecord {
    pub identifier: AffiliateIdentifier,
    /// `None` for records written before timestamps were tracked.
    pub stored_at: Option<DateTime<Utc>>,
}

impl AttributionRecord {
    /// Apply the attribution window at time `now`.
    ///
    /// Records without a timestamp, or with no window configured, never expire.
    /// Elapsed time equal to the window is still active.
    pub fn active_at(&self, now: DateTime<Utc>, window: Option<Duration>) -> bool {
        let (Some(window), Some(stored_at)) = (window, self.stored_at) else {
            return true;
        };
        match chrono::Duration::from_std(window) {
            Ok(window) => now.signed_duration_since(stored_at) <= window,
            // larger than chrono can represent: effectively unbounded
            Err(_) => true,
        }
    }
}

/// Data returned by the backend when a universal link resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepLinkPayload {
    /// The code the backend mapped the link to; this is what gets stored.
    pub user_code: String,
    pub affiliate_email: Option<String>,
    pub company_name: Option<String>,
}

/// Public details of an affiliate, as confirmed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffiliateDetails {
    pub affiliate_name: String,
    pub affiliate_short_code: String,
    pub deeplink_url: String,
}
