use chrono::{DateTime, Utc};
use insert_affiliate_types::{
    AffiliateIdentifier, AttributionRecord, DeepLinkPayload, DeviceId, FeatureFlags,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Schema version written by this crate.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Everything the SDK keeps on the device, as one typed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub schema_version: u32,

    /// Created once per install and never regenerated.
    #[serde(default)]
    pub device_id: Option<DeviceId>,

    #[serde(default)]
    pub affiliate_identifier: Option<AffiliateIdentifier>,

    #[serde(default)]
    pub affiliate_stored_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub offer_code: Option<String>,

    #[serde(default)]
    pub deep_link_payload: Option<DeepLinkPayload>,

    /// Correlates store purchases with the expected-transaction webhook.
    #[serde(default)]
    pub app_account_token: Option<Uuid>,

    /// Flags from the most recent successful initialization.
    #[serde(default)]
    pub settings: Option<FeatureFlags>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            device_id: None,
            affiliate_identifier: None,
            affiliate_stored_at: None,
            offer_code: None,
            deep_link_payload: None,
            app_account_token: None,
            settings: None,
        }
    }
}

impl PersistedState {
    pub fn attribution(&self) -> Option<AttributionRecord> {
        self.affiliate_identifier
            .clone()
            .map(|identifier| AttributionRecord {
                identifier,
                stored_at: self.affiliate_stored_at,
            })
    }

    /// Replace identifier and timestamp together.
    pub fn set_attribution(&mut self, identifier: AffiliateIdentifier, stored_at: DateTime<Utc>) {
        self.affiliate_identifier = Some(identifier);
        self.affiliate_stored_at = Some(stored_at);
    }
}
