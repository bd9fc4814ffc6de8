//! Schema upgrades for persisted attribution state.
//!
//! Version 0 is the flat key-value layout written by earlier SDK releases:
//! one top-level string per key, no `schema_version` field. Version 1 is the
//! typed [`PersistedState`] record.

use crate::model::{PersistedState, CURRENT_SCHEMA_VERSION};
use crate::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use insert_affiliate_types::{AffiliateIdentifier, DeepLinkPayload, DeviceId, FeatureFlags};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

/// Key names of the flat layout. These must keep matching what older
/// releases wrote.
pub mod legacy_keys {
    pub const DEVICE_ID: &str = "shortUniqueDeviceID";
    pub const IDENTIFIER: &str = "insertAffiliateIdentifier";
    pub const STORED_DATE: &str = "affiliateStoredDate";
    pub const OFFER_CODE: &str = "OfferCode";
    pub const DEEP_LINK_DATA: &str = "deepLinkData";
    pub const APP_ACCOUNT_TOKEN: &str = "appAccountToken";
    pub const VERBOSE_LOGGING: &str = "verboseLogging";
    pub const LINKS_ENABLED: &str = "insertLinksEnabled";
    pub const CLIPBOARD_ENABLED: &str = "insertLinksClipboardEnabled";
    pub const ACTIVE_TIME: &str = "affiliateAttributionActiveTime";
}

/// Bring any supported document up to the current schema.
pub fn upgrade(document: Value) -> StorageResult<PersistedState> {
    let Value::Object(map) = document else {
        return Err(StorageError::Serialization(
            "state document must be a JSON object".to_string(),
        ));
    };

    let Some(version) = map.get("schema_version") else {
        return Ok(from_legacy(&map));
    };
    let version = version.as_u64().ok_or_else(|| {
        StorageError::Serialization("schema_version must be an unsigned integer".to_string())
    })?;
    if version > u64::from(CURRENT_SCHEMA_VERSION) {
        return Err(StorageError::UnsupportedVersion {
            found: version,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }

    let mut state: PersistedState = serde_json::from_value(Value::Object(map))?;
    state.schema_version = CURRENT_SCHEMA_VERSION;
    Ok(state)
}

fn from_legacy(map: &Map<String, Value>) -> PersistedState {
    let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
    let flag = |key: &str| map.get(key).and_then(Value::as_bool);

    let device_id = text(legacy_keys::DEVICE_ID).and_then(|raw| match DeviceId::parse(raw) {
        Ok(id) => Some(id),
        Err(err) => {
            warn!(error = %err, "dropping malformed legacy device id");
            None
        }
    });

    let affiliate_stored_at = text(legacy_keys::STORED_DATE).and_then(|raw| {
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(at) => Some(at.with_timezone(&Utc)),
            Err(err) => {
                warn!(value = %raw, error = %err, "dropping unparseable legacy stored date");
                None
            }
        }
    });

    let deep_link_payload = map
        .get(legacy_keys::DEEP_LINK_DATA)
        .and_then(legacy_deep_link_payload);

    let app_account_token =
        text(legacy_keys::APP_ACCOUNT_TOKEN).and_then(|raw| Uuid::parse_str(&raw).ok());

    let has_flags = [
        legacy_keys::VERBOSE_LOGGING,
        legacy_keys::LINKS_ENABLED,
        legacy_keys::CLIPBOARD_ENABLED,
        legacy_keys::ACTIVE_TIME,
    ]
    .iter()
    .any(|key| map.contains_key(*key));
    let settings = has_flags.then(|| FeatureFlags {
        verbose_logging: flag(legacy_keys::VERBOSE_LOGGING).unwrap_or(false),
        links_enabled: flag(legacy_keys::LINKS_ENABLED).unwrap_or(false),
        clipboard_enabled: flag(legacy_keys::CLIPBOARD_ENABLED).unwrap_or(false),
        attribution_active_time_secs: map.get(legacy_keys::ACTIVE_TIME).and_then(Value::as_u64),
    });

    PersistedState {
        schema_version: CURRENT_SCHEMA_VERSION,
        device_id,
        affiliate_identifier: text(legacy_keys::IDENTIFIER).map(AffiliateIdentifier::from_stored),
        affiliate_stored_at,
        offer_code: text(legacy_keys::OFFER_CODE),
        deep_link_payload,
        app_account_token,
        settings,
    }
}

/// The legacy blob was stored either as an object or as a JSON string.
fn legacy_deep_link_payload(value: &Value) -> Option<DeepLinkPayload> {
    let owned;
    let object = match value {
        Value::Object(map) => map,
        Value::String(raw) => {
            owned = serde_json::from_str::<Map<String, Value>>(raw).ok()?;
            &owned
        }
        _ => return None,
    };
    let field = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);
    Some(DeepLinkPayload {
        user_code: field("userCode")?,
        affiliate_email: field("affiliateEmail"),
        company_name: field("companyName"),
    })
}
