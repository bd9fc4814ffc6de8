//! Wire models for the attribution backend.
//!
//! Field names follow the backend's JSON exactly; several endpoints mix
//! camelCase with other spellings, hence the explicit renames.

use serde::{Deserialize, Serialize};

/// Platform reported to platform-scoped endpoints.
pub const PLATFORM_TYPE: &str = "ios";

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ConvertDeepLinkResponse {
    #[serde(rename = "shortLink")]
    pub short_link: Option<String>,
}

/// Body of `POST /v1/trackEvent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventRequest {
    pub event_name: String,
    /// The full affiliate identifier.
    pub deep_link_param: String,
    pub company_id: String,
}

/// Body of `POST /v1/api/app-store-webhook/create-expected-transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedTransactionRequest {
    #[serde(rename = "UUID")]
    pub uuid: String,
    pub company_code: String,
    /// The full affiliate identifier.
    pub short_code: String,
    /// ISO-8601 timestamp.
    pub stored_date: String,
}

/// `data` member of the `getDeepLinkData` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepLinkData {
    pub deep_link: DeepLinkRecord,
    #[serde(default)]
    pub company: Option<CompanyRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepLinkRecord {
    pub user_code: String,
    #[serde(default)]
    pub affiliate_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRecord {
    #[serde(default)]
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DeepLinkDataEnvelope {
    #[serde(default)]
    pub data: Option<DeepLinkData>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /V1/checkAffiliateExists`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAffiliateRequest {
    pub company_id: String,
    pub affiliate_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckAffiliateResponse {
    #[serde(default)]
    pub exists: bool,
    #[serde(default)]
    pub affiliate: Option<AffiliateRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateRecord {
    #[serde(default)]
    pub affiliate_name: String,
    #[serde(default)]
    pub affiliate_short_code: String,
    #[serde(rename = "deeplinkurl", default)]
    pub deeplink_url: String,
}

/// Optional answer to a descriptor report: a server-side install match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorReportResponse {
    #[serde(rename = "matchFound", default)]
    pub match_found: bool,
    #[serde(rename = "matched_affiliate_shortCode", default)]
    pub matched_short_code: Option<String>,
}

impl DescriptorReportResponse {
    /// The matched short code, if the backend reported a usable match.
    pub fn matched(&self) -> Option<&str> {
        if !self.match_found {
            return None;
        }
        self.matched_short_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expected_transaction_field_names() {
        let body = serde_json::to_value(ExpectedTransactionRequest {
            uuid: "u".into(),
            company_code: "ACME01".into(),
            short_code: "PARTNERX-0A1B2C".into(),
            stored_date: "2025-01-01T00:00:00Z".into(),
        })
        .unwrap();
        assert_eq!(
            body,
            json!({
                "UUID": "u",
                "companyCode": "ACME01",
                "shortCode": "PARTNERX-0A1B2C",
                "storedDate": "2025-01-01T00:00:00Z"
            })
        );
    }

    #[test]
    fn test_deep_link_envelope_parses_nested_user_code() {
        let envelope: DeepLinkDataEnvelope = serde_json::from_value(json!({
            "data": {
                "deepLink": { "userCode": "ALIAS01", "affiliateEmail": "a@b.co" },
                "company": { "companyName": "Acme" }
            }
        }))
        .unwrap();
        let data = envelope.data.unwrap();
        assert_eq!(data.deep_link.user_code, "ALIAS01");
        assert_eq!(data.company.unwrap().company_name.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_affiliate_record_lowercase_deeplink_key() {
        let response: CheckAffiliateResponse = serde_json::from_value(json!({
            "exists": true,
            "affiliate": {
                "affiliateName": "Jane",
                "affiliateShortCode": "JANE01",
                "deeplinkurl": "https://insertaffiliate.link/V1/acme01/JANE01"
            }
        }))
        .unwrap();
        assert!(response.exists);
        assert_eq!(
            response.affiliate.unwrap().deeplink_url,
            "https://insertaffiliate.link/V1/acme01/JANE01"
        );
    }

    #[test]
    fn test_descriptor_match_requires_flag_and_code() {
        let matched: DescriptorReportResponse = serde_json::from_value(json!({
            "matchFound": true,
            "matched_affiliate_shortCode": "PARTNERX"
        }))
        .unwrap();
        assert_eq!(matched.matched(), Some("PARTNERX"));

        let flagged_only = DescriptorReportResponse {
            match_found: true,
            matched_short_code: Some("  ".into()),
        };
        assert_eq!(flagged_only.matched(), None);

        let no_match: DescriptorReportResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(no_match.matched(), None);
    }
}
