use crate::models::{
    CheckAffiliateRequest, CheckAffiliateResponse, DeepLinkData, DescriptorReportResponse,
    ExpectedTransactionRequest, TrackEventRequest,
};
use crate::ClientResult;
use async_trait::async_trait;

/// The attribution backend as seen by the SDK.
///
/// Implementations do no retrying; every failure is returned to the caller.
#[async_trait]
pub trait AttributionBackend: Send + Sync {
    /// `GET /V1/convert-deep-link-to-short-link`; returns `shortLink`.
    async fn convert_deep_link(&self, company_id: &str, deep_link_url: &str)
        -> ClientResult<String>;

    /// `GET /v1/affiliateReturnOfferCode/{company}/{code}`; returns the raw
    /// response text, which may be a sentinel error string.
    async fn affiliate_offer_code(
        &self,
        company_id: &str,
        affiliate_code: &str,
        platform: &str,
    ) -> ClientResult<String>;

    /// `POST /v1/trackEvent`; returns the HTTP status.
    async fn track_event(&self, request: &TrackEventRequest) -> ClientResult<u16>;

    /// `POST .../create-expected-transaction`; returns the HTTP status.
    async fn create_expected_transaction(
        &self,
        request: &ExpectedTransactionRequest,
    ) -> ClientResult<u16>;

    /// `GET /V1/getDeepLinkData/{company}/{shortCode}`.
    async fn deep_link_data(&self, company_code: &str, short_code: &str)
        -> ClientResult<DeepLinkData>;

    /// `POST /V1/checkAffiliateExists`.
    async fn check_affiliate_exists(
        &self,
        request: &CheckAffiliateRequest,
    ) -> ClientResult<CheckAffiliateResponse>;

    /// `POST /V1/appDeepLinkEvents` with the device descriptor bundle.
    async fn report_device_descriptors(
        &self,
        descriptors: &serde_json::Value,
    ) -> ClientResult<DescriptorReportResponse>;
}
