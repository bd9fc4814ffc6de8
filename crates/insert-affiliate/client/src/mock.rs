//! Recording test double for [`AttributionBackend`].

use crate::api::AttributionBackend;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    AffiliateRecord, CheckAffiliateRequest, CheckAffiliateResponse, CompanyRecord, DeepLinkData,
    DeepLinkRecord, DescriptorReportResponse, ExpectedTransactionRequest, TrackEventRequest,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

/// A call received by [`MockBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    ConvertDeepLink { company_id: String, url: String },
    OfferCode { company_id: String, code: String, platform: String },
    TrackEvent(TrackEventRequest),
    ExpectedTransaction(ExpectedTransactionRequest),
    DeepLinkData { company_code: String, short_code: String },
    CheckAffiliate(CheckAffiliateRequest),
    Descriptors(serde_json::Value),
}

/// In-process backend with canned answers.
///
/// Unknown inputs produce the same failures the real backend would: missing
/// short links fail, unknown offer codes return the not-found sentinel,
/// unknown affiliates do not exist.
pub struct MockBackend {
    short_links: HashMap<String, String>,
    offer_codes: HashMap<String, String>,
    deep_links: HashMap<String, DeepLinkData>,
    deep_link_status: Option<u16>,
    affiliates: HashMap<String, AffiliateRecord>,
    descriptor_match: Option<String>,
    event_status: u16,
    failing: AtomicBool,
    calls: Mutex<Vec<RecordedCall>>,
    gate: watch::Sender<bool>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            short_links: HashMap::new(),
            offer_codes: HashMap::new(),
            deep_links: HashMap::new(),
            deep_link_status: None,
            affiliates: HashMap::new(),
            descriptor_match: None,
            event_status: 200,
            failing: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            gate,
        }
    }

    /// A backend whose every call fails at the transport level.
    pub fn failing() -> Self {
        let backend = Self::new();
        backend.set_failing(true);
        backend
    }

    pub fn with_short_link(mut self, deep_link_url: &str, short_link: &str) -> Self {
        self.short_links
            .insert(deep_link_url.to_string(), short_link.to_string());
        self
    }

    /// Raw offer-code response text for an affiliate code.
    pub fn with_offer_code(mut self, code: &str, response_text: &str) -> Self {
        self.offer_codes
            .insert(code.to_string(), response_text.to_string());
        self
    }

    /// Map a universal-link short code to the user code the backend returns.
    pub fn with_deep_link(
        mut self,
        short_code: &str,
        user_code: &str,
        email: Option<&str>,
    ) -> Self {
        self.deep_links.insert(
            short_code.to_string(),
            DeepLinkData {
                deep_link: DeepLinkRecord {
                    user_code: user_code.to_string(),
                    affiliate_email: email.map(str::to_string),
                },
                company: Some(CompanyRecord {
                    company_name: Some("Mock Company".to_string()),
                }),
            },
        );
        self
    }

    /// Answer every deep-link lookup with this HTTP status.
    pub fn with_deep_link_status(mut self, status: u16) -> Self {
        self.deep_link_status = Some(status);
        self
    }

    pub fn with_affiliate(mut self, code: &str, name: &str) -> Self {
        self.affiliates.insert(
            code.to_string(),
            AffiliateRecord {
                affiliate_name: name.to_string(),
                affiliate_short_code: code.to_string(),
                deeplink_url: format!("https://insertaffiliate.link/V1/mock/{}", code),
            },
        );
        self
    }

    /// Report a server-side install match for descriptor uploads.
    pub fn with_descriptor_match(mut self, short_code: &str) -> Self {
        self.descriptor_match = Some(short_code.to_string());
        self
    }

    /// Status returned by event and expected-transaction posts.
    pub fn with_event_status(mut self, status: u16) -> Self {
        self.event_status = status;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Hold every call until [`MockBackend::resume`] is called.
    pub fn pause(&self) {
        self.gate.send_replace(false);
    }

    pub fn resume(&self) {
        self.gate.send_replace(true);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock_calls().clone()
    }

    pub fn tracked_events(&self) -> Vec<TrackEventRequest> {
        self.lock_calls()
            .iter()
            .filter_map(|call| match call {
                RecordedCall::TrackEvent(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call, wait for the gate, then fail if configured to.
    async fn enter(&self, call: RecordedCall) -> ClientResult<()> {
        self.lock_calls().push(call);
        let mut open = self.gate.subscribe();
        // the sender lives in self, so the channel cannot close here
        let _ = open.wait_for(|open| *open).await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::Simulated("backend unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AttributionBackend for MockBackend {
    async fn convert_deep_link(
        &self,
        company_id: &str,
        deep_link_url: &str,
    ) -> ClientResult<String> {
        self.enter(RecordedCall::ConvertDeepLink {
            company_id: company_id.to_string(),
            url: deep_link_url.to_string(),
        })
        .await?;
        self.short_links
            .get(deep_link_url)
            .cloned()
            .ok_or(ClientError::MissingField("shortLink"))
    }

    async fn affiliate_offer_code(
        &self,
        company_id: &str,
        affiliate_code: &str,
        platform: &str,
    ) -> ClientResult<String> {
        self.enter(RecordedCall::OfferCode {
            company_id: company_id.to_string(),
            code: affiliate_code.to_string(),
            platform: platform.to_string(),
        })
        .await?;
        Ok(self
            .offer_codes
            .get(affiliate_code)
            .cloned()
            .unwrap_or_else(|| "errorofferCodeNotFound".to_string()))
    }

    async fn track_event(&self, request: &TrackEventRequest) -> ClientResult<u16> {
        self.enter(RecordedCall::TrackEvent(request.clone())).await?;
        Ok(self.event_status)
    }

    async fn create_expected_transaction(
        &self,
        request: &ExpectedTransactionRequest,
    ) -> ClientResult<u16> {
        self.enter(RecordedCall::ExpectedTransaction(request.clone()))
            .await?;
        Ok(self.event_status)
    }

    async fn deep_link_data(
        &self,
        company_code: &str,
        short_code: &str,
    ) -> ClientResult<DeepLinkData> {
        self.enter(RecordedCall::DeepLinkData {
            company_code: company_code.to_string(),
            short_code: short_code.to_string(),
        })
        .await?;
        if let Some(status) = self.deep_link_status {
            return Err(ClientError::Status {
                status,
                body: String::new(),
            });
        }
        self.deep_links.get(short_code).cloned().ok_or(ClientError::Status {
            status: 404,
            body: "Deep link not found".to_string(),
        })
    }

    async fn check_affiliate_exists(
        &self,
        request: &CheckAffiliateRequest,
    ) -> ClientResult<CheckAffiliateResponse> {
        self.enter(RecordedCall::CheckAffiliate(request.clone()))
            .await?;
        let affiliate = self.affiliates.get(&request.affiliate_code).cloned();
        Ok(CheckAffiliateResponse {
            exists: affiliate.is_some(),
            affiliate,
        })
    }

    async fn report_device_descriptors(
        &self,
        descriptors: &serde_json::Value,
    ) -> ClientResult<DescriptorReportResponse> {
        self.enter(RecordedCall::Descriptors(descriptors.clone()))
            .await?;
        Ok(match &self.descriptor_match {
            Some(code) => DescriptorReportResponse {
                match_found: true,
                matched_short_code: Some(code.clone()),
            },
            None => DescriptorReportResponse::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let backend = MockBackend::new().with_short_link("https://x.example/a", "ABC123");
        assert_eq!(
            backend
                .convert_deep_link("ACME01", "https://x.example/a")
                .await
                .unwrap(),
            "ABC123"
        );
        assert!(backend
            .convert_deep_link("ACME01", "https://x.example/missing")
            .await
            .is_err());
        assert_eq!(backend.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failing_backend_still_records() {
        let backend = MockBackend::failing();
        let request = TrackEventRequest {
            event_name: "purchase".into(),
            deep_link_param: "X-0A1B2C".into(),
            company_id: "ACME01".into(),
        };
        assert!(backend.track_event(&request).await.is_err());
        assert_eq!(backend.tracked_events(), vec![request]);
    }

    #[tokio::test]
    async fn test_pause_holds_calls_until_resume() {
        let backend = Arc::new(MockBackend::new());
        backend.pause();

        let pending = {
            let backend = backend.clone();
            tokio::spawn(async move { backend.affiliate_offer_code("A", "B", "ios").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        backend.resume();
        let text = pending.await.unwrap().unwrap();
        assert_eq!(text, "errorofferCodeNotFound");
    }
}
