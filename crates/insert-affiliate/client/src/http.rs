//! reqwest implementation of [`AttributionBackend`].

use crate::api::AttributionBackend;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    CheckAffiliateRequest, CheckAffiliateResponse, ConvertDeepLinkResponse, DeepLinkData,
    DeepLinkDataEnvelope, DescriptorReportResponse, ExpectedTransactionRequest,
    TrackEventRequest,
};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the attribution backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Self::with_client(client, base_url)
    }

    /// Use a preconfigured reqwest client (proxies, custom TLS, timeouts).
    pub fn with_client(client: Client, base_url: &str) -> ClientResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(format!(
                "{} cannot be used as a base URL",
                base_url
            )));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post_json<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> ClientResult<Response> {
        Ok(self.client.post(url).json(body).send().await?)
    }
}

/// Read a successful response body, or turn the status into an error.
async fn success_text(response: Response) -> ClientResult<String> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

async fn success_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let body = success_text(response).await?;
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl AttributionBackend for HttpBackend {
    #[instrument(skip(self), level = "debug")]
    async fn convert_deep_link(
        &self,
        company_id: &str,
        deep_link_url: &str,
    ) -> ClientResult<String> {
        let url = self.endpoint(&["V1", "convert-deep-link-to-short-link"])?;
        let response = self
            .client
            .get(url)
            .query(&[("companyId", company_id), ("deepLinkUrl", deep_link_url)])
            .send()
            .await?;
        let parsed: ConvertDeepLinkResponse = success_json(response).await?;
        parsed
            .short_link
            .filter(|link| !link.is_empty())
            .ok_or(ClientError::MissingField("shortLink"))
    }

    #[instrument(skip(self), level = "debug")]
    async fn affiliate_offer_code(
        &self,
        company_id: &str,
        affiliate_code: &str,
        platform: &str,
    ) -> ClientResult<String> {
        let url = self.endpoint(&["v1", "affiliateReturnOfferCode", company_id, affiliate_code])?;
        let response = self
            .client
            .get(url)
            .query(&[("platformType", platform)])
            .send()
            .await?;
        success_text(response).await
    }

    async fn track_event(&self, request: &TrackEventRequest) -> ClientResult<u16> {
        let url = self.endpoint(&["v1", "trackEvent"])?;
        let status = self.post_json(url, request).await?.status().as_u16();
        debug!(status, event = %request.event_name, "track event sent");
        Ok(status)
    }

    async fn create_expected_transaction(
        &self,
        request: &ExpectedTransactionRequest,
    ) -> ClientResult<u16> {
        let url = self.endpoint(&[
            "v1",
            "api",
            "app-store-webhook",
            "create-expected-transaction",
        ])?;
        Ok(self.post_json(url, request).await?.status().as_u16())
    }

    #[instrument(skip(self), level = "debug")]
    async fn deep_link_data(
        &self,
        company_code: &str,
        short_code: &str,
    ) -> ClientResult<DeepLinkData> {
        let url = self.endpoint(&["V1", "getDeepLinkData", company_code, short_code])?;
        let response = self.client.get(url).send().await?;
        let envelope: DeepLinkDataEnvelope = success_json(response).await?;
        match (envelope.data, envelope.error) {
            (Some(data), _) => Ok(data),
            (None, Some(message)) => Err(ClientError::Api(message)),
            (None, None) => Err(ClientError::MissingField("data")),
        }
    }

    async fn check_affiliate_exists(
        &self,
        request: &CheckAffiliateRequest,
    ) -> ClientResult<CheckAffiliateResponse> {
        let url = self.endpoint(&["V1", "checkAffiliateExists"])?;
        success_json(self.post_json(url, request).await?).await
    }

    async fn report_device_descriptors(
        &self,
        descriptors: &serde_json::Value,
    ) -> ClientResult<DescriptorReportResponse> {
        let url = self.endpoint(&["V1", "appDeepLinkEvents"])?;
        let body = success_text(self.post_json(url, descriptors).await?).await?;
        // The match fields are optional; a plain acknowledgement is not an error.
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalization() {
        let backend = HttpBackend::new("https://api.insertaffiliate.com/").unwrap();
        let url = backend.endpoint(&["V1", "checkAffiliateExists"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.insertaffiliate.com/V1/checkAffiliateExists"
        );
    }

    #[test]
    fn test_segments_are_percent_encoded() {
        let backend = HttpBackend::new("https://api.insertaffiliate.com").unwrap();
        let url = backend
            .endpoint(&["v1", "affiliateReturnOfferCode", "ACME01", "a/b c?"])
            .unwrap();
        assert_eq!(url.path(), "/v1/affiliateReturnOfferCode/ACME01/a%2Fb%20c%3F");
    }

    #[test]
    fn test_base_with_prefix_path() {
        let backend = HttpBackend::new("http://localhost:9000/staging").unwrap();
        let url = backend.endpoint(&["v1", "trackEvent"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/staging/v1/trackEvent");
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(HttpBackend::new("mailto:someone@example.com").is_err());
        assert!(HttpBackend::new("not a url").is_err());
    }
}
