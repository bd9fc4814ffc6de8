//! Referral resolution: long links to short codes, offer codes, and
//! affiliate lookups.

use crate::attribution::StoreOutcome;
use crate::config::Generation;
use crate::context::SdkContext;
use crate::error::{SdkError, SdkResult};
use crate::logging::verbose;
use insert_affiliate_client::{CheckAffiliateRequest, ClientError, PLATFORM_TYPE};
use insert_affiliate_types::{is_short_code, strip_device_suffix, AffiliateDetails, ShortCode};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Offer-code responses the backend uses to mean "no offer".
const OFFER_CODE_SENTINELS: &[&str] = &[
    "errorofferCodeNotFound",
    "errorAffiliateoffercodenotfoundinanycompany",
    "errorAffiliateoffercodenotfoundinanycompanyAffiliatelinkwas",
    "Routenotfound",
];

/// Reduce a raw offer-code response to its code, or `None` for sentinels
/// and empty bodies.
///
/// Everything except alphanumerics and underscores is removed first, which
/// strips JSON quoting and trailing newlines.
pub fn clean_offer_code(raw: &str) -> Option<String> {
    let cleaned = strip_offer_code(raw);
    if cleaned.is_empty() || is_sentinel(&cleaned) {
        return None;
    }
    Some(cleaned)
}

fn strip_offer_code(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

fn is_sentinel(cleaned: &str) -> bool {
    OFFER_CODE_SENTINELS.iter().any(|s| cleaned.contains(s))
}

#[derive(Clone)]
pub struct LinkResolver {
    ctx: Arc<SdkContext>,
}

impl LinkResolver {
    pub(crate) fn new(ctx: Arc<SdkContext>) -> Self {
        Self { ctx }
    }

    /// Resolve a referral link and store the result.
    ///
    /// Short codes are stored as given. Anything else goes through the
    /// backend's short-link conversion; if that fails the raw link is stored
    /// instead and `Ok(None)` is returned.
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve(&self, referring_link: &str) -> SdkResult<Option<String>> {
        let snapshot = self.ctx.config.require()?;
        let company_code = snapshot.require_company_code()?;
        let referring_link = referring_link.trim();

        if is_short_code(referring_link) {
            verbose!(self.ctx, code = referring_link, "referral is already a short code");
            self.commit(referring_link, snapshot.generation).await?;
            return Ok(Some(referring_link.to_string()));
        }

        let converted = match self.ctx.backend() {
            Ok(backend) => backend
                .convert_deep_link(company_code, referring_link)
                .await
                .map_err(SdkError::from),
            Err(err) => Err(err),
        };
        match converted {
            Ok(short_link) => {
                verbose!(self.ctx, short_link = %short_link, "referral link converted");
                self.commit(&short_link, snapshot.generation).await?;
                Ok(Some(short_link))
            }
            Err(err) => {
                warn!(error = %err, "short link conversion failed; storing the raw link");
                self.commit(referring_link, snapshot.generation).await?;
                Ok(None)
            }
        }
    }

    /// Fetch the offer code for `affiliate_link` without storing it.
    pub async fn fetch_offer_code(&self, affiliate_link: &str) -> SdkResult<Option<String>> {
        let snapshot = self.ctx.config.require()?;
        let company_code = snapshot.require_company_code()?;
        let response = self
            .ctx
            .backend()?
            .affiliate_offer_code(company_code, affiliate_link, PLATFORM_TYPE)
            .await;
        let raw = match response {
            Ok(raw) => raw,
            // not-found markers also arrive with error statuses
            Err(ClientError::Status { status, body }) if is_sentinel(&strip_offer_code(&body)) => {
                verbose!(self.ctx, link = affiliate_link, status, "no offer code for link");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        let offer_code = clean_offer_code(&raw);
        verbose!(self.ctx, link = affiliate_link, offer_code = ?offer_code, "offer code fetched");
        Ok(offer_code)
    }

    /// Fetch and cache the offer code for the currently stored identifier.
    pub async fn refresh_offer_code(&self) -> SdkResult<Option<String>> {
        let generation = self.ctx.config.generation();
        let record = self
            .ctx
            .attribution
            .record()
            .await
            .ok_or(SdkError::NoAffiliateIdentifier)?;
        let code = record.identifier.code().to_string();
        let offer_code = self.fetch_offer_code(&code).await?;
        self.ctx
            .attribution
            .set_offer_code(&code, offer_code.clone(), generation)
            .await?;
        Ok(offer_code)
    }

    /// Look up an affiliate by code. A trailing device id suffix is ignored.
    pub async fn get_affiliate_details(&self, code: &str) -> SdkResult<Option<AffiliateDetails>> {
        let snapshot = self.ctx.config.require()?;
        let company_code = snapshot.require_company_code()?;
        let affiliate_code = strip_device_suffix(code.trim());

        let response = self
            .ctx
            .backend()?
            .check_affiliate_exists(&CheckAffiliateRequest {
                company_id: company_code.to_string(),
                affiliate_code: affiliate_code.to_string(),
            })
            .await?;

        if !response.exists {
            debug!(affiliate_code, "affiliate does not exist");
            return Ok(None);
        }
        Ok(response.affiliate.map(|a| AffiliateDetails {
            affiliate_name: a.affiliate_name,
            affiliate_short_code: a.affiliate_short_code,
            deeplink_url: a.deeplink_url,
        }))
    }

    /// Validate a user-entered code, confirm it with the backend, and store it.
    pub async fn set_short_code(&self, code: &str) -> SdkResult<ShortCode> {
        let short_code = ShortCode::normalized(code)?;
        let generation = self.ctx.config.require()?.generation;

        match self.get_affiliate_details(short_code.as_str()).await? {
            Some(details) => {
                verbose!(
                    self.ctx,
                    code = %short_code,
                    affiliate = %details.affiliate_name,
                    "short code confirmed"
                );
                self.commit(short_code.as_str(), generation).await?;
                Ok(short_code)
            }
            None => Err(SdkError::AffiliateNotFound(short_code.into())),
        }
    }

    /// Store `code` under `generation` and, when it replaced the previous
    /// identifier and is a short code, refresh the offer code in the background.
    pub(crate) async fn commit(
        &self,
        code: &str,
        generation: Generation,
    ) -> SdkResult<StoreOutcome> {
        let outcome = self
            .ctx
            .attribution
            .store_for_generation(code, generation)
            .await?;
        if outcome.is_replaced() && is_short_code(code) {
            self.spawn_offer_code_refresh(code.to_string(), generation);
        }
        Ok(outcome)
    }

    fn spawn_offer_code_refresh(&self, code: String, generation: Generation) {
        let resolver = self.clone();
        self.ctx.tasks.spawn(async move {
            let offer_code = match resolver.fetch_offer_code(&code).await {
                Ok(offer_code) => offer_code,
                Err(err) => {
                    warn!(code = %code, error = %err, "offer code lookup failed");
                    return;
                }
            };
            if let Err(err) = resolver
                .ctx
                .attribution
                .set_offer_code(&code, offer_code, generation)
                .await
            {
                debug!(code = %code, error = %err, "offer code not stored");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::AttributionStore;
    use crate::clock::ManualClock;
    use crate::config::ConfigState;
    use crate::telemetry::StaticTelemetry;
    use insert_affiliate_storage::InMemoryStateStore;
    use insert_affiliate_types::SdkSettings;

    async fn resolver_without_backend() -> LinkResolver {
        let config = Arc::new(ConfigState::new());
        config.initialize(SdkSettings::new("ACME01")).unwrap();
        let clock = Arc::new(ManualClock::default());
        let attribution = AttributionStore::open(
            Arc::new(InMemoryStateStore::new()),
            config.clone(),
            clock.clone(),
        )
        .await
        .unwrap();
        let ctx = SdkContext::new(
            config,
            attribution,
            Arc::new(StaticTelemetry::new()),
            clock,
            None,
        );
        LinkResolver::new(Arc::new(ctx))
    }

    #[tokio::test]
    async fn test_resolve_without_backend_stores_raw_link() {
        let resolver = resolver_without_backend().await;
        let link = "https://shop.example/campaign?ref=jane";

        assert_eq!(resolver.resolve(link).await.unwrap(), None);
        let stored = resolver.ctx.attribution.read(true).await.unwrap();
        assert_eq!(stored.code(), link);
    }

    #[test]
    fn test_clean_offer_code_strips_quotes_and_whitespace() {
        assert_eq!(clean_offer_code("\"SPRING_25\"\n"), Some("SPRING_25".into()));
        assert_eq!(clean_offer_code("  abc-123 "), Some("abc123".into()));
    }

    #[test]
    fn test_clean_offer_code_sentinels() {
        assert_eq!(clean_offer_code("errorofferCodeNotFound"), None);
        assert_eq!(
            clean_offer_code("\"errorAffiliateoffercodenotfoundinanycompany\""),
            None
        );
        assert_eq!(
            clean_offer_code("errorAffiliateoffercodenotfoundinanycompanyAffiliatelinkwas ABC"),
            None
        );
        assert_eq!(clean_offer_code("Route not found"), None);
        assert_eq!(clean_offer_code(""), None);
        assert_eq!(clean_offer_code("\"\"\n"), None);
    }
}
