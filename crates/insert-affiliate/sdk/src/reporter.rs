//! Outbound reporting: custom events, expected purchases, and device
//! descriptors for install matching.

use crate::attribution::StoreOutcome;
use crate::context::SdkContext;
use crate::error::{SdkError, SdkResult};
use crate::logging::verbose;
use crate::resolver::LinkResolver;
use chrono::SecondsFormat;
use insert_affiliate_client::{ExpectedTransactionRequest, TrackEventRequest};
use insert_affiliate_types::AffiliateIdentifier;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct EventReporter {
    ctx: Arc<SdkContext>,
    resolver: LinkResolver,
}

impl EventReporter {
    pub(crate) fn new(ctx: Arc<SdkContext>, resolver: LinkResolver) -> Self {
        Self { ctx, resolver }
    }

    /// Report a named event against the active identifier.
    ///
    /// Fails with `NoAffiliateIdentifier` when nothing active is stored and
    /// `MissingCompanyCode` in degraded mode; in both cases nothing is sent.
    #[instrument(skip(self), level = "debug")]
    pub async fn track_event(&self, event_name: &str) -> SdkResult<u16> {
        let (identifier, company_code) = self.attribution_context().await?;
        let request = TrackEventRequest {
            event_name: event_name.to_string(),
            deep_link_param: identifier.into_string(),
            company_id: company_code,
        };
        let status = self.ctx.backend()?.track_event(&request).await?;
        if status == 200 {
            info!(event = event_name, "event tracked");
        } else {
            warn!(event = event_name, status, "event tracking was not accepted");
        }
        Ok(status)
    }

    /// Tell the backend to expect a store transaction carrying `token`.
    pub async fn store_expected_purchase(&self, token: Uuid) -> SdkResult<u16> {
        let (identifier, company_code) = self.attribution_context().await?;
        let request = ExpectedTransactionRequest {
            uuid: token.to_string().to_uppercase(),
            company_code,
            short_code: identifier.into_string(),
            stored_date: self
                .ctx
                .clock
                .now()
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        let status = self
            .ctx
            .backend()?
            .create_expected_transaction(&request)
            .await?;
        if status == 200 {
            verbose!(self.ctx, uuid = %request.uuid, "expected transaction stored");
        } else {
            warn!(status, uuid = %request.uuid, "expected transaction was not accepted");
        }
        Ok(status)
    }

    /// The persisted app account token plus an expected-transaction report.
    ///
    /// The report is best effort: a failure is logged and the token is still
    /// returned, since the host needs it for the purchase either way.
    pub async fn account_token_with_expected_purchase(&self) -> SdkResult<Uuid> {
        self.attribution_context().await?;
        let token = self.ctx.attribution.app_account_token().await?;
        if let Err(err) = self.store_expected_purchase(token).await {
            warn!(error = %err, "failed to report expected transaction");
        }
        Ok(token)
    }

    /// Upload the device descriptor bundle and store any server-side match.
    ///
    /// Only runs when insert links are enabled. `Ok(None)` means no match.
    pub async fn report_device_descriptors(&self) -> SdkResult<Option<StoreOutcome>> {
        let snapshot = self.ctx.config.require()?;
        if !snapshot.settings.links_enabled {
            debug!("insert links disabled; skipping descriptor report");
            return Ok(None);
        }

        let device_id = self.ctx.attribution.device_id().await?;
        let mut bundle = self.ctx.telemetry.collect();
        bundle.insert(
            "shortUniqueDeviceID".to_string(),
            Value::from(device_id.as_str()),
        );
        if let Some(company_code) = snapshot.company_code() {
            bundle.insert("companyCode".to_string(), Value::from(company_code));
        }
        if snapshot.settings.clipboard_enabled {
            if let Some(text) = self.ctx.telemetry.clipboard_text() {
                bundle.insert("clipboardID".to_string(), Value::from(text));
            }
        }
        verbose!(self.ctx, fields = bundle.len(), "reporting device descriptors");

        let response = self
            .ctx
            .backend()?
            .report_device_descriptors(&Value::Object(bundle))
            .await?;
        let Some(matched) = response.matched() else {
            debug!("no install match for this device");
            return Ok(None);
        };
        info!(short_code = matched, "install matched to affiliate");
        let outcome = self.resolver.commit(matched, snapshot.generation).await?;
        Ok(Some(outcome))
    }

    async fn attribution_context(&self) -> SdkResult<(AffiliateIdentifier, String)> {
        let identifier = self
            .ctx
            .attribution
            .read(false)
            .await
            .ok_or(SdkError::NoAffiliateIdentifier)?;
        let company_code = self
            .ctx
            .config
            .company_code()
            .ok_or(SdkError::MissingCompanyCode)?;
        Ok((identifier, company_code))
    }
}
