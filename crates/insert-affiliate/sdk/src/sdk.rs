//! The host-facing SDK handle.

use crate::attribution::{AttributionStore, IdentifierChangeCallback, StoreOutcome};
use crate::clock::{Clock, SystemClock};
use crate::config::ConfigState;
use crate::context::SdkContext;
use crate::error::{SdkError, SdkResult};
use crate::reporter::EventReporter;
use crate::resolver::LinkResolver;
use crate::router::DeepLinkRouter;
use crate::telemetry::{DeviceTelemetry, StaticTelemetry};
use chrono::{DateTime, Utc};
use insert_affiliate_client::AttributionBackend;
use insert_affiliate_storage::{InMemoryStateStore, StateStore};
use insert_affiliate_types::{AffiliateDetails, DeepLinkPayload, DeviceId, SdkSettings};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Builder for [`InsertAffiliate`].
///
/// Without a backend, an HTTP backend is created from
/// [`SdkSettings::api_base_url`] at initialization. Without a state store,
/// state lives in memory only.
#[derive(Default)]
pub struct InsertAffiliateBuilder {
    state_store: Option<Arc<dyn StateStore>>,
    backend: Option<Arc<dyn AttributionBackend>>,
    telemetry: Option<Arc<dyn DeviceTelemetry>>,
    clock: Option<Arc<dyn Clock>>,
}

impl InsertAffiliateBuilder {
    pub fn state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.state_store = Some(store);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn AttributionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn telemetry(mut self, telemetry: Arc<dyn DeviceTelemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Load persisted state and assemble the SDK. The SDK starts
    /// uninitialized.
    pub async fn build(self) -> SdkResult<InsertAffiliate> {
        let config = Arc::new(ConfigState::new());
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let state_store = self
            .state_store
            .unwrap_or_else(|| Arc::new(InMemoryStateStore::new()));
        let attribution = AttributionStore::open(state_store, config.clone(), clock.clone()).await?;
        let telemetry = self
            .telemetry
            .unwrap_or_else(|| Arc::new(StaticTelemetry::new()));

        let ctx = Arc::new(SdkContext::new(
            config,
            attribution,
            telemetry,
            clock,
            self.backend,
        ));
        let resolver = LinkResolver::new(ctx.clone());
        Ok(InsertAffiliate {
            router: DeepLinkRouter::new(ctx.clone(), resolver.clone()),
            reporter: EventReporter::new(ctx.clone(), resolver.clone()),
            resolver,
            ctx,
        })
    }
}

/// An SDK instance. Cheap to clone; clones share all state.
///
/// Methods that return plain values rather than `SdkResult` log failures
/// and degrade to a no-op.
#[derive(Clone)]
pub struct InsertAffiliate {
    ctx: Arc<SdkContext>,
    resolver: LinkResolver,
    router: DeepLinkRouter,
    reporter: EventReporter,
}

impl InsertAffiliate {
    pub fn builder() -> InsertAffiliateBuilder {
        InsertAffiliateBuilder::default()
    }

    /// Apply host settings. A second call fails until [`InsertAffiliate::reset`].
    ///
    /// With insert links enabled, device descriptors are reported in the
    /// background.
    pub async fn initialize(&self, settings: SdkSettings) -> SdkResult<()> {
        if self.ctx.config.is_initialized() {
            warn!("initialize called twice; ignoring the second call");
            return Err(SdkError::AlreadyInitialized);
        }
        // installed before the config reports initialized
        let prepared = self.ctx.prepare_backend(&settings.api_base_url)?;
        self.ctx.install_backend(prepared);
        let flags = settings.flags();
        let links_enabled = settings.links_enabled;
        self.ctx.config.initialize(settings)?;

        if let Err(err) = self.ctx.attribution.record_flags(flags).await {
            warn!(error = %err, "failed to persist feature flags");
        }

        if links_enabled {
            let reporter = self.reporter.clone();
            self.ctx.tasks.spawn(async move {
                match reporter.report_device_descriptors().await {
                    Ok(Some(outcome)) => {
                        debug!(identifier = %outcome.identifier(), "install match stored")
                    }
                    Ok(None) => {}
                    Err(err) => warn!(error = %err, "device descriptor report failed"),
                }
            });
        }
        Ok(())
    }

    /// Clear the configuration so the SDK can be initialized again. Work
    /// started before the reset is discarded when it completes.
    pub fn reset(&self) {
        self.ctx.config.reset();
    }

    pub fn is_initialized(&self) -> bool {
        self.ctx.config.is_initialized()
    }

    pub fn resolver(&self) -> &LinkResolver {
        &self.resolver
    }

    pub fn router(&self) -> &DeepLinkRouter {
        &self.router
    }

    pub fn events(&self) -> &EventReporter {
        &self.reporter
    }

    /// The per-install device id, created on first use.
    pub async fn device_id(&self) -> SdkResult<DeviceId> {
        self.ctx.attribution.device_id().await
    }

    /// Store a code directly, without resolving or validating it.
    pub async fn store_insert_affiliate_identifier(&self, code: &str) -> SdkResult<StoreOutcome> {
        let generation = self.ctx.config.generation();
        self.resolver.commit(code, generation).await
    }

    /// Resolve a referral link and store the result. Returns the short link
    /// when resolution succeeded.
    pub async fn set_insert_affiliate_identifier(&self, referring_link: &str) -> Option<String> {
        match self.resolver.resolve(referring_link).await {
            Ok(short_link) => short_link,
            Err(err) => {
                warn!(error = %err, "could not set affiliate identifier");
                None
            }
        }
    }

    /// Validate, confirm and store a user-entered short code.
    pub async fn set_short_code(&self, code: &str) -> bool {
        match self.resolver.set_short_code(code).await {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "short code not set");
                false
            }
        }
    }

    /// The active identifier. With `ignore_timeout`, the attribution window
    /// is not applied.
    pub async fn return_insert_affiliate_identifier(&self, ignore_timeout: bool) -> Option<String> {
        self.ctx
            .attribution
            .read(ignore_timeout)
            .await
            .map(|id| id.into_string())
    }

    pub async fn affiliate_stored_date(&self) -> Option<DateTime<Utc>> {
        self.ctx.attribution.stored_at().await
    }

    /// Whether the stored identifier is still inside the attribution window.
    pub async fn is_affiliate_attribution_valid(&self) -> bool {
        self.ctx.attribution.read(false).await.is_some()
    }

    /// Report an event in the background.
    pub fn track_event(&self, event_name: &str) -> bool {
        let reporter = self.reporter.clone();
        let event_name = event_name.to_string();
        self.ctx.tasks.spawn(async move {
            if let Err(err) = reporter.track_event(&event_name).await {
                warn!(event = %event_name, error = %err, "event not tracked");
            }
        })
    }

    pub fn handle_insert_links(&self, url: &str) -> bool {
        self.router.handle_insert_links(url)
    }

    pub async fn get_affiliate_details(&self, code: &str) -> Option<AffiliateDetails> {
        match self.resolver.get_affiliate_details(code).await {
            Ok(details) => details,
            Err(err) => {
                warn!(error = %err, "affiliate lookup failed");
                None
            }
        }
    }

    /// The cached offer code for the stored identifier.
    pub async fn offer_code(&self) -> Option<String> {
        self.ctx.attribution.offer_code().await
    }

    /// Re-fetch the offer code for the stored identifier and cache it.
    pub async fn fetch_and_store_offer_code(&self) -> SdkResult<Option<String>> {
        self.resolver.refresh_offer_code().await
    }

    /// Data from the most recent universal-link lookup.
    pub async fn deep_link_payload(&self) -> Option<DeepLinkPayload> {
        self.ctx.attribution.deep_link_payload().await
    }

    pub fn set_insert_affiliate_identifier_change_callback<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let callback: IdentifierChangeCallback = Arc::new(callback);
        self.ctx.attribution.set_observer(Some(callback));
    }

    pub fn clear_identifier_change_callback(&self) {
        self.ctx.attribution.set_observer(None);
    }

    /// The persisted app account token, after telling the backend to expect
    /// a purchase from this identifier. `None` without an active identifier
    /// or company code.
    pub async fn return_user_account_token_and_store_expected_transaction(&self) -> Option<Uuid> {
        match self.reporter.account_token_with_expected_purchase().await {
            Ok(token) => Some(token),
            Err(SdkError::NoAffiliateIdentifier) => {
                debug!("no affiliate identifier; no account token issued");
                None
            }
            Err(err) => {
                warn!(error = %err, "could not issue account token");
                None
            }
        }
    }

    /// Remove the stored identifier and everything cached for it. The device
    /// id is kept.
    pub async fn clear_attribution(&self) -> SdkResult<()> {
        self.ctx.attribution.clear_attribution().await
    }

    /// Wait for all background work spawned so far to finish.
    pub async fn settle(&self) {
        self.ctx.tasks.settle().await;
    }
}
