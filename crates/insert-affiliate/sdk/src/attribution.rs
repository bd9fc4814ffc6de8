//! The attribution store: the single writer for on-device attribution state.
//!
//! All mutations run under one async mutex. Each mutation works on a copy of
//! the state, saves the copy, and only then swaps it in, so a failed write
//! leaves memory and disk in agreement. Idempotence and generation checks
//! happen inside the same critical section as the write.

use crate::clock::Clock;
use crate::config::{ConfigState, Generation};
use crate::device::ensure_device_id;
use crate::error::{SdkError, SdkResult};
use chrono::{DateTime, Utc};
use insert_affiliate_storage::{PersistedState, StateStore};
use insert_affiliate_types::{
    AffiliateIdentifier, AttributionRecord, DeepLinkPayload, DeviceId, FeatureFlags,
    ValidationError,
};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Host callback invoked with the new identifier after it is stored.
pub type IdentifierChangeCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// What a store call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The composed identifier equals the stored one; nothing was written.
    Unchanged(AffiliateIdentifier),
    /// The identifier and its timestamp were replaced.
    Replaced(AffiliateIdentifier),
}

impl StoreOutcome {
    pub fn identifier(&self) -> &AffiliateIdentifier {
        match self {
            Self::Unchanged(id) | Self::Replaced(id) => id,
        }
    }

    pub fn is_replaced(&self) -> bool {
        matches!(self, Self::Replaced(_))
    }
}

pub struct AttributionStore {
    state: Mutex<PersistedState>,
    persistence: Arc<dyn StateStore>,
    config: Arc<ConfigState>,
    clock: Arc<dyn Clock>,
    observer: RwLock<Option<IdentifierChangeCallback>>,
}

impl AttributionStore {
    /// Load persisted state, starting empty if nothing was saved yet.
    pub async fn open(
        persistence: Arc<dyn StateStore>,
        config: Arc<ConfigState>,
        clock: Arc<dyn Clock>,
    ) -> SdkResult<Self> {
        let state = persistence.load().await?.unwrap_or_default();
        debug!(
            has_device_id = state.device_id.is_some(),
            has_identifier = state.affiliate_identifier.is_some(),
            "attribution state loaded"
        );
        Ok(Self {
            state: Mutex::new(state),
            persistence,
            config,
            clock,
            observer: RwLock::new(None),
        })
    }

    pub fn set_observer(&self, callback: Option<IdentifierChangeCallback>) {
        *self.observer.write().unwrap_or_else(|p| p.into_inner()) = callback;
    }

    /// The device id, created and persisted on first use.
    pub async fn device_id(&self) -> SdkResult<DeviceId> {
        self.mutate(None, ensure_device_id).await
    }

    /// Store `code` bound to this device, regardless of configuration changes.
    pub async fn store(&self, code: &str) -> SdkResult<StoreOutcome> {
        self.store_inner(code, None).await
    }

    /// Store `code` only if the configuration is still at `generation`.
    pub async fn store_for_generation(
        &self,
        code: &str,
        generation: Generation,
    ) -> SdkResult<StoreOutcome> {
        self.store_inner(code, Some(generation)).await
    }

    async fn store_inner(
        &self,
        code: &str,
        generation: Option<Generation>,
    ) -> SdkResult<StoreOutcome> {
        if code.trim().is_empty() {
            return Err(ValidationError::EmptyCode.into());
        }
        let now = self.clock.now();
        let outcome = self
            .mutate(generation, |state| {
                let (device_id, created) = ensure_device_id(state);
                let identifier = AffiliateIdentifier::compose(code, &device_id);
                if state.affiliate_identifier.as_ref() == Some(&identifier) {
                    return (StoreOutcome::Unchanged(identifier), created);
                }
                state.set_attribution(identifier.clone(), now);
                // cached extras belong to the previous code
                state.offer_code = None;
                state.deep_link_payload = None;
                (StoreOutcome::Replaced(identifier), true)
            })
            .await?;

        match &outcome {
            StoreOutcome::Replaced(identifier) => {
                info!(identifier = %identifier, "affiliate identifier stored");
                self.notify(identifier);
            }
            StoreOutcome::Unchanged(identifier) => {
                debug!(identifier = %identifier, "identifier unchanged; timestamp kept");
            }
        }
        Ok(outcome)
    }

    /// The stored identifier, or `None` if absent or outside the window.
    pub async fn read(&self, ignore_timeout: bool) -> Option<AffiliateIdentifier> {
        let record = self.record().await?;
        if ignore_timeout {
            return Some(record.identifier);
        }
        let window = self.config.attribution_window();
        if record.active_at(self.clock.now(), window) {
            Some(record.identifier)
        } else {
            debug!(identifier = %record.identifier, "identifier outside attribution window");
            None
        }
    }

    pub async fn record(&self) -> Option<AttributionRecord> {
        self.state.lock().await.attribution()
    }

    pub async fn stored_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.affiliate_stored_at
    }

    pub async fn offer_code(&self) -> Option<String> {
        self.state.lock().await.offer_code.clone()
    }

    /// Cache the offer code for `code`, unless a different code has since
    /// been stored or the configuration moved on.
    pub async fn set_offer_code(
        &self,
        code: &str,
        offer_code: Option<String>,
        generation: Generation,
    ) -> SdkResult<bool> {
        self.mutate(Some(generation), |state| {
            let current = state.affiliate_identifier.as_ref().map(|id| id.code());
            if current != Some(code) {
                debug!(code, "offer code arrived for a replaced identifier; dropping");
                return (false, false);
            }
            let changed = state.offer_code != offer_code;
            state.offer_code = offer_code;
            (true, changed)
        })
        .await
    }

    pub async fn deep_link_payload(&self) -> Option<DeepLinkPayload> {
        self.state.lock().await.deep_link_payload.clone()
    }

    pub async fn set_deep_link_payload(
        &self,
        payload: DeepLinkPayload,
        generation: Generation,
    ) -> SdkResult<()> {
        self.mutate(Some(generation), |state| {
            let changed = state.deep_link_payload.as_ref() != Some(&payload);
            state.deep_link_payload = Some(payload);
            ((), changed)
        })
        .await
    }

    /// The app account token, created and persisted on first use.
    pub async fn app_account_token(&self) -> SdkResult<Uuid> {
        self.mutate(None, |state| match state.app_account_token {
            Some(token) => (token, false),
            None => {
                let token = Uuid::new_v4();
                state.app_account_token = Some(token);
                (token, true)
            }
        })
        .await
    }

    /// Remember the flags from the latest initialization.
    pub async fn record_flags(&self, flags: FeatureFlags) -> SdkResult<()> {
        self.mutate(None, |state| {
            let changed = state.settings.as_ref() != Some(&flags);
            state.settings = Some(flags);
            ((), changed)
        })
        .await
    }

    /// Drop everything except the device id.
    pub async fn clear_attribution(&self) -> SdkResult<()> {
        self.mutate(None, |state| {
            let kept = PersistedState {
                device_id: state.device_id.clone(),
                app_account_token: state.app_account_token,
                settings: state.settings.clone(),
                ..Default::default()
            };
            let changed = *state != kept;
            *state = kept;
            ((), changed)
        })
        .await
    }

    /// Run `f` on a copy of the state and commit the copy if it reports a
    /// change and the save succeeds.
    async fn mutate<R>(
        &self,
        generation: Option<Generation>,
        f: impl FnOnce(&mut PersistedState) -> (R, bool),
    ) -> SdkResult<R> {
        let mut guard = self.state.lock().await;
        if let Some(generation) = generation {
            if !self.config.is_current(generation) {
                debug!(
                    started = generation.value(),
                    current = self.config.generation().value(),
                    "discarding stale write"
                );
                return Err(SdkError::Superseded);
            }
        }
        let mut next = guard.clone();
        let (result, changed) = f(&mut next);
        if changed {
            if let Err(err) = self.persistence.save(&next).await {
                warn!(error = %err, "failed to persist attribution state");
                return Err(err.into());
            }
            *guard = next;
        }
        Ok(result)
    }

    fn notify(&self, identifier: &AffiliateIdentifier) {
        let callback = self
            .observer
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        if let Some(callback) = callback {
            callback(identifier.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;
    use insert_affiliate_storage::InMemoryStateStore;
    use insert_affiliate_types::SdkSettings;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    struct Fixture {
        store: AttributionStore,
        disk: Arc<InMemoryStateStore>,
        config: Arc<ConfigState>,
        clock: Arc<ManualClock>,
    }

    async fn fixture(settings: SdkSettings) -> Fixture {
        let disk = Arc::new(InMemoryStateStore::new());
        let config = Arc::new(ConfigState::new());
        config.initialize(settings).unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
        ));
        let store = AttributionStore::open(disk.clone(), config.clone(), clock.clone())
            .await
            .unwrap();
        Fixture {
            store,
            disk,
            config,
            clock,
        }
    }

    #[tokio::test]
    async fn test_store_composes_with_device_id() {
        let f = fixture(SdkSettings::new("ACME01")).await;
        let outcome = f.store.store("ABC123XYZ0").await.unwrap();
        let device = f.store.device_id().await.unwrap();

        assert!(outcome.is_replaced());
        assert_eq!(
            outcome.identifier().as_str(),
            format!("ABC123XYZ0-{}", device)
        );
        assert_eq!(f.disk.snapshot().unwrap().device_id, Some(device));
    }

    #[tokio::test]
    async fn test_same_code_keeps_timestamp() {
        let f = fixture(SdkSettings::new("ACME01")).await;
        f.store.store("PARTNERX").await.unwrap();
        let first = f.store.stored_at().await;
        let writes = f.disk.writes();

        f.clock.advance(Duration::from_secs(60));
        let outcome = f.store.store("PARTNERX").await.unwrap();

        assert!(!outcome.is_replaced());
        assert_eq!(f.store.stored_at().await, first);
        assert_eq!(f.disk.writes(), writes);
    }

    #[tokio::test]
    async fn test_different_code_replaces_and_clears_offer_code() {
        let f = fixture(SdkSettings::new("ACME01")).await;
        f.store.store("PARTNERX").await.unwrap();
        let generation = f.config.generation();
        assert!(f
            .store
            .set_offer_code("PARTNERX", Some("SPRING25".into()), generation)
            .await
            .unwrap());

        f.clock.advance(Duration::from_secs(5));
        f.store.store("PARTNERY").await.unwrap();

        let record = f.store.record().await.unwrap();
        assert_eq!(record.identifier.code(), "PARTNERY");
        assert_eq!(record.stored_at, Some(f.clock.now()));
        assert_eq!(f.store.offer_code().await, None);
    }

    #[tokio::test]
    async fn test_changed_device_suffix_is_a_new_identifier() {
        let disk = Arc::new(InMemoryStateStore::with_state(PersistedState {
            device_id: Some(DeviceId::parse("0A1B2C").unwrap()),
            affiliate_identifier: Some(AffiliateIdentifier::from_stored("PARTNERX-FFFFFE")),
            affiliate_stored_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        }));
        let config = Arc::new(ConfigState::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        ));
        let store = AttributionStore::open(disk, config, clock.clone())
            .await
            .unwrap();

        let outcome = store.store("PARTNERX").await.unwrap();
        assert!(outcome.is_replaced());
        assert_eq!(outcome.identifier().as_str(), "PARTNERX-0A1B2C");
        assert_eq!(store.stored_at().await, Some(clock.now()));
    }

    #[tokio::test]
    async fn test_window_expiry() {
        let f = fixture(
            SdkSettings::new("ACME01").with_attribution_active_time(Duration::from_secs(10)),
        )
        .await;
        f.store.store("PARTNERX").await.unwrap();

        f.clock.advance(Duration::from_secs(10));
        assert!(f.store.read(false).await.is_some());

        f.clock.advance(Duration::from_secs(1));
        assert!(f.store.read(false).await.is_none());
        assert!(f.store.read(true).await.is_some());
    }

    #[tokio::test]
    async fn test_stale_generation_is_discarded() {
        let f = fixture(SdkSettings::new("ACME01")).await;
        let stale = f.config.generation();
        f.config.reset();

        let err = f
            .store
            .store_for_generation("PARTNERX", stale)
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Superseded));
        assert!(f.store.record().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_untouched() {
        let f = fixture(SdkSettings::new("ACME01")).await;
        f.store.store("PARTNERX").await.unwrap();
        f.disk.set_fail_writes(true);

        assert!(matches!(
            f.store.store("PARTNERY").await,
            Err(SdkError::Storage(_))
        ));
        assert_eq!(f.store.record().await.unwrap().identifier.code(), "PARTNERX");
    }

    #[tokio::test]
    async fn test_blank_code_rejected() {
        let f = fixture(SdkSettings::new("ACME01")).await;
        assert!(matches!(
            f.store.store("  ").await,
            Err(SdkError::Validation(ValidationError::EmptyCode))
        ));
    }

    #[tokio::test]
    async fn test_code_is_stored_verbatim() {
        let f = fixture(SdkSettings::new("ACME01")).await;
        let outcome = f.store.store(" partnerx ").await.unwrap();
        assert!(outcome.identifier().as_str().starts_with(" partnerx -"));
        assert_eq!(outcome.identifier().code(), " partnerx ");
    }

    #[tokio::test]
    async fn test_observer_sees_replacements_only() {
        let f = fixture(SdkSettings::new("ACME01")).await;
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        f.store.set_observer(Some(Arc::new(move |id: &str| {
            sink.lock().unwrap().push(id.to_string())
        })));

        f.store.store("PARTNERX").await.unwrap();
        f.store.store("PARTNERX").await.unwrap();
        f.store.store("PARTNERY").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].starts_with("PARTNERX-"));
        assert!(seen[1].starts_with("PARTNERY-"));
    }

    #[tokio::test]
    async fn test_offer_code_for_replaced_identifier_is_dropped() {
        let f = fixture(SdkSettings::new("ACME01")).await;
        f.store.store("PARTNERX").await.unwrap();
        f.store.store("PARTNERY").await.unwrap();

        let kept = f
            .store
            .set_offer_code("PARTNERX", Some("OLD".into()), f.config.generation())
            .await
            .unwrap();
        assert!(!kept);
        assert_eq!(f.store.offer_code().await, None);
    }

    #[tokio::test]
    async fn test_app_account_token_is_stable() {
        let f = fixture(SdkSettings::new("ACME01")).await;
        let first = f.store.app_account_token().await.unwrap();
        let second = f.store.app_account_token().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(f.disk.snapshot().unwrap().app_account_token, Some(first));
    }

    #[tokio::test]
    async fn test_clear_keeps_device_id() {
        let f = fixture(SdkSettings::new("ACME01")).await;
        f.store.store("PARTNERX").await.unwrap();
        let device = f.store.device_id().await.unwrap();

        f.store.clear_attribution().await.unwrap();
        assert!(f.store.record().await.is_none());
        assert_eq!(f.store.device_id().await.unwrap(), device);
    }
}
