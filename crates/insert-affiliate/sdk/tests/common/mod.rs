#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use insert_affiliate::{InsertAffiliate, ManualClock, SdkSettings, StaticTelemetry};
use insert_affiliate_client::{MockBackend, RecordedCall};
use insert_affiliate_storage::InMemoryStateStore;
use std::sync::Arc;
use std::time::Duration;

pub const COMPANY: &str = "ACME01";

pub struct Harness {
    pub sdk: InsertAffiliate,
    pub backend: Arc<MockBackend>,
    pub disk: Arc<InMemoryStateStore>,
    pub clock: Arc<ManualClock>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

pub fn settings() -> SdkSettings {
    SdkSettings::new(COMPANY)
}

pub async fn harness(backend: MockBackend) -> Harness {
    harness_with(backend, Arc::new(InMemoryStateStore::new()), StaticTelemetry::new()).await
}

pub async fn harness_with(
    backend: MockBackend,
    disk: Arc<InMemoryStateStore>,
    telemetry: StaticTelemetry,
) -> Harness {
    let backend = Arc::new(backend);
    let clock = Arc::new(ManualClock::new(start_time()));
    let sdk = InsertAffiliate::builder()
        .backend(backend.clone())
        .state_store(disk.clone())
        .telemetry(Arc::new(telemetry))
        .clock(clock.clone())
        .build()
        .await
        .unwrap();
    Harness {
        sdk,
        backend,
        disk,
        clock,
    }
}

/// Poll until the backend has recorded a call matching `pred`.
pub async fn wait_for_call(backend: &MockBackend, pred: impl Fn(&RecordedCall) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !backend.calls().iter().any(&pred) {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("backend call never arrived");
}
