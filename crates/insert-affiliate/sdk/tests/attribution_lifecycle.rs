mod common;

use common::{harness, harness_with, settings};
use insert_affiliate::{Clock, InsertAffiliate, SdkError, SdkSettings, StaticTelemetry};
use insert_affiliate_client::MockBackend;
use insert_affiliate_storage::{InMemoryStateStore, JsonFileStateStore};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn assert_composite(identifier: &str, code: &str) {
    let (head, device) = identifier.rsplit_once('-').expect("composite identifier");
    assert_eq!(head, code);
    assert_eq!(device.len(), 6);
    assert!(device
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)));
}

#[tokio::test]
async fn storing_the_same_code_twice_keeps_the_first_timestamp() {
    let h = harness(MockBackend::new()).await;
    h.sdk.initialize(settings()).await.unwrap();

    h.sdk.store_insert_affiliate_identifier("PARTNERX").await.unwrap();
    let first = h.sdk.affiliate_stored_date().await.unwrap();

    h.clock.advance(Duration::from_secs(3600));
    let outcome = h.sdk.store_insert_affiliate_identifier("PARTNERX").await.unwrap();

    assert!(!outcome.is_replaced());
    assert_eq!(h.sdk.affiliate_stored_date().await, Some(first));
}

#[tokio::test]
async fn storing_a_new_code_replaces_identifier_and_timestamp() {
    let h = harness(MockBackend::new()).await;
    h.sdk.initialize(settings()).await.unwrap();

    h.sdk.store_insert_affiliate_identifier("PARTNERX").await.unwrap();
    h.clock.advance(Duration::from_secs(30));
    h.sdk.store_insert_affiliate_identifier("PARTNERY").await.unwrap();

    let identifier = h.sdk.return_insert_affiliate_identifier(true).await.unwrap();
    assert_composite(&identifier, "PARTNERY");
    assert_eq!(h.sdk.affiliate_stored_date().await, Some(h.clock.now()));
}

#[tokio::test]
async fn device_id_survives_a_restart() {
    let disk = Arc::new(InMemoryStateStore::new());
    let first = harness_with(MockBackend::new(), disk.clone(), StaticTelemetry::new()).await;
    let id = first.sdk.device_id().await.unwrap();
    assert_eq!(first.sdk.device_id().await.unwrap(), id);
    drop(first);

    let second = harness_with(MockBackend::new(), disk, StaticTelemetry::new()).await;
    assert_eq!(second.sdk.device_id().await.unwrap(), id);
}

#[tokio::test]
async fn state_round_trips_through_a_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let sdk = InsertAffiliate::builder()
        .backend(Arc::new(MockBackend::new()))
        .state_store(Arc::new(JsonFileStateStore::new(&path)))
        .build()
        .await
        .unwrap();
    sdk.initialize(settings()).await.unwrap();
    sdk.store_insert_affiliate_identifier("PARTNERX").await.unwrap();
    let identifier = sdk.return_insert_affiliate_identifier(true).await;
    sdk.settle().await;
    drop(sdk);

    let reopened = InsertAffiliate::builder()
        .backend(Arc::new(MockBackend::new()))
        .state_store(Arc::new(JsonFileStateStore::new(&path)))
        .build()
        .await
        .unwrap();
    assert_eq!(reopened.return_insert_affiliate_identifier(true).await, identifier);
}

#[tokio::test]
async fn identifier_expires_after_the_window() {
    let h = harness(MockBackend::new()).await;
    h.sdk
        .initialize(settings().with_attribution_active_time(Duration::from_secs(10)))
        .await
        .unwrap();
    h.sdk.store_insert_affiliate_identifier("PARTNERX").await.unwrap();

    h.clock.advance(Duration::from_secs(10));
    assert!(h.sdk.return_insert_affiliate_identifier(false).await.is_some());
    assert!(h.sdk.is_affiliate_attribution_valid().await);

    h.clock.advance(Duration::from_secs(1));
    assert!(h.sdk.return_insert_affiliate_identifier(false).await.is_none());
    assert!(!h.sdk.is_affiliate_attribution_valid().await);
    assert!(h.sdk.return_insert_affiliate_identifier(true).await.is_some());
}

#[tokio::test]
async fn identifier_never_expires_without_a_window() {
    let h = harness(MockBackend::new()).await;
    h.sdk.initialize(settings()).await.unwrap();
    h.sdk.store_insert_affiliate_identifier("PARTNERX").await.unwrap();

    h.clock.advance(Duration::from_secs(10 * 365 * 24 * 3600));
    assert!(h.sdk.return_insert_affiliate_identifier(false).await.is_some());
}

#[tokio::test]
async fn second_initialize_is_rejected_until_reset() {
    let h = harness(MockBackend::new()).await;
    h.sdk.initialize(settings()).await.unwrap();

    let err = h.sdk.initialize(SdkSettings::new("OTHER")).await.unwrap_err();
    assert!(matches!(err, SdkError::AlreadyInitialized));

    h.sdk.reset();
    assert!(!h.sdk.is_initialized());
    h.sdk.initialize(SdkSettings::new("OTHER")).await.unwrap();
    assert!(h.sdk.is_initialized());
}

#[tokio::test]
async fn short_code_entry_is_validated_and_confirmed() {
    let h = harness(MockBackend::new().with_affiliate("PARTNERX", "Jane")).await;
    h.sdk.initialize(settings()).await.unwrap();

    assert!(!h.sdk.set_short_code("AB").await);
    assert!(!h.sdk.set_short_code("ABC-1").await);
    assert!(!h.sdk.set_short_code(&"A".repeat(26)).await);
    assert!(!h.sdk.set_short_code("UNKNOWN1").await);
    assert!(h.sdk.return_insert_affiliate_identifier(true).await.is_none());

    assert!(h.sdk.set_short_code(" partnerx ").await);
    let identifier = h.sdk.return_insert_affiliate_identifier(true).await.unwrap();
    assert_composite(&identifier, "PARTNERX");
}

#[tokio::test]
async fn affiliate_details_ignore_the_device_suffix() {
    let h = harness(MockBackend::new().with_affiliate("PARTNERX", "Jane")).await;
    h.sdk.initialize(settings()).await.unwrap();

    let details = h.sdk.get_affiliate_details("PARTNERX-0A1B2C").await.unwrap();
    assert_eq!(details.affiliate_name, "Jane");
    assert_eq!(details.affiliate_short_code, "PARTNERX");
    assert!(h.sdk.get_affiliate_details("NOBODY").await.is_none());
}

#[tokio::test]
async fn change_callback_sees_each_new_identifier() {
    let h = harness(MockBackend::new()).await;
    h.sdk.initialize(settings()).await.unwrap();
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = seen.clone();
    h.sdk.set_insert_affiliate_identifier_change_callback(move |id| {
        sink.lock().unwrap().push(id.to_string());
    });

    h.sdk.store_insert_affiliate_identifier("PARTNERX").await.unwrap();
    h.sdk.store_insert_affiliate_identifier("PARTNERX").await.unwrap();
    h.sdk.clear_identifier_change_callback();
    h.sdk.store_insert_affiliate_identifier("PARTNERY").await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_composite(&seen[0], "PARTNERX");
}

#[tokio::test]
async fn clearing_attribution_keeps_the_device() {
    let h = harness(MockBackend::new()).await;
    h.sdk.initialize(settings()).await.unwrap();
    h.sdk.store_insert_affiliate_identifier("PARTNERX").await.unwrap();
    let device = h.sdk.device_id().await.unwrap();

    h.sdk.clear_attribution().await.unwrap();
    assert!(h.sdk.return_insert_affiliate_identifier(true).await.is_none());
    assert_eq!(h.sdk.device_id().await.unwrap(), device);
    assert_eq!(h.disk.snapshot().unwrap().device_id, Some(device));
}

#[tokio::test]
async fn initialize_persists_feature_flags() {
    let h = harness(MockBackend::new()).await;
    h.sdk
        .initialize(settings().with_verbose_logging(true))
        .await
        .unwrap();
    let flags = h.disk.snapshot().unwrap().settings.unwrap();
    assert!(flags.verbose_logging);
    assert!(!flags.links_enabled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_stores_of_one_code_write_once() {
    let h = harness(MockBackend::new()).await;
    h.sdk.initialize(settings()).await.unwrap();
    let writes_before = h.disk.writes();

    let stores: Vec<_> = (0..64)
        .map(|_| {
            let sdk = h.sdk.clone();
            tokio::spawn(async move { sdk.store_insert_affiliate_identifier("PARTNERX").await })
        })
        .collect();

    let mut replaced = 0;
    for store in stores {
        if store.await.unwrap().unwrap().is_replaced() {
            replaced += 1;
        }
    }
    h.sdk.settle().await;

    assert_eq!(replaced, 1);
    assert_eq!(h.disk.writes() - writes_before, 1);
    assert_composite(
        &h.sdk.return_insert_affiliate_identifier(false).await.unwrap(),
        "PARTNERX",
    );
}
