//! # Insert Affiliate SDK
//!
//! Client-side affiliate attribution: bind a referral code to this device,
//! keep it for the attribution window, and report events and expected
//! purchases against it.
//!
//! ## Components
//!
//! - [`ConfigState`]: settings and the single-initialization guard
//! - [`AttributionStore`]: device id and the stored identifier
//! - [`LinkResolver`]: long links to short codes, offer codes, affiliate lookups
//! - [`DeepLinkRouter`]: inbound custom-scheme and universal links
//! - [`EventReporter`]: events, expected purchases, device descriptors
//!
//! [`InsertAffiliate`] ties them together.
//!
//! ```no_run
//! use insert_affiliate::{InsertAffiliate, SdkSettings};
//!
//! # async fn run() -> insert_affiliate::SdkResult<()> {
//! let sdk = InsertAffiliate::builder().build().await?;
//! sdk.initialize(SdkSettings::new("ACME01").with_links_enabled(true)).await?;
//!
//! sdk.set_insert_affiliate_identifier("PARTNERX").await;
//! sdk.track_event("signup");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod attribution;
mod clock;
mod config;
mod context;
mod device;
mod error;
pub mod logging;
mod reporter;
mod resolver;
mod router;
mod sdk;
mod tasks;
mod telemetry;

pub use attribution::{AttributionStore, IdentifierChangeCallback, StoreOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigSnapshot, ConfigState, Generation};
pub use error::{SdkError, SdkResult};
pub use reporter::EventReporter;
pub use resolver::{clean_offer_code, LinkResolver};
pub use router::{parse_link, DeepLinkRouter, LinkRoute};
pub use sdk::{InsertAffiliate, InsertAffiliateBuilder};
pub use tasks::BackgroundTasks;
pub use telemetry::{DeviceTelemetry, StaticTelemetry};

pub use insert_affiliate_types::{
    AffiliateDetails, AffiliateIdentifier, AttributionRecord, DeepLinkPayload, DeviceId,
    FeatureFlags, SdkSettings, ShortCode, ValidationError, DEFAULT_API_BASE_URL,
    DEFAULT_LINK_DOMAIN,
};
