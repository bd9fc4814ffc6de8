//! Insert Affiliate backend client.
//!
//! [`AttributionBackend`] is the contract the SDK core needs from the
//! attribution backend: send JSON, get JSON or text back, plus a status code.
//! [`HttpBackend`] implements it over reqwest; [`MockBackend`] is an
//! in-process double that records every call.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod api;
mod error;
pub mod http;
pub mod mock;
pub mod models;

pub use api::AttributionBackend;
pub use error::{ClientError, ClientResult};
pub use http::HttpBackend;
pub use mock::{MockBackend, RecordedCall};
pub use models::{
    AffiliateRecord, CheckAffiliateRequest, CheckAffiliateResponse, CompanyRecord, DeepLinkData,
    DeepLinkRecord, DescriptorReportResponse, ExpectedTransactionRequest, TrackEventRequest,
    PLATFORM_TYPE,
};
