//! Insert Affiliate local persistence.
//!
//! All on-device attribution state is one typed, versioned record
//! ([`PersistedState`]) behind the [`StateStore`] trait:
//! - [`InMemoryStateStore`] for tests and hosts that persist elsewhere
//! - [`JsonFileStateStore`] for a single JSON document on disk
//!
//! Older flat key-value layouts are upgraded on load by [`migration::upgrade`].

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod file;
pub mod memory;
pub mod migration;
mod model;
mod traits;

pub use error::{StorageError, StorageResult};
pub use file::JsonFileStateStore;
pub use memory::InMemoryStateStore;
pub use model::{PersistedState, CURRENT_SCHEMA_VERSION};
pub use traits::StateStore;
