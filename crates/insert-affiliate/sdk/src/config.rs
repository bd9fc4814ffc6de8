//! Process-wide SDK configuration with a single-initialization guard.
//!
//! Every `initialize` and `reset` bumps a [`Generation`]. Asynchronous work
//! captures the generation it started under and its results are discarded
//! if the configuration moved on before they land.

use crate::error::{SdkError, SdkResult};
use insert_affiliate_types::SdkSettings;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{info, warn};

/// Monotonic configuration epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// An initialized configuration together with the generation it belongs to.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub settings: SdkSettings,
    pub generation: Generation,
}

impl ConfigSnapshot {
    pub fn company_code(&self) -> Option<&str> {
        self.settings.company_code()
    }

    /// The company code, or `MissingCompanyCode` in degraded mode.
    pub fn require_company_code(&self) -> SdkResult<&str> {
        self.company_code().ok_or(SdkError::MissingCompanyCode)
    }
}

#[derive(Debug, Default)]
struct Inner {
    settings: Option<SdkSettings>,
    generation: Generation,
}

#[derive(Debug, Default)]
pub struct ConfigState {
    inner: RwLock<Inner>,
}

impl ConfigState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install settings. Fails if already initialized; the existing settings
    /// are left untouched.
    pub fn initialize(&self, settings: SdkSettings) -> SdkResult<Generation> {
        let mut inner = self.write();
        if inner.settings.is_some() {
            warn!("initialize called twice; ignoring the second call");
            return Err(SdkError::AlreadyInitialized);
        }
        if settings.company_code().is_none() {
            warn!("no company code provided; attribution calls will be no-ops");
        }
        inner.generation = inner.generation.next();
        inner.settings = Some(settings);
        info!(generation = inner.generation.value(), "SDK initialized");
        Ok(inner.generation)
    }

    /// Drop the settings so the SDK can be initialized again.
    pub fn reset(&self) -> Generation {
        let mut inner = self.write();
        inner.settings = None;
        inner.generation = inner.generation.next();
        info!(generation = inner.generation.value(), "SDK configuration reset");
        inner.generation
    }

    pub fn is_initialized(&self) -> bool {
        self.read().settings.is_some()
    }

    pub fn generation(&self) -> Generation {
        self.read().generation
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.read().generation == generation
    }

    pub fn snapshot(&self) -> Option<ConfigSnapshot> {
        let inner = self.read();
        inner.settings.clone().map(|settings| ConfigSnapshot {
            settings,
            generation: inner.generation,
        })
    }

    /// Like [`ConfigState::snapshot`], but `NotInitialized` when unset.
    pub fn require(&self) -> SdkResult<ConfigSnapshot> {
        self.snapshot().ok_or(SdkError::NotInitialized)
    }

    pub fn company_code(&self) -> Option<String> {
        self.read()
            .settings
            .as_ref()
            .and_then(|s| s.company_code().map(str::to_string))
    }

    /// The attribution window; `None` when unset or not initialized.
    pub fn attribution_window(&self) -> Option<Duration> {
        self.read()
            .settings
            .as_ref()
            .and_then(|s| s.attribution_active_time)
    }

    pub fn verbose_logging(&self) -> bool {
        self.read()
            .settings
            .as_ref()
            .is_some_and(|s| s.verbose_logging)
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }
}
