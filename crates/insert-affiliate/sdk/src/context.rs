use crate::attribution::AttributionStore;
use crate::clock::Clock;
use crate::config::ConfigState;
use crate::error::{SdkError, SdkResult};
use crate::tasks::BackgroundTasks;
use crate::telemetry::DeviceTelemetry;
use insert_affiliate_client::{AttributionBackend, HttpBackend};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// State shared by every component of one SDK instance.
pub(crate) struct SdkContext {
    pub(crate) config: Arc<ConfigState>,
    pub(crate) attribution: AttributionStore,
    pub(crate) telemetry: Arc<dyn DeviceTelemetry>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) tasks: BackgroundTasks,
    /// Set by the host at build time; wins over the configured base URL.
    injected_backend: Option<Arc<dyn AttributionBackend>>,
    configured_backend: RwLock<Option<Arc<dyn AttributionBackend>>>,
}

impl SdkContext {
    pub(crate) fn new(
        config: Arc<ConfigState>,
        attribution: AttributionStore,
        telemetry: Arc<dyn DeviceTelemetry>,
        clock: Arc<dyn Clock>,
        backend: Option<Arc<dyn AttributionBackend>>,
    ) -> Self {
        Self {
            config,
            attribution,
            telemetry,
            clock,
            tasks: BackgroundTasks::new(),
            injected_backend: backend,
            configured_backend: RwLock::new(None),
        }
    }

    pub(crate) fn backend(&self) -> SdkResult<Arc<dyn AttributionBackend>> {
        if let Some(backend) = &self.injected_backend {
            return Ok(backend.clone());
        }
        self.configured_backend
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .ok_or(SdkError::NotInitialized)
    }

    /// Build an HTTP backend for `base_url` unless one was injected.
    pub(crate) fn prepare_backend(
        &self,
        base_url: &str,
    ) -> SdkResult<Option<Arc<dyn AttributionBackend>>> {
        if self.injected_backend.is_some() {
            return Ok(None);
        }
        debug!(base_url, "using HTTP attribution backend");
        let backend: Arc<dyn AttributionBackend> = Arc::new(HttpBackend::new(base_url)?);
        Ok(Some(backend))
    }

    pub(crate) fn install_backend(&self, backend: Option<Arc<dyn AttributionBackend>>) {
        if let Some(backend) = backend {
            *self
                .configured_backend
                .write()
                .unwrap_or_else(|p| p.into_inner()) = Some(backend);
        }
    }

    pub(crate) fn verbose(&self) -> bool {
        self.config.verbose_logging()
    }
}
