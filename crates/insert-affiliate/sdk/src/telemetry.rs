//! Device descriptors supplied by the host platform.
//!
//! The SDK does not probe hardware itself. Hosts implement
//! [`DeviceTelemetry`] with whatever their platform exposes (model, OS
//! version, locale, screen metrics, network type) and the reporter forwards
//! it to the backend for install matching.

use serde_json::{Map, Value};

pub trait DeviceTelemetry: Send + Sync {
    /// Flat descriptor bundle. Keys are sent as-is.
    fn collect(&self) -> Map<String, Value>;

    /// Current clipboard text, when the host allows reading it.
    fn clipboard_text(&self) -> Option<String> {
        None
    }
}

/// Fixed descriptors, for tests and hosts with nothing dynamic to report.
#[derive(Debug, Clone, Default)]
pub struct StaticTelemetry {
    descriptors: Map<String, Value>,
    clipboard: Option<String>,
}

impl StaticTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.descriptors.insert(key.to_string(), value.into());
        self
    }

    pub fn with_clipboard(mut self, text: impl Into<String>) -> Self {
        self.clipboard = Some(text.into());
        self
    }
}

impl DeviceTelemetry for StaticTelemetry {
    fn collect(&self) -> Map<String, Value> {
        self.descriptors.clone()
    }

    fn clipboard_text(&self) -> Option<String> {
        self.clipboard.clone()
    }
}
