//! SDK settings supplied by the host application at initialization.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.insertaffiliate.com";
pub const DEFAULT_LINK_DOMAIN: &str = "insertaffiliate.link";

/// Host-supplied SDK configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkSettings {
    /// Company code issued by the attribution backend. Absent or empty puts
    /// the SDK in degraded (no-op attribution) mode.
    #[serde(default)]
    pub company_code: Option<String>,

    #[serde(default)]
    pub verbose_logging: bool,

    /// Handle inbound deep/universal links and report device descriptors.
    #[serde(default)]
    pub links_enabled: bool,

    /// Include clipboard contents in the descriptor bundle.
    #[serde(default)]
    pub clipboard_enabled: bool,

    /// Attribution window; stored identifiers older than this read as absent.
    #[serde(default, with = "duration_secs")]
    pub attribution_active_time: Option<Duration>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Host serving universal links (`https://<domain>/V1/<company>/<code>`).
    #[serde(default = "default_link_domain")]
    pub link_domain: String,
}

impl Default for SdkSettings {
    fn default() -> Self {
        Self {
            company_code: None,
            verbose_logging: false,
            links_enabled: false,
            clipboard_enabled: false,
            attribution_active_time: None,
            api_base_url: default_api_base_url(),
            link_domain: default_link_domain(),
        }
    }
}

impl SdkSettings {
    pub fn new(company_code: impl Into<String>) -> Self {
        Self {
            company_code: Some(company_code.into()),
            ..Default::default()
        }
    }

    pub fn with_verbose_logging(mut self, enabled: bool) -> Self {
        self.verbose_logging = enabled;
        self
    }

    pub fn with_links_enabled(mut self, enabled: bool) -> Self {
        self.links_enabled = enabled;
        self
    }

    pub fn with_clipboard_enabled(mut self, enabled: bool) -> Self {
        self.clipboard_enabled = enabled;
        self
    }

    pub fn with_attribution_active_time(mut self, window: Duration) -> Self {
        self.attribution_active_time = Some(window);
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_link_domain(mut self, domain: impl Into<String>) -> Self {
        self.link_domain = domain.into();
        self
    }

    /// The company code, if one is configured and non-blank.
    pub fn company_code(&self) -> Option<&str> {
        self.company_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }

    pub fn flags(&self) -> FeatureFlags {
        FeatureFlags {
            verbose_logging: self.verbose_logging,
            links_enabled: self.links_enabled,
            clipboard_enabled: self.clipboard_enabled,
            attribution_active_time_secs: self.attribution_active_time.map(|d| d.as_secs()),
        }
    }
}

/// The feature flags persisted alongside attribution state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub verbose_logging: bool,
    pub links_enabled: bool,
    pub clipboard_enabled: bool,
    pub attribution_active_time_secs: Option<u64>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_link_domain() -> String {
    DEFAULT_LINK_DOMAIN.to_string()
}

/// Serialize `Option<Duration>` as whole seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        value.map(|d| d.as_secs()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}
