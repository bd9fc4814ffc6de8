//! Configuration for the insert-affiliate CLI

use insert_affiliate::{SdkSettings, DEFAULT_API_BASE_URL, DEFAULT_LINK_DOMAIN};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const STATE_FILE_NAME: &str = "state.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Company code issued by the attribution backend
    #[serde(default)]
    pub company_code: Option<String>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_link_domain")]
    pub link_domain: String,

    #[serde(default)]
    pub links_enabled: bool,

    #[serde(default)]
    pub clipboard_enabled: bool,

    /// Attribution window in seconds; unset means identifiers never expire
    #[serde(default)]
    pub attribution_window_secs: Option<u64>,

    /// Where attribution state is kept; defaults under the user data dir
    #[serde(default)]
    pub state_file: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            company_code: None,
            api_base_url: default_api_base_url(),
            link_domain: default_link_domain(),
            links_enabled: false,
            clipboard_enabled: false,
            attribution_window_secs: None,
            state_file: None,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbose: bool,

    /// JSON log lines instead of text
    #[serde(default)]
    pub json: bool,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_link_domain() -> String {
    DEFAULT_LINK_DOMAIN.to_string()
}

impl CliConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `INSERT_AFFILIATE_*` environment variables.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&CliConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // nested keys use a double underscore: INSERT_AFFILIATE_LOGGING__VERBOSE
        builder = builder.add_source(
            config::Environment::with_prefix("INSERT_AFFILIATE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    pub fn state_path(&self) -> PathBuf {
        if let Some(path) = &self.state_file {
            return path.clone();
        }
        dirs::data_dir()
            .map(|dir| dir.join("insert-affiliate").join(STATE_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(STATE_FILE_NAME))
    }

    pub fn sdk_settings(&self) -> SdkSettings {
        let mut settings = SdkSettings {
            company_code: self.company_code.clone(),
            verbose_logging: self.logging.verbose,
            links_enabled: self.links_enabled,
            clipboard_enabled: self.clipboard_enabled,
            attribution_active_time: None,
            api_base_url: self.api_base_url.clone(),
            link_domain: self.link_domain.clone(),
        };
        if let Some(secs) = self.attribution_window_secs {
            settings = settings.with_attribution_active_time(Duration::from_secs(secs));
        }
        settings
    }
}
