//! insert-affiliate - command-line harness for the attribution SDK
//!
//! Runs SDK operations against a state file on disk, for checking backend
//! configuration and link handling without a mobile build:
//! - Inspect the device id and stored identifier
//! - Store, resolve and validate referral codes
//! - Route inbound links and report events

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod error;
mod output;

use config::CliConfig;
use error::CliResult;

#[derive(Parser)]
#[command(name = "insert-affiliate")]
#[command(about = "Insert Affiliate attribution SDK harness", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "INSERT_AFFILIATE_CONFIG")]
    config: Option<String>,

    /// State file path (overrides config)
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Company code (overrides config)
    #[arg(long)]
    company_code: Option<String>,

    /// Backend base URL (overrides config)
    #[arg(long)]
    api_base_url: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print this install's device id
    DeviceId,

    /// Print the stored affiliate identifier
    Identifier {
        /// Ignore the attribution window
        #[arg(long)]
        ignore_timeout: bool,
    },

    /// Store a code as-is
    Store { code: String },

    /// Validate, confirm with the backend, and store a short code
    SetShortCode { code: String },

    /// Resolve a referral link to a short code and store it
    Resolve { link: String },

    /// Route an inbound custom-scheme or universal link
    HandleLink { url: String },

    /// Report a named event
    Track { event: String },

    /// Print the cached offer code
    OfferCode {
        /// Fetch it from the backend first
        #[arg(long)]
        refresh: bool,
    },

    /// Look up an affiliate
    Details { code: String },

    /// Issue the app account token and report an expected purchase
    ExpectedPurchase,

    /// Forget the stored identifier
    Clear {
        /// Delete the whole state file, device id included
        #[arg(long)]
        all: bool,
    },

    /// Show configuration
    Config,
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.state_file {
        config.state_file = Some(path);
    }
    if let Some(code) = cli.company_code {
        config.company_code = Some(code);
    }
    if let Some(url) = cli.api_base_url {
        config.api_base_url = url;
    }
    config.logging.verbose |= cli.verbose;
    config.logging.json |= cli.json_logs;

    insert_affiliate::logging::init_tracing(config.logging.verbose, config.logging.json);

    commands::execute(cli.command, &config).await
}
