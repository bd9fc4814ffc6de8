//! Subcommand implementations

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{print_info, print_json, print_none, print_success, print_value, print_warning};
use crate::Commands;
use insert_affiliate::{InsertAffiliate, SdkSettings};
use insert_affiliate_storage::{JsonFileStateStore, StateStore};
use std::sync::Arc;
use tracing::debug;

pub async fn execute(command: Commands, config: &CliConfig) -> CliResult<()> {
    let state_path = config.state_path();
    let store = Arc::new(JsonFileStateStore::new(&state_path));

    if let Commands::Config = command {
        print_info(&format!("State file: {}", state_path.display()));
        return print_json(config);
    }
    if let Commands::Clear { all: true } = command {
        store.clear().await?;
        print_success(&format!("Removed {}", state_path.display()));
        return Ok(());
    }

    let mut settings = config.sdk_settings();
    if let Commands::HandleLink { .. } = command {
        settings = settings.with_links_enabled(true);
    }
    let sdk = start(store, settings).await?;
    let result = run(&sdk, command).await;
    sdk.settle().await;
    result
}

async fn start(
    store: Arc<JsonFileStateStore>,
    settings: SdkSettings,
) -> CliResult<InsertAffiliate> {
    debug!(path = %store.path().display(), "opening state file");
    let sdk = InsertAffiliate::builder().state_store(store).build().await?;
    sdk.initialize(settings).await?;
    Ok(sdk)
}

async fn run(sdk: &InsertAffiliate, command: Commands) -> CliResult<()> {
    match command {
        Commands::DeviceId => {
            print_value(sdk.device_id().await?.as_str());
        }
        Commands::Identifier { ignore_timeout } => {
            match sdk.return_insert_affiliate_identifier(ignore_timeout).await {
                Some(identifier) => print_value(&identifier),
                None => print_none("active affiliate identifier"),
            }
        }
        Commands::Store { code } => {
            let outcome = sdk.store_insert_affiliate_identifier(&code).await?;
            if outcome.is_replaced() {
                print_success(&format!("Stored {}", outcome.identifier()));
            } else {
                print_info(&format!("Already stored {}", outcome.identifier()));
            }
        }
        Commands::SetShortCode { code } => {
            let short_code = sdk.resolver().set_short_code(&code).await?;
            print_success(&format!("Short code {} set", short_code));
        }
        Commands::Resolve { link } => match sdk.resolver().resolve(&link).await? {
            Some(short_link) => print_success(&format!("Resolved to {}", short_link)),
            None => print_warning("Resolution failed; stored the raw link"),
        },
        Commands::HandleLink { url } => match sdk.router().handle(&url).await? {
            Some(outcome) => print_success(&format!("Link handled: {}", outcome.identifier())),
            None => {
                return Err(CliError::Rejected(format!(
                    "{} is not an Insert Affiliate link",
                    url
                )))
            }
        },
        Commands::Track { event } => {
            let status = sdk.events().track_event(&event).await?;
            if status == 200 {
                print_success(&format!("Event '{}' tracked", event));
            } else {
                return Err(CliError::Rejected(format!(
                    "backend answered {} for event '{}'",
                    status, event
                )));
            }
        }
        Commands::OfferCode { refresh } => {
            let offer_code = if refresh {
                sdk.fetch_and_store_offer_code().await?
            } else {
                sdk.offer_code().await
            };
            match offer_code {
                Some(code) => print_value(&code),
                None => print_none("offer code"),
            }
        }
        Commands::Details { code } => match sdk.resolver().get_affiliate_details(&code).await? {
            Some(details) => print_json(&details)?,
            None => return Err(CliError::NotFound(format!("affiliate '{}'", code))),
        },
        Commands::ExpectedPurchase => {
            let token = sdk.events().account_token_with_expected_purchase().await?;
            print_value(&token.to_string());
        }
        Commands::Clear { .. } => {
            sdk.clear_attribution().await?;
            print_success("Cleared affiliate identifier");
        }
        Commands::Config => {}
    }
    Ok(())
}
