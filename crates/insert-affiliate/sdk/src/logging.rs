//! Tracing setup for hosts and the CLI.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the SDK logs at `info`, or `debug`
/// when `verbose` is true. Returns false if a subscriber was already set.
pub fn init_tracing(verbose: bool, json: bool) -> bool {
    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,insert_affiliate={level},insert_affiliate_client={level},insert_affiliate_storage={level},insert_affiliate_cli={level}"
        ))
    });

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .is_ok()
    }
}

/// Log at `info` when the host enabled verbose logging, `debug` otherwise.
macro_rules! verbose {
    ($ctx:expr, $($arg:tt)+) => {
        if $ctx.verbose() {
            ::tracing::info!($($arg)+)
        } else {
            ::tracing::debug!($($arg)+)
        }
    };
}

pub(crate) use verbose;
