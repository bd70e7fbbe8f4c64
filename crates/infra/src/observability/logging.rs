//! Tracing subscriber initialisation

use clinix_domain::{ClinixError, LoggingConfig, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Build the filter: `RUST_LOG` when set and valid, otherwise the configured
/// level.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|err| {
        ClinixError::Config(format!("invalid log level '{}': {err}", config.level))
    })
}

/// Install the global subscriber.
///
/// Returns `Ok(false)` when a subscriber was already installed, so repeated
/// calls (tests, embedding applications) are harmless.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let filter = build_filter(config)?;

    let json_layer = config.json.then(|| fmt::layer().json().with_target(true));
    let text_layer = (!config.json).then(|| fmt::layer().with_target(true));

    let installed =
        tracing_subscriber::registry().with(filter).with(json_layer).with(text_layer).try_init().is_ok();

    if installed {
        tracing::debug!(level = %config.level, json = config.json, "Tracing initialised");
    }
    Ok(installed)
}
