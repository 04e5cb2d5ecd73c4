//! Tracing setup for hosts that embed the engine
use crate::error::GatecheckError;
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber filtered by `filter` (env-filter syntax).
///
/// `RUST_LOG` takes precedence when set.
pub fn init_tracing(filter: &str) -> Result<(), GatecheckError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .map_err(|e| GatecheckError::Telemetry(format!("invalid filter '{filter}': {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|e| GatecheckError::Telemetry(e.to_string()))
}
