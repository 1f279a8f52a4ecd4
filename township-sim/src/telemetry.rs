//! Tracing subscriber setup.
//!
//! Only the driver installs a subscriber; the core library just emits.

use township_core::{Result, TownError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides `level` when set.
///
/// # Errors
/// Returns `TownError::Config` if `level` is not a valid filter or a global
/// subscriber is already installed.
pub fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|e| TownError::Config(format!("log level: {e}")))?,
    };
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    installed.map_err(|e| TownError::Config(format!("tracing subscriber: {e}")))
}
