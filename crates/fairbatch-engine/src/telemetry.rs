//! Tracing subscriber setup for hosts embedding the engine.

use fairbatch_types::{FairbatchError, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_DIRECTIVES: &str = "fairbatch_engine=info,fairbatch_settlement=info,\
fairbatch_ingress=info,fairbatch_ordering=info,warn";

/// Install the global subscriber.
///
/// Filter comes from `RUST_LOG`, falling back to info for the engine crates
/// and warn elsewhere. `json` selects structured output for log shipping.
///
/// # Errors
/// `Configuration` if a global subscriber is already installed.
pub fn init_tracing(json: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let installed = if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init()
    };
    installed.map_err(|e| FairbatchError::Configuration(format!("tracing init: {e}")))
}
