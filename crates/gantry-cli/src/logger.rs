//! Logging setup on the tracing ecosystem.
//!
//! Verbosity is decided in this order: `--verbose` (debug for gantry
//! crates), `--quiet` (errors only), the `RUST_LOG` environment variable,
//! then info-level defaults.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber. Call once, before any
/// logging.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("gantry=debug,gantry_core=debug,gantry_config=debug")
    } else if quiet {
        EnvFilter::new("gantry=error,gantry_core=error,gantry_config=error")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gantry=info,gantry_core=info,gantry_config=info"))
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
