//! # Salvo
//!
//! Runs the headless demo scene of the projectile engine.
//!
//! Usage: `salvo [CONFIG_PATH]`. Without a path the platform config
//! directory is used; a missing file means defaults.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::Result;
use salvo_engine::SalvoConfig;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("salvo=info".parse()?))
        .init();

    info!("Salvo starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = match std::env::args_os().nth(1) {
        Some(path) => SalvoConfig::load_from(path),
        None => SalvoConfig::load(),
    };
    config.validate();

    let summary = salvo_engine::run(&config)?;
    if summary.events_dropped > 0 {
        info!("{} notifications dropped by a full bus", summary.events_dropped);
    }

    info!("Salvo shutdown complete");
    Ok(())
}
