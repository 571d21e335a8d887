//! Concert Minder - live concert recording reconciler.
//!
//! Identifies which cataloged recording a folder of audio files holds by
//! its fingerprints, fills in missing track metadata from the folder's
//! text listings, and renames the folder into canonical form.

pub mod checksums;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod listing;
pub mod matcher;
pub mod metadata;
pub mod model;
pub mod organizer;
pub mod pipeline;
pub mod remote;
pub mod scanner;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // An existing --config file must load; the default location falls back to defaults
    let config = match &args.config {
        Some(path) if path.exists() => config::load_from(path)?,
        Some(_) => config::Config::default(),
        None => config::load(),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(log_filter(args.verbose || config.preferences.verbose_logging)?)
        .init();

    cli::run_command(&args, &config)
}

/// Event targets used across the crate.
const LOG_TARGETS: [&str; 9] = [
    "concert_minder",
    "checksums",
    "db",
    "listing",
    "matcher",
    "organizer",
    "pipeline",
    "remote",
    "scanner",
];

/// `RUST_LOG` plus one directive per crate target, at info or debug.
fn log_filter(verbose: bool) -> anyhow::Result<EnvFilter> {
    let level = if verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    for target in LOG_TARGETS {
        filter = filter.add_directive(format!("{target}={level}").parse()?);
    }
    Ok(filter)
}
