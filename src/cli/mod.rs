//! Command-line interface for concert-minder.
//!
//! This module provides CLI commands for reconciling recording folders
//! and for running the matcher, listing parser and name normalizer on
//! their own.

mod commands;

pub use commands::{Cli, Commands, run_command};
