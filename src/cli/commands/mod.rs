//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `reconcile`: full pipeline over many folders
//! - `identify`: matcher only
//! - `parse`: listing parser only
//! - `normalize`: folder name computation only
//! - `verify`: `.ffp` checksum verification
//! - `catalog`: config file and title table maintenance

mod catalog;
mod identify;
mod normalize;
mod parse;
mod reconcile;
mod verify;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::db;
use crate::listing::cleanup::TitleTransformations;
use crate::matcher::RecordingMatcher;
use crate::remote::LcdbClient;

pub use catalog::{cmd_add_title, cmd_init_config};
pub use identify::cmd_identify;
pub use normalize::cmd_normalize;
pub use parse::cmd_parse_listing;
pub use reconcile::cmd_reconcile;
pub use verify::cmd_verify;

/// Concert Minder CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Database file (default: from config, else ./concert_minder.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file (default: the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Identify, import and rename recording folders
    Reconcile {
        /// Recording folders to process
        folders: Vec<PathBuf>,
        /// Also process every subfolder of this directory that holds audio
        #[arg(long)]
        parent: Option<PathBuf>,
        /// Show what would be renamed without touching anything
        #[arg(long)]
        dry_run: bool,
        /// Never consult the remote catalog
        #[arg(long)]
        no_remote: bool,
        /// Number of folders processed at once
        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Find the recording a folder's fingerprints belong to
    Identify {
        /// Recording folder
        folder: PathBuf,
        /// Never consult the remote catalog
        #[arg(long)]
        no_remote: bool,
    },
    /// Parse a folder's text listings and show the file mapping
    ParseListing {
        /// Recording folder
        folder: PathBuf,
    },
    /// Print the canonical name for a folder name
    NormalizeName {
        /// Current folder name
        name: String,
        /// Recording id
        #[arg(long)]
        id: i64,
        /// Artist abbreviation
        #[arg(long)]
        abbrev: String,
        /// Recording date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },
    /// Verify audio fingerprints against the folder's .ffp file
    Verify {
        /// Recording folder
        folder: PathBuf,
    },
    /// Write the effective configuration to the config file
    InitConfig,
    /// Add or replace a title transformation
    AddTitle {
        /// Title as written in listings
        title: String,
        /// Title to store instead
        clean: String,
        /// The song segues into the next one
        #[arg(long)]
        gazinta: bool,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let rt = Runtime::new()?;

    match &cli.command {
        Commands::Reconcile {
            folders,
            parent,
            dry_run,
            no_remote,
            jobs,
        } => cmd_reconcile(
            &rt,
            config,
            cli.db.as_deref(),
            folders,
            parent.as_deref(),
            *dry_run,
            *no_remote,
            *jobs,
        ),
        Commands::Identify { folder, no_remote } => {
            cmd_identify(&rt, config, cli.db.as_deref(), folder, *no_remote)
        }
        Commands::ParseListing { folder } => {
            cmd_parse_listing(&rt, config, cli.db.as_deref(), folder)
        }
        Commands::NormalizeName {
            name,
            id,
            abbrev,
            date,
        } => cmd_normalize(config, name, *id, abbrev, date.as_deref()),
        Commands::Verify { folder } => cmd_verify(folder),
        Commands::InitConfig => cmd_init_config(config, cli.config.as_deref()),
        Commands::AddTitle {
            title,
            clean,
            gazinta,
        } => cmd_add_title(&rt, config, cli.db.as_deref(), title, clean, *gazinta),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Open the database: `--db`, then the configured path, then the default.
pub(crate) async fn open_db(config: &Config, db_path: Option<&Path>) -> anyhow::Result<SqlitePool> {
    let path = db_path.or(config.database.path.as_deref());
    let url = db::db_url(path);
    db::init_db(&url)
        .await
        .with_context(|| format!("failed to open database {url}"))
}

/// Load the title transformation table, empty on failure.
pub(crate) async fn load_transforms(pool: &SqlitePool) -> Arc<TitleTransformations> {
    match db::load_title_transformations(pool).await {
        Ok(table) => Arc::new(table),
        Err(e) => {
            tracing::warn!(target: "db", error = %e, "Title transformations unavailable");
            Arc::default()
        }
    }
}

/// Build a matcher, with the remote catalog unless disabled.
pub(crate) fn build_matcher(config: &Config, no_remote: bool) -> anyhow::Result<RecordingMatcher> {
    if no_remote || !config.remote.enabled {
        return Ok(RecordingMatcher::local_only());
    }
    let client = LcdbClient::new(
        config.remote.endpoint.clone(),
        Duration::from_secs(config.remote.timeout_secs),
    )?;
    tracing::debug!(target: "remote", endpoint = client.endpoint(), "Remote catalog enabled");
    Ok(RecordingMatcher::with_remote(Arc::new(client)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_reconcile_flags() {
        let cli = Cli::try_parse_from([
            "concert-minder",
            "--db",
            "x.db",
            "reconcile",
            "a",
            "b",
            "--dry-run",
            "--jobs",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.db.as_deref(), Some(Path::new("x.db")));
        match cli.command {
            Commands::Reconcile {
                folders,
                dry_run,
                jobs,
                no_remote,
                ..
            } => {
                assert_eq!(folders, vec![PathBuf::from("a"), PathBuf::from("b")]);
                assert!(dry_run);
                assert!(!no_remote);
                assert_eq!(jobs, Some(3));
            }
            _ => panic!("expected reconcile"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["concert-minder", "verify", "f", "-v"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_build_matcher_respects_no_remote() {
        let config = Config::default();
        assert!(build_matcher(&config, true).is_ok());
    }

    #[test]
    fn test_add_title_then_init_config() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");
        let config_path = dir.path().join("conf").join("config.toml");
        let config = Config::default();
        let rt = Runtime::new().unwrap();

        cmd_add_title(&rt, &config, Some(&db_path), "Sugar Mag", "Sugar Magnolia", false).unwrap();
        let table = rt.block_on(async {
            let pool = open_db(&config, Some(&db_path)).await.unwrap();
            db::load_title_transformations(&pool).await.unwrap()
        });
        assert_eq!(table.lookup("Sugar Mag"), Some(("Sugar Magnolia", false)));

        cmd_init_config(&config, Some(&config_path)).unwrap();
        assert!(crate::config::load_from(&config_path).is_ok());
    }

    #[tokio::test]
    async fn test_open_db_prefers_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flag.db");
        let pool = open_db(&Config::default(), Some(&path)).await.unwrap();
        pool.close().await;
        assert!(path.exists());
    }
}
