//! Recording identification command.

use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::db::{FingerprintStore, SqliteStore};
use crate::matcher::MatchOutcome;
use crate::scanner;

use super::{build_matcher, load_transforms, open_db};

/// Find the recording a folder's fingerprints belong to
pub fn cmd_identify(
    rt: &Runtime,
    config: &Config,
    db_path: Option<&Path>,
    folder: &PathBuf,
    no_remote: bool,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let (candidate, file_errors) = scanner::load_folder(folder)?;
        for err in &file_errors {
            eprintln!("Skipped: {}", err);
        }
        println!("Identifying: {:?} ({} files)", folder, candidate.files.len());
        if let Some(hint) = candidate.id_hint {
            println!("  Recording id in name: {}", hint);
        }
        println!();

        let pool = open_db(config, db_path).await?;
        let transforms = load_transforms(&pool).await;
        let mut store = SqliteStore::acquire(&pool, transforms).await?;
        let matcher = build_matcher(config, no_remote)?;

        let outcome = matcher
            .find_match(&mut store, &candidate.fingerprints(), candidate.id_hint)
            .await;

        match &outcome {
            MatchOutcome::Matched { revision, .. } => {
                println!("✓ Match: recording {}", revision);
            }
            MatchOutcome::Ambiguous { chosen, others, .. } => {
                println!("? Ambiguous: chose recording {}", chosen);
                for other in others {
                    println!("  also matches {}", other);
                }
            }
            MatchOutcome::NoMatch { .. } => {
                println!("✗ No matching recording found.");
            }
        }
        if outcome.mismatch_detected() {
            println!("  Some fingerprints are unknown to the local catalog.");
        }

        if let Some(key) = outcome.revision() {
            println!(
                "  Track records: {}",
                if outcome.has_tracks() { "present" } else { "missing" }
            );
            if let Some(details) = store.recording_details(key.recording_id).await? {
                if let Some(date) = details.date {
                    println!("  Date:   {}", date);
                }
                if let Some(artist) = &details.artist_name {
                    println!("  Artist: {}", artist);
                }
                if let Some(venue) = &details.venue {
                    println!("  Venue:  {}", venue);
                }
                if let Some(city) = &details.city {
                    println!("  City:   {}", city);
                }
            }
        }
        Ok(())
    })
}
