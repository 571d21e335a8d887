//! Listing parser command.

use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::listing::TrackListingParser;
use crate::listing::cleanup::TitleCleaner;
use crate::scanner;

use super::{load_transforms, open_db};

/// Parse a folder's text listings and show the file mapping
pub fn cmd_parse_listing(
    rt: &Runtime,
    config: &Config,
    db_path: Option<&Path>,
    folder: &PathBuf,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let (candidate, file_errors) = scanner::load_folder(folder)?;
        for err in &file_errors {
            eprintln!("Skipped: {}", err);
        }

        let pool = open_db(config, db_path).await?;
        let transforms = load_transforms(&pool).await;
        let parser = TrackListingParser::new(
            TitleCleaner::new(config.listing.strip_after_space_count),
            transforms,
        );

        let listing = parser.parse_folder(&candidate)?;
        println!("Listing: {:?}\n", listing.source);
        for (file, entry) in &listing.tracks {
            let disc = entry.disc.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
            println!("{}  d{} t{}  {}", file, disc, entry.track, entry.title);
        }
        Ok(())
    })
}
