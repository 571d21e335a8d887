//! Folder name normalization command.

use crate::config::Config;
use crate::db::parse_catalog_date;
use crate::organizer::{AliasTable, FolderIdentity, FolderNameNormalizer};

/// Print the canonical name for a folder name
pub fn cmd_normalize(
    config: &Config,
    name: &str,
    id: i64,
    abbrev: &str,
    date: Option<&str>,
) -> anyhow::Result<()> {
    let date = match date {
        Some(text) => Some(
            parse_catalog_date(text)
                .ok_or_else(|| anyhow::anyhow!("invalid date '{}' (expected YYYY-MM-DD)", text))?,
        ),
        None => None,
    };
    let normalizer = FolderNameNormalizer::new(AliasTable::from_config(&config.naming));
    let identity = FolderIdentity {
        recording_id: id,
        abbrev: abbrev.to_string(),
        date,
    };
    println!("{}", normalizer.normalize(name, &identity)?);
    Ok(())
}
