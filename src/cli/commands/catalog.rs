//! Configuration and catalog maintenance commands.

use std::path::Path;
use tokio::runtime::Runtime;

use crate::config::{self, Config};
use crate::db;

use super::open_db;

/// Write the current configuration to disk
pub fn cmd_init_config(config: &Config, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            config::save_to(config, path)?;
            println!("Wrote {:?}", path);
        }
        None => {
            config::save(config)?;
            if let Some(path) = config::config_path() {
                println!("Wrote {:?}", path);
            }
        }
    }
    Ok(())
}

/// Add or replace a curated title transformation
pub fn cmd_add_title(
    rt: &Runtime,
    config: &Config,
    db_path: Option<&Path>,
    title: &str,
    clean: &str,
    gazinta: bool,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let pool = open_db(config, db_path).await?;
        db::upsert_title_transformation(&pool, title, clean, gazinta).await?;
        let table = db::load_title_transformations(&pool).await?;
        println!(
            "{:?} -> {:?}{} ({} transformations)",
            title,
            clean,
            if gazinta { " >" } else { "" },
            table.len()
        );
        Ok(())
    })
}
