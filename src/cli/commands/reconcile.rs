//! Batch reconciliation command.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;

use futures::StreamExt;

use crate::config::Config;
use crate::pipeline::{BatchSummary, ReconciliationPipeline};
use crate::scanner;

use super::{build_matcher, load_transforms, open_db};

/// Identify, import and rename recording folders
#[allow(clippy::too_many_arguments)]
pub fn cmd_reconcile(
    rt: &Runtime,
    config: &Config,
    db_path: Option<&Path>,
    folders: &[PathBuf],
    parent: Option<&Path>,
    dry_run: bool,
    no_remote: bool,
    jobs: Option<usize>,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let mut targets: BTreeSet<PathBuf> = folders.iter().cloned().collect();
        if let Some(parent) = parent {
            let found: Vec<PathBuf> = scanner::scan(parent.to_path_buf()).collect().await;
            println!("Found {} folder(s) with audio under {:?}", found.len(), parent);
            targets.extend(found);
        }
        if targets.is_empty() {
            anyhow::bail!("no folders given (pass folders or --parent DIR)");
        }

        let pool = open_db(config, db_path).await?;
        let transforms = load_transforms(&pool).await;
        let matcher = build_matcher(config, no_remote)?;
        let pipeline = Arc::new(ReconciliationPipeline::from_config(
            config,
            matcher,
            Arc::clone(&transforms),
            dry_run,
        ));
        let workers = jobs.unwrap_or_else(|| config.matching.worker_count());

        if dry_run {
            println!("\n[DRY RUN MODE - No folders will be renamed]\n");
        }

        let mut outcomes = pipeline
            .reconcile_batch(&pool, transforms, targets.into_iter().collect(), workers)
            .await;
        outcomes.sort_by(|a, b| a.folder.cmp(&b.folder));

        for outcome in &outcomes {
            if let Some(dest) = &outcome.renamed_to {
                let verb = if dry_run { "WOULD RENAME" } else { "RENAMED" };
                println!("{}: {:?} -> {:?}", verb, outcome.folder, dest);
            }
            for err in &outcome.errors {
                eprintln!("  warning ({:?}): {}", outcome.folder, err);
            }
        }

        let summary = BatchSummary::from_outcomes(&outcomes);
        println!(
            "\nCompleted: {} folders, {} resolved, {} unresolved, {} renamed, {} tracks imported",
            summary.total,
            summary.resolved,
            summary.unresolved(),
            summary.renamed,
            summary.tracks_imported
        );

        let unresolved: Vec<_> = outcomes.iter().filter(|o| !o.is_resolved()).collect();
        if !unresolved.is_empty() {
            println!("\nUnresolved:");
            for outcome in unresolved {
                println!(
                    "  {:?}: {}",
                    outcome.folder,
                    outcome.failure.as_deref().unwrap_or_default()
                );
            }
        }
        Ok(())
    })
}
