//! Checksum verification command.

use std::path::PathBuf;

use crate::{checksums, scanner};

/// Verify audio fingerprints against the folder's .ffp file
pub fn cmd_verify(folder: &PathBuf) -> anyhow::Result<()> {
    let (candidate, file_errors) = scanner::load_folder(folder)?;
    for err in &file_errors {
        eprintln!("Skipped: {}", err);
    }

    let report = checksums::verify_folder(&candidate)?;
    if report.generated {
        println!("Generated {:?}", report.checksum_file);
        return Ok(());
    }

    println!("Checking against {:?}\n", report.checksum_file);
    for name in &report.matched {
        println!("✓ {}", name);
    }
    for name in &report.mismatched {
        println!("✗ {} (fingerprint differs)", name);
    }
    for name in &report.missing {
        println!("✗ {} (missing)", name);
    }
    for name in &report.unlisted {
        println!("? {} (not in checksum file)", name);
    }

    if report.is_ok() {
        println!("\nAll {} files verified.", report.matched.len());
        Ok(())
    } else {
        anyhow::bail!(
            "{} mismatched, {} missing, {} unlisted",
            report.mismatched.len(),
            report.missing.len(),
            report.unlisted.len()
        )
    }
}
