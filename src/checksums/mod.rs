//! Checksum file parsing and folder verification.
//!
//! Two line shapes are understood:
//! - ffp (`flac --show-md5sum` style): `name.flac:0123abcd...`
//! - st5/md5: `0123abcd... *name.flac` (the `*` binary marker is optional)
//!
//! Lines starting with `;` are comments.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result, ResultExt};
use crate::listing::decode;
use crate::model::{AudioFile, CandidateFolder, ChecksumEntry, Fingerprint};

/// Parse one checksum line. Returns `None` for comments, blanks and junk.
pub fn parse_line(line: &str) -> Option<ChecksumEntry> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(';') {
        return None;
    }

    if let Some((name, hex)) = line.rsplit_once(':')
        && let Some(fingerprint) = Fingerprint::parse(hex)
        && !name.trim().is_empty()
    {
        return Some(ChecksumEntry {
            file_name: name.trim().to_string(),
            fingerprint,
        });
    }

    let (hex, name) = line.split_once(char::is_whitespace)?;
    let fingerprint = Fingerprint::parse(hex)?;
    let name = name.trim().trim_start_matches('*').trim();
    if name.is_empty() {
        return None;
    }
    Some(ChecksumEntry {
        file_name: name.to_string(),
        fingerprint,
    })
}

/// Parse a whole checksum body, skipping lines that are not entries.
pub fn parse_body(body: &str) -> Vec<ChecksumEntry> {
    body.lines()
        .filter_map(|line| {
            let entry = parse_line(line);
            if entry.is_none() && !line.trim().is_empty() && !line.trim_start().starts_with(';') {
                tracing::debug!(target: "checksums", line, "Ignoring checksum line");
            }
            entry
        })
        .collect()
}

/// Read and parse a checksum file in any supported text encoding.
pub fn read_checksum_file(path: &Path) -> Result<Vec<ChecksumEntry>> {
    let bytes = std::fs::read(path).with_context(format!("reading {}", path.display()))?;
    let (text, _) = decode::decode(&bytes)
        .ok_or_else(|| Error::metadata(path, "checksum file is not decodable text"))?;
    Ok(parse_body(&text))
}

/// Render entries in ffp form.
pub fn render_ffp(files: &[AudioFile]) -> String {
    files
        .iter()
        .map(|f| format!("{}:{}\n", f.file_name, f.fingerprint))
        .collect()
}

/// Outcome of checking a folder against its `.ffp` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// The checksum file compared against
    pub checksum_file: PathBuf,
    /// True when the checksum file was generated by this run
    pub generated: bool,
    pub matched: Vec<String>,
    /// Files whose fingerprint differs from the listed one
    pub mismatched: Vec<String>,
    /// Listed files absent from the folder
    pub missing: Vec<String>,
    /// Folder files the checksum file does not list
    pub unlisted: Vec<String>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.mismatched.is_empty() && self.missing.is_empty() && self.unlisted.is_empty()
    }
}

fn find_ffp(folder: &Path) -> std::io::Result<Option<PathBuf>> {
    let mut found: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("ffp"))
        })
        .collect();
    found.sort();
    Ok(found.into_iter().next())
}

/// Verify a loaded folder against its `.ffp` file.
///
/// When the folder has none, `<folder name>.ffp` is written from the
/// folder's own fingerprints first, so the check trivially passes and the
/// folder carries a checksum file from then on.
pub fn verify_folder(folder: &CandidateFolder) -> Result<VerifyReport> {
    let (checksum_file, generated) = match find_ffp(&folder.path)? {
        Some(path) => (path, false),
        None => {
            let path = folder.path.join(format!("{}.ffp", folder.name()));
            std::fs::write(&path, render_ffp(&folder.files))
                .with_context(format!("writing {}", path.display()))?;
            tracing::info!(target: "checksums", path = %path.display(), "Generated ffp");
            (path, true)
        }
    };

    let expected: HashMap<String, Fingerprint> = read_checksum_file(&checksum_file)?
        .into_iter()
        .map(|e| (e.file_name.to_lowercase(), e.fingerprint))
        .collect();

    let mut report = VerifyReport {
        checksum_file,
        generated,
        ..Default::default()
    };
    let mut seen = Vec::new();
    for file in &folder.files {
        let key = file.file_name.to_lowercase();
        match expected.get(&key) {
            Some(fp) if *fp == file.fingerprint => report.matched.push(file.file_name.clone()),
            Some(_) => {
                tracing::warn!(target: "checksums", file = %file.file_name, "Fingerprint mismatch");
                report.mismatched.push(file.file_name.clone());
            }
            None => report.unlisted.push(file.file_name.clone()),
        }
        seen.push(key);
    }
    report.missing = expected
        .keys()
        .filter(|k| !seen.contains(k))
        .cloned()
        .collect();
    report.missing.sort();
    Ok(report)
}
