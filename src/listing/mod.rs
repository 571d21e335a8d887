//! Track listing parser.
//!
//! Turns free-form text listings into `(disc, track, title)` triples that
//! line up one-to-one with a folder's audio files.
//!
//! # Algorithm
//!
//! For each listing, in order:
//! 1. Drop noise lines (see [`cleanup::is_noise_line`]).
//! 2. Run every grammar in [`grammar::GRAMMARS`] over all lines on its own.
//!    The first whose output has exactly `N` entries in valid order wins.
//! 3. Otherwise run a merged pass where each line takes the first grammar
//!    that matches it, and validate that the same way.
//! 4. Otherwise move on to the next listing.
//!
//! A listing is in valid order if, per disc, tracks run 1..n without gaps,
//! or if tracks sorted by `(disc, track)` strictly increase.

pub mod cleanup;
pub mod decode;
pub mod fallback;
pub mod grammar;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cleanup::{TitleCleaner, TitleTransformations, is_noise_line};
use grammar::{GRAMMARS, Grammar, PassState, RawTriple};

use crate::model::{CandidateFolder, TrackEntry, TrackListing};

/// Why one listing was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No line matched any grammar
    NoEntries,
    /// The best attempt had the wrong length and/or order
    Invalid {
        found: usize,
        expected: usize,
        out_of_order: bool,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoEntries => write!(f, "no track lines found"),
            Rejection::Invalid {
                found,
                expected,
                out_of_order,
            } => {
                let mut reasons = Vec::new();
                if found != expected {
                    reasons.push(format!(
                        "entry count mismatch: entries {} != files {}",
                        found, expected
                    ));
                }
                if *out_of_order {
                    reasons.push("ordering violated: tracks not in order".to_string());
                }
                write!(f, "{}", reasons.join("; "))
            }
        }
    }
}

/// Listing parser errors.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("no audio files to label")]
    NoAudioFiles,

    #[error("no listing files found")]
    NoListings,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not decode {0} with any supported encoding")]
    Undecodable(PathBuf),

    #[error("parsing failed for {listing}: {reason}")]
    Rejected { listing: String, reason: Rejection },
}

/// A validated listing mapped onto a folder's files.
#[derive(Debug, Clone)]
pub struct FolderListing {
    /// Listing file the tracks came from
    pub source: PathBuf,
    /// `(file name, entry)` in the folder's sort order
    pub tracks: Vec<(String, TrackEntry)>,
}

/// Parses text listings against a known file count.
#[derive(Debug, Clone, Default)]
pub struct TrackListingParser {
    cleaner: TitleCleaner,
    transforms: Arc<TitleTransformations>,
}

impl TrackListingParser {
    pub fn new(cleaner: TitleCleaner, transforms: Arc<TitleTransformations>) -> Self {
        Self {
            cleaner,
            transforms,
        }
    }

    pub fn cleaner(&self) -> &TitleCleaner {
        &self.cleaner
    }

    /// Parse decoded listings, returning the first that validates.
    ///
    /// `blobs` are `(label, lines)` pairs; the label only appears in logs
    /// and errors.
    pub fn parse_blobs<'a, I>(&self, blobs: I, expected: usize) -> Result<TrackListing, ListingError>
    where
        I: IntoIterator<Item = (&'a str, &'a [String])>,
    {
        if expected == 0 {
            return Err(ListingError::NoAudioFiles);
        }

        let mut last_error = None;
        for (label, lines) in blobs {
            match self.parse_lines(lines, expected) {
                Ok(listing) => {
                    tracing::info!(target: "listing", listing = label, tracks = listing.len(), "Listing accepted");
                    return Ok(listing);
                }
                Err(reason) => {
                    tracing::error!(target: "listing", listing = label, %reason, "Parsing failed");
                    last_error = Some(ListingError::Rejected {
                        listing: label.to_string(),
                        reason,
                    });
                }
            }
        }
        Err(last_error.unwrap_or(ListingError::NoListings))
    }

    /// Read listing files and parse them in order.
    ///
    /// Unreadable or undecodable files are logged and skipped.
    pub fn parse_files(
        &self,
        paths: &[PathBuf],
        expected: usize,
    ) -> Result<(TrackListing, PathBuf), ListingError> {
        if expected == 0 {
            return Err(ListingError::NoAudioFiles);
        }

        let mut last_error = None;
        for path in paths {
            let lines = match decode::read_listing(path) {
                Ok(lines) => lines,
                Err(e) => {
                    tracing::warn!(target: "listing", path = %path.display(), error = %e, "Skipping listing");
                    last_error = Some(e);
                    continue;
                }
            };
            let label = listing_label(path);
            match self.parse_blobs([(label.as_str(), lines.as_slice())], expected) {
                Ok(listing) => return Ok((listing, path.clone())),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or(ListingError::NoListings))
    }

    /// Parse a folder's listings and pair the result with its audio files.
    pub fn parse_folder(&self, folder: &CandidateFolder) -> Result<FolderListing, ListingError> {
        let (listing, source) = self.parse_files(&folder.listings, folder.files.len())?;
        let tracks = folder
            .files
            .iter()
            .map(|f| f.file_name.clone())
            .zip(listing)
            .collect();
        Ok(FolderListing { source, tracks })
    }

    /// Parse one listing's lines.
    pub fn parse_lines(&self, lines: &[String], expected: usize) -> Result<TrackListing, Rejection> {
        let lines: Vec<&str> = lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty() && !is_noise_line(l))
            .collect();

        let mut any_entries = false;
        for grammar in GRAMMARS {
            let entries = self.single_pass(grammar, &lines);
            any_entries |= !entries.is_empty();
            if entries.len() == expected && tracks_in_order(&entries) {
                tracing::info!(target: "listing", grammar = grammar.name(), "Grammar produced valid results");
                return Ok(entries);
            }
        }

        if !any_entries {
            return Err(Rejection::NoEntries);
        }

        let merged = self.merged_pass(&lines);
        let in_order = tracks_in_order(&merged);
        if merged.len() == expected && in_order {
            tracing::info!(target: "listing", "Merged pass produced valid results");
            return Ok(merged);
        }
        Err(Rejection::Invalid {
            found: merged.len(),
            expected,
            out_of_order: !in_order,
        })
    }

    fn single_pass(&self, grammar: &dyn Grammar, lines: &[&str]) -> TrackListing {
        let mut state = PassState::default();
        lines
            .iter()
            .filter_map(|line| grammar.parse(line, &mut state))
            .map(|raw| self.finish(raw))
            .collect()
    }

    fn merged_pass(&self, lines: &[&str]) -> TrackListing {
        let mut state = PassState::default();
        lines
            .iter()
            .filter_map(|line| GRAMMARS.iter().find_map(|g| g.parse(line, &mut state)))
            .map(|raw| self.finish(raw))
            .collect()
    }

    fn finish(&self, raw: RawTriple) -> TrackEntry {
        let cleaned = self.cleaner.clean(&raw.title);
        let title = match self.transforms.lookup(&cleaned) {
            Some((clean, _)) => clean.to_string(),
            None => cleaned,
        };
        TrackEntry::new(Some(raw.disc), raw.track, title)
    }
}

fn listing_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Ordering check shared by every pass.
///
/// Passes if every disc's tracks run 1..n without gaps (a missing disc
/// fails this), or if tracks sorted by `(disc, track)` strictly increase.
pub fn tracks_in_order(entries: &[TrackEntry]) -> bool {
    let numbers: Vec<(Option<u32>, u32)> = match entries
        .iter()
        .map(|e| e.track.parse::<u32>().ok().map(|t| (e.disc, t)))
        .collect::<Option<Vec<_>>>()
    {
        Some(n) => n,
        None => return false,
    };

    let mut per_disc: BTreeMap<Option<u32>, Vec<u32>> = BTreeMap::new();
    for (disc, track) in &numbers {
        per_disc.entry(*disc).or_default().push(*track);
    }
    let contiguous = per_disc.iter().all(|(disc, tracks)| {
        if disc.is_none() {
            return false;
        }
        let mut sorted = tracks.clone();
        sorted.sort_unstable();
        sorted.first() == Some(&1) && sorted.windows(2).all(|w| w[1] == w[0] + 1)
    });
    if contiguous {
        return true;
    }

    let mut sorted = numbers;
    sorted.sort_by_key(|(disc, track)| (disc.unwrap_or(0), *track));
    sorted.windows(2).all(|w| w[1].1 > w[0].1)
}
