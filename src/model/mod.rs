//! Core data models for recording reconciliation.
//!
//! Defines the primary entities: [`Fingerprint`], [`RevisionKey`],
//! [`TrackRecord`], [`RecordingDetails`] and [`CandidateFolder`].
//!
//! # Database Schema
//!
//! The models map to the following tables:
//! - `signatures` - complete fingerprint set of each revision
//! - `checksum_files` - one row per revision (checksum submission)
//! - `track_metadata` - imported track records per revision
//! - `recordings` / `artists` - date, venue and artist of each recording

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Length of a fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 32;

/// Content digest of one audio track: 32 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parse a hex digest, accepting either case.
    ///
    /// Returns `None` unless the input is exactly 32 hex digits.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() == FINGERPRINT_LEN && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(s.to_ascii_lowercase()))
        } else {
            None
        }
    }

    /// Build a fingerprint from a raw 128-bit MD5 value (zero-padded).
    pub fn from_md5(value: u128) -> Self {
        Self(format!("{:032x}", value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Fingerprint::parse(&value).ok_or_else(|| format!("invalid fingerprint: {value}"))
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

/// Identity of one checksum submission of a recording.
///
/// Ordering is `(recording_id, revision_id)` with a missing revision first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RevisionKey {
    pub recording_id: i64,
    pub revision_id: Option<i64>,
}

impl RevisionKey {
    pub fn new(recording_id: i64, revision_id: Option<i64>) -> Self {
        Self {
            recording_id,
            revision_id,
        }
    }
}

impl fmt::Display for RevisionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.revision_id {
            Some(rev) => write!(f, "{}/{}", self.recording_id, rev),
            None => write!(f, "{}/-", self.recording_id),
        }
    }
}

/// One (file name, fingerprint) line from a checksum submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    pub file_name: String,
    pub fingerprint: Fingerprint,
}

/// A track belonging to exactly one revision.
///
/// Track records are never edited in place; a re-import replaces all
/// records of the revision.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackRecord {
    /// Disc number as text ("1", "2", ...)
    pub disc_number: String,
    /// Zero-padded track number ("01", "02", ...)
    pub track_number: String,
    pub title: String,
    pub fingerprint: Option<Fingerprint>,
    pub bit_depth: Option<u8>,
    pub sample_rate: Option<u32>,
    /// Duration formatted as `mm:ss`
    pub duration: String,
    pub channels: Option<u8>,
    /// File name the record was imported from
    pub file_name: String,
}

/// Catalog details of a recording.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordingDetails {
    pub recording_id: i64,
    pub date: Option<NaiveDate>,
    pub artist_id: Option<i64>,
    pub artist_name: Option<String>,
    /// Canonical folder-name prefix of the artist
    pub artist_abbrev: Option<String>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub source: Option<String>,
}

/// Tag values already present on an audio file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExistingTags {
    pub disc: Option<String>,
    pub track: Option<String>,
    pub title: Option<String>,
}

impl ExistingTags {
    /// True when track number and title are both present.
    pub fn is_complete(&self) -> bool {
        self.track.as_deref().is_some_and(|t| !t.trim().is_empty())
            && self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// Technical properties of an audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioProperties {
    pub bit_depth: Option<u8>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    pub duration_secs: u64,
}

impl AudioProperties {
    /// Duration as `mm:ss`, minutes not wrapped at the hour.
    pub fn duration_text(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.duration_secs / 60,
            self.duration_secs % 60
        )
    }
}

/// An audio file of a candidate folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    pub path: PathBuf,
    pub file_name: String,
    pub fingerprint: Fingerprint,
    pub tags: ExistingTags,
    pub properties: AudioProperties,
}

/// A directory under inspection.
#[derive(Debug, Clone, Default)]
pub struct CandidateFolder {
    pub path: PathBuf,
    /// Audio files in the folder's own sort order
    pub files: Vec<AudioFile>,
    /// Text listings, in the order they should be tried
    pub listings: Vec<PathBuf>,
    /// First all-numeric dot segment of the folder name
    pub id_hint: Option<i64>,
}

impl CandidateFolder {
    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        self.files.iter().map(|f| f.fingerprint.clone()).collect()
    }

    pub fn name(&self) -> String {
        folder_name(&self.path)
    }
}

/// Final path component as a string (lossy).
pub fn folder_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parse the recording-id hint from a folder name.
///
/// The hint is the first dot-delimited segment made only of ASCII digits.
pub fn parse_id_hint(folder_name: &str) -> Option<i64> {
    folder_name
        .split('.')
        .find(|seg| !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|seg| seg.parse().ok())
}

/// One parsed `(disc, track, title)` triple of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEntry {
    pub disc: Option<u32>,
    /// Zero-padded track number
    pub track: String,
    pub title: String,
}

impl TrackEntry {
    pub fn new(disc: Option<u32>, track: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            disc,
            track: track.into(),
            title: title.into(),
        }
    }
}

/// Ordered sequence of parsed triples.
pub type TrackListing = Vec<TrackEntry>;
