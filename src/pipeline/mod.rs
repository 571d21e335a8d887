//! Folder reconciliation pipeline.
//!
//! For each folder: read fingerprints, find the recording, import track
//! records if the revision has none, then normalize the folder name.
//! Batches run on a fixed number of workers, each holding its own store
//! connection for its whole lifetime.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use sqlx::SqlitePool;

use crate::config::{Config, NamingConfig};
use crate::db::{FingerprintStore, SqliteStore};
use crate::error::{Error, Result};
use crate::listing::cleanup::{TitleCleaner, TitleTransformations};
use crate::listing::{TrackListingParser, fallback};
use crate::matcher::{MatchOutcome, RecordingMatcher};
use crate::model::{AudioFile, CandidateFolder, RevisionKey, TrackEntry, TrackRecord, folder_name};
use crate::organizer::{AliasTable, FolderIdentity, FolderNameNormalizer, NormalizeError};
use crate::scanner;

/// Per-run switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Compute names but never rename or write the folder log
    pub dry_run: bool,
    /// Number tracks from file names when no listing validates
    pub filename_fallback: bool,
}

/// What happened to one folder.
#[derive(Debug, Clone, Default)]
pub struct FolderOutcome {
    pub folder: PathBuf,
    pub recording: Option<RevisionKey>,
    /// New path, when the folder was (or in a dry run would be) renamed
    pub renamed_to: Option<PathBuf>,
    pub tracks_imported: usize,
    /// Why the folder is unresolved
    pub failure: Option<String>,
    /// Per-file and non-fatal per-operation errors
    pub errors: Vec<String>,
}

impl FolderOutcome {
    fn new(folder: &Path) -> Self {
        Self {
            folder: folder.to_path_buf(),
            ..Default::default()
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.failure.is_none()
    }

    fn fail(mut self, err: impl std::fmt::Display) -> Self {
        let msg = err.to_string();
        tracing::error!(target: "pipeline", folder = %self.folder.display(), error = %msg, "Folder unresolved");
        self.failure = Some(msg);
        self
    }
}

/// Counts over a batch's outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub resolved: usize,
    pub renamed: usize,
    pub tracks_imported: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[FolderOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut s, o| {
            s.total += 1;
            s.resolved += usize::from(o.is_resolved());
            s.renamed += usize::from(o.renamed_to.is_some());
            s.tracks_imported += o.tracks_imported;
            s
        })
    }

    pub fn unresolved(&self) -> usize {
        self.total - self.resolved
    }
}

/// Matcher, parser and normalizer wired together.
pub struct ReconciliationPipeline {
    matcher: RecordingMatcher,
    parser: TrackListingParser,
    normalizer: FolderNameNormalizer,
    naming: NamingConfig,
    options: PipelineOptions,
}

impl ReconciliationPipeline {
    pub fn new(
        matcher: RecordingMatcher,
        parser: TrackListingParser,
        normalizer: FolderNameNormalizer,
        naming: NamingConfig,
        options: PipelineOptions,
    ) -> Self {
        Self {
            matcher,
            parser,
            normalizer,
            naming,
            options,
        }
    }

    /// Build a pipeline from configuration.
    pub fn from_config(
        config: &Config,
        matcher: RecordingMatcher,
        transforms: Arc<TitleTransformations>,
        dry_run: bool,
    ) -> Self {
        let parser = TrackListingParser::new(
            TitleCleaner::new(config.listing.strip_after_space_count),
            transforms,
        );
        let normalizer = FolderNameNormalizer::new(AliasTable::from_config(&config.naming));
        Self::new(
            matcher,
            parser,
            normalizer,
            config.naming.clone(),
            PipelineOptions {
                dry_run,
                filename_fallback: config.listing.filename_fallback,
            },
        )
    }

    /// Reconcile one folder. Never fails; problems end up in the outcome.
    pub async fn reconcile_folder(
        &self,
        store: &mut dyn FingerprintStore,
        path: &Path,
    ) -> FolderOutcome {
        let mut outcome = FolderOutcome::new(path);

        let owned = path.to_path_buf();
        let loaded = tokio::task::spawn_blocking(move || scanner::load_folder(&owned)).await;
        let folder = match loaded {
            Ok(Ok((folder, file_errors))) => {
                outcome.errors.extend(file_errors);
                folder
            }
            Ok(Err(e)) => return outcome.fail(e),
            Err(e) => return outcome.fail(e),
        };
        if folder.files.is_empty() {
            return outcome.fail("no fingerprintable audio files");
        }

        let matched = self
            .matcher
            .find_match(store, &folder.fingerprints(), folder.id_hint)
            .await;
        let Some(key) = matched.revision() else {
            return outcome.fail(format!(
                "no matching recording (mismatch detected: {})",
                matched.mismatch_detected()
            ));
        };
        outcome.recording = Some(key);
        if let MatchOutcome::Ambiguous { others, .. } = &matched {
            outcome
                .errors
                .push(format!("ambiguous match, also {} other candidate(s)", others.len()));
        }

        if !matched.has_tracks() {
            match self.import_tracks(store, &folder, key).await {
                Ok(n) => outcome.tracks_imported = n,
                Err(e) => return outcome.fail(e),
            }
        }

        let identity = match self.identity(store, key.recording_id).await {
            Ok(identity) => identity,
            Err(e) => return outcome.fail(e),
        };
        let final_path = match self.normalizer.apply(path, &identity, self.options.dry_run) {
            Ok(renamed) => {
                outcome.renamed_to = renamed.clone();
                renamed.unwrap_or_else(|| path.to_path_buf())
            }
            Err(e) => return outcome.fail(e),
        };

        if !self.options.dry_run
            && let Err(e) = store
                .log_folder(key.recording_id, &folder_name(&final_path))
                .await
        {
            tracing::warn!(target: "pipeline", error = %e, "Failed to write folder log");
            outcome.errors.push(e.to_string());
        }

        tracing::info!(
            target: "pipeline",
            folder = %folder_name(&final_path),
            recording = %key,
            tracks_imported = outcome.tracks_imported,
            "Folder resolved"
        );
        outcome
    }

    /// Build and store track records for a revision that has none.
    ///
    /// Sources, in order: complete existing tags, the folder's listings,
    /// then (if enabled) the file names.
    async fn import_tracks(
        &self,
        store: &mut dyn FingerprintStore,
        folder: &CandidateFolder,
        key: RevisionKey,
    ) -> Result<usize> {
        let entries: Vec<TrackEntry> = if folder.files.iter().all(|f| f.tags.is_complete()) {
            tracing::info!(target: "pipeline", recording = %key, "Using existing tags");
            folder.files.iter().map(entry_from_tags).collect()
        } else {
            let parser = self.parser.clone();
            let candidate = folder.clone();
            let parsed = tokio::task::spawn_blocking(move || parser.parse_folder(&candidate))
                .await
                .map_err(|e| Error::Io(std::io::Error::other(e)))?;
            match parsed {
                Ok(listing) => listing.tracks.into_iter().map(|(_, entry)| entry).collect(),
                Err(e) if self.options.filename_fallback => {
                    tracing::warn!(target: "pipeline", recording = %key, error = %e, "Numbering tracks from file names");
                    let stems: Vec<String> = folder.files.iter().map(file_stem).collect();
                    fallback::derive_from_stems(&stems, self.parser.cleaner())
                }
                Err(e) => return Err(e.into()),
            }
        };

        let records: Vec<TrackRecord> = folder
            .files
            .iter()
            .zip(entries)
            .map(|(file, entry)| track_record(file, entry))
            .collect();
        store.replace_track_records(key, &records).await?;
        tracing::info!(target: "pipeline", recording = %key, tracks = records.len(), "Stored track records");
        Ok(records.len())
    }

    /// Abbreviation and date for the normalizer.
    async fn identity(
        &self,
        store: &mut dyn FingerprintStore,
        recording_id: i64,
    ) -> Result<FolderIdentity> {
        let details = store
            .recording_details(recording_id)
            .await?
            .unwrap_or_default();
        let abbrev = details.artist_abbrev.clone().or_else(|| {
            details
                .artist_name
                .as_deref()
                .and_then(|name| self.naming.abbreviation_for(name))
                .map(str::to_string)
        });
        let Some(abbrev) = abbrev else {
            return Err(NormalizeError::MissingAbbrev(recording_id).into());
        };
        Ok(FolderIdentity {
            recording_id,
            abbrev,
            date: details.date,
        })
    }

    /// Reconcile many folders on `workers` tasks.
    ///
    /// Every folder yields exactly one outcome; their order is unspecified.
    pub async fn reconcile_batch(
        self: Arc<Self>,
        pool: &SqlitePool,
        transforms: Arc<TitleTransformations>,
        folders: Vec<PathBuf>,
        workers: usize,
    ) -> Vec<FolderOutcome> {
        let total = folders.len();
        let workers = workers.clamp(1, total.max(1));
        let queue = Arc::new(Mutex::new(VecDeque::from(folders)));
        let results = Arc::new(Mutex::new(Vec::with_capacity(total)));

        tracing::info!(target: "pipeline", folders = total, workers, "Starting batch");

        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let pipeline = Arc::clone(&self);
                let pool = pool.clone();
                let transforms = Arc::clone(&transforms);
                let queue = Arc::clone(&queue);
                let results = Arc::clone(&results);
                tokio::spawn(async move {
                    let mut store = match SqliteStore::acquire(&pool, transforms).await {
                        Ok(store) => store,
                        Err(e) => {
                            tracing::error!(target: "pipeline", worker, error = %e, "Worker could not open the store");
                            return;
                        }
                    };
                    loop {
                        let next = queue.lock().pop_front();
                        let Some(path) = next else { break };
                        let outcome = pipeline.reconcile_folder(&mut store, &path).await;
                        results.lock().push(outcome);
                    }
                    tracing::debug!(target: "pipeline", worker, "Worker finished");
                })
            })
            .collect();

        for joined in futures::future::join_all(handles).await {
            if let Err(e) = joined {
                tracing::error!(target: "pipeline", error = %e, "Worker panicked");
            }
        }

        let mut outcomes = std::mem::take(&mut *results.lock());
        // folders no worker got to, e.g. when every worker failed to open the store
        outcomes.extend(
            queue
                .lock()
                .drain(..)
                .map(|path| FolderOutcome::new(&path).fail("store unavailable")),
        );

        let summary = BatchSummary::from_outcomes(&outcomes);
        tracing::info!(
            target: "pipeline",
            resolved = summary.resolved,
            unresolved = summary.unresolved(),
            renamed = summary.renamed,
            "Batch finished"
        );
        outcomes
    }
}

fn file_stem(file: &AudioFile) -> String {
    Path::new(&file.file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn entry_from_tags(file: &AudioFile) -> TrackEntry {
    let tags = &file.tags;
    let disc = tags.disc.as_deref().and_then(|d| {
        // "1/2" style disc tags
        d.split('/').next().and_then(|n| n.trim().parse().ok())
    });
    let track = tags
        .track
        .as_deref()
        .and_then(|t| t.split('/').next())
        .map(str::trim)
        .unwrap_or_default();
    let track = match track.parse::<u32>() {
        Ok(n) => format!("{n:02}"),
        Err(_) => track.to_string(),
    };
    TrackEntry::new(disc, track, tags.title.clone().unwrap_or_default())
}

fn track_record(file: &AudioFile, entry: TrackEntry) -> TrackRecord {
    TrackRecord {
        disc_number: entry.disc.unwrap_or(1).to_string(),
        track_number: entry.track,
        title: entry.title,
        fingerprint: Some(file.fingerprint.clone()),
        bit_depth: file.properties.bit_depth,
        sample_rate: file.properties.sample_rate,
        duration: file.properties.duration_text(),
        channels: file.properties.channels,
        file_name: file.file_name.clone(),
    }
}
