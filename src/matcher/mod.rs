//! Recording matcher.
//!
//! Identifies which catalogued revision a folder's fingerprints belong to.
//!
//! # Algorithm
//!
//! 1. Look up every fingerprint; the union of the revisions found is the
//!    candidate set. A fingerprint with no local hit sets `mismatch_detected`.
//! 2. Load each candidate's complete fingerprint set (ascending key order)
//!    and keep those that are *set*-equal to the folder's fingerprints.
//! 3. An exact candidate that already has track records wins immediately.
//!    Exact candidates without records are collected.
//! 4. With no exact candidate of either kind, the remote service is asked
//!    once; anything new is imported and steps 1-3 run exactly once more.
//! 5. Collected candidates are resolved by the folder's recording-id hint,
//!    else the first is taken and the tie-break is logged.
//!
//! A store error on one candidate excludes that candidate only.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::db::FingerprintStore;
use crate::model::{Fingerprint, RevisionKey};
use crate::remote::{self, RemoteMetadataApi};

/// Outcome of matching one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// A single revision was identified
    Matched {
        revision: RevisionKey,
        /// The revision already has track records
        has_tracks: bool,
        mismatch_detected: bool,
    },
    /// Several metadata-less revisions matched and none was preferred
    Ambiguous {
        chosen: RevisionKey,
        others: Vec<RevisionKey>,
        mismatch_detected: bool,
    },
    NoMatch { mismatch_detected: bool },
}

impl MatchOutcome {
    /// The revision to use, if any.
    pub fn revision(&self) -> Option<RevisionKey> {
        match self {
            MatchOutcome::Matched { revision, .. } => Some(*revision),
            MatchOutcome::Ambiguous { chosen, .. } => Some(*chosen),
            MatchOutcome::NoMatch { .. } => None,
        }
    }

    /// True when a revision's fingerprint set equals the folder's.
    pub fn is_exact(&self) -> bool {
        self.revision().is_some()
    }

    pub fn mismatch_detected(&self) -> bool {
        match self {
            MatchOutcome::Matched {
                mismatch_detected, ..
            }
            | MatchOutcome::Ambiguous {
                mismatch_detected, ..
            }
            | MatchOutcome::NoMatch { mismatch_detected } => *mismatch_detected,
        }
    }

    pub fn has_tracks(&self) -> bool {
        matches!(self, MatchOutcome::Matched { has_tracks: true, .. })
    }
}

/// Result of one local pass over the store.
#[derive(Debug, Default)]
struct LocalPass {
    with_tracks: Option<RevisionKey>,
    without_tracks: Vec<RevisionKey>,
    mismatch: bool,
    first_unmatched: Option<Fingerprint>,
}

impl LocalPass {
    fn found_any(&self) -> bool {
        self.with_tracks.is_some() || !self.without_tracks.is_empty()
    }
}

/// Matches folders against the store, with an optional remote fallback.
#[derive(Clone, Default)]
pub struct RecordingMatcher {
    remote: Option<Arc<dyn RemoteMetadataApi>>,
}

impl RecordingMatcher {
    pub fn with_remote(remote: Arc<dyn RemoteMetadataApi>) -> Self {
        Self {
            remote: Some(remote),
        }
    }

    /// A matcher that never consults the remote service.
    pub fn local_only() -> Self {
        Self { remote: None }
    }

    /// Match a folder's fingerprints (any order, duplicates allowed).
    pub async fn find_match(
        &self,
        store: &mut dyn FingerprintStore,
        fingerprints: &[Fingerprint],
        id_hint: Option<i64>,
    ) -> MatchOutcome {
        if fingerprints.is_empty() {
            return MatchOutcome::NoMatch {
                mismatch_detected: false,
            };
        }

        let mut pass = local_pass(store, fingerprints).await;

        if !pass.found_any()
            && let Some(api) = self.remote.as_deref()
        {
            let probe = pass
                .first_unmatched
                .clone()
                .unwrap_or_else(|| fingerprints[0].clone());
            match remote_pass(store, api, &probe).await {
                Ok(0) => {
                    tracing::info!(target: "matcher", fingerprint = %probe, "Remote lookup found nothing new");
                }
                Ok(added) => {
                    tracing::info!(target: "matcher", added, "Remote revisions imported, re-running local match");
                    pass = local_pass(store, fingerprints).await;
                }
                Err(e) => {
                    tracing::warn!(target: "matcher", error = %e, "Remote lookup failed");
                }
            }
        }

        resolve(pass, id_hint)
    }
}

async fn local_pass(store: &mut dyn FingerprintStore, fingerprints: &[Fingerprint]) -> LocalPass {
    let mut pass = LocalPass::default();
    let mut candidates = BTreeSet::new();

    for fingerprint in fingerprints {
        match store.revisions_for_fingerprint(fingerprint).await {
            Ok(keys) if !keys.is_empty() => candidates.extend(keys),
            Ok(_) => {
                pass.mismatch = true;
                pass.first_unmatched.get_or_insert_with(|| fingerprint.clone());
            }
            Err(e) => {
                tracing::warn!(target: "matcher", %fingerprint, error = %e, "Fingerprint lookup failed");
                pass.mismatch = true;
                pass.first_unmatched.get_or_insert_with(|| fingerprint.clone());
            }
        }
    }

    if pass.mismatch {
        // No stored set can contain an unknown fingerprint.
        tracing::info!(target: "matcher", candidates = candidates.len(), "Mismatch detected");
        return pass;
    }

    let wanted: HashSet<&Fingerprint> = fingerprints.iter().collect();
    for key in candidates {
        let set = match store.fingerprint_set(key).await {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!(target: "matcher", %key, error = %e, "Excluding candidate");
                continue;
            }
        };
        if set.iter().collect::<HashSet<_>>() != wanted {
            continue;
        }

        match store.track_records(key).await {
            Ok(records) if !records.is_empty() => {
                tracing::info!(target: "matcher", %key, tracks = records.len(), "Matched revision with track records");
                pass.with_tracks = Some(key);
                return pass;
            }
            Ok(_) => {
                tracing::debug!(target: "matcher", %key, "Exact match without track records");
                pass.without_tracks.push(key);
            }
            Err(e) => {
                tracing::warn!(target: "matcher", %key, error = %e, "Excluding candidate");
            }
        }
    }
    pass
}

async fn remote_pass(
    store: &mut dyn FingerprintStore,
    api: &dyn RemoteMetadataApi,
    probe: &Fingerprint,
) -> crate::error::Result<usize> {
    let recording_ids = api.recordings_for_fingerprint(probe).await?;
    tracing::info!(target: "matcher", fingerprint = %probe, recordings = ?recording_ids, "Remote lookup");

    let mut added = 0;
    for recording_id in recording_ids {
        match remote::import_recording(store, api, recording_id).await {
            Ok(n) => added += n,
            Err(e) => {
                tracing::warn!(target: "matcher", recording_id, error = %e, "Remote import failed");
            }
        }
    }
    Ok(added)
}

fn resolve(pass: LocalPass, id_hint: Option<i64>) -> MatchOutcome {
    let mismatch_detected = pass.mismatch;

    if let Some(revision) = pass.with_tracks {
        return MatchOutcome::Matched {
            revision,
            has_tracks: true,
            mismatch_detected,
        };
    }

    let mut candidates = pass.without_tracks;
    if candidates.is_empty() {
        tracing::info!(target: "matcher", mismatch_detected, "No exact match");
        return MatchOutcome::NoMatch { mismatch_detected };
    }

    if let Some(hint) = id_hint
        && let Some(pos) = candidates.iter().position(|k| k.recording_id == hint)
    {
        let chosen = candidates.remove(pos);
        for other in &candidates {
            tracing::warn!(target: "matcher", %chosen, %other, "Ignoring candidate that does not match the folder id");
        }
        return MatchOutcome::Matched {
            revision: chosen,
            has_tracks: false,
            mismatch_detected,
        };
    }

    let chosen = candidates.remove(0);
    if candidates.is_empty() {
        tracing::info!(target: "matcher", %chosen, "Matched revision without track records");
        return MatchOutcome::Matched {
            revision: chosen,
            has_tracks: false,
            mismatch_detected,
        };
    }

    tracing::warn!(
        target: "matcher",
        %chosen,
        others = candidates.len(),
        "Several revisions match and none has track records; taking the first"
    );
    MatchOutcome::Ambiguous {
        chosen,
        others: candidates,
        mismatch_detected,
    }
}
