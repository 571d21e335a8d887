//! Remote metadata service (LCDB GraphQL API)
//!
//! Consulted by the matcher when the local catalog has no exact match.
//! Newly discovered checksum submissions are written to the local store
//! with [`import_recording`] so later runs find them locally.

pub mod adapter;
mod client;
pub mod domain;
pub mod dto;
pub mod traits;

pub use client::LcdbClient;
pub use domain::{PerformanceDetails, RemoteError, RemoteRevision};
pub use traits::RemoteMetadataApi;

use crate::checksums;
use crate::db::FingerprintStore;
use crate::error::Result;
use crate::model::RevisionKey;

/// Public LCDB GraphQL endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://graphql.lcdb.org";

/// Copy a recording's checksum submissions and details into the store.
///
/// Revisions the store already holds are left untouched. Returns how many
/// revisions were new.
pub async fn import_recording(
    store: &mut dyn FingerprintStore,
    api: &dyn RemoteMetadataApi,
    recording_id: i64,
) -> Result<usize> {
    let revisions = api.revisions_for_recording(recording_id).await?;
    let mut added = 0;

    for revision in revisions {
        let key = RevisionKey::new(recording_id, Some(revision.revision_id));
        let entries = checksums::parse_body(&revision.body);
        if entries.is_empty() {
            tracing::debug!(target: "remote", %key, "Submission has no checksum lines");
            continue;
        }
        if !store.fingerprint_set(key).await?.is_empty() {
            continue;
        }
        store
            .insert_revision(key, revision.label.as_deref(), &entries)
            .await?;
        tracing::info!(target: "remote", %key, files = entries.len(), "Imported checksum submission");
        added += 1;
    }

    match api.performance(recording_id).await {
        Ok(Some(perf)) => store.upsert_recording(&perf.into_recording_details()).await?,
        Ok(None) => {
            tracing::warn!(target: "remote", recording_id, "No performance details");
        }
        Err(e) => {
            tracing::warn!(target: "remote", recording_id, error = %e, "Performance lookup failed");
        }
    }

    Ok(added)
}
