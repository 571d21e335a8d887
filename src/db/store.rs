//! Fingerprint store abstraction.
//!
//! The matcher and pipeline talk to the catalog through [`FingerprintStore`]
//! so tests can substitute failing or in-memory stores. [`SqliteStore`] is
//! the production implementation; it owns one pooled connection for its
//! whole lifetime, which is what gives every batch worker its own handle.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqlitePool};

use crate::listing::cleanup::TitleTransformations;
use crate::model::{ChecksumEntry, Fingerprint, RecordingDetails, RevisionKey, TrackRecord};

/// Errors raised by a fingerprint store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt data for revision {key}: {message}")]
    Corrupt { key: RevisionKey, message: String },
}

/// Keyed access to the checksum catalog.
///
/// Methods take `&mut self`: a store is a single handle and is never shared
/// between workers.
#[async_trait]
pub trait FingerprintStore: Send {
    /// All revisions whose complete set contains `fingerprint`.
    async fn revisions_for_fingerprint(
        &mut self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<RevisionKey>, StoreError>;

    /// Complete fingerprint set of a revision (empty when unknown).
    async fn fingerprint_set(&mut self, key: RevisionKey) -> Result<Vec<Fingerprint>, StoreError>;

    /// Track records of a revision (empty when none were imported).
    async fn track_records(&mut self, key: RevisionKey) -> Result<Vec<TrackRecord>, StoreError>;

    /// Replace all track records of a revision.
    async fn replace_track_records(
        &mut self,
        key: RevisionKey,
        records: &[TrackRecord],
    ) -> Result<(), StoreError>;

    /// Store (replacing) the complete fingerprint set of a revision.
    async fn insert_revision(
        &mut self,
        key: RevisionKey,
        label: Option<&str>,
        entries: &[ChecksumEntry],
    ) -> Result<(), StoreError>;

    async fn recording_details(
        &mut self,
        recording_id: i64,
    ) -> Result<Option<RecordingDetails>, StoreError>;

    async fn upsert_recording(&mut self, details: &RecordingDetails) -> Result<(), StoreError>;

    /// Record that `folder_name` was resolved to `recording_id`.
    async fn log_folder(&mut self, recording_id: i64, folder_name: &str)
    -> Result<(), StoreError>;
}

/// SQLite-backed store holding one pooled connection.
pub struct SqliteStore {
    conn: PoolConnection<Sqlite>,
    transforms: Arc<TitleTransformations>,
}

impl SqliteStore {
    pub fn new(conn: PoolConnection<Sqlite>, transforms: Arc<TitleTransformations>) -> Self {
        Self { conn, transforms }
    }

    /// Acquire a dedicated connection from the pool.
    pub async fn acquire(
        pool: &SqlitePool,
        transforms: Arc<TitleTransformations>,
    ) -> Result<Self, StoreError> {
        let conn = pool.acquire().await?;
        Ok(Self::new(conn, transforms))
    }
}

#[async_trait]
impl FingerprintStore for SqliteStore {
    async fn revisions_for_fingerprint(
        &mut self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<RevisionKey>, StoreError> {
        Ok(super::revisions_for_fingerprint(&mut self.conn, fingerprint).await?)
    }

    async fn fingerprint_set(&mut self, key: RevisionKey) -> Result<Vec<Fingerprint>, StoreError> {
        let raw = super::fingerprints_for_revision(&mut self.conn, key).await?;
        raw.iter()
            .map(|s| {
                Fingerprint::parse(s).ok_or_else(|| StoreError::Corrupt {
                    key,
                    message: format!("invalid fingerprint '{s}'"),
                })
            })
            .collect()
    }

    async fn track_records(&mut self, key: RevisionKey) -> Result<Vec<TrackRecord>, StoreError> {
        Ok(super::get_track_records(&mut self.conn, key).await?)
    }

    async fn replace_track_records(
        &mut self,
        key: RevisionKey,
        records: &[TrackRecord],
    ) -> Result<(), StoreError> {
        super::replace_track_records(&mut self.conn, key, records, &self.transforms).await?;
        Ok(())
    }

    async fn insert_revision(
        &mut self,
        key: RevisionKey,
        label: Option<&str>,
        entries: &[ChecksumEntry],
    ) -> Result<(), StoreError> {
        super::replace_revision(&mut self.conn, key, label, entries).await?;
        Ok(())
    }

    async fn recording_details(
        &mut self,
        recording_id: i64,
    ) -> Result<Option<RecordingDetails>, StoreError> {
        Ok(super::get_recording_details(&mut self.conn, recording_id).await?)
    }

    async fn upsert_recording(&mut self, details: &RecordingDetails) -> Result<(), StoreError> {
        super::upsert_recording(&mut self.conn, details).await?;
        Ok(())
    }

    async fn log_folder(
        &mut self,
        recording_id: i64,
        folder_name: &str,
    ) -> Result<(), StoreError> {
        super::insert_folder_log(&mut self.conn, recording_id, folder_name).await?;
        Ok(())
    }
}

/// Store wrappers for testing failure handling.
#[cfg(test)]
pub mod mocks {
    use std::collections::HashSet;

    use super::*;

    /// Delegates to an inner store but fails chosen operations.
    pub struct FailingStore<S> {
        pub inner: S,
        /// Revisions whose fingerprint set cannot be loaded
        pub broken_sets: HashSet<RevisionKey>,
        /// Revisions whose track records cannot be loaded
        pub broken_tracks: HashSet<RevisionKey>,
    }

    impl<S> FailingStore<S> {
        pub fn new(inner: S) -> Self {
            Self {
                inner,
                broken_sets: HashSet::new(),
                broken_tracks: HashSet::new(),
            }
        }

        fn corrupt(key: RevisionKey) -> StoreError {
            StoreError::Corrupt {
                key,
                message: "injected failure".to_string(),
            }
        }
    }

    #[async_trait]
    impl<S: FingerprintStore> FingerprintStore for FailingStore<S> {
        async fn revisions_for_fingerprint(
            &mut self,
            fingerprint: &Fingerprint,
        ) -> Result<Vec<RevisionKey>, StoreError> {
            self.inner.revisions_for_fingerprint(fingerprint).await
        }

        async fn fingerprint_set(
            &mut self,
            key: RevisionKey,
        ) -> Result<Vec<Fingerprint>, StoreError> {
            if self.broken_sets.contains(&key) {
                return Err(Self::corrupt(key));
            }
            self.inner.fingerprint_set(key).await
        }

        async fn track_records(
            &mut self,
            key: RevisionKey,
        ) -> Result<Vec<TrackRecord>, StoreError> {
            if self.broken_tracks.contains(&key) {
                return Err(Self::corrupt(key));
            }
            self.inner.track_records(key).await
        }

        async fn replace_track_records(
            &mut self,
            key: RevisionKey,
            records: &[TrackRecord],
        ) -> Result<(), StoreError> {
            self.inner.replace_track_records(key, records).await
        }

        async fn insert_revision(
            &mut self,
            key: RevisionKey,
            label: Option<&str>,
            entries: &[ChecksumEntry],
        ) -> Result<(), StoreError> {
            self.inner.insert_revision(key, label, entries).await
        }

        async fn recording_details(
            &mut self,
            recording_id: i64,
        ) -> Result<Option<RecordingDetails>, StoreError> {
            self.inner.recording_details(recording_id).await
        }

        async fn upsert_recording(&mut self, details: &RecordingDetails) -> Result<(), StoreError> {
            self.inner.upsert_recording(details).await
        }

        async fn log_folder(
            &mut self,
            recording_id: i64,
            folder_name: &str,
        ) -> Result<(), StoreError> {
            self.inner.log_folder(recording_id, folder_name).await
        }
    }
}
