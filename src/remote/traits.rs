//! Trait definition for the remote metadata service.
//!
//! The matcher only sees [`RemoteMetadataApi`], so tests can substitute
//! [`mocks::MockRemote`] for the real GraphQL client.

use async_trait::async_trait;

use super::domain::{PerformanceDetails, RemoteError, RemoteRevision};
use crate::model::Fingerprint;

/// Remote fingerprint-to-recording lookup.
#[async_trait]
pub trait RemoteMetadataApi: Send + Sync {
    /// Recording ids whose checksums contain `fingerprint`.
    async fn recordings_for_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<i64>, RemoteError>;

    /// Checksum submissions of a recording.
    async fn revisions_for_recording(
        &self,
        recording_id: i64,
    ) -> Result<Vec<RemoteRevision>, RemoteError>;

    /// Performance details of a recording.
    async fn performance(&self, recording_id: i64)
    -> Result<Option<PerformanceDetails>, RemoteError>;
}

#[async_trait]
impl RemoteMetadataApi for super::client::LcdbClient {
    async fn recordings_for_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<i64>, RemoteError> {
        self.recordings_for_fingerprint(fingerprint).await
    }

    async fn revisions_for_recording(
        &self,
        recording_id: i64,
    ) -> Result<Vec<RemoteRevision>, RemoteError> {
        self.revisions_for_recording(recording_id).await
    }

    async fn performance(
        &self,
        recording_id: i64,
    ) -> Result<Option<PerformanceDetails>, RemoteError> {
        self.performance(recording_id).await
    }
}

/// Mock remote service for testing.
#[cfg(test)]
pub mod mocks {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Remote that answers from in-memory tables and records every lookup.
    #[derive(Default)]
    pub struct MockRemote {
        pub recordings: HashMap<Fingerprint, Vec<i64>>,
        pub revisions: HashMap<i64, Vec<RemoteRevision>>,
        pub performances: HashMap<i64, PerformanceDetails>,
        /// Error to return from every call (takes precedence)
        pub error: Option<RemoteError>,
        /// Fingerprints looked up, in call order
        pub lookups: Mutex<Vec<Fingerprint>>,
    }

    impl MockRemote {
        /// A remote that knows nothing.
        pub fn no_matches() -> Self {
            Self::default()
        }

        /// A remote that fails every call.
        pub fn with_error(error: RemoteError) -> Self {
            Self {
                error: Some(error),
                ..Default::default()
            }
        }

        /// A remote holding one recording with one checksum submission.
        pub fn single_recording(
            recording_id: i64,
            revision_id: i64,
            fingerprints: &[Fingerprint],
        ) -> Self {
            let body = fingerprints
                .iter()
                .enumerate()
                .map(|(i, fp)| format!("d1t{:02}.flac:{}\n", i + 1, fp))
                .collect::<String>();
            let mut remote = Self::default();
            for fp in fingerprints {
                remote.recordings.insert(fp.clone(), vec![recording_id]);
            }
            remote.revisions.insert(
                recording_id,
                vec![RemoteRevision {
                    revision_id,
                    label: Some("ffp".into()),
                    body,
                    created_at: None,
                }],
            );
            remote
        }

        pub fn lookup_count(&self) -> usize {
            self.lookups.lock().len()
        }
    }

    #[async_trait]
    impl RemoteMetadataApi for MockRemote {
        async fn recordings_for_fingerprint(
            &self,
            fingerprint: &Fingerprint,
        ) -> Result<Vec<i64>, RemoteError> {
            self.lookups.lock().push(fingerprint.clone());
            if let Some(ref e) = self.error {
                return Err(e.clone());
            }
            Ok(self.recordings.get(fingerprint).cloned().unwrap_or_default())
        }

        async fn revisions_for_recording(
            &self,
            recording_id: i64,
        ) -> Result<Vec<RemoteRevision>, RemoteError> {
            if let Some(ref e) = self.error {
                return Err(e.clone());
            }
            Ok(self.revisions.get(&recording_id).cloned().unwrap_or_default())
        }

        async fn performance(
            &self,
            recording_id: i64,
        ) -> Result<Option<PerformanceDetails>, RemoteError> {
            if let Some(ref e) = self.error {
                return Err(e.clone());
            }
            Ok(self.performances.get(&recording_id).cloned())
        }
    }
}
