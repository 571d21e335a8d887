//! Test utilities and fixtures for concert-minder tests.
//!
//! This module provides common test helpers, mock factories, and
//! database utilities to reduce boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use concert_minder::test_utils::{fp, seed_revision, temp_db};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (pool, _dir) = temp_db().await;
//!     seed_revision(&pool, RevisionKey::new(1, Some(1)), &["a1", "a2"]).await;
//!     // ... test logic
//! }
//! ```

use chrono::NaiveDate;
use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

use crate::model::{ChecksumEntry, Fingerprint, RecordingDetails, RevisionKey, TrackRecord};

/// Creates a temporary database for testing.
///
/// The database is created in a temporary directory that is automatically
/// cleaned up when the returned `TempDir` is dropped. Migrations are run
/// automatically.
///
/// Keep the TempDir alive for the duration of your test.
pub async fn temp_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.display());

    let pool = crate::db::init_db(&db_url)
        .await
        .expect("Failed to initialize test database");

    (pool, dir)
}

/// A fingerprint from a short hex seed, left-padded with zeros.
///
/// `fp("a1")` is `000...0a1`.
pub fn fp(seed: &str) -> Fingerprint {
    Fingerprint::parse(&format!("{:0>32}", seed)).expect("seed must be hex")
}

/// Store a revision whose files are `d1t01.flac`, `d1t02.flac`, ...
pub async fn seed_revision(pool: &SqlitePool, key: RevisionKey, seeds: &[&str]) {
    let entries: Vec<ChecksumEntry> = seeds
        .iter()
        .enumerate()
        .map(|(i, s)| ChecksumEntry {
            file_name: format!("d1t{:02}.flac", i + 1),
            fingerprint: fp(s),
        })
        .collect();
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    crate::db::replace_revision(&mut conn, key, Some("ffp"), &entries)
        .await
        .expect("Failed to seed revision");
}

/// Store `count` simple track records for a revision.
pub async fn seed_tracks(pool: &SqlitePool, key: RevisionKey, count: usize) {
    let records: Vec<TrackRecord> = (1..=count).map(mock_track_record).collect();
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    crate::db::replace_track_records(&mut conn, key, &records, &Default::default())
        .await
        .expect("Failed to seed track records");
}

/// Store a recording with an artist, date and abbreviation.
pub async fn seed_recording(
    pool: &SqlitePool,
    recording_id: i64,
    date: &str,
    artist: &str,
    abbrev: Option<&str>,
) {
    let details = RecordingDetails {
        recording_id,
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
        artist_id: Some(recording_id * 10),
        artist_name: Some(artist.to_string()),
        artist_abbrev: abbrev.map(str::to_string),
        ..Default::default()
    };
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    crate::db::upsert_recording(&mut conn, &details)
        .await
        .expect("Failed to seed recording");
}

/// Creates a mock TrackRecord for track `n` of disc 1.
pub fn mock_track_record(n: usize) -> TrackRecord {
    TrackRecord {
        disc_number: "1".to_string(),
        track_number: format!("{:02}", n),
        title: format!("Song {}", n),
        fingerprint: None,
        bit_depth: Some(16),
        sample_rate: Some(44_100),
        duration: "05:00".to_string(),
        channels: Some(2),
        file_name: format!("d1t{:02}.flac", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_temp_db_creates_working_database() {
        let (pool, _dir) = temp_db().await;

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM signatures")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_fp_pads_seed() {
        let f = fp("a1");
        assert_eq!(f.as_str().len(), 32);
        assert!(f.as_str().ends_with("0a1"));
    }

    #[tokio::test]
    async fn test_seed_helpers() {
        let (pool, _dir) = temp_db().await;
        let key = RevisionKey::new(5, Some(1));
        seed_revision(&pool, key, &["a1", "a2"]).await;
        seed_tracks(&pool, key, 2).await;
        seed_recording(&pool, 5, "1975-07-05", "Grateful Dead", Some("gd")).await;

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(crate::db::get_track_records(&mut conn, key).await.unwrap().len(), 2);
        let details = crate::db::get_recording_details(&mut conn, 5)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.artist_abbrev.as_deref(), Some("gd"));
    }
}
