//! Database module for the checksum catalog.
//!
//! Uses SQLx with SQLite for lightweight, embedded database storage.
//! Provides async operations for:
//! - Fingerprint -> revision lookups and complete fingerprint sets
//! - Track record import with full-replace semantics
//! - Recording and artist details
//! - The folder log
//!
//! Query functions take a `&mut SqliteConnection` so that every batch
//! worker can run them on the connection it owns (see [`SqliteStore`]).
//!
//! # Example
//!
//! ```ignore
//! use concert_minder::db::{init_db, SqliteStore};
//!
//! let pool = init_db("sqlite:concert_minder.db").await?;
//! let mut store = SqliteStore::acquire(&pool, transforms).await?;
//! ```

pub mod store;

pub use store::{FingerprintStore, SqliteStore, StoreError};

use chrono::NaiveDate;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Connection;

use crate::listing::cleanup::{TitleTransformations, clean_title_field};
use crate::model::{ChecksumEntry, Fingerprint, RecordingDetails, RevisionKey, TrackRecord};

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "concert_minder.db";

/// Upper bound on pooled connections; one is held per batch worker.
pub const MAX_CONNECTIONS: u32 = 8;

/// Build a SQLite database URL from an optional path.
///
/// If no path is provided, uses [`DEFAULT_DB_NAME`] in the current directory.
pub fn db_url(path: Option<&std::path::Path>) -> String {
    match path {
        Some(p) => format!("sqlite:{}", p.display()),
        None => format!("sqlite:{}", DEFAULT_DB_NAME),
    }
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist, establishes a connection
/// pool with up to [`MAX_CONNECTIONS`] connections, and runs all pending
/// migrations.
///
/// # Errors
///
/// Returns an error if:
/// - Database creation fails
/// - Connection cannot be established
/// - Migration fails
pub async fn init_db(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// All revisions whose complete set contains `fingerprint`, ascending.
pub async fn revisions_for_fingerprint(
    conn: &mut SqliteConnection,
    fingerprint: &Fingerprint,
) -> sqlx::Result<Vec<RevisionKey>> {
    let rows: Vec<(i64, Option<i64>)> = sqlx::query_as(
        r#"
        SELECT DISTINCT recording_id, revision_id
        FROM signatures
        WHERE fingerprint = ?
        ORDER BY recording_id, revision_id
        "#,
    )
    .bind(fingerprint.as_str())
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(recording_id, revision_id)| RevisionKey::new(recording_id, revision_id))
        .collect())
}

/// Raw fingerprint strings stored for a revision.
pub async fn fingerprints_for_revision(
    conn: &mut SqliteConnection,
    key: RevisionKey,
) -> sqlx::Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT fingerprint FROM signatures WHERE recording_id = ? AND revision_id IS ?",
    )
    .bind(key.recording_id)
    .bind(key.revision_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(|(fp,)| fp).collect())
}

/// Store the complete fingerprint set of a revision.
///
/// Any existing rows of the revision are deleted first, in the same
/// transaction, so a reimport replaces rather than merges.
pub async fn replace_revision(
    conn: &mut SqliteConnection,
    key: RevisionKey,
    label: Option<&str>,
    entries: &[ChecksumEntry],
) -> sqlx::Result<()> {
    let mut tx = conn.begin().await?;

    sqlx::query("DELETE FROM signatures WHERE recording_id = ? AND revision_id IS ?")
        .bind(key.recording_id)
        .bind(key.revision_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM checksum_files WHERE recording_id = ? AND revision_id IS ?")
        .bind(key.recording_id)
        .bind(key.revision_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO checksum_files (recording_id, revision_id, label, imported_at) VALUES (?, ?, ?, ?)",
    )
    .bind(key.recording_id)
    .bind(key.revision_id)
    .bind(label)
    .bind(chrono::Local::now().to_rfc3339())
    .execute(&mut *tx)
    .await?;

    for entry in entries {
        sqlx::query(
            "INSERT INTO signatures (recording_id, revision_id, file_name, fingerprint) VALUES (?, ?, ?, ?)",
        )
        .bind(key.recording_id)
        .bind(key.revision_id)
        .bind(&entry.file_name)
        .bind(entry.fingerprint.as_str())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

type TrackRow = (
    String,
    String,
    String,
    Option<String>,
    Option<i64>,
    Option<i64>,
    String,
    Option<i64>,
    String,
);

/// Track records of a revision in disc/track order.
pub async fn get_track_records(
    conn: &mut SqliteConnection,
    key: RevisionKey,
) -> sqlx::Result<Vec<TrackRecord>> {
    let rows: Vec<TrackRow> = sqlx::query_as(
        r#"
        SELECT disc_number, track_number, title, fingerprint, bit_depth,
               sample_rate, duration, channels, file_name
        FROM track_metadata
        WHERE recording_id = ? AND revision_id IS ?
        ORDER BY CAST(disc_number AS INTEGER), CAST(track_number AS INTEGER)
        "#,
    )
    .bind(key.recording_id)
    .bind(key.revision_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(disc, track, title, fp, bits, rate, duration, channels, file_name)| TrackRecord {
                disc_number: disc,
                track_number: track,
                title,
                fingerprint: fp.and_then(|s| Fingerprint::parse(&s)),
                bit_depth: bits.and_then(|v| u8::try_from(v).ok()),
                sample_rate: rate.and_then(|v| u32::try_from(v).ok()),
                duration,
                channels: channels.and_then(|v| u8::try_from(v).ok()),
                file_name,
            },
        )
        .collect())
}

/// Replace every track record of a revision.
///
/// `title_clean` and `gazinta` are derived from each title with the
/// curated transformation table.
pub async fn replace_track_records(
    conn: &mut SqliteConnection,
    key: RevisionKey,
    records: &[TrackRecord],
    transforms: &TitleTransformations,
) -> sqlx::Result<()> {
    let mut tx = conn.begin().await?;

    sqlx::query("DELETE FROM track_metadata WHERE recording_id = ? AND revision_id IS ?")
        .bind(key.recording_id)
        .bind(key.revision_id)
        .execute(&mut *tx)
        .await?;

    for record in records {
        let (title_clean, gazinta) = clean_title_field(&record.title, transforms);
        sqlx::query(
            r#"
            INSERT INTO track_metadata (
                recording_id, revision_id, disc_number, track_number, title,
                title_clean, gazinta, fingerprint, bit_depth, sample_rate,
                duration, channels, file_name
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(key.recording_id)
        .bind(key.revision_id)
        .bind(&record.disc_number)
        .bind(&record.track_number)
        .bind(&record.title)
        .bind(title_clean)
        .bind(gazinta)
        .bind(record.fingerprint.as_ref().map(|f| f.as_str()))
        .bind(record.bit_depth.map(i64::from))
        .bind(record.sample_rate.map(i64::from))
        .bind(&record.duration)
        .bind(record.channels.map(i64::from))
        .bind(&record.file_name)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

type DetailsRow = (
    i64,
    Option<String>,
    Option<i64>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// Recording details joined with the artist, if the recording is known.
pub async fn get_recording_details(
    conn: &mut SqliteConnection,
    recording_id: i64,
) -> sqlx::Result<Option<RecordingDetails>> {
    let row: Option<DetailsRow> = sqlx::query_as(
        r#"
        SELECT r.id, r.performance_date, r.artist_id, a.name, a.abbreviation,
               r.venue, r.city, r.source
        FROM recordings r
        LEFT JOIN artists a ON a.id = r.artist_id
        WHERE r.id = ?
        "#,
    )
    .bind(recording_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(
        |(id, date, artist_id, artist_name, abbrev, venue, city, source)| RecordingDetails {
            recording_id: id,
            date: date.as_deref().and_then(parse_catalog_date),
            artist_id,
            artist_name,
            artist_abbrev: abbrev.filter(|a| !a.trim().is_empty()),
            venue,
            city,
            source,
        },
    ))
}

/// Insert or update a recording and its artist.
///
/// Fields missing from `details` keep their stored value. An existing
/// artist abbreviation is never overwritten.
pub async fn upsert_recording(
    conn: &mut SqliteConnection,
    details: &RecordingDetails,
) -> sqlx::Result<()> {
    let mut tx = conn.begin().await?;

    if let (Some(artist_id), Some(name)) = (details.artist_id, details.artist_name.as_deref()) {
        sqlx::query(
            r#"
            INSERT INTO artists (id, name, abbreviation)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                abbreviation = COALESCE(artists.abbreviation, excluded.abbreviation)
            "#,
        )
        .bind(artist_id)
        .bind(name)
        .bind(details.artist_abbrev.as_deref())
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO recordings (id, performance_date, artist_id, venue, city, source)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            performance_date = COALESCE(excluded.performance_date, recordings.performance_date),
            artist_id = COALESCE(excluded.artist_id, recordings.artist_id),
            venue = COALESCE(excluded.venue, recordings.venue),
            city = COALESCE(excluded.city, recordings.city),
            source = COALESCE(excluded.source, recordings.source)
        "#,
    )
    .bind(details.recording_id)
    .bind(details.date.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(details.artist_id)
    .bind(details.venue.as_deref())
    .bind(details.city.as_deref())
    .bind(details.source.as_deref())
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

/// Append a folder log entry stamped with the local time.
pub async fn insert_folder_log(
    conn: &mut SqliteConnection,
    recording_id: i64,
    folder_name: &str,
) -> sqlx::Result<i64> {
    let result =
        sqlx::query("INSERT INTO folder_log (recording_id, folder_name, checked_at) VALUES (?, ?, ?)")
            .bind(recording_id)
            .bind(folder_name)
            .bind(chrono::Local::now().to_rfc3339())
            .execute(&mut *conn)
            .await?;
    Ok(result.last_insert_rowid())
}

/// Folder log entries of a recording, oldest first.
pub async fn folder_log_for(
    conn: &mut SqliteConnection,
    recording_id: i64,
) -> sqlx::Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT folder_name FROM folder_log WHERE recording_id = ? ORDER BY id")
            .bind(recording_id)
            .fetch_all(&mut *conn)
            .await?;
    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Load the curated title transformation table.
pub async fn load_title_transformations(pool: &SqlitePool) -> sqlx::Result<TitleTransformations> {
    let rows: Vec<(String, String, bool)> =
        sqlx::query_as("SELECT title, title_clean, gazinta FROM title_transformations")
            .fetch_all(pool)
            .await?;
    Ok(TitleTransformations::from_rows(rows))
}

/// Insert or replace one title transformation.
pub async fn upsert_title_transformation(
    pool: &SqlitePool,
    title: &str,
    title_clean: &str,
    gazinta: bool,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO title_transformations (title, title_clean, gazinta)
        VALUES (?, ?, ?)
        ON CONFLICT(title) DO UPDATE SET
            title_clean = excluded.title_clean,
            gazinta = excluded.gazinta
        "#,
    )
    .bind(title)
    .bind(title_clean)
    .bind(gazinta)
    .execute(pool)
    .await?;
    Ok(())
}

/// Parse a catalog date. Accepts `YYYY-MM-DD` with optional trailing time.
pub fn parse_catalog_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let head = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fp, temp_db};

    fn entries(fps: &[&str]) -> Vec<ChecksumEntry> {
        fps.iter()
            .enumerate()
            .map(|(i, s)| ChecksumEntry {
                file_name: format!("d1t{:02}.flac", i + 1),
                fingerprint: fp(s),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_replace_revision_is_full_replace() {
        let (pool, _dir) = temp_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let key = RevisionKey::new(100, Some(7));

        replace_revision(&mut conn, key, Some("ffp"), &entries(&["a", "b"]))
            .await
            .unwrap();
        replace_revision(&mut conn, key, Some("ffp"), &entries(&["c"]))
            .await
            .unwrap();

        let stored = fingerprints_for_revision(&mut conn, key).await.unwrap();
        assert_eq!(stored, vec![fp("c").to_string()]);
        assert!(
            revisions_for_fingerprint(&mut conn, &fp("a"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_null_revision_id_round_trips() {
        let (pool, _dir) = temp_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let key = RevisionKey::new(5, None);

        replace_revision(&mut conn, key, None, &entries(&["a"]))
            .await
            .unwrap();

        let found = revisions_for_fingerprint(&mut conn, &fp("a")).await.unwrap();
        assert_eq!(found, vec![key]);
        assert_eq!(fingerprints_for_revision(&mut conn, key).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_track_records_replace_and_clean() {
        let (pool, _dir) = temp_db().await;
        let mut conn = pool.acquire().await.unwrap();
        let key = RevisionKey::new(42, Some(1));
        let transforms = TitleTransformations::default();

        let first = vec![TrackRecord {
            disc_number: "1".into(),
            track_number: "01".into(),
            title: "Help On The Way ->".into(),
            duration: "05:01".into(),
            file_name: "d1t01.flac".into(),
            ..Default::default()
        }];
        replace_track_records(&mut conn, key, &first, &transforms)
            .await
            .unwrap();

        let (clean, gazinta): (String, bool) = sqlx::query_as(
            "SELECT title_clean, gazinta FROM track_metadata WHERE recording_id = 42",
        )
        .fetch_one(&mut *conn)
        .await
        .unwrap();
        assert_eq!(clean, "Help On The Way");
        assert!(gazinta);

        let second = vec![
            TrackRecord {
                track_number: "02".into(),
                disc_number: "1".into(),
                title: "Slipknot!".into(),
                ..Default::default()
            },
            TrackRecord {
                track_number: "01".into(),
                disc_number: "1".into(),
                title: "Help On The Way".into(),
                ..Default::default()
            },
        ];
        replace_track_records(&mut conn, key, &second, &transforms)
            .await
            .unwrap();

        let records = get_track_records(&mut conn, key).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].track_number, "01");
        assert_eq!(records[1].title, "Slipknot!");
    }

    #[tokio::test]
    async fn test_upsert_recording_keeps_abbreviation() {
        let (pool, _dir) = temp_db().await;
        let mut conn = pool.acquire().await.unwrap();

        let details = RecordingDetails {
            recording_id: 123,
            date: NaiveDate::from_ymd_opt(1975, 7, 5),
            artist_id: Some(2),
            artist_name: Some("Grateful Dead".into()),
            artist_abbrev: Some("gd".into()),
            venue: Some("Winterland".into()),
            ..Default::default()
        };
        upsert_recording(&mut conn, &details).await.unwrap();

        let update = RecordingDetails {
            recording_id: 123,
            artist_id: Some(2),
            artist_name: Some("Grateful Dead".into()),
            city: Some("San Francisco".into()),
            ..Default::default()
        };
        upsert_recording(&mut conn, &update).await.unwrap();

        let loaded = get_recording_details(&mut conn, 123).await.unwrap().unwrap();
        assert_eq!(loaded.artist_abbrev.as_deref(), Some("gd"));
        assert_eq!(loaded.date, NaiveDate::from_ymd_opt(1975, 7, 5));
        assert_eq!(loaded.venue.as_deref(), Some("Winterland"));
        assert_eq!(loaded.city.as_deref(), Some("San Francisco"));
    }

    #[tokio::test]
    async fn test_folder_log() {
        let (pool, _dir) = temp_db().await;
        let mut conn = pool.acquire().await.unwrap();
        insert_folder_log(&mut conn, 9, "gd1975-07-05.9.sbd")
            .await
            .unwrap();
        assert_eq!(
            folder_log_for(&mut conn, 9).await.unwrap(),
            vec!["gd1975-07-05.9.sbd".to_string()]
        );
    }

    #[tokio::test]
    async fn test_title_transformations_round_trip() {
        let (pool, _dir) = temp_db().await;
        upsert_title_transformation(&pool, "Sugar Mag", "Sugar Magnolia", false)
            .await
            .unwrap();
        let table = load_title_transformations(&pool).await.unwrap();
        assert_eq!(
            table.lookup("Sugar Mag"),
            Some(("Sugar Magnolia", false))
        );
    }

    #[test]
    fn test_parse_catalog_date() {
        assert_eq!(
            parse_catalog_date("1977-05-08"),
            NaiveDate::from_ymd_opt(1977, 5, 8)
        );
        assert_eq!(
            parse_catalog_date("1977-05-08T00:00:00Z"),
            NaiveDate::from_ymd_opt(1977, 5, 8)
        );
        assert_eq!(parse_catalog_date("unknown"), None);
    }
}
