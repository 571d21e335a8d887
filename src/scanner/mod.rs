//! Folder discovery and loading.
//!
//! A candidate folder is a directory that directly contains audio files.
//! Loading is non-recursive: the folder's own audio files (in disc/track
//! order) and its `.txt` listings.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use futures::stream::Stream;
use regex::Regex;
use tokio::sync::mpsc;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::metadata;
use crate::model::{CandidateFolder, folder_name, parse_id_hint};

static DISC_TRACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[ds]([0-9]+)t([0-9]+)").expect("static regex"));

/// Sort key of an audio file within its folder.
///
/// Files whose stem carries a `d<disc>t<track>` (or `s<set>t<track>`)
/// marker sort by that pair; all others follow, by lowercased stem.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileSortKey {
    Marked { disc: u32, track: u32, stem: String },
    Unmarked { stem: String },
}

pub fn file_sort_key(path: &Path) -> FileSortKey {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if let Some(caps) = DISC_TRACK.captures(&stem) {
        let disc = caps[1].parse().ok();
        let track = caps[2].parse().ok();
        if let (Some(disc), Some(track)) = (disc, track) {
            return FileSortKey::Marked { disc, track, stem };
        }
    }
    FileSortKey::Unmarked { stem }
}

/// Listing files of a folder, in the order they should be tried.
///
/// Files with `info` in their name come first, the rest follow by name.
pub fn listing_files(folder: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut listings: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_extension(p, "txt"))
        .collect();
    listings.sort_by_key(|p| {
        let name = folder_name(p).to_lowercase();
        (!name.contains("info"), name)
    });
    Ok(listings)
}

/// Audio files of a folder in sort-key order.
pub fn audio_files(folder: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && metadata::is_audio_file(p))
        .collect();
    files.sort_by_cached_key(|p| file_sort_key(p));
    Ok(files)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Load a folder: read every audio file's fingerprint and tags.
///
/// Unreadable audio files are skipped and reported in the returned error
/// list; only an unreadable directory fails the whole call.
pub fn load_folder(path: &Path) -> Result<(CandidateFolder, Vec<String>)> {
    if !path.is_dir() {
        return Err(Error::not_found(path));
    }

    let mut errors = Vec::new();
    let mut files = Vec::new();
    for file in audio_files(path)? {
        match metadata::read_audio_file(&file) {
            Ok(audio) => files.push(audio),
            Err(e) => {
                tracing::warn!(target: "scanner", path = %file.display(), error = %e, "Skipping audio file");
                errors.push(e.to_string());
            }
        }
    }

    let name = folder_name(path);
    let folder = CandidateFolder {
        path: path.to_path_buf(),
        files,
        listings: listing_files(path)?,
        id_hint: parse_id_hint(&name),
    };
    tracing::debug!(
        target: "scanner",
        folder = %name,
        files = folder.files.len(),
        listings = folder.listings.len(),
        "Loaded folder"
    );
    Ok((folder, errors))
}

/// Scans `root` recursively for directories that directly contain audio.
///
/// Each folder is yielded once, in traversal order.
pub fn scan(root: PathBuf) -> impl Stream<Item = PathBuf> {
    let (tx, rx) = mpsc::channel(100);

    // Spawn a blocking task to perform the synchronous file system traversal
    tokio::task::spawn_blocking(move || {
        let mut seen = HashSet::new();
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() || !metadata::is_audio_file(entry.path()) {
                continue;
            }
            let Some(parent) = entry.path().parent() else {
                continue;
            };
            if seen.insert(parent.to_path_buf()) && tx.blocking_send(parent.to_path_buf()).is_err() {
                break;
            }
        }
    });

    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|path| (path, rx))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::fixtures::write_flac;
    use futures::StreamExt;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_sort_key_orders_by_disc_then_track() {
        let mut names = vec![
            "gd75-07-05d2t01.flac",
            "notes-bonus.flac",
            "gd75-07-05d1t10.flac",
            "gd75-07-05d1t02.flac",
            "Applause.flac",
        ];
        names.sort_by_key(|n| file_sort_key(Path::new(n)));
        assert_eq!(
            names,
            vec![
                "gd75-07-05d1t02.flac",
                "gd75-07-05d1t10.flac",
                "gd75-07-05d2t01.flac",
                "Applause.flac",
                "notes-bonus.flac",
            ]
        );
    }

    #[test]
    fn test_set_marker_counts_as_disc() {
        assert_eq!(
            file_sort_key(Path::new("ph1995-12-31s2t03.flac")),
            FileSortKey::Marked {
                disc: 2,
                track: 3,
                stem: "ph1995-12-31s2t03".into()
            }
        );
    }

    #[test]
    fn test_fullwidth_marker_is_unmarked() {
        assert!(matches!(
            file_sort_key(Path::new("d\u{FF11}t\u{FF10}\u{FF11}.flac")),
            FileSortKey::Unmarked { .. }
        ));
    }

    #[test]
    fn test_listing_order_prefers_info() {
        let dir = tempdir().unwrap();
        for name in ["a-notes.txt", "gd75-07-05.info.txt", "lineage.txt", "cover.jpg"] {
            File::create(dir.path().join(name)).unwrap();
        }
        let names: Vec<String> = listing_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| folder_name(p))
            .collect();
        assert_eq!(names, vec!["gd75-07-05.info.txt", "a-notes.txt", "lineage.txt"]);
    }

    #[test]
    fn test_load_folder_collects_errors() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("gd1975-07-05.12345.sbd");
        std::fs::create_dir(&folder).unwrap();
        write_flac(&folder, "d1t02.flac", 2);
        write_flac(&folder, "d1t01.flac", 1);
        File::create(folder.join("d1t03.shn")).unwrap();
        File::create(folder.join("info.txt")).unwrap();

        let (loaded, errors) = load_folder(&folder).unwrap();
        let names: Vec<_> = loaded.files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["d1t01.flac", "d1t02.flac"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(loaded.listings.len(), 1);
        assert_eq!(loaded.id_hint, Some(12345));
    }

    #[test]
    fn test_load_missing_folder() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_folder(&dir.path().join("nope")),
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_scan_yields_audio_folders_once() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        let show = root.join("gd75-07-05.sbd");
        std::fs::create_dir(&show).unwrap();
        File::create(show.join("d1t01.flac")).unwrap();
        File::create(show.join("d1t02.flac")).unwrap();

        let nested = root.join("1977").join("gd77-05-08.aud");
        std::fs::create_dir_all(&nested).unwrap();
        File::create(nested.join("t01.SHN")).unwrap();

        let text_only = root.join("artwork");
        std::fs::create_dir(&text_only).unwrap();
        File::create(text_only.join("notes.txt")).unwrap();

        let paths: Vec<PathBuf> = scan(root.to_path_buf()).collect().await;
        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&show));
        assert!(paths.contains(&nested));
    }
}
