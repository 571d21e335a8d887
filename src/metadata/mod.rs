//! Audio file fingerprint and tag reading.
//!
//! Uses the lofty crate for FLAC access. A file's fingerprint is the MD5
//! signature of its decoded audio, stored by the encoder in the STREAMINFO
//! block. Tags are only ever read here; nothing is written back.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use lofty::config::ParseOptions;
use lofty::file::AudioFile as _;
use lofty::flac::FlacFile;
use lofty::tag::Accessor;

use crate::error::{Error, Result};
use crate::model::{AudioFile, AudioProperties, ExistingTags, Fingerprint, folder_name};

/// Extensions treated as audio when discovering folder contents.
pub const AUDIO_EXTENSIONS: [&str; 6] = ["flac", "shn", "wav", "mp3", "ogg", "m4a"];

/// Extensions that carry an embedded content signature.
pub const FINGERPRINT_EXTENSIONS: [&str; 1] = ["flac"];

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// True for any file the scanner should count as audio.
pub fn is_audio_file(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
}

/// Read the fingerprint, existing tags and stream properties of one file.
///
/// Fails for formats without an embedded signature and for FLAC files whose
/// encoder left the signature unset (all zeros).
pub fn read_audio_file(path: &Path) -> Result<AudioFile> {
    let ext = extension_of(path).unwrap_or_default();
    if !FINGERPRINT_EXTENSIONS.contains(&ext.as_str()) {
        return Err(Error::metadata(
            path,
            format!("no embedded content signature in .{ext} files"),
        ));
    }

    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::not_found(path)
        } else {
            Error::Io(e)
        }
    })?;
    let mut reader = BufReader::new(file);
    let flac = FlacFile::read_from(&mut reader, ParseOptions::new())
        .map_err(|e| Error::metadata(path, e.to_string()))?;

    let props = flac.properties();
    let signature = props.signature();
    if signature == 0 {
        return Err(Error::metadata(path, "STREAMINFO signature is unset"));
    }

    let tags = flac
        .vorbis_comments()
        .map(|vc| ExistingTags {
            disc: vc.disk().map(|d| d.to_string()),
            track: vc.track().map(|t| format!("{:02}", t)),
            title: vc.title().map(|t| t.trim().to_string()),
        })
        .unwrap_or_default();

    let properties = AudioProperties {
        bit_depth: Some(props.bit_depth()),
        sample_rate: Some(props.sample_rate()),
        channels: Some(props.channels()),
        duration_secs: props.duration().as_secs(),
    };

    Ok(AudioFile {
        path: path.to_path_buf(),
        file_name: folder_name(path),
        fingerprint: Fingerprint::from_md5(signature),
        tags,
        properties,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Minimal FLAC streams for tests that need real files on disk.

    use std::path::{Path, PathBuf};

    /// Bytes of a FLAC stream holding only a STREAMINFO block.
    pub fn flac_bytes(signature: u128, total_samples: u64) -> Vec<u8> {
        let sample_rate: u64 = 44_100;
        let channels: u64 = 2;
        let bits_per_sample: u64 = 16;

        let mut info = Vec::with_capacity(34);
        info.extend_from_slice(&4096u16.to_be_bytes());
        info.extend_from_slice(&4096u16.to_be_bytes());
        info.extend_from_slice(&[0, 0, 0]);
        info.extend_from_slice(&[0, 0, 0]);
        let packed = (sample_rate << 44)
            | ((channels - 1) << 41)
            | ((bits_per_sample - 1) << 36)
            | (total_samples & 0xF_FFFF_FFFF);
        info.extend_from_slice(&packed.to_be_bytes());
        info.extend_from_slice(&signature.to_be_bytes());

        let mut bytes = b"fLaC".to_vec();
        // last-metadata-block flag + STREAMINFO type, then 24-bit length
        bytes.push(0x80);
        bytes.extend_from_slice(&[0, 0, info.len() as u8]);
        bytes.extend_from_slice(&info);
        bytes
    }

    /// Write a FLAC file whose fingerprint is `signature`.
    pub fn write_flac(dir: &Path, name: &str, signature: u128) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, flac_bytes(signature, 44_100 * 61)).unwrap();
        path
    }
}
