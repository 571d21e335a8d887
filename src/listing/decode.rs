//! Text decoding for listing files.
//!
//! Listings come from many decades of tooling. A byte-order mark decides the
//! encoding outright; otherwise encodings are probed in a fixed order and
//! the first that decodes without error wins. Windows-1252 maps every byte,
//! so UTF-16LE without a BOM is recognised by its NUL high bytes and tried
//! first.

use std::borrow::Cow;
use std::path::Path;

use encoding_rs::{Encoding, UTF_8, UTF_16LE, WINDOWS_1252};

use super::ListingError;

/// Encodings tried, in order, when no BOM is present.
pub fn probe_order(bytes: &[u8]) -> Vec<&'static Encoding> {
    if looks_like_utf16le(bytes) {
        vec![UTF_16LE, UTF_8, WINDOWS_1252]
    } else {
        vec![UTF_8, WINDOWS_1252]
    }
}

/// Even length, no NUL low bytes, and mostly NUL high bytes.
fn looks_like_utf16le(bytes: &[u8]) -> bool {
    if bytes.len() < 2 || bytes.len() % 2 != 0 {
        return false;
    }
    let units = bytes.len() / 2;
    let mut high_nuls = 0;
    for pair in bytes.chunks_exact(2) {
        if pair[0] == 0 {
            return false;
        }
        if pair[1] == 0 {
            high_nuls += 1;
        }
    }
    high_nuls * 2 >= units
}

/// Decode raw listing bytes, returning the text and the encoding used.
pub fn decode(bytes: &[u8]) -> Option<(String, &'static Encoding)> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return encoding
            .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
            .map(|text| (text.into_owned(), encoding));
    }

    probe_order(bytes).into_iter().find_map(|encoding| {
        encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text: Cow<'_, str>| (text.into_owned(), encoding))
    })
}

/// Trimmed, non-empty lines of a decoded listing.
pub fn lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read and decode a listing file into its non-empty lines.
pub fn read_listing(path: &Path) -> Result<Vec<String>, ListingError> {
    let bytes = std::fs::read(path).map_err(|e| ListingError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let (text, encoding) =
        decode(&bytes).ok_or_else(|| ListingError::Undecodable(path.to_path_buf()))?;
    tracing::info!(
        target: "listing",
        path = %path.display(),
        encoding = encoding.name(),
        "Read listing"
    );
    Ok(lines(&text))
}
