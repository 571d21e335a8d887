//! Best-effort track numbering from audio file names.
//!
//! Used only when no listing validates and the fallback is enabled. Stems
//! like `d2t03 Deal`, `t03 Deal`, `203 Deal` and `03 - Deal` are understood;
//! anything else is numbered by position.

use std::sync::LazyLock;

use regex::Regex;

use super::cleanup::TitleCleaner;
use crate::model::{TrackEntry, TrackListing};

static STEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:d(?P<disc>[0-9]+)[_-]?)?(?:t(?P<ttrack>[0-9]+)[_-]?)?(?P<num>[0-9]+)?[\s._-]*(?P<title>.*)$")
        .expect("static regex")
});

/// Derive one entry per stem, in the given order.
pub fn derive_from_stems(stems: &[String], cleaner: &TitleCleaner) -> TrackListing {
    let mut entries = Vec::with_capacity(stems.len());
    let mut disc: u32 = 1;

    for (idx, stem) in stems.iter().enumerate() {
        let seq = idx as u32 + 1;
        let (disc_val, track_val, title) = match STEM.captures(stem) {
            Some(caps) => {
                let mut disc_val = caps
                    .name("disc")
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(disc);
                let track_val = if let Some(t) = caps.name("ttrack") {
                    t.as_str().parse().unwrap_or(seq)
                } else if let Some(num) = caps.name("num") {
                    let digits = num.as_str();
                    if digits.len() > 2 {
                        disc_val = digits[..1].parse().unwrap_or(disc_val);
                        digits[1..].parse().unwrap_or(seq)
                    } else {
                        digits.parse().unwrap_or(seq)
                    }
                } else {
                    seq
                };
                let raw = caps.name("title").map(|m| m.as_str()).unwrap_or("");
                let title = if raw.is_empty() { stem.as_str() } else { raw };
                (disc_val, track_val, title.to_string())
            }
            None => (disc, seq, stem.clone()),
        };

        entries.push(TrackEntry::new(
            Some(disc_val),
            format!("{:02}", track_val),
            cleaner.clean(title.trim()),
        ));

        if track_val == 1 && seq != 1 {
            disc = disc_val;
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stems(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_disc_track_markers() {
        let out = derive_from_stems(
            &stems(&["d1t01 Tuning", "d1t02_Truckin", "d2t01-Deal"]),
            &TitleCleaner::default(),
        );
        assert_eq!(out[0], TrackEntry::new(Some(1), "01", "Tuning"));
        assert_eq!(out[1], TrackEntry::new(Some(1), "02", "Truckin"));
        assert_eq!(out[2], TrackEntry::new(Some(2), "01", "Deal"));
    }

    #[test]
    fn test_packed_numbers() {
        let out = derive_from_stems(&stems(&["101 Bertha", "201 Deal"]), &TitleCleaner::default());
        assert_eq!(out[0], TrackEntry::new(Some(1), "01", "Bertha"));
        assert_eq!(out[1], TrackEntry::new(Some(2), "01", "Deal"));
    }

    #[test]
    fn test_fullwidth_number_stays_in_title() {
        let out = derive_from_stems(&stems(&["\u{FF11}\u{FF10}\u{FF11} Bertha"]), &TitleCleaner::default());
        assert_eq!(out[0].disc, Some(1));
        assert_eq!(out[0].track, "01");
    }

    #[test]
    fn test_positional_when_unnumbered() {
        let out = derive_from_stems(&stems(&["Bertha", "Deal"]), &TitleCleaner::default());
        assert_eq!(out[0], TrackEntry::new(Some(1), "01", "Bertha"));
        assert_eq!(out[1], TrackEntry::new(Some(1), "02", "Deal"));
    }
}
