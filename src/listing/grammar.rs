//! Line grammars for track listings.
//!
//! Each grammar recognises one way of writing a track line. They are tried
//! in [`GRAMMARS`] order, either one grammar over a whole listing or, in the
//! merged pass, line by line with the first match winning.

use std::sync::LazyLock;

use regex::Regex;

static EXPLICIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[ds]\s*([0-9]+)\s*t\s*([0-9]+)[.\-]?\s+(.*)$").expect("static regex")
});
static IMPLICIT_DISC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^t([0-9]+)[.\-]?\s+(.*)$").expect("static regex"));
static AUTO_ROLLOVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([0-9]+)(?:[.\-]\s*|\s+)(.*)$").expect("static regex"));
static PACKED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^s([0-9]{3})[.\-]?\s+(.*)$").expect("static regex"));

/// A triple as captured, before title cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTriple {
    pub disc: u32,
    /// Zero-padded track number
    pub track: String,
    pub title: String,
}

/// Numbering state carried across the lines of one pass.
#[derive(Debug, Clone)]
pub struct PassState {
    disc: u32,
    seen_entry: bool,
}

impl Default for PassState {
    fn default() -> Self {
        Self {
            disc: 1,
            seen_entry: false,
        }
    }
}

/// One fixed line-pattern strategy.
pub trait Grammar: Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Parse one pre-filtered line.
    fn parse(&self, line: &str, state: &mut PassState) -> Option<RawTriple>;
}

/// `d1t01. Title`, `s2 t03 Title`
pub struct ExplicitDisc;

/// `t01. Title`; disc is always 1
pub struct ImplicitDisc;

/// `01. Title`; a new disc starts whenever numbering restarts at 1
pub struct AutoRollover;

/// `s101. Title`; first digit is the disc, the other two the track
pub struct PackedDisc;

/// All grammars in priority order.
pub const GRAMMARS: [&dyn Grammar; 4] = [&ExplicitDisc, &ImplicitDisc, &AutoRollover, &PackedDisc];

fn padded(track: &str) -> Option<String> {
    track.parse::<u32>().ok().map(|n| format!("{:02}", n))
}

fn title_of(caps: &regex::Captures<'_>, group: usize) -> String {
    caps.get(group)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

impl Grammar for ExplicitDisc {
    fn name(&self) -> &'static str {
        "explicit"
    }

    fn parse(&self, line: &str, _state: &mut PassState) -> Option<RawTriple> {
        let caps = EXPLICIT.captures(line)?;
        Some(RawTriple {
            disc: caps[1].parse().ok()?,
            track: padded(&caps[2])?,
            title: title_of(&caps, 3),
        })
    }
}

impl Grammar for ImplicitDisc {
    fn name(&self) -> &'static str {
        "implicit-disc"
    }

    fn parse(&self, line: &str, _state: &mut PassState) -> Option<RawTriple> {
        let caps = IMPLICIT_DISC.captures(line)?;
        Some(RawTriple {
            disc: 1,
            track: padded(&caps[1])?,
            title: title_of(&caps, 2),
        })
    }
}

impl Grammar for AutoRollover {
    fn name(&self) -> &'static str {
        "auto-rollover"
    }

    fn parse(&self, line: &str, state: &mut PassState) -> Option<RawTriple> {
        let caps = AUTO_ROLLOVER.captures(line)?;
        let number: u32 = caps[1].parse().ok()?;
        if state.seen_entry && number == 1 {
            state.disc += 1;
        }
        state.seen_entry = true;
        Some(RawTriple {
            disc: state.disc,
            track: format!("{:02}", number),
            title: title_of(&caps, 2),
        })
    }
}

impl Grammar for PackedDisc {
    fn name(&self) -> &'static str {
        "packed"
    }

    fn parse(&self, line: &str, _state: &mut PassState) -> Option<RawTriple> {
        let caps = PACKED.captures(line)?;
        let digits = &caps[1];
        Some(RawTriple {
            disc: digits[..1].parse().ok()?,
            track: digits[1..].to_string(),
            title: title_of(&caps, 2),
        })
    }
}
