//! Line pre-filtering and title cleanup for track listings.
//!
//! Listings mix track lines with headers, lineage notes and timing columns.
//! [`is_noise_line`] drops the header lines that would otherwise parse as
//! tracks, and [`TitleCleaner`] strips the annotations that surround a title.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

const DATE_FORMATS: [&str; 12] = [
    "%y-%m-%d", "%Y-%m-%d", "%m-%d-%Y", "%m-%d-%y", "%y.%m.%d", "%Y.%m.%d", "%m.%d.%Y",
    "%m.%d.%y", "%y/%m/%d", "%Y/%m/%d", "%m/%d/%Y", "%m/%d/%y",
];

const BIT_DEPTH_PREFIXES: [&str; 6] = [
    "16-bit",
    "24-bit",
    "16bit",
    "24bit",
    "24 bit/44.1",
    "16 bit/44.1",
];

static CONTROL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t\n\r\x0B\x0C]+").expect("static regex"));
static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("static regex"));
static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]").expect("static regex"));
static BRACED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{.*?\}").expect("static regex"));
static PAREN_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*[0-9]{1,2}:[0-9]{2}(?:\.[0-9]{1,3})?\s*\)").expect("static regex")
});
static BARE_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9]{1,2}:[0-9]{2}(?:\.[0-9]{1,3})?\b").expect("static regex"));
static LEADING_ARROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:->|>)\s*").expect("static regex"));
static ENCORE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^encore:?\s*").expect("static regex"));
static ENCORE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[(\[]\s*encore\s*[)\]]").expect("static regex"));
static E_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*e:\s*").expect("static regex"));
static LEADING_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*-\s*").expect("static regex"));

/// True for lines that must never be read as a track.
///
/// Covers disc-count announcements ("2 discs audio"), bare bit-depth
/// annotations and lines whose first token is a calendar date.
pub fn is_noise_line(line: &str) -> bool {
    let lower = line.trim().to_lowercase();
    if lower.contains("discs audio") {
        return true;
    }
    if lower == "24 bit"
        || lower == "16 bit"
        || BIT_DEPTH_PREFIXES.iter().any(|p| lower.starts_with(p))
    {
        return true;
    }
    match line.split_whitespace().next() {
        Some(token) if is_date_token(token) => {
            tracing::debug!(target: "listing", token, "Date found, skipping line");
            true
        }
        _ => false,
    }
}

/// True if `token` parses as a date in any supported format.
pub fn is_date_token(token: &str) -> bool {
    DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(token, fmt).is_ok())
}

/// Curated raw title -> (clean title, gazinta) table.
///
/// Loaded once from the catalog and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct TitleTransformations {
    map: HashMap<String, (String, bool)>,
}

impl TitleTransformations {
    pub fn from_rows(rows: impl IntoIterator<Item = (String, String, bool)>) -> Self {
        Self {
            map: rows
                .into_iter()
                .map(|(raw, clean, gazinta)| (raw, (clean, gazinta)))
                .collect(),
        }
    }

    pub fn lookup(&self, raw: &str) -> Option<(&str, bool)> {
        self.map
            .get(raw)
            .map(|(clean, gazinta)| (clean.as_str(), *gazinta))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Cleans captured title text.
#[derive(Debug, Clone)]
pub struct TitleCleaner {
    column_gap: usize,
}

impl Default for TitleCleaner {
    fn default() -> Self {
        Self::new(5)
    }
}

impl TitleCleaner {
    /// `column_gap` is the whitespace run length that starts a comment column.
    pub fn new(column_gap: usize) -> Self {
        Self {
            column_gap: column_gap.max(1),
        }
    }

    /// Clean a title; falls back to the input when nothing is left.
    pub fn clean(&self, title: &str) -> String {
        let mut text = truncate_at_gap(title, self.column_gap).to_string();

        text = CONTROL_WS.replace_all(&text, " ").into_owned();
        text = MULTI_SPACE.replace_all(&text, " ").into_owned();

        text = BRACKETED.replace_all(&text, "").into_owned();
        text = BRACED.replace_all(&text, "").into_owned();
        text = PAREN_TIME.replace_all(&text, "").into_owned();
        text = BARE_TIME.replace_all(&text, "").into_owned();
        text.retain(|c| !matches!(c, '*' | ';' | '%'));
        text = LEADING_ARROW.replace(&text, "").into_owned();

        if !text.to_lowercase().contains("encore break") {
            text = ENCORE_PREFIX.replace(&text, "").into_owned();
            text = ENCORE_TAG.replace_all(&text, "").into_owned();
        }
        text = E_PREFIX.replace(&text, "").into_owned();
        text = LEADING_DASH.replace(&text, "").into_owned();

        text = text.replace("--", "-").replace("->", ">");
        text = space_segue_markers(&text);

        let cleaned = text.trim();
        if cleaned.is_empty() {
            title.to_string()
        } else {
            cleaned.to_string()
        }
    }
}

/// Cut `s` before the first run of `gap` or more whitespace characters,
/// unless the run starts the string or nothing would remain.
fn truncate_at_gap(s: &str, gap: usize) -> &str {
    let mut run_start = None;
    let mut run_len = 0;
    for (idx, c) in s.char_indices() {
        if c.is_whitespace() {
            if run_len == 0 {
                run_start = Some(idx);
            }
            run_len += 1;
            if run_len == gap {
                break;
            }
        } else {
            run_len = 0;
            run_start = None;
        }
    }
    match run_start {
        Some(idx) if run_len >= gap && idx > 0 => {
            let head = s[..idx].trim_end();
            if head.is_empty() { s } else { head }
        }
        _ => s,
    }
}

/// Put a space before every `>` not preceded by whitespace and after every
/// `>` followed by something other than whitespace.
fn space_segue_markers(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '>' {
            if i == 0 || !chars[i - 1].is_whitespace() {
                out.push(' ');
            }
            out.push('>');
            if chars.get(i + 1).is_some_and(|n| !n.is_whitespace()) {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Derive the stored clean title and segue flag of a track title.
///
/// The curated table wins; otherwise a trailing `->`/`>` marks a segue, a
/// leading `*` moves to the end, a leading single `/` is doubled and an
/// `E: ` encore prefix is dropped.
pub fn clean_title_field(title: &str, transforms: &TitleTransformations) -> (String, bool) {
    if let Some((clean, gazinta)) = transforms.lookup(title) {
        return (clean.to_string(), gazinta);
    }

    let mut cleaned: String = title.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
    cleaned = cleaned.trim().to_string();
    let mut gazinta = false;

    for suffix in [" ->", "->", " >", ">"] {
        if let Some(stripped) = cleaned.strip_suffix(suffix) {
            cleaned = stripped.to_string();
            gazinta = true;
            break;
        }
    }

    if cleaned.starts_with('*') {
        cleaned = cleaned.replace('*', "") + "*";
    }
    if cleaned.starts_with('/') && !cleaned.starts_with("//") {
        cleaned.insert(0, '/');
    }
    cleaned = cleaned.trim().to_string();
    if let Some(rest) = cleaned.strip_prefix("E: ") {
        cleaned = rest.trim_start().to_string();
    }

    (cleaned, gazinta)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(s: &str) -> String {
        TitleCleaner::default().clean(s)
    }

    #[test]
    fn test_noise_lines() {
        assert!(is_noise_line("3 discs audio"));
        assert!(is_noise_line("16 bit"));
        assert!(is_noise_line("24-bit/96kHz"));
        assert!(is_noise_line("24 BIT/44.1kHz"));
        assert!(is_noise_line("1975-07-05 Winterland"));
        assert!(is_noise_line("07/05/75 Winterland"));
        assert!(is_noise_line("75.07.05"));
        assert!(!is_noise_line("01 Help On The Way"));
        assert!(!is_noise_line("d1t01. Tuning"));
    }

    #[test]
    fn test_date_tokens() {
        assert!(is_date_token("1977-05-08"));
        assert!(is_date_token("5-8-77"));
        assert!(is_date_token("05.08.1977"));
        assert!(!is_date_token("01."));
        assert!(!is_date_token("13-45-99"));
    }

    #[test]
    fn test_clean_strips_comment_column() {
        assert_eq!(clean("Dark Star      (with feedback tease)"), "Dark Star");
        // A gap at the very start is not a comment column
        assert_eq!(clean("      Dark Star"), "Dark Star");
    }

    #[test]
    fn test_clean_strips_timings_and_brackets() {
        assert_eq!(clean("Truckin' (8:51)"), "Truckin'");
        assert_eq!(clean("Truckin' 8:51.23"), "Truckin'");
        assert_eq!(clean("Sugaree [partial] {cut}"), "Sugaree");
    }

    #[test]
    fn test_clean_removes_markup_chars() {
        assert_eq!(clean("*Bertha;"), "Bertha");
        assert_eq!(clean("Loser %"), "Loser");
    }

    #[test]
    fn test_clean_segues() {
        assert_eq!(clean("-> Franklin's Tower"), "Franklin's Tower");
        assert_eq!(clean("Help On The Way->"), "Help On The Way >");
        assert_eq!(clean("Scarlet>Fire"), "Scarlet > Fire");
        assert_eq!(clean("China Cat -- Rider"), "China Cat - Rider");
    }

    #[test]
    fn test_clean_encore_framing() {
        assert_eq!(clean("Encore: U.S. Blues"), "U.S. Blues");
        assert_eq!(clean("One More Saturday Night (encore)"), "One More Saturday Night");
        assert_eq!(clean("E: Brokedown Palace"), "Brokedown Palace");
        assert_eq!(clean("Encore break"), "Encore break");
    }

    #[test]
    fn test_clean_falls_back_to_original() {
        assert_eq!(clean("[tuning]"), "[tuning]");
        assert_eq!(clean("*"), "*");
    }

    #[test]
    fn test_clean_title_field_segue_and_markers() {
        let table = TitleTransformations::default();
        assert_eq!(
            clean_title_field("Help On The Way ->", &table),
            ("Help On The Way".to_string(), true)
        );
        assert_eq!(
            clean_title_field("Slipknot!>", &table),
            ("Slipknot!".to_string(), true)
        );
        assert_eq!(
            clean_title_field("*Jam", &table),
            ("Jam*".to_string(), false)
        );
        assert_eq!(
            clean_title_field("/Drums", &table),
            ("//Drums".to_string(), false)
        );
        assert_eq!(
            clean_title_field("E: U.S. Blues", &table),
            ("U.S. Blues".to_string(), false)
        );
    }

    #[test]
    fn test_clean_title_field_prefers_table() {
        let table = TitleTransformations::from_rows(vec![(
            "Sugar Mag ->".to_string(),
            "Sugar Magnolia".to_string(),
            true,
        )]);
        assert_eq!(
            clean_title_field("Sugar Mag ->", &table),
            ("Sugar Magnolia".to_string(), true)
        );
        assert_eq!(table.len(), 1);
    }
}
