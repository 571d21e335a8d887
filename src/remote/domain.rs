//! Our own types for remote catalog data.
//!
//! Everything the GraphQL layer returns is converted into these by the
//! adapter; nothing outside `remote` sees a DTO.

use chrono::NaiveDate;

use crate::model::RecordingDetails;

/// One checksum submission of a recording as held by the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRevision {
    pub revision_id: i64,
    /// Free-text description of the submission
    pub label: Option<String>,
    /// Raw checksum file text (ffp or st5)
    pub body: String,
    pub created_at: Option<String>,
}

/// Performance and source metadata of a recording.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerformanceDetails {
    pub recording_id: i64,
    pub date: Option<NaiveDate>,
    pub artist_id: Option<i64>,
    pub artist_name: Option<String>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    /// Source lineage / comments
    pub source: Option<String>,
}

impl PerformanceDetails {
    /// Catalog row for this recording. The abbreviation is left to the
    /// catalog (or configuration) since the remote service has none.
    pub fn into_recording_details(self) -> RecordingDetails {
        let city = match (self.city, self.state) {
            (Some(city), Some(state)) if !state.is_empty() => Some(format!("{city}, {state}")),
            (city, _) => city,
        };
        RecordingDetails {
            recording_id: self.recording_id,
            date: self.date,
            artist_id: self.artist_id,
            artist_name: self.artist_name,
            artist_abbrev: None,
            venue: self.venue,
            city,
            source: self.source,
        }
    }
}

/// Errors from the remote metadata service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("API returned errors: {0}")]
    Api(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}
