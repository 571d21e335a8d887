//! LCDB GraphQL Data Transfer Objects
//!
//! These types match what the GraphQL API returns for our three queries.
//! DO NOT use these types outside the remote module - convert to domain types.
//!
//! Example response (checksum search):
//! ```json
//! {
//!   "data": {
//!     "checksums": {
//!       "edges": [
//!         { "node": { "source": { "id": 12345 } } }
//!       ]
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Envelope of every GraphQL response.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// Request body: `{"query": ..., "variables": {...}}`
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: serde_json::Value,
}

/// IDs come back as either numbers or numeric strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Int(i64),
    Str(String),
}

impl Id {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Id::Int(n) => Some(*n),
            Id::Str(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "N: Deserialize<'de>"))]
pub struct Connection<N> {
    #[serde(rename = "totalCount")]
    pub total_count: Option<i64>,
    #[serde(default)]
    pub edges: Vec<Edge<N>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge<N> {
    pub node: Option<N>,
}

// ============================================================================
// ChecksumsQuery
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ChecksumSearchData {
    pub checksums: Option<Connection<ChecksumSourceNode>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChecksumSourceNode {
    pub source: Option<SourceRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceRef {
    pub id: Option<Id>,
}

// ============================================================================
// SourceChecksums
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SourceChecksumsData {
    pub source: Option<SourceChecksums>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceChecksums {
    pub id: Option<Id>,
    pub checksums: Option<Connection<ChecksumNode>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChecksumNode {
    pub id: Option<Id>,
    pub body: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
}

// ============================================================================
// PerformanceFromSource
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SourcePerformanceData {
    pub source: Option<SourceDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceDetail {
    pub id: Option<Id>,
    #[serde(rename = "archiveIdentifier")]
    pub archive_identifier: Option<String>,
    pub comments: Option<String>,
    pub textdoc: Option<String>,
    pub performance: Option<Performance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Performance {
    pub id: Option<Id>,
    pub date: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub venue: Option<String>,
    pub artist: Option<Artist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
    pub id: Option<Id>,
    pub name: Option<String>,
}
