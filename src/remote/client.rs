//! LCDB GraphQL client
//!
//! All three lookups are `POST`s of `{"query", "variables"}` to one
//! endpoint. Calls are made at most once per matching pass; there is no
//! retry or backoff here.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::json;

use super::domain::{PerformanceDetails, RemoteError, RemoteRevision};
use super::{adapter, dto};
use crate::model::Fingerprint;

/// Maximum checksum submissions fetched per recording.
pub const CHECKSUM_PAGE_SIZE: i64 = 500;

const CHECKSUM_QUERY: &str = r#"
query ChecksumsQuery($checksum: String!) {
  checksums(filter: {body: {contains: $checksum}}) {
    edges { node { source { id } } }
  }
}
"#;

const SOURCE_CHECKSUMS_QUERY: &str = r#"
query SourceChecksums($sourceId: Int!, $first: Int = 500) {
  source(id: $sourceId) {
    id
    checksums(pagination: {first: $first}) {
      totalCount
      edges { node { id body description createdAt } }
    }
  }
}
"#;

const SOURCE_PERFORMANCE_QUERY: &str = r#"
query PerformanceFromSource($sourceId: Int!) {
  source(id: $sourceId) {
    id
    archiveIdentifier
    comments
    textdoc
    performance {
      id date city state venue
      artist { id name }
    }
  }
}
"#;

/// LCDB API client
pub struct LcdbClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl LcdbClient {
    /// Create a client for `endpoint` with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let http_client = reqwest::Client::builder()
            .gzip(true)
            .timeout(timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| RemoteError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
        })
    }

    /// Create a client for testing with custom base URL
    #[cfg(test)]
    pub fn with_base_url(endpoint: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Recording ids with a checksum containing `fingerprint`.
    pub async fn recordings_for_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<i64>, RemoteError> {
        let response = self
            .send(CHECKSUM_QUERY, json!({ "checksum": fingerprint.as_str() }))
            .await?;
        adapter::to_recording_ids(response)
    }

    /// All checksum submissions of a recording.
    pub async fn revisions_for_recording(
        &self,
        recording_id: i64,
    ) -> Result<Vec<RemoteRevision>, RemoteError> {
        let response = self
            .send(
                SOURCE_CHECKSUMS_QUERY,
                json!({ "sourceId": recording_id, "first": CHECKSUM_PAGE_SIZE }),
            )
            .await?;
        adapter::to_revisions(response)
    }

    /// Performance and source details of a recording.
    pub async fn performance(
        &self,
        recording_id: i64,
    ) -> Result<Option<PerformanceDetails>, RemoteError> {
        let response = self
            .send(SOURCE_PERFORMANCE_QUERY, json!({ "sourceId": recording_id }))
            .await?;
        adapter::to_performance(response, recording_id)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<dto::GraphQlResponse<T>, RemoteError> {
        let body = dto::GraphQlRequest { query, variables };
        tracing::debug!(target: "remote", endpoint = %self.endpoint, "POST GraphQL query");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        response
            .json::<dto::GraphQlResponse<T>>()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))
    }
}
