//! Adapter layer: Convert LCDB DTOs to domain models
//!
//! This is the ONLY place where DTO types are converted to domain types.

use super::domain::{PerformanceDetails, RemoteError, RemoteRevision};
use super::dto;
use crate::db::parse_catalog_date;

/// Take the `data` member, turning a data-less error response into an error.
///
/// Partial responses (data plus errors) are accepted with a warning.
fn into_data<T>(response: dto::GraphQlResponse<T>) -> Result<Option<T>, RemoteError> {
    if !response.errors.is_empty() {
        let messages = response
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        if response.data.is_none() {
            return Err(RemoteError::Api(messages));
        }
        tracing::warn!(target: "remote", errors = %messages, "Partial GraphQL response");
    }
    Ok(response.data)
}

fn nodes<N>(connection: Option<dto::Connection<N>>) -> impl Iterator<Item = N> {
    connection
        .into_iter()
        .flat_map(|c| c.edges)
        .filter_map(|e| e.node)
}

/// Recording ids whose checksums contain the searched fingerprint.
///
/// Sorted and de-duplicated.
pub fn to_recording_ids(
    response: dto::GraphQlResponse<dto::ChecksumSearchData>,
) -> Result<Vec<i64>, RemoteError> {
    let Some(data) = into_data(response)? else {
        return Ok(Vec::new());
    };
    let mut ids: Vec<i64> = nodes(data.checksums)
        .filter_map(|n| n.source)
        .filter_map(|s| s.id.and_then(|id| id.as_i64()))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// Checksum submissions of a recording; nodes without an id or body are dropped.
pub fn to_revisions(
    response: dto::GraphQlResponse<dto::SourceChecksumsData>,
) -> Result<Vec<RemoteRevision>, RemoteError> {
    let Some(source) = into_data(response)?.and_then(|d| d.source) else {
        return Ok(Vec::new());
    };
    Ok(nodes(source.checksums)
        .filter_map(|node| {
            let revision_id = node.id.as_ref().and_then(dto::Id::as_i64)?;
            let body = node.body.filter(|b| !b.trim().is_empty())?;
            Some(RemoteRevision {
                revision_id,
                label: node.description,
                body,
                created_at: node.created_at,
            })
        })
        .collect())
}

/// Performance details of a recording, `None` when the source is unknown.
pub fn to_performance(
    response: dto::GraphQlResponse<dto::SourcePerformanceData>,
    recording_id: i64,
) -> Result<Option<PerformanceDetails>, RemoteError> {
    let Some(source) = into_data(response)?.and_then(|d| d.source) else {
        return Ok(None);
    };
    let performance = source.performance;
    let artist = performance.as_ref().and_then(|p| p.artist.clone());

    Ok(Some(PerformanceDetails {
        recording_id: source
            .id
            .as_ref()
            .and_then(dto::Id::as_i64)
            .unwrap_or(recording_id),
        date: performance
            .as_ref()
            .and_then(|p| p.date.as_deref())
            .and_then(parse_catalog_date),
        artist_id: artist.as_ref().and_then(|a| a.id.as_ref()).and_then(dto::Id::as_i64),
        artist_name: artist.and_then(|a| a.name),
        venue: performance.as_ref().and_then(|p| p.venue.clone()),
        city: performance.as_ref().and_then(|p| p.city.clone()),
        state: performance.and_then(|p| p.state),
        source: source.comments.or(source.archive_identifier),
    }))
}
