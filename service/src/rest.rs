//! Read-only JSON view of every source's fetch state, plus re-triggering.
//!
//! Routes:
//!
//! - `GET /sources` - configured source names
//! - `GET /lawmakers` - every source's snapshot, keyed by name
//! - `GET /lawmakers/{source}` - one source's snapshot
//! - `POST /lawmakers/{source}/refresh` - start a new attempt (202)
//!
//! Each snapshot carries its own `status` (`loading`, `error`, `ready`);
//! callers must handle every variant per source.

use std::collections::BTreeMap;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Serialize, Serializer};

use crate::aggregation::{AggregationError, AggregationState, AttemptId, SourceSnapshot};

/// Serialize a `StatusCode` as its `u16` representation.
#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires `&T` signature
fn serialize_status_code<S: Serializer>(status: &StatusCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(status.as_u16())
}

/// RFC 7807 Problem Details error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// URI reference identifying the problem type
    #[serde(rename = "type")]
    pub problem_type: String,
    /// Short human-readable summary
    pub title: String,
    /// HTTP status code
    #[serde(serialize_with = "serialize_status_code")]
    pub status: StatusCode,
    /// Human-readable explanation specific to this occurrence
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl ProblemDetails {
    #[must_use]
    pub fn unknown_source(source: &str) -> Self {
        Self {
            problem_type: "https://makenoise.dev/errors/unknown-source".to_string(),
            title: "Unknown Source".to_string(),
            status: StatusCode::NOT_FOUND,
            detail: format!("no lawmaker source named '{source}' is configured"),
            instance: Some(format!("/lawmakers/{source}")),
        }
    }

    #[must_use]
    pub fn internal_error(detail: &str) -> Self {
        Self {
            problem_type: "https://makenoise.dev/errors/internal".to_string(),
            title: "Internal Server Error".to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.to_string(),
            instance: None,
        }
    }
}

impl From<AggregationError> for ProblemDetails {
    fn from(err: AggregationError) -> Self {
        match err {
            AggregationError::UnknownSource(source) => Self::unknown_source(&source),
            other => Self::internal_error(&other.to_string()),
        }
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self)).into_response()
    }
}

/// Body of a `202 Accepted` refresh.
#[derive(Debug, Serialize)]
pub struct RefreshAccepted {
    pub source: String,
    pub attempt: AttemptId,
}

/// Routes over an [`AggregationState`] supplied as an `Extension` layer.
pub fn router() -> Router {
    Router::new()
        .route("/sources", get(list_sources))
        .route("/lawmakers", get(all_lawmakers))
        .route("/lawmakers/{source}", get(source_lawmakers))
        .route("/lawmakers/{source}/refresh", post(refresh_source))
}

#[allow(clippy::unused_async)] // Required for Axum handler signature
pub async fn list_sources(Extension(state): Extension<AggregationState>) -> Json<Vec<String>> {
    Json(state.sources().map(String::from).collect())
}

#[allow(clippy::unused_async)]
pub async fn all_lawmakers(
    Extension(state): Extension<AggregationState>,
) -> Json<BTreeMap<String, SourceSnapshot>> {
    Json(
        state
            .snapshots()
            .into_iter()
            .map(|snapshot| (snapshot.source.clone(), snapshot))
            .collect(),
    )
}

/// # Errors
///
/// Returns `ProblemDetails` (404) for an unconfigured source.
#[allow(clippy::unused_async)]
pub async fn source_lawmakers(
    Extension(state): Extension<AggregationState>,
    Path(source): Path<String>,
) -> Result<Json<SourceSnapshot>, ProblemDetails> {
    Ok(Json(state.snapshot(&source)?))
}

/// # Errors
///
/// Returns `ProblemDetails` (404) for an unconfigured source.
#[allow(clippy::unused_async)]
pub async fn refresh_source(
    Extension(state): Extension<AggregationState>,
    Path(source): Path<String>,
) -> Result<(StatusCode, Json<RefreshAccepted>), ProblemDetails> {
    let attempt = state.trigger(&source)?;
    tracing::info!(source, attempt, "refresh requested");
    Ok((StatusCode::ACCEPTED, Json(RefreshAccepted { source, attempt })))
}
