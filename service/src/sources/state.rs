//! The tri-state result of one fetch attempt.

use serde::Serialize;

/// Why a single attempt for a single source failed.
///
/// Always scoped to that attempt: it is published as the source's
/// [`FetchState::Error`] and never affects another source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum FetchError {
    #[error("missing credential for {0}")]
    MissingCredential(String),

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("malformed response")]
    MalformedPayload,

    #[error("unexpected response shape")]
    UnexpectedShape,
}

/// Exactly one of loading, failed, or ready with data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FetchState<T> {
    Loading,
    Error {
        #[serde(serialize_with = "serialize_error")]
        error: FetchError,
    },
    Ready {
        data: Vec<T>,
        /// Raw records excluded during normalization.
        dropped: usize,
    },
}

impl<T> FetchState<T> {
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// `true` once an attempt has settled into `Error` or `Ready`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !self.is_loading()
    }

    #[must_use]
    pub const fn error(&self) -> Option<&FetchError> {
        match self {
            Self::Error { error } => Some(error),
            _ => None,
        }
    }

    #[must_use]
    pub fn data(&self) -> Option<&[T]> {
        match self {
            Self::Ready { data, .. } => Some(data),
            _ => None,
        }
    }
}

impl<T> From<FetchError> for FetchState<T> {
    fn from(error: FetchError) -> Self {
        Self::Error { error }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    #[serde(flatten)]
    error: &'a FetchError,
    message: String,
}

fn serialize_error<S: serde::Serializer>(error: &FetchError, s: S) -> Result<S::Ok, S::Error> {
    ErrorBody {
        error,
        message: error.to_string(),
    }
    .serialize(s)
}
