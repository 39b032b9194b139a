//! One fetch attempt for one source, from credential check to normalized data.

use std::sync::Arc;

use serde_json::Value;

use super::descriptor::SourceDescriptor;
use super::gate::can_fetch;
use super::record::{normalize_all, LawmakerRecord};
use super::state::{FetchError, FetchState};
use super::transport::SourceTransport;

/// Runs single-shot fetch attempts for one configured source.
///
/// The lifecycle owns no state between attempts. The caller publishes
/// [`FetchState::Loading`] before calling [`run`](Self::run) and publishes
/// the returned terminal state afterwards.
#[derive(Clone)]
pub struct SourceFetchLifecycle {
    descriptor: Arc<SourceDescriptor>,
    transport: Arc<dyn SourceTransport>,
}

impl SourceFetchLifecycle {
    pub fn new(descriptor: Arc<SourceDescriptor>, transport: Arc<dyn SourceTransport>) -> Self {
        Self {
            descriptor,
            transport,
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    /// Run one attempt to completion. Always returns `Error` or `Ready`.
    pub async fn run(&self, credential: Option<&str>) -> FetchState<LawmakerRecord> {
        let source = self.descriptor.name();

        match self.attempt(credential).await {
            Ok((data, dropped)) => {
                tracing::info!(source, records = data.len(), dropped, "source fetch ready");
                FetchState::Ready { data, dropped }
            }
            Err(error) => {
                tracing::warn!(source, error = %error, "source fetch failed");
                error.into()
            }
        }
    }

    async fn attempt(
        &self,
        credential: Option<&str>,
    ) -> Result<(Vec<LawmakerRecord>, usize), FetchError> {
        let descriptor = &*self.descriptor;
        let source = descriptor.name();

        if !can_fetch(descriptor, credential) {
            return Err(FetchError::MissingCredential(source.to_string()));
        }

        let request = descriptor.prepare(credential);
        tracing::debug!(source, url = %descriptor.endpoint(), "issuing source request");

        let response = self
            .transport
            .get(&request)
            .await
            .map_err(|e| FetchError::TransportFailure(e.to_string()))?;

        if !response.is_success() {
            return Err(FetchError::HttpStatus(response.status));
        }

        let body: Value =
            serde_json::from_slice(&response.body).map_err(|_| FetchError::MalformedPayload)?;

        let raw = descriptor
            .payload_path()
            .resolve(&body)
            .and_then(Value::as_array)
            .ok_or(FetchError::UnexpectedShape)?;

        let normalized = normalize_all(source, raw, descriptor.fields());
        Ok((normalized.records, normalized.dropped))
    }
}
