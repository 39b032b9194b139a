//! Outbound HTTP for lawmaker sources.
//!
//! The [`SourceTransport`] trait is the only seam between the fetch lifecycle
//! and the network:
//!
//! - [`HttpTransport`] issues real requests with reqwest
//! - [`mock::MockTransport`] scripts responses for unit tests (behind `test-utils`)

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;

/// A fully built GET request for one source.
#[derive(Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl PreparedRequest {
    /// Value of the first header named `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Debug for PreparedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(name, _)| (name.as_str(), "<redacted>"))
            .collect();
        f.debug_struct("PreparedRequest")
            .field("url", &self.url.as_str())
            .field("headers", &headers)
            .finish()
    }
}

/// Status and body of a completed request.
///
/// `body` is empty for non-success statuses; it is never read for those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// The request never produced a response (DNS, connect, timeout, body read).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "request timed out"
        } else if err.is_connect() {
            "connection failed"
        } else if err.is_body() || err.is_decode() {
            "failed reading response body"
        } else {
            "request failed"
        };
        // Strip the URL: it can carry a query-string credential.
        Self(format!("{kind}: {}", err.without_url()))
    }
}

/// Issues a single GET for a source.
#[async_trait]
pub trait SourceTransport: Send + Sync {
    /// Perform the request once. No retries.
    async fn get(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with a per-request timeout and user agent.
    ///
    /// # Errors
    /// Returns an error if the underlying client cannot be constructed.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client (for tests with custom config).
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceTransport for HttpTransport {
    async fn get(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .get(request.url.clone())
            .header(reqwest::header::ACCEPT, "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Ok(RawResponse {
                status: status.as_u16(),
                body: Vec::new(),
            });
        }

        let body = response.bytes().await?;
        Ok(RawResponse {
            status: status.as_u16(),
            body: body.to_vec(),
        })
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::missing_const_for_fn,
    clippy::must_use_candidate
)]
pub mod mock {
    //! Scripted transport for unit testing.

    use super::{PreparedRequest, RawResponse, SourceTransport, TransportError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Scripted {
        host: Option<String>,
        delay: Option<Duration>,
        result: Result<RawResponse, TransportError>,
    }

    /// Mock implementation of `SourceTransport`.
    ///
    /// Queue responses with `push_*` methods; each call consumes the first
    /// queued response whose host filter matches the request. Unmatched calls
    /// fail with a transport error. Inspect traffic with `requests()`.
    #[derive(Default)]
    pub struct MockTransport {
        script: Mutex<VecDeque<Scripted>>,
        requests: Mutex<Vec<PreparedRequest>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a 200 response with a JSON body.
        pub fn push_json(&self, body: &serde_json::Value) -> &Self {
            self.push(None, None, Ok(json_response(200, body)))
        }

        /// Queue a 200 JSON response only served to requests for `host`.
        pub fn push_json_for(&self, host: &str, body: &serde_json::Value) -> &Self {
            self.push(Some(host), None, Ok(json_response(200, body)))
        }

        /// Queue a 200 JSON response served after `delay`.
        pub fn push_delayed_json(&self, delay: Duration, body: &serde_json::Value) -> &Self {
            self.push(None, Some(delay), Ok(json_response(200, body)))
        }

        /// Queue a response with an arbitrary status and raw body.
        pub fn push_raw(&self, status: u16, body: impl Into<Vec<u8>>) -> &Self {
            self.push(
                None,
                None,
                Ok(RawResponse {
                    status,
                    body: body.into(),
                }),
            )
        }

        /// Queue a transport-level failure.
        pub fn push_error(&self, message: &str) -> &Self {
            self.push(None, None, Err(TransportError(message.to_string())))
        }

        fn push(
            &self,
            host: Option<&str>,
            delay: Option<Duration>,
            result: Result<RawResponse, TransportError>,
        ) -> &Self {
            self.script.lock().unwrap().push_back(Scripted {
                host: host.map(String::from),
                delay,
                result,
            });
            self
        }

        /// Every request issued so far, in order.
        pub fn requests(&self) -> Vec<PreparedRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    fn json_response(status: u16, body: &serde_json::Value) -> RawResponse {
        RawResponse {
            status,
            body: serde_json::to_vec(body).unwrap(),
        }
    }

    #[async_trait]
    impl SourceTransport for MockTransport {
        async fn get(&self, request: &PreparedRequest) -> Result<RawResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());

            let next = {
                let mut script = self.script.lock().unwrap();
                let host = request.url.host_str();
                let position = script
                    .iter()
                    .position(|s| s.host.is_none() || s.host.as_deref() == host);
                position.and_then(|i| script.remove(i))
            };

            let Some(scripted) = next else {
                return Err(TransportError(format!(
                    "no scripted response for {}",
                    request.url
                )));
            };

            if let Some(delay) = scripted.delay {
                tokio::time::sleep(delay).await;
            }
            scripted.result
        }
    }
}
