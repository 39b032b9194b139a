//! HTTP mock server helpers for testing outbound source requests.
//!
//! A thin wrapper around `wiremock` for declarative HTTP stubbing.
//!
//! # Quick Start
//!
//! ```ignore
//! use crate::common::http_mock::MockHttpServer;
//!
//! #[tokio::test]
//! async fn test_external_api_call() {
//!     let server = MockHttpServer::start().await;
//!
//!     server
//!         .expect_get("/api/legislators")
//!         .with_query("key", "test-key")
//!         .respond_with_json(json!({"legislators": []}))
//!         .mount()
//!         .await;
//!
//!     // Point a source at server.url() + "/api/legislators"
//! }
//! ```
//!
//! # Patterns
//!
//! - **Success response**: `.respond_with_json(value)` or `.respond_with_body(string)`
//! - **Error response**: `.respond_with_status(404)`
//! - **Timeout simulation**: `.respond_with_delay(Duration::from_secs(30))`
//! - **Request verification**: `.expect_times(1)` then `server.verify().await`
//! - **One-shot stubs**: `.up_to_times(1)` so a later stub answers the next call

#![allow(dead_code)]

use std::time::Duration;

use serde_json::Value;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct MockHttpServer {
    server: MockServer,
}

impl MockHttpServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL of the server, without a trailing slash.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    pub fn inner(&self) -> &MockServer {
        &self.server
    }

    pub fn expect_get(&self, route: &str) -> StubBuilder<'_> {
        StubBuilder {
            server: &self.server,
            route: route.to_string(),
            headers: Vec::new(),
            query: Vec::new(),
            status: 200,
            body: None,
            delay: None,
            times: None,
            up_to: None,
        }
    }

    /// Number of requests the server has received so far.
    pub async fn received(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }

    pub async fn verify(&self) {
        self.server.verify().await;
    }
}

enum Body {
    Json(Value),
    Text(String),
}

pub struct StubBuilder<'a> {
    server: &'a MockServer,
    route: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    status: u16,
    body: Option<Body>,
    delay: Option<Duration>,
    times: Option<u64>,
    up_to: Option<u64>,
}

impl StubBuilder<'_> {
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn respond_with_json(mut self, body: Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    pub fn respond_with_body(mut self, body: &str) -> Self {
        self.body = Some(Body::Text(body.to_string()));
        self
    }

    pub fn respond_with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn respond_with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn expect_times(mut self, times: u64) -> Self {
        self.times = Some(times);
        self
    }

    pub fn up_to_times(mut self, times: u64) -> Self {
        self.up_to = Some(times);
        self
    }

    pub async fn mount(self) {
        let mut builder = Mock::given(method("GET")).and(path(self.route.as_str()));
        for (name, value) in &self.headers {
            builder = builder.and(header(name.as_str(), value.as_str()));
        }
        for (name, value) in &self.query {
            builder = builder.and(query_param(name.as_str(), value.as_str()));
        }

        let mut template = ResponseTemplate::new(self.status);
        template = match self.body {
            Some(Body::Json(value)) => template.set_body_json(value),
            Some(Body::Text(text)) => template.set_body_string(text),
            None => template,
        };
        if let Some(delay) = self.delay {
            template = template.set_delay(delay);
        }

        let mut mock = builder.respond_with(template);
        if let Some(n) = self.up_to {
            mock = mock.up_to_n_times(n);
        }
        if let Some(n) = self.times {
            mock = mock.expect(n);
        }
        mock.mount(self.server).await;
    }
}
