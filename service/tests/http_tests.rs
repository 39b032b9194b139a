//! HTTP integration tests for the renderer-facing routes.
//!
//! The app is assembled with `build_app`, the same function `main.rs` uses,
//! over an `AggregationState` backed by `MockTransport`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::ORIGIN, Method, Request, StatusCode},
    Router,
};
use makenoise_api::aggregation::AggregationState;
use makenoise_api::config::CorsConfig;
use makenoise_api::http::build_app;
use makenoise_api::sources::{mock::MockTransport, CredentialSpec, FieldMap, SourceDescriptor};
use serde_json::{json, Value};
use tower::ServiceExt;

fn descriptors() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::new(
            "federal",
            "https://federal.example.gov/members.json",
            "results[0].members",
        )
        .expect("federal")
        .with_credential(CredentialSpec::header("X-API-Key"))
        .expect("credential"),
        SourceDescriptor::new(
            "state",
            "https://state.example.gov/api/legislators",
            "legislators",
        )
        .expect("state")
        .with_credential(CredentialSpec::query("key"))
        .expect("credential")
        .with_fields(FieldMap::with_region("district").expect("region path")),
    ]
}

fn setup(mock: &Arc<MockTransport>) -> (AggregationState, Router) {
    let credentials = BTreeMap::from([("federal".to_string(), "fed-key".to_string())]);
    let state =
        AggregationState::new(descriptors(), &credentials, mock.clone()).expect("aggregation");
    let cors = CorsConfig {
        allowed_origins: vec!["http://localhost:3000".into()],
    };
    let app = build_app(state.clone(), &cors);
    (state, app)
}

async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("json body")
    };
    (status, json)
}

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let mock = Arc::new(MockTransport::new());
    let (_, app) = setup(&mock);

    let (status, _) = send(app, Method::GET, "/health").await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_sources_lists_configured_names() {
    let mock = Arc::new(MockTransport::new());
    let (_, app) = setup(&mock);

    let (status, body) = send(app, Method::GET, "/sources").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["federal", "state"]));
}

#[tokio::test]
async fn test_unknown_source_is_problem_details_404() {
    let mock = Arc::new(MockTransport::new());
    let (_, app) = setup(&mock);

    let (status, body) = send(app.clone(), Method::GET, "/lawmakers/county").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["title"], "Unknown Source");
    assert_eq!(body["status"], 404);

    let (status, _) = send(app, Method::POST, "/lawmakers/county/refresh").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lawmakers_reports_each_source_independently() {
    let mock = Arc::new(MockTransport::new());
    mock.push_json_for(
        "federal.example.gov",
        &json!({"results": [{"members": [{
            "id": "A000360", "first_name": "Lamar", "last_name": "Alexander",
            "party": "R", "state": "TN", "url": "https://www.alexander.senate.gov"
        }]}]}),
    );
    let (state, app) = setup(&mock);

    state.trigger_all();
    state.settled("federal").await.expect("federal");
    state.settled("state").await.expect("state");

    let (status, body) = send(app, Method::GET, "/lawmakers").await;

    assert_eq!(status, StatusCode::OK);

    let federal = &body["federal"];
    assert_eq!(federal["status"], "ready");
    assert_eq!(federal["attempt"], 1);
    assert_eq!(federal["dropped"], 0);
    assert_eq!(federal["data"][0]["firstName"], "Lamar");
    assert_eq!(federal["data"][0]["region"], "TN");
    assert!(federal["updatedAt"].is_string());

    let state_entry = &body["state"];
    assert_eq!(state_entry["status"], "error");
    assert_eq!(state_entry["error"]["kind"], "missingCredential");
    assert_eq!(state_entry["error"]["message"], "missing credential for state");
}

#[tokio::test]
async fn test_single_source_before_trigger_is_loading() {
    let mock = Arc::new(MockTransport::new());
    let (_, app) = setup(&mock);

    let (status, body) = send(app, Method::GET, "/lawmakers/federal").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "federal");
    assert_eq!(body["status"], "loading");
    assert_eq!(body["attempt"], 0);
}

#[tokio::test]
async fn test_refresh_starts_new_attempt() {
    let mock = Arc::new(MockTransport::new());
    mock.push_raw(502, "");
    let (state, app) = setup(&mock);

    let (status, body) = send(app.clone(), Method::POST, "/lawmakers/federal/refresh").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({"source": "federal", "attempt": 1}));

    state.settled("federal").await.expect("settles");
    let (_, body) = send(app, Method::GET, "/lawmakers/federal").await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["kind"], "httpStatus");
    assert_eq!(body["error"]["detail"], 502);
    assert_eq!(mock.requests()[0].header("X-API-Key"), Some("fed-key"));
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let mock = Arc::new(MockTransport::new());
    let (_, app) = setup(&mock);

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/lawmakers")
                .header(ORIGIN, "http://localhost:3000")
                .header("Access-Control-Request-Method", "GET")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
}
