//! Common test utilities for integration tests.
//!
//! - [`http_mock::MockHttpServer`] - wiremock-backed stub for lawmaker source APIs
//! - [`sources`] - descriptor and payload factories shaped like the real sources

#![allow(dead_code)]

pub mod http_mock;

pub mod sources {
    use makenoise_api::sources::{CredentialSpec, FieldMap, SourceDescriptor};
    use serde_json::{json, Value};

    /// Federal source pointed at `base_url`, keyed by the `X-API-Key` header.
    pub fn federal(base_url: &str) -> SourceDescriptor {
        SourceDescriptor::new(
            "federal",
            &format!("{base_url}/congress/v1/117/senate/members.json"),
            "results[0].members",
        )
        .expect("federal descriptor")
        .with_credential(CredentialSpec::header("X-API-Key"))
        .expect("federal credential")
    }

    /// State source pointed at `base_url`, keyed by the `key` query parameter.
    pub fn state(base_url: &str) -> SourceDescriptor {
        SourceDescriptor::new(
            "state",
            &format!("{base_url}/api/legislators"),
            "legislators",
        )
        .expect("state descriptor")
        .with_credential(CredentialSpec::query("key"))
        .expect("state credential")
        .with_fields(FieldMap::with_region("district").expect("region path"))
    }

    pub fn senator(id: &str, first: &str, last: &str, party: &str, state: &str) -> Value {
        json!({
            "id": id,
            "first_name": first,
            "last_name": last,
            "party": party,
            "state": state,
            "url": format!("https://www.{}.senate.gov", last.to_lowercase()),
            "phone": "202-224-0000"
        })
    }

    pub fn propublica_body(members: Vec<Value>) -> Value {
        json!({
            "status": "OK",
            "copyright": "Copyright (c) ProPublica Inc. All Rights Reserved.",
            "results": [{
                "congress": "117",
                "chamber": "Senate",
                "num_results": members.len(),
                "offset": 0,
                "members": members
            }]
        })
    }

    pub fn legislator(id: u64, first: &str, last: &str, party: &str, district: &str) -> Value {
        json!({
            "id": id,
            "first_name": first,
            "last_name": last,
            "party": party,
            "district": district,
            "email": format!("{}@legislature.example.gov", first.to_lowercase())
        })
    }
}
