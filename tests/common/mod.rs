//! Shared fixtures for the integration tests.
//!
//! Every test starts its own wiremock server, so tests can run in parallel.

#![allow(dead_code)]

use peripheral_provider::{PeripheralProvider, ProviderConfig};
use serde_json::{json, Value};

pub const RESOURCE: &str = "peripheral_gitlab_runner";

pub const SECRET: &str = "integration-secret";

/// A runner as the API returns it.
pub fn runner_json(id: &str, image: &str) -> Value {
    json!({
        "id": id,
        "url": "https://gitlab.com/",
        "token": "glrt-xxxx",
        "token_obtained_at": "2024-05-01T12:00:00Z",
        "description": "ci runner",
        "image": image,
        "tag_list": "docker,linux",
        "run_untagged": false
    })
}

/// What a user writes in configuration for a new runner.
pub fn runner_config(image: &str) -> Value {
    json!({
        "url": "https://gitlab.com/",
        "token": "glrt-xxxx",
        "image": image
    })
}

pub fn error_json(err_type: &str, msg: &str) -> Value {
    json!({"err_type": err_type, "msg": msg})
}

pub fn provider(endpoint: &str) -> PeripheralProvider {
    PeripheralProvider::new(&ProviderConfig::new(endpoint, SECRET))
        .expect("Failed to configure provider")
}

/// An address nothing listens on.
pub fn closed_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    drop(listener);
    format!("http://{}", addr)
}
