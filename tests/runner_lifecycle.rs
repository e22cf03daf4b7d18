//! End-to-end lifecycle of the runner resource against a mocked API.

mod common;

use common::{closed_endpoint, error_json, provider, runner_config, runner_json, RESOURCE, SECRET};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use peripheral_provider::auth::Claims;
use peripheral_provider::client::{ClientError, ErrorType};
use peripheral_provider::testing::{
    assert_error_contains, assert_error_detail_contains, assert_no_errors,
    assert_plan_creates, assert_plan_no_changes, assert_plan_replaces,
    assert_plan_updates_in_place, ProviderTester,
};
use peripheral_provider::{
    CancellationToken, InstanceState, ProviderError, ResourceInstance, ProviderService,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_create_persists_created_runner() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/gitlab-runners"))
        .and(header_exists("authorization"))
        .and(body_partial_json(json!({"id": "", "image": "alpine:latest"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(runner_json("1001", "alpine:latest")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let tester = ProviderTester::new(provider(&mock_server.uri()));
    let plan = tester
        .plan_create(RESOURCE, runner_config("alpine:latest"))
        .await
        .expect("Plan failed");
    assert_plan_creates(&plan);

    let state = tester
        .create(RESOURCE, plan.planned_state)
        .await
        .expect("Create failed");

    assert_eq!(state["id"], "1001");
    assert_eq!(state["description"], "ci runner");
    assert_eq!(state["tag_list"], "docker,linux");
    assert_eq!(state["run_untagged"], false);
    assert_eq!(state["token_obtained_at"], "2024-05-01T12:00:00Z");

    mock_server.verify().await;
}

#[tokio::test]
async fn test_create_records_sparse_server_reply() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/gitlab-runners"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "1002",
            "url": "https://gitlab.com/",
            "token": "glrt-xxxx",
            "image": "alpine:latest"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server.uri());
    let mut instance = ResourceInstance::new(RESOURCE);
    let diags = instance
        .create(&provider, &CancellationToken::new(), runner_config("alpine:latest"))
        .await;

    assert_no_errors(&diags);
    let state = instance.current().unwrap();
    assert_eq!(state["id"], "1002");
    assert_eq!(state["description"], "");
    assert_eq!(state["tag_list"], "");
    assert_eq!(state["run_untagged"], false);
    assert!(state["token_obtained_at"].is_null());

    mock_server.verify().await;
}

#[tokio::test]
async fn test_unknown_error_kind_reaches_diagnostic() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gitlab-runners/42"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(error_json("Gone", "runner was removed")),
        )
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server.uri());
    let mut instance = ResourceInstance::with_state(RESOURCE, json!({"id": "42"}));
    let diags = instance.read(&provider, &CancellationToken::new()).await;

    assert_error_contains(&diags, "API Error");
    assert_error_detail_contains(&diags, "404 Not Found: Other: runner was removed");
}

#[tokio::test]
async fn test_requests_are_signed_with_configured_secret() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gitlab-runners/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(runner_json("42", "alpine")))
        .mount(&mock_server)
        .await;

    let tester = ProviderTester::new(provider(&mock_server.uri()));
    tester
        .read(RESOURCE, json!({"id": "42"}))
        .await
        .expect("Read failed");

    let requests = mock_server.received_requests().await.expect("Recording disabled");
    let header = requests[0]
        .headers
        .get("authorization")
        .expect("Missing authorization header")
        .to_str()
        .unwrap();
    let jwt = header.strip_prefix("Bearer ").expect("Not a bearer token");

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&["peripheral"]);
    let claims = decode::<Claims>(jwt, &DecodingKey::from_secret(SECRET.as_bytes()), &validation)
        .expect("Token does not verify")
        .claims;
    assert_eq!(claims.iss, "peripheral");
}

#[tokio::test]
async fn test_full_lifecycle_through_instance() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/gitlab-runners"))
        .respond_with(ResponseTemplate::new(201).set_body_json(runner_json("7", "alpine:3.19")))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/gitlab-runners/7"))
        .and(body_partial_json(json!({"id": "7", "image": "alpine:3.20"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(runner_json("7", "alpine:3.20")))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gitlab-runners/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(runner_json("7", "alpine:3.20")))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/gitlab-runners/7"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server.uri());
    let cancel = CancellationToken::new();
    let mut instance = ResourceInstance::new(RESOURCE);

    let plan = provider
        .plan(RESOURCE, None, runner_config("alpine:3.19"))
        .await
        .unwrap();
    assert_no_errors(&instance.create(&provider, &cancel, plan.planned_state).await);
    assert_eq!(instance.current().unwrap()["id"], "7");

    let prior = instance.current().cloned();
    let plan = provider
        .plan(RESOURCE, prior, runner_config("alpine:3.20"))
        .await
        .unwrap();
    assert_plan_updates_in_place(&plan);
    assert_eq!(plan.planned_state["id"], "7");
    assert_no_errors(&instance.update(&provider, &cancel, plan.planned_state).await);
    assert_eq!(instance.current().unwrap()["image"], "alpine:3.20");

    assert_no_errors(&instance.read(&provider, &cancel).await);
    let plan = provider
        .plan(RESOURCE, instance.current().cloned(), runner_config("alpine:3.20"))
        .await
        .unwrap();
    assert_plan_no_changes(&plan);

    assert_no_errors(&instance.delete(&provider, &cancel).await);
    assert_eq!(*instance.state(), InstanceState::Absent);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_read_not_found_keeps_state() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gitlab-runners/42"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(error_json("NotFound", "runner 42 not found")),
        )
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server.uri());
    let prior = runner_json("42", "alpine");
    let mut instance = ResourceInstance::with_state(RESOURCE, prior.clone());

    let diags = instance.read(&provider, &CancellationToken::new()).await;
    assert_error_contains(&diags, "API Error");
    assert_error_detail_contains(
        &diags,
        "Unable to read GitLabRunner, got status: 404 Not Found: NotFound: runner 42 not found",
    );
    assert_eq!(instance.current(), Some(&prior));
}

#[tokio::test]
async fn test_create_bad_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/gitlab-runners"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(error_json("InvalidArgument", "bad url")),
        )
        .mount(&mock_server)
        .await;

    let tester = ProviderTester::new(provider(&mock_server.uri()));
    let err = tester
        .create(RESOURCE, runner_config("alpine"))
        .await
        .unwrap_err();

    match err {
        ProviderError::Api {
            operation,
            status_text,
            error,
        } => {
            assert_eq!(operation, "create");
            assert_eq!(status_text, "400 Bad Request");
            assert_eq!(error.err_type, ErrorType::InvalidArgument);
            assert_eq!(error.msg, "bad url");
        },
        other => panic!("Expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_undeclared_status_carries_raw_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/gitlab-runners/42"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&mock_server)
        .await;

    let tester = ProviderTester::new(provider(&mock_server.uri()));
    let err = tester
        .delete(RESOURCE, json!({"id": "42"}))
        .await
        .unwrap_err();

    match err {
        ProviderError::Api { error, .. } => {
            assert_eq!(error.err_type, ErrorType::Other);
            assert_eq!(error.msg, "upstream unavailable");
        },
        other => panic!("Expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_update_connection_failure() {
    let provider = provider(&closed_endpoint());
    let prior = runner_json("42", "alpine");
    let mut instance = ResourceInstance::with_state(RESOURCE, prior.clone());

    let diags = instance
        .update(&provider, &CancellationToken::new(), runner_config("alpine:edge"))
        .await;

    assert_error_contains(&diags, "Client Error");
    assert_error_detail_contains(&diags, "Unable to talk to client, got error:");
    assert_eq!(instance.current(), Some(&prior));
}

#[tokio::test]
async fn test_transport_failure_is_client_error() {
    let tester = ProviderTester::new(provider(&closed_endpoint()));
    let err = tester
        .read(RESOURCE, json!({"id": "42"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Client(ClientError::Transport(_))));
}

#[tokio::test]
async fn test_import_then_read() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gitlab-runners/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(runner_json("42", "alpine")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server.uri());
    let mut instance = ResourceInstance::new(RESOURCE);

    assert_no_errors(&instance.import(&provider, "42").await);
    assert_eq!(instance.current(), Some(&json!({"id": "42"})));

    assert_no_errors(&instance.read(&provider, &CancellationToken::new()).await);
    assert_eq!(instance.current().unwrap()["image"], "alpine");

    mock_server.verify().await;
}

#[tokio::test]
async fn test_changing_id_forces_replacement() {
    let tester = ProviderTester::new(provider("https://peripheral.example"));
    let mut proposed = runner_config("alpine");
    proposed["id"] = json!("43");

    let plan = tester
        .plan_update(RESOURCE, runner_json("42", "alpine"), proposed)
        .await
        .unwrap();
    assert_plan_replaces(&plan);
}

#[tokio::test]
async fn test_invalid_id_never_reaches_server() {
    let mock_server = MockServer::start().await;

    let tester = ProviderTester::new(provider(&mock_server.uri()));
    for id in ["", ".", ".."] {
        let err = tester.read(RESOURCE, json!({"id": id})).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Client(ClientError::InvalidPathParam { .. })
        ));
    }

    let requests = mock_server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}
