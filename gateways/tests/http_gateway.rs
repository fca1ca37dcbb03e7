//! HTTP gateway tests
//!
//! These tests use wiremock to stand in for the Fornax API server.

use fornax_loadtest_core::{
    Application, ApplicationSession, ApplicationSpec, GatewayError, ObjectMeta, ResourceGateway,
    SessionSpec, SessionStatus,
};
use fornax_loadtest_gateways::HttpGateway;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const APPS: &str =
    "/apis/core.fornax-serverless.centaurusinfra.io/v1/namespaces/fornaxtest/applications";
const SESSIONS: &str =
    "/apis/core.fornax-serverless.centaurusinfra.io/v1/namespaces/fornaxtest/applicationsessions";

// ============================================================================
// Helper Functions
// ============================================================================

fn gateway(server: &MockServer) -> HttpGateway {
    HttpGateway::new(server.uri(), None, Duration::from_secs(5)).unwrap()
}

fn application_json(name: &str, running: u32) -> serde_json::Value {
    json!({
        "apiVersion": "core.fornax-serverless.centaurusinfra.io/v1",
        "kind": "Application",
        "metadata": {"name": name, "namespace": "fornaxtest"},
        "spec": {"scalingPolicy": {"minimumInstance": 1, "maximumInstance": 5000}},
        "status": {"totalInstances": running, "runningInstances": running, "idleInstances": 0}
    })
}

// ============================================================================
// TEST: Applications
// ============================================================================

#[tokio::test]
async fn test_get_application_decodes_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{APPS}/echoserver-0")))
        .respond_with(ResponseTemplate::new(200).set_body_json(application_json("echoserver-0", 3)))
        .mount(&server)
        .await;

    let app = gateway(&server)
        .get_application("fornaxtest", "echoserver-0")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(app.metadata.name, "echoserver-0");
    assert_eq!(app.status.running_instances, 3);
    assert_eq!(app.active_instances(), 3);
}

#[tokio::test]
async fn test_get_missing_application_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{APPS}/missing")))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let app = gateway(&server)
        .get_application("fornaxtest", "missing")
        .await
        .unwrap();

    assert!(app.is_none());
}

#[tokio::test]
async fn test_create_application_posts_camel_case_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(APPS))
        .and(body_partial_json(json!({
            "kind": "Application",
            "metadata": {"name": "echoserver-0", "namespace": "fornaxtest"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(application_json("echoserver-0", 0)))
        .expect(1)
        .mount(&server)
        .await;

    let request = Application::new(
        ObjectMeta::new("fornaxtest", "echoserver-0").with_creation_micros(1),
        ApplicationSpec::default(),
    );
    let created = gateway(&server).create_application(&request).await.unwrap();

    assert_eq!(created.metadata.name, "echoserver-0");
}

#[tokio::test]
async fn test_create_conflict_is_already_exists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(APPS))
        .respond_with(ResponseTemplate::new(409).set_body_string("exists"))
        .mount(&server)
        .await;

    let request = Application::new(
        ObjectMeta::new("fornaxtest", "echoserver-0"),
        ApplicationSpec::default(),
    );
    let err = gateway(&server)
        .create_application(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::AlreadyExists { .. }));
}

#[tokio::test]
async fn test_delete_missing_application_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{APPS}/gone")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .delete_application("fornaxtest", "gone")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_server_error_maps_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{APPS}/echoserver-0")))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .get_application("fornaxtest", "echoserver-0")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        GatewayError::Status {
            status: 503,
            message: "overloaded".into()
        }
    );
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{APPS}/echoserver-0")))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .get_application("fornaxtest", "echoserver-0")
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Decode(_)));
}

// ============================================================================
// TEST: Sessions
// ============================================================================

#[tokio::test]
async fn test_get_session_reads_available_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{SESSIONS}/echoserver-0-abc-session-0")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": {"name": "echoserver-0-abc-session-0", "namespace": "fornaxtest"},
            "spec": {"applicationName": "echoserver-0"},
            "status": {"sessionStatus": "Available", "availableTimeMicro": 1_700_000_000_000_000_i64}
        })))
        .mount(&server)
        .await;

    let session = gateway(&server)
        .get_session("fornaxtest", "echoserver-0-abc-session-0")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(session.status.session_status, SessionStatus::Available);
    assert_eq!(session.status.available_time_micro, 1_700_000_000_000_000);
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SESSIONS))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "metadata": {"name": "s-0", "namespace": "fornaxtest"},
            "spec": {"applicationName": "echoserver-0"},
            "status": {"sessionStatus": "Pending"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpGateway::new(server.uri(), Some("secret".into()), Duration::from_secs(5)).unwrap();
    let request = ApplicationSession::new(
        ObjectMeta::new("fornaxtest", "s-0"),
        SessionSpec {
            application_name: "echoserver-0".into(),
            ..Default::default()
        },
    );
    let created = gateway.create_session(&request).await.unwrap();

    assert_eq!(created.status.session_status, SessionStatus::Pending);
}

#[tokio::test]
async fn test_delete_session_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{SESSIONS}/s-0")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Success"})))
        .expect(1)
        .mount(&server)
        .await;

    gateway(&server)
        .delete_session("fornaxtest", "s-0")
        .await
        .unwrap();
}
