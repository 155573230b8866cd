//! Integration tests for ApiClient.
//!
//! Uses wiremock for HTTP mocking. Covers collection and bound calls, body
//! and query construction, multipart uploads, and failure classification.

use debintake_api::{
    ApiClient, ApiError, BasicAuth, CallArgs, ClientConfig, ErrorKind, ErrorReason, FilePayload,
    LocalRepoInfo, PublishStep, SigningOptions,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_client(mock_server: &MockServer) -> ApiClient {
    ApiClient::new(&ClientConfig::new(mock_server.uri())).expect("failed to create client")
}

#[tokio::test]
async fn test_list_repositories() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"Name": "stable_bookworm_main", "Comment": "", "DefaultDistribution": "bookworm", "DefaultComponent": "main"}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let repos: Vec<LocalRepoInfo> = client
        .entity("LocalRepo")
        .unwrap()
        .call_as("list", CallArgs::new())
        .await
        .expect("list failed");

    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].default_component, "main");
}

#[tokio::test]
async fn test_create_sends_capitalized_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/repos"))
        .and(body_json(json!({
            "Comment": "Local repository for bookworm/main",
            "DefaultDistribution": "bookworm",
            "DefaultComponent": "main",
            "Name": "stable_bookworm_main",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"Name": "stable_bookworm_main"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let created = client
        .entity("LocalRepo")
        .unwrap()
        .call(
            "@create",
            CallArgs::new()
                .arg("stable_bookworm_main")
                .kwarg("comment", "Local repository for bookworm/main")
                .kwarg("default_distribution", "bookworm")
                .kwarg("default_component", "main"),
        )
        .await
        .expect("create failed");

    assert_eq!(created["Name"], "stable_bookworm_main");
}

#[tokio::test]
async fn test_bound_call_with_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/repos/stable_bookworm_main/include/run1-main"))
        .and(query_param("forceReplace", "1"))
        .and(query_param("acceptUnsigned", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"FailedFiles": [], "Report": {}})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let include = client
        .entity("RepositoryDirectory")
        .unwrap()
        .bind([("name", "stable_bookworm_main"), ("dir", "run1-main")]);
    include
        .call(
            "include",
            CallArgs::new()
                .kwarg("force_replace", true)
                .kwarg("accept_unsigned", false),
        )
        .await
        .expect("include failed");
}

#[tokio::test]
async fn test_publish_body_with_signing() {
    let mock_server = MockServer::start().await;

    let signing = SigningOptions::new([("Skip", true)]).unwrap();
    let sources = vec![PublishStep::new("main", "stable_bookworm_main_run1")];

    Mock::given(method("POST"))
        .and(path("/api/publish/stable"))
        .and(body_json(json!({
            "Distribution": "bookworm",
            "Signing": {"Skip": true},
            "SourceKind": "snapshot",
            "Sources": [{"Component": "main", "Name": "stable_bookworm_main_run1"}],
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"Prefix": "stable"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    client
        .entity("PublishedRepo")
        .unwrap()
        .bind([("prefix", "stable")])
        .call(
            "publish",
            CallArgs::new()
                .arg("snapshot")
                .arg(sources.as_slice())
                .kwarg("distribution", "bookworm")
                .kwarg("signing", signing)
                .kwarg("label", None::<String>),
        )
        .await
        .expect("publish failed");
}

#[tokio::test]
async fn test_http_error_classified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/publish/stable/bookworm"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": "unable to update: component contrib is not in published repository"
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client
        .entity("PublishedDistribution")
        .unwrap()
        .bind([("prefix", "stable"), ("distribution", "bookworm")])
        .call("update", CallArgs::new().kwarg("force_overwrite", true))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.status(), Some(500));
    assert_eq!(
        err.reason(),
        Some(&ErrorReason::ComponentNotPublished {
            component: Some("contrib".to_string())
        })
    );
}

#[tokio::test]
async fn test_non_json_error_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/snapshots/old"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client
        .entity("Snapshot")
        .unwrap()
        .bind([("name", "old")])
        .call("delete", CallArgs::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Http { status: 502, ref message, .. } if message == "non-JSON error body"));
}

#[tokio::test]
async fn test_validation_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client
        .entity("LocalRepo")
        .unwrap()
        .call("@create", CallArgs::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("expected 1, got 0"));
}

#[tokio::test]
async fn test_basic_auth_header() {
    let mock_server = MockServer::start().await;

    // base64("ci:secret")
    Mock::given(method("GET"))
        .and(path("/api/publish"))
        .and(header("authorization", "Basic Y2k6c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = ClientConfig::new(mock_server.uri())
        .with_credentials(BasicAuth::new("ci", Some("secret".to_string())));
    let client = ApiClient::new(&config).unwrap();
    let published = client
        .entity("PublishedRepo")
        .unwrap()
        .call("list", CallArgs::new())
        .await
        .expect("list failed");

    assert_eq!(published, json!([]));
}

#[tokio::test]
async fn test_upload_sends_file_part() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/files/run1-main"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"hello_1.0_amd64.deb\""))
        .and(body_string_contains("package-bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["run1-main/hello_1.0_amd64.deb"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let uploaded = client
        .entity("Directory")
        .unwrap()
        .bind([("dir", "run1-main")])
        .call(
            "upload",
            CallArgs::new().file(FilePayload::new("hello_1.0_amd64.deb", b"package-bytes".to_vec())),
        )
        .await
        .expect("upload failed");

    assert_eq!(uploaded, json!(["run1-main/hello_1.0_amd64.deb"]));
}

#[tokio::test]
async fn test_placeholder_values_are_escaped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/snapshots/keep"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/snapshots/keep%23old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    client
        .entity("Snapshot")
        .unwrap()
        .bind([("name", "keep#old")])
        .call("delete", CallArgs::new())
        .await
        .expect("delete failed");
}

#[tokio::test]
async fn test_sub_second_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/repos"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/snapshots"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let config = ClientConfig::new(mock_server.uri()).with_timeout(Duration::from_millis(500));
    let client = ApiClient::new(&config).unwrap();

    let repos = client
        .entity("LocalRepo")
        .unwrap()
        .call("list", CallArgs::new())
        .await
        .expect("list within the timeout failed");
    assert_eq!(repos, json!([]));

    let err = client
        .entity("Snapshot")
        .unwrap()
        .call("list", CallArgs::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Timeout { timeout } if timeout == Duration::from_millis(500)));
}
