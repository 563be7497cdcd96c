use apksure_api_client::{
    ApiClient, Artifact, AuthenticatedApi, ClientError, PollPolicy, UploadWorkflow,
    WorkflowStatus,
};
use apksure_core::ArtifactValidator;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "session-token";

async fn mount_signin(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/signin"))
        .and(body_json(serde_json::json!({ "email": "a@b.com", "password": "x" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Sign-in successful!",
            "token": TOKEN,
            "expires_at": "2099-01-01T00:00:00Z"
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/signin"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({ "message": "Invalid credentials." })),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sign_in_returns_session() {
    let server = MockServer::start().await;
    mount_signin(&server).await;

    let client = ApiClient::new(&server.uri()).expect("client");
    let session = client.sign_in("a@b.com", "x").await.expect("sign in");

    assert_eq!(session.token(), TOKEN);
    assert_eq!(session.email(), "a@b.com");
    assert!(!session.is_expired());
}

#[tokio::test]
async fn test_sign_in_unknown_user_surfaces_message() {
    let server = MockServer::start().await;
    mount_signin(&server).await;

    let client = ApiClient::new(&server.uri()).expect("client");
    let err = client
        .sign_in("nobody@x.com", "y")
        .await
        .expect_err("unknown user");

    assert!(err.is_unauthorized());
    match err {
        ClientError::Status { message, .. } => assert_eq!(message, "Invalid credentials."),
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_register() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "message": "Account created",
            "id": "6f1c2a5e-0000-4000-8000-000000000001",
            "email": "new@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).expect("client");
    let response = client
        .register("new@example.com", "secret1")
        .await
        .expect("register");
    assert_eq!(response.email, "new@example.com");
}

#[tokio::test]
async fn test_malformed_status_body_is_decode_error() {
    let server = MockServer::start().await;
    mount_signin(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/analyze/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).expect("client");
    let session = client.sign_in("a@b.com", "x").await.expect("sign in");
    let err = client
        .job_status(&session, "job-1")
        .await
        .expect_err("decode error");
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn test_end_to_end_upload_and_poll() {
    let server = MockServer::start().await;
    mount_signin(&server).await;

    let bearer = format!("Bearer {}", TOKEN);
    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .and(header("authorization", bearer.as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "jobid": "job-42" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/analyze/job-42"))
        .and(header("authorization", bearer.as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "pending" })),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/analyze/job-42"))
        .and(header("authorization", bearer.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "complete",
            "result": { "app": {
                "name": "Foo",
                "package": "com.foo",
                "version_name": "1.0",
                "version_code": 1,
                "apk_sha256": "abc123"
            }}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).expect("client");

    let unknown = client.sign_in("nobody@x.com", "y").await;
    assert!(matches!(unknown, Err(ref e) if e.is_unauthorized()));

    let session = client.sign_in("a@b.com", "x").await.expect("sign in");
    let api = AuthenticatedApi::new(client.clone(), session);
    let workflow = UploadWorkflow::new(
        api,
        PollPolicy::fixed(Duration::from_millis(20), 50),
        ArtifactValidator::apk(),
    );

    workflow
        .select(Artifact::new("app.apk", vec![0u8; 10 * 1024 * 1024]))
        .await
        .expect("select");
    workflow.analyze().await.expect("analyze");
    assert_eq!(workflow.snapshot().jobid.as_deref(), Some("job-42"));

    let state = tokio::time::timeout(Duration::from_secs(10), workflow.wait())
        .await
        .expect("workflow settles");
    assert_eq!(state.status, WorkflowStatus::Complete);

    let app = state.result.expect("app info");
    assert_eq!(app.name, "Foo");
    assert_eq!(app.package, "com.foo");
    assert_eq!(app.version_name, "1.0");
    assert_eq!(app.version_code, 1);
    assert_eq!(app.apk_sha256, "abc123");
}

#[tokio::test]
async fn test_requests_without_valid_session_fail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analyze/job-1"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({ "message": "Invalid session token" })),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).expect("client");
    let stale = apksure_api_client::Session::new(
        "expired".to_string(),
        "a@b.com".to_string(),
        chrono::Utc::now(),
    );
    let err = client
        .job_status(&stale, "job-1")
        .await
        .expect_err("unauthorized");
    assert!(err.is_unauthorized());
}
