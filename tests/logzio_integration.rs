//! Integration tests for the Logz.io login handshake

mod common;

use common::*;
use eyre::Result;
use kibana_provisioner::client::{
    AuthenticationHandler, LogzioAuthenticationHandler, OneTimeCode, SessionState,
};
use kibana_provisioner::config::{Config, KibanaType};
use kibana_provisioner::{Error, KibanaClient};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out "000001", "000002", ... and counts how often it was asked.
#[derive(Clone, Default)]
struct CountingCode {
    generated: Arc<AtomicUsize>,
}

impl OneTimeCode for CountingCode {
    fn generate(&self) -> kibana_provisioner::client::Result<String> {
        let n = self.generated.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{:06}", n))
    }
}

async fn mount_login_page(server: &MockServer, cookie: &str) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "AWSELB=abc; Path=/")
                .append_header("set-cookie", cookie),
        )
        .mount(server)
        .await;
}

async fn mount_jwt_login(server: &MockServer, csrf_token: &str, session_token: &str) {
    Mock::given(method("POST"))
        .and(path("/login/jwt"))
        .and(header("x-logz-csrf-token", csrf_token))
        .and(body_string_contains("id-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "sessionToken": session_token })),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_grant(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/ro"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id_token": "id-token" })))
        .mount(server)
        .await;
}

async fn mount_protected_search(server: &MockServer, session_token: &str) {
    Mock::given(method("GET"))
        .and(path("/api/saved_objects/search/abc"))
        .and(header("x-auth-token", session_token))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "abc",
            "type": "search",
            "version": 1,
            "attributes": {"title": "Protected", "kibanaSavedObjectMeta": {"searchSourceJSON": "{}"}}
        })))
        .mount(server)
        .await;
}

fn handler(server: &MockServer) -> LogzioAuthenticationHandler {
    LogzioAuthenticationHandler::new(server.uri(), server.uri(), "client-id", "user", "secret")
}

fn client(server: &MockServer, handler: Arc<LogzioAuthenticationHandler>) -> KibanaClient {
    let config = Config::new(server.uri(), "6.0.0").with_type(KibanaType::Logzio);
    KibanaClient::with_auth(config, handler).unwrap()
}

#[tokio::test]
async fn test_login_applies_session_token() -> Result<()> {
    let server = MockServer::start().await;
    mount_login_page(&server, "Logzio-Csrf-V2=csrf-v2; Path=/; HttpOnly").await;
    mount_grant(&server).await;
    mount_jwt_login(&server, "csrf-v2", "session-1").await;
    mount_protected_search(&server, "session-1").await;

    let handler = Arc::new(handler(&server));
    let client = client(&server, handler.clone());

    let search = client.search().get_by_id("abc").await?;
    assert_eq!(search.attributes.title, "Protected");
    assert_eq!(
        handler.state().await,
        SessionState::HasSessionToken {
            csrf_token: "csrf-v2".to_string(),
            session_token: "session-1".to_string(),
        }
    );

    // The session is reused; the jwt login mock expects exactly one call.
    client.search().get_by_id("abc").await?;
    Ok(())
}

#[tokio::test]
async fn test_missing_csrf_cookie_is_auth_error() -> Result<()> {
    let server = MockServer::start().await;
    mount_login_page(&server, "Something-Else=1; Path=/").await;

    let handler = Arc::new(handler(&server));
    let client = client(&server, handler.clone());

    let err = client.search().get_by_id("abc").await.unwrap_err();
    assert!(err.is_auth_error());
    assert_eq!(handler.state().await, SessionState::Unauthenticated);
    Ok(())
}

#[tokio::test]
async fn test_login_page_error_is_auth_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client(&server, Arc::new(handler(&server)));
    let err = client.search().get_by_id("abc").await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
    Ok(())
}

#[tokio::test]
async fn test_rejected_mfa_code_is_retried_once() -> Result<()> {
    let server = MockServer::start().await;
    mount_login_page(&server, "Logzio-Csrf=csrf-1; Path=/").await;

    Mock::given(method("POST"))
        .and(path("/oauth/ro"))
        .and(body_string_contains("mfa_code=000001"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_user_password"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/ro"))
        .and(body_string_contains("mfa_code=000002"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id_token": "id-token" })))
        .expect(1)
        .mount(&server)
        .await;
    mount_jwt_login(&server, "csrf-1", "session-mfa").await;
    mount_protected_search(&server, "session-mfa").await;

    let codes = CountingCode::default();
    let handler = Arc::new(handler(&server).with_one_time_code(Box::new(codes.clone())));
    let client = client(&server, handler);

    client.search().get_by_id("abc").await?;
    assert_eq!(codes.generated.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_second_mfa_rejection_fails() -> Result<()> {
    let server = MockServer::start().await;
    mount_login_page(&server, "Logzio-Csrf=csrf-1; Path=/").await;
    Mock::given(method("POST"))
        .and(path("/oauth/ro"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let codes = CountingCode::default();
    let handler = Arc::new(handler(&server).with_one_time_code(Box::new(codes.clone())));
    let client = client(&server, handler.clone());

    let err = client.search().get_by_id("abc").await.unwrap_err();
    assert!(matches!(err, Error::MfaRejected));
    assert_eq!(codes.generated.load(Ordering::SeqCst), 2);
    // The CSRF token survives so the next attempt skips the login page.
    assert_eq!(
        handler.state().await,
        SessionState::HasCsrfToken {
            csrf_token: "csrf-1".to_string()
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_concurrent_first_requests_log_in_once() -> Result<()> {
    let server = MockServer::start().await;
    mount_login_page(&server, "Logzio-Csrf=csrf-1; Path=/").await;
    mount_grant(&server).await;
    mount_jwt_login(&server, "csrf-1", "session-1").await;
    mount_protected_search(&server, "session-1").await;

    let client = client(&server, Arc::new(handler(&server)));
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.search().get_by_id("abc").await })
        })
        .collect();

    for task in tasks {
        task.await??;
    }
    Ok(())
}

#[tokio::test]
async fn test_change_account_replaces_session_token() -> Result<()> {
    let server = MockServer::start().await;
    mount_login_page(&server, "Logzio-Csrf=csrf-1; Path=/").await;
    mount_grant(&server).await;
    mount_jwt_login(&server, "csrf-1", "session-1").await;
    Mock::given(method("GET"))
        .and(path("/user/session/replace/42"))
        .and(header("x-auth-token", "session-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "sessionToken": "session-42" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_protected_search(&server, "session-42").await;

    let handler = Arc::new(handler(&server));
    let client = client(&server, handler.clone());

    client.change_account("42").await?;
    let search = client.search().get_by_id("abc").await?;
    assert_eq!(search.id, "abc");
    assert_eq!(
        handler.state().await,
        SessionState::HasSessionToken {
            csrf_token: "csrf-1".to_string(),
            session_token: "session-42".to_string(),
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_change_account_unsupported_without_logzio() -> Result<()> {
    let server = MockServer::start().await;
    let client = vanilla_client(&server, "7.3.1");
    let err = client.change_account("42").await.unwrap_err();
    assert!(matches!(err, Error::Unsupported(_, "none")));
    assert_eq!(client.agent().auth().name(), "none");
    Ok(())
}
