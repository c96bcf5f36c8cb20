//! Login, register and password-reset flows against a mock API.

use std::sync::Arc;
use std::time::Duration;

use cvopt_core::auth::{
    self, FlowOutcome, FlowStatus, ForgotPasswordFlow, LoginFlow, LoginForm, RegisterFlow,
    RegisterForm, ResetPasswordFlow,
};
use cvopt_core::client::{ApiClient, FailureKind, RetryPolicy};
use cvopt_core::gate::{AuthGate, Route};
use cvopt_core::session::{Credential, TokenStore};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn client_for(server: &MockServer, tokens: Arc<TokenStore>) -> ApiClient {
    ApiClient::new(&server.uri(), tokens)
        .unwrap()
        .with_retry_policy(RetryPolicy::none())
}

fn login_form(password: &str) -> LoginForm {
    LoginForm {
        email: "ada@example.com".into(),
        password: password.into(),
    }
}

#[tokio::test]
async fn test_login_stores_credential_and_opens_dashboard() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let tokens = Arc::new(TokenStore::open(home.path().join("session.json")).unwrap());
    let client = client_for(&server, Arc::clone(&tokens));
    let gate = AuthGate::new(Arc::clone(&tokens));

    let mut flow = LoginFlow::default();
    let outcome = flow.submit(&client, &login_form("hunter22")).await.unwrap();

    assert_eq!(outcome.destination(), Some(&Route::Dashboard));
    assert_eq!(outcome.notice(), "Signed in! Redirecting…");
    assert_eq!(flow.state.status(), FlowStatus::Idle);
    assert_eq!(tokens.get().map(|c| c.bearer().to_string()), Some("abc".into()));
    assert!(gate.navigate(Route::Dashboard).is_allowed());

    let reopened = TokenStore::open(home.path().join("session.json")).unwrap();
    assert!(reopened.is_authenticated());
}

#[tokio::test]
async fn test_failed_login_keeps_error_and_store_empty() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let tokens = Arc::new(TokenStore::in_memory());
    let client = client_for(&server, Arc::clone(&tokens));
    let mut flow = LoginFlow::default();

    let err = flow.submit(&client, &login_form("wrong")).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Rejected);
    assert_eq!(
        flow.state.error().map(|f| f.message.as_str()),
        Some("Invalid credentials")
    );
    assert_eq!(flow.state.status(), FlowStatus::Idle);
    assert!(!tokens.is_authenticated());
}

#[tokio::test]
async fn test_login_without_token_is_rejected() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "bearer"})))
        .mount(&server)
        .await;

    let tokens = Arc::new(TokenStore::in_memory());
    let client = client_for(&server, Arc::clone(&tokens));
    let err = LoginFlow::default()
        .submit(&client, &login_form("hunter22"))
        .await
        .unwrap_err();
    assert_eq!(err.message, "No access token received");
    assert!(!tokens.is_authenticated());
}

#[tokio::test]
async fn test_login_validation_skips_network() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(TokenStore::in_memory()));
    let err = LoginFlow::default()
        .submit(&client, &login_form(""))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Validation);
}

#[tokio::test]
async fn test_register_without_token_sends_user_to_login() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({"email": "ada@example.com", "password": "secret1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"message": "created"})))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = Arc::new(TokenStore::in_memory());
    let client = client_for(&server, Arc::clone(&tokens));
    let form = RegisterForm {
        email: "ada@example.com".into(),
        password: "secret1".into(),
        confirm: "secret1".into(),
    };

    let outcome = RegisterFlow::default().submit(&client, &form).await.unwrap();
    assert_eq!(
        outcome,
        FlowOutcome::Navigate {
            to: Route::Login,
            notice: "Account created! Please sign in.".into()
        }
    );
    assert!(!tokens.is_authenticated());
}

#[tokio::test]
async fn test_register_with_token_signs_in() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "new"})))
        .mount(&server)
        .await;

    let tokens = Arc::new(TokenStore::in_memory());
    let client = client_for(&server, Arc::clone(&tokens));
    let form = RegisterForm {
        email: "ada@example.com".into(),
        password: "secret1".into(),
        confirm: "secret1".into(),
    };

    let outcome = RegisterFlow::default().submit(&client, &form).await.unwrap();
    assert_eq!(outcome.destination(), Some(&Route::Dashboard));
    assert!(tokens.is_authenticated());
}

#[tokio::test]
async fn test_forgot_password_stays_with_notice() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/request-reset"))
        .and(body_json(json!({"email": "ada@example.com"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(TokenStore::in_memory()));
    let mut flow = ForgotPasswordFlow::default();
    let outcome = flow.submit(&client, " ada@example.com ").await.unwrap();
    assert_eq!(outcome.destination(), None);
    assert_eq!(
        flow.state.notice(),
        Some("If an account exists, we sent a reset link. Check your email.")
    );
}

#[tokio::test]
async fn test_reset_password_uses_link_token() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/reset-password"))
        .and(body_json(json!({"token": "reset-1", "new_password": "brandnew"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    // The reset token comes from the link, not from the session.
    let tokens = Arc::new(TokenStore::in_memory());
    tokens.set(Credential::new("session-token")).unwrap();
    let client = client_for(&server, tokens);

    let route = Route::parse("https://app.example.com/reset-password?token=reset-1");
    let mut flow = ResetPasswordFlow::from_route(&route);
    let outcome = flow.submit(&client, "brandnew").await.unwrap();
    assert_eq!(outcome.destination(), Some(&Route::Login));
    assert_eq!(outcome.notice(), "Password updated! You can now sign in.");
}

#[tokio::test]
async fn test_reset_without_token_is_validation_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(TokenStore::in_memory()));
    let mut flow = ResetPasswordFlow::from_route(&Route::parse("/reset-password"));
    let err = flow.submit(&client, "brandnew").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Validation);
    assert!(flow.state.error().is_some());
}

#[test]
fn test_logout_clears_session() {
    let home = TempDir::new().unwrap();
    let tokens = TokenStore::open(home.path().join("session.json")).unwrap();
    tokens.set(Credential::new("abc")).unwrap();

    assert!(auth::logout(&tokens).unwrap());
    assert!(!tokens.is_authenticated());
    assert!(!auth::logout(&tokens).unwrap());
}

#[tokio::test]
async fn test_abandoned_login_can_be_retried() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "late"}))
                .set_delay(Duration::from_millis(500)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let tokens = Arc::new(TokenStore::in_memory());
    let client = client_for(&server, Arc::clone(&tokens));
    let mut flow = LoginFlow::default();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        flow.submit(&client, &login_form("hunter22")),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(flow.state.status(), FlowStatus::Idle);

    let err = flow.submit(&client, &login_form("wrong")).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Rejected);
    assert_eq!(err.message, "Invalid credentials");
    assert_eq!(flow.state.status(), FlowStatus::Idle);
    assert!(!tokens.is_authenticated());
}
