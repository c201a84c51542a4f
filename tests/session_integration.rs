//! Integration tests for login and session tracking.

mod support;

use nicocc_core::error::FetchError;
use support::socket_guard::start_mock_server_or_skip;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_login_with_both_cookies_authenticates() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    support::mount_login(&server).await;

    let mut client = support::client(0);
    let mut session = support::session(&server, &client);
    assert!(!session.is_authenticated());

    session.login(&mut client).await.unwrap();

    assert!(session.is_authenticated());
    let tokens = session.tokens();
    assert_eq!(tokens.primary_token.as_deref(), Some("user_session_4242_abc"));
    assert_eq!(tokens.secure_token.as_deref(), Some("sec_xyz"));
}

#[tokio::test]
async fn test_login_posts_credentials_as_form() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/secure/login"))
        .and(body_string_contains("mail=viewer%40example.com"))
        .and(body_string_contains("password=correct+horse"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "user_session=a; Path=/")
                .append_header("set-cookie", "user_session_secure=b; Path=/"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut client = support::client(0);
    let mut session = support::session(&server, &client);
    session.login(&mut client).await.unwrap();
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_invalidate_clears_session() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    support::mount_login(&server).await;

    let mut client = support::client(0);
    let mut session = support::session(&server, &client);
    session.login(&mut client).await.unwrap();

    session.invalidate();

    assert!(!session.is_authenticated());
    assert!(session.tokens().primary_token.is_none());
    assert!(session.tokens().secure_token.is_none());
}

#[tokio::test]
async fn test_login_without_secure_cookie_fails() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/secure/login"))
        .respond_with(
            ResponseTemplate::new(200).append_header("set-cookie", "user_session=only; Path=/"),
        )
        .mount(&server)
        .await;

    let mut client = support::client(0);
    let mut session = support::session(&server, &client);
    let error = session.login(&mut client).await.unwrap_err();

    assert!(matches!(error, FetchError::LoginFailed { .. }), "{error:?}");
    assert!(error.to_string().contains("user_session_secure"));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_login_exhausted_is_login_failure() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/secure/login"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let mut client = support::client(1);
    let mut session = support::session(&server, &client);
    let error = session.login(&mut client).await.unwrap_err();

    assert!(matches!(error, FetchError::LoginFailed { .. }));
}

#[tokio::test]
async fn test_relogin_replaces_previous_tokens() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/secure/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "user_session=first; Path=/")
                .append_header("set-cookie", "user_session_secure=first_s; Path=/"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/secure/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "user_session=second; Path=/")
                .append_header("set-cookie", "user_session_secure=second_s; Path=/"),
        )
        .mount(&server)
        .await;

    let mut client = support::client(0);
    let mut session = support::session(&server, &client);
    session.login(&mut client).await.unwrap();
    assert_eq!(session.tokens().primary_token.as_deref(), Some("first"));

    session.login(&mut client).await.unwrap();
    assert_eq!(session.tokens().primary_token.as_deref(), Some("second"));
    assert_eq!(session.tokens().secure_token.as_deref(), Some("second_s"));
}
