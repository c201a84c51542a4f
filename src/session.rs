//! Cookie-based login session.
//!
//! The service issues two cookies on login: `user_session` and
//! `user_session_secure`. A session counts as authenticated only while both are
//! present in the transport's cookie jar. [`SessionManager::login`] always
//! clears them first, so a failed login never leaves a stale half-session
//! behind.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use tracing::{debug, info, instrument};

use crate::error::FetchError;
use crate::http::{
    AcceptOk, CookieScope, DefaultErrorHandler, HttpRequest, RetryingClient, SessionRecovery,
    find_cookie, remove_cookie,
};

/// Name of the primary session cookie.
pub const PRIMARY_COOKIE: &str = "user_session";

/// Name of the secure session cookie.
pub const SECURE_COOKIE: &str = "user_session_secure";

/// Login credentials. The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    mail: String,
    password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(mail: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            mail: mail.into(),
            password: password.into(),
        }
    }

    /// Returns the login mail address.
    #[must_use]
    pub fn mail(&self) -> &str {
        &self.mail
    }

    /// Returns the password with every character replaced by `*`.
    #[must_use]
    pub fn masked_password(&self) -> String {
        "*".repeat(self.password.chars().count())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("mail", &self.mail)
            .field("password", &self.masked_password())
            .finish()
    }
}

/// Snapshot of the two session tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Value of `user_session`.
    pub primary_token: Option<String>,
    /// Value of `user_session_secure`.
    pub secure_token: Option<String>,
}

impl Session {
    /// Returns true when both tokens are present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.primary_token.is_some() && self.secure_token.is_some()
    }
}

/// Establishes and tracks the login session.
pub struct SessionManager {
    credentials: Credentials,
    login_url: String,
    scope: CookieScope,
    jar: Arc<Jar>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("credentials", &self.credentials)
            .field("login_url", &self.login_url)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a manager reading session cookies from `jar` within `scope`.
    #[must_use]
    pub fn new(
        credentials: Credentials,
        login_url: impl Into<String>,
        scope: CookieScope,
        jar: Arc<Jar>,
    ) -> Self {
        Self {
            credentials,
            login_url: login_url.into(),
            scope,
            jar,
        }
    }

    /// Returns the current tokens as found in the cookie jar.
    #[must_use]
    pub fn tokens(&self) -> Session {
        Session {
            primary_token: find_cookie(&self.jar, &self.scope, PRIMARY_COOKIE),
            secure_token: find_cookie(&self.jar, &self.scope, SECURE_COOKIE),
        }
    }

    /// Returns true when both session cookies are present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tokens().is_authenticated()
    }

    /// Clears both session cookies.
    pub fn invalidate(&self) {
        remove_cookie(&self.jar, &self.scope, PRIMARY_COOKIE);
        remove_cookie(&self.jar, &self.scope, SECURE_COOKIE);
        debug!("session invalidated");
    }

    /// Logs in with the configured credentials.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::LoginFailed`] if every attempt failed or the
    /// service did not issue both session cookies.
    #[instrument(skip_all, fields(mail = %self.credentials.mail))]
    pub async fn login(&mut self, client: &mut RetryingClient) -> Result<(), FetchError> {
        self.invalidate();

        let request = HttpRequest::post_form(
            self.login_url.clone(),
            vec![
                ("mail".to_string(), self.credentials.mail.clone()),
                ("password".to_string(), self.credentials.password.clone()),
            ],
        );

        let response = client
            .request(&request, &AcceptOk, &DefaultErrorHandler)
            .await?;
        if response.is_none() {
            return Err(FetchError::login_failed("login request failed on every attempt"));
        }

        let tokens = self.tokens();
        if !tokens.is_authenticated() {
            let missing: Vec<&str> = [
                (PRIMARY_COOKIE, tokens.primary_token.is_none()),
                (SECURE_COOKIE, tokens.secure_token.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            return Err(FetchError::login_failed(format!(
                "session cookie not issued: {}",
                missing.join(", ")
            )));
        }

        info!("logged in");
        Ok(())
    }
}

#[async_trait]
impl SessionRecovery for SessionManager {
    async fn recover(&mut self, client: &mut RetryingClient) -> Result<(), FetchError> {
        debug!("re-establishing session");
        self.login(client).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn manager(jar: Arc<Jar>) -> SessionManager {
        SessionManager::new(
            Credentials::new("user@example.com", "secret"),
            "http://127.0.0.1/login",
            CookieScope::new("http://127.0.0.1/".parse().unwrap(), None),
            jar,
        )
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = Credentials::new("user@example.com", "secret");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("user@example.com"));
        assert!(!debug.contains("secret"));
        assert!(debug.contains("******"));
    }

    #[test]
    fn test_empty_jar_is_unauthenticated() {
        let manager = manager(Arc::new(Jar::default()));
        assert_eq!(manager.tokens(), Session::default());
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn test_one_cookie_is_not_enough() {
        let jar = Arc::new(Jar::default());
        let url = "http://127.0.0.1/".parse().unwrap();
        jar.add_cookie_str("user_session=a; Path=/", &url);
        let manager = manager(jar);
        assert!(!manager.is_authenticated());
        assert_eq!(manager.tokens().primary_token.as_deref(), Some("a"));
    }

    #[test]
    fn test_invalidate_clears_both_tokens() {
        let jar = Arc::new(Jar::default());
        let url = "http://127.0.0.1/".parse().unwrap();
        jar.add_cookie_str("user_session=a; Path=/", &url);
        jar.add_cookie_str("user_session_secure=b; Path=/", &url);
        let manager = manager(jar);
        assert!(manager.is_authenticated());

        manager.invalidate();

        assert!(!manager.is_authenticated());
        assert_eq!(manager.tokens(), Session::default());
    }
}
