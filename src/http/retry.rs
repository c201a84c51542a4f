//! Bounded retry around the [`Transport`] with pluggable acceptance and
//! error-recovery strategies.
//!
//! # Overview
//!
//! [`RetryingClient::request`] makes up to `retry + 1` attempts. Each attempt
//! ends in one of three ways:
//!
//! - the transport fails: the [`ErrorHandler`] decides between substituting a
//!   value ([`Recovery::Substitute`]), retrying ([`Recovery::Retry`]) or
//!   retrying after the server-error pause ([`Recovery::Backoff`]);
//! - the transport succeeds and the [`ResponseAcceptor`] returns a value,
//!   which ends the loop;
//! - the acceptor returns an [`AcceptanceError`]. `Rejected` and
//!   `ServerError` lead to another attempt (after [`SessionRecovery`] when one
//!   is supplied); `Fatal` aborts immediately.
//!
//! When every attempt fails the result is `Ok(None)`; callers decide whether
//! that is fatal.
//!
//! There is no exponential backoff. The only pause besides request pacing is
//! the fixed server-error pause (30 seconds by default).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::error::{AcceptanceError, TransportError};
use super::request::{HttpRequest, HttpResponse};
use super::transport::Transport;
use crate::error::FetchError;

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRY: u32 = 2;

/// Default pause after a server error (30 seconds).
pub const DEFAULT_SERVER_ERROR_PAUSE: Duration = Duration::from_secs(30);

/// Turns a successful exchange into a value, or explains why it is unusable.
pub trait ResponseAcceptor {
    /// The value produced for an accepted response.
    type Output;

    /// Inspects a response.
    ///
    /// # Errors
    ///
    /// Returns an [`AcceptanceError`] when the response cannot be used.
    fn accept(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<Self::Output, AcceptanceError>;
}

/// What to do after a transport failure.
#[derive(Debug)]
pub enum Recovery<T> {
    /// Use this value as the result of the request; no further attempts.
    Substitute(T),
    /// Try again after the usual pacing.
    Retry,
    /// Try again after the server-error pause.
    Backoff,
}

/// Decides how to recover from a transport failure.
pub trait ErrorHandler<T> {
    /// Maps a transport error to a recovery action.
    fn handle(&self, request: &HttpRequest, error: &TransportError) -> Recovery<T>;
}

/// Re-establishes the session between attempts of an authenticated request.
#[async_trait]
pub trait SessionRecovery: Send {
    /// Restores a usable session, using `client` for any requests needed.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the session cannot be restored; the
    /// retry loop stops and propagates it.
    async fn recover(&mut self, client: &mut RetryingClient) -> Result<(), FetchError>;
}

/// Default acceptor: any status other than 200 is a rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptOk;

impl ResponseAcceptor for AcceptOk {
    type Output = HttpResponse;

    fn accept(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<HttpResponse, AcceptanceError> {
        require_ok(request, response)
    }
}

/// Passes a 200 response through and rejects anything else.
///
/// # Errors
///
/// Returns [`AcceptanceError::Rejected`] for non-200 responses.
pub fn require_ok(
    request: &HttpRequest,
    response: HttpResponse,
) -> Result<HttpResponse, AcceptanceError> {
    if response.status == 200 {
        Ok(response)
    } else {
        Err(AcceptanceError::rejected(
            request.method().as_str(),
            response.status,
            request.url(),
            "unexpected status",
        ))
    }
}

/// Default error handler: pause on 5xx, plain retry otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorHandler;

impl<T> ErrorHandler<T> for DefaultErrorHandler {
    fn handle(&self, _request: &HttpRequest, error: &TransportError) -> Recovery<T> {
        if error.is_server_error() {
            Recovery::Backoff
        } else {
            Recovery::Retry
        }
    }
}

/// HTTP client with bounded retry on top of a [`Transport`].
#[derive(Debug)]
pub struct RetryingClient {
    transport: Transport,
    retry: u32,
    server_error_pause: Duration,
}

impl RetryingClient {
    /// Creates a client making at most `retry + 1` attempts per request.
    #[must_use]
    pub fn new(transport: Transport, retry: u32, server_error_pause: Duration) -> Self {
        Self {
            transport,
            retry,
            server_error_pause,
        }
    }

    /// Returns the maximum number of attempts per request.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.retry.saturating_add(1)
    }

    /// Returns the pause applied after server errors.
    #[must_use]
    pub fn server_error_pause(&self) -> Duration {
        self.server_error_pause
    }

    /// Returns the cookie jar of the underlying transport.
    #[must_use]
    pub fn jar(&self) -> &Arc<Jar> {
        self.transport.jar()
    }

    /// Sends a request with retry, without session recovery.
    ///
    /// Returns `Ok(None)` when every attempt failed.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Protocol`] when the acceptor reports a fatal
    /// protocol violation.
    pub async fn request<A, H>(
        &mut self,
        request: &HttpRequest,
        acceptor: &A,
        handler: &H,
    ) -> Result<Option<A::Output>, FetchError>
    where
        A: ResponseAcceptor + Sync,
        A::Output: Send,
        H: ErrorHandler<A::Output> + Sync,
    {
        self.run(request, acceptor, handler, None).await
    }

    /// Sends a request with retry, invoking `recovery` after each rejected
    /// attempt that still has a successor.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Protocol`] on fatal protocol violations and any
    /// error raised by `recovery`.
    pub async fn request_with_recovery<A, H>(
        &mut self,
        request: &HttpRequest,
        acceptor: &A,
        handler: &H,
        recovery: &mut dyn SessionRecovery,
    ) -> Result<Option<A::Output>, FetchError>
    where
        A: ResponseAcceptor + Sync,
        A::Output: Send,
        H: ErrorHandler<A::Output> + Sync,
    {
        self.run(request, acceptor, handler, Some(recovery)).await
    }

    #[instrument(level = "debug", skip_all, fields(method = %request.method(), url = %request.url()))]
    async fn run<A, H>(
        &mut self,
        request: &HttpRequest,
        acceptor: &A,
        handler: &H,
        mut recovery: Option<&mut dyn SessionRecovery>,
    ) -> Result<Option<A::Output>, FetchError>
    where
        A: ResponseAcceptor + Sync,
        A::Output: Send,
        H: ErrorHandler<A::Output> + Sync,
    {
        let attempts = self.max_attempts();

        for attempt in 1..=attempts {
            let has_next = attempt < attempts;

            let response = match self.transport.execute(request).await {
                Ok(response) => response,
                Err(error) => {
                    match handler.handle(request, &error) {
                        Recovery::Substitute(value) => {
                            debug!(attempt, error = %error, "error handler substituted a result");
                            return Ok(Some(value));
                        }
                        Recovery::Retry => {
                            warn!(attempt, attempts, error = %error, "request failed");
                        }
                        Recovery::Backoff => {
                            warn!(attempt, attempts, error = %error, "server error");
                            if has_next {
                                self.pause_after_server_error().await;
                            }
                        }
                    }
                    continue;
                }
            };

            match acceptor.accept(request, response) {
                Ok(value) => return Ok(Some(value)),
                Err(AcceptanceError::Fatal(error)) => return Err(FetchError::Protocol(error)),
                Err(error @ AcceptanceError::Rejected { .. }) => {
                    warn!(attempt, attempts, error = %error, "response rejected");
                }
                Err(error @ AcceptanceError::ServerError { .. }) => {
                    warn!(attempt, attempts, error = %error, "response signalled a server error");
                    if has_next {
                        self.pause_after_server_error().await;
                    }
                }
            }

            if has_next && let Some(recovery) = recovery.as_deref_mut() {
                recovery.recover(self).await?;
            }
        }

        warn!(attempts, "all attempts failed");
        Ok(None)
    }

    async fn pause_after_server_error(&self) {
        if self.server_error_pause.is_zero() {
            return;
        }
        debug!(
            pause_secs = self.server_error_pause.as_secs(),
            "pausing after server error"
        );
        tokio::time::sleep(self.server_error_pause).await;
    }
}
