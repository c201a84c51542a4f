//! Error types for the HTTP layer.
//!
//! [`TransportError`] describes a single failed exchange; [`AcceptanceError`]
//! describes why a completed exchange was not accepted by the caller's
//! [`ResponseAcceptor`](super::ResponseAcceptor).

use thiserror::Error;

use crate::error::ProtocolError;

/// Errors raised by a single HTTP exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} requesting {url}")]
    Status {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl TransportError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns the HTTP status carried by this error, if any.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for 5xx responses.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.http_status().is_some_and(|status| status / 100 == 5)
    }
}

/// Reasons a completed exchange was not accepted.
#[derive(Debug, Error)]
pub enum AcceptanceError {
    /// The response was rejected (non-200 status or an unusable payload).
    ///
    /// During authenticated calls this is read as an expired session.
    #[error("{method} ({status}) - {url}: {reason}")]
    Rejected {
        /// HTTP method of the request.
        method: String,
        /// The response status code.
        status: u16,
        /// The request URL.
        url: String,
        /// Why the response was rejected.
        reason: String,
    },

    /// The service answered but signalled a server-side failure.
    #[error("server error from {url}: {reason}")]
    ServerError {
        /// The request URL.
        url: String,
        /// What was missing or wrong.
        reason: String,
    },

    /// The payload violates the protocol; the run cannot continue.
    #[error(transparent)]
    Fatal(#[from] ProtocolError),
}

impl AcceptanceError {
    /// Creates a rejection error.
    pub fn rejected(
        method: impl Into<String>,
        status: u16,
        url: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            method: method.into(),
            status,
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a server error.
    pub fn server_error(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ServerError {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
