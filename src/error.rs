//! Run-level error types shared by the session, fetch and output layers.
//!
//! Every variant of [`FetchError`] is fatal for the run: callers propagate it
//! to the entry point, which logs it and exits with a failure status.

use thiserror::Error;

use crate::http::TransportError;
use crate::output::OutputError;

/// The service sent something the protocol does not allow.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A `thread` record carried a non-zero result code.
    #[error("comment server rejected the thread query for {thread_id} (resultcode={code})")]
    ResultCode {
        /// Thread that was queried.
        thread_id: String,
        /// The result code reported by the service.
        code: i64,
    },

    /// A payload could not be parsed into the expected structure.
    #[error("malformed {what}: {reason}")]
    Malformed {
        /// Which payload was being parsed.
        what: &'static str,
        /// Parser diagnostic.
        reason: String,
    },

    /// Consecutive comment windows failed to move the watermark.
    #[error("comment pagination for thread {thread_id} stalled for {windows} consecutive windows")]
    NoProgress {
        /// Thread being paginated.
        thread_id: String,
        /// Number of consecutive windows without progress.
        windows: u32,
    },
}

impl ProtocolError {
    /// Creates a malformed-payload error.
    pub fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            reason: reason.into(),
        }
    }
}

/// Fatal errors that abort a run.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be set up.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Login did not produce both session cookies.
    #[error("login failed: {reason}")]
    LoginFailed {
        /// What went wrong.
        reason: String,
    },

    /// Every attempt for a required resource failed.
    #[error("failed to obtain {what} after all retry attempts")]
    Exhausted {
        /// The resource that could not be fetched.
        what: String,
    },

    /// The service violated the protocol.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Writing or finalizing an output file failed.
    #[error(transparent)]
    Output(#[from] OutputError),
}

impl FetchError {
    /// Creates a login failure.
    pub fn login_failed(reason: impl Into<String>) -> Self {
        Self::LoginFailed {
            reason: reason.into(),
        }
    }

    /// Creates an exhausted-retries failure.
    pub fn exhausted(what: impl Into<String>) -> Self {
        Self::Exhausted { what: what.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_code_display_names_thread_and_code() {
        let error = ProtocolError::ResultCode {
            thread_id: "1234".to_string(),
            code: 9,
        };
        let msg = error.to_string();
        assert!(msg.contains("1234"));
        assert!(msg.contains("resultcode=9"));
    }

    #[test]
    fn test_exhausted_display_names_resource() {
        let error = FetchError::exhausted("waybackkey for thread 1234");
        assert_eq!(
            error.to_string(),
            "failed to obtain waybackkey for thread 1234 after all retry attempts"
        );
    }

    #[test]
    fn test_protocol_error_converts_into_fetch_error() {
        let error: FetchError = ProtocolError::malformed("comment window", "eof").into();
        assert!(matches!(error, FetchError::Protocol(ProtocolError::Malformed { .. })));
        assert_eq!(error.to_string(), "malformed comment window: eof");
    }
}
