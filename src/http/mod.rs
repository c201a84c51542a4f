//! Session-aware HTTP client with request pacing and bounded retry.
//!
//! The layer is split in two:
//!
//! - [`Transport`] performs one exchange: it owns the cookie jar, applies the
//!   User-Agent and enforces the minimum interval between requests.
//! - [`RetryingClient`] repeats an exchange up to `retry + 1` times, asking a
//!   [`ResponseAcceptor`] whether each response is usable and an
//!   [`ErrorHandler`] how to react to transport failures. Authenticated calls
//!   pass a [`SessionRecovery`] that logs in again after a rejection.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use nicocc_core::http::{AcceptOk, DefaultErrorHandler, HttpRequest, RetryingClient, Transport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Transport::new(Duration::from_millis(1000))?;
//! let mut client = RetryingClient::new(transport, 2, Duration::from_secs(30));
//! let request = HttpRequest::get("https://www.nicovideo.jp/watch/sm9");
//! if let Some(response) = client.request(&request, &AcceptOk, &DefaultErrorHandler).await? {
//!     println!("{} bytes", response.body.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cookies;
mod error;
pub mod pacer;
mod request;
mod retry;
mod transport;

pub use cookies::{CookieScope, find_cookie, remove_cookie};
pub use error::{AcceptanceError, TransportError};
pub use pacer::Pacer;
pub use request::{HttpRequest, HttpResponse, RequestBody};
pub use retry::{
    AcceptOk, DEFAULT_RETRY, DEFAULT_SERVER_ERROR_PAUSE, DefaultErrorHandler, ErrorHandler,
    Recovery, ResponseAcceptor, RetryingClient, SessionRecovery, require_ok,
};
pub use transport::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, Transport};
