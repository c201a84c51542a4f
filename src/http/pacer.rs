//! Minimum spacing between consecutive requests.
//!
//! The service is rate limited per session, so every exchange made by one
//! [`Transport`](super::Transport) shares a single [`Pacer`]. The pacer waits
//! before a request until `interval` has elapsed since the previous request
//! *finished*, and the transport records the finish time after every attempt,
//! failed or not.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use nicocc_core::http::Pacer;
//!
//! # async fn example() {
//! let mut pacer = Pacer::new(Duration::from_millis(1000));
//!
//! // First request proceeds immediately
//! pacer.wait().await;
//! pacer.mark();
//!
//! // Second request waits until a second has passed since `mark`
//! pacer.wait().await;
//! # }
//! ```

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Warning threshold for cumulative pacing delay (30 seconds).
const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(30);

/// Single-slot request pacer.
///
/// Owned exclusively by the transport; the sequential execution model means
/// no locking is needed around `last_access`.
#[derive(Debug)]
pub struct Pacer {
    /// Minimum time between the end of one request and the start of the next.
    interval: Duration,

    /// When the previous request finished. `None` before the first request.
    last_access: Option<Instant>,

    /// Total time spent waiting, used to warn about slow runs.
    cumulative_delay: Duration,

    /// Whether the warning has already been emitted.
    warned: bool,
}

impl Pacer {
    /// Creates a pacer with the given minimum interval.
    #[must_use]
    #[instrument(skip_all, fields(interval_ms = interval.as_millis()))]
    pub fn new(interval: Duration) -> Self {
        debug!("creating request pacer");
        Self {
            interval,
            last_access: None,
            cumulative_delay: Duration::ZERO,
            warned: false,
        }
    }

    /// Returns the time left before the next request may start.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        match self.last_access {
            Some(last) => self.interval.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Waits until the minimum interval since the last request has passed.
    ///
    /// The first request proceeds immediately.
    pub async fn wait(&mut self) {
        let delay = self.remaining();
        if delay.is_zero() {
            return;
        }

        self.cumulative_delay += delay;
        debug!(
            delay_ms = delay.as_millis(),
            cumulative_ms = self.cumulative_delay.as_millis(),
            "pacing request"
        );
        if !self.warned && self.cumulative_delay >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
            self.warned = true;
            warn!(
                cumulative_delay_secs = self.cumulative_delay.as_secs(),
                "request pacing has delayed this run noticeably"
            );
        }

        tokio::time::sleep(delay).await;
    }

    /// Records that a request attempt just finished.
    pub fn mark(&mut self) {
        self.last_access = Some(Instant::now());
    }
}
