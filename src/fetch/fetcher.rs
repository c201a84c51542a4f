//! Per-video comment collection state machine.
//!
//! ```text
//! NeedInfo ──► NeedChallenge ──► Fetching ──┐
//!                                   ▲       │ next window
//!                                   └───────┤
//!                                           ▼
//!                                          Done
//! ```
//!
//! - **NeedInfo** loads the watch page. 403, 404 and pages without watch data
//!   switch to the `getflv` fallback, which is then the only source used.
//! - **NeedChallenge** obtains a fresh `waybackkey` for the thread.
//! - **Fetching** requests comment windows backwards in time until the
//!   server returns nothing, a window reaches back before the period start,
//!   or comment number 1 is reached. Windows that only repeat comments
//!   already collected end in [`ProtocolError::NoProgress`].
//!
//! Every request runs with session recovery: a rejected response triggers a
//! new login before the next attempt.

use tracing::{debug, info, instrument, warn};

use super::window::{Finish, PaginationWindow, Step};
use crate::error::{FetchError, ProtocolError};
use crate::http::{DefaultErrorHandler, HttpRequest, RetryingClient};
use crate::nico::{
    CommentRecord, Endpoints, GetFlvAcceptor, Outcome, ThreadQuery, VideoAttribute, VideoInfo,
    WatchPageAcceptor, WatchPageErrorHandler, WaybackKeyAcceptor, WindowAcceptor, watch_request,
};
use crate::session::SessionManager;

/// Inclusive collection period in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionPeriod {
    /// First second of the period.
    pub start: i64,
    /// Last second of the period.
    pub end: i64,
}

/// Everything collected for one video.
#[derive(Debug, Clone)]
pub struct VideoComments {
    /// Metadata used for the thread queries.
    pub info: VideoInfo,
    /// Unique comments in ascending comment-number order.
    pub comments: Vec<CommentRecord>,
    /// Number of windows requested.
    pub windows: u32,
}

/// Pagination progress of one thread.
#[derive(Debug)]
struct Pagination {
    info: VideoInfo,
    waybackkey: String,
    window: PaginationWindow,
    comments: Vec<CommentRecord>,
    windows: u32,
}

impl Pagination {
    fn new(info: VideoInfo, waybackkey: String, period: CollectionPeriod) -> Self {
        Self {
            info,
            waybackkey,
            window: PaginationWindow::new(period.end),
            comments: Vec::new(),
            windows: 0,
        }
    }

    fn finish(mut self) -> VideoComments {
        self.comments.sort_by_key(|c| c.sequence_no);
        self.comments.dedup_by_key(|c| c.sequence_no);
        VideoComments {
            info: self.info,
            comments: self.comments,
            windows: self.windows,
        }
    }
}

#[derive(Debug)]
enum State {
    NeedInfo,
    NeedChallenge(VideoInfo),
    Fetching(Pagination),
    Done(VideoComments),
}

/// Drives the collection protocol for one video at a time.
pub struct CommentFetcher<'a> {
    client: &'a mut RetryingClient,
    session: &'a mut SessionManager,
    endpoints: &'a Endpoints,
    period: CollectionPeriod,
}

impl<'a> CommentFetcher<'a> {
    /// Creates a fetcher sharing the run's client and session.
    pub fn new(
        client: &'a mut RetryingClient,
        session: &'a mut SessionManager,
        endpoints: &'a Endpoints,
        period: CollectionPeriod,
    ) -> Self {
        Self {
            client,
            session,
            endpoints,
            period,
        }
    }

    /// Collects the comments of `video_id` posted within the period.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when login fails, the video metadata or
    /// challenge token cannot be obtained, a window is exhausted, or the
    /// comment server violates the protocol.
    #[instrument(skip(self), fields(start = self.period.start, end = self.period.end))]
    pub async fn fetch(&mut self, video_id: &str) -> Result<VideoComments, FetchError> {
        if !self.session.is_authenticated() {
            self.session.login(self.client).await?;
        }

        let mut state = State::NeedInfo;
        loop {
            state = match state {
                State::NeedInfo => State::NeedChallenge(self.video_info(video_id).await?),
                State::NeedChallenge(info) => {
                    let waybackkey = self.waybackkey(&info.thread_id).await?;
                    State::Fetching(Pagination::new(info, waybackkey, self.period))
                }
                State::Fetching(mut pagination) => match self.next_window(&mut pagination).await? {
                    Step::Continue => State::Fetching(pagination),
                    Step::Done(finish) => {
                        debug!(?finish, windows = pagination.windows, "pagination finished");
                        State::Done(pagination.finish())
                    }
                    Step::Stalled(windows) => {
                        return Err(ProtocolError::NoProgress {
                            thread_id: pagination.info.thread_id,
                            windows,
                        }
                        .into());
                    }
                },
                State::Done(result) => {
                    info!(
                        video_id,
                        comments = result.comments.len(),
                        windows = result.windows,
                        attribute = %result.info.attribute,
                        "comments collected"
                    );
                    return Ok(result);
                }
            };
        }
    }

    async fn video_info(&mut self, video_id: &str) -> Result<VideoInfo, FetchError> {
        let request = watch_request(self.endpoints.watch_url(video_id));
        let outcome = self
            .client
            .request_with_recovery(
                &request,
                &WatchPageAcceptor,
                &WatchPageErrorHandler,
                &mut *self.session,
            )
            .await?
            .ok_or_else(|| FetchError::exhausted(format!("video info for {video_id}")))?;

        let info = match outcome {
            Outcome::Success(info) => info,
            Outcome::Fallback(attribute) => self.fallback_info(video_id, attribute).await?,
        };
        debug!(
            video_id,
            thread_id = %info.thread_id,
            user_id = info.user_id,
            duration_secs = info.duration_secs,
            attribute = %info.attribute,
            "video info"
        );
        Ok(info)
    }

    async fn fallback_info(
        &mut self,
        video_id: &str,
        attribute: VideoAttribute,
    ) -> Result<VideoInfo, FetchError> {
        debug!(video_id, %attribute, "using getflv fallback");
        let request = HttpRequest::get(self.endpoints.getflv_url(video_id));
        self.client
            .request_with_recovery(
                &request,
                &GetFlvAcceptor::new(attribute),
                &DefaultErrorHandler,
                &mut *self.session,
            )
            .await?
            .ok_or_else(|| FetchError::exhausted(format!("getflv video info for {video_id}")))
    }

    async fn waybackkey(&mut self, thread_id: &str) -> Result<String, FetchError> {
        let request = HttpRequest::get(self.endpoints.waybackkey_url(thread_id));
        let key = self
            .client
            .request_with_recovery(
                &request,
                &WaybackKeyAcceptor,
                &DefaultErrorHandler,
                &mut *self.session,
            )
            .await?
            .ok_or_else(|| FetchError::exhausted(format!("waybackkey for thread {thread_id}")))?;
        debug!(thread_id, "waybackkey obtained");
        Ok(key)
    }

    async fn next_window(&mut self, pagination: &mut Pagination) -> Result<Step, FetchError> {
        let window = pagination.window;
        let query = ThreadQuery {
            thread_id: &pagination.info.thread_id,
            user_id: pagination.info.user_id,
            waybackkey: &pagination.waybackkey,
            when: window.when(),
        };
        let request = query.request(&self.endpoints.api_json);
        let acceptor = WindowAcceptor::new(
            pagination.info.thread_id.clone(),
            window.filter(self.period.start, self.period.end),
        );

        let batch = self
            .client
            .request_with_recovery(&request, &acceptor, &DefaultErrorHandler, &mut *self.session)
            .await?
            .ok_or_else(|| {
                FetchError::exhausted(format!(
                    "comment window of thread {} (when={})",
                    pagination.info.thread_id,
                    window.when()
                ))
            })?;
        pagination.windows += 1;

        let step = pagination.window.advance(&batch);
        match step {
            Step::Done(Finish::EmptyBatch) => {
                debug!(when = window.when(), "comment server returned no comments");
            }
            Step::Done(Finish::ReachedStart) => {
                debug!(
                    when = window.when(),
                    before_start = batch.before_start,
                    "window reached the start of the collection period"
                );
            }
            Step::Continue if batch.kept.is_empty() => {
                warn!(
                    when = window.when(),
                    received = batch.received,
                    above_bound = batch.above_bound,
                    after_end = batch.after_end,
                    "comment window kept nothing, retrying"
                );
            }
            Step::Stalled(windows) => {
                warn!(windows, when = window.when(), "comment window did not move the cursor");
            }
            Step::Continue | Step::Done(Finish::FirstComment) => {}
        }

        pagination.comments.extend(batch.kept);
        Ok(step)
    }
}
