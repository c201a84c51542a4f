//! Comment thread queries against the `api.json` comment server.
//!
//! A query is a JSON array of packets: two opening pings, one `thread`
//! packet, two closing pings. The answer is a JSON array of heterogeneous
//! packets; only `thread` (status) and `chat` (comment) packets matter.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, trace};

use crate::error::ProtocolError;
use crate::http::{AcceptanceError, HttpRequest, HttpResponse, ResponseAcceptor, require_ok};

/// Protocol version sent with every thread query.
pub const THREAD_VERSION: &str = "20090904";

/// Number of comments requested per window (counted backwards from `when`).
pub const RES_FROM: i64 = -1000;

/// One comment as stored in the per-video output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    /// Comment number within the thread.
    pub sequence_no: i64,
    /// Poster id; empty when the server omits it.
    pub user_id: String,
    /// Posted by a premium member.
    pub is_premium: bool,
    /// Posted anonymously (`184`).
    pub is_anonymous: bool,
    /// Removed by the uploader or moderators.
    pub is_deleted: bool,
    /// Playback position in 1/100 s.
    pub vpos: i64,
    /// NG score.
    pub score: i64,
    /// Command string (`mail` on the wire).
    pub command: String,
    /// Comment text.
    pub body: String,
    /// Posting time, unix seconds.
    pub posted_at: i64,
}

/// Parameters of one thread query.
#[derive(Debug, Clone)]
pub struct ThreadQuery<'a> {
    /// Comment thread id.
    pub thread_id: &'a str,
    /// Viewer id from the video metadata.
    pub user_id: i64,
    /// Challenge token for this thread.
    pub waybackkey: &'a str,
    /// Exclusive upper bound on posting time.
    pub when: i64,
}

impl ThreadQuery<'_> {
    /// Serializes the packet array.
    #[must_use]
    pub fn to_json(&self) -> String {
        json!([
            {"ping": {"content": "rs:1"}},
            {"ping": {"content": "ps:11"}},
            {"thread": {
                "fork": 0,
                "nicoru": 0,
                "res_from": RES_FROM,
                "scores": 1,
                "thread": self.thread_id,
                "user_id": self.user_id.to_string(),
                "version": THREAD_VERSION,
                "waybackkey": self.waybackkey,
                "when": self.when,
                "with_global": 1,
            }},
            {"ping": {"content": "pf:11"}},
            {"ping": {"content": "rf:1"}},
        ])
        .to_string()
    }

    /// Builds the POST request to `api_json_url`.
    #[must_use]
    pub fn request(&self, api_json_url: &str) -> HttpRequest {
        HttpRequest::post_json(api_json_url, self.to_json())
    }
}

#[derive(Debug, Deserialize)]
struct Packet {
    chat: Option<WireChat>,
    thread: Option<WireThread>,
}

#[derive(Debug, Deserialize)]
struct WireThread {
    #[serde(default)]
    resultcode: i64,
}

#[derive(Debug, Deserialize)]
struct WireChat {
    no: i64,
    date: i64,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    premium: i64,
    #[serde(default)]
    anonymity: i64,
    #[serde(default)]
    deleted: i64,
    #[serde(default)]
    vpos: i64,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    mail: String,
    #[serde(default)]
    content: String,
}

impl From<WireChat> for CommentRecord {
    fn from(chat: WireChat) -> Self {
        Self {
            sequence_no: chat.no,
            user_id: chat.user_id,
            is_premium: chat.premium != 0,
            is_anonymous: chat.anonymity != 0,
            is_deleted: chat.deleted != 0,
            vpos: chat.vpos,
            score: chat.score,
            command: chat.mail,
            body: chat.content,
            posted_at: chat.date,
        }
    }
}

/// Comments of one window after filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowBatch {
    /// Number of `chat` packets the server returned.
    pub received: usize,
    /// Comments inside the collection period and below the sequence bound,
    /// in server order.
    pub kept: Vec<CommentRecord>,
    /// Dropped because they were posted before the period start.
    pub before_start: usize,
    /// Dropped because they were posted after the period end.
    pub after_end: usize,
    /// Dropped because their number is not below the sequence bound.
    pub above_bound: usize,
}

/// Where a comment falls relative to a [`WindowFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Belongs in the output.
    Keep,
    /// Posted before the period start.
    BeforeStart,
    /// Posted after the period end.
    AfterEnd,
    /// Inside the period but already covered by an earlier window.
    AboveBound,
}

/// Filter applied to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFilter {
    /// Inclusive start of the collection period.
    pub start: i64,
    /// Inclusive end of the collection period.
    pub end: i64,
    /// Only comments numbered strictly below this are kept.
    pub below_sequence: Option<i64>,
}

impl WindowFilter {
    /// Classifies `record`. Posting time is checked before the sequence bound.
    #[must_use]
    pub fn place(&self, record: &CommentRecord) -> Placement {
        if record.posted_at < self.start {
            Placement::BeforeStart
        } else if record.posted_at > self.end {
            Placement::AfterEnd
        } else if self
            .below_sequence
            .is_some_and(|bound| record.sequence_no >= bound)
        {
            Placement::AboveBound
        } else {
            Placement::Keep
        }
    }
}

/// Parses a window response.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] when the body is not a JSON array of
/// packets and [`ProtocolError::ResultCode`] when the `thread` packet reports
/// a failure.
pub fn parse_window(
    body: &str,
    thread_id: &str,
    filter: WindowFilter,
) -> Result<WindowBatch, ProtocolError> {
    let packets: Vec<Packet> = serde_json::from_str(body)
        .map_err(|e| ProtocolError::malformed("comment window", e.to_string()))?;

    let mut batch = WindowBatch::default();
    for packet in packets {
        if let Some(thread) = packet.thread
            && thread.resultcode != 0
        {
            return Err(ProtocolError::ResultCode {
                thread_id: thread_id.to_string(),
                code: thread.resultcode,
            });
        }
        if let Some(chat) = packet.chat {
            batch.received += 1;
            let record = CommentRecord::from(chat);
            let placement = filter.place(&record);
            match placement {
                Placement::Keep => {
                    batch.kept.push(record);
                    continue;
                }
                Placement::BeforeStart => batch.before_start += 1,
                Placement::AfterEnd => batch.after_end += 1,
                Placement::AboveBound => batch.above_bound += 1,
            }
            trace!(
                no = record.sequence_no,
                date = record.posted_at,
                ?placement,
                "comment dropped"
            );
        }
    }
    Ok(batch)
}

/// Accepts a window response.
///
/// Non-200 answers are rejections (the session may have expired); anything
/// wrong with a 200 body is fatal.
#[derive(Debug, Clone)]
pub struct WindowAcceptor {
    thread_id: String,
    filter: WindowFilter,
}

impl WindowAcceptor {
    /// Creates an acceptor for one window of `thread_id`.
    #[must_use]
    pub fn new(thread_id: impl Into<String>, filter: WindowFilter) -> Self {
        Self {
            thread_id: thread_id.into(),
            filter,
        }
    }
}

impl ResponseAcceptor for WindowAcceptor {
    type Output = WindowBatch;

    fn accept(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<WindowBatch, AcceptanceError> {
        let response = require_ok(request, response)?;
        let batch = parse_window(&response.body, &self.thread_id, self.filter)?;
        debug!(
            thread_id = %self.thread_id,
            received = batch.received,
            kept = batch.kept.len(),
            before_start = batch.before_start,
            after_end = batch.after_end,
            above_bound = batch.above_bound,
            "comment window"
        );
        Ok(batch)
    }
}
