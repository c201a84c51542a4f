//! Video references and video metadata.
//!
//! Metadata normally comes from the watch page, which embeds it as
//! HTML-escaped JSON in the `data-api-data` attribute of
//! `div#js-initial-watch-data`. Private (403), deleted (404) and Flash-only
//! videos (no such `div`) fall back to the legacy `getflv` endpoint, whose
//! body is a query string.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::html;
use crate::http::{
    AcceptanceError, DefaultErrorHandler, ErrorHandler, HttpRequest, HttpResponse, Recovery,
    ResponseAcceptor, TransportError, require_ok,
};

/// `id` of the `div` carrying the watch data.
pub const WATCH_DATA_DIV_ID: &str = "js-initial-watch-data";

/// Attribute of that `div` holding the JSON document.
pub const WATCH_DATA_ATTRIBUTE: &str = "data-api-data";

#[allow(clippy::expect_used)]
static VIDEO_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(sm)?[0-9]+$").expect("video id regex is valid") // Static pattern, safe to panic
});

/// Returns true for ids like `sm9` or `1234567890`.
#[must_use]
pub fn is_valid_video_id(id: &str) -> bool {
    VIDEO_ID_PATTERN.is_match(id)
}

/// A video listed in `videos.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRef {
    /// Video id.
    pub id: String,
    /// Title from the video list, when one was given.
    pub known_title: Option<String>,
}

impl VideoRef {
    /// Creates a reference; an empty title counts as unknown.
    #[must_use]
    pub fn new(id: impl Into<String>, title: Option<String>) -> Self {
        Self {
            id: id.into(),
            known_title: title.filter(|t| !t.is_empty()),
        }
    }
}

/// Availability of a video as seen by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoAttribute {
    /// Regular public video.
    Normal,
    /// Watch page answered 403.
    Private,
    /// Watch page answered 404.
    Deleted,
    /// Watch page has no HTML5 watch data.
    FlashOnly,
}

impl VideoAttribute {
    /// Returns the label written to the comment CSV.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Private => "PRIVATE",
            Self::Deleted => "DELETED",
            Self::FlashOnly => "FLASH_ONLY",
        }
    }
}

impl fmt::Display for VideoAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata needed to query a video's comment thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    /// Id of the logged-in viewer.
    pub user_id: i64,
    /// Default comment thread.
    pub thread_id: String,
    /// Length in seconds.
    pub duration_secs: i64,
    /// Title; empty when obtained through the fallback endpoint.
    pub title: String,
    /// How the metadata was obtained.
    pub attribute: VideoAttribute,
}

/// Result of a lookup that can degrade to a fallback path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The primary lookup succeeded.
    Success(T),
    /// The primary lookup is not possible; use the fallback for this attribute.
    Fallback(VideoAttribute),
}

/// Extracts [`VideoInfo`] from a watch page.
///
/// Returns `Ok(None)` when the page has no watch data.
///
/// # Errors
///
/// Returns a diagnostic when the watch data is present but unusable.
pub fn parse_watch_page(page: &str) -> Result<Option<VideoInfo>, String> {
    let Some(raw) = html::div_attribute(page, WATCH_DATA_DIV_ID, WATCH_DATA_ATTRIBUTE) else {
        return Ok(None);
    };
    let data: Value =
        serde_json::from_str(&raw).map_err(|e| format!("watch data is not JSON: {e}"))?;

    let user_id = data
        .pointer("/viewer/id")
        .and_then(as_i64)
        .ok_or("watch data lacks viewer.id")?;
    let thread_id = data
        .pointer("/thread/ids/default")
        .and_then(as_string)
        .ok_or("watch data lacks thread.ids.default")?;
    let duration_secs = data
        .pointer("/video/duration")
        .and_then(as_i64)
        .ok_or("watch data lacks video.duration")?;
    let title = data
        .pointer("/video/title")
        .and_then(Value::as_str)
        .ok_or("watch data lacks video.title")?
        .to_string();

    Ok(Some(VideoInfo {
        user_id,
        thread_id,
        duration_secs,
        title,
        attribute: VideoAttribute::Normal,
    }))
}

/// Extracts [`VideoInfo`] from a `getflv` query-string body.
///
/// # Errors
///
/// Returns a diagnostic when `user_id`, `thread_id` or `l` is missing or invalid.
pub fn parse_getflv(body: &str, attribute: VideoAttribute) -> Result<VideoInfo, String> {
    let mut user_id = None;
    let mut thread_id = None;
    let mut duration = None;
    for (key, value) in url::form_urlencoded::parse(body.trim().as_bytes()) {
        match key.as_ref() {
            "user_id" if user_id.is_none() => user_id = Some(value.into_owned()),
            "thread_id" if thread_id.is_none() => thread_id = Some(value.into_owned()),
            "l" if duration.is_none() => duration = Some(value.into_owned()),
            _ => {}
        }
    }

    let user_id = user_id
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or("getflv lacks a numeric user_id")?;
    let thread_id = thread_id
        .filter(|v| !v.is_empty())
        .ok_or("getflv lacks thread_id")?;
    let duration_secs = duration
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or("getflv lacks a numeric l")?;

    Ok(VideoInfo {
        user_id,
        thread_id,
        duration_secs,
        title: String::new(),
        attribute,
    })
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Builds the watch page request for a video.
#[must_use]
pub fn watch_request(url: impl Into<String>) -> HttpRequest {
    HttpRequest::get(url)
}

/// Accepts a watch page, degrading to `Fallback(FlashOnly)` without watch data.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchPageAcceptor;

impl ResponseAcceptor for WatchPageAcceptor {
    type Output = Outcome<VideoInfo>;

    fn accept(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<Outcome<VideoInfo>, AcceptanceError> {
        let response = require_ok(request, response)?;
        match parse_watch_page(&response.body) {
            Ok(Some(info)) => Ok(Outcome::Success(info)),
            Ok(None) => {
                debug!(url = %request.url(), "no watch data on page");
                Ok(Outcome::Fallback(VideoAttribute::FlashOnly))
            }
            Err(reason) => Err(AcceptanceError::rejected(
                request.method().as_str(),
                response.status,
                request.url(),
                reason,
            )),
        }
    }
}

/// Maps 403 and 404 on the watch page to fallbacks; other errors as default.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchPageErrorHandler;

impl ErrorHandler<Outcome<VideoInfo>> for WatchPageErrorHandler {
    fn handle(&self, request: &HttpRequest, error: &TransportError) -> Recovery<Outcome<VideoInfo>> {
        match error.http_status() {
            Some(403) => {
                debug!(url = %request.url(), "video is private");
                Recovery::Substitute(Outcome::Fallback(VideoAttribute::Private))
            }
            Some(404) => {
                debug!(url = %request.url(), "video is deleted");
                Recovery::Substitute(Outcome::Fallback(VideoAttribute::Deleted))
            }
            _ => DefaultErrorHandler.handle(request, error),
        }
    }
}

/// Accepts a `getflv` body, tagging the result with the fallback attribute.
#[derive(Debug, Clone, Copy)]
pub struct GetFlvAcceptor {
    attribute: VideoAttribute,
}

impl GetFlvAcceptor {
    /// Creates an acceptor for the given fallback attribute.
    #[must_use]
    pub fn new(attribute: VideoAttribute) -> Self {
        Self { attribute }
    }
}

impl ResponseAcceptor for GetFlvAcceptor {
    type Output = VideoInfo;

    fn accept(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<VideoInfo, AcceptanceError> {
        let response = require_ok(request, response)?;
        parse_getflv(&response.body, self.attribute).map_err(|reason| {
            AcceptanceError::rejected(
                request.method().as_str(),
                response.status,
                request.url(),
                reason,
            )
        })
    }
}
