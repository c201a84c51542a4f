//! Mylist pages, used to generate the video list.
//!
//! A mylist page embeds its items in a script line of the form
//! `Mylist.preload(<id>, [...]);`. Only video items (`item_type == 0`) are
//! listed.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::http::{AcceptanceError, HttpRequest, HttpResponse, ResponseAcceptor, require_ok};

#[allow(clippy::expect_used)]
static PRELOAD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*Mylist\.preload\([0-9]+, (\[.*\])\);\r?$").expect("mylist regex is valid") // Static pattern, safe to panic
});

/// One video of a mylist, as written to `videos.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MylistVideo {
    /// Video id.
    pub video_id: String,
    /// Video title.
    pub title: String,
    /// View count.
    pub view_count: String,
    /// Comment count.
    pub comment_count: String,
    /// Mylist count.
    pub mylist_count: String,
    /// Deleted flag as reported by the service.
    pub deleted: String,
}

#[derive(Debug, Deserialize)]
struct Item {
    item_type: Value,
    #[serde(default)]
    item_data: ItemData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ItemData {
    video_id: Value,
    title: Value,
    view_counter: Value,
    num_res: Value,
    mylist_counter: Value,
    deleted: Value,
}

/// Extracts the video items of a mylist page.
///
/// # Errors
///
/// Returns a diagnostic when the preload line is absent or not valid JSON.
pub fn parse_mylist_page(page: &str) -> Result<Vec<MylistVideo>, String> {
    let captures = PRELOAD_PATTERN
        .captures(page)
        .ok_or("mylist page has no preload data")?;
    let items: Vec<Item> = serde_json::from_str(&captures[1])
        .map_err(|e| format!("mylist preload data is not valid: {e}"))?;

    Ok(items
        .into_iter()
        .filter(|item| is_video(&item.item_type))
        .map(|item| MylistVideo {
            video_id: cell(&item.item_data.video_id),
            title: cell(&item.item_data.title),
            view_count: cell(&item.item_data.view_counter),
            comment_count: cell(&item.item_data.num_res),
            mylist_count: cell(&item.item_data.mylist_counter),
            deleted: cell(&item.item_data.deleted),
        })
        .collect())
}

fn is_video(item_type: &Value) -> bool {
    match item_type {
        Value::Number(n) => n.as_i64() == Some(0),
        Value::String(s) => s == "0",
        _ => false,
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Builds the anonymous mylist page request.
#[must_use]
pub fn mylist_request(url: impl Into<String>) -> HttpRequest {
    HttpRequest::get(url).without_cookies()
}

/// Accepts a mylist page; an unparsable page is a rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct MylistAcceptor;

impl ResponseAcceptor for MylistAcceptor {
    type Output = Vec<MylistVideo>;

    fn accept(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<Vec<MylistVideo>, AcceptanceError> {
        let response = require_ok(request, response)?;
        parse_mylist_page(&response.body).map_err(|reason| {
            AcceptanceError::rejected(
                request.method().as_str(),
                response.status,
                request.url(),
                reason,
            )
        })
    }
}
