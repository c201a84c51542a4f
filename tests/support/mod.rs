//! Shared fixtures: a mock niconico built on wiremock.
//!
//! Every endpoint lives on one mock server; [`Endpoints::with_base`] points
//! the client at it.

#![allow(dead_code)]

pub mod socket_guard;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use nicocc_core::http::{RetryingClient, Transport};
use nicocc_core::nico::Endpoints;
use nicocc_core::session::{Credentials, SessionManager};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const MAIL: &str = "viewer@example.com";
pub const PASSWORD: &str = "correct horse";
pub const VIEWER_ID: i64 = 4242;

/// Client without pacing or server-error pauses.
pub fn client(retry: u32) -> RetryingClient {
    let transport = Transport::new(Duration::ZERO).expect("transport builds");
    RetryingClient::new(transport, retry, Duration::ZERO)
}

/// Session manager sharing `client`'s cookie jar.
pub fn session(server: &MockServer, client: &RetryingClient) -> SessionManager {
    let endpoints = Endpoints::with_base(&server.uri());
    SessionManager::new(
        Credentials::new(MAIL, PASSWORD),
        endpoints.login.clone(),
        endpoints.cookie_scope().expect("mock base is a URL"),
        Arc::clone(client.jar()),
    )
}

/// Login answering with both session cookies.
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/secure/login"))
        .and(query_param("site", "niconico"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "user_session=user_session_4242_abc; Path=/")
                .append_header("set-cookie", "user_session_secure=sec_xyz; Path=/"),
        )
        .mount(server)
        .await;
}

/// Watch page carrying the HTML5 watch data.
pub fn watch_page(thread_id: &str, title: &str) -> String {
    let data = json!({
        "viewer": {"id": VIEWER_ID},
        "thread": {"ids": {"default": thread_id}},
        "video": {"duration": 319, "title": title},
    })
    .to_string()
    .replace('&', "&amp;")
    .replace('"', "&quot;");
    format!(
        r#"<html><body><div id="js-initial-watch-data" data-api-data="{data}" data-environment="{{}}"></div></body></html>"#
    )
}

pub async fn mount_watch_page(server: &MockServer, video_id: &str, thread_id: &str, title: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/watch/{video_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(watch_page(thread_id, title)))
        .mount(server)
        .await;
}

pub async fn mount_waybackkey(server: &MockServer, thread_id: &str) {
    Mock::given(method("GET"))
        .and(path("/api/getwaybackkey"))
        .and(query_param("thread", thread_id))
        .respond_with(ResponseTemplate::new(200).set_body_string("waybackkey=1516000000.key"))
        .mount(server)
        .await;
}

/// One comment on the mock thread.
#[derive(Debug, Clone)]
pub struct Chat {
    pub no: i64,
    pub date: i64,
    pub user_id: String,
    pub premium: bool,
    pub anonymous: bool,
}

impl Chat {
    pub fn new(no: i64, date: i64, user_id: &str) -> Self {
        Self {
            no,
            date,
            user_id: user_id.to_string(),
            premium: false,
            anonymous: false,
        }
    }

    pub fn premium(mut self) -> Self {
        self.premium = true;
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    fn to_packet(&self) -> Value {
        json!({"chat": {
            "thread": "1",
            "no": self.no,
            "vpos": self.no * 100,
            "date": self.date,
            "user_id": self.user_id,
            "premium": i64::from(self.premium),
            "anonymity": i64::from(self.anonymous),
            "mail": "184",
            "content": format!("comment {}", self.no),
        }})
    }
}

/// Comment server answering like `api.json`: the newest `page_size`
/// comments posted strictly before `when`, oldest first.
#[derive(Debug, Clone)]
pub struct ThreadServer {
    pub chats: Vec<Chat>,
    pub page_size: usize,
    pub resultcode: i64,
}

impl ThreadServer {
    pub fn new(chats: Vec<Chat>, page_size: usize) -> Self {
        Self {
            chats,
            page_size,
            resultcode: 0,
        }
    }
}

impl Respond for ThreadServer {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let query: Value = serde_json::from_slice(&request.body).expect("query is JSON");
        let when = query
            .pointer("/2/thread/when")
            .and_then(Value::as_i64)
            .expect("query has thread.when");

        let mut before: Vec<&Chat> = self.chats.iter().filter(|c| c.date < when).collect();
        before.sort_by_key(|c| c.no);
        let page = &before[before.len().saturating_sub(self.page_size)..];

        let mut packets = vec![json!({"thread": {"resultcode": self.resultcode, "thread": "1"}})];
        packets.extend(page.iter().map(|c| c.to_packet()));
        ResponseTemplate::new(200).set_body_string(Value::Array(packets).to_string())
    }
}

pub async fn mount_thread(server: &MockServer, thread: ThreadServer) {
    Mock::given(method("POST"))
        .and(path("/api.json/"))
        .respond_with(thread)
        .mount(server)
        .await;
}

/// Minimal working directory configuration.
///
/// Files are UTF-8 unless `extra_counter` sets `encoding`.
pub fn config_toml(start: &str, end: &str, extra_counter: &str) -> String {
    let encoding = if extra_counter.contains("encoding") {
        ""
    } else {
        "encoding = \"utf-8\""
    };
    format!(
        r#"
[user]
mail = "{MAIL}"
password = "{PASSWORD}"

[counter]
start = "{start}"
end = "{end}"
{encoding}
{extra_counter}

[http]
interval = 0
server_error_interval = 0
retry = 1
"#
    )
}

pub fn write_config(dir: &Path, toml: &str) {
    std::fs::write(dir.join("nicocc.toml"), toml).expect("write config");
}
