//! URLs of the niconico endpoints used by nicocc.

use url::Url;

use crate::http::CookieScope;

/// Base URLs of every endpoint, overridable for tests.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Login form target.
    pub login: String,
    /// Comment server JSON endpoint.
    pub api_json: String,
    /// Watch page prefix; the video id is appended.
    pub watch: String,
    /// `getwaybackkey` endpoint; `?thread=<id>` is appended.
    pub waybackkey: String,
    /// Mylist page prefix; the mylist id is appended.
    pub mylist: String,
    /// Legacy `getflv` prefix; the video id is appended.
    pub getflv: String,
    /// URL the session cookies are read for.
    pub cookie_url: String,
    /// `Domain=` attribute of the session cookies, if any.
    pub cookie_domain: Option<String>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "https://secure.nicovideo.jp/secure/login?site=niconico".to_string(),
            api_json: "http://nmsg.nicovideo.jp/api.json/".to_string(),
            watch: "http://www.nicovideo.jp/watch/".to_string(),
            waybackkey: "http://www.nicovideo.jp/api/getwaybackkey".to_string(),
            mylist: "http://www.nicovideo.jp/mylist/".to_string(),
            getflv: "http://flapi.nicovideo.jp/api/getflv/".to_string(),
            cookie_url: "https://www.nicovideo.jp/".to_string(),
            cookie_domain: Some(".nicovideo.jp".to_string()),
        }
    }
}

impl Endpoints {
    /// Points every endpoint at a single base URL (e.g. a local mock server).
    ///
    /// Paths mirror the production layout; session cookies are host-only.
    #[must_use]
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            login: format!("{base}/secure/login?site=niconico"),
            api_json: format!("{base}/api.json/"),
            watch: format!("{base}/watch/"),
            waybackkey: format!("{base}/api/getwaybackkey"),
            mylist: format!("{base}/mylist/"),
            getflv: format!("{base}/api/getflv/"),
            cookie_url: format!("{base}/"),
            cookie_domain: None,
        }
    }

    /// Watch page URL of a video.
    #[must_use]
    pub fn watch_url(&self, video_id: &str) -> String {
        format!("{}{video_id}", self.watch)
    }

    /// `getflv` URL of a video.
    #[must_use]
    pub fn getflv_url(&self, video_id: &str) -> String {
        format!("{}{video_id}", self.getflv)
    }

    /// `getwaybackkey` URL of a thread.
    #[must_use]
    pub fn waybackkey_url(&self, thread_id: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("thread", thread_id)
            .finish();
        format!("{}?{query}", self.waybackkey)
    }

    /// Mylist page URL.
    #[must_use]
    pub fn mylist_url(&self, mylist_id: u64) -> String {
        format!("{}{mylist_id}", self.mylist)
    }

    /// Scope of the session cookies, or `None` if `cookie_url` is not a URL.
    #[must_use]
    pub fn cookie_scope(&self) -> Option<CookieScope> {
        let url = Url::parse(&self.cookie_url).ok()?;
        Some(CookieScope::new(url, self.cookie_domain.clone()))
    }
}
