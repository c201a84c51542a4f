//! Request and response values exchanged with the [`Transport`](super::Transport).

use std::fmt;

use reqwest::Method;

/// Body of an outgoing request.
#[derive(Clone, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` pairs.
    Form(Vec<(String, String)>),
    /// Pre-serialized `application/json` document.
    Json(String),
}

// Form bodies carry credentials; never print their values.
impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Form(pairs) => {
                let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
                f.debug_tuple("Form").field(&keys).finish()
            }
            Self::Json(body) => f.debug_tuple("Json").field(&body.len()).finish(),
        }
    }
}

/// A single HTTP request description.
///
/// Requests are cheap to clone and reused verbatim across retry attempts.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    url: String,
    body: RequestBody,
    use_cookies: bool,
}

impl HttpRequest {
    /// Creates a request with the given method and URL, cookies enabled.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: RequestBody::Empty,
            use_cookies: true,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Creates a form POST request.
    #[must_use]
    pub fn post_form(url: impl Into<String>, pairs: Vec<(String, String)>) -> Self {
        Self::new(Method::POST, url).with_body(RequestBody::Form(pairs))
    }

    /// Creates a JSON POST request.
    #[must_use]
    pub fn post_json(url: impl Into<String>, json: impl Into<String>) -> Self {
        Self::new(Method::POST, url).with_body(RequestBody::Json(json.into()))
    }

    /// Replaces the request body.
    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Sends the request without the cookie jar: no cookies are sent or stored.
    #[must_use]
    pub fn without_cookies(mut self) -> Self {
        self.use_cookies = false;
        self
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the body.
    #[must_use]
    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Returns whether the cookie jar takes part in this exchange.
    #[must_use]
    pub fn use_cookies(&self) -> bool {
        self.use_cookies
    }
}

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code of the final response (after redirects).
    pub status: u16,
    /// Final URL (after redirects).
    pub url: String,
    /// Response body decoded as text.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response value.
    #[must_use]
    pub fn new(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
            body: body.into(),
        }
    }
}
