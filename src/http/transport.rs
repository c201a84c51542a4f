//! Single HTTP exchange with cookie handling and request pacing.
//!
//! The [`Transport`] owns two `reqwest` clients: one wired to a cookie jar
//! for authenticated calls, and one without any cookie provider for anonymous
//! listing calls. Both share the same [`Pacer`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::cookie::Jar;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::{debug, instrument};
use url::Url;

use super::error::TransportError;
use super::pacer::Pacer;
use super::request::{HttpRequest, HttpResponse, RequestBody};
use crate::user_agent;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (2 minutes; comment windows can be large).
pub const READ_TIMEOUT_SECS: u64 = 120;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Performs single HTTP exchanges on behalf of the retrying client.
#[derive(Debug)]
pub struct Transport {
    cookie_client: Client,
    anonymous_client: Client,
    jar: Arc<Jar>,
    pacer: Pacer,
}

impl Transport {
    /// Creates a transport with an empty cookie jar and the given pacing interval.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Build`] if the HTTP client cannot be constructed.
    pub fn new(interval: Duration) -> Result<Self, TransportError> {
        Self::with_cookie_jar(Arc::new(Jar::default()), interval)
    }

    /// Creates a transport around an existing cookie jar.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Build`] if the HTTP client cannot be constructed.
    #[instrument(level = "debug", skip(jar))]
    pub fn with_cookie_jar(jar: Arc<Jar>, interval: Duration) -> Result<Self, TransportError> {
        let cookie_client = base_client_builder()
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(TransportError::Build)?;
        let anonymous_client = base_client_builder()
            .build()
            .map_err(TransportError::Build)?;
        Ok(Self {
            cookie_client,
            anonymous_client,
            jar,
            pacer: Pacer::new(interval),
        })
    }

    /// Returns the cookie jar shared with the cookie-enabled client.
    #[must_use]
    pub fn jar(&self) -> &Arc<Jar> {
        &self.jar
    }

    /// Executes one exchange.
    ///
    /// Waits for the pacing interval first, and records the attempt time
    /// afterwards whether or not the exchange succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for invalid URLs, network failures,
    /// timeouts and non-2xx status codes.
    pub async fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.pacer.wait().await;
        debug!(method = %request.method(), url = %request.url(), "HTTP request");
        let result = self.send(request).await;
        self.pacer.mark();
        result
    }

    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url();
        let parsed = Url::parse(url).map_err(|_| TransportError::invalid_url(url))?;

        let client = if request.use_cookies() {
            &self.cookie_client
        } else {
            &self.anonymous_client
        };

        let builder = client.request(request.method().clone(), parsed);
        let builder = match request.body() {
            RequestBody::Empty => builder,
            RequestBody::Form(pairs) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs)
                    .finish();
                builder
                    .header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE))
                    .body(encoded)
            }
            RequestBody::Json(json) => builder
                .header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))
                .body(json.clone()),
        };

        let response = builder.send().await.map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::status(url, status.as_u16()));
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| classify(url, e))?;
        debug!(status = status.as_u16(), bytes = body.len(), "HTTP response");

        Ok(HttpResponse::new(status.as_u16(), final_url, body))
    }
}

fn classify(url: &str, error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::timeout(url)
    } else {
        TransportError::network(url, error)
    }
}

fn base_client_builder() -> reqwest::ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
}
