//! Session cookie lookup and removal on a `reqwest::cookie::Jar`.
//!
//! `Jar` has no removal API; a cookie is removed by storing an already
//! expired cookie with the same name, domain and path.

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use tracing::{debug, instrument, warn};
use url::Url;

/// Where session cookies live: the URL they are sent to and the domain
/// attribute the service sets them with.
#[derive(Debug, Clone)]
pub struct CookieScope {
    url: Url,
    domain: Option<String>,
}

impl CookieScope {
    /// Creates a scope. `domain` is the `Domain=` attribute used by the
    /// service (e.g. `.nicovideo.jp`); `None` for host-only cookies.
    #[must_use]
    pub fn new(url: Url, domain: Option<String>) -> Self {
        Self { url, domain }
    }

    /// Returns the URL cookies are looked up for.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Returns the value of cookie `name` that the jar would send to the scope URL.
#[must_use]
pub fn find_cookie(jar: &Jar, scope: &CookieScope, name: &str) -> Option<String> {
    let header = jar.cookies(&scope.url)?;
    let header = header.to_str().ok()?;
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

/// Removes cookie `name` from the jar, both host-only and domain-scoped.
#[instrument(level = "debug", skip(jar))]
pub fn remove_cookie(jar: &Arc<Jar>, scope: &CookieScope, name: &str) {
    const EXPIRED: &str = "Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT";

    jar.add_cookie_str(&format!("{name}=; Path=/; {EXPIRED}"), &scope.url);
    if let Some(domain) = &scope.domain {
        jar.add_cookie_str(
            &format!("{name}=; Domain={domain}; Path=/; {EXPIRED}"),
            &scope.url,
        );
    }

    if find_cookie(jar, scope, name).is_some() {
        warn!(name, "cookie still present after removal");
    } else {
        debug!(name, "cookie removed");
    }
}
