//! One-time challenge token (`waybackkey`) for past-comment queries.

use crate::http::{AcceptanceError, HttpRequest, HttpResponse, ResponseAcceptor, require_ok};

/// Extracts the `waybackkey` from a query-string body.
///
/// Returns `None` when the key is missing or empty.
#[must_use]
pub fn parse_waybackkey(body: &str) -> Option<String> {
    url::form_urlencoded::parse(body.trim().as_bytes())
        .find(|(key, _)| key == "waybackkey")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Accepts a `getwaybackkey` response.
///
/// A 200 answer without a key is a server-side failure, not a rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaybackKeyAcceptor;

impl ResponseAcceptor for WaybackKeyAcceptor {
    type Output = String;

    fn accept(&self, request: &HttpRequest, response: HttpResponse) -> Result<String, AcceptanceError> {
        let response = require_ok(request, response)?;
        parse_waybackkey(&response.body)
            .ok_or_else(|| AcceptanceError::server_error(request.url(), "response has no waybackkey"))
    }
}
