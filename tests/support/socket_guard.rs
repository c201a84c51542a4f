//! Skips mock-server tests where localhost sockets cannot be bound.
//!
//! Set `NICOCC_REQUIRE_SOCKET_TESTS=1` to turn a skip into a failure.

use std::net::TcpListener;

use wiremock::MockServer;

const REQUIRE_VAR: &str = "NICOCC_REQUIRE_SOCKET_TESTS";

fn sockets_required() -> bool {
    std::env::var(REQUIRE_VAR)
        .is_ok_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Starts a mock server, or returns `None` when localhost is unavailable.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if let Err(error) = TcpListener::bind("127.0.0.1:0") {
        let message = format!("cannot bind a localhost socket for the mock niconico: {error}");
        assert!(!sockets_required(), "{message}; {REQUIRE_VAR} is set");
        eprintln!("{message}; skipping");
        return None;
    }
    Some(MockServer::start().await)
}
