//! nicocc core library
//!
//! Collects the niconico comments posted to a list of videos within a
//! period, one CSV file per video, and counts unique commenters per video.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`http`] - Paced cookie-aware transport and the retry loop built on it
//! - [`session`] - Login and session-cookie tracking
//! - [`nico`] - niconico endpoints, payload parsers and response acceptors
//! - [`fetch`] - Backward-paginating comment collection
//! - [`output`] - Comment, video list and result CSV files
//! - [`config`] - `nicocc.toml` loading and validation
//! - [`workspace`] - Working-directory layout and run lock
//! - [`app`] - Per-directory run flow and logging setup

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod nico;
pub mod output;
pub mod session;
pub(crate) mod user_agent;
pub mod workspace;

// Re-export commonly used types
pub use app::{RunContext, RunOptions, run_directory};
pub use config::{Config, ConfigError, Encoding, LogFormat};
pub use error::{FetchError, ProtocolError};
pub use fetch::{CollectOutcome, CommentFetcher, collect_video};
pub use http::{RetryingClient, Transport, TransportError};
pub use nico::{Endpoints, VideoAttribute, VideoRef};
pub use session::{Credentials, SessionManager};
pub use workspace::{Workspace, WorkspaceError};
