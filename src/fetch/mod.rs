//! Backward-paginating comment collection.
//!
//! [`CommentFetcher`] runs the per-video protocol (video info, challenge
//! token, comment windows) on top of the shared
//! [`RetryingClient`](crate::http::RetryingClient) and
//! [`SessionManager`](crate::session::SessionManager).
//! [`collect_video`] adds the skip rule and the comment file.

mod collect;
mod fetcher;
pub mod window;

pub use collect::{CollectOutcome, collect_video, fetch_mylists};
pub use fetcher::{CollectionPeriod, CommentFetcher, VideoComments};
pub use window::{Finish, MAX_STALLED_WINDOWS, PaginationWindow, Step};
