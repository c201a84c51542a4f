//! niconico endpoints, payload parsers and response acceptors.
//!
//! Each submodule covers one endpoint: it builds the request, parses the
//! payload and exposes a [`ResponseAcceptor`](crate::http::ResponseAcceptor)
//! that tells the retry loop whether a response is usable.

pub mod endpoints;
pub mod html;
pub mod mylist;
pub mod thread;
pub mod video;
pub mod waybackkey;

pub use endpoints::Endpoints;
pub use mylist::{MylistAcceptor, MylistVideo, mylist_request, parse_mylist_page};
pub use thread::{
    CommentRecord, Placement, ThreadQuery, WindowAcceptor, WindowBatch, WindowFilter,
    parse_window,
};
pub use video::{
    GetFlvAcceptor, Outcome, VideoAttribute, VideoInfo, VideoRef, WatchPageAcceptor,
    WatchPageErrorHandler, is_valid_video_id, parse_getflv, parse_watch_page, watch_request,
};
pub use waybackkey::{WaybackKeyAcceptor, parse_waybackkey};
