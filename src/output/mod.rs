//! CSV files read and written by nicocc.
//!
//! - `videos.csv`: the list of videos to collect ([`videos`])
//! - `<comment dir>/<id>.csv`: comments of one video ([`comments`])
//! - `result.csv`: unique-commenter counts ([`aggregate`])
//!
//! Every file is written through [`atomic`], so a file under its final name
//! is always complete.

pub mod aggregate;
pub mod atomic;
pub mod comments;
mod error;
pub mod videos;

pub use aggregate::{RESULT_HEADER, VideoSummary, summarize, write_result};
pub use comments::{COMMENT_HEADER, CommentFileHeader, read_comment_rows, write_comment_file};
pub use error::OutputError;
pub use videos::{VIDEOS_HEADER, read_video_list, write_video_list};
