//! Unique-commenter counts per video (`result.csv`).

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use super::atomic::write_csv_atomically;
use super::comments::{ANONYMOUS_COLUMN, PREMIUM_COLUMN, USER_ID_COLUMN, read_comment_rows};
use super::error::OutputError;
use crate::config::Encoding;
use crate::nico::VideoRef;

/// Header of the result file.
pub const RESULT_HEADER: [&str; 6] = [
    "動画ID",
    "動画タイトル",
    "プレミアム会員ユニークコメント",
    "匿名プレミアム会員ユニークコメント",
    "一般会員ユニークコメント",
    "匿名一般会員ユニークコメント",
];

const TITLE_COLUMN: usize = 1;

/// Distinct commenters of one video, split by membership and anonymity.
#[derive(Debug, Default)]
struct Commenters {
    premium: HashSet<String>,
    premium_anonymous: HashSet<String>,
    general: HashSet<String>,
    general_anonymous: HashSet<String>,
}

impl Commenters {
    fn add(&mut self, user_id: &str, premium: bool, anonymous: bool) {
        let set = match (premium, anonymous) {
            (true, false) => &mut self.premium,
            (true, true) => &mut self.premium_anonymous,
            (false, false) => &mut self.general,
            (false, true) => &mut self.general_anonymous,
        };
        if !set.contains(user_id) {
            set.insert(user_id.to_string());
        }
    }
}

/// One row of the result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSummary {
    /// Video id.
    pub video_id: String,
    /// Title from the comment file, else from the video list.
    pub title: String,
    /// Unique premium members.
    pub premium: usize,
    /// Unique anonymous premium members.
    pub premium_anonymous: usize,
    /// Unique general members.
    pub general: usize,
    /// Unique anonymous general members.
    pub general_anonymous: usize,
}

/// Counts the unique commenters of `video`.
///
/// A missing comment file yields zero counts. Rows without a user id are
/// ignored.
///
/// # Errors
///
/// Returns [`OutputError::InvalidCommentFile`] if the comment file has a
/// foreign header, and other [`OutputError`]s if it cannot be read.
pub fn summarize(
    video: &VideoRef,
    comment_file: &Path,
    encoding: Encoding,
) -> Result<VideoSummary, OutputError> {
    let mut commenters = Commenters::default();
    let mut file_title = None;

    if comment_file.is_file() {
        for row in read_comment_rows(comment_file, encoding)? {
            if file_title.is_none() {
                file_title = row.get(TITLE_COLUMN).filter(|t| !t.is_empty()).cloned();
            }
            let Some(user_id) = row.get(USER_ID_COLUMN).filter(|id| !id.is_empty()) else {
                continue;
            };
            let premium = row.get(PREMIUM_COLUMN).is_some_and(|v| v == "1");
            let anonymous = row.get(ANONYMOUS_COLUMN).is_some_and(|v| v == "1");
            commenters.add(user_id, premium, anonymous);
        }
    } else {
        debug!(video_id = %video.id, "no comment file; counts are zero");
    }

    Ok(VideoSummary {
        video_id: video.id.clone(),
        title: file_title
            .or_else(|| video.known_title.clone())
            .unwrap_or_default(),
        premium: commenters.premium.len(),
        premium_anonymous: commenters.premium_anonymous.len(),
        general: commenters.general.len(),
        general_anonymous: commenters.general_anonymous.len(),
    })
}

/// Writes the result file.
///
/// # Errors
///
/// Returns [`OutputError`] if the file cannot be written.
pub fn write_result(
    temp: &Path,
    target: &Path,
    encoding: Encoding,
    summaries: &[VideoSummary],
) -> Result<(), OutputError> {
    write_csv_atomically(temp, target, encoding, |writer| {
        writer.write_record(RESULT_HEADER)?;
        for summary in summaries {
            writer.write_record([
                summary.video_id.clone(),
                summary.title.clone(),
                summary.premium.to_string(),
                summary.premium_anonymous.to_string(),
                summary.general.to_string(),
                summary.general_anonymous.to_string(),
            ])?;
        }
        Ok(())
    })
}
