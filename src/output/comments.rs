//! Per-video comment files.

use std::path::Path;

use chrono::DateTime;
use chrono_tz::Asia::Tokyo;

use super::atomic::{CsvWriter, read_csv_records, write_csv_atomically};
use super::error::OutputError;
use crate::config::{DATETIME_FORMAT, Encoding};
use crate::nico::{CommentRecord, VideoAttribute};

/// Header of a comment file.
pub const COMMENT_HEADER: [&str; 13] = [
    "動画ID",
    "動画タイトル",
    "動画属性",
    "コメント番号",
    "ユーザーID",
    "プレミアム会員フラグ",
    "匿名フラグ",
    "削除フラグ",
    "VPOS",
    "NGスコア",
    "コマンド",
    "コメント",
    "書き込み日時",
];

/// Column of the user id.
pub const USER_ID_COLUMN: usize = 4;
/// Column of the premium flag.
pub const PREMIUM_COLUMN: usize = 5;
/// Column of the anonymity flag.
pub const ANONYMOUS_COLUMN: usize = 6;

/// Video-level columns repeated on every row.
#[derive(Debug, Clone, Copy)]
pub struct CommentFileHeader<'a> {
    /// Video id.
    pub video_id: &'a str,
    /// Title written to the file.
    pub title: &'a str,
    /// How the video metadata was obtained.
    pub attribute: VideoAttribute,
}

/// Writes a complete comment file via `temp`, renaming it to `target`.
///
/// # Errors
///
/// Returns [`OutputError`] if the file cannot be written.
pub fn write_comment_file(
    temp: &Path,
    target: &Path,
    encoding: Encoding,
    video: CommentFileHeader<'_>,
    comments: &[CommentRecord],
) -> Result<(), OutputError> {
    write_csv_atomically(temp, target, encoding, |writer| {
        writer.write_record(COMMENT_HEADER)?;
        for comment in comments {
            write_comment(writer, video, comment)?;
        }
        Ok(())
    })
}

fn write_comment(
    writer: &mut CsvWriter,
    video: CommentFileHeader<'_>,
    comment: &CommentRecord,
) -> Result<(), csv::Error> {
    let sequence_no = comment.sequence_no.to_string();
    let vpos = comment.vpos.to_string();
    let score = comment.score.to_string();
    let posted_at = format_posted_at(comment.posted_at);
    let row: [&str; 13] = [
        video.video_id,
        video.title,
        video.attribute.as_str(),
        &sequence_no,
        &comment.user_id,
        flag(comment.is_premium),
        flag(comment.is_anonymous),
        flag(comment.is_deleted),
        &vpos,
        &score,
        &comment.command,
        &comment.body,
        &posted_at,
    ];
    writer.write_record(row)
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// Formats unix seconds as `YYYY-MM-DD HH:MM:SS` in Japan time.
#[must_use]
pub fn format_posted_at(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0).map_or_else(
        || timestamp.to_string(),
        |utc| utc.with_timezone(&Tokyo).format(DATETIME_FORMAT).to_string(),
    )
}

/// Reads a comment file, checking its header.
///
/// Returns the data rows without the header.
///
/// # Errors
///
/// Returns [`OutputError::InvalidCommentFile`] if the first cell is not
/// `動画ID`, and other [`OutputError`]s for I/O or CSV problems.
pub fn read_comment_rows(
    path: &Path,
    encoding: Encoding,
) -> Result<Vec<Vec<String>>, OutputError> {
    let mut records = read_csv_records(path, encoding)?.into_iter();
    match records.next() {
        Some(header) if header.first().is_some_and(|cell| cell == COMMENT_HEADER[0]) => {
            Ok(records.collect())
        }
        _ => Err(OutputError::InvalidCommentFile {
            path: path.to_path_buf(),
        }),
    }
}
