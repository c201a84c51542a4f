//! The video list (`videos.csv`).

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, warn};

use super::atomic::{read_csv_records, write_csv_atomically};
use super::error::OutputError;
use crate::config::Encoding;
use crate::nico::{MylistVideo, VideoRef, is_valid_video_id};

/// Header written when the list is generated from mylists.
pub const VIDEOS_HEADER: [&str; 6] = [
    "動画ID",
    "動画タイトル",
    "再生数",
    "コメント数",
    "マイリスト数",
    "削除フラグ",
];

/// Reads the video list.
///
/// The first column is the id and the optional second column the title.
/// Rows with malformed ids are skipped; repeated ids keep their first
/// position.
///
/// # Errors
///
/// Returns [`OutputError`] if the file cannot be read or parsed.
pub fn read_video_list(
    path: &Path,
    encoding: Encoding,
    skip_first_row: bool,
) -> Result<Vec<VideoRef>, OutputError> {
    let records = read_csv_records(path, encoding)?;
    let skip = usize::from(skip_first_row);

    let mut seen = HashSet::new();
    let mut videos = Vec::new();
    for (index, row) in records.into_iter().enumerate().skip(skip) {
        let Some(id) = row.first().map(|cell| cell.trim()) else {
            continue;
        };
        if id.is_empty() {
            continue;
        }
        if !is_valid_video_id(id) {
            warn!(path = %path.display(), line = index + 1, id, "invalid video id, skipped");
            continue;
        }
        if !seen.insert(id.to_string()) {
            debug!(line = index + 1, id, "duplicate video id, skipped");
            continue;
        }
        videos.push(VideoRef::new(id, row.get(1).cloned()));
    }

    debug!(path = %path.display(), count = videos.len(), "video list loaded");
    Ok(videos)
}

/// Writes the video list generated from mylists.
///
/// # Errors
///
/// Returns [`OutputError`] if the file cannot be written.
pub fn write_video_list(
    temp: &Path,
    target: &Path,
    encoding: Encoding,
    videos: &[MylistVideo],
) -> Result<(), OutputError> {
    write_csv_atomically(temp, target, encoding, |writer| {
        writer.write_record(VIDEOS_HEADER)?;
        for video in videos {
            writer.write_record([
                &video.video_id,
                &video.title,
                &video.view_count,
                &video.comment_count,
                &video.mylist_count,
                &video.deleted,
            ])?;
        }
        Ok(())
    })
}
