//! Per-video collection into comment files, and video list generation.

use tracing::{debug, info, instrument};

use super::fetcher::CommentFetcher;
use crate::config::Encoding;
use crate::error::FetchError;
use crate::http::{DefaultErrorHandler, RetryingClient};
use crate::nico::{Endpoints, MylistAcceptor, MylistVideo, VideoRef, mylist_request};
use crate::output::{CommentFileHeader, write_comment_file};
use crate::workspace::Workspace;

/// What happened to one video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectOutcome {
    /// The comment file already existed; nothing was requested.
    Skipped,
    /// A new comment file was written.
    Collected {
        /// Number of comments written.
        comments: usize,
    },
}

/// Collects one video into `<comment dir>/<id>.csv`.
///
/// The file is written under `_<id>.csv` and renamed only once every window
/// has been fetched, so an existing `<id>.csv` always holds a complete
/// collection and is skipped on later runs.
///
/// # Errors
///
/// Returns [`FetchError`] if collection fails or the file cannot be written.
#[instrument(skip_all, fields(video_id = %video.id))]
pub async fn collect_video(
    fetcher: &mut CommentFetcher<'_>,
    workspace: &Workspace,
    encoding: Encoding,
    video: &VideoRef,
) -> Result<CollectOutcome, FetchError> {
    let target = workspace.comment_csv(&video.id);
    if target.is_file() {
        debug!(path = %target.display(), "comment file exists");
        return Ok(CollectOutcome::Skipped);
    }

    let collected = fetcher.fetch(&video.id).await?;
    let title = video
        .known_title
        .as_deref()
        .unwrap_or(&collected.info.title);

    write_comment_file(
        &workspace.comment_temp_csv(&video.id),
        &target,
        encoding,
        CommentFileHeader {
            video_id: &video.id,
            title,
            attribute: collected.info.attribute,
        },
        &collected.comments,
    )?;

    Ok(CollectOutcome::Collected {
        comments: collected.comments.len(),
    })
}

/// Fetches the video items of each mylist, in order.
///
/// Mylist pages are public and requested without cookies.
///
/// # Errors
///
/// Returns [`FetchError::Exhausted`] if a mylist cannot be obtained.
#[instrument(skip(client, endpoints))]
pub async fn fetch_mylists(
    client: &mut RetryingClient,
    endpoints: &Endpoints,
    mylist_ids: &[u64],
) -> Result<Vec<MylistVideo>, FetchError> {
    let mut videos = Vec::new();
    for &mylist_id in mylist_ids {
        let request = mylist_request(endpoints.mylist_url(mylist_id));
        let items = client
            .request(&request, &MylistAcceptor, &DefaultErrorHandler)
            .await?
            .ok_or_else(|| FetchError::exhausted(format!("mylist {mylist_id}")))?;
        info!(mylist_id, videos = items.len(), "mylist loaded");
        videos.extend(items);
    }
    Ok(videos)
}
