//! Processing of one working directory, start to finish.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::instrument::WithSubscriber;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, warn};

use super::context::RunContext;
use super::logging::{directory_dispatch, puts};
use crate::config::Config;
use crate::fetch::{CollectOutcome, collect_video, fetch_mylists};
use crate::nico::{Endpoints, VideoRef};
use crate::output::{VideoSummary, read_video_list, summarize, write_result, write_video_list};
use crate::workspace::{Workspace, config_path, resolve_dir};

/// Settings shared by every directory of one invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Endpoint URLs; tests point these at a mock server.
    pub endpoints: Endpoints,
    /// Level for the stderr layer.
    pub stderr_level: LevelFilter,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            stderr_level: LevelFilter::WARN,
        }
    }
}

/// Loads and validates the configuration of a working directory.
///
/// # Errors
///
/// Fails if the directory does not exist or its configuration is invalid.
pub fn load_config(dir: &Path) -> Result<(PathBuf, Config)> {
    let root = resolve_dir(dir)?;
    let path = config_path(&root);
    let config =
        Config::load(&path).with_context(|| format!("invalid configuration {}", path.display()))?;
    Ok((root, config))
}

/// Runs the full collection for one working directory.
///
/// Generates `videos.csv` from mylists when configured, logs in, collects
/// each listed video and writes `result.csv`. Everything logged meanwhile is
/// also appended to a new file under `log/`.
///
/// # Errors
///
/// Any failure aborts the directory. Comment files completed before the
/// failure stay in place and are skipped by the next run.
pub async fn run_directory(dir: &Path, options: &RunOptions) -> Result<()> {
    let (root, config) = load_config(dir)?;
    let workspace = Workspace::open(&root, &config.counter)?;
    let _lock = workspace.lock()?;

    let log_path = workspace.new_log_path();
    let dispatch = directory_dispatch(options.stderr_level, &config.logging, &log_path)
        .with_context(|| format!("cannot open log file {}", log_path.display()))?;
    let ctx = RunContext::new(dir.to_path_buf(), config, workspace, options.endpoints.clone())?;

    async move {
        let result = process(ctx).await;
        if let Err(e) = &result {
            error!("processing aborted: {e:#}");
        }
        result
    }
    .with_subscriber(dispatch)
    .await
}

async fn process(mut ctx: RunContext) -> Result<()> {
    puts(&format!("Processing {}", ctx.dir.display()));
    info!(config = %ctx.config, "configuration loaded");

    prepare_video_list(&mut ctx).await?;
    let counter = &ctx.config.counter;
    let videos = read_video_list(
        &ctx.workspace.videos_csv(),
        counter.encoding,
        counter.skip_first_row,
    )?;
    if videos.is_empty() {
        warn!(path = %ctx.workspace.videos_csv().display(), "video list is empty");
    }

    ctx.session
        .login(&mut ctx.client)
        .await
        .context("login failed")?;

    collect_all(&mut ctx, &videos).await?;

    let summaries = videos
        .iter()
        .map(|video| {
            summarize(
                video,
                &ctx.workspace.comment_csv(&video.id),
                ctx.config.counter.encoding,
            )
        })
        .collect::<Result<Vec<VideoSummary>, _>>()?;
    write_result(
        &ctx.workspace.result_temp_csv(),
        &ctx.workspace.result_csv(),
        ctx.config.counter.encoding,
        &summaries,
    )?;

    puts(&format!(
        "Finished {}: {} videos, result written to {}",
        ctx.dir.display(),
        videos.len(),
        ctx.workspace.result_csv().display()
    ));
    Ok(())
}

/// Writes `videos.csv` from the configured mylists when it is due.
async fn prepare_video_list(ctx: &mut RunContext) -> Result<()> {
    let counter = &ctx.config.counter;
    let videos_csv = ctx.workspace.videos_csv();
    let exists = videos_csv.is_file();

    if counter.mylist.is_empty() || (exists && !counter.overwrite_videos) {
        if !exists {
            bail!(
                "{} not found and no mylist is configured",
                videos_csv.display()
            );
        }
        debug!(path = %videos_csv.display(), "using existing video list");
        return Ok(());
    }

    puts(&format!(
        "Generating {} from {} mylist(s)",
        videos_csv.display(),
        counter.mylist.len()
    ));
    let mylist_ids = counter.mylist.clone();
    let items = fetch_mylists(&mut ctx.client, &ctx.endpoints, &mylist_ids).await?;
    write_video_list(
        &ctx.workspace.videos_temp_csv(),
        &videos_csv,
        counter.encoding,
        &items,
    )?;
    info!(videos = items.len(), "video list written");
    Ok(())
}

async fn collect_all(ctx: &mut RunContext, videos: &[VideoRef]) -> Result<()> {
    let total = videos.len();
    let workspace = ctx.workspace.clone();
    let encoding = ctx.config.counter.encoding;
    let mut fetcher = ctx.fetcher();

    for (index, video) in videos.iter().enumerate() {
        let position = index + 1;
        if workspace.comment_csv(&video.id).is_file() {
            puts(&format!("({position} / {total}) {} skipped", video.id));
        } else {
            puts(&format!("({position} / {total}) {} started", video.id));
        }

        let outcome = collect_video(&mut fetcher, &workspace, encoding, video)
            .await
            .with_context(|| format!("failed to collect comments of {}", video.id))?;
        if let CollectOutcome::Collected { comments } = outcome {
            debug!(video_id = %video.id, comments, "comment file written");
        }
    }
    Ok(())
}
