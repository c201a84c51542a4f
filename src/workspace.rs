//! Working directory layout and the run lock.
//!
//! ```text
//! <dir>/
//!   nicocc.toml
//!   videos.csv
//!   result.csv
//!   log/nicocc-YYMMDD-HHMMSS.log
//!   tmp/nicocc.lock
//!   tmp/<version>/<start>_<end>_<encoding>/<id>.csv
//! ```
//!
//! Comment files live in a directory keyed by the collector version, the
//! collection period and the encoding, so changing any of them starts a
//! fresh collection while keeping earlier results.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Utc;
use chrono_tz::Asia::Tokyo;
use fs2::FileExt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{CONFIG_FILE_NAME, CounterConfig};

const TEMP_DIR: &str = "tmp";
const LOG_DIR: &str = "log";
const LOCK_FILE: &str = "nicocc.lock";
const VIDEOS_CSV: &str = "videos.csv";
const RESULT_CSV: &str = "result.csv";
const PERIOD_FORMAT: &str = "%y%m%d-%H%M%S";

/// Errors raised while preparing the working directory.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The directory does not exist.
    #[error("working directory {path} does not exist")]
    NotADirectory {
        /// Requested directory.
        path: PathBuf,
    },

    /// File system error.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Another process holds the lock.
    #[error("working directory is in use by another nicocc process (lock: {path})")]
    Locked {
        /// Lock file.
        path: PathBuf,
    },
}

impl WorkspaceError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Resolves `dir` to an absolute path.
///
/// # Errors
///
/// Returns [`WorkspaceError::NotADirectory`] if `dir` is not a directory.
pub fn resolve_dir(dir: &Path) -> Result<PathBuf, WorkspaceError> {
    let absolute = std::path::absolute(dir).map_err(|e| WorkspaceError::io(dir, e))?;
    if absolute.is_dir() {
        Ok(absolute)
    } else {
        Err(WorkspaceError::NotADirectory { path: absolute })
    }
}

/// Path of the config file inside `dir`.
#[must_use]
pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Paths of one working directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    comment_dir: PathBuf,
}

impl Workspace {
    /// Lays out `root` for the given collection settings, creating `tmp/`,
    /// `log/` and the comment directory as needed.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::Io`] if a directory cannot be created.
    pub fn open(root: &Path, counter: &CounterConfig) -> Result<Self, WorkspaceError> {
        let comment_dir_name = format!(
            "{}_{}_{}",
            counter.start.format(PERIOD_FORMAT),
            counter.end.format(PERIOD_FORMAT),
            counter.encoding,
        );
        let workspace = Self {
            root: root.to_path_buf(),
            comment_dir: root
                .join(TEMP_DIR)
                .join(env!("CARGO_PKG_VERSION"))
                .join(comment_dir_name),
        };

        for dir in [&workspace.comment_dir, &workspace.log_dir()] {
            std::fs::create_dir_all(dir).map_err(|e| WorkspaceError::io(dir, e))?;
        }
        debug!(comment_dir = %workspace.comment_dir.display(), "workspace ready");
        Ok(workspace)
    }

    /// `tmp/`.
    #[must_use]
    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(TEMP_DIR)
    }

    /// `log/`.
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.root.join(LOG_DIR)
    }

    /// A new log file path stamped with the current Japan time.
    #[must_use]
    pub fn new_log_path(&self) -> PathBuf {
        let now = Utc::now().with_timezone(&Tokyo);
        self.log_dir()
            .join(format!("nicocc-{}.log", now.format(PERIOD_FORMAT)))
    }

    /// `videos.csv`.
    #[must_use]
    pub fn videos_csv(&self) -> PathBuf {
        self.root.join(VIDEOS_CSV)
    }

    /// Temporary name of `videos.csv`.
    #[must_use]
    pub fn videos_temp_csv(&self) -> PathBuf {
        self.temp_dir().join(format!("_{VIDEOS_CSV}"))
    }

    /// `result.csv`.
    #[must_use]
    pub fn result_csv(&self) -> PathBuf {
        self.root.join(RESULT_CSV)
    }

    /// Temporary name of `result.csv`.
    #[must_use]
    pub fn result_temp_csv(&self) -> PathBuf {
        self.temp_dir().join(format!("_{RESULT_CSV}"))
    }

    /// Directory holding the comment files of this collection period.
    #[must_use]
    pub fn comment_dir(&self) -> &Path {
        &self.comment_dir
    }

    /// Final comment file of a video.
    #[must_use]
    pub fn comment_csv(&self, video_id: &str) -> PathBuf {
        self.comment_dir.join(format!("{video_id}.csv"))
    }

    /// Temporary comment file of a video.
    #[must_use]
    pub fn comment_temp_csv(&self, video_id: &str) -> PathBuf {
        self.comment_dir.join(format!("_{video_id}.csv"))
    }

    /// Takes the exclusive run lock on `tmp/nicocc.lock`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::Locked`] if another process holds it.
    pub fn lock(&self) -> Result<WorkspaceLock, WorkspaceError> {
        let path = self.temp_dir().join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| WorkspaceError::io(&path, e))?;
        if file.try_lock_exclusive().is_err() {
            return Err(WorkspaceError::Locked { path });
        }
        debug!(path = %path.display(), "run lock acquired");
        Ok(WorkspaceLock { file, path })
    }
}

/// Exclusive lock on a working directory, released on drop.
#[derive(Debug)]
pub struct WorkspaceLock {
    file: File,
    path: PathBuf,
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "failed to release run lock");
        }
    }
}
