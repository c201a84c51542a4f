//! Error type for CSV input and output.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while reading or writing CSV files.
#[derive(Debug, Error)]
pub enum OutputError {
    /// File system error.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding or decoding error.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: csv::Error,
    },

    /// A comment file does not start with the expected header.
    #[error("comment file {path} is invalid: header does not start with 動画ID")]
    InvalidCommentFile {
        /// File involved.
        path: PathBuf,
    },
}

impl OutputError {
    /// Creates an I/O error for `path`.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Creates a CSV error for `path`.
    pub fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}
