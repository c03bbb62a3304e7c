use std::path::PathBuf;

use thiserror::Error;

use crate::revision::RevisionBuildError;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("log file not found: {path}")]
    LogNotFound { path: PathBuf },

    #[error("log file is not valid UTF-8: {path}")]
    NonUtf8Log { path: PathBuf },

    #[error("no entries were parsed from the log: {path}")]
    EmptyLog { path: PathBuf },

    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },

    #[error("cannot determine home directory")]
    HomeDirectoryNotFound,

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("failed to build git history: {0}")]
    RevisionBuild(#[from] RevisionBuildError),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
