// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a sync session.
///
/// Decode failures are not errors here: the tail reader absorbs them and
/// reports `PollOutcome::Malformed` instead.
#[derive(Debug, Error)]
pub enum TailError {
    #[error("Log file is no longer readable: {path}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error reading log file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur when loading a checklist (guide) document
#[derive(Debug, Error)]
pub enum ChecklistError {
    #[error("Checklist file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied reading checklist: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error reading checklist {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed checklist JSON: {message}")]
    MalformedJson { message: String },

    #[error("Act {id} appears more than once")]
    DuplicateStage { id: u32 },

    #[error("Act id must be positive")]
    ZeroStage,
}

/// Errors that can occur when loading or saving user progress
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("Permission denied accessing progress file: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error accessing progress file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed progress JSON in {path}: {message}")]
    MalformedJson { path: PathBuf, message: String },
}

impl TailError {
    /// Classify an IO failure on the log file.
    ///
    /// A missing file or revoked permission means the handle is gone for
    /// good; anything else is reported as a plain IO error, which the session
    /// also treats as fatal.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                Self::SourceUnavailable { path, source }
            }
            _ => Self::Io { path, source },
        }
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            Self::SourceUnavailable { path, .. } | Self::Io { path, .. } => path,
        }
    }
}

impl ChecklistError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

impl ProgressError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}
