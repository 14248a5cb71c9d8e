use std::{io, path::PathBuf};

use thiserror::Error;

/// Failure of a single [`QuotaFile::write`](super::QuotaFile::write).
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("writing {len} bytes would exceed the {limit} byte size limit ({size} bytes used)")]
    QuotaExceeded { size: u64, len: u64, limit: u64 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum RotateError {
    #[error("failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to rename {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything that can go wrong inside the disk sink. None of these reach the
/// caller; the worker turns them into warning lines.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open log file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write log file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to close log file {}: {source}", path.display())]
    Close {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to sync log file {}: {source}", path.display())]
    Sync {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to rotate log files: {0}")]
    Rotate(#[from] RotateError),

    #[error("dropped a {len} byte line that exceeds the {limit} byte size limit")]
    Oversized { len: u64, limit: u64 },
}
