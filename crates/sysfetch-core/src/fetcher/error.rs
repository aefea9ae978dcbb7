//! Fetch error type, keyed by artifact name.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single fetch task, or of the fetch run as a whole.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Destination file could not be created. Raised before any transfer starts;
    /// usually means the download directory is missing or not writable.
    #[error("cannot create {}: {error}", path.display())]
    Create { path: PathBuf, error: io::Error },
    /// Curl reported an error (resolve, connect, timeout, read, ...).
    #[error("GET {file}: {error}")]
    Transport { file: String, error: curl::Error },
    /// Server answered with a non-2xx status.
    #[error("GET {file}: HTTP {status}")]
    Http { file: String, status: u32 },
    /// Writing the body to disk failed (e.g. disk full).
    #[error("writing {file}: {error}")]
    Storage { file: String, error: io::Error },
    /// Transfer stopped because another task failed first.
    #[error("GET {file}: cancelled")]
    Cancelled { file: String },
    /// Worker thread could not be started.
    #[error("cannot start fetch of {file}: {error}")]
    Spawn { file: String, error: io::Error },
    #[error("fetch of {file} panicked")]
    Panicked { file: String },
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled { .. })
    }
}
