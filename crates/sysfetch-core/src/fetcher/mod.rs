//! Parallel fetcher.
//!
//! Opens every destination file, then runs one curl transfer per artifact on
//! its own thread (no concurrency cap). Results come back over a channel in
//! completion order; the first error trips a shared cancel token so the other
//! transfers abort at their next callback. Only that first error is returned.

mod cancel;
mod error;
mod task;

pub use cancel::CancelToken;
pub use error::FetchError;

use std::fs::File;
use std::path::Path;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use crate::config::TransferOptions;
use task::FetchTask;

/// Create (or truncate) `dir/name` for every artifact. Stops at the first failure;
/// the directory itself is never created.
fn open_destinations(
    base_url: &str,
    dest_dir: &Path,
    files: &[String],
) -> Result<Vec<FetchTask>, FetchError> {
    files
        .iter()
        .map(|name| {
            let path = dest_dir.join(name);
            let file = File::create(&path).map_err(|error| FetchError::Create {
                path: path.clone(),
                error,
            })?;
            Ok(FetchTask {
                name: name.clone(),
                url: format!("{}{}", base_url, name),
                file,
            })
        })
        .collect()
}

/// Downloads `base_url + name` into `dest_dir/name` for every name in `files`.
///
/// All destination files are opened before the first request is sent, so a
/// missing or unwritable directory fails with `FetchError::Create` and no
/// network traffic. Returns the first failure in detection order; later
/// failures are logged and dropped.
pub fn fetch_all(
    base_url: &str,
    dest_dir: &Path,
    files: &[String],
    opts: TransferOptions,
) -> Result<(), FetchError> {
    let tasks = open_destinations(base_url, dest_dir, files)?;
    let count = tasks.len();
    if count == 0 {
        return Ok(());
    }

    let cancel = CancelToken::new();
    let (tx, rx) = mpsc::channel::<(String, Result<(), FetchError>)>();
    let mut handles: Vec<(String, JoinHandle<()>)> = Vec::with_capacity(count);
    let mut first_error: Option<FetchError> = None;

    for task in tasks {
        let name = task.name.clone();
        let tx = tx.clone();
        let token = cancel.clone();
        let spawned = thread::Builder::new()
            .name(format!("fetch {}", name))
            .spawn(move || {
                let name = task.name.clone();
                let res = task::fetch_one(task, &token, opts);
                let _ = tx.send((name, res));
            });
        match spawned {
            Ok(h) => handles.push((name, h)),
            Err(error) => {
                cancel.cancel();
                first_error = Some(FetchError::Spawn { file: name, error });
                break;
            }
        }
    }
    drop(tx);

    // Only this loop trips the token, so a sibling's Cancelled result can
    // never arrive ahead of the error that caused it.
    for (name, res) in rx {
        match res {
            Ok(()) => tracing::debug!(file = %name, "fetched"),
            Err(e) if first_error.is_none() => {
                cancel.cancel();
                tracing::debug!(file = %name, "first failure, cancelling remaining fetches");
                first_error = Some(e);
            }
            Err(e) if e.is_cancelled() => tracing::debug!("{}", e),
            Err(e) => tracing::warn!("suppressed secondary failure: {}", e),
        }
    }

    for (name, h) in handles {
        if h.join().is_err() && first_error.is_none() {
            cancel.cancel();
            first_error = Some(FetchError::Panicked { file: name });
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
