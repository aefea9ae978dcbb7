//! One artifact: HTTP GET streamed into an already-open destination file.

use std::fs::File;
use std::io::{self, Write};

use curl::easy::Easy;

use super::{CancelToken, FetchError};
use crate::config::TransferOptions;

/// Remote URL plus the destination handle it owns until the transfer ends.
pub(super) struct FetchTask {
    pub(super) name: String,
    pub(super) url: String,
    pub(super) file: File,
}

fn configure(easy: &mut Easy, url: &str, opts: TransferOptions) -> Result<(), curl::Error> {
    easy.url(url)?;
    easy.follow_location(true)?;
    // >= 400 ends the transfer before the error body reaches the file.
    easy.fail_on_error(true)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.low_speed_limit(opts.low_speed_limit)?;
    easy.low_speed_time(opts.low_speed_time)?;
    // Progress callback is the cancellation checkpoint while waiting on the network.
    easy.progress(true)?;
    Ok(())
}

fn perform(
    easy: &mut Easy,
    file: &mut File,
    write_error: &mut Option<io::Error>,
    cancel: &CancelToken,
) -> Result<(), curl::Error> {
    let mut transfer = easy.transfer();
    transfer.write_function(|data| {
        if cancel.is_cancelled() {
            return Ok(0);
        }
        match file.write_all(data) {
            Ok(()) => Ok(data.len()),
            Err(e) => {
                *write_error = Some(e);
                Ok(0)
            }
        }
    })?;
    transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
    transfer.perform()
}

/// Runs one transfer to completion. The file handle is closed on return.
pub(super) fn fetch_one(
    task: FetchTask,
    cancel: &CancelToken,
    opts: TransferOptions,
) -> Result<(), FetchError> {
    let FetchTask { name, url, mut file } = task;

    let mut easy = Easy::new();
    configure(&mut easy, &url, opts).map_err(|error| FetchError::Transport {
        file: name.clone(),
        error,
    })?;

    let mut write_error = None;
    let performed = perform(&mut easy, &mut file, &mut write_error, cancel);

    let status = easy.response_code().unwrap_or(0);
    if status != 0 {
        tracing::info!(file = %name, status, "GET {} ({})", name, status);
    }

    if let Err(error) = performed {
        if let Some(io_err) = write_error {
            return Err(FetchError::Storage {
                file: name,
                error: io_err,
            });
        }
        if cancel.is_cancelled() && (error.is_aborted_by_callback() || error.is_write_error()) {
            return Err(FetchError::Cancelled { file: name });
        }
        if error.is_http_returned_error() {
            return Err(FetchError::Http { file: name, status });
        }
        return Err(FetchError::Transport { file: name, error });
    }

    if !(200..300).contains(&status) {
        return Err(FetchError::Http { file: name, status });
    }
    Ok(())
}
