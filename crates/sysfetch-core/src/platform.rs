//! Environment probes used to fill in defaults: the installurl file and `uname -m`.
//!
//! Only the settings resolver calls these, once per run.

use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::process::Command;

/// Mirror used when `/etc/installurl` is absent.
pub const FALLBACK_MIRROR: &str = "https://cdn.openbsd.org/pub/OpenBSD";

/// Architecture assumed when `uname -m` cannot be run.
pub const FALLBACK_ARCH: &str = "amd64";

/// Read the mirror URL from the first line of an installurl file.
/// Returns `Ok(None)` if the file does not exist or the first line is blank.
pub fn read_installurl(path: &Path) -> io::Result<Option<String>> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line)?;
    let url = line.trim();
    if url.is_empty() {
        return Ok(None);
    }
    Ok(Some(url.to_string()))
}

/// Machine architecture as reported by `uname -m`, or `amd64` if that fails.
pub fn machine_arch() -> String {
    match Command::new("uname").arg("-m").output() {
        Ok(out) if out.status.success() => {
            let arch = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if arch.is_empty() {
                FALLBACK_ARCH.to_string()
            } else {
                arch
            }
        }
        Ok(out) => {
            tracing::debug!(status = %out.status, "uname -m failed; assuming {}", FALLBACK_ARCH);
            FALLBACK_ARCH.to_string()
        }
        Err(e) => {
            tracing::debug!("cannot run uname: {}; assuming {}", e, FALLBACK_ARCH);
            FALLBACK_ARCH.to_string()
        }
    }
}
