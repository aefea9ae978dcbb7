//! Signature verification of downloaded artifacts.
//!
//! The check itself is delegated to `signify -C`; `SignatureVerifier` is the
//! seam so the pipeline can be driven with a test double.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    /// Verifier program could not be started (not installed, not executable).
    #[error("cannot run {}: {error}", program.display())]
    Spawn { program: PathBuf, error: io::Error },
    /// Verifier ran and rejected the files. `output` is its combined stdout/stderr.
    #[error("signature verification failed ({status})")]
    Rejected { status: String, output: String },
}

/// Checks that every file in `covered` matches the checksums listed in the
/// detached `signature` file, signed by `public_key`. Paths in `covered` and
/// `signature` are relative to `dir`.
pub trait SignatureVerifier: Send + Sync {
    fn verify(
        &self,
        dir: &Path,
        signature: &str,
        covered: &[String],
        public_key: &Path,
    ) -> Result<(), VerifyError>;
}

/// Runs `signify -C -p <key> -x <sig> <files...>` in the download directory.
#[derive(Debug, Clone)]
pub struct SignifyVerifier {
    program: PathBuf,
}

impl SignifyVerifier {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Argument vector for a checksum-list verification.
pub fn signify_args(signature: &str, covered: &[String], public_key: &Path) -> Vec<String> {
    let mut args = vec![
        "-C".to_string(),
        "-p".to_string(),
        public_key.display().to_string(),
        "-x".to_string(),
        signature.to_string(),
    ];
    args.extend(covered.iter().cloned());
    args
}

fn describe(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit status {}", code),
        None => status.to_string(),
    }
}

impl SignatureVerifier for SignifyVerifier {
    fn verify(
        &self,
        dir: &Path,
        signature: &str,
        covered: &[String],
        public_key: &Path,
    ) -> Result<(), VerifyError> {
        let args = signify_args(signature, covered, public_key);
        tracing::debug!(program = %self.program.display(), ?args, dir = %dir.display(), "running verifier");
        let spawn_error = |error| VerifyError::Spawn {
            program: self.program.clone(),
            error,
        };

        // stdout and stderr share one pipe so lines keep the order they were written in.
        let (mut reader, writer) = os_pipe::pipe().map_err(spawn_error)?;
        let writer_err = writer.try_clone().map_err(spawn_error)?;
        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(writer_err);
        let mut child = cmd.spawn().map_err(spawn_error)?;
        // The Command still owns the parent's write ends; close them or the read never sees EOF.
        drop(cmd);

        let mut combined = Vec::new();
        let read = reader.read_to_end(&mut combined);
        let status = child.wait().map_err(spawn_error)?;
        if let Err(e) = read {
            tracing::warn!("reading verifier output: {}", e);
        }

        // Verifier output goes to the user as-is, success or not.
        let _ = io::stderr().write_all(&combined);

        if !status.success() {
            return Err(VerifyError::Rejected {
                status: describe(status),
                output: String::from_utf8_lossy(&combined).into_owned(),
            });
        }
        Ok(())
    }
}
