//! Fetch-then-verify pipeline.
//!
//! `Idle -> ManifestBuilt -> Fetching -> Verifying -> Done`. Any failure while
//! fetching or verifying moves to `Failed` and ends the run; nothing is retried.
//! The blocking phases run on the tokio blocking pool.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::fetcher::{self, FetchError};
use crate::manifest::{build_manifest, Manifest};
use crate::settings::RunSettings;
use crate::verify::{SignatureVerifier, VerifyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    ManifestBuilt,
    Fetching,
    Verifying,
    Done,
    /// Run ended with an error raised in the given stage.
    Failed(FailedIn),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedIn {
    Fetching,
    Verifying,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetch failed")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error("{stage} task did not complete")]
    Join {
        stage: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
}

/// One run over fixed settings. Not reusable once finished.
pub struct Pipeline {
    settings: RunSettings,
    verifier: Arc<dyn SignatureVerifier>,
    skip_verify: bool,
    stage: Stage,
}

impl Pipeline {
    pub fn new(settings: RunSettings, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self {
            settings,
            verifier,
            skip_verify: false,
            stage: Stage::Idle,
        }
    }

    /// Stop after fetching; the signature is not checked.
    pub fn skip_verify(mut self, skip: bool) -> Self {
        self.skip_verify = skip;
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn enter(&mut self, stage: Stage) {
        tracing::debug!(from = ?self.stage, to = ?stage, "pipeline stage");
        self.stage = stage;
    }

    pub async fn run(&mut self) -> Result<(), PipelineError> {
        let manifest = build_manifest(self.settings.release, &self.settings.arch);
        self.enter(Stage::ManifestBuilt);

        self.enter(Stage::Fetching);
        if let Err(e) = self.fetch(&manifest).await {
            self.enter(Stage::Failed(FailedIn::Fetching));
            return Err(e);
        }

        if self.skip_verify {
            tracing::warn!("signature verification skipped");
            self.enter(Stage::Done);
            return Ok(());
        }

        self.enter(Stage::Verifying);
        if let Err(e) = self.verify(&manifest).await {
            self.enter(Stage::Failed(FailedIn::Verifying));
            return Err(e);
        }

        self.enter(Stage::Done);
        Ok(())
    }

    async fn fetch(&self, manifest: &Manifest) -> Result<(), PipelineError> {
        let base_url = self.settings.snapshot_base_url();
        let dir = self.settings.download_dir.clone();
        let files = manifest.files().to_vec();
        let opts = self.settings.transfer;
        tracing::info!(
            "Downloading latest snapshot from {} to {}",
            base_url,
            dir.display()
        );
        tokio::task::spawn_blocking(move || fetcher::fetch_all(&base_url, &dir, &files, opts))
            .await
            .map_err(|source| PipelineError::Join {
                stage: "fetch",
                source,
            })??;
        Ok(())
    }

    async fn verify(&self, manifest: &Manifest) -> Result<(), PipelineError> {
        let dir: PathBuf = self.settings.download_dir.clone();
        let signature = manifest.signature_file().to_string();
        let covered = manifest.verify_set().to_vec();
        let key = self.settings.public_key_path();
        let verifier = Arc::clone(&self.verifier);
        tracing::info!("Verifying with {}", key.display());
        tokio::task::spawn_blocking(move || verifier.verify(&dir, &signature, &covered, &key))
            .await
            .map_err(|source| PipelineError::Join {
                stage: "verify",
                source,
            })??;
        Ok(())
    }
}
