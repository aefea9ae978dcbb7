//! CLI for sysfetch: flags, config loading, and the pipeline run.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use sysfetch_core::config::{self, SysfetchConfig};
use sysfetch_core::pipeline::Pipeline;
use sysfetch_core::settings::{self, Overrides};
use sysfetch_core::verify::SignifyVerifier;

/// Download the latest OpenBSD snapshot sets in parallel and check them with signify.
#[derive(Debug, Parser)]
#[command(name = "sysfetch")]
#[command(about = "Fetch and verify an OpenBSD snapshot", long_about = None)]
pub struct Cli {
    /// Snapshot mirror (default: first line of /etc/installurl).
    #[arg(long, value_name = "URL")]
    pub mirror: Option<String>,

    /// CPU architecture (default: output of `uname -m`).
    #[arg(long, value_name = "ARCH")]
    pub arch: Option<String>,

    /// OpenBSD release, e.g. 66 for 6.6.
    #[arg(long, value_name = "N")]
    pub release: Option<u32>,

    /// Download directory. Must already exist.
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// signify public key (default: /etc/signify/openbsd-<release>-base.pub).
    #[arg(short = 'p', long = "pubkey", value_name = "FILE")]
    pub pubkey: Option<PathBuf>,

    /// Read configuration from this file instead of ~/.config/sysfetch/config.toml.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log to ~/.local/state/sysfetch/sysfetch.log instead of stderr.
    #[arg(long)]
    pub log_file: bool,

    /// Download only; do not check the signature.
    #[arg(long)]
    pub no_verify: bool,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            mirror: self.mirror.clone(),
            arch: self.arch.clone(),
            release: self.release,
            download_dir: self.download_dir.clone(),
            pubkey: self.pubkey.clone(),
        }
    }

    fn load_config(&self) -> Result<SysfetchConfig> {
        match &self.config {
            Some(path) => config::load_from_path(path),
            None => match config::load_or_init() {
                Ok(cfg) => Ok(cfg),
                Err(e) => {
                    tracing::warn!("cannot load default config ({:#}); using built-in defaults", e);
                    Ok(SysfetchConfig::default())
                }
            },
        }
    }

    pub async fn run(self) -> Result<()> {
        let cfg = self.load_config()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let settings = settings::resolve(self.overrides(), &cfg).context("invalid settings")?;
        tracing::debug!("resolved settings: {:?}", settings);

        let verifier = Arc::new(SignifyVerifier::new(settings.signify_program.clone()));
        let mut pipeline = Pipeline::new(settings, verifier).skip_verify(self.no_verify);
        pipeline.run().await?;
        Ok(())
    }
}
