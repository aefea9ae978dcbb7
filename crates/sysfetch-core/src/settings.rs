//! Run settings: resolved once at startup, immutable afterwards.
//!
//! Precedence per value: CLI override, then config file, then environment
//! probe (`/etc/installurl`, `uname -m`), then built-in default. Nothing
//! downstream of `resolve` looks at the environment again.

use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::config::{
    SysfetchConfig, TransferOptions, DEFAULT_DOWNLOAD_DIR, DEFAULT_INSTALLURL_PATH,
    DEFAULT_RELEASE, DEFAULT_SIGNIFY_PROGRAM,
};
use crate::manifest::Release;
use crate::platform;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid mirror URL {url:?}: {error}")]
    InvalidMirror { url: String, error: url::ParseError },
    #[error("mirror URL {0:?} must use http or https")]
    UnsupportedScheme(String),
    #[error("invalid architecture {0:?}")]
    InvalidArch(String),
    #[error("release must be a positive number")]
    ZeroRelease,
    #[error("cannot read {}: {error}", path.display())]
    Installurl { path: PathBuf, error: std::io::Error },
}

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub mirror: Option<String>,
    pub arch: Option<String>,
    pub release: Option<u32>,
    pub download_dir: Option<PathBuf>,
    pub pubkey: Option<PathBuf>,
}

/// Everything one run needs, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub mirror: Url,
    pub arch: String,
    pub release: Release,
    pub download_dir: PathBuf,
    /// Explicit public key; `None` means derive it from the release.
    pub pubkey: Option<PathBuf>,
    pub signify_program: PathBuf,
    pub transfer: TransferOptions,
}

/// `/etc/signify/openbsd-<release>-base.pub`
pub fn default_public_key(release: Release) -> PathBuf {
    PathBuf::from(format!("/etc/signify/openbsd-{}-base.pub", release))
}

impl RunSettings {
    /// Directory on the mirror holding this arch's snapshot, with trailing slash.
    pub fn snapshot_base_url(&self) -> String {
        format!(
            "{}/snapshots/{}/",
            self.mirror.as_str().trim_end_matches('/'),
            self.arch
        )
    }

    /// Key used for verification: the override, else the release default.
    pub fn public_key_path(&self) -> PathBuf {
        self.pubkey
            .clone()
            .unwrap_or_else(|| default_public_key(self.release))
    }
}

fn parse_mirror(raw: &str) -> Result<Url, SettingsError> {
    let url = Url::parse(raw.trim()).map_err(|error| SettingsError::InvalidMirror {
        url: raw.to_string(),
        error,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(SettingsError::UnsupportedScheme(raw.to_string())),
    }
}

fn validate_arch(arch: &str) -> Result<String, SettingsError> {
    let arch = arch.trim();
    if arch.is_empty() || arch.contains('/') || arch.chars().any(char::is_whitespace) {
        return Err(SettingsError::InvalidArch(arch.to_string()));
    }
    Ok(arch.to_string())
}

fn probe_mirror(installurl: &Path) -> Result<String, SettingsError> {
    match platform::read_installurl(installurl) {
        Ok(Some(url)) => {
            tracing::debug!("mirror from {}: {}", installurl.display(), url);
            Ok(url)
        }
        Ok(None) => Ok(platform::FALLBACK_MIRROR.to_string()),
        Err(error) => Err(SettingsError::Installurl {
            path: installurl.to_path_buf(),
            error,
        }),
    }
}

/// Resolve settings from CLI overrides and the loaded config.
pub fn resolve(overrides: Overrides, cfg: &SysfetchConfig) -> Result<RunSettings, SettingsError> {
    let mirror_raw = match overrides.mirror.or_else(|| cfg.mirror.clone()) {
        Some(m) => m,
        None => {
            let installurl = cfg
                .installurl_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INSTALLURL_PATH));
            probe_mirror(&installurl)?
        }
    };
    let mirror = parse_mirror(&mirror_raw)?;

    let arch = match overrides.arch.or_else(|| cfg.arch.clone()) {
        Some(a) => a,
        None => platform::machine_arch(),
    };
    let arch = validate_arch(&arch)?;

    let release = overrides
        .release
        .or(cfg.release)
        .unwrap_or(DEFAULT_RELEASE);
    let release = Release::new(release).ok_or(SettingsError::ZeroRelease)?;

    let download_dir = overrides
        .download_dir
        .or_else(|| cfg.download_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR));

    Ok(RunSettings {
        mirror,
        arch,
        release,
        download_dir,
        pubkey: overrides.pubkey.or_else(|| cfg.pubkey.clone()),
        signify_program: cfg
            .signify_program
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SIGNIFY_PROGRAM)),
        transfer: cfg.transfer_options(),
    })
}
