use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default release fetched when neither the CLI nor the config file names one.
pub const DEFAULT_RELEASE: u32 = 66;

/// Default download directory (the one `sysupgrade` reads from).
pub const DEFAULT_DOWNLOAD_DIR: &str = "/home/_sysupgrade";

/// File holding the system's preferred mirror, one URL on the first line.
pub const DEFAULT_INSTALLURL_PATH: &str = "/etc/installurl";

/// Program used to check the detached signature.
pub const DEFAULT_SIGNIFY_PROGRAM: &str = "signify";

/// Stall detection applied to every transfer (optional `[transfer]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Abort a transfer whose throughput stays below this many bytes/s...
    pub low_speed_limit_bytes: u32,
    /// ...for this many seconds.
    pub low_speed_time_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_limit_bytes: 1024,
            low_speed_time_secs: 60,
        }
    }
}

/// Per-handle curl options derived from `TransferConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    pub connect_timeout: Duration,
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        TransferConfig::default().options()
    }
}

impl TransferConfig {
    pub fn options(&self) -> TransferOptions {
        TransferOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            low_speed_limit: self.low_speed_limit_bytes,
            low_speed_time: Duration::from_secs(self.low_speed_time_secs),
        }
    }
}

/// Global configuration loaded from `~/.config/sysfetch/config.toml`.
///
/// Every key is optional; unset keys fall back to environment probes
/// (`/etc/installurl`, `uname -m`) and then to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SysfetchConfig {
    /// Mirror base URL, e.g. `https://cdn.openbsd.org/pub/OpenBSD`.
    #[serde(default)]
    pub mirror: Option<String>,
    /// CPU architecture token (`amd64`, `arm64`, ...).
    #[serde(default)]
    pub arch: Option<String>,
    /// Release number used to expand the manifest and pick the default key.
    #[serde(default)]
    pub release: Option<u32>,
    /// Directory the artifacts are written to. Must already exist.
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// signify public key; defaults to `/etc/signify/openbsd-<release>-base.pub`.
    #[serde(default)]
    pub pubkey: Option<PathBuf>,
    /// Where to read the default mirror from.
    #[serde(default)]
    pub installurl_path: Option<PathBuf>,
    /// signify binary name or path.
    #[serde(default)]
    pub signify_program: Option<PathBuf>,
    /// Optional transfer tuning; if missing, built-in defaults are used.
    #[serde(default)]
    pub transfer: Option<TransferConfig>,
}

impl SysfetchConfig {
    /// Config written on first run: documents the defaults without pinning
    /// mirror or arch, which stay environment-probed.
    pub fn initial() -> Self {
        Self {
            release: Some(DEFAULT_RELEASE),
            download_dir: Some(PathBuf::from(DEFAULT_DOWNLOAD_DIR)),
            installurl_path: Some(PathBuf::from(DEFAULT_INSTALLURL_PATH)),
            signify_program: Some(PathBuf::from(DEFAULT_SIGNIFY_PROGRAM)),
            transfer: Some(TransferConfig::default()),
            ..Self::default()
        }
    }

    pub fn transfer_options(&self) -> TransferOptions {
        self.transfer.clone().unwrap_or_default().options()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("sysfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SysfetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let initial = SysfetchConfig::initial();
        let toml = toml::to_string_pretty(&initial)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(initial);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit path. The file must exist.
pub fn load_from_path(path: &Path) -> Result<SysfetchConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: SysfetchConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
