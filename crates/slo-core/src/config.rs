use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Retry policy for storage requests (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per request (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.5 = 500ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.5,
            max_delay_secs: 30,
        }
    }
}

/// HTTP timeouts for storage requests (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Abort a request whose throughput stays below this for `low_speed_time_secs`.
    pub low_speed_limit_bytes: u32,
    pub low_speed_time_secs: u64,
    /// Hard limit per request; large segments on slow links need a generous value.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_limit_bytes: 1024,
            low_speed_time_secs: 60,
            timeout_secs: 3600,
        }
    }
}

/// Global configuration loaded from `~/.config/slo-upload/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SloConfig {
    /// Requested segment size in MiB (minimum 1).
    pub segment_size_mb: u64,
    /// Number of segments uploaded in parallel.
    pub concurrency: usize,
    /// Ceiling on local disk used by segment files, in MiB (None = only concurrency bounds it).
    #[serde(default)]
    pub max_disk_space_mb: Option<u64>,
    /// Directory under which the run directory is created (None = system temp dir).
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    /// Provider limit on segments per manifest.
    pub max_segments: usize,
    /// Segments go to `<container><suffix>` unless a segments container is given.
    pub segments_container_suffix: String,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub http: Option<HttpConfig>,
}

impl Default for SloConfig {
    fn default() -> Self {
        Self {
            segment_size_mb: 1,
            concurrency: 10,
            max_disk_space_mb: None,
            temp_dir: None,
            max_segments: crate::planner::DEFAULT_MAX_SEGMENTS,
            segments_container_suffix: "_segments".to_string(),
            retry: None,
            http: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("slo-upload")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SloConfig> {
    load_or_init_at(&config_path()?)
}

/// Like `load_or_init` for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<SloConfig> {
    if !path.exists() {
        let default_cfg = SloConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: SloConfig = toml::from_str(&data)?;
    Ok(cfg)
}
