//! Configuration management for camkiosk
//!
//! Handles config file loading/saving and environment overrides.
//! Config is stored at ~/.config/camkiosk/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub kiosk: KioskConfig,
    pub source: SourceConfig,
    pub player: PlayerConfig,
    pub telemetry: TelemetryConfig,
}

/// Playback timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    /// Dwell used when a stream has none of its own
    pub default_dwell_secs: u64,
    /// Deadline for a stream to report readiness
    pub ready_timeout_secs: u64,
    /// Offline screen countdown before the kiosk moves on
    pub auto_skip_secs: u64,
    /// Heuristic readiness delay for embeds
    pub embed_ready_delay_ms: u64,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            default_dwell_secs: 90,
            ready_timeout_secs: 15,
            auto_skip_secs: 8,
            embed_ready_delay_ms: 2000,
        }
    }
}

/// Where the stream list comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Directory holding cams.json (and the TUI log file)
    pub data_dir: PathBuf,
    /// Remote list endpoint; when set the local file is not read
    pub url: Option<String>,
    pub poll_interval_secs: u64,
    /// Annotate local streams with DNS/HTTP reachability
    pub probe_health: bool,
    pub health_ttl_secs: u64,
    pub probe_timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .map(|p| p.join("camkiosk"))
                .unwrap_or_else(|| PathBuf::from("/data")),
            url: None,
            poll_interval_secs: 5,
            probe_health: true,
            health_ttl_secs: 30,
            probe_timeout_ms: 2500,
        }
    }
}

/// External programs that present streams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub video_command: String,
    pub video_args: Vec<String>,
    pub browser_command: String,
    pub browser_args: Vec<String>,
    /// Mime types the video player plays without the adaptive client
    pub native_mime_types: Vec<String>,
    /// Resolve HLS manifests ourselves when the player can't
    pub adaptive_client: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            video_command: "mpv".to_string(),
            video_args: vec![
                "--fs".to_string(),
                "--mute=yes".to_string(),
                "--no-input-terminal".to_string(),
                "--cache-secs=30".to_string(),
            ],
            browser_command: "chromium".to_string(),
            browser_args: vec![
                "--kiosk".to_string(),
                "--noerrdialogs".to_string(),
                "--disable-infobars".to_string(),
                "--autoplay-policy=no-user-gesture-required".to_string(),
            ],
            native_mime_types: vec![
                "application/vnd.apple.mpegurl".to_string(),
                "application/x-mpegurl".to_string(),
                "video/mp4".to_string(),
            ],
            adaptive_client: true,
        }
    }
}

/// Telemetry forwarding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// POST target for events; unset keeps them local
    pub endpoint: Option<String>,
}

impl Config {
    /// Get config file path (~/.config/camkiosk/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("camkiosk").join("config.toml"))
    }

    /// Load config from the default path, or return defaults if not found.
    /// Environment overrides are applied either way.
    pub fn load() -> Self {
        let mut config: Config = Self::path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default();
        config.apply_env();
        config
    }

    /// Load config from an explicit path. Unlike [`Config::load`] a missing or
    /// malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config: Config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.apply_env();
        Ok(config)
    }

    /// Resolve the effective config for a CLI invocation
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from(p),
            None => Ok(Self::load()),
        }
    }

    /// Save config to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Environment variables win over the file
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var("CAMKIOSK_DATA_DIR") {
            self.source.data_dir = PathBuf::from(dir);
        }
        if let Some(secs) = var("CAMKIOSK_DEFAULT_DWELL_SEC").and_then(|s| s.parse().ok()) {
            self.kiosk.default_dwell_secs = secs;
        }
        if let Some(secs) = var("CAMKIOSK_READY_TIMEOUT_SEC").and_then(|s| s.parse().ok()) {
            self.kiosk.ready_timeout_secs = secs;
        }
        if let Some(url) = var("CAMKIOSK_SOURCE_URL") {
            self.source.url = Some(url).filter(|u| !u.trim().is_empty());
        }
    }

    /// cams.json inside the data directory
    pub fn cams_path(&self) -> PathBuf {
        self.source.data_dir.join("cams.json")
    }

    /// Log file used while the TUI owns the terminal
    pub fn log_path(&self) -> PathBuf {
        self.source.data_dir.join("camkiosk.log")
    }
}

impl KioskConfig {
    pub fn default_dwell(&self) -> Duration {
        Duration::from_secs(self.default_dwell_secs.max(1))
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn auto_skip(&self) -> Duration {
        Duration::from_secs(self.auto_skip_secs)
    }

    pub fn embed_ready_delay(&self) -> Duration {
        Duration::from_millis(self.embed_ready_delay_ms)
    }
}

impl SourceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn health_ttl(&self) -> Duration {
        Duration::from_secs(self.health_ttl_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}
