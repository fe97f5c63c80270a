//! Runtime configuration: defaults, overlaid by the JSON config file when
//! one exists, then by environment variables. CLI flags are applied last,
//! in `main`.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use surveyor_store::StoreConfig;

/// How far back priming reaches when no epoch is configured.
const DEFAULT_PRIME_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default config file location (`~/.config/surveyor/config.json`).
pub fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".config")
        .join("surveyor")
        .join("config.json")
}

/// Backlog replay settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrimeConfig {
    pub enabled: bool,
    /// Oldest journal mtime worth replaying. `None` means the last week.
    pub epoch: Option<DateTime<Utc>>,
}

impl Default for PrimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            epoch: None,
        }
    }
}

impl PrimeConfig {
    pub fn epoch_instant(&self) -> SystemTime {
        match self.epoch {
            Some(ts) => ts.into(),
            None => SystemTime::now()
                .checked_sub(DEFAULT_PRIME_WINDOW)
                .unwrap_or(SystemTime::UNIX_EPOCH),
        }
    }
}

/// Weight-model resource locations.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelConfig {
    pub base: PathBuf,
    pub refined: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base: PathBuf::from("models/value_model.json"),
            refined: PathBuf::from("models/value_model_genera.json"),
        }
    }
}

/// Everything the binary needs to run. All keys optional in the file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Directory the game writes `Journal*.log` files into. Required for
    /// `run`; no default.
    pub journal_dir: Option<PathBuf>,
    pub store: StoreConfig,
    pub prime: PrimeConfig,
    pub models: ModelConfig,
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file does not
    /// exist, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            debug!(path = %path.display(), "loading config file");
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?
        } else {
            debug!(path = %path.display(), "no config file; using defaults");
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(dir) = read_env_path("SURVEYOR_JOURNAL_DIR") {
            self.journal_dir = Some(dir);
        }
        if let Some(path) = read_env_path("SURVEYOR_STORE_PATH") {
            self.store.path = path;
        }
    }
}

fn read_env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
