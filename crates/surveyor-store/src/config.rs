//! Store configuration: backend selection, location, and maintenance cadence.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default interval between incremental checkpoints in ms.
pub const DEFAULT_CHECKPOINT_INTERVAL_MS: u64 = 5_000;
/// Default interval between full checkpoints with compaction in ms.
pub const DEFAULT_COMPACTION_INTERVAL_MS: u64 = 60_000;

/// Which persistence engine backs the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Log-structured key/value engine (`data.log` + `MANIFEST`).
    Kv,
    /// Embedded SQLite document store.
    #[default]
    Sqlite,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kv => write!(f, "kv"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kv" => Ok(Self::Kv),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

/// Configuration for the durable store.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Persistence engine (default: sqlite).
    #[serde(default)]
    pub backend: StoreBackend,
    /// Directory holding the store's on-disk artifacts.
    #[serde(default = "default_path")]
    pub path: PathBuf,
    /// Interval between incremental checkpoints in ms (default: 5000).
    #[serde(default = "default_checkpoint_interval_ms")]
    pub checkpoint_interval_ms: u64,
    /// Interval between full checkpoints with compaction in ms (default: 60000).
    #[serde(default = "default_compaction_interval_ms")]
    pub compaction_interval_ms: u64,
    /// Delete on-disk artifacts before opening (default: false).
    #[serde(default)]
    pub reset_on_start: bool,
}

fn default_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".local/share/surveyor")
}
fn default_checkpoint_interval_ms() -> u64 {
    DEFAULT_CHECKPOINT_INTERVAL_MS
}
fn default_compaction_interval_ms() -> u64 {
    DEFAULT_COMPACTION_INTERVAL_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_path(),
            checkpoint_interval_ms: DEFAULT_CHECKPOINT_INTERVAL_MS,
            compaction_interval_ms: DEFAULT_COMPACTION_INTERVAL_MS,
            reset_on_start: false,
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_millis(self.checkpoint_interval_ms)
    }

    #[must_use]
    pub fn compaction_interval(&self) -> Duration {
        Duration::from_millis(self.compaction_interval_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
