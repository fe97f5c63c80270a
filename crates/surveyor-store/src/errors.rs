//! Error types for the durable store.
//!
//! Recovery-time problems (missing or corrupt checkpoint state) are handled
//! inside the backends by logging and starting empty; the variants here are
//! the failures that reach callers of the store API.

use std::path::PathBuf;

use thiserror::Error;

use surveyor_tasks::ExecutorError;

/// Errors produced by the store backends and their maintenance operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure against a store artifact.
    #[error("store io failure at {path}: {source}")]
    Io {
        /// Artifact the operation touched.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// SQLite-level failure.
    #[error("database failure: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A record could not be encoded or decoded.
    #[error("record codec failure: {0}")]
    Codec(#[from] serde_json::Error),

    /// A log frame is structurally invalid.
    #[error("invalid record frame at offset {offset}: {detail}")]
    Frame {
        /// Byte offset of the frame in the log.
        offset: u64,
        /// What was wrong with it.
        detail: String,
    },

    /// The store's worker rejected or lost the operation.
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_display_names_the_artifact() {
        let err = StoreError::Io {
            path: PathBuf::from("/data/surveyor/data.log"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err
            .to_string()
            .starts_with("store io failure at /data/surveyor/data.log"));
    }

    #[test]
    fn frame_display() {
        let err = StoreError::Frame {
            offset: 128,
            detail: "length prefix runs past committed length".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid record frame at offset 128: length prefix runs past committed length"
        );
    }

    #[test]
    fn executor_error_is_transparent() {
        let err = StoreError::from(ExecutorError::QueueClosed {
            name: "kv-store".into(),
        });
        assert_eq!(err.to_string(), "executor kv-store: queue closed");
    }

    #[test]
    fn codec_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = StoreError::from(parse);
        assert!(err.to_string().starts_with("record codec failure"));
    }
}
