//! Error types for the background-work primitives.
//!
//! [`ExecutorError`] distinguishes a deliberately closed queue from a worker
//! that died, so callers can tell "we are shutting down" apart from "the
//! backend is gone".

use thiserror::Error;

/// Errors produced by [`crate::SerialExecutor`].
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The worker OS thread could not be spawned.
    #[error("executor {name}: failed to spawn worker thread: {source}")]
    Spawn {
        /// Executor name.
        name: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The state initializer failed on the worker thread.
    #[error("executor {name}: state initialization failed: {message}")]
    InitFailed {
        /// Executor name.
        name: String,
        /// Rendered initializer error.
        message: String,
    },

    /// The queue was closed by `shutdown`; no new work is accepted.
    #[error("executor {name}: queue closed")]
    QueueClosed {
        /// Executor name.
        name: String,
    },

    /// The worker thread panicked or exited before the job could run.
    #[error("executor {name}: worker thread panicked or exited")]
    WorkerExited {
        /// Executor name.
        name: String,
    },
}

/// Convenience type alias for executor results.
pub type Result<T> = std::result::Result<T, ExecutorError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
