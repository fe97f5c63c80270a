//! Error type for the monitor pipeline.
//!
//! The monitor sits between the journal reader and the store, so its error
//! is a thin union of the two. Both directions stay inspectable through
//! `source`.

use thiserror::Error;

use surveyor_journal::JournalError;
use surveyor_store::StoreError;

/// Errors produced while priming from or following the journal.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Reading or classifying journal lines failed.
    #[error(transparent)]
    Journal(#[from] JournalError),

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience type alias for monitor results.
pub type Result<T> = std::result::Result<T, MonitorError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_error_passes_through() {
        let err = MonitorError::from(JournalError::AmbiguousLine {
            event: "S".into(),
            count: 3,
        });
        assert_eq!(
            err.to_string(),
            "ambiguous journal line: event \"S\" matches 3 known kinds"
        );
    }

    #[test]
    fn store_error_passes_through() {
        let err = MonitorError::from(StoreError::Frame {
            offset: 0,
            detail: "bad prefix".into(),
        });
        assert!(err.to_string().contains("bad prefix"));
    }
}
