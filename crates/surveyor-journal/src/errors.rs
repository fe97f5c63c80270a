//! Error types for journal discovery and classification.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or classifying journal lines.
#[derive(Debug, Error)]
pub enum JournalError {
    /// A line's event name matches more than one known event kind.
    ///
    /// Fatal to replay: dispatching such a line could corrupt downstream
    /// state, so processing must halt rather than guess.
    #[error("ambiguous journal line: event {event:?} matches {count} known kinds")]
    AmbiguousLine {
        /// The `"event"` value from the line.
        event: String,
        /// How many kinds matched.
        count: usize,
    },

    /// A journal file or directory could not be read.
    #[error("failed to read journal {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The discovery glob could not be built, e.g. because the journal
    /// directory path contains pattern metacharacters.
    #[error("invalid journal glob {pattern:?}: {source}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Underlying pattern error.
        #[source]
        source: glob::PatternError,
    },
}

/// Convenience type alias for journal results.
pub type Result<T> = std::result::Result<T, JournalError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_line_display() {
        let err = JournalError::AmbiguousLine {
            event: "S".into(),
            count: 3,
        };
        assert_eq!(
            err.to_string(),
            "ambiguous journal line: event \"S\" matches 3 known kinds"
        );
    }

    #[test]
    fn io_display() {
        let err = JournalError::Io {
            path: PathBuf::from("/journals/Journal.01.log"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err
            .to_string()
            .starts_with("failed to read journal /journals/Journal.01.log"));
    }
}
