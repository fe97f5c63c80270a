//! Error types for the core domain model.
//!
//! [`CoreError`] covers the failure modes of loading and parsing the bundled
//! weight model resource. Merging and entity updates are total operations and
//! do not produce errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the core domain model.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The weight model resource could not be read.
    #[error("failed to read model resource {path}: {source}")]
    ModelRead {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The weight model resource is not valid JSON of the expected shape.
    #[error("model resource {path} is not a valid weight model: {source}")]
    ModelParse {
        /// Path that was read.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for core results.
pub type Result<T> = std::result::Result<T, CoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_read_display() {
        let err = CoreError::ModelRead {
            path: PathBuf::from("/models/value.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err
            .to_string()
            .starts_with("failed to read model resource /models/value.json"));
    }

    #[test]
    fn model_parse_display() {
        let source = serde_json::from_str::<String>("not json").unwrap_err();
        let err = CoreError::ModelParse {
            path: PathBuf::from("/models/value.json"),
            source,
        };
        assert!(err
            .to_string()
            .contains("/models/value.json is not a valid weight model"));
    }

    #[test]
    fn result_alias() {
        fn example() -> Result<u32> {
            Ok(7)
        }
        assert_eq!(example().unwrap(), 7);
    }
}
