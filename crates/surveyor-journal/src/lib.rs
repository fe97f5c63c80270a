//! # surveyor-journal
//!
//! Journal ingestion: typed events, line classification, and file reading.
//!
//! - **Events**: serde structs for the six journal event kinds the monitor
//!   consumes, plus [`classify`] to route raw lines.
//! - **Conversion**: [`scan_to_survey`] and the signal/genera aggregation
//!   helpers that turn events into survey records.
//! - **Reading**: journal file discovery ordered by modification time and
//!   [`JournalLines`], a tail-safe line reader.
//! - **Errors**: [`JournalError`] via `thiserror`.

#![deny(unsafe_code)]

pub mod convert;
pub mod errors;
pub mod events;
pub mod reader;

pub use convert::{biological_count, genera_summary, is_detailed_planet, scan_to_survey};
pub use errors::JournalError;
pub use events::{classify, EventKind, JournalEvent};
pub use reader::{catch_up_files, latest_file, JournalLines, JOURNAL_PATTERN};
