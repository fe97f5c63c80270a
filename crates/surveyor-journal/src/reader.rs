//! Journal file discovery and line streaming.
//!
//! Discovery globs the journal directory and orders files by modification
//! time; the newest file is the live one the game is still appending to.
//! [`JournalLines`] reads complete lines only — a partial line at end of
//! file stays buffered until its newline arrives, so tailing a live file
//! never emits half-written JSON.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader, SeekFrom};

use crate::errors::{JournalError, Result};

/// Filename pattern journal files follow.
pub const JOURNAL_PATTERN: &str = "Journal*.log";

// ─────────────────────────────────────────────────────────────────────────────
// Discovery
// ─────────────────────────────────────────────────────────────────────────────

/// Journal files eligible for catch-up, oldest first.
///
/// Drops the newest file (the live journal belongs to the follow loop)
/// and anything not modified after `epoch`.
pub fn catch_up_files(dir: &Path, epoch: SystemTime) -> Result<Vec<PathBuf>> {
    let mut files = journal_files(dir)?;
    files.pop();
    files.retain(|(_, mtime)| *mtime > epoch);
    Ok(files.into_iter().map(|(path, _)| path).collect())
}

/// The most recently modified journal file, if any.
pub fn latest_file(dir: &Path) -> Result<Option<PathBuf>> {
    Ok(journal_files(dir)?.pop().map(|(path, _)| path))
}

/// All journal files under `dir` with their mtimes, oldest first.
fn journal_files(dir: &Path) -> Result<Vec<(PathBuf, SystemTime)>> {
    if !dir.is_dir() {
        return Err(JournalError::Io {
            path: dir.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "journal directory not found",
            ),
        });
    }

    let pattern = dir.join(JOURNAL_PATTERN).to_string_lossy().into_owned();
    let entries = glob::glob(&pattern).map_err(|source| JournalError::Pattern {
        pattern: pattern.clone(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            JournalError::Io {
                path,
                source: e.into_error(),
            }
        })?;
        let mtime = path
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|source| JournalError::Io {
                path: path.clone(),
                source,
            })?;
        files.push((path, mtime));
    }

    // Stable sort: equal mtimes keep the glob's alphabetical order.
    files.sort_by_key(|(_, mtime)| *mtime);
    Ok(files)
}

// ─────────────────────────────────────────────────────────────────────────────
// Line streaming
// ─────────────────────────────────────────────────────────────────────────────

/// Buffered reader yielding complete lines from one journal file.
pub struct JournalLines {
    path: PathBuf,
    reader: BufReader<File>,
    buf: Vec<u8>,
}

impl JournalLines {
    /// Open `path` positioned at the start.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path).await.map_err(|source| JournalError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            reader: BufReader::new(file),
            buf: Vec::new(),
        })
    }

    /// Open `path` positioned at its current end, for live following.
    pub async fn open_at_end(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let io_err = |source| JournalError::Io {
            path: path.clone(),
            source,
        };
        let mut file = File::open(&path).await.map_err(io_err)?;
        file.seek(SeekFrom::End(0)).await.map_err(io_err)?;
        Ok(Self {
            path,
            reader: BufReader::new(file),
            buf: Vec::new(),
        })
    }

    /// The file this reader is attached to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The next complete line, without its terminator.
    ///
    /// `None` means no complete line is available right now. On a file
    /// still being written that is "poll again later": a trailing partial
    /// line stays buffered and is completed by a later read.
    pub async fn next(&mut self) -> Result<Option<String>> {
        loop {
            let read = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .await
                .map_err(|source| JournalError::Io {
                    path: self.path.clone(),
                    source,
                })?;

            if self.buf.last() == Some(&b'\n') {
                let line = String::from_utf8_lossy(&self.buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_owned();
                self.buf.clear();
                return Ok(Some(line));
            }
            if read == 0 {
                return Ok(None);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
