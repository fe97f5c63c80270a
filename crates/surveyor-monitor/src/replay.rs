//! Backlog replay: drain historical journal files into the tracker.

use std::path::Path;
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use surveyor_journal::{catch_up_files, classify, JournalLines};

use crate::errors::Result;
use crate::tracker::SystemTracker;

/// Replay every journal file modified after `epoch`, oldest first.
///
/// The newest file is left alone; it is the live journal and belongs to
/// the follow loop. Cancellation is honored between files, and whatever
/// was applied before the cut-off is flushed either way.
pub async fn prime(
    tracker: &SystemTracker,
    journal_dir: &Path,
    epoch: SystemTime,
    shutdown: &CancellationToken,
) -> Result<()> {
    let files = catch_up_files(journal_dir, epoch)?;
    info!(files = files.len(), "replaying journal backlog");

    for path in files {
        if shutdown.is_cancelled() {
            debug!("backlog replay cancelled");
            break;
        }
        replay_file(tracker, &path).await?;
    }

    tracker.flush().await
}

/// Apply every classifiable line of one journal file.
async fn replay_file(tracker: &SystemTracker, path: &Path) -> Result<()> {
    let mut lines = JournalLines::open(path).await?;
    let mut applied = 0usize;
    while let Some(line) = lines.next().await? {
        if let Some(event) = classify(&line)? {
            tracker.apply(event).await?;
            applied += 1;
        }
    }
    debug!(file = %path.display(), applied, "journal file replayed");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
