//! Live journal following: tail the newest file and hop on rotation.

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use surveyor_journal::{classify, latest_file, JournalLines};

use crate::errors::Result;
use crate::tracker::SystemTracker;

/// How often the loop re-polls for new lines and for rotation.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Tail the live journal until cancelled.
///
/// Starts at the end of the newest journal file, so backlog already
/// handled by replay is not applied twice. A newer file appearing means
/// the game rotated journals; the loop hops to it and reads it from the
/// start. Returns without flushing; that is the caller's shutdown step.
pub async fn follow(
    tracker: &SystemTracker,
    journal_dir: &Path,
    shutdown: &CancellationToken,
) -> Result<()> {
    let mut lines = match latest_file(journal_dir)? {
        Some(path) => {
            info!(file = %path.display(), "following live journal");
            Some(JournalLines::open_at_end(path).await?)
        }
        None => {
            info!("no journal files yet; waiting for the first one");
            None
        }
    };

    loop {
        if let Some(reader) = lines.as_mut() {
            while let Some(line) = reader.next().await? {
                if let Some(event) = classify(&line)? {
                    tracker.apply(event).await?;
                }
            }
        }

        let newest = latest_file(journal_dir)?;
        let rotated = match (&lines, &newest) {
            (Some(reader), Some(path)) => reader.path() != path.as_path(),
            (None, Some(_)) => true,
            _ => false,
        };
        if rotated {
            if let Some(path) = newest {
                info!(file = %path.display(), "journal rotated");
                lines = Some(JournalLines::open(path).await?);
                // drain the fresh file before sleeping
                continue;
            }
        }

        tokio::select! {
            () = shutdown.cancelled() => {
                debug!("follow loop stopped");
                return Ok(());
            }
            () = tokio::time::sleep(POLL_INTERVAL) => {}
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
