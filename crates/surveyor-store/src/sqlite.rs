//! SQLite store backend.
//!
//! One `systems` table, one JSON document per row. The connection lives on
//! the [`SerialExecutor`] worker thread because a rusqlite `Connection` must
//! not be shared across threads; WAL mode gives cheap incremental
//! checkpoints (`wal_checkpoint(PASSIVE)`) and the full variant truncates
//! the WAL and vacuums.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, trace, warn};

use surveyor_core::{StarSystem, SystemAddress};
use surveyor_tasks::SerialExecutor;

use crate::errors::{Result, StoreError};
use crate::{known_hint, StoreConfig, SystemStore};

const DB_FILE: &str = "surveyor.db";

const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;
"#;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS systems (
    address INTEGER PRIMARY KEY,
    name TEXT,
    doc TEXT NOT NULL,
    updated_at TEXT
);
"#;

const UPSERT: &str = "INSERT INTO systems (address, name, doc, updated_at) VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(address) DO UPDATE SET
         name = excluded.name, doc = excluded.doc, updated_at = excluded.updated_at";

/// `path` plus a literal suffix, for the `-wal`/`-shm` companions.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

fn remove_db_files(path: &Path) -> Result<()> {
    for target in [path.to_owned(), sibling(path, "-wal"), sibling(path, "-shm")] {
        match fs::remove_file(&target) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StoreError::Io {
                    path: target,
                    source: e,
                })
            }
        }
    }
    Ok(())
}

fn is_corrupt(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if matches!(
            e.code,
            rusqlite::ErrorCode::DatabaseCorrupt | rusqlite::ErrorCode::NotADatabase
        )
    )
}

fn open_checked(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(PRAGMAS)?;
    conn.execute_batch(CREATE_TABLES)?;
    Ok(conn)
}

fn write_doc(conn: &Connection, system: &StarSystem) -> Result<()> {
    let doc = serde_json::to_string(system)?;
    conn.execute(
        UPSERT,
        rusqlite::params![
            system.address as i64,
            system.known_name(),
            doc,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Engine state owned by the executor worker.
struct SqliteState {
    conn: Connection,
}

impl SqliteState {
    fn open(dir: PathBuf, reset: bool) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        let path = dir.join(DB_FILE);
        if reset {
            remove_db_files(&path)?;
            debug!(path = %path.display(), "store artifacts reset");
        }

        let conn = match open_checked(&path) {
            Ok(conn) => conn,
            Err(e) if is_corrupt(&e) => {
                warn!(path = %path.display(), error = %e, "database corrupt; recreating");
                remove_db_files(&path)?;
                open_checked(&path)?
            }
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), "database opened");
        Ok(Self { conn })
    }

    fn get(&mut self, address: SystemAddress, name_hint: Option<&str>) -> Result<StarSystem> {
        let doc: Option<String> = self
            .conn
            .query_row(
                "SELECT doc FROM systems WHERE address = ?1",
                [address as i64],
                |row| row.get(0),
            )
            .optional()?;
        let Some(doc) = doc else {
            return Ok(StarSystem::new(address, known_hint(name_hint)));
        };
        let mut system: StarSystem = serde_json::from_str(&doc)?;
        if system.name_is_unknown() {
            if let Some(hint) = known_hint(name_hint) {
                system.name = Some(hint.to_owned());
                write_doc(&self.conn, &system)?;
                debug!(address, name = hint, "backfilled system name");
            }
        }
        Ok(system)
    }

    /// Read-merge-write inside one transaction. Any failure drops the
    /// transaction, which rolls it back.
    fn merge_upsert(&mut self, candidate: StarSystem) -> Result<StarSystem> {
        let tx = self.conn.transaction()?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT doc FROM systems WHERE address = ?1",
                [candidate.address as i64],
                |row| row.get(0),
            )
            .optional()?;
        let existing = match existing {
            Some(doc) => serde_json::from_str(&doc)?,
            None => StarSystem::with_address(candidate.address),
        };
        let merged = existing.merge(candidate);
        write_doc(&tx, &merged)?;
        tx.commit()?;
        Ok(merged)
    }

    fn put(&mut self, system: StarSystem) -> Result<StarSystem> {
        write_doc(&self.conn, &system)?;
        Ok(system)
    }

    fn incremental_checkpoint(&mut self) -> Result<()> {
        let (busy, log, checkpointed): (i64, i64, i64) = self.conn.query_row(
            "PRAGMA wal_checkpoint(PASSIVE)",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        trace!(busy, log, checkpointed, "wal checkpoint (passive)");
        Ok(())
    }

    fn full_checkpoint_with_compaction(&mut self) -> Result<()> {
        let (busy, log, checkpointed): (i64, i64, i64) = self.conn.query_row(
            "PRAGMA wal_checkpoint(TRUNCATE)",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        self.conn.execute_batch("VACUUM;")?;
        trace!(busy, log, checkpointed, "wal checkpoint (truncate) + vacuum");
        Ok(())
    }
}

/// SQLite-backed [`SystemStore`].
pub struct SqliteStore {
    exec: SerialExecutor<SqliteState>,
}

impl SqliteStore {
    /// Open (or create) `surveyor.db` under `config.path`.
    ///
    /// A corrupt database file is removed and recreated with a warning;
    /// any other open failure is an error.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let dir = config.path.clone();
        let reset = config.reset_on_start;
        let exec = SerialExecutor::spawn("sqlite-store", move || {
            SqliteState::open(dir, reset).map_err(Into::into)
        })?;
        exec.ready().await?;
        Ok(Self { exec })
    }
}

#[async_trait]
impl SystemStore for SqliteStore {
    async fn get(&self, address: SystemAddress, name_hint: Option<&str>) -> Result<StarSystem> {
        let hint = name_hint.map(str::to_owned);
        self.exec
            .submit(move |state| state.get(address, hint.as_deref()))
            .await?
    }

    async fn merge_upsert(&self, candidate: StarSystem) -> Result<StarSystem> {
        self.exec
            .submit(move |state| state.merge_upsert(candidate))
            .await?
    }

    async fn put(&self, system: StarSystem) -> Result<StarSystem> {
        self.exec.submit(move |state| state.put(system)).await?
    }

    async fn take_incremental_checkpoint(&self) -> Result<()> {
        self.exec
            .submit(|state| state.incremental_checkpoint())
            .await?
    }

    async fn take_full_checkpoint_with_compaction(&self) -> Result<()> {
        self.exec
            .submit(|state| state.full_checkpoint_with_compaction())
            .await?
    }

    async fn shutdown(&self) -> Result<()> {
        let checkpoint = self
            .exec
            .submit(|state| state.incremental_checkpoint())
            .await;
        self.exec.shutdown().await;
        checkpoint??;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
