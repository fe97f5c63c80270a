//! Log-structured store backend.
//!
//! A single append-only record log plus an in-memory index of each key's
//! newest record. Durability comes from manifest checkpoints: `MANIFEST`
//! names the committed length of the log, and recovery replays exactly that
//! prefix, truncating whatever an interrupted run left behind. Compaction
//! rewrites one live record per key into a fresh log and renames it into
//! place.
//!
//! All engine state lives on a [`SerialExecutor`] worker, so reads, merges,
//! and checkpoints are naturally serialized.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use surveyor_core::{StarSystem, SystemAddress};
use surveyor_tasks::SerialExecutor;

use crate::codec::{self, LEN_PREFIX, MAX_RECORD_LEN};
use crate::errors::{Result, StoreError};
use crate::{known_hint, StoreConfig, SystemStore};

const LOG_FILE: &str = "data.log";
const MANIFEST_FILE: &str = "MANIFEST";
const MANIFEST_TMP: &str = "MANIFEST.tmp";
const COMPACT_TMP: &str = "data.log.compact";

/// Checkpoint descriptor published after each successful checkpoint.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    committed_len: u64,
    generation: u64,
    updated_at: DateTime<Utc>,
}

/// Location of a record's JSON payload within the log.
#[derive(Clone, Copy, Debug)]
struct RecordAt {
    offset: u64,
    len: u32,
}

fn io_at(path: &Path) -> impl Fn(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_owned(),
        source,
    }
}

/// Engine state owned by the executor worker.
struct KvState {
    dir: PathBuf,
    log_path: PathBuf,
    log: File,
    /// End of the log including unflushed appends.
    len: u64,
    /// Prefix of the log covered by the newest manifest.
    committed_len: u64,
    generation: u64,
    index: BTreeMap<SystemAddress, RecordAt>,
}

impl KvState {
    fn open(dir: PathBuf, reset: bool) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(io_at(&dir))?;
        if reset {
            Self::remove_artifacts(&dir)?;
            debug!(path = %dir.display(), "store artifacts reset");
        }

        let log_path = dir.join(LOG_FILE);
        let log = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&log_path)
            .map_err(io_at(&log_path))?;

        let mut state = Self {
            dir,
            log_path,
            log,
            len: 0,
            committed_len: 0,
            generation: 0,
            index: BTreeMap::new(),
        };

        match state.recover() {
            Ok(records) => {
                debug!(
                    records,
                    committed = state.committed_len,
                    generation = state.generation,
                    "log recovered"
                );
            }
            Err(e) => {
                warn!(error = %e, "log recovery failed; starting empty");
                state.start_empty()?;
                state.write_manifest()?;
            }
        }
        Ok(state)
    }

    /// Rebuild the index from the committed prefix of the log.
    ///
    /// A missing manifest means nothing was ever committed. Anything else
    /// that does not add up (short log, bad frame, undecodable payload) is
    /// an error; the caller discards the log in response.
    fn recover(&mut self) -> Result<usize> {
        let manifest_path = self.dir.join(MANIFEST_FILE);
        let raw = match fs::read(&manifest_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no manifest; starting empty");
                self.start_empty()?;
                return Ok(0);
            }
            Err(e) => return Err(io_at(&manifest_path)(e)),
        };
        let manifest: Manifest = serde_json::from_slice(&raw)?;
        self.generation = manifest.generation;
        self.committed_len = manifest.committed_len;

        let file_len = self.log.metadata().map_err(io_at(&self.log_path))?.len();
        if file_len < self.committed_len {
            return Err(StoreError::Frame {
                offset: file_len,
                detail: "log shorter than committed length".into(),
            });
        }

        self.log
            .seek(SeekFrom::Start(0))
            .map_err(io_at(&self.log_path))?;
        let mut reader = BufReader::new(&mut self.log);
        let mut pos = 0u64;
        let mut records = 0usize;
        while pos < self.committed_len {
            if pos + LEN_PREFIX as u64 > self.committed_len {
                return Err(StoreError::Frame {
                    offset: pos,
                    detail: "truncated length prefix".into(),
                });
            }
            let mut prefix = [0u8; LEN_PREFIX];
            reader.read_exact(&mut prefix).map_err(io_at(&self.log_path))?;
            let payload_len = u32::from_le_bytes(prefix);
            if payload_len > MAX_RECORD_LEN {
                return Err(StoreError::Frame {
                    offset: pos,
                    detail: format!("length prefix {payload_len} exceeds record limit"),
                });
            }
            let end = pos + LEN_PREFIX as u64 + u64::from(payload_len);
            if end > self.committed_len {
                return Err(StoreError::Frame {
                    offset: pos,
                    detail: "record runs past committed length".into(),
                });
            }
            let mut payload = vec![0u8; payload_len as usize];
            reader.read_exact(&mut payload).map_err(io_at(&self.log_path))?;
            let system = codec::decode_payload(&payload)?;
            self.index.insert(
                system.address,
                RecordAt {
                    offset: pos + LEN_PREFIX as u64,
                    len: payload_len,
                },
            );
            pos = end;
            records += 1;
        }
        drop(reader);

        if file_len > self.committed_len {
            self.log
                .set_len(self.committed_len)
                .map_err(io_at(&self.log_path))?;
            debug!(
                dropped = file_len - self.committed_len,
                "truncated uncommitted tail"
            );
        }
        self.len = self.committed_len;
        Ok(records)
    }

    /// Forget everything and truncate the log. Keeps `generation` so a
    /// later checkpoint does not reuse a published number.
    fn start_empty(&mut self) -> Result<()> {
        self.index.clear();
        self.len = 0;
        self.committed_len = 0;
        self.log.set_len(0).map_err(io_at(&self.log_path))?;
        Ok(())
    }

    fn remove_artifacts(dir: &Path) -> Result<()> {
        for name in [LOG_FILE, MANIFEST_FILE, MANIFEST_TMP, COMPACT_TMP] {
            let path = dir.join(name);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::Io { path, source: e }),
            }
        }
        Ok(())
    }

    fn read_payload(&mut self, at: RecordAt) -> Result<Vec<u8>> {
        self.log
            .seek(SeekFrom::Start(at.offset))
            .map_err(io_at(&self.log_path))?;
        let mut payload = vec![0u8; at.len as usize];
        self.log
            .read_exact(&mut payload)
            .map_err(io_at(&self.log_path))?;
        Ok(payload)
    }

    fn read_at(&mut self, at: RecordAt) -> Result<StarSystem> {
        let payload = self.read_payload(at)?;
        codec::decode_payload(&payload)
    }

    /// Append a record and point the index at it. Not yet durable; the
    /// next checkpoint commits it.
    fn append(&mut self, system: &StarSystem) -> Result<()> {
        let frame = codec::encode_record(system)?;
        self.log
            .seek(SeekFrom::Start(self.len))
            .map_err(io_at(&self.log_path))?;
        self.log.write_all(&frame).map_err(io_at(&self.log_path))?;
        self.index.insert(
            system.address,
            RecordAt {
                offset: self.len + LEN_PREFIX as u64,
                len: (frame.len() - LEN_PREFIX) as u32,
            },
        );
        self.len += frame.len() as u64;
        Ok(())
    }

    fn get(&mut self, address: SystemAddress, name_hint: Option<&str>) -> Result<StarSystem> {
        let Some(at) = self.index.get(&address).copied() else {
            return Ok(StarSystem::new(address, known_hint(name_hint)));
        };
        let mut system = self.read_at(at)?;
        if system.name_is_unknown() {
            if let Some(hint) = known_hint(name_hint) {
                system.name = Some(hint.to_owned());
                self.append(&system)?;
                debug!(address, name = hint, "backfilled system name");
            }
        }
        Ok(system)
    }

    fn merge_upsert(&mut self, candidate: StarSystem) -> Result<StarSystem> {
        let existing = match self.index.get(&candidate.address).copied() {
            Some(at) => self.read_at(at)?,
            None => StarSystem::with_address(candidate.address),
        };
        let merged = existing.merge(candidate);
        self.append(&merged)?;
        Ok(merged)
    }

    fn put(&mut self, system: StarSystem) -> Result<StarSystem> {
        self.append(&system)?;
        Ok(system)
    }

    fn write_manifest(&self) -> Result<()> {
        let manifest = Manifest {
            committed_len: self.committed_len,
            generation: self.generation,
            updated_at: Utc::now(),
        };
        let raw = serde_json::to_vec(&manifest)?;
        let tmp = self.dir.join(MANIFEST_TMP);
        let mut file = File::create(&tmp).map_err(io_at(&tmp))?;
        file.write_all(&raw).map_err(io_at(&tmp))?;
        file.sync_all().map_err(io_at(&tmp))?;
        drop(file);
        let manifest_path = self.dir.join(MANIFEST_FILE);
        fs::rename(&tmp, &manifest_path).map_err(io_at(&manifest_path))?;
        Ok(())
    }

    fn incremental_checkpoint(&mut self) -> Result<()> {
        self.log.sync_data().map_err(io_at(&self.log_path))?;
        self.committed_len = self.len;
        self.write_manifest()
    }

    /// Rewrite one live record per key into a fresh log and swap it in.
    fn full_checkpoint_with_compaction(&mut self) -> Result<()> {
        let entries: Vec<(SystemAddress, RecordAt)> =
            self.index.iter().map(|(a, at)| (*a, *at)).collect();

        let tmp = self.dir.join(COMPACT_TMP);
        let mut out = File::create(&tmp).map_err(io_at(&tmp))?;
        let mut new_index = BTreeMap::new();
        let mut pos = 0u64;
        for (address, at) in entries {
            let payload = self.read_payload(at)?;
            out.write_all(&(payload.len() as u32).to_le_bytes())
                .map_err(io_at(&tmp))?;
            out.write_all(&payload).map_err(io_at(&tmp))?;
            new_index.insert(
                address,
                RecordAt {
                    offset: pos + LEN_PREFIX as u64,
                    len: payload.len() as u32,
                },
            );
            pos += (LEN_PREFIX + payload.len()) as u64;
        }
        out.sync_all().map_err(io_at(&tmp))?;
        drop(out);

        fs::rename(&tmp, &self.log_path).map_err(io_at(&self.log_path))?;
        self.log = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.log_path)
            .map_err(io_at(&self.log_path))?;
        self.index = new_index;
        self.len = pos;
        self.committed_len = pos;
        self.generation += 1;
        self.write_manifest()?;
        debug!(
            records = self.index.len(),
            bytes = pos,
            generation = self.generation,
            "log compacted"
        );
        Ok(())
    }
}

/// Log-structured [`SystemStore`] backend.
pub struct KvStore {
    exec: SerialExecutor<KvState>,
}

impl KvStore {
    /// Open (or create) the store under `config.path`.
    ///
    /// Missing or corrupt checkpoint state downgrades to an empty store
    /// with a warning; an unusable path is an error.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let dir = config.path.clone();
        let reset = config.reset_on_start;
        let exec = SerialExecutor::spawn("kv-store", move || {
            KvState::open(dir, reset).map_err(Into::into)
        })?;
        exec.ready().await?;
        Ok(Self { exec })
    }
}

#[async_trait]
impl SystemStore for KvStore {
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

#[cfg(test)]
mod tests {
    use super::*;
    use surveyor_core::Survey;

    fn open_state(dir: &Path) -> KvState {
        KvState::open(dir.to_owned(), false).unwrap()
    }

    fn survey(sub_type: &str, count: i64) -> Survey {
        Survey {
            sub_type: sub_type.to_owned(),
            count,
            ..Survey::default()
        }
    }

    fn system_with_body(address: SystemAddress, body: &str, sub_type: &str) -> StarSystem {
        let mut system = StarSystem::with_address(address);
        system.update_body(body, survey(sub_type, 0));
        system
    }

    #[test]
    fn missing_key_seeds_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = open_state(dir.path());

        let named = state.get(5, Some("Sol")).unwrap();
        assert_eq!(named.known_name(), Some("Sol"));
        assert!(named.bodies.is_empty());

        let anonymous = state.get(6, None).unwrap();
        assert!(anonymous.name_is_unknown());
    }

    #[test]
    fn merge_upsert_is_left_biased_toward_stored() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = open_state(dir.path());

        state
            .merge_upsert(system_with_body(9, "2 a", "Icy body"))
            .unwrap();
        let mut late = StarSystem::with_address(9);
        late.update_body("2 a", survey("Rocky body", 3));
        let merged = state.merge_upsert(late).unwrap();

        assert_eq!(merged.bodies["2 a"].survey.sub_type, "Icy body");
        assert_eq!(merged.bodies["2 a"].survey.count, 3);
        assert_eq!(state.get(9, None).unwrap(), merged);
    }

    #[test]
    fn put_overwrites_instead_of_merging() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = open_state(dir.path());
        state
            .merge_upsert(system_with_body(9, "2 a", "Icy body"))
            .unwrap();

        let mut edited = state.get(9, None).unwrap();
        edited.remove_body("2 a");
        state.put(edited).unwrap();

        assert!(state.get(9, None).unwrap().bodies.is_empty());
    }

    #[test]
    fn name_backfill_is_written_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = open_state(dir.path());
        state
            .merge_upsert(system_with_body(9, "2 a", "Icy body"))
            .unwrap();

        let hinted = state.get(9, Some("Colonia")).unwrap();
        assert_eq!(hinted.known_name(), Some("Colonia"));
        state.incremental_checkpoint().unwrap();
        drop(state);

        let mut reopened = open_state(dir.path());
        assert_eq!(reopened.get(9, None).unwrap().known_name(), Some("Colonia"));
    }

    #[test]
    fn unknown_hint_is_not_backfilled() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = open_state(dir.path());
        state
            .merge_upsert(system_with_body(9, "2 a", "Icy body"))
            .unwrap();

        assert!(state.get(9, Some("")).unwrap().name_is_unknown());
        assert!(state.get(9, Some("Unknown")).unwrap().name_is_unknown());
    }

    #[test]
    fn recovery_reads_back_committed_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = open_state(dir.path());
        state
            .merge_upsert(system_with_body(1, "1", "Icy body"))
            .unwrap();
        state
            .merge_upsert(system_with_body(2, "4 c", "Rocky body"))
            .unwrap();
        state.incremental_checkpoint().unwrap();
        drop(state);

        let mut reopened = open_state(dir.path());
        assert_eq!(
            reopened.get(1, None).unwrap().bodies["1"].survey.sub_type,
            "Icy body"
        );
        assert_eq!(
            reopened.get(2, None).unwrap().bodies["4 c"].survey.sub_type,
            "Rocky body"
        );
    }

    #[test]
    fn uncommitted_tail_is_dropped_on_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = open_state(dir.path());
        state
            .merge_upsert(system_with_body(1, "1", "Icy body"))
            .unwrap();
        state.incremental_checkpoint().unwrap();
        let committed = state.committed_len;
        state
            .merge_upsert(system_with_body(2, "4 c", "Rocky body"))
            .unwrap();
        assert!(state.len > committed);
        drop(state);

        let mut reopened = open_state(dir.path());
        assert!(!reopened.get(1, None).unwrap().bodies.is_empty());
        assert!(reopened.get(2, None).unwrap().bodies.is_empty());
        let log_len = fs::metadata(dir.path().join(LOG_FILE)).unwrap().len();
        assert_eq!(log_len, committed);
    }

    #[test]
    fn missing_manifest_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = open_state(dir.path());
        state
            .merge_upsert(system_with_body(1, "1", "Icy body"))
            .unwrap();
        drop(state);

        let mut reopened = open_state(dir.path());
        assert!(reopened.get(1, None).unwrap().bodies.is_empty());
        assert_eq!(
            fs::metadata(dir.path().join(LOG_FILE)).unwrap().len(),
            0
        );
    }

    #[test]
    fn corrupt_manifest_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = open_state(dir.path());
        state
            .merge_upsert(system_with_body(1, "1", "Icy body"))
            .unwrap();
        state.incremental_checkpoint().unwrap();
        drop(state);

        fs::write(dir.path().join(MANIFEST_FILE), b"not json").unwrap();
        let mut reopened = open_state(dir.path());
        assert!(reopened.get(1, None).unwrap().bodies.is_empty());
        assert_eq!(
            fs::metadata(dir.path().join(LOG_FILE)).unwrap().len(),
            0
        );
    }

    #[test]
    fn corrupt_record_in_committed_range_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = open_state(dir.path());
        state
            .merge_upsert(system_with_body(1, "1", "Icy body"))
            .unwrap();
        state.incremental_checkpoint().unwrap();
        drop(state);

        let mut log = OpenOptions::new()
            .write(true)
            .open(dir.path().join(LOG_FILE))
            .unwrap();
        log.seek(SeekFrom::Start(LEN_PREFIX as u64)).unwrap();
        log.write_all(b"XXXX").unwrap();
        drop(log);

        let mut reopened = open_state(dir.path());
        assert!(reopened.get(1, None).unwrap().bodies.is_empty());
    }

    #[test]
    fn oversized_length_prefix_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = serde_json::json!({
            "committedLen": 8,
            "generation": 0,
            "updatedAt": "2026-08-16T00:00:00Z",
        });
        fs::write(
            dir.path().join(MANIFEST_FILE),
            serde_json::to_vec(&manifest).unwrap(),
        )
        .unwrap();
        let mut log = vec![];
        log.extend_from_slice(&u32::MAX.to_le_bytes());
        log.extend_from_slice(&[0; 4]);
        fs::write(dir.path().join(LOG_FILE), &log).unwrap();

        let mut state = open_state(dir.path());
        assert!(state.get(1, None).unwrap().bodies.is_empty());
        assert_eq!(
            fs::metadata(dir.path().join(LOG_FILE)).unwrap().len(),
            0
        );
    }

    #[test]
    fn compaction_keeps_latest_and_shrinks_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = open_state(dir.path());
        for count in 1..=5 {
            let mut candidate = StarSystem::with_address(9);
            candidate.update_body("2 a", survey("Icy body", count));
            state.merge_upsert(candidate).unwrap();
        }
        state.incremental_checkpoint().unwrap();
        let before = fs::metadata(dir.path().join(LOG_FILE)).unwrap().len();

        state.full_checkpoint_with_compaction().unwrap();
        let after = fs::metadata(dir.path().join(LOG_FILE)).unwrap().len();
        assert!(after < before, "compaction should shrink {before} -> {after}");
        assert_eq!(state.generation, 1);
        assert_eq!(state.committed_len, after);

        // first write wins for count, so 1 survives all five merges
        assert_eq!(state.get(9, None).unwrap().bodies["2 a"].survey.count, 1);
    }

    #[test]
    fn compaction_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = open_state(dir.path());
        state
            .merge_upsert(system_with_body(1, "1", "Icy body"))
            .unwrap();
        state
            .merge_upsert(system_with_body(2, "4 c", "Rocky body"))
            .unwrap();
        state.full_checkpoint_with_compaction().unwrap();
        drop(state);

        let mut reopened = open_state(dir.path());
        assert_eq!(reopened.generation, 1);
        assert_eq!(
            reopened.get(1, None).unwrap().bodies["1"].survey.sub_type,
            "Icy body"
        );
        assert_eq!(
            reopened.get(2, None).unwrap().bodies["4 c"].survey.sub_type,
            "Rocky body"
        );
    }

    #[test]
    fn reset_on_start_clears_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = open_state(dir.path());
        state
            .merge_upsert(system_with_body(1, "1", "Icy body"))
            .unwrap();
        state.incremental_checkpoint().unwrap();
        drop(state);

        let mut reset = KvState::open(dir.path().to_owned(), true).unwrap();
        assert!(reset.get(1, None).unwrap().bodies.is_empty());
    }

    // -- async surface --

    #[tokio::test]
    async fn concurrent_merges_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            backend: crate::StoreBackend::Kv,
            path: dir.path().to_owned(),
            ..StoreConfig::default()
        };
        let store = std::sync::Arc::new(KvStore::open(&config).await.unwrap());

        let mut handles = vec![];
        for body in ["1", "2", "3", "4"] {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .merge_upsert(system_with_body(77, body, "Icy body"))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let system = store.get(77, None).await.unwrap();
        assert_eq!(system.bodies.len(), 4);
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_commits_pending_writes() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            backend: crate::StoreBackend::Kv,
            path: dir.path().to_owned(),
            ..StoreConfig::default()
        };
        let store = KvStore::open(&config).await.unwrap();
        store
            .merge_upsert(system_with_body(1, "1", "Icy body"))
            .await
            .unwrap();
        store.shutdown().await.unwrap();

        let store = KvStore::open(&config).await.unwrap();
        let system = store.get(1, None).await.unwrap();
        assert_eq!(system.bodies["1"].survey.sub_type, "Icy body");
        store.shutdown().await.unwrap();
    }
}
