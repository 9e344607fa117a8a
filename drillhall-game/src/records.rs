//! Run records and their append-only store
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

use crate::SlotStorage;
use crate::constants::RECORDS_SLOT;
use crate::rank::RunResult;
use crate::stats::CoreStats;

/// Immutable summary written when a run ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub final_stats: CoreStats,
    pub total_turns: u32,
    #[serde(default)]
    pub loops_cleared: u32,
    #[serde(default)]
    pub seed: u64,
    pub timestamp: DateTime<Utc>,
    pub rank: String,
    pub result: RunResult,
    /// Fingerprint of the catalogs and rules the run was played under.
    #[serde(default)]
    pub ruleset: u64,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("slot I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Slots kept in memory; clones share the same backing map.
#[derive(Debug, Clone, Default)]
pub struct MemorySlots {
    slots: Rc<RefCell<HashMap<String, String>>>,
}

impl MemorySlots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.slots.borrow().get(key).cloned()
    }

    pub fn put_raw(&self, key: &str, payload: &str) {
        self.slots
            .borrow_mut()
            .insert(key.to_string(), payload.to_string());
    }
}

impl SlotStorage for MemorySlots {
    type Error = Infallible;

    fn read_slot(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.raw(key))
    }

    fn write_slot(&self, key: &str, payload: &str) -> Result<(), Self::Error> {
        self.put_raw(key, payload);
        Ok(())
    }
}

/// One `<slot>.json` file per slot under a directory.
#[derive(Debug, Clone)]
pub struct FileSlots {
    dir: PathBuf,
}

impl FileSlots {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SlotStorage for FileSlots {
    type Error = StorageError;

    fn read_slot(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let path = self.slot_path(key);
        match fs::read_to_string(&path) {
            Ok(payload) => Ok(Some(payload)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn write_slot(&self, key: &str, payload: &str) -> Result<(), Self::Error> {
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.slot_path(key);
        fs::write(&path, payload).map_err(|source| StorageError::Io { path, source })
    }
}

/// Append-only record history mirrored into a single storage slot.
#[derive(Debug)]
pub struct RecordStore<S: SlotStorage> {
    storage: S,
    records: Vec<Record>,
}

impl<S: SlotStorage> RecordStore<S> {
    /// Read the history once. Missing or unreadable payloads start empty.
    pub fn open(storage: S) -> Self {
        let records = match storage.read_slot(RECORDS_SLOT) {
            Ok(Some(payload)) => match serde_json::from_str::<Vec<Record>>(&payload) {
                Ok(records) => records,
                Err(err) => {
                    log::warn!("discarding corrupt record history in {RECORDS_SLOT}: {err}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                log::warn!("record history unavailable, starting empty: {err}");
                Vec::new()
            }
        };
        log::debug!("record store opened with {} entries", records.len());
        Self { storage, records }
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.records
            .iter()
            .map(|record| record.id)
            .max()
            .map_or(1, |id| id.saturating_add(1))
    }

    /// Assign the next id, keep the record and rewrite the slot.
    pub fn append(&mut self, mut record: Record) -> &Record {
        record.id = self.next_id();
        self.records.push(record);
        self.persist();
        let last = self.records.len() - 1;
        &self.records[last]
    }

    fn persist(&self) {
        let payload = match serde_json::to_string(&self.records) {
            Ok(payload) => payload,
            Err(err) => {
                log::error!("failed to encode record history: {err}");
                return;
            }
        };
        if let Err(err) = self.storage.write_slot(RECORDS_SLOT, &payload) {
            log::error!("failed to persist record history: {err}");
        }
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }
}
