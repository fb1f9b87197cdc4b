//! MDS State: journal + metadata store + recovery.
//!
//! On startup, any existing metadata snapshot is discarded and rebuilt
//! purely from committed, non-aborted journal transactions.

use std::collections::{HashMap, HashSet};

use aegisfs_common::error::AegisError;
use aegisfs_common::Config;
use serde_json::Value;

use crate::journal::{ApplyPayload, Journal, JournalOp};
use crate::metadata_store::MetadataStore;

pub struct MdsState {
    store: MetadataStore,
    journal: Journal,
}

impl MdsState {
    pub fn open(cfg: &Config) -> Result<Self, AegisError> {
        let journal = Journal::open(&cfg.journal_file)?;
        let store = MetadataStore::new(&cfg.metadata_file);
        let mut state = Self { store, journal };
        state.recover()?;
        Ok(state)
    }

    /// Rebuilds metadata from committed, non-aborted transactions only,
    /// then persists the rebuilt snapshot. ABORT wins over COMMIT: once
    /// aborted, a transaction must never take effect even if a COMMIT
    /// record also appears for it.
    fn recover(&mut self) -> Result<(), AegisError> {
        let mut applies: HashMap<u64, Vec<ApplyPayload>> = HashMap::new();
        let mut committed: HashSet<u64> = HashSet::new();
        let mut aborted: HashSet<u64> = HashSet::new();

        for rec in self.journal.iter_records()? {
            match rec.op {
                JournalOp::Apply => {
                    let payload: ApplyPayload = serde_json::from_value(rec.data)
                        .map_err(|e| AegisError::CorruptJournal(e.to_string()))?;
                    applies.entry(rec.txid).or_default().push(payload);
                }
                JournalOp::Commit => {
                    committed.insert(rec.txid);
                }
                JournalOp::Abort => {
                    aborted.insert(rec.txid);
                }
                JournalOp::Begin => {}
            }
        }

        self.store.clear();

        let mut durable_txids: Vec<u64> = committed.difference(&aborted).copied().collect();
        durable_txids.sort_unstable();

        for txid in durable_txids {
            for payload in applies.get(&txid).into_iter().flatten() {
                match payload {
                    ApplyPayload::Put { key, value } => self.store.put(key.clone(), value.clone()),
                    ApplyPayload::Delete { key } => self.store.delete(key),
                }
            }
        }

        self.store.save()
    }

    pub fn put_metadata(&mut self, path: String, value: Value) -> Result<(), AegisError> {
        let mut extra = serde_json::Map::new();
        extra.insert("path".to_string(), Value::String(path.clone()));
        let txid = self.journal.begin("put", extra)?;

        self.journal.apply(
            txid,
            ApplyPayload::Put {
                key: path.clone(),
                value: value.clone(),
            },
        )?;

        self.store.put(path, value);
        self.store.save()?;

        self.journal.commit(txid)
    }

    pub fn delete_metadata(&mut self, path: &str) -> Result<(), AegisError> {
        let mut extra = serde_json::Map::new();
        extra.insert("path".to_string(), Value::String(path.to_string()));
        let txid = self.journal.begin("delete", extra)?;

        self.journal.apply(
            txid,
            ApplyPayload::Delete {
                key: path.to_string(),
            },
        )?;

        self.store.delete(path);
        self.store.save()?;

        self.journal.commit(txid)
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.store.get(path)
    }

    pub fn list_paths(&self) -> Vec<String> {
        self.store.keys().cloned().collect()
    }
}
