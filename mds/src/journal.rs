//! Write-ahead logging for the Metadata Server.
//!
//! Implements an append-only JSONL journal with BEGIN / APPLY / COMMIT /
//! ABORT records. The journal is the durable source of truth for metadata
//! mutations; recovery (see `state.rs`) scans it and replays only
//! committed, non-aborted transactions.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use aegisfs_common::error::AegisError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JournalOp {
    Begin,
    Apply,
    Commit,
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalRecord {
    pub txid: u64,
    pub op: JournalOp,
    #[serde(default)]
    pub data: Value,
}

/// The payload of an APPLY record. Modeled as a tagged sum type rather than
/// an open map, per the polymorphic-payload design note: `action` selects
/// the variant on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ApplyPayload {
    Put { key: String, value: Value },
    Delete { key: String },
}

pub struct Journal {
    path: PathBuf,
    next_txid: u64,
}

impl Journal {
    /// Opens (or creates) the journal at `path`, scanning it to recover
    /// `next_txid` so that numbering stays strictly increasing across
    /// restarts.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AegisError> {
        let path = path.into();
        let mut journal = Self {
            path,
            next_txid: 1,
        };
        journal.init_txid_from_disk()?;
        Ok(journal)
    }

    fn init_txid_from_disk(&mut self) -> Result<(), AegisError> {
        if !self.path.exists() {
            return Ok(());
        }
        let max_txid = self
            .iter_records()?
            .into_iter()
            .map(|rec| rec.txid)
            .max()
            .unwrap_or(0);
        self.next_txid = max_txid + 1;
        Ok(())
    }

    pub fn new_txid(&mut self) -> u64 {
        let txid = self.next_txid;
        self.next_txid += 1;
        txid
    }

    pub fn append(&self, rec: &JournalRecord) -> Result<(), AegisError> {
        let mut line = serde_json::to_vec(rec)?;
        line.push(b'\n');
        let mut f = OpenOptions::new().create(true).append(true).open(&self.path)?;
        f.write_all(&line)?;
        f.flush()?;
        f.sync_all()?;
        Ok(())
    }

    /// Reads every complete, newline-terminated record in file order. A
    /// trailing line with no terminating `\n` (a crash mid-write) is
    /// dropped silently rather than treated as corruption; any terminated
    /// line that fails to parse is a fatal corruption signal.
    pub fn iter_records(&self) -> Result<Vec<JournalRecord>, AegisError> {
        read_records(&self.path)
    }

    /// Starts a new transaction for a high-level metadata op, logging
    /// `{"op": op_name, ...extra}` as the BEGIN payload. Returns the txid.
    pub fn begin(
        &mut self,
        op_name: &str,
        mut extra: serde_json::Map<String, Value>,
    ) -> Result<u64, AegisError> {
        let txid = self.new_txid();
        extra.insert("op".to_string(), Value::String(op_name.to_string()));
        self.append(&JournalRecord {
            txid,
            op: JournalOp::Begin,
            data: Value::Object(extra),
        })?;
        Ok(txid)
    }

    /// Logs a state change belonging to `txid`. Does not itself mutate the
    /// in-memory store; the caller is responsible for that.
    pub fn apply(&self, txid: u64, payload: ApplyPayload) -> Result<(), AegisError> {
        let data = serde_json::to_value(&payload)?;
        self.append(&JournalRecord {
            txid,
            op: JournalOp::Apply,
            data,
        })
    }

    pub fn commit(&self, txid: u64) -> Result<(), AegisError> {
        self.append(&JournalRecord {
            txid,
            op: JournalOp::Commit,
            data: Value::Object(Default::default()),
        })
    }

    #[allow(dead_code)]
    pub fn abort(&self, txid: u64) -> Result<(), AegisError> {
        self.append(&JournalRecord {
            txid,
            op: JournalOp::Abort,
            data: Value::Object(Default::default()),
        })
    }
}

fn read_records(path: &Path) -> Result<Vec<JournalRecord>, AegisError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    if content.is_empty() {
        return Ok(Vec::new());
    }

    let mut lines: Vec<&str> = content.split('\n').collect();
    // `split` always leaves a trailing element: "" when the file ends in a
    // newline, or the truncated tail of a crash-interrupted write when it
    // doesn't. Either way it isn't a complete record, so drop it.
    lines.pop();

    let mut records = Vec::with_capacity(lines.len());
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let rec: JournalRecord = serde_json::from_str(line)
            .map_err(|e| AegisError::CorruptJournal(e.to_string()))?;
        records.push(rec);
    }
    Ok(records)
}
