//! In-memory path → metadata mapping, snapshotted to a single on-disk JSON
//! file. The snapshot is a best-effort cache, not an authority: the journal
//! is what makes mutations durable (see `journal.rs` / `state.rs`).

use std::collections::HashMap;
use std::path::PathBuf;

use aegisfs_common::error::AegisError;
use serde_json::Value;

pub struct MetadataStore {
    path: PathBuf,
    meta: HashMap<String, Value>,
}

impl MetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            meta: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<(), AegisError> {
        if self.path.exists() {
            let text = std::fs::read_to_string(&self.path)?;
            self.meta = serde_json::from_str(&text)?;
        } else {
            self.meta.clear();
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), AegisError> {
        let text = serde_json::to_string_pretty(&self.meta)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    pub fn put(&mut self, key: String, value: Value) {
        self.meta.insert(key, value);
    }

    pub fn delete(&mut self, key: &str) {
        self.meta.remove(key);
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.meta.keys()
    }

    pub fn clear(&mut self) {
        self.meta.clear();
    }
}
