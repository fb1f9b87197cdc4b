//! Local block storage for a single DataNode.
//!
//! Blocks live as files under `data_dir`: `<block_id>.blk`. Writes go
//! through a temp file, fsync, then atomic rename, so a concurrent reader
//! always observes either the previous contents or the new ones, never a
//! truncated file. No checksums, no size limits beyond the OS.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use aegisfs_common::error::AegisError;

pub struct BlockStore {
    data_dir: PathBuf,
}

impl BlockStore {
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, AegisError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    fn block_path(&self, block_id: &str) -> PathBuf {
        self.data_dir.join(format!("{block_id}.blk"))
    }

    fn tmp_path(&self, block_id: &str) -> PathBuf {
        self.data_dir.join(format!("{block_id}.blk.tmp"))
    }

    pub fn write_block(&self, block_id: &str, data: &[u8]) -> Result<(), AegisError> {
        let tmp = self.tmp_path(block_id);
        {
            let mut f = File::create(&tmp)?;
            f.write_all(data)?;
            f.flush()?;
            f.sync_all()?;
        }
        std::fs::rename(&tmp, self.block_path(block_id))?;
        Ok(())
    }

    pub fn read_block(&self, block_id: &str) -> Result<Option<Vec<u8>>, AegisError> {
        match std::fs::read(self.block_path(block_id)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Idempotent: deleting a block that doesn't exist is not an error.
    pub fn delete_block(&self, block_id: &str) -> Result<(), AegisError> {
        match std::fs::remove_file(self.block_path(block_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_overwrite_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BlockStore::open(tmp.path()).unwrap();

        store.write_block("b1", b"hello").unwrap();
        assert_eq!(store.read_block("b1").unwrap().unwrap(), b"hello");

        store.write_block("b1", b"world").unwrap();
        assert_eq!(store.read_block("b1").unwrap().unwrap(), b"world");

        store.delete_block("b1").unwrap();
        assert!(store.read_block("b1").unwrap().is_none());
    }

    #[test]
    fn delete_of_missing_block_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BlockStore::open(tmp.path()).unwrap();
        store.delete_block("never-written").unwrap();
    }

    #[test]
    fn read_of_missing_block_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BlockStore::open(tmp.path()).unwrap();
        assert!(store.read_block("missing").unwrap().is_none());
    }

    #[test]
    fn replace_never_leaves_a_tmp_file_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BlockStore::open(tmp.path()).unwrap();
        store.write_block("b1", b"data").unwrap();
        assert!(!store.tmp_path("b1").exists());
        assert!(store.block_path("b1").exists());
    }
}
