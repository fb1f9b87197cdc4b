//! High-level client for AegisFS.
//!
//! Holds the MDS and DataNode endpoints; every RPC opens a fresh TCP
//! connection, sends one message, awaits one reply, and closes. Ordering
//! is the whole contract here: a write stores every block before it
//! commits metadata, and a delete removes every block before it clears
//! metadata, so a crash mid-operation leaves orphans rather than dangling
//! references.

use aegisfs_common::framing::Connection;
use aegisfs_common::{AegisError, FileMeta, BLOCK_SIZE};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use uuid::Uuid;

pub struct AegisClient {
    mds_addr: String,
    dn_addr: String,
}

impl AegisClient {
    pub fn new(mds_addr: impl Into<String>, dn_addr: impl Into<String>) -> Self {
        Self {
            mds_addr: mds_addr.into(),
            dn_addr: dn_addr.into(),
        }
    }

    pub fn default_addrs() -> Self {
        Self::new("127.0.0.1:9000", "127.0.0.1:9101")
    }

    // ---------------------------------------------------------------
    // Low-level RPC helpers
    // ---------------------------------------------------------------

    async fn mds_rpc(&self, op: &str, args: Value) -> Result<Value, AegisError> {
        let mut conn = Connection::connect(self.mds_addr.as_str()).await?;
        conn.send_request(op, args).await?;
        conn.recv_value().await
    }

    async fn dn_rpc(&self, op: &str, args: Value) -> Result<Value, AegisError> {
        let mut conn = Connection::connect(self.dn_addr.as_str()).await?;
        conn.send_request(op, args).await?;
        conn.recv_value().await
    }

    fn mint_block_id() -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("b_{}", &hex[..8])
    }

    // ---------------------------------------------------------------
    // Metadata operations
    // ---------------------------------------------------------------

    pub async fn get_meta(&self, path: &str) -> Result<Option<FileMeta>, AegisError> {
        let resp = self.mds_rpc("get_meta", json!({"path": path})).await?;
        if !ok(&resp) {
            return Ok(None);
        }
        match resp.get("value") {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
        }
    }

    pub async fn put_meta(&self, path: &str, meta: &FileMeta) -> Result<(), AegisError> {
        let resp = self
            .mds_rpc("put_meta", json!({"path": path, "value": meta}))
            .await?;
        expect_ok(resp, "MDS put_meta failed")
    }

    pub async fn delete_meta(&self, path: &str) -> Result<(), AegisError> {
        let resp = self.mds_rpc("delete_meta", json!({"path": path})).await?;
        expect_ok(resp, "MDS delete_meta failed")
    }

    pub async fn list_files(&self) -> Result<Vec<String>, AegisError> {
        let resp = self.mds_rpc("list_meta", json!({})).await?;
        if !ok(&resp) {
            return Err(AegisError::Other(format!("MDS list_meta failed: {resp}")));
        }
        let paths = resp
            .get("paths")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Ok(paths)
    }

    // ---------------------------------------------------------------
    // Block operations
    // ---------------------------------------------------------------

    pub async fn store_block(&self, block_id: &str, data: &[u8]) -> Result<(), AegisError> {
        let resp = self
            .dn_rpc(
                "store_block",
                json!({"block_id": block_id, "data_b64": BASE64.encode(data)}),
            )
            .await?;
        expect_ok(resp, "DataNode store_block failed")
    }

    pub async fn read_block(&self, block_id: &str) -> Result<Option<Vec<u8>>, AegisError> {
        let resp = self
            .dn_rpc("read_block", json!({"block_id": block_id}))
            .await?;
        if !ok(&resp) {
            return Ok(None);
        }
        let data_b64 = resp
            .get("data_b64")
            .and_then(Value::as_str)
            .ok_or_else(|| AegisError::Other("DataNode read_block returned no data".to_string()))?;
        Ok(Some(BASE64.decode(data_b64).map_err(|e| {
            AegisError::Other(format!("invalid base64 from DataNode: {e}"))
        })?))
    }

    pub async fn delete_block(&self, block_id: &str) -> Result<(), AegisError> {
        let resp = self
            .dn_rpc("delete_block", json!({"block_id": block_id}))
            .await?;
        expect_ok(resp, "DataNode delete_block failed")
    }

    // ---------------------------------------------------------------
    // Multi-block file API
    // ---------------------------------------------------------------

    /// Chunks `data` into `BLOCK_SIZE` blocks, stores each one, then
    /// commits metadata. Block stores must all happen before the metadata
    /// commit; if any block store fails, previously written blocks become
    /// garbage (no rollback is performed — see the Garbage blocks design
    /// note).
    pub async fn write_bytes(
        &self,
        path: &str,
        data: &[u8],
        mime: Option<String>,
        filename: Option<String>,
    ) -> Result<(), AegisError> {
        let mut blocks = Vec::new();
        for chunk in data.chunks(BLOCK_SIZE) {
            let block_id = Self::mint_block_id();
            self.store_block(&block_id, chunk).await?;
            blocks.push(block_id);
        }

        let meta = FileMeta {
            blocks,
            size: data.len() as u64,
            mime,
            filename,
        };
        self.put_meta(path, &meta).await
    }

    /// Returns `None` if the path is absent, or if any referenced block is
    /// missing (a torn file).
    pub async fn read_bytes(&self, path: &str) -> Result<Option<Vec<u8>>, AegisError> {
        let meta = match self.get_meta(path).await? {
            Some(m) => m,
            None => return Ok(None),
        };

        if meta.blocks.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let mut out = Vec::with_capacity(meta.size as usize);
        for block_id in &meta.blocks {
            match self.read_block(block_id).await? {
                Some(bytes) => out.extend_from_slice(&bytes),
                None => return Ok(None),
            }
        }
        Ok(Some(out))
    }

    /// Deletes blocks before metadata, so a mid-iteration failure leaves
    /// orphan blocks rather than dangling metadata pointing at missing
    /// ones.
    pub async fn delete_file(&self, path: &str) -> Result<(), AegisError> {
        let meta = match self.get_meta(path).await? {
            Some(m) => m,
            None => return Ok(()),
        };

        for block_id in &meta.blocks {
            self.delete_block(block_id).await?;
        }

        self.delete_meta(path).await
    }

    // ---------------------------------------------------------------
    // Text helpers
    // ---------------------------------------------------------------

    pub async fn write_file(
        &self,
        path: &str,
        text: &str,
        mime: Option<String>,
        filename: Option<String>,
    ) -> Result<(), AegisError> {
        self.write_bytes(path, text.as_bytes(), mime, filename).await
    }

    /// Decode errors substitute the Unicode replacement character rather
    /// than failing the read.
    pub async fn read_file(&self, path: &str) -> Result<Option<String>, AegisError> {
        match self.read_bytes(path).await? {
            Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            None => Ok(None),
        }
    }
}

fn ok(resp: &Value) -> bool {
    resp.get("ok").and_then(Value::as_bool).unwrap_or(false)
}

fn expect_ok(resp: Value, context: &str) -> Result<(), AegisError> {
    if ok(&resp) {
        Ok(())
    } else {
        Err(AegisError::Other(format!("{context}: {resp}")))
    }
}
