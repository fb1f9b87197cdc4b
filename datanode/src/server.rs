//! DataNode RPC server.
//!
//! Exposes `BlockStore` over the same newline-delimited JSON protocol the
//! MDS uses. Stateless beyond the block files on disk, so there is no lock
//! to hold: distinct block ids touch disjoint files, and a same-id race
//! just makes the last rename win while readers still see a complete file.

use std::sync::Arc;

use aegisfs_common::framing::{Connection, Request};
use aegisfs_common::AegisError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use tokio::net::{TcpListener, ToSocketAddrs};

use crate::block_store::BlockStore;

pub async fn serve(addr: impl ToSocketAddrs, store: BlockStore) -> Result<(), AegisError> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, store).await
}

pub async fn serve_listener(listener: TcpListener, store: BlockStore) -> Result<(), AegisError> {
    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, "DataNode listening");

    let store = Arc::new(store);
    loop {
        let (stream, peer) = listener.accept().await?;
        let store = store.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, store).await {
                tracing::warn!(%peer, error = %e, "DataNode connection failed");
            }
        });
    }
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    store: Arc<BlockStore>,
) -> Result<(), AegisError> {
    let mut conn = Connection::new(stream);
    let req = conn.recv_request().await?;
    let resp = dispatch(&store, req);
    conn.send_value(&resp).await
}

fn dispatch(store: &BlockStore, req: Request) -> Value {
    match req.op.as_str() {
        "ping" => json!({"ok": true, "msg": "datanode_alive"}),

        "store_block" => match extract_block_and_data(&req.args) {
            Ok((block_id, data)) => match store.write_block(&block_id, &data) {
                Ok(()) => json!({"ok": true}),
                Err(e) => json!({"ok": false, "error": e.to_string()}),
            },
            Err(e) => json!({"ok": false, "error": e}),
        },

        "read_block" => match extract_block_id(&req.args) {
            Ok(block_id) => match store.read_block(&block_id) {
                Ok(Some(data)) => json!({"ok": true, "data_b64": BASE64.encode(data)}),
                Ok(None) => json!({"ok": false, "error": "not_found"}),
                Err(e) => json!({"ok": false, "error": e.to_string()}),
            },
            Err(e) => json!({"ok": false, "error": e}),
        },

        "delete_block" => match extract_block_id(&req.args) {
            Ok(block_id) => match store.delete_block(&block_id) {
                Ok(()) => json!({"ok": true}),
                Err(e) => json!({"ok": false, "error": e.to_string()}),
            },
            Err(e) => json!({"ok": false, "error": e}),
        },

        other => json!({"ok": false, "error": format!("unknown_op:{other}")}),
    }
}

fn extract_block_id(args: &Value) -> Result<String, String> {
    args.get("block_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| "missing_field:block_id".to_string())
}

fn extract_block_and_data(args: &Value) -> Result<(String, Vec<u8>), String> {
    let block_id = extract_block_id(args)?;
    let data_b64 = args
        .get("data_b64")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing_field:data_b64".to_string())?;
    let data = BASE64
        .decode(data_b64)
        .map_err(|e| format!("invalid_base64:{e}"))?;
    Ok((block_id, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpStream;

    async fn spawn_datanode() -> (std::net::SocketAddr, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let store = BlockStore::open(tmp.path()).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(store);
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(v) => v,
                    Err(_) => return,
                };
                let store = store.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, store).await;
                });
            }
        });
        (addr, tmp)
    }

    #[tokio::test]
    async fn store_then_read_round_trips_binary_safe() {
        let (addr, _tmp) = spawn_datanode().await;
        let bytes: Vec<u8> = (0u8..=255).collect();
        let encoded = BASE64.encode(&bytes);

        let mut put_conn = Connection::new(TcpStream::connect(addr).await.unwrap());
        put_conn
            .send_request("store_block", json!({"block_id": "b5", "data_b64": encoded}))
            .await
            .unwrap();
        assert_eq!(put_conn.recv_value().await.unwrap()["ok"], true);

        let mut get_conn = Connection::new(TcpStream::connect(addr).await.unwrap());
        get_conn
            .send_request("read_block", json!({"block_id": "b5"}))
            .await
            .unwrap();
        let resp = get_conn.recv_value().await.unwrap();
        let got = BASE64.decode(resp["data_b64"].as_str().unwrap()).unwrap();
        assert_eq!(got, bytes);
    }

    #[tokio::test]
    async fn read_missing_block_reports_not_found() {
        let (addr, _tmp) = spawn_datanode().await;
        let mut conn = Connection::new(TcpStream::connect(addr).await.unwrap());
        conn.send_request("read_block", json!({"block_id": "nope"}))
            .await
            .unwrap();
        let resp = conn.recv_value().await.unwrap();
        assert_eq!(resp["ok"], false);
        assert_eq!(resp["error"], "not_found");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (addr, _tmp) = spawn_datanode().await;
        let mut conn = Connection::new(TcpStream::connect(addr).await.unwrap());
        conn.send_request("delete_block", json!({"block_id": "never-stored"}))
            .await
            .unwrap();
        assert_eq!(conn.recv_value().await.unwrap()["ok"], true);
    }
}
