//! Metadata Server TCP daemon.
//!
//! Accepts newline-delimited JSON requests, dispatches `ping` / `put_meta`
//! / `get_meta` / `delete_meta` / `list_meta`, and returns one response per
//! connection. Mutations are serialized behind a single mutex guarding the
//! whole `MdsState`, since each one is already I/O-heavy (two fsyncs plus a
//! snapshot rewrite) — a finer-grained design buys nothing here.

use std::sync::Arc;

use aegisfs_common::framing::{Connection, Request};
use aegisfs_common::AegisError;
use serde_json::{json, Value};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::Mutex;

use crate::state::MdsState;

pub async fn serve(addr: impl ToSocketAddrs, state: MdsState) -> Result<(), AegisError> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, state).await
}

pub async fn serve_listener(listener: TcpListener, state: MdsState) -> Result<(), AegisError> {
    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, "MDS listening");

    let state = Arc::new(Mutex::new(state));
    loop {
        let (stream, peer) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                tracing::warn!(%peer, error = %e, "MDS connection failed");
            }
        });
    }
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    state: Arc<Mutex<MdsState>>,
) -> Result<(), AegisError> {
    let mut conn = Connection::new(stream);
    let req = conn.recv_request().await?;
    let resp = dispatch(&state, req).await;
    conn.send_value(&resp).await
}

async fn dispatch(state: &Arc<Mutex<MdsState>>, req: Request) -> Value {
    match req.op.as_str() {
        "ping" => json!({"ok": true, "msg": "mds_alive"}),

        "put_meta" => match extract_path(&req.args) {
            Ok(path) => {
                let value = req.args.get("value").cloned().unwrap_or(Value::Null);
                let mut st = state.lock().await;
                match st.put_metadata(path, value) {
                    Ok(()) => json!({"ok": true}),
                    Err(e) => json!({"ok": false, "error": e.to_string()}),
                }
            }
            Err(e) => json!({"ok": false, "error": e}),
        },

        "get_meta" => match extract_path(&req.args) {
            Ok(path) => {
                let st = state.lock().await;
                let value = st.get(&path).cloned().unwrap_or(Value::Null);
                json!({"ok": true, "value": value})
            }
            Err(e) => json!({"ok": false, "error": e}),
        },

        "delete_meta" => match extract_path(&req.args) {
            Ok(path) => {
                let mut st = state.lock().await;
                match st.delete_metadata(&path) {
                    Ok(()) => json!({"ok": true}),
                    Err(e) => json!({"ok": false, "error": e.to_string()}),
                }
            }
            Err(e) => json!({"ok": false, "error": e}),
        },

        "list_meta" => {
            let st = state.lock().await;
            json!({"ok": true, "paths": st.list_paths()})
        }

        other => json!({"ok": false, "error": format!("unknown_op:{other}")}),
    }
}

fn extract_path(args: &Value) -> Result<String, String> {
    args.get("path")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| "missing_field:path".to_string())
}
