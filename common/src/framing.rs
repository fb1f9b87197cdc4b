//! Line-delimited JSON message framing shared by every RPC server and the
//! client. One JSON object per newline-terminated line; one request begets
//! exactly one response, then the connection closes.

use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::AegisError;

/// Wire shape of every request: `{"op": <name>, "args": <object>}`.
#[derive(Debug, Deserialize)]
pub struct Request {
    pub op: String,
    #[serde(default)]
    pub args: Value,
}

/// A single newline-delimited JSON connection, usable from either end.
pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        let (read_half, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer,
        }
    }

    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, AegisError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream))
    }

    /// Reads one line, stripping the trailing `\n`. Returns `Ok(None)` on a
    /// clean EOF before any bytes of the next message arrive.
    async fn recv_line(&mut self) -> Result<Option<String>, AegisError> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        if !line.ends_with('\n') {
            return Err(AegisError::Transport(
                "connection closed mid-message".to_string(),
            ));
        }
        line.truncate(line.trim_end_matches('\n').len());
        Ok(Some(line))
    }

    pub async fn recv_request(&mut self) -> Result<Request, AegisError> {
        let line = self
            .recv_line()
            .await?
            .ok_or_else(|| AegisError::Transport("connection closed mid-message".to_string()))?;
        serde_json::from_str(&line).map_err(AegisError::from)
    }

    pub async fn recv_value(&mut self) -> Result<Value, AegisError> {
        let line = self
            .recv_line()
            .await?
            .ok_or_else(|| AegisError::Transport("connection closed mid-message".to_string()))?;
        serde_json::from_str(&line).map_err(AegisError::from)
    }

    async fn send_line(&mut self, line: &str) -> Result<(), AegisError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub async fn send_value(&mut self, value: &Value) -> Result<(), AegisError> {
        let line = serde_json::to_string(value)?;
        self.send_line(&line).await
    }

    pub async fn send_request(&mut self, op: &str, args: Value) -> Result<(), AegisError> {
        self.send_value(&serde_json::json!({ "op": op, "args": args }))
            .await
    }
}
