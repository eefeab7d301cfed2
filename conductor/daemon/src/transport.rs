//! JSON Line Output
//!
//! The daemon has no renderer attached, so transport messages are written
//! as JSON lines next to the command replies. A [`LineWriter`] serializes
//! writers so lines from the dispatcher and the command loop never
//! interleave.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use output_core::{OutputChannel, OutputTransport};

/// Serialized newline-delimited JSON writer
pub struct LineWriter {
    out: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl LineWriter {
    /// Wrap an async writer
    pub fn new(out: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    /// Write one value as a single line
    pub async fn write_json(&self, value: &impl Serialize) -> anyhow::Result<()> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');

        let mut out = self.out.lock().await;
        out.write_all(&line).await?;
        out.flush().await?;
        Ok(())
    }
}

impl std::fmt::Debug for LineWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineWriter").finish_non_exhaustive()
    }
}

/// Output transport writing every message as a JSON line
#[derive(Debug)]
pub struct JsonLineTransport {
    writer: std::sync::Arc<LineWriter>,
}

impl JsonLineTransport {
    /// Create a transport on a shared writer
    pub fn new(writer: std::sync::Arc<LineWriter>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl OutputTransport for JsonLineTransport {
    async fn send(
        &self,
        channel: OutputChannel,
        path: &str,
        payload: serde_json::Value,
    ) -> anyhow::Result<()> {
        self.writer
            .write_json(&json!({
                "channel": channel,
                "path": path,
                "payload": payload,
            }))
            .await
    }
}
