//! Control Loop
//!
//! Reads newline-delimited [`ControlCommand`]s, applies each one to the
//! [`OutputConductor`] and writes a [`CommandReply`] line for it.
//!
//! ```text
//!   stdin ──lines──▶ ControlServer ──▶ OutputConductor ──events──▶ EffectDispatcher
//!                         │                                              │
//!                         └────────── replies ──▶ LineWriter ◀── transport┘
//! ```
//!
//! Malformed lines are answered with an error reply and the loop keeps
//! going. The loop ends at end of input or when the shutdown future
//! resolves.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use output_core::OutputConductor;

use crate::commands::{CommandReply, ControlCommand};
use crate::transport::LineWriter;

/// Counters of a control session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Commands applied
    pub applied: u64,
    /// Lines that were not valid commands
    pub rejected: u64,
}

/// Applies control commands to a conductor
pub struct ControlServer {
    conductor: OutputConductor,
    replies: Arc<LineWriter>,
}

impl ControlServer {
    /// Create a control server
    pub fn new(conductor: OutputConductor, replies: Arc<LineWriter>) -> Self {
        Self { conductor, replies }
    }

    /// Handle one input line
    ///
    /// Returns `None` for blank lines.
    pub fn handle_line(&self, line: &str) -> Option<CommandReply> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let reply = match serde_json::from_str::<ControlCommand>(line) {
            Ok(command) => {
                debug!(command = command.name(), "Applying command");
                command.apply(&self.conductor)
            }
            Err(e) => {
                warn!(error = %e, "Invalid command line");
                CommandReply::Error {
                    message: format!("invalid command: {e}"),
                }
            }
        };
        Some(reply)
    }

    /// Process lines until end of input or shutdown
    ///
    /// # Errors
    ///
    /// Returns read errors of the input and write errors of the reply
    /// output.
    pub async fn run<R>(&self, input: R, shutdown: impl Future<Output = ()>) -> Result<SessionStats>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut stats = SessionStats::default();
        tokio::pin!(shutdown);

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            };
            let Some(line) = line else {
                info!("End of control input");
                break;
            };

            let Some(reply) = self.handle_line(&line) else {
                continue;
            };
            if matches!(reply, CommandReply::Error { .. }) {
                stats.rejected += 1;
            } else {
                stats.applied += 1;
            }
            self.replies.write_json(&reply).await?;
        }

        info!(
            applied = stats.applied,
            rejected = stats.rejected,
            "Control session finished"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use output_core::{InMemoryShowStore, OutputConfig};
    use tokio::io::{AsyncReadExt, BufReader};
    use tokio::sync::mpsc;

    use super::*;

    fn server(writer: Arc<LineWriter>) -> ControlServer {
        let (tx, _rx) = mpsc::unbounded_channel();
        let conductor = OutputConductor::new(
            OutputConfig::default(),
            Arc::new(InMemoryShowStore::default()),
            tx,
        );
        ControlServer::new(conductor, writer)
    }

    #[tokio::test]
    async fn test_session_replies_per_line() {
        let input = concat!(
            "{\"command\":\"add_output\"}\n",
            "\n",
            "not json\n",
            "{\"command\":\"summary\"}\n",
        );
        let (mut client, out) = tokio::io::duplex(16 * 1024);
        let server = server(Arc::new(LineWriter::new(out)));

        let stats = server
            .run(BufReader::new(input.as_bytes()), std::future::pending())
            .await
            .unwrap();
        assert_eq!(
            stats,
            SessionStats {
                applied: 2,
                rejected: 1
            }
        );
        drop(server);

        let mut text = String::new();
        client.read_to_string(&mut text).await.unwrap();
        let replies: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["reply"], "created");
        assert_eq!(replies[1]["reply"], "error");
        assert_eq!(replies[2]["summary"]["totalOutputs"], 2);
    }

    #[tokio::test]
    async fn test_shutdown_stops_session() {
        let (_client, out) = tokio::io::duplex(1024);
        let server = server(Arc::new(LineWriter::new(out)));
        let (_keep_open, input) = tokio::io::duplex(1024);

        let stats = server
            .run(BufReader::new(input), async {})
            .await
            .unwrap();
        assert_eq!(stats, SessionStats::default());
    }
}
