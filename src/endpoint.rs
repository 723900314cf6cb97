//! Store endpoint seam
//!
//! The migration core only ever talks to a store through [`Endpoint`]:
//! one pipelined command channel, plus INFO and SCAN helpers built on top
//! of it. [`Connection`] is the network implementation; the test-only
//! `memory::MemoryEndpoint` is the in-process one.

use async_trait::async_trait;
use bytes::Bytes;

use redis_cp_core::client::{Connection, ServerInfo};
use redis_cp_core::protocol::{Command, Frame};
use redis_cp_core::{CopyError, Result};

/// One page of a SCAN iteration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next call; `0` once the iteration is complete
    pub cursor: u64,
    /// Keys returned by this page (possibly none)
    pub keys: Vec<Bytes>,
}

/// A handle the migration core can issue store commands against
#[async_trait]
pub trait Endpoint: Send {
    /// Send all commands in one round trip; replies come back in order.
    ///
    /// Error replies occupy their slot as [`Frame::Error`]. An `Err` means
    /// the round trip itself failed and nothing about the batch is known.
    async fn pipeline(&mut self, commands: &[Command]) -> Result<Vec<Frame>>;

    /// Send a single command
    async fn query(&mut self, command: &Command) -> Result<Frame> {
        let mut replies = self.pipeline(std::slice::from_ref(command)).await?;
        replies
            .pop()
            .ok_or_else(|| CopyError::Protocol(format!("no reply to {}", command.name())))
    }

    /// Fetch server metadata
    async fn info(&mut self) -> Result<ServerInfo> {
        let reply = self.query(&Command::new("INFO")).await?;
        ServerInfo::from_reply(reply)
    }

    /// Fetch one SCAN page of keys matching `pattern`
    async fn scan(&mut self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage> {
        let command = Command::new("SCAN")
            .arg(cursor.to_string())
            .arg("MATCH")
            .arg(pattern.to_string())
            .arg("COUNT")
            .arg(count.to_string());
        let reply = self.query(&command).await?;
        parse_scan_reply(reply)
    }
}

#[async_trait]
impl Endpoint for Connection {
    async fn pipeline(&mut self, commands: &[Command]) -> Result<Vec<Frame>> {
        Connection::pipeline(self, commands).await
    }
}

/// Decode a `SCAN` reply: `[cursor, [key, ...]]`
pub fn parse_scan_reply(reply: Frame) -> Result<ScanPage> {
    if let Some(message) = reply.error_message() {
        return Err(CopyError::server("SCAN", message));
    }
    let malformed = || CopyError::Protocol("malformed SCAN reply".to_string());

    let mut parts = reply.into_array().ok_or_else(malformed)?.into_iter();
    let (Some(cursor), Some(keys), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(malformed());
    };

    let cursor = cursor
        .as_str()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(malformed)?;
    let keys = keys
        .into_array()
        .ok_or_else(malformed)?
        .into_iter()
        .map(|k| k.into_bytes().ok_or_else(malformed))
        .collect::<Result<Vec<_>>>()?;

    Ok(ScanPage { cursor, keys })
}
