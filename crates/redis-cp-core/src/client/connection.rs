//! Pipelined RESP connection over TCP

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use super::ServerInfo;
use crate::config::EndpointAddr;
use crate::error::{CopyError, Result};
use crate::protocol::{parse_frame_with_limits, Command, Frame, ParserLimits};

/// A connection to one store endpoint
///
/// Commands are encoded into an outgoing buffer and written once per round
/// trip, so a pipeline of N commands costs a single write and then N
/// reads, with replies returned in issuance order.
pub struct Connection {
    addr: EndpointAddr,
    stream: TcpStream,
    outgoing: BytesMut,
    buffer: BytesMut,
    limits: ParserLimits,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("addr", &self.addr)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

impl Connection {
    /// Connect, authenticate if a password is given, and select the database
    pub async fn connect(addr: &EndpointAddr, password: Option<&str>) -> Result<Self> {
        debug!(%addr, "connecting");
        let stream = TcpStream::connect((addr.host.as_str(), addr.port))
            .await
            .map_err(|e| CopyError::Connection(format!("{}:{}: {}", addr.host, addr.port, e)))?;
        stream.set_nodelay(true)?;

        let mut conn = Self {
            addr: addr.clone(),
            stream,
            outgoing: BytesMut::with_capacity(16 * 1024),
            buffer: BytesMut::with_capacity(16 * 1024),
            limits: ParserLimits::default(),
        };

        if let Some(password) = password {
            conn.expect_ok(Command::new("AUTH").arg(password.to_string()))
                .await?;
        }
        if addr.db != 0 {
            conn.expect_ok(Command::new("SELECT").arg_int(i64::from(addr.db)))
                .await?;
        }
        Ok(conn)
    }

    /// Address this connection was opened against
    pub fn addr(&self) -> &EndpointAddr {
        &self.addr
    }

    /// Send one command and wait for its reply
    pub async fn send(&mut self, command: &Command) -> Result<Frame> {
        command.encode(&mut self.outgoing);
        self.flush().await?;
        self.read_frame().await
    }

    /// Send all commands in one round trip and read the replies in order
    ///
    /// Error replies are returned as [`Frame::Error`] in their slot; only
    /// transport and framing failures abort the pipeline.
    pub async fn pipeline(&mut self, commands: &[Command]) -> Result<Vec<Frame>> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }
        for command in commands {
            command.encode(&mut self.outgoing);
        }
        self.flush().await?;

        let mut replies = Vec::with_capacity(commands.len());
        for _ in commands {
            replies.push(self.read_frame().await?);
        }
        debug!(addr = %self.addr, commands = commands.len(), "pipeline round trip");
        Ok(replies)
    }

    /// Fetch and parse `INFO`
    pub async fn info(&mut self) -> Result<ServerInfo> {
        let reply = self.send(&Command::new("INFO")).await?;
        ServerInfo::from_reply(reply)
    }

    async fn expect_ok(&mut self, command: Command) -> Result<()> {
        let reply = self.send(&command).await?;
        if let Some(message) = reply.error_message() {
            return Err(CopyError::server(command.name(), message));
        }
        match reply {
            Frame::Simple(s) if &s[..] == b"OK".as_slice() => Ok(()),
            other => Err(CopyError::Protocol(format!(
                "unexpected {} reply: {}",
                command.name(),
                other
            ))),
        }
    }

    async fn flush(&mut self) -> Result<()> {
        self.stream.write_all(&self.outgoing).await?;
        self.outgoing.clear();
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = parse_frame_with_limits(&mut self.buffer, &self.limits)? {
                return Ok(frame);
            }
            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                return if self.buffer.is_empty() {
                    Err(CopyError::ConnectionClosed)
                } else {
                    Err(CopyError::Protocol("connection closed mid-frame".into()))
                };
            }
        }
    }
}
