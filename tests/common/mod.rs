//! Shared test utilities for redis-cp integration tests.
//!
//! Import via `mod common;` in integration test files:
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use redis_cp::endpoint::Endpoint;
use redis_cp::memory::{MemoryEndpoint, MemoryNetwork, MemoryServer};
use redis_cp::MigrationConfig;
use redis_cp_core::protocol::{encode_frame, parse_frame, Command};

// ============================================================================
// Config helpers
// ============================================================================

/// A valid config copying `source` to `destination` in batches of `batch_size`.
#[allow(dead_code)]
pub fn test_config(source: &str, destination: &str, batch_size: usize) -> MigrationConfig {
    let mut config = MigrationConfig::default();
    config.source.host = source.to_string();
    config.destination.host = destination.to_string();
    config.batch_size = batch_size;
    config
}

// ============================================================================
// Data helpers
// ============================================================================

/// Fill `db` with `count` persistent keys named `{prefix}{n:04}`.
#[allow(dead_code)]
pub fn seed(server: &MemoryServer, db: u32, prefix: &str, count: usize) {
    for n in 0..count {
        server.set(db, format!("{prefix}{n:04}"), format!("value-{n}"));
    }
}

/// Number of keys following the KEYS option of every MIGRATE executed on `server`.
#[allow(dead_code)]
pub fn migrate_batch_sizes(server: &MemoryServer) -> Vec<usize> {
    server
        .commands()
        .iter()
        .filter(|c| c.name() == "MIGRATE")
        .map(|c| {
            c.arguments()
                .iter()
                .position(|a| a.eq_ignore_ascii_case(b"KEYS"))
                .map_or(0, |i| c.arguments().len() - i - 1)
        })
        .collect()
}

// ============================================================================
// TCP helpers
// ============================================================================

/// Expose `server` over RESP on a random local port and return the port.
///
/// Every accepted client gets its own handle with database 0 selected. When
/// `network` is given, MIGRATE on this server can reach its peers.
#[allow(dead_code)]
pub async fn serve(server: MemoryServer, network: Option<MemoryNetwork>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind to random port");
    let port = listener.local_addr().expect("should have local addr").port();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let endpoint = match &network {
                Some(network) => network.attach(&server, 0),
                None => server.connect(0),
            };
            tokio::spawn(handle_client(socket, endpoint));
        }
    });

    port
}

/// A local port nothing is listening on.
#[allow(dead_code)]
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind to random port");
    listener.local_addr().expect("should have local addr").port()
}

async fn handle_client(mut socket: TcpStream, mut endpoint: MemoryEndpoint) {
    let mut buf = BytesMut::new();
    loop {
        match socket.read_buf(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }

        let mut commands = Vec::new();
        loop {
            match parse_frame(&mut buf) {
                Ok(Some(frame)) => match Command::from_frame(frame) {
                    Some(command) => commands.push(command),
                    None => return,
                },
                Ok(None) => break,
                Err(_) => return,
            }
        }
        if commands.is_empty() {
            continue;
        }

        // An offline server drops the connection.
        let Ok(replies) = endpoint.pipeline(&commands).await else {
            return;
        };
        let mut out = BytesMut::new();
        for reply in &replies {
            encode_frame(reply, &mut out);
        }
        if socket.write_all(&out).await.is_err() {
            return;
        }
    }
}

/// Bytes of a str, for comparisons against stored values.
#[allow(dead_code)]
pub fn b(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}
