//! Migration engine
//!
//! Copies one [`KeyBatch`] with the strategy chosen at negotiation time:
//!
//! - [`Strategy::Relocate`]: a single `MIGRATE host port "" db timeout COPY
//!   REPLACE KEYS k1 k2 ...` issued on the source. The source streams the
//!   keys to the destination itself, overwriting and keeping TTLs.
//! - [`Strategy::SnapshotRestore`]: one pipelined round trip of
//!   `PTTL k` + `DUMP k` per key on the source, then one pipelined round
//!   trip of `DEL k` + `RESTORE k ttl payload` per surviving key on the
//!   destination.
//!
//! Neither path retries. Any transport failure or error reply aborts the
//! batch and is returned to the caller unchanged.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::scanner::KeyBatch;
use crate::endpoint::Endpoint;
use redis_cp_core::config::EndpointAddr;
use redis_cp_core::protocol::{Command, Frame};
use redis_cp_core::{CopyError, Result};

/// PTTL reply for a key that does not exist
pub const PTTL_MISSING: i64 = -2;

/// PTTL reply for a key without an expiration
pub const PTTL_PERSISTENT: i64 = -1;

/// Where MIGRATE should send keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocateTarget {
    /// Destination address as reachable from the source server
    pub addr: EndpointAddr,
    /// MIGRATE timeout in milliseconds
    pub timeout_ms: u64,
    /// Destination password, forwarded with MIGRATE's AUTH option
    pub password: Option<String>,
}

/// Copy strategy, chosen once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Server-side bulk relocation with MIGRATE
    Relocate(RelocateTarget),
    /// Client-side DUMP/RESTORE
    SnapshotRestore,
}

impl Strategy {
    /// Which variant this is, without its parameters
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Relocate(_) => StrategyKind::Migrate,
            Strategy::SnapshotRestore => StrategyKind::DumpRestore,
        }
    }
}

/// Reportable name of a [`Strategy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// MIGRATE
    Migrate,
    /// DUMP/RESTORE
    DumpRestore,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Migrate => write!(f, "MIGRATE"),
            StrategyKind::DumpRestore => write!(f, "DUMP/RESTORE"),
        }
    }
}

/// Counts produced by migrating one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Keys written (or that would have been, under dry-run)
    pub copied: u64,
    /// Keys that disappeared from the source before they could be read
    pub skipped: u64,
}

/// Expiration to recreate a key with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotTtl {
    /// No expiration
    Persistent,
    /// Expires after this many milliseconds (at least 1)
    Expires(u64),
}

impl SnapshotTtl {
    /// Normalize a PTTL reply; `None` means the key no longer exists.
    ///
    /// A remaining TTL of `0` is floored to 1ms: RESTORE reads `0` as
    /// "no expiration", which would resurrect a key that is about to expire.
    pub fn from_pttl(pttl: i64) -> Result<Option<Self>> {
        match pttl {
            PTTL_MISSING => Ok(None),
            PTTL_PERSISTENT => Ok(Some(SnapshotTtl::Persistent)),
            ms if ms >= 0 => Ok(Some(SnapshotTtl::Expires(ms.max(1) as u64))),
            other => Err(CopyError::Protocol(format!(
                "unexpected PTTL reply: {}",
                other
            ))),
        }
    }

    /// TTL argument for RESTORE
    pub fn restore_ttl(&self) -> u64 {
        match self {
            SnapshotTtl::Persistent => 0,
            SnapshotTtl::Expires(ms) => *ms,
        }
    }
}

/// One key exported from the source, alive only while its batch is processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySnapshot {
    /// Key name
    pub key: Bytes,
    /// Normalized TTL
    pub ttl: SnapshotTtl,
    /// Opaque DUMP payload
    pub payload: Bytes,
}

/// Executes batches against a source and destination
#[derive(Debug, Clone)]
pub struct MigrationEngine {
    strategy: Strategy,
    dry_run: bool,
}

impl MigrationEngine {
    /// Create an engine bound to one strategy for its whole life
    pub fn new(strategy: Strategy, dry_run: bool) -> Self {
        Self { strategy, dry_run }
    }

    /// The negotiated strategy
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Whether destination writes are suppressed
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Copy one batch and report what happened to it
    pub async fn migrate<S, D>(
        &self,
        source: &mut S,
        destination: &mut D,
        batch: &KeyBatch,
    ) -> Result<BatchOutcome>
    where
        S: Endpoint + ?Sized,
        D: Endpoint + ?Sized,
    {
        match &self.strategy {
            Strategy::Relocate(target) => self.relocate(source, target, batch).await,
            Strategy::SnapshotRestore => self.snapshot_restore(source, destination, batch).await,
        }
    }

    async fn relocate<S>(
        &self,
        source: &mut S,
        target: &RelocateTarget,
        batch: &KeyBatch,
    ) -> Result<BatchOutcome>
    where
        S: Endpoint + ?Sized,
    {
        let outcome = BatchOutcome {
            copied: batch.len() as u64,
            skipped: 0,
        };
        if self.dry_run {
            return Ok(outcome);
        }

        let command = migrate_command(target, batch.keys());
        let reply = source.query(&command).await?;
        if let Some(message) = reply.error_message() {
            return Err(CopyError::server("MIGRATE", message));
        }
        match reply {
            Frame::Simple(ref status) if is_migrate_status(status) => {
                debug!(keys = batch.len(), status = %reply, "MIGRATE batch");
                Ok(outcome)
            }
            other => Err(CopyError::Protocol(format!(
                "unexpected MIGRATE reply: {}",
                other
            ))),
        }
    }

    async fn snapshot_restore<S, D>(
        &self,
        source: &mut S,
        destination: &mut D,
        batch: &KeyBatch,
    ) -> Result<BatchOutcome>
    where
        S: Endpoint + ?Sized,
        D: Endpoint + ?Sized,
    {
        let snapshots = read_snapshots(source, batch).await?;
        let outcome = BatchOutcome {
            copied: snapshots.len() as u64,
            skipped: (batch.len() - snapshots.len()) as u64,
        };

        if self.dry_run || snapshots.is_empty() {
            return Ok(outcome);
        }

        let commands: Vec<Command> = snapshots.iter().flat_map(restore_commands).collect();
        let replies = destination.pipeline(&commands).await?;
        ensure_reply_count(&commands, &replies)?;
        ensure_no_errors(&commands, &replies)?;
        debug!(
            copied = outcome.copied,
            skipped = outcome.skipped,
            "DUMP/RESTORE batch"
        );
        Ok(outcome)
    }
}

/// Build the MIGRATE command for a batch
pub fn migrate_command(target: &RelocateTarget, keys: &[Bytes]) -> Command {
    let mut command = Command::new("MIGRATE")
        .arg(target.addr.host.clone())
        .arg(target.addr.port.to_string())
        .arg("")
        .arg(target.addr.db.to_string())
        .arg(target.timeout_ms.to_string())
        .arg("COPY")
        .arg("REPLACE");
    if let Some(password) = &target.password {
        command = command.arg("AUTH").arg(password.clone());
    }
    command.arg("KEYS").args(keys.iter().cloned())
}

// NOKEY: none of the keys existed any more; still a successful call.
fn is_migrate_status(status: &Bytes) -> bool {
    &status[..] == b"OK".as_slice() || &status[..] == b"NOKEY".as_slice()
}

/// Read PTTL and DUMP for every key in one round trip.
///
/// Keys that vanished (PTTL `-2`, or a nil DUMP because the key expired
/// between the two reads) are left out of the result.
pub async fn read_snapshots<S>(source: &mut S, batch: &KeyBatch) -> Result<Vec<KeySnapshot>>
where
    S: Endpoint + ?Sized,
{
    let commands: Vec<Command> = batch
        .keys()
        .iter()
        .flat_map(|key| {
            [
                Command::new("PTTL").arg(key.clone()),
                Command::new("DUMP").arg(key.clone()),
            ]
        })
        .collect();
    let replies = source.pipeline(&commands).await?;
    ensure_reply_count(&commands, &replies)?;
    ensure_no_errors(&commands, &replies)?;

    let mut snapshots = Vec::with_capacity(batch.len());
    for (key, pair) in batch.keys().iter().zip(replies.chunks_exact(2)) {
        let pttl = pair[0]
            .as_integer()
            .ok_or_else(|| CopyError::Protocol(format!("unexpected PTTL reply: {}", pair[0])))?;
        let Some(ttl) = SnapshotTtl::from_pttl(pttl)? else {
            continue;
        };
        let payload = match &pair[1] {
            Frame::Bulk(Some(payload)) => payload.clone(),
            frame if frame.is_null() => continue,
            other => {
                return Err(CopyError::Protocol(format!(
                    "unexpected DUMP reply: {}",
                    other
                )))
            }
        };
        snapshots.push(KeySnapshot {
            key: key.clone(),
            ttl,
            payload,
        });
    }
    Ok(snapshots)
}

/// DEL followed by RESTORE for one snapshot
fn restore_commands(snapshot: &KeySnapshot) -> [Command; 2] {
    [
        Command::new("DEL").arg(snapshot.key.clone()),
        Command::new("RESTORE")
            .arg(snapshot.key.clone())
            .arg(snapshot.ttl.restore_ttl().to_string())
            .arg(snapshot.payload.clone()),
    ]
}

fn ensure_reply_count(commands: &[Command], replies: &[Frame]) -> Result<()> {
    if replies.len() != commands.len() {
        return Err(CopyError::Protocol(format!(
            "expected {} replies, got {}",
            commands.len(),
            replies.len()
        )));
    }
    Ok(())
}

fn ensure_no_errors(commands: &[Command], replies: &[Frame]) -> Result<()> {
    for (command, reply) in commands.iter().zip(replies) {
        if let Some(message) = reply.error_message() {
            return Err(CopyError::server(command.name(), message));
        }
    }
    Ok(())
}
