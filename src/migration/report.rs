//! Run reporting
//!
//! Counters accumulated by the orchestrator plus the three pieces of text a
//! run prints: the startup banner, optional per-batch progress, and the
//! final summary line.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::engine::{BatchOutcome, StrategyKind};
use super::version::SemanticVersion;
use redis_cp_core::config::EndpointAddr;

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Running totals, updated only after a batch completes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    /// Keys copied (or that would have been, under dry-run)
    pub copied: u64,
    /// Keys that vanished from the source mid-run
    pub skipped: u64,
    /// Batches completed
    pub batches: u64,
}

impl RunCounters {
    /// Fold one batch's outcome into the totals
    pub fn add(&mut self, outcome: &BatchOutcome) {
        self.copied += outcome.copied;
        self.skipped += outcome.skipped;
        self.batches += 1;
    }

    /// Keys handed to the engine so far
    pub fn processed(&self) -> u64 {
        self.copied + self.skipped
    }
}

// ---------------------------------------------------------------------------
// Banner
// ---------------------------------------------------------------------------

/// What a run is about to do, known once negotiation finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunBanner {
    /// Effective source address
    pub source: EndpointAddr,
    /// Effective destination address
    pub destination: EndpointAddr,
    /// INFO key count of the source database (not pattern-filtered)
    pub source_keys: u64,
    /// INFO key count of the destination database
    pub destination_keys: u64,
    /// Version reported by the source
    pub source_version: SemanticVersion,
    /// Version reported by the destination
    pub destination_version: SemanticVersion,
    /// Negotiated strategy
    pub strategy: StrategyKind,
}

impl fmt::Display for RunBanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "src: {} ({} keys)", self.source, self.source_keys)?;
        writeln!(f, "dst: {} ({} keys)", self.destination, self.destination_keys)?;
        write!(f, "via: {}", self.strategy)
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Emitted right before a batch is handed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// 1-based batch number
    pub batch: u64,
    /// Keys in this batch
    pub keys: usize,
    /// Keys processed once this batch completes
    pub processed: u64,
    /// Approximate source total from the banner
    pub source_keys: u64,
}

impl BatchProgress {
    /// `migrating P/N keys ...`
    pub fn line(&self) -> String {
        format!("migrating {}/{} keys ...", self.processed, self.source_keys)
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Final totals of a completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Keys copied (or that would have been, under dry-run)
    pub copied: u64,
    /// Keys that vanished from the source mid-run
    pub skipped: u64,
    /// Batches completed
    pub batches: u64,
    /// Keys handed to the engine, `copied + skipped`
    pub processed: u64,
    /// Whether destination writes were suppressed
    pub dry_run: bool,
    /// Strategy the run used
    pub strategy: StrategyKind,
    /// Wall-clock time of the batch loop in milliseconds
    pub elapsed_ms: u64,
}

impl RunSummary {
    /// Build the summary from the final counters
    pub fn new(counters: RunCounters, strategy: StrategyKind, dry_run: bool, elapsed_ms: u64) -> Self {
        Self {
            copied: counters.copied,
            skipped: counters.skipped,
            batches: counters.batches,
            processed: counters.processed(),
            dry_run,
            strategy,
            elapsed_ms,
        }
    }

    /// `DRYRUN` or `DONE`
    pub fn tag(&self) -> &'static str {
        if self.dry_run {
            "DRYRUN"
        } else {
            "DONE"
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} keys copied, {} skipped",
            self.tag(),
            self.copied,
            self.skipped
        )
    }
}
