//! Run orchestration
//!
//! One run is: resolve both addresses, connect, negotiate the strategy from
//! the two servers' versions, report the banner, then pull batches from the
//! scanner and hand each to the engine until the keyspace is exhausted.
//!
//! The split between [`Orchestrator::prepare`] and [`PreparedRun::execute`]
//! lets a caller print the banner before any key is touched.

use std::time::Instant;

use tracing::{debug, info, warn};

use super::engine::{MigrationEngine, RelocateTarget, Strategy};
use super::report::{BatchProgress, RunBanner, RunCounters, RunSummary};
use super::scanner::Scanner;
use super::version::{bulk_relocation_supported, SemanticVersion};
use crate::endpoint::Endpoint;
use redis_cp_core::client::{Connection, ServerInfo};
use redis_cp_core::{MigrationConfig, Result};

/// Drives a complete copy run from a validated configuration
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: MigrationConfig,
}

impl Orchestrator {
    /// Validate `config` and take ownership of it for the run
    pub fn new(config: MigrationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration this run was built from
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Open both connections, source first
    pub async fn connect(&self) -> Result<(Connection, Connection)> {
        let source = Connection::connect(
            &self.config.source_addr(),
            self.config.source.password.as_deref(),
        )
        .await?;
        let destination = Connection::connect(
            &self.config.destination_addr(),
            self.config.destination.password.as_deref(),
        )
        .await?;
        Ok((source, destination))
    }

    /// Query both servers and fix the strategy for the rest of the run
    pub async fn prepare<S, D>(&self, mut source: S, mut destination: D) -> Result<PreparedRun<S, D>>
    where
        S: Endpoint,
        D: Endpoint,
    {
        let source_info = source.info().await?;
        let destination_info = destination.info().await?;

        let source_addr = self.config.source_addr();
        let destination_addr = self.config.destination_addr();
        let source_version = reported_version("source", &source_info);
        let destination_version = reported_version("destination", &destination_info);

        let strategy = self.negotiate(&source_version, &destination_version);
        info!(
            source = %source_addr,
            destination = %destination_addr,
            source_version = %source_version,
            destination_version = %destination_version,
            strategy = %strategy.kind(),
            "negotiated copy strategy"
        );

        let banner = RunBanner {
            source_keys: source_info.keys_in(source_addr.db),
            destination_keys: destination_info.keys_in(destination_addr.db),
            source: source_addr,
            destination: destination_addr,
            source_version,
            destination_version,
            strategy: strategy.kind(),
        };

        Ok(PreparedRun {
            source,
            destination,
            engine: MigrationEngine::new(strategy, self.config.dry_run),
            scanner: Scanner::new(
                self.config.pattern.clone(),
                self.config.scan_count,
                self.config.batch_size,
            ),
            banner,
        })
    }

    /// Connect, prepare and execute in one call
    pub async fn run<F>(&self, on_batch: F) -> Result<RunSummary>
    where
        F: FnMut(&BatchProgress),
    {
        let (source, destination) = self.connect().await?;
        self.prepare(source, destination).await?.execute(on_batch).await
    }

    fn negotiate(&self, source: &SemanticVersion, destination: &SemanticVersion) -> Strategy {
        if bulk_relocation_supported(source, destination) {
            Strategy::Relocate(RelocateTarget {
                addr: self.config.destination_addr(),
                timeout_ms: self.config.migrate_timeout_ms,
                password: self.config.destination.password.clone(),
            })
        } else {
            Strategy::SnapshotRestore
        }
    }
}

fn reported_version(side: &str, info: &ServerInfo) -> SemanticVersion {
    let version = SemanticVersion::parse(info.version().unwrap_or("?"));
    if !version.is_valid() {
        warn!(
            side,
            raw = version.raw(),
            "unparsable server version, falling back to DUMP/RESTORE"
        );
    }
    version
}

/// A negotiated run that has not touched any key yet
#[derive(Debug)]
pub struct PreparedRun<S, D> {
    source: S,
    destination: D,
    engine: MigrationEngine,
    scanner: Scanner,
    banner: RunBanner,
}

impl<S, D> PreparedRun<S, D>
where
    S: Endpoint,
    D: Endpoint,
{
    /// Endpoints, key counts and strategy for the startup report
    pub fn banner(&self) -> &RunBanner {
        &self.banner
    }

    /// The engine every batch will go through
    pub fn engine(&self) -> &MigrationEngine {
        &self.engine
    }

    /// Copy every matching key, calling `on_batch` before each batch.
    ///
    /// The first failure aborts the run; counters of completed batches are
    /// discarded with it.
    pub async fn execute<F>(mut self, mut on_batch: F) -> Result<RunSummary>
    where
        F: FnMut(&BatchProgress),
    {
        let started = Instant::now();
        let mut counters = RunCounters::default();

        while let Some(batch) = self.scanner.next_batch(&mut self.source).await? {
            on_batch(&BatchProgress {
                batch: counters.batches + 1,
                keys: batch.len(),
                processed: counters.processed() + batch.len() as u64,
                source_keys: self.banner.source_keys,
            });

            let outcome = self
                .engine
                .migrate(&mut self.source, &mut self.destination, &batch)
                .await?;
            counters.add(&outcome);
            debug!(
                batch = counters.batches,
                copied = outcome.copied,
                skipped = outcome.skipped,
                "batch complete"
            );
        }

        let summary = RunSummary::new(
            counters,
            self.banner.strategy,
            self.engine.is_dry_run(),
            started.elapsed().as_millis() as u64,
        );
        info!(
            copied = summary.copied,
            skipped = summary.skipped,
            batches = summary.batches,
            scan_pages = self.scanner.pages_fetched(),
            elapsed_ms = summary.elapsed_ms,
            "{}",
            summary.tag()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryNetwork, MemoryServer};
    use crate::migration::engine::StrategyKind;
    use redis_cp_core::CopyError;

    fn config(batch_size: usize) -> MigrationConfig {
        let mut config = MigrationConfig::default();
        config.source.host = "src".to_string();
        config.destination.host = "dst".to_string();
        config.batch_size = batch_size;
        config
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = Orchestrator::new(MigrationConfig::default()).unwrap_err();
        assert!(matches!(err, CopyError::Config(_)));
    }

    #[tokio::test]
    async fn test_prepare_negotiates_once_from_both_versions() {
        let orchestrator = Orchestrator::new(config(100)).unwrap();
        let cases = [
            ("7.2.4", "6.0.0", StrategyKind::Migrate),
            ("3.2.0", "7.0.0", StrategyKind::DumpRestore),
            ("7.0.0", "3.2.1", StrategyKind::Migrate),
            ("unknown", "7.0.0", StrategyKind::DumpRestore),
        ];
        for (src_version, dst_version, expected) in cases {
            let src = MemoryServer::new(src_version);
            let dst = MemoryServer::new(dst_version);
            let run = orchestrator
                .prepare(src.connect(0), dst.connect(0))
                .await
                .unwrap();
            assert_eq!(run.banner().strategy, expected, "{src_version} -> {dst_version}");
            assert_eq!(run.engine().strategy().kind(), expected);
        }
    }

    #[tokio::test]
    async fn test_banner_reports_unfiltered_key_counts() {
        let mut config = config(100);
        config.pattern = "user:*".to_string();
        config.destination.db = Some(2);
        let orchestrator = Orchestrator::new(config).unwrap();

        let src = MemoryServer::new("2.8.0");
        src.set(0, "user:1", "a");
        src.set(0, "session:1", "b");
        let dst = MemoryServer::new("2.8.0");
        dst.set(2, "x", "1");

        let run = orchestrator
            .prepare(src.connect(0), dst.connect(2))
            .await
            .unwrap();
        let banner = run.banner();
        assert_eq!(banner.source_keys, 2);
        assert_eq!(banner.destination_keys, 1);
        assert_eq!(banner.destination.to_string(), "dst:6379/2");
        assert_eq!(banner.source_version.digits(), (2, 8, 0));
    }

    #[tokio::test]
    async fn test_execute_reports_each_batch() {
        let orchestrator = Orchestrator::new(config(2)).unwrap();
        let src = MemoryServer::new("3.0.0");
        for key in ["a", "b", "c", "d", "e"] {
            src.set(0, key, key);
        }
        let dst = MemoryServer::new("3.0.0");

        let mut progress = Vec::new();
        let summary = orchestrator
            .prepare(src.connect(0), dst.connect(0))
            .await
            .unwrap()
            .execute(|p| progress.push(*p))
            .await
            .unwrap();

        assert_eq!(summary.copied, 5);
        assert_eq!(summary.batches, 3);
        assert_eq!(
            progress.iter().map(|p| (p.batch, p.keys, p.processed)).collect::<Vec<_>>(),
            vec![(1, 2, 2), (2, 2, 4), (3, 1, 5)]
        );
        assert!(progress.iter().all(|p| p.source_keys == 5));
        assert_eq!(dst.snapshot(0), src.snapshot(0));
    }

    #[tokio::test]
    async fn test_relocation_run_uses_destination_address() {
        let network = MemoryNetwork::new();
        let src = MemoryServer::new("7.2.4");
        let dst = MemoryServer::new("7.2.4");
        network.register("dst", 6379, dst.clone());
        src.set(0, "k", "v");

        let summary = Orchestrator::new(config(100))
            .unwrap()
            .prepare(network.attach(&src, 0), dst.connect(0))
            .await
            .unwrap()
            .execute(|_| {})
            .await
            .unwrap();

        assert_eq!(summary.strategy, StrategyKind::Migrate);
        assert_eq!(summary.copied, 1);
        assert_eq!(dst.get(0, "k").as_deref(), Some(&b"v"[..]));
    }

    #[tokio::test]
    async fn test_source_failure_aborts_run() {
        let src = MemoryServer::new("3.0.0");
        src.set(0, "a", "1");
        let dst = MemoryServer::new("3.0.0");
        let run = Orchestrator::new(config(100))
            .unwrap()
            .prepare(src.connect(0), dst.connect(0))
            .await
            .unwrap();

        src.set_offline(true);
        let err = run.execute(|_| {}).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(dst.len(0), 0);
    }
}
