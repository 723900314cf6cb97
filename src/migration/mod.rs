//! Keyspace copy
//!
//! The copy pipeline is split into small pieces that each own one decision:
//!
//! - [`version`]: parsing server versions and the MIGRATE capability floor
//! - [`scanner`]: SCAN paging regrouped into fixed-size [`KeyBatch`]es
//! - [`engine`]: copying one batch with MIGRATE or DUMP/RESTORE
//! - [`orchestrator`]: negotiation and the batch loop
//! - [`report`]: counters, banner, progress and summary text
//!
//! # Example
//!
//! ```ignore
//! use redis_cp::migration::Orchestrator;
//!
//! let orchestrator = Orchestrator::new(config)?;
//! let (source, destination) = orchestrator.connect().await?;
//! let run = orchestrator.prepare(source, destination).await?;
//! println!("{}", run.banner());
//! let summary = run.execute(|progress| println!("{}", progress.line())).await?;
//! println!("{}", summary);
//! ```

pub mod engine;
pub mod orchestrator;
pub mod report;
pub mod scanner;
pub mod version;

pub use engine::{
    BatchOutcome, KeySnapshot, MigrationEngine, RelocateTarget, SnapshotTtl, Strategy,
    StrategyKind,
};
pub use orchestrator::{Orchestrator, PreparedRun};
pub use report::{BatchProgress, RunBanner, RunCounters, RunSummary};
pub use scanner::{KeyBatch, Scanner};
pub use version::{bulk_relocation_supported, SemanticVersion};
