//! # redis-cp
//!
//! Copy a keyspace from one Redis-compatible server to another, preserving
//! TTLs. When both servers are newer than 3.2.0 keys are moved with
//! `MIGRATE ... COPY REPLACE KEYS`; otherwise every key is exported with
//! `PTTL`/`DUMP` and recreated with `DEL`/`RESTORE`. Both paths batch and
//! pipeline their commands.
//!
//! ```ignore
//! use redis_cp::migration::Orchestrator;
//! use redis_cp::MigrationConfig;
//!
//! let mut config = MigrationConfig::default();
//! config.source.host = "10.0.0.1".into();
//! config.destination.host = "10.0.0.2".into();
//!
//! let summary = Orchestrator::new(config)?.run(|_| {}).await?;
//! println!("{}", summary);
//! ```

#![forbid(unsafe_code)]

pub mod endpoint;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod migration;

pub use redis_cp_core::config::{EndpointAddr, MigrationConfig};
pub use redis_cp_core::{CopyError, Result};
