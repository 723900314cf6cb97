//! # redis-cp-core
//!
//! Building blocks shared by the `redis-cp` migration tool:
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | RESP frames, streaming parser, encoder, command builder |
//! | [`client`] | Pipelined TCP connection and INFO parsing |
//! | [`config`] | Migration configuration, TOML loading and validation |
//! | [`error`] | Error taxonomy for configuration, transport and server replies |

#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;

pub use config::MigrationConfig;
pub use error::{CopyError, Result};
