//! Store client
//!
//! A single pipelined RESP connection per endpoint plus INFO parsing.

mod connection;
mod info;

pub use connection::Connection;
pub use info::{KeyspaceStats, ServerInfo};
