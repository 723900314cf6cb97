//! RESP protocol implementation
//!
//! Client-side subset of the Redis Serialization Protocol: the RESP2 reply
//! types plus the RESP3 null, which some servers send even on RESP2
//! connections.

mod command;
mod encoder;
mod frame;
mod parser;

pub use command::Command;
pub use encoder::encode_frame;
pub use frame::Frame;
pub use parser::{parse_frame, parse_frame_with_limits, ParseError, ParserLimits};
