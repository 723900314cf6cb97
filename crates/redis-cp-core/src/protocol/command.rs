//! Command builder
//!
//! Requests are always sent as RESP arrays of bulk strings, so arguments
//! are kept as raw [`Bytes`] and keys never need to be valid UTF-8.

use std::fmt;

use bytes::{Bytes, BytesMut};

use super::encoder::{encode_bulk, encode_len};
use super::Frame;

/// A store command: name followed by its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    args: Vec<Bytes>,
}

impl Command {
    /// Start a command with the given name
    pub fn new(name: &'static str) -> Self {
        Self {
            args: vec![Bytes::from_static(name.as_bytes())],
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<Bytes>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append an integer argument in its decimal form
    pub fn arg_int(self, n: i64) -> Self {
        self.arg(n.to_string())
    }

    /// Append every argument from the iterator
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Bytes>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Upper-cased command name
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.args[0]).to_ascii_uppercase()
    }

    /// Arguments after the command name
    pub fn arguments(&self) -> &[Bytes] {
        &self.args[1..]
    }

    /// Encode as a RESP array of bulk strings
    pub fn encode(&self, buf: &mut BytesMut) {
        encode_len(b'*', self.args.len(), buf);
        for arg in &self.args {
            encode_bulk(arg, buf);
        }
    }

    /// Decode a request frame: a non-empty array of bulk strings
    pub fn from_frame(frame: Frame) -> Option<Self> {
        let args = frame
            .into_array()?
            .into_iter()
            .map(Frame::into_bytes)
            .collect::<Option<Vec<_>>>()?;
        if args.is_empty() {
            return None;
        }
        Some(Self { args })
    }

    /// Convert into the equivalent request frame
    pub fn into_frame(self) -> Frame {
        Frame::array(self.args.into_iter().map(Frame::bulk).collect())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        for arg in self.arguments() {
            write!(f, " {}", String::from_utf8_lossy(arg))?;
        }
        Ok(())
    }
}
