//! RESP protocol parser
//!
//! Streaming reply parser: frames are decoded straight out of the read
//! buffer and the buffer is only advanced once a whole frame is available.

use std::io::Cursor;

use bytes::{Buf, Bytes, BytesMut};

use super::Frame;

/// Limits applied while decoding replies.
///
/// Enforced before allocation, so a misbehaving server cannot make the
/// client buffer an arbitrarily large frame.
#[derive(Debug, Clone)]
pub struct ParserLimits {
    /// Maximum bulk string size in bytes (default: 512MB, matches Redis)
    pub max_bulk_string_size: usize,
    /// Maximum number of elements in an array (default: 1,048,576)
    pub max_array_elements: usize,
    /// Maximum nesting depth for arrays (default: 32)
    pub max_nesting_depth: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            max_bulk_string_size: 512 * 1024 * 1024,
            max_array_elements: 1_048_576,
            max_nesting_depth: 32,
        }
    }
}

/// Parse error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Not enough data to parse a complete frame
    Incomplete,

    /// Invalid protocol format
    Invalid(String),

    /// Frame exceeds configured size limits
    FrameTooLarge(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Incomplete => write!(f, "incomplete data"),
            ParseError::Invalid(msg) => write!(f, "invalid protocol: {}", msg),
            ParseError::FrameTooLarge(msg) => write!(f, "frame too large: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

#[cold]
#[inline(never)]
fn invalid(msg: impl Into<String>) -> ParseError {
    ParseError::Invalid(msg.into())
}

/// Parse a RESP frame from the buffer
///
/// Returns Ok(Some(frame)) if a complete frame was parsed,
/// Ok(None) if more data is needed, or Err if the data is invalid.
pub fn parse_frame(buf: &mut BytesMut) -> Result<Option<Frame>, ParseError> {
    parse_frame_with_limits(buf, &ParserLimits::default())
}

/// Parse a RESP frame from the buffer with configurable limits.
pub fn parse_frame_with_limits(
    buf: &mut BytesMut,
    limits: &ParserLimits,
) -> Result<Option<Frame>, ParseError> {
    if buf.is_empty() {
        return Ok(None);
    }

    let mut cursor = Cursor::new(&buf[..]);
    match decode(&mut cursor, limits, 0) {
        Ok(frame) => {
            let consumed = cursor.position() as usize;
            buf.advance(consumed);
            Ok(Some(frame))
        }
        Err(ParseError::Incomplete) => Ok(None),
        Err(e) => Err(e),
    }
}

fn decode(
    cursor: &mut Cursor<&[u8]>,
    limits: &ParserLimits,
    depth: usize,
) -> Result<Frame, ParseError> {
    if depth > limits.max_nesting_depth {
        return Err(ParseError::FrameTooLarge(format!(
            "nesting depth {} exceeds limit {}",
            depth, limits.max_nesting_depth
        )));
    }

    let marker = next_byte(cursor)?;
    match marker {
        b'+' => Ok(Frame::Simple(Bytes::copy_from_slice(read_line(cursor)?))),
        b'-' => Ok(Frame::Error(Bytes::copy_from_slice(read_line(cursor)?))),
        b':' => Ok(Frame::Integer(read_decimal(cursor)?)),
        b'_' => {
            read_line(cursor)?;
            Ok(Frame::Null)
        }
        b'$' => {
            let len = read_decimal(cursor)?;
            match len {
                -1 => Ok(Frame::null()),
                n if n < -1 => Err(invalid("negative bulk string length")),
                n => {
                    let len = n as usize;
                    if len > limits.max_bulk_string_size {
                        return Err(ParseError::FrameTooLarge(format!(
                            "bulk string size {} exceeds limit {}",
                            len, limits.max_bulk_string_size
                        )));
                    }
                    let data = read_exact(cursor, len)?;
                    let frame = Frame::Bulk(Some(Bytes::copy_from_slice(data)));
                    expect_crlf(cursor)?;
                    Ok(frame)
                }
            }
        }
        b'*' => {
            let count = read_decimal(cursor)?;
            match count {
                -1 => Ok(Frame::Array(None)),
                n if n < -1 => Err(invalid("negative array length")),
                n => {
                    let count = n as usize;
                    if count > limits.max_array_elements {
                        return Err(ParseError::FrameTooLarge(format!(
                            "array element count {} exceeds limit {}",
                            count, limits.max_array_elements
                        )));
                    }
                    let mut items = Vec::with_capacity(count.min(1024));
                    for _ in 0..count {
                        items.push(decode(cursor, limits, depth + 1)?);
                    }
                    Ok(Frame::Array(Some(items)))
                }
            }
        }
        byte => Err(invalid(format!("unexpected byte: {:02x}", byte))),
    }
}

#[inline]
fn next_byte(cursor: &mut Cursor<&[u8]>) -> Result<u8, ParseError> {
    if !cursor.has_remaining() {
        return Err(ParseError::Incomplete);
    }
    Ok(cursor.get_u8())
}

/// Read up to the next \r\n, returning the line without the terminator
fn read_line<'a>(cursor: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], ParseError> {
    let start = cursor.position() as usize;
    let buf: &'a [u8] = cursor.get_ref();

    let end = buf[start..]
        .windows(2)
        .position(|w| w == b"\r\n")
        .ok_or(ParseError::Incomplete)?;

    cursor.set_position((start + end + 2) as u64);
    Ok(&buf[start..start + end])
}

fn read_decimal(cursor: &mut Cursor<&[u8]>) -> Result<i64, ParseError> {
    let line = read_line(cursor)?;
    let s = std::str::from_utf8(line).map_err(|_| invalid("invalid UTF-8 in integer"))?;
    s.parse()
        .map_err(|_| invalid(format!("invalid integer: {}", s)))
}

fn read_exact<'a>(cursor: &mut Cursor<&'a [u8]>, n: usize) -> Result<&'a [u8], ParseError> {
    let start = cursor.position() as usize;
    let buf: &'a [u8] = cursor.get_ref();
    if buf.len() - start < n {
        return Err(ParseError::Incomplete);
    }
    cursor.set_position((start + n) as u64);
    Ok(&buf[start..start + n])
}

fn expect_crlf(cursor: &mut Cursor<&[u8]>) -> Result<(), ParseError> {
    if cursor.remaining() < 2 {
        return Err(ParseError::Incomplete);
    }
    if cursor.chunk()[..2] != *b"\r\n" {
        return Err(invalid("expected CRLF"));
    }
    cursor.advance(2);
    Ok(())
}
