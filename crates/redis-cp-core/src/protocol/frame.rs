//! RESP Frame types

use std::fmt;

use bytes::Bytes;

/// A single RESP value as read from or written to the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Simple string: +OK\r\n
    Simple(Bytes),

    /// Error: -ERR message\r\n
    Error(Bytes),

    /// Integer: :1000\r\n
    Integer(i64),

    /// Bulk string: $5\r\nhello\r\n or $-1\r\n for null
    Bulk(Option<Bytes>),

    /// Array: *2\r\n... or *-1\r\n for null
    Array(Option<Vec<Frame>>),

    /// Null: _\r\n (RESP3 explicit null)
    Null,
}

impl Frame {
    /// Create a simple string frame
    #[inline]
    pub fn simple(s: impl Into<Bytes>) -> Self {
        Frame::Simple(s.into())
    }

    /// Create an error frame
    #[cold]
    pub fn error(s: impl Into<Bytes>) -> Self {
        Frame::Error(s.into())
    }

    /// Create a bulk string frame
    #[inline]
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Frame::Bulk(Some(data.into()))
    }

    /// Create a null bulk string frame
    #[inline]
    pub fn null() -> Self {
        Frame::Bulk(None)
    }

    /// Create an array frame
    #[inline]
    pub fn array(frames: Vec<Frame>) -> Self {
        Frame::Array(Some(frames))
    }

    /// Check if this frame is null (bulk, array, or RESP3 Null)
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Frame::Bulk(None) | Frame::Array(None) | Frame::Null)
    }

    /// Check if this frame is an error reply
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Frame::Error(_))
    }

    /// Error text if this is an error reply
    pub fn error_message(&self) -> Option<String> {
        match self {
            Frame::Error(msg) => Some(String::from_utf8_lossy(msg).into_owned()),
            _ => None,
        }
    }

    /// Get the string value if this is a Simple or Bulk frame
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Frame::Simple(b) | Frame::Bulk(Some(b)) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Get the integer value if this is an Integer frame
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Frame::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Convert to owned array if this is an Array frame
    pub fn into_array(self) -> Option<Vec<Frame>> {
        match self {
            Frame::Array(Some(arr)) => Some(arr),
            _ => None,
        }
    }

    /// Convert to owned bytes if this is a Simple or Bulk frame
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            Frame::Simple(b) | Frame::Bulk(Some(b)) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "{}", String::from_utf8_lossy(s)),
            Frame::Error(s) => write!(f, "(error) {}", String::from_utf8_lossy(s)),
            Frame::Integer(n) => write!(f, "(integer) {}", n),
            Frame::Bulk(Some(b)) => write!(f, "\"{}\"", String::from_utf8_lossy(b)),
            Frame::Bulk(None) | Frame::Array(None) | Frame::Null => write!(f, "(nil)"),
            Frame::Array(Some(items)) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_variants() {
        assert!(Frame::null().is_null());
        assert!(Frame::Array(None).is_null());
        assert!(Frame::Null.is_null());
        assert!(!Frame::bulk("").is_null());
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Frame::simple("OK").as_str(), Some("OK"));
        assert_eq!(Frame::bulk("v").as_str(), Some("v"));
        assert_eq!(Frame::Integer(-2).as_integer(), Some(-2));
        assert_eq!(Frame::bulk("x").as_integer(), None);
        assert_eq!(
            Frame::error("ERR nope").error_message().as_deref(),
            Some("ERR nope")
        );
        assert_eq!(Frame::simple("OK").error_message(), None);
    }

    #[test]
    fn test_display() {
        let frame = Frame::array(vec![Frame::bulk("a"), Frame::Integer(1), Frame::null()]);
        assert_eq!(frame.to_string(), "[\"a\", (integer) 1, (nil)]");
    }
}
