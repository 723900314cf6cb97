//! RESP protocol encoder

use bytes::{BufMut, BytesMut};

use super::Frame;

/// Encode a frame into the buffer
pub fn encode_frame(frame: &Frame, buf: &mut BytesMut) {
    match frame {
        Frame::Simple(s) => {
            buf.put_u8(b'+');
            buf.put_slice(s);
            buf.put_slice(b"\r\n");
        }
        Frame::Error(s) => {
            buf.put_u8(b'-');
            buf.put_slice(s);
            buf.put_slice(b"\r\n");
        }
        Frame::Integer(n) => {
            buf.put_u8(b':');
            buf.put_slice(n.to_string().as_bytes());
            buf.put_slice(b"\r\n");
        }
        Frame::Bulk(None) => buf.put_slice(b"$-1\r\n"),
        Frame::Bulk(Some(data)) => encode_bulk(data, buf),
        Frame::Array(None) => buf.put_slice(b"*-1\r\n"),
        Frame::Array(Some(frames)) => {
            encode_len(b'*', frames.len(), buf);
            for frame in frames {
                encode_frame(frame, buf);
            }
        }
        Frame::Null => buf.put_slice(b"_\r\n"),
    }
}

/// Encode a bulk string
pub(crate) fn encode_bulk(data: &[u8], buf: &mut BytesMut) {
    encode_len(b'$', data.len(), buf);
    buf.put_slice(data);
    buf.put_slice(b"\r\n");
}

pub(crate) fn encode_len(marker: u8, len: usize, buf: &mut BytesMut) {
    buf.put_u8(marker);
    buf.put_slice(len.to_string().as_bytes());
    buf.put_slice(b"\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_frame;

    fn encoded(frame: &Frame) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_frame(frame, &mut buf);
        buf
    }

    #[test]
    fn test_encode_scalars() {
        assert_eq!(&encoded(&Frame::simple("OK"))[..], b"+OK\r\n");
        assert_eq!(&encoded(&Frame::error("ERR x"))[..], b"-ERR x\r\n");
        assert_eq!(&encoded(&Frame::Integer(-1))[..], b":-1\r\n");
        assert_eq!(&encoded(&Frame::null())[..], b"$-1\r\n");
        assert_eq!(&encoded(&Frame::Null)[..], b"_\r\n");
    }

    #[test]
    fn test_encode_nested_array_parses_back() {
        let frame = Frame::array(vec![
            Frame::bulk("0"),
            Frame::array(vec![Frame::bulk("user:1"), Frame::null()]),
            Frame::Array(None),
        ]);
        let mut buf = encoded(&frame);
        assert_eq!(parse_frame(&mut buf).unwrap(), Some(frame));
    }
}
