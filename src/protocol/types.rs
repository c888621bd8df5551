//! Reply values and their wire encoding.
//!
//! Handlers return a [`RespValue`]; the session appends its encoding to the
//! connection's outbound buffer with [`RespValue::serialize_into`]. Encoding
//! cannot fail.
//!
//! ```text
//! +OK\r\n                      simple string
//! -ERR syntax error\r\n        error
//! :42\r\n                      integer
//! $5\r\nhello\r\n              bulk string ($0\r\n\r\n when empty)
//! $-1\r\n                      null bulk
//! *2\r\n:1\r\n:2\r\n            array (*0\r\n when empty)
//! *-1\r\n                      null array
//! ```

use bytes::{BufMut, Bytes, BytesMut};

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A reply produced by executing a command.
///
/// Handlers build these; the connection session encodes them into its
/// outbound buffer. Encoding is infallible for every variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Status line. Must not contain CR or LF.
    /// Format: `+<string>\r\n`
    SimpleString(String),

    /// Error line, conventionally starting with an upper-case code (`ERR`, `WRONGTYPE`).
    /// Format: `-<error message>\r\n`
    Error(String),

    /// 64-bit signed integer.
    /// Format: `:<integer>\r\n`
    Integer(i64),

    /// Binary-safe string.
    /// Format: `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// Null bulk string: `$-1\r\n`
    Null,

    /// Arrays can contain any RESP type, including nested arrays.
    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<RespValue>),

    /// Null array: `*-1\r\n`
    NullArray,
}

impl RespValue {
    /// Creates a new simple string response.
    ///
    /// # Example
    /// ```
    /// use emberkv::protocol::types::RespValue;
    /// let ok = RespValue::simple_string("OK");
    /// ```
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Creates a new error response.
    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    /// Creates a new integer response.
    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    /// Creates a new bulk string response.
    ///
    /// # Example
    /// ```
    /// use emberkv::protocol::types::RespValue;
    /// use bytes::Bytes;
    /// let bulk = RespValue::bulk_string(Bytes::from("hello"));
    /// assert_eq!(bulk.serialize(), b"$5\r\nhello\r\n");
    /// ```
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    /// Creates a null bulk response.
    pub fn null() -> Self {
        RespValue::Null
    }

    /// Creates an array response.
    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    /// Bulk string when present, null bulk otherwise.
    pub fn optional_bulk(data: Option<Bytes>) -> Self {
        match data {
            Some(data) => RespValue::BulkString(data),
            None => RespValue::Null,
        }
    }

    /// Common response for successful operations
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    /// Common response for PONG
    pub fn pong() -> Self {
        RespValue::SimpleString("PONG".to_string())
    }

    /// Serializes the value into a freshly allocated buffer.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.serialize_into(&mut buf);
        buf.to_vec()
    }

    /// Appends the wire form of this value to `buf`.
    pub fn serialize_into(&self, buf: &mut BytesMut) {
        match self {
            RespValue::SimpleString(s) => write_text_line(buf, prefix::SIMPLE_STRING, s),
            RespValue::Error(s) => write_text_line(buf, prefix::ERROR, s),
            RespValue::Integer(n) => write_line(buf, prefix::INTEGER, n.to_string().as_bytes()),
            RespValue::BulkString(data) => {
                write_line(buf, prefix::BULK_STRING, data.len().to_string().as_bytes());
                buf.put_slice(data);
                buf.put_slice(CRLF);
            }
            RespValue::Null => write_line(buf, prefix::BULK_STRING, b"-1"),
            RespValue::Array(values) => {
                write_line(buf, prefix::ARRAY, values.len().to_string().as_bytes());
                for value in values {
                    value.serialize_into(buf);
                }
            }
            RespValue::NullArray => write_line(buf, prefix::ARRAY, b"-1"),
        }
    }

    /// Attempts to extract the inner integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RespValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to extract the inner bytes from BulkString.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RespValue::BulkString(b) => Some(b),
            _ => None,
        }
    }
}

/// Writes a status or error line. CR and LF inside `text` become spaces so
/// the reply always stays on one line.
fn write_text_line(buf: &mut BytesMut, tag: u8, text: &str) {
    buf.reserve(text.len() + 3);
    buf.put_u8(tag);
    buf.extend(
        text.bytes()
            .map(|b| if b == b'\r' || b == b'\n' { b' ' } else { b }),
    );
    buf.put_slice(CRLF);
}

#[inline]
fn write_line(buf: &mut BytesMut, tag: u8, body: &[u8]) {
    buf.reserve(body.len() + 3);
    buf.put_u8(tag);
    buf.put_slice(body);
    buf.put_slice(CRLF);
}
