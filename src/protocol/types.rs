//! RESP Wire Format Value Types
//!
//! This module defines the typed values that travel on the wire.
//! Requests arrive as arrays of bulk strings; replies may use any of the
//! five frame kinds.
//!
//! ## Frame Format
//!
//! Each frame starts with a type prefix byte:
//! - `+` Simple String
//! - `-` Error
//! - `:` Integer
//! - `$` Bulk String
//! - `*` Array
//!
//! All frames are terminated with CRLF (`\r\n`).
//!
//! ## Examples
//!
//! Simple String: `+OK\r\n`
//! Error: `-ERR unknown command\r\n`
//! Integer: `:1000\r\n`
//! Bulk String: `$5\r\nhello\r\n`
//! Array: `*2\r\n$3\r\nGET\r\n$4\r\nname\r\n`
//! Null Bulk String: `$-1\r\n`

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used by the wire format
pub const CRLF: &[u8] = b"\r\n";

/// Frame type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// One complete wire-protocol value, request or reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Non-binary-safe status strings; must not contain CRLF.
    /// Format: `+<string>\r\n`
    Simple(String),

    /// Error condition reported to the client.
    /// Format: `-<error message>\r\n`
    Error(String),

    /// 64-bit signed integers.
    /// Format: `:<integer>\r\n`
    Integer(i64),

    /// Binary-safe strings up to 512 MB.
    /// Format: `$<length>\r\n<data>\r\n`
    Bulk(Bytes),

    /// The null sentinel (`$-1\r\n` on the wire), used for "not found".
    Null,

    /// Arrays of frames, nesting recursively.
    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<Frame>),
}

impl Frame {
    /// Creates a simple status reply.
    pub fn simple(s: impl Into<String>) -> Self {
        Frame::Simple(s.into())
    }

    /// Creates an error reply.
    pub fn error(s: impl Into<String>) -> Self {
        Frame::Error(s.into())
    }

    /// Creates an integer reply.
    pub fn integer(n: i64) -> Self {
        Frame::Integer(n)
    }

    /// Creates a bulk string reply.
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Frame::Bulk(data.into())
    }

    /// The null ("not found") sentinel.
    pub fn null() -> Self {
        Frame::Null
    }

    /// Creates an array reply.
    pub fn array(values: Vec<Frame>) -> Self {
        Frame::Array(values)
    }

    /// The `+OK` status reply.
    pub fn ok() -> Self {
        Frame::Simple("OK".to_string())
    }

    /// The `+PONG` status reply.
    pub fn pong() -> Self {
        Frame::Simple("PONG".to_string())
    }

    /// Serializes the frame into its wire representation.
    ///
    /// Encoding is a pure function of the value; it cannot fail.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the frame into an existing buffer.
    ///
    /// More efficient than [`Frame::serialize`] when a buffer is reused.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Frame::Simple(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Frame::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Frame::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Frame::Bulk(data) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            Frame::Null => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            Frame::Array(values) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(values.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    /// Returns true if this frame is the null sentinel.
    pub fn is_null(&self) -> bool {
        matches!(self, Frame::Null)
    }

    /// Returns true if this frame is an error reply.
    pub fn is_error(&self) -> bool {
        matches!(self, Frame::Error(_))
    }

    /// Extracts the inner text of a simple or bulk string frame.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Frame::Simple(s) => Some(s),
            Frame::Bulk(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Extracts the inner integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Frame::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Extracts the inner array.
    pub fn as_array(&self) -> Option<&[Frame]> {
        match self {
            Frame::Array(arr) => Some(arr),
            _ => None,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "\"{}\"", s),
            Frame::Error(s) => write!(f, "(error) {}", s),
            Frame::Integer(n) => write!(f, "(integer) {}", n),
            Frame::Bulk(data) => {
                if let Ok(s) = std::str::from_utf8(data) {
                    write!(f, "\"{}\"", s)
                } else {
                    write!(f, "(binary data, {} bytes)", data.len())
                }
            }
            Frame::Null => write!(f, "(nil)"),
            Frame::Array(values) => {
                if values.is_empty() {
                    write!(f, "(empty array)")
                } else {
                    writeln!(f)?;
                    for (i, v) in values.iter().enumerate() {
                        writeln!(f, "{}) {}", i + 1, v)?;
                    }
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_string_serializes() {
        let value = Frame::simple("OK");
        assert_eq!(value.serialize(), b"+OK\r\n");
    }

    #[test]
    fn error_serializes() {
        let value = Frame::error("ERR unknown command");
        assert_eq!(value.serialize(), b"-ERR unknown command\r\n");
    }

    #[test]
    fn integer_serializes() {
        let value = Frame::integer(1000);
        assert_eq!(value.serialize(), b":1000\r\n");

        let negative = Frame::integer(-42);
        assert_eq!(negative.serialize(), b":-42\r\n");
    }

    #[test]
    fn bulk_string_serializes() {
        let value = Frame::bulk(Bytes::from("hello"));
        assert_eq!(value.serialize(), b"$5\r\nhello\r\n");
    }

    #[test]
    fn null_serializes_as_negative_length_bulk() {
        let value = Frame::null();
        assert_eq!(value.serialize(), b"$-1\r\n");
    }

    #[test]
    fn array_serializes() {
        let value = Frame::array(vec![
            Frame::bulk(Bytes::from("GET")),
            Frame::bulk(Bytes::from("name")),
        ]);
        assert_eq!(value.serialize(), b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");
    }

    #[test]
    fn nested_array_serializes() {
        let value = Frame::array(vec![
            Frame::integer(1),
            Frame::array(vec![Frame::integer(2), Frame::integer(3)]),
        ]);
        assert_eq!(value.serialize(), b"*2\r\n:1\r\n*2\r\n:2\r\n:3\r\n");
    }

    #[test]
    fn status_helpers() {
        assert_eq!(Frame::ok().serialize(), b"+OK\r\n");
        assert_eq!(Frame::pong().serialize(), b"+PONG\r\n");
    }

    #[test]
    fn empty_array_serializes() {
        assert_eq!(Frame::array(vec![]).serialize(), b"*0\r\n");
    }
}
