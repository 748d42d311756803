//! Incremental Wire-Protocol Parser
//!
//! This module implements the request-decoding half of the wire codec.
//! The parser is incremental: it can handle partial data and resume when
//! more arrives, which is essential because TCP delivers a byte stream,
//! not frames.
//!
//! ## How the Parser Works
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((frame, consumed)))` - a complete frame, `consumed` bytes used
//! - `Ok(None)` - the frame is incomplete, more bytes are needed
//! - `Err(FrameError)` - the stream is not valid protocol data
//!
//! The caller:
//! 1. Appends incoming network data to a buffer
//! 2. Calls `parse()` to attempt decoding
//! 3. On success, advances the buffer by `consumed` bytes
//! 4. On incomplete, waits for more data
//! 5. On error, terminates the connection (framing errors are fatal)
//!
//! ## Request Shape
//!
//! A request frame must be an array of bulk strings; [`extract_command`]
//! enforces that contract and yields the decoded argument list. Any other
//! shape is a framing error.

use crate::protocol::types::{prefix, Frame, CRLF};
use bytes::Bytes;
use std::num::ParseIntError;
use thiserror::Error;

/// Errors produced while decoding frames or validating request shape.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    /// Unknown type prefix byte
    #[error("unknown type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    /// Invalid integer format in a length or integer line
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Invalid UTF-8 where text was required
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative (but not -1 for null)
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (missing CRLF, over-deep nesting, etc.)
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A request frame was not an array of bulk strings
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The frame exceeds the maximum allowed size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, FrameError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth (prevent stack overflow)
pub const MAX_NESTING_DEPTH: usize = 32;

/// An incremental wire-protocol parser.
///
/// # Example
///
/// ```ignore
/// use flintkv::protocol::FrameParser;
/// use bytes::{Buf, BytesMut};
///
/// let mut parser = FrameParser::new();
/// let mut buffer = BytesMut::from(&b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n"[..]);
///
/// if let Some((frame, consumed)) = parser.parse(&buffer)? {
///     buffer.advance(consumed);
///     println!("Parsed: {:?}", frame);
/// }
/// ```
#[derive(Debug, Default)]
pub struct FrameParser {
    /// Current nesting depth (for array parsing)
    depth: usize,
}

impl FrameParser {
    /// Creates a new parser instance.
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    /// Attempts to parse one frame from the buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((frame, consumed)))` - a complete frame was decoded
    /// - `Ok(None)` - incomplete data, need more bytes
    /// - `Err(e)` - framing error; the connection must be closed
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
        self.depth = 0;
        self.parse_frame(buf)
    }

    /// Internal recursive parsing function.
    fn parse_frame(&mut self, buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        if self.depth > MAX_NESTING_DEPTH {
            return Err(FrameError::Protocol(format!(
                "maximum nesting depth exceeded: {}",
                MAX_NESTING_DEPTH
            )));
        }

        match buf[0] {
            prefix::SIMPLE_STRING => self.parse_simple_string(buf),
            prefix::ERROR => self.parse_error(buf),
            prefix::INTEGER => self.parse_integer(buf),
            prefix::BULK_STRING => self.parse_bulk_string(buf),
            prefix::ARRAY => self.parse_array(buf),
            other => Err(FrameError::UnknownPrefix(other)),
        }
    }

    /// Parses a simple string: `+<string>\r\n`
    fn parse_simple_string(&mut self, buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
        debug_assert!(buf[0] == prefix::SIMPLE_STRING);

        match find_crlf(&buf[1..]) {
            Some(pos) => {
                let content = &buf[1..1 + pos];
                let s = std::str::from_utf8(content)
                    .map_err(|e| FrameError::InvalidUtf8(e.to_string()))?;

                // +1 for prefix, +2 for CRLF
                let consumed = 1 + pos + 2;
                Ok(Some((Frame::Simple(s.to_string()), consumed)))
            }
            None => Ok(None), // Incomplete
        }
    }

    /// Parses an error: `-<error message>\r\n`
    fn parse_error(&mut self, buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
        debug_assert!(buf[0] == prefix::ERROR);

        match find_crlf(&buf[1..]) {
            Some(pos) => {
                let content = &buf[1..1 + pos];
                let s = std::str::from_utf8(content)
                    .map_err(|e| FrameError::InvalidUtf8(e.to_string()))?;

                let consumed = 1 + pos + 2;
                Ok(Some((Frame::Error(s.to_string()), consumed)))
            }
            None => Ok(None),
        }
    }

    /// Parses an integer: `:<integer>\r\n`
    fn parse_integer(&mut self, buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
        debug_assert!(buf[0] == prefix::INTEGER);

        match find_crlf(&buf[1..]) {
            Some(pos) => {
                let content = &buf[1..1 + pos];
                let s = std::str::from_utf8(content)
                    .map_err(|e| FrameError::InvalidUtf8(e.to_string()))?;

                let n: i64 = s
                    .parse()
                    .map_err(|e: ParseIntError| FrameError::InvalidInteger(e.to_string()))?;
                let consumed = 1 + pos + 2;
                Ok(Some((Frame::Integer(n), consumed)))
            }
            None => Ok(None),
        }
    }

    /// Parses a bulk string: `$<length>\r\n<data>\r\n`
    fn parse_bulk_string(&mut self, buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
        debug_assert!(buf[0] == prefix::BULK_STRING);

        // First, find the length line
        let length_end = match find_crlf(&buf[1..]) {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let length_str = std::str::from_utf8(&buf[1..1 + length_end])
            .map_err(|e| FrameError::InvalidUtf8(e.to_string()))?;

        let length: i64 = length_str
            .parse()
            .map_err(|e: ParseIntError| FrameError::InvalidInteger(e.to_string()))?;

        // Null bulk string
        if length == -1 {
            let consumed = 1 + length_end + 2; // $-1\r\n
            return Ok(Some((Frame::Null, consumed)));
        }

        if length < 0 {
            return Err(FrameError::InvalidBulkLength(length));
        }

        let length = length as usize;

        if length > MAX_BULK_SIZE {
            return Err(FrameError::MessageTooLarge {
                size: length,
                max: MAX_BULK_SIZE,
            });
        }

        // Where the payload starts
        let data_start = 1 + length_end + 2; // prefix + length + CRLF

        let total_needed = data_start + length + 2; // payload + CRLF
        if buf.len() < total_needed {
            return Ok(None); // Incomplete
        }

        // The payload must be terminated by the canonical CRLF
        if &buf[data_start + length..data_start + length + 2] != CRLF {
            return Err(FrameError::Protocol(
                "bulk string missing trailing CRLF".to_string(),
            ));
        }

        let data = Bytes::copy_from_slice(&buf[data_start..data_start + length]);

        Ok(Some((Frame::Bulk(data), total_needed)))
    }

    /// Parses an array: `*<count>\r\n<elements...>`
    fn parse_array(&mut self, buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
        debug_assert!(buf[0] == prefix::ARRAY);

        let count_end = match find_crlf(&buf[1..]) {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let count_str = std::str::from_utf8(&buf[1..1 + count_end])
            .map_err(|e| FrameError::InvalidUtf8(e.to_string()))?;

        let count: i64 = count_str
            .parse()
            .map_err(|e: ParseIntError| FrameError::InvalidInteger(e.to_string()))?;

        // Null array
        if count == -1 {
            let consumed = 1 + count_end + 2;
            return Ok(Some((Frame::Null, consumed)));
        }

        if count < 0 {
            return Err(FrameError::InvalidArrayLength(count));
        }

        let count = count as usize;

        let mut elements = Vec::with_capacity(count);
        let mut consumed = 1 + count_end + 2; // *<count>\r\n

        self.depth += 1;

        for _ in 0..count {
            if consumed >= buf.len() {
                return Ok(None); // Incomplete
            }

            match self.parse_frame(&buf[consumed..])? {
                Some((frame, element_consumed)) => {
                    elements.push(frame);
                    consumed += element_consumed;
                }
                None => return Ok(None), // Incomplete
            }
        }

        self.depth -= 1;

        Ok(Some((Frame::Array(elements), consumed)))
    }
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    for i in 0..buf.len().saturating_sub(1) {
        if buf[i] == b'\r' && buf[i + 1] == b'\n' {
            return Some(i);
        }
    }
    None
}

/// Parses a single frame from bytes.
///
/// Convenience function for simple use cases.
pub fn parse_frame(buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
    FrameParser::new().parse(buf)
}

/// Validates a decoded request frame and extracts its argument list.
///
/// A request must be an array whose elements are all bulk strings; the
/// first argument is the command name. Shape violations are framing
/// errors (fatal to the connection); an argument that is not valid UTF-8
/// yields [`FrameError::InvalidUtf8`], which the dispatcher reports as an
/// error reply since the frame itself was well-formed.
pub fn extract_command(frame: Frame) -> Result<Vec<String>, FrameError> {
    let elements = match frame {
        Frame::Array(elements) => elements,
        other => {
            return Err(FrameError::InvalidRequest(format!(
                "expected array request, got {}",
                frame_kind(&other)
            )))
        }
    };

    let mut args = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            Frame::Bulk(data) => {
                let text = std::str::from_utf8(&data)
                    .map_err(|e| FrameError::InvalidUtf8(e.to_string()))?;
                args.push(text.to_string());
            }
            other => {
                return Err(FrameError::InvalidRequest(format!(
                    "expected bulk string argument, got {}",
                    frame_kind(&other)
                )))
            }
        }
    }

    Ok(args)
}

fn frame_kind(frame: &Frame) -> &'static str {
    match frame {
        Frame::Simple(_) => "simple string",
        Frame::Error(_) => "error",
        Frame::Integer(_) => "integer",
        Frame::Bulk(_) => "bulk string",
        Frame::Null => "null",
        Frame::Array(_) => "array",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_string() {
        let input = b"+OK\r\n";
        let result = parse_frame(input).unwrap().unwrap();
        assert_eq!(result.0, Frame::Simple("OK".to_string()));
        assert_eq!(result.1, 5);
    }

    #[test]
    fn simple_string_incomplete() {
        let input = b"+OK";
        assert!(parse_frame(input).unwrap().is_none());
    }

    #[test]
    fn parses_error() {
        let input = b"-ERR unknown command\r\n";
        let result = parse_frame(input).unwrap().unwrap();
        assert_eq!(result.0, Frame::Error("ERR unknown command".to_string()));
        assert_eq!(result.1, 22);
    }

    #[test]
    fn parses_integer() {
        let input = b":1000\r\n";
        let result = parse_frame(input).unwrap().unwrap();
        assert_eq!(result.0, Frame::Integer(1000));
        assert_eq!(result.1, 7);
    }

    #[test]
    fn parses_negative_integer() {
        let input = b":-42\r\n";
        let result = parse_frame(input).unwrap().unwrap();
        assert_eq!(result.0, Frame::Integer(-42));
    }

    #[test]
    fn parses_bulk_string() {
        let input = b"$5\r\nhello\r\n";
        let result = parse_frame(input).unwrap().unwrap();
        assert_eq!(result.0, Frame::Bulk(Bytes::from("hello")));
        assert_eq!(result.1, 11);
    }

    #[test]
    fn parses_null_bulk_string() {
        let input = b"$-1\r\n";
        let result = parse_frame(input).unwrap().unwrap();
        assert_eq!(result.0, Frame::Null);
        assert_eq!(result.1, 5);
    }

    #[test]
    fn parses_empty_bulk_string() {
        let input = b"$0\r\n\r\n";
        let result = parse_frame(input).unwrap().unwrap();
        assert_eq!(result.0, Frame::Bulk(Bytes::from("")));
        assert_eq!(result.1, 6);
    }

    #[test]
    fn bulk_string_incomplete() {
        let input = b"$5\r\nhel";
        assert!(parse_frame(input).unwrap().is_none());
    }

    #[test]
    fn parses_array() {
        let input = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
        let result = parse_frame(input).unwrap().unwrap();
        assert_eq!(
            result.0,
            Frame::Array(vec![
                Frame::Bulk(Bytes::from("GET")),
                Frame::Bulk(Bytes::from("name")),
            ])
        );
        assert_eq!(result.1, 23);
    }

    #[test]
    fn parses_null_array() {
        let input = b"*-1\r\n";
        let result = parse_frame(input).unwrap().unwrap();
        assert_eq!(result.0, Frame::Null);
    }

    #[test]
    fn parses_empty_array() {
        let input = b"*0\r\n";
        let result = parse_frame(input).unwrap().unwrap();
        assert_eq!(result.0, Frame::Array(vec![]));
    }

    #[test]
    fn parses_nested_array() {
        let input = b"*2\r\n:1\r\n*2\r\n:2\r\n:3\r\n";
        let result = parse_frame(input).unwrap().unwrap();
        assert_eq!(
            result.0,
            Frame::Array(vec![
                Frame::Integer(1),
                Frame::Array(vec![Frame::Integer(2), Frame::Integer(3)]),
            ])
        );
    }

    #[test]
    fn unknown_prefix_is_a_framing_error() {
        let input = b"@bogus\r\n";
        let result = parse_frame(input);
        assert_eq!(result, Err(FrameError::UnknownPrefix(b'@')));
    }

    #[test]
    fn invalid_integer_is_a_framing_error() {
        let input = b":not_a_number\r\n";
        let result = parse_frame(input);
        assert!(matches!(result, Err(FrameError::InvalidInteger(_))));
    }

    #[test]
    fn negative_bulk_length_is_a_framing_error() {
        let input = b"$-7\r\n";
        let result = parse_frame(input);
        assert_eq!(result, Err(FrameError::InvalidBulkLength(-7)));
    }

    #[test]
    fn bulk_without_trailing_crlf_is_a_framing_error() {
        let input = b"$5\r\nhelloXX";
        let result = parse_frame(input);
        assert!(matches!(result, Err(FrameError::Protocol(_))));
    }

    #[test]
    fn serialize_then_parse_round_trips() {
        let original = Frame::array(vec![
            Frame::bulk(Bytes::from("SET")),
            Frame::bulk(Bytes::from("key")),
            Frame::bulk(Bytes::from("value")),
        ]);

        let serialized = original.serialize();
        let (parsed, _) = parse_frame(&serialized).unwrap().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn binary_safe_bulk_string() {
        // Bulk strings carry binary data including null bytes
        let input = b"$5\r\nhel\x00o\r\n";
        let result = parse_frame(input).unwrap().unwrap();
        assert_eq!(result.0, Frame::Bulk(Bytes::from(&b"hel\x00o"[..])));
    }

    #[test]
    fn extracts_command_arguments_in_order() {
        let input = b"*3\r\n$3\r\nSET\r\n$8\r\nuser:101\r\n$5\r\nvalue\r\n";
        let (frame, _) = parse_frame(input).unwrap().unwrap();
        let args = extract_command(frame).unwrap();
        assert_eq!(args, vec!["SET", "user:101", "value"]);
    }

    #[test]
    fn non_array_request_is_rejected() {
        let result = extract_command(Frame::Simple("PING".to_string()));
        assert!(matches!(result, Err(FrameError::InvalidRequest(_))));
    }

    #[test]
    fn non_bulk_argument_is_rejected() {
        let frame = Frame::Array(vec![Frame::Integer(1)]);
        let result = extract_command(frame);
        assert!(matches!(result, Err(FrameError::InvalidRequest(_))));
    }

    #[test]
    fn non_utf8_argument_is_an_encoding_error() {
        let frame = Frame::Array(vec![Frame::Bulk(Bytes::from(&b"\xff\xfe"[..]))]);
        let result = extract_command(frame);
        assert!(matches!(result, Err(FrameError::InvalidUtf8(_))));
    }

    #[test]
    fn empty_array_request_yields_no_arguments() {
        let args = extract_command(Frame::Array(vec![])).unwrap();
        assert!(args.is_empty());
    }
}
