//! Wire Codec
//!
//! This module implements the line-oriented binary protocol that frames
//! client requests and server replies (the RESP format).
//!
//! ## Overview
//!
//! Requests from clients are always arrays of bulk strings; replies may be
//! any of the five frame kinds (simple string, error, integer, bulk string,
//! array). Decoding is incremental so partial TCP reads are handled
//! transparently; encoding is a pure function of the typed value.
//!
//! ## Modules
//!
//! - `types`: the `Frame` enum and reply serialization
//! - `parser`: incremental decoder plus request-shape validation
//!
//! ## Example
//!
//! ```ignore
//! use flintkv::protocol::{extract_command, parse_frame, Frame};
//! use bytes::Bytes;
//!
//! // Decoding a request
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (frame, consumed) = parse_frame(data).unwrap().unwrap();
//! let args = extract_command(frame).unwrap(); // ["GET", "name"]
//!
//! // Encoding a reply
//! let reply = Frame::bulk(Bytes::from("value"));
//! let bytes = reply.serialize();
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{extract_command, parse_frame, FrameError, FrameParser, ParseResult};
pub use types::Frame;
