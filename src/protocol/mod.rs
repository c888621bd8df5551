//! RESP Protocol Implementation
//!
//! This module turns the raw byte stream of a client connection into
//! [`Command`]s and turns [`RespValue`] replies back into bytes.
//!
//! ## Modules
//!
//! - `command`: The decoded request type
//! - `parser`: Resumable decoder for array and inline requests
//! - `types`: Defines the `RespValue` enum and serialization
//!
//! ## Example
//!
//! ```
//! use emberkv::protocol::{CommandDecoder, RespValue};
//! use bytes::{Bytes, BytesMut};
//!
//! // Decoding incoming data
//! let mut decoder = CommandDecoder::new();
//! let mut buf = BytesMut::from(&b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n"[..]);
//! let command = decoder.decode(&mut buf).unwrap().unwrap();
//! assert!(command.is("get"));
//!
//! // Creating responses
//! let response = RespValue::bulk_string(Bytes::from("Ariz"));
//! assert_eq!(response.serialize(), b"$4\r\nAriz\r\n");
//! ```

pub mod command;
pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use command::Command;
pub use parser::{CommandDecoder, DecoderLimits, ProtocolError, ProtocolResult};
pub use types::RespValue;
