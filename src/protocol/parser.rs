//! Incremental RESP Command Decoder
//!
//! Clients send commands as RESP arrays of bulk strings:
//!
//! ```text
//! *3\r\n$3\r\nSET\r\n$4\r\nname\r\n$4\r\nAriz\r\n
//! ```
//!
//! or, for hand-typed sessions (telnet, `nc`), as a plain inline line:
//!
//! ```text
//! SET name "Ariz"\r\n
//! ```
//!
//! ## How the Decoder Works
//!
//! The caller owns a `BytesMut` that network reads are appended to and calls
//! [`CommandDecoder::decode`] in a loop:
//!
//! - `Ok(Some(command))` - a full command was decoded and its bytes removed
//! - `Ok(None)` - the buffer holds an incomplete command, read more bytes
//! - `Err(ProtocolError)` - the stream is malformed, the connection must close
//!
//! Decoding is resumable. Every completed piece of an array (its header and
//! each finished bulk string) is consumed from the buffer immediately, with
//! bulk payloads copied into their own `Bytes`, and kept inside the decoder, so when more bytes arrive decoding continues from the
//! exact point where it stopped and nothing is parsed twice.

use crate::protocol::command::Command;
use crate::protocol::types::{prefix, CRLF};
use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;

/// Errors that make the inbound byte stream undecodable.
///
/// Any of these is fatal for the connection: once framing is lost there is no
/// reliable way to find the start of the next command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Array header is not an integer, or is below -1
    #[error("invalid multibulk length")]
    InvalidArrayLength,

    /// Array declares more elements than allowed
    #[error("multibulk length {size} exceeds maximum {max}")]
    ArrayTooLarge { size: usize, max: usize },

    /// Bulk header is not an integer, or is negative
    #[error("invalid bulk length")]
    InvalidBulkLength,

    /// Bulk string declares more bytes than allowed
    #[error("bulk length {size} exceeds maximum {max}")]
    BulkTooLarge { size: usize, max: usize },

    /// An element of a command array is not a bulk string
    #[error("expected '$', got '{}'", char::from(*.0))]
    UnexpectedType(u8),

    /// Bulk payload not followed by CRLF
    #[error("bulk string missing trailing CRLF")]
    MissingCrlf,

    /// An inline command or header line grew past the inline limit
    #[error("too big inline request")]
    InlineTooLarge,

    /// Inline command with an unterminated quoted argument
    #[error("unbalanced quotes in request")]
    UnbalancedQuotes,
}

/// Result type for decoding operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum number of elements in one command array
pub const MAX_ARRAY_LEN: usize = 1024 * 1024;

/// Maximum length of an inline command or of a header line
pub const MAX_INLINE_SIZE: usize = 64 * 1024;

/// Size limits enforced while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderLimits {
    pub max_bulk_len: usize,
    pub max_array_len: usize,
    pub max_inline_len: usize,
}

impl Default for DecoderLimits {
    fn default() -> Self {
        Self {
            max_bulk_len: MAX_BULK_SIZE,
            max_array_len: MAX_ARRAY_LEN,
            max_inline_len: MAX_INLINE_SIZE,
        }
    }
}

/// Progress through a partially received command array.
#[derive(Debug, Default)]
enum DecodeState {
    /// Between commands
    #[default]
    Idle,
    /// Header consumed, collecting bulk strings
    Array {
        remaining: usize,
        parts: Vec<Bytes>,
        /// Length of a bulk string whose header was consumed but whose
        /// payload has not fully arrived yet
        pending_len: Option<usize>,
    },
}

/// A resumable decoder turning a byte stream into [`Command`]s.
///
/// # Example
///
/// ```
/// use emberkv::protocol::CommandDecoder;
/// use bytes::BytesMut;
///
/// let mut decoder = CommandDecoder::new();
/// let mut buffer = BytesMut::from(&b"*2\r\n$3\r\nGET\r\n$2\r\nna"[..]);
///
/// // Not enough bytes yet; the finished pieces are kept by the decoder
/// assert!(decoder.decode(&mut buffer).unwrap().is_none());
///
/// buffer.extend_from_slice(b"me\r\n");
/// let command = decoder.decode(&mut buffer).unwrap().unwrap();
/// assert!(command.is("GET"));
/// assert!(buffer.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct CommandDecoder {
    limits: DecoderLimits,
    state: DecodeState,
}

impl CommandDecoder {
    /// Creates a decoder with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder with custom limits.
    pub fn with_limits(limits: DecoderLimits) -> Self {
        Self {
            limits,
            state: DecodeState::Idle,
        }
    }

    /// Returns true while part of a command has been received.
    pub fn is_mid_command(&self) -> bool {
        matches!(self.state, DecodeState::Array { .. })
    }

    /// Attempts to decode the next complete command from `buf`.
    ///
    /// Consumed bytes are removed from the front of `buf`. Empty arrays,
    /// null arrays and blank inline lines are skipped silently.
    pub fn decode(&mut self, buf: &mut BytesMut) -> ProtocolResult<Option<Command>> {
        let limits = self.limits;

        loop {
            if let DecodeState::Idle = self.state {
                if buf.is_empty() {
                    return Ok(None);
                }

                if buf[0] != prefix::ARRAY {
                    match decode_inline(buf, limits.max_inline_len)? {
                        Inline::Incomplete => return Ok(None),
                        Inline::Blank => continue,
                        Inline::Command(command) => return Ok(Some(command)),
                    }
                }

                let line = match take_line(buf, limits.max_inline_len)? {
                    Some(line) => line,
                    None => return Ok(None),
                };
                let count =
                    parse_length(header_body(&line)).ok_or(ProtocolError::InvalidArrayLength)?;

                if count < -1 {
                    return Err(ProtocolError::InvalidArrayLength);
                }
                if count <= 0 {
                    continue;
                }

                let count = count as usize;
                if count > limits.max_array_len {
                    return Err(ProtocolError::ArrayTooLarge {
                        size: count,
                        max: limits.max_array_len,
                    });
                }

                self.state = DecodeState::Array {
                    remaining: count,
                    parts: Vec::with_capacity(count.min(64)),
                    pending_len: None,
                };
            }

            return self.decode_array_elements(buf);
        }
    }

    /// Collects the bulk strings of the array currently being decoded.
    fn decode_array_elements(&mut self, buf: &mut BytesMut) -> ProtocolResult<Option<Command>> {
        let limits = self.limits;

        let DecodeState::Array {
            remaining,
            parts,
            pending_len,
        } = &mut self.state
        else {
            return Ok(None);
        };

        while *remaining > 0 {
            let len = match *pending_len {
                Some(len) => len,
                None => {
                    if buf.is_empty() {
                        return Ok(None);
                    }
                    if buf[0] != prefix::BULK_STRING {
                        return Err(ProtocolError::UnexpectedType(buf[0]));
                    }

                    let line = match take_line(buf, limits.max_inline_len)? {
                        Some(line) => line,
                        None => return Ok(None),
                    };
                    let len = parse_length(header_body(&line))
                        .ok_or(ProtocolError::InvalidBulkLength)?;
                    if len < 0 {
                        return Err(ProtocolError::InvalidBulkLength);
                    }

                    let len = len as usize;
                    if len > limits.max_bulk_len {
                        return Err(ProtocolError::BulkTooLarge {
                            size: len,
                            max: limits.max_bulk_len,
                        });
                    }

                    *pending_len = Some(len);
                    len
                }
            };

            if buf.len() < len + 2 {
                return Ok(None);
            }
            if &buf[len..len + 2] != CRLF {
                return Err(ProtocolError::MissingCrlf);
            }

            // Owned copy: a stored value must not keep the read chunk alive
            let data = Bytes::copy_from_slice(&buf[..len]);
            buf.advance(len + 2);

            parts.push(data);
            *remaining -= 1;
            *pending_len = None;
        }

        match std::mem::take(&mut self.state) {
            DecodeState::Array { parts, .. } => Ok(Command::from_parts(parts)),
            DecodeState::Idle => Ok(None),
        }
    }
}

/// Outcome of decoding one inline line.
enum Inline {
    Incomplete,
    Blank,
    Command(Command),
}

fn decode_inline(buf: &mut BytesMut, max_len: usize) -> ProtocolResult<Inline> {
    let newline = match buf.iter().position(|&b| b == b'\n') {
        Some(pos) => pos,
        None if buf.len() > max_len => return Err(ProtocolError::InlineTooLarge),
        None => return Ok(Inline::Incomplete),
    };
    if newline > max_len {
        return Err(ProtocolError::InlineTooLarge);
    }

    let line = buf.split_to(newline + 1);
    let mut body = &line[..newline];
    if body.last() == Some(&b'\r') {
        body = &body[..body.len() - 1];
    }

    Ok(match Command::from_parts(split_inline_args(body)?) {
        Some(command) => Inline::Command(command),
        None => Inline::Blank,
    })
}

/// Splits an inline request into arguments.
///
/// Arguments are separated by whitespace. Double-quoted arguments understand
/// `\n`, `\r`, `\t`, `\b`, `\a`, `\xHH` and backslash-escaped characters;
/// single-quoted arguments only understand `\'`. A closing quote must be
/// followed by whitespace or the end of the line.
fn split_inline_args(line: &[u8]) -> ProtocolResult<Vec<Bytes>> {
    let mut args = Vec::new();
    let mut i = 0;

    loop {
        while i < line.len() && line[i].is_ascii_whitespace() {
            i += 1;
        }
        if i == line.len() {
            return Ok(args);
        }

        let mut current = Vec::new();
        match line[i] {
            b'"' => {
                i += 1;
                loop {
                    match line.get(i) {
                        None => return Err(ProtocolError::UnbalancedQuotes),
                        Some(b'"') => {
                            i += 1;
                            break;
                        }
                        Some(b'\\') => {
                            let escaped = *line.get(i + 1).ok_or(ProtocolError::UnbalancedQuotes)?;
                            let hex = line
                                .get(i + 2..i + 4)
                                .and_then(|h| Some(hex_value(h[0])? << 4 | hex_value(h[1])?));
                            match (escaped, hex) {
                                (b'x', Some(byte)) => {
                                    current.push(byte);
                                    i += 4;
                                    continue;
                                }
                                (b'n', _) => current.push(b'\n'),
                                (b'r', _) => current.push(b'\r'),
                                (b't', _) => current.push(b'\t'),
                                (b'b', _) => current.push(0x08),
                                (b'a', _) => current.push(0x07),
                                (other, _) => current.push(other),
                            }
                            i += 2;
                        }
                        Some(&c) => {
                            current.push(c);
                            i += 1;
                        }
                    }
                }
                if i < line.len() && !line[i].is_ascii_whitespace() {
                    return Err(ProtocolError::UnbalancedQuotes);
                }
            }
            b'\'' => {
                i += 1;
                loop {
                    match line.get(i) {
                        None => return Err(ProtocolError::UnbalancedQuotes),
                        Some(b'\'') => {
                            i += 1;
                            break;
                        }
                        Some(b'\\') if line.get(i + 1) == Some(&b'\'') => {
                            current.push(b'\'');
                            i += 2;
                        }
                        Some(&c) => {
                            current.push(c);
                            i += 1;
                        }
                    }
                }
                if i < line.len() && !line[i].is_ascii_whitespace() {
                    return Err(ProtocolError::UnbalancedQuotes);
                }
            }
            _ => {
                while i < line.len() && !line[i].is_ascii_whitespace() {
                    current.push(line[i]);
                    i += 1;
                }
            }
        }

        args.push(Bytes::from(current));
    }
}

#[inline]
fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

/// Splits a complete `<tag><body>\r\n` line off the buffer.
///
/// Returns `Ok(None)` if the line is not yet complete.
fn take_line(buf: &mut BytesMut, max_len: usize) -> ProtocolResult<Option<BytesMut>> {
    match find_crlf(buf) {
        Some(pos) => Ok(Some(buf.split_to(pos + 2))),
        None if buf.len() > max_len => Err(ProtocolError::InlineTooLarge),
        None => Ok(None),
    }
}

/// The body of a header line: without its type tag and CRLF.
#[inline]
fn header_body(line: &[u8]) -> &[u8] {
    &line[1..line.len() - 2]
}

fn parse_length(digits: &[u8]) -> Option<i64> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &[u8]) -> ProtocolResult<Vec<Command>> {
        let mut decoder = CommandDecoder::new();
        let mut buf = BytesMut::from(input);
        let mut commands = Vec::new();
        while let Some(cmd) = decoder.decode(&mut buf)? {
            commands.push(cmd);
        }
        Ok(commands)
    }

    fn cmd(parts: &[&str]) -> Command {
        Command::from_parts(parts.iter().map(|p| Bytes::from(p.to_string())).collect()).unwrap()
    }

    fn small_limits() -> DecoderLimits {
        DecoderLimits {
            max_bulk_len: 16,
            max_array_len: 8,
            max_inline_len: 32,
        }
    }

    #[test]
    fn test_decode_array_command() {
        let commands = decode_all(b"*3\r\n$3\r\nSET\r\n$8\r\nuser:101\r\n$4\r\nAriz\r\n").unwrap();
        assert_eq!(commands, vec![cmd(&["SET", "user:101", "Ariz"])]);
    }

    #[test]
    fn test_decode_incomplete_keeps_progress() {
        let mut decoder = CommandDecoder::new();
        let mut buf = BytesMut::from(&b"*2\r\n$3\r\nGET\r\n$4\r\nna"[..]);

        assert!(decoder.decode(&mut buf).unwrap().is_none());
        assert!(decoder.is_mid_command());
        // The header and the finished "GET" element have been taken out
        assert_eq!(&buf[..], b"na");

        buf.extend_from_slice(b"me\r\n");
        let command = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(command, cmd(&["GET", "name"]));
        assert!(buf.is_empty());
        assert!(!decoder.is_mid_command());
    }

    #[test]
    fn test_split_at_every_boundary() {
        let input: &[u8] = b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nva\r\nl\r\n";
        let expected = decode_all(input).unwrap();
        assert_eq!(expected.len(), 1);

        for split in 0..=input.len() {
            let mut decoder = CommandDecoder::new();
            let mut buf = BytesMut::new();
            let mut decoded = Vec::new();

            for chunk in [&input[..split], &input[split..]] {
                buf.extend_from_slice(chunk);
                while let Some(cmd) = decoder.decode(&mut buf).unwrap() {
                    decoded.push(cmd);
                }
            }

            assert_eq!(decoded, expected, "split at {}", split);
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let input: &[u8] = b"*2\r\n$4\r\nECHO\r\n$0\r\n\r\nPING\r\n";
        let mut decoder = CommandDecoder::new();
        let mut buf = BytesMut::new();
        let mut decoded = Vec::new();

        for byte in input {
            buf.extend_from_slice(&[*byte]);
            while let Some(cmd) = decoder.decode(&mut buf).unwrap() {
                decoded.push(cmd);
            }
        }

        assert_eq!(decoded, vec![cmd(&["ECHO", ""]), cmd(&["PING"])]);
    }

    #[test]
    fn test_pipelined_commands_in_order() {
        let mut input = Vec::new();
        for i in 0..10 {
            let key = format!("k{}", i);
            input.extend_from_slice(
                format!("*2\r\n$3\r\nGET\r\n${}\r\n{}\r\n", key.len(), key).as_bytes(),
            );
        }

        let commands = decode_all(&input).unwrap();
        assert_eq!(commands.len(), 10);
        for (i, command) in commands.iter().enumerate() {
            assert_eq!(command.args()[0], Bytes::from(format!("k{}", i)));
        }
    }

    #[test]
    fn test_binary_safe_bulk_string() {
        let commands = decode_all(b"*2\r\n$4\r\nECHO\r\n$5\r\nhel\x00o\r\n").unwrap();
        assert_eq!(commands[0].args()[0], Bytes::from(&b"hel\x00o"[..]));
    }

    #[test]
    fn test_arguments_do_not_share_read_buffer() {
        let mut buf = BytesMut::with_capacity(4096);
        buf.extend_from_slice(b"*3\r\n$3\r\nSET\r\n$2\r\nk1\r\n$1\r\nv\r\n");
        let start = buf.as_ptr() as usize;
        let end = start + buf.capacity();

        let command = CommandDecoder::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(command.args(), &[Bytes::from("k1"), Bytes::from("v")]);
        for part in std::iter::once(command.name()).chain(command.args()) {
            let ptr = part.as_ptr() as usize;
            assert!(ptr < start || ptr >= end, "argument points into the read buffer");
        }
    }

    #[test]
    fn test_empty_and_null_arrays_are_skipped() {
        let commands = decode_all(b"*0\r\n*-1\r\n*1\r\n$4\r\nPING\r\n").unwrap();
        assert_eq!(commands, vec![cmd(&["PING"])]);
    }

    #[test]
    fn test_inline_command() {
        let commands = decode_all(b"SET  key value\r\nPING\n\r\n").unwrap();
        assert_eq!(commands, vec![cmd(&["SET", "key", "value"]), cmd(&["PING"])]);
    }

    #[test]
    fn test_inline_quoted_arguments() {
        let commands =
            decode_all(b"SET \"hello world\" 'it''s'\r\nECHO \"a\\x41\\n\"\r\n").unwrap_err();
        // 'it''s' closes a quote directly followed by another quote
        assert_eq!(commands, ProtocolError::UnbalancedQuotes);

        let commands = decode_all(b"SET \"hello world\" 'it\\'s'\r\nECHO \"a\\x41\\n\"\r\n").unwrap();
        assert_eq!(
            commands,
            vec![cmd(&["SET", "hello world", "it's"]), cmd(&["ECHO", "aA\n"])]
        );
    }

    #[test]
    fn test_inline_unbalanced_quotes() {
        assert_eq!(
            decode_all(b"SET \"oops\r\n").unwrap_err(),
            ProtocolError::UnbalancedQuotes
        );
    }

    #[test]
    fn test_inline_too_large() {
        let mut decoder = CommandDecoder::with_limits(small_limits());
        let mut buf = BytesMut::from(&[b'a'; 40][..]);
        assert_eq!(
            decoder.decode(&mut buf).unwrap_err(),
            ProtocolError::InlineTooLarge
        );
    }

    #[test]
    fn test_bulk_too_large() {
        let mut decoder = CommandDecoder::with_limits(small_limits());
        let mut buf = BytesMut::from(&b"*2\r\n$3\r\nSET\r\n$17\r\n"[..]);
        assert_eq!(
            decoder.decode(&mut buf).unwrap_err(),
            ProtocolError::BulkTooLarge { size: 17, max: 16 }
        );
    }

    #[test]
    fn test_array_too_large() {
        let mut decoder = CommandDecoder::with_limits(small_limits());
        let mut buf = BytesMut::from(&b"*9\r\n"[..]);
        assert_eq!(
            decoder.decode(&mut buf).unwrap_err(),
            ProtocolError::ArrayTooLarge { size: 9, max: 8 }
        );
    }

    #[test]
    fn test_negative_lengths() {
        assert_eq!(
            decode_all(b"*1\r\n$-1\r\n").unwrap_err(),
            ProtocolError::InvalidBulkLength
        );
        assert_eq!(
            decode_all(b"*-2\r\n").unwrap_err(),
            ProtocolError::InvalidArrayLength
        );
    }

    #[test]
    fn test_non_numeric_lengths() {
        assert_eq!(
            decode_all(b"*x\r\n").unwrap_err(),
            ProtocolError::InvalidArrayLength
        );
        assert_eq!(
            decode_all(b"*1\r\n$abc\r\n").unwrap_err(),
            ProtocolError::InvalidBulkLength
        );
    }

    #[test]
    fn test_unexpected_element_type() {
        assert_eq!(
            decode_all(b"*1\r\n:5\r\n").unwrap_err(),
            ProtocolError::UnexpectedType(b':')
        );
        // Nested arrays are not valid commands
        assert_eq!(
            decode_all(b"*1\r\n*1\r\n$4\r\nPING\r\n").unwrap_err(),
            ProtocolError::UnexpectedType(b'*')
        );
    }

    #[test]
    fn test_missing_trailing_crlf() {
        assert_eq!(
            decode_all(b"*1\r\n$4\r\nPINGxx").unwrap_err(),
            ProtocolError::MissingCrlf
        );
    }

    #[test]
    fn test_complete_command_before_bad_frame() {
        let mut decoder = CommandDecoder::new();
        let mut buf = BytesMut::from(&b"*1\r\n$4\r\nPING\r\n*1\r\n$-5\r\n"[..]);
        assert_eq!(decoder.decode(&mut buf).unwrap(), Some(cmd(&["PING"])));
        assert!(decoder.decode(&mut buf).is_err());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ProtocolError::UnexpectedType(b':').to_string(),
            "expected '$', got ':'"
        );
        assert_eq!(
            ProtocolError::BulkTooLarge { size: 10, max: 5 }.to_string(),
            "bulk length 10 exceeds maximum 5"
        );
    }
}
