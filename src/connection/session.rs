//! Per-connection session state.
//!
//! A [`Session`] owns everything one client needs: the decoder, the input
//! buffer, the outbound buffer and the lifecycle state. It does no I/O.
//! The async driver in [`super::handler`] moves bytes between the socket and
//! these buffers and calls [`Session::process`] to run the commands.
//!
//! ## Lifecycle
//!
//! ```text
//!  Connecting ──activate──> Active ──QUIT / EOF / protocol error / shutdown──> Closing
//!                             │                                                  │
//!                             │ transport error                 output flushed   │
//!                             ▼                                                  ▼
//!                           Closed <─────────────────────────────────────────────┘
//! ```

use crate::commands::CommandHandler;
use crate::connection::ConnectionStats;
use crate::protocol::{CommandDecoder, DecoderLimits, ProtocolError, RespValue};
use bytes::{Buf, BytesMut};
use std::sync::Arc;

/// Default outbound buffer size above which the session stops reading (1 MiB)
pub const DEFAULT_OUTPUT_HIGH_WATER: usize = 1024 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Free space guaranteed in the input buffer before each read
const READ_RESERVE: usize = 4096;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, not yet serving
    Connecting,
    /// Reading, executing and replying
    Active,
    /// No more input is read; pending output is flushed
    Closing,
    /// Terminal
    Closed,
}

/// Per-session limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Limits enforced by the decoder
    pub limits: DecoderLimits,
    /// Outbound buffer size above which reading pauses
    pub output_high_water: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            limits: DecoderLimits::default(),
            output_high_water: DEFAULT_OUTPUT_HIGH_WATER,
        }
    }
}

/// State of a single client connection.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    decoder: CommandDecoder,
    input: BytesMut,
    output: BytesMut,
    handler: CommandHandler,
    high_water: usize,
    stats: Arc<ConnectionStats>,
}

impl Session {
    /// Creates a session in the `Connecting` state.
    pub fn new(handler: CommandHandler, config: SessionConfig, stats: Arc<ConnectionStats>) -> Self {
        Self {
            state: SessionState::Connecting,
            decoder: CommandDecoder::with_limits(config.limits),
            input: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            output: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            handler,
            high_water: config.output_high_water.max(1),
            stats,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Starts serving. Only valid from `Connecting`.
    pub fn activate(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Active;
        }
    }

    /// True when the driver should read more input.
    ///
    /// Reading pauses while the outbound buffer is at or above the high-water
    /// mark and stops for good once the session leaves `Active`.
    pub fn wants_read(&self) -> bool {
        self.state == SessionState::Active && self.output.len() < self.high_water
    }

    /// True when there are bytes waiting to be written.
    pub fn has_output(&self) -> bool {
        !self.output.is_empty()
    }

    /// Bytes buffered for the client.
    pub fn pending_output(&self) -> &[u8] {
        &self.output
    }

    /// Bytes received but not yet decoded.
    pub fn buffered_input(&self) -> usize {
        self.input.len()
    }

    /// Split borrow of both buffers so the driver can read and write at once.
    pub fn buffers_mut(&mut self) -> (&mut BytesMut, &[u8]) {
        if self.input.capacity() - self.input.len() < READ_RESERVE {
            self.input.reserve(READ_RESERVE);
        }
        (&mut self.input, &self.output)
    }

    /// Drops the first `n` bytes of the outbound buffer after a (possibly
    /// partial) write.
    pub fn advance_output(&mut self, n: usize) {
        self.output.advance(n.min(self.output.len()));
        self.settle();
    }

    /// Decodes and executes every complete command in the input buffer.
    ///
    /// Stops early when the outbound buffer reaches the high-water mark; the
    /// rest of the input stays buffered until the output drains. Returns the
    /// number of commands executed.
    ///
    /// On a malformed frame an error reply is queued after the replies of the
    /// commands decoded before it, the session moves to `Closing` and the
    /// error is returned.
    pub fn process(&mut self) -> Result<usize, ProtocolError> {
        let mut executed = 0;

        while self.state == SessionState::Active && self.output.len() < self.high_water {
            match self.decoder.decode(&mut self.input) {
                Ok(Some(command)) => {
                    let reply = self.handler.dispatch(&command);
                    reply.serialize_into(&mut self.output);
                    self.stats.command_processed();
                    executed += 1;

                    if command.is("quit") {
                        self.state = SessionState::Closing;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    RespValue::error(format!("ERR Protocol error: {}", err))
                        .serialize_into(&mut self.output);
                    self.stats.protocol_error();
                    self.input.clear();
                    self.state = SessionState::Closing;
                    self.settle();
                    return Err(err);
                }
            }
        }

        self.settle();
        Ok(executed)
    }

    /// The client closed its side of the connection.
    pub fn on_eof(&mut self) {
        self.close();
    }

    /// The server is shutting down.
    pub fn shutdown(&mut self) {
        self.close();
    }

    /// Reading or writing failed; nothing more can be sent.
    pub fn on_transport_error(&mut self) {
        self.output.clear();
        self.state = SessionState::Closed;
    }

    fn close(&mut self) {
        if matches!(self.state, SessionState::Connecting | SessionState::Active) {
            self.state = SessionState::Closing;
        }
        self.settle();
    }

    /// `Closing` becomes `Closed` once everything has been written.
    fn settle(&mut self) {
        if self.state == SessionState::Closing && self.output.is_empty() {
            self.state = SessionState::Closed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageEngine;
    use bytes::Bytes;

    fn session_with(high_water: usize) -> Session {
        let stats = Arc::new(ConnectionStats::new());
        let handler = CommandHandler::new(Arc::new(StorageEngine::new()), Arc::clone(&stats));
        let config = SessionConfig {
            output_high_water: high_water,
            ..Default::default()
        };
        let mut session = Session::new(handler, config, stats);
        session.activate();
        session
    }

    fn feed(session: &mut Session, bytes: &[u8]) {
        session.buffers_mut().0.extend_from_slice(bytes);
    }

    fn drain(session: &mut Session) -> Bytes {
        let out = Bytes::copy_from_slice(session.pending_output());
        session.advance_output(out.len());
        out
    }

    #[test]
    fn test_lifecycle() {
        let stats = Arc::new(ConnectionStats::new());
        let handler = CommandHandler::new(Arc::new(StorageEngine::new()), Arc::clone(&stats));
        let mut session = Session::new(handler, SessionConfig::default(), stats);

        assert_eq!(session.state(), SessionState::Connecting);
        assert!(!session.wants_read());

        session.activate();
        assert_eq!(session.state(), SessionState::Active);
        assert!(session.wants_read());

        session.on_eof();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_process_pipelined_commands() {
        let mut session = session_with(DEFAULT_OUTPUT_HIGH_WATER);

        feed(&mut session, b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n*2\r\n$3\r\nGET\r\n$1\r\nk\r\n*1\r\n$4\r\nPI");
        assert_eq!(session.process(), Ok(2));
        assert_eq!(drain(&mut session), Bytes::from("+OK\r\n$1\r\nv\r\n"));

        feed(&mut session, b"NG\r\n");
        assert_eq!(session.process(), Ok(1));
        assert_eq!(drain(&mut session), Bytes::from("+PONG\r\n"));
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn test_protocol_error_after_earlier_replies() {
        let mut session = session_with(DEFAULT_OUTPUT_HIGH_WATER);

        feed(&mut session, b"*1\r\n$4\r\nPING\r\n*1\r\n$x\r\nPING\r\n*1\r\n$4\r\nPING\r\n");
        assert!(session.process().is_err());
        assert_eq!(session.state(), SessionState::Closing);
        assert!(!session.wants_read());

        let out = drain(&mut session);
        assert!(out.starts_with(b"+PONG\r\n-ERR Protocol error: "));
        assert_eq!(out.iter().filter(|&&b| b == b'\n').count(), 2);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_quit_closes_after_reply() {
        let mut session = session_with(DEFAULT_OUTPUT_HIGH_WATER);

        feed(&mut session, b"QUIT\r\nPING\r\n");
        assert_eq!(session.process(), Ok(1));
        assert_eq!(session.state(), SessionState::Closing);

        assert_eq!(drain(&mut session), Bytes::from("+OK\r\n"));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_backpressure_pauses_decoding() {
        let mut session = session_with(16);

        feed(&mut session, &b"PING\r\n".repeat(10));
        // Each +PONG is 7 bytes: stop after crossing 16
        assert_eq!(session.process(), Ok(3));
        assert!(!session.wants_read());
        assert!(session.buffered_input() > 0);

        // Partial write below the mark resumes decoding
        session.advance_output(10);
        assert!(session.wants_read());
        assert_eq!(session.process(), Ok(1));

        let mut total = 0;
        loop {
            total += drain(&mut session).len();
            if session.process() == Ok(0) {
                break;
            }
        }
        assert_eq!(total + 10, 10 * 7);
        assert_eq!(session.buffered_input(), 0);
    }

    #[test]
    fn test_transport_error_is_terminal() {
        let mut session = session_with(DEFAULT_OUTPUT_HIGH_WATER);

        feed(&mut session, b"PING\r\n");
        session.process().unwrap();
        session.on_transport_error();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!session.has_output());
    }

    #[test]
    fn test_eof_flushes_pending_output() {
        let mut session = session_with(DEFAULT_OUTPUT_HIGH_WATER);

        feed(&mut session, b"PING\r\n");
        session.process().unwrap();
        session.on_eof();
        assert_eq!(session.state(), SessionState::Closing);
        assert_eq!(drain(&mut session), Bytes::from("+PONG\r\n"));
        assert_eq!(session.state(), SessionState::Closed);
    }
}
