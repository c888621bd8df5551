//! Connection Handler Module
//!
//! This module drives one client connection. The [`Session`] decides what to
//! do; the handler here only performs the I/O it asks for.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned, session activated
//!        │
//!        ▼
//! 3. ┌──────────────────────────────────────────┐
//!    │      Main Loop (select!)                 │
//!    │                                          │
//!    │  read  ── if below the high-water mark   │
//!    │  write ── if replies are pending         │
//!    │  shutdown signal                         │
//!    │              │                           │
//!    │              ▼                           │
//!    │     Session::process()                   │
//!    │              │                           │
//!    │         [Loop back]                      │
//!    └──────────────────────────────────────────┘
//!        │
//!        ▼
//! 4. QUIT / EOF / protocol error / shutdown: flush, then close
//!        │
//!        ▼
//! 5. Handler task ends, buffers dropped
//! ```
//!
//! ## Backpressure
//!
//! Reads are only issued while the session's outbound buffer is below the
//! high-water mark. A client that pipelines commands but never reads its
//! replies therefore stops being read from, and the kernel's socket buffers
//! push back on it.

use crate::commands::CommandHandler;
use crate::connection::session::{Session, SessionConfig, SessionState};
use crate::protocol::ProtocolError;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Connections closed because of malformed input
    pub protocol_errors: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client sent bytes that are not a valid request
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// What woke the main loop.
enum Event {
    Read(std::io::Result<usize>),
    Wrote(std::io::Result<usize>),
    Shutdown,
}

/// Drives one client connection over any async byte stream.
pub struct ConnectionHandler<S> {
    /// The client stream (a `TcpStream` in production)
    stream: S,

    /// Client's address (for logging)
    peer: String,

    /// Protocol and lifecycle state
    session: Session,

    /// Server-wide shutdown signal
    shutdown: Option<watch::Receiver<bool>>,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The byte stream for this connection
    /// * `peer` - The client's address, used in log lines
    /// * `command_handler` - The command handler for executing commands
    /// * `config` - Decoder limits and output high-water mark
    /// * `stats` - Shared connection statistics
    pub fn new(
        stream: S,
        peer: impl Display,
        command_handler: CommandHandler,
        config: SessionConfig,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream,
            peer: peer.to_string(),
            session: Session::new(command_handler, config, Arc::clone(&stats)),
            shutdown: None,
            stats,
        }
    }

    /// Closes the session gracefully when `shutdown` flips to true.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Runs the connection until the session is closed.
    ///
    /// Returns the protocol error that closed the session, if any, after its
    /// error reply has been flushed.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.peer, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.peer, "Client disconnected"),
            Err(ConnectionError::Io(e)) if e.kind() == std::io::ErrorKind::ConnectionReset => {
                debug!(client = %self.peer, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.peer, error = %e, "Connection closed with error"),
        }

        self.stats.connection_closed();
        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        let Self {
            stream,
            peer,
            session,
            shutdown,
            stats,
        } = self;
        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut protocol_error: Option<ProtocolError> = None;

        session.activate();

        loop {
            if let Err(e) = session.process() {
                debug!(client = %peer, error = %e, "Protocol error, closing after flush");
                protocol_error = Some(e);
            }

            if session.state() == SessionState::Closed {
                break;
            }

            let wants_read = session.wants_read();
            let has_output = session.has_output();
            let active = session.state() == SessionState::Active;

            let event = {
                let (input, output) = session.buffers_mut();
                tokio::select! {
                    result = reader.read_buf(input), if wants_read => Event::Read(result),
                    result = writer.write(output), if has_output => Event::Wrote(result),
                    _ = wait_for_shutdown(shutdown), if active => Event::Shutdown,
                    else => Event::Shutdown,
                }
            };

            match event {
                Event::Read(Ok(0)) => {
                    trace!(
                        client = %peer,
                        buffered = session.buffered_input(),
                        "Client closed its side"
                    );
                    session.on_eof();
                }
                Event::Read(Ok(n)) => {
                    stats.bytes_read(n);
                    trace!(client = %peer, bytes = n, "Read data");
                }
                Event::Wrote(Ok(0)) => {
                    session.on_transport_error();
                    return Err(std::io::Error::from(std::io::ErrorKind::WriteZero).into());
                }
                Event::Wrote(Ok(n)) => {
                    stats.bytes_written(n);
                    session.advance_output(n);
                    trace!(client = %peer, bytes = n, "Sent response bytes");
                    if !session.has_output() {
                        writer.flush().await?;
                    }
                }
                Event::Read(Err(e)) | Event::Wrote(Err(e)) => {
                    session.on_transport_error();
                    return Err(e.into());
                }
                Event::Shutdown => {
                    debug!(client = %peer, "Closing connection for server shutdown");
                    session.shutdown();
                }
            }
        }

        // Best effort: the client may already be gone
        let _ = writer.shutdown().await;

        match protocol_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

/// Resolves once the shutdown flag is set. Never resolves without a receiver
/// or after the sender is dropped.
async fn wait_for_shutdown(shutdown: &mut Option<watch::Receiver<bool>>) {
    if let Some(rx) = shutdown {
        let stopped = rx.wait_for(|stop| *stop).await.is_ok();
        if stopped {
            return;
        }
    }
    std::future::pending::<()>().await
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion.
pub async fn handle_connection<S>(
    stream: S,
    peer: impl Display,
    command_handler: CommandHandler,
    config: SessionConfig,
    stats: Arc<ConnectionStats>,
    shutdown: watch::Receiver<bool>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, peer, command_handler, config, stats)
        .with_shutdown(shutdown);
    // Outcome already logged by run()
    let _ = handler.run().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageEngine;
    use std::time::Duration;
    use tokio::io::duplex;
    use tokio_test::io::Builder;

    fn command_handler(stats: &Arc<ConnectionStats>) -> CommandHandler {
        CommandHandler::new(Arc::new(StorageEngine::new()), Arc::clone(stats))
    }

    fn handler_for<S>(stream: S, config: SessionConfig) -> (ConnectionHandler<S>, Arc<ConnectionStats>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let stats = Arc::new(ConnectionStats::new());
        let handler = ConnectionHandler::new(
            stream,
            "test-client",
            command_handler(&stats),
            config,
            Arc::clone(&stats),
        );
        (handler, stats)
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let mock = Builder::new()
            .read(b"*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n")
            .build();

        let (handler, stats) = handler_for(mock, SessionConfig::default());
        handler.run().await.unwrap();

        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_command_split_across_reads() {
        let mock = Builder::new()
            .read(b"*3\r\n$3\r\nSET\r\n$4\r\nna")
            .read(b"me\r\n$4\r\nAriz\r\n*2\r\n$3\r\nGET\r\n")
            .read(b"$4\r\nname\r\n")
            .write(b"+OK\r\n")
            .write(b"$4\r\nAriz\r\n")
            .build();

        let (handler, _) = handler_for(mock, SessionConfig::default());
        handler.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_pipelined_commands() {
        let mock = Builder::new()
            .read(b"*3\r\n$3\r\nSET\r\n$2\r\nk1\r\n$2\r\nv1\r\n*2\r\n$3\r\nGET\r\n$2\r\nk1\r\n*1\r\n$4\r\nPING\r\n")
            .write(b"+OK\r\n$2\r\nv1\r\n+PONG\r\n")
            .build();

        let (handler, stats) = handler_for(mock, SessionConfig::default());
        handler.run().await.unwrap();
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_unknown_command_keeps_connection_open() {
        let mock = Builder::new()
            .read(b"*1\r\n$5\r\nHELLO\r\n")
            .write(b"-ERR unknown command 'HELLO', with args beginning with: \r\n")
            .read(b"*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n")
            .build();

        let (handler, _) = handler_for(mock, SessionConfig::default());
        handler.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_bulk_closes_after_flush() {
        let config = SessionConfig {
            limits: crate::protocol::DecoderLimits {
                max_bulk_len: 8,
                ..Default::default()
            },
            ..Default::default()
        };
        let mock = Builder::new()
            .read(b"*1\r\n$4\r\nPING\r\n*2\r\n$3\r\nGET\r\n$100\r\n")
            .write(b"+PONG\r\n-ERR Protocol error: bulk length 100 exceeds maximum 8\r\n")
            .build();

        let (handler, stats) = handler_for(mock, config);
        let result = handler.run().await;

        assert!(matches!(
            result,
            Err(ConnectionError::Protocol(ProtocolError::BulkTooLarge { size: 100, max: 8 }))
        ));
        assert_eq!(stats.protocol_errors.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_quit_closes_connection() {
        let mock = Builder::new()
            .read(b"*1\r\n$4\r\nQUIT\r\n*1\r\n$4\r\nPING\r\n")
            .write(b"+OK\r\n")
            .build();

        let (handler, stats) = handler_for(mock, SessionConfig::default());
        handler.run().await.unwrap();
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_read_error_ends_connection() {
        let mock = Builder::new()
            .read_error(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"))
            .build();

        let (handler, stats) = handler_for(mock, SessionConfig::default());
        assert!(matches!(handler.run().await, Err(ConnectionError::Io(_))));
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_backpressure_stops_reading() {
        let config = SessionConfig {
            output_high_water: 64,
            ..Default::default()
        };
        let (client, server) = duplex(256);
        let (handler, stats) = handler_for(server, config);
        let server_task = tokio::spawn(handler.run());

        let (mut client_read, mut client_write) = tokio::io::split(client);
        let requests = b"PING\r\n".repeat(2000);
        let writer = tokio::spawn(async move {
            client_write.write_all(&requests).await.unwrap();
            client_write
        });

        // Nobody reads the replies, so the server must stop reading requests
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!writer.is_finished());
        let processed = stats.commands_processed.load(Ordering::Relaxed);
        assert!(processed < 2000, "processed {} commands", processed);

        // Draining the replies lets every command through
        let mut replies = vec![0u8; 2000 * 7];
        client_read.read_exact(&mut replies).await.unwrap();
        assert!(replies.chunks(7).all(|chunk| chunk == b"+PONG\r\n"));

        let client_write = writer.await.unwrap();
        drop(client_write);
        drop(client_read);
        server_task.await.unwrap().unwrap();
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 2000);
    }

    #[tokio::test]
    async fn test_shutdown_signal_closes_idle_connection() {
        let (client, server) = duplex(1024);
        let (tx, rx) = watch::channel(false);
        let (handler, _) = handler_for(server, SessionConfig::default());
        let server_task = tokio::spawn(handler.with_shutdown(rx).run());

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), server_task)
            .await
            .expect("connection should close on shutdown")
            .unwrap()
            .unwrap();
        drop(client);
    }
}
