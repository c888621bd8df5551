//! Connection Handler Module
//!
//! This module manages individual client connections to EmberKV.
//! Each client connection is handled by its own async task, allowing
//! the server to handle thousands of concurrent clients efficiently.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (server.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept()
//!                        ▼
//!           ┌────────────────────────┐
//!           │   For each client...   │
//!           └────────────┬───────────┘
//!                        │
//!                        │ spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler (I/O)                     │
//! │                                                             │
//! │  ┌─────────────┐    ┌───────────────────────┐   ┌────────┐  │
//! │  │ Read bytes  │───>│ Session::process()    │──>│ Write  │  │
//! │  └─────────────┘    │ decode, dispatch,     │   │ replies│  │
//! │                     │ encode                │   └────────┘  │
//! │                     └───────────────────────┘               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Async I/O**: Works over any `AsyncRead + AsyncWrite` stream
//! - **Pipelining**: Supports multiple commands in a single TCP packet
//! - **Backpressure**: Stops reading while too many replies are unsent
//! - **Statistics**: Tracks connection and command metrics
//!
//! ## Example
//!
//! ```ignore
//! use emberkv::connection::{handle_connection, ConnectionStats, SessionConfig};
//! use emberkv::commands::CommandHandler;
//! use emberkv::storage::StorageEngine;
//! use std::sync::Arc;
//!
//! let storage = Arc::new(StorageEngine::new());
//! let stats = Arc::new(ConnectionStats::new());
//! let handler = CommandHandler::new(storage, Arc::clone(&stats));
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, handler, SessionConfig::default(), stats, shutdown_rx));
//! ```

pub mod handler;
pub mod session;

// Re-export commonly used types
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
pub use session::{Session, SessionConfig, SessionState, DEFAULT_OUTPUT_HIGH_WATER};
