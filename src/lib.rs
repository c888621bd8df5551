//! # EmberKV - An In-Memory Key-Value Server Speaking RESP
//!
//! EmberKV is a Redis-compatible, in-memory key-value server written in Rust.
//! Clients talk to it over TCP using the RESP wire protocol; it keeps string
//! and list values in a sharded keyspace with per-key expiry.
//!
//! ## Features
//!
//! - **Redis-Compatible**: Speaks RESP (and inline commands) with Redis-style replies
//! - **Sharded Keyspace**: 64 independently locked shards, atomic commands
//! - **TTL Support**: Lazy expiry on access plus a bounded background sweeper
//! - **Async I/O**: Built on Tokio, one task per connection, with backpressure
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              EmberKV                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Session    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐   │
//! │  │   RESP      │    │              StorageEngine                   │   │
//! │  │  Decoder /  │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │  │  Encoder    │    │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │   │
//! │  └─────────────┘    │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     └──────────────────────────────────────────────┘   │
//! │                                               ▲                         │
//! │                                               │                         │
//! │                     ┌─────────────────────────┴───────────────────────┐ │
//! │                     │           ExpirySweeper                         │ │
//! │                     │      (Background Tokio Task)                    │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use emberkv::{Config, Server};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let config = Config::builder().port(6379).build();
//!     let server = Server::bind(config).await?;
//!
//!     server
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP decoder, command type and reply encoding
//! - [`storage`]: Sharded keyspace with TTL support and the expiry sweeper
//! - [`commands`]: Command table and handlers
//! - [`connection`]: Session state machine and its async I/O driver
//! - [`config`]: Server configuration
//! - [`server`]: TCP accept loop and graceful shutdown
//!
//! ## Design Highlights
//!
//! ### Thread Safety
//!
//! The storage engine uses a sharded design with 64 independent RwLocks.
//! Every command is one engine call, which does all its work inside the
//! shard lock(s) it needs, so concurrent commands never observe each other
//! half-done.
//!
//! ### Owned Arguments
//!
//! The decoder copies each argument out of the connection's `BytesMut` input
//! buffer into its own `Bytes`, so a stored key or value holds only its own
//! bytes and the read buffer is reused for the next request.
//!
//! ### Lazy + Active Expiry
//!
//! Keys with TTL are expired in two ways:
//! 1. **Lazy**: When a key is accessed, we check if it's expired
//! 2. **Active**: A background task removes expired keys in bounded batches
//!
//! This ensures memory is reclaimed even for keys that are never accessed again.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats, SessionConfig};
pub use protocol::{Command, CommandDecoder, ProtocolError, RespValue};
pub use server::Server;
pub use storage::{ExpiryConfig, ExpirySweeper, StorageEngine};

/// The default port EmberKV listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host EmberKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of EmberKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
