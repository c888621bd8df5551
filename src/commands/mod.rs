//! Command Handler Module
//!
//! This module implements the command processing layer for EmberKV.
//! It receives decoded commands, executes them against the storage engine,
//! and returns appropriate responses.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ CommandDecoder  │  (protocol module)
//! └────────┬────────┘
//!          │ Command
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Lookup       │
//! │  - Arity check  │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageEngine   │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! ### Connection
//! - `PING`, `ECHO`, `QUIT`
//!
//! ### String Commands
//! - `SET key value [EX s | PX ms | KEEPTTL] [NX | XX] [GET]`, `GET`, `GETDEL`
//! - `INCR`, `INCRBY`, `DECR`, `DECRBY`
//! - `APPEND`, `STRLEN`
//! - `MSET`, `MGET`
//! - `SETNX`, `SETEX`, `PSETEX`
//!
//! ### Key Commands
//! - `DEL`, `EXISTS`
//! - `EXPIRE`, `PEXPIRE`, `TTL`, `PTTL`, `PERSIST`
//! - `KEYS`, `TYPE`
//!
//! ### List Commands
//! - `LPUSH`, `RPUSH`, `LPOP`, `RPOP`
//! - `LLEN`, `LRANGE`, `LINDEX`
//!
//! ### Server Commands
//! - `DBSIZE`, `FLUSHDB`, `FLUSHALL`
//! - `INFO`, `TIME`, `COMMAND`

pub mod error;
pub mod handler;
mod keyspace;
mod list;
mod server;
mod string;

// Re-export the main command handler
pub use error::{CommandError, CommandResult};
pub use handler::{lookup, Arity, CommandHandler, CommandSpec};
