//! Command Dispatcher
//!
//! This module routes decoded [`Command`]s to their handlers and turns the
//! outcome into a [`RespValue`] reply.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │   lookup    │───>│ arity check │───>│   handler   │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      StorageEngine          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The table maps lower-case command names to a [`CommandSpec`]. Lookup is
//! case-insensitive. Arguments stay raw [`Bytes`] until a handler coerces
//! them, and every handler performs a single engine operation so that each
//! command is applied atomically.

use crate::commands::error::{CommandError, CommandResult};
use crate::connection::ConnectionStats;
use crate::protocol::{Command, RespValue};
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use tracing::trace;

/// How many arguments (after the name) a command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

type HandlerFn = fn(&CommandHandler, &[Bytes]) -> CommandResult;

/// A registered command.
#[derive(Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub arity: Arity,
    handler: HandlerFn,
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

macro_rules! commands {
    ($($name:literal => $arity:expr, $handler:path;)*) => {
        [$(CommandSpec { name: $name, arity: $arity, handler: $handler }),*]
    };
}

static COMMANDS: LazyLock<HashMap<&'static str, CommandSpec>> = LazyLock::new(|| {
    use Arity::{AtLeast, Exact};

    let specs = commands! {
        // Connection
        "ping" => AtLeast(0), CommandHandler::cmd_ping;
        "echo" => Exact(1), CommandHandler::cmd_echo;
        "quit" => AtLeast(0), CommandHandler::cmd_quit;

        // Strings
        "set" => AtLeast(2), CommandHandler::cmd_set;
        "get" => Exact(1), CommandHandler::cmd_get;
        "getdel" => Exact(1), CommandHandler::cmd_getdel;
        "append" => Exact(2), CommandHandler::cmd_append;
        "strlen" => Exact(1), CommandHandler::cmd_strlen;
        "incr" => Exact(1), CommandHandler::cmd_incr;
        "decr" => Exact(1), CommandHandler::cmd_decr;
        "incrby" => Exact(2), CommandHandler::cmd_incrby;
        "decrby" => Exact(2), CommandHandler::cmd_decrby;
        "mget" => AtLeast(1), CommandHandler::cmd_mget;
        "mset" => AtLeast(2), CommandHandler::cmd_mset;
        "setnx" => Exact(2), CommandHandler::cmd_setnx;
        "setex" => Exact(3), CommandHandler::cmd_setex;
        "psetex" => Exact(3), CommandHandler::cmd_psetex;

        // Keys
        "del" => AtLeast(1), CommandHandler::cmd_del;
        "exists" => AtLeast(1), CommandHandler::cmd_exists;
        "ttl" => Exact(1), CommandHandler::cmd_ttl;
        "pttl" => Exact(1), CommandHandler::cmd_pttl;
        "expire" => Exact(2), CommandHandler::cmd_expire;
        "pexpire" => Exact(2), CommandHandler::cmd_pexpire;
        "persist" => Exact(1), CommandHandler::cmd_persist;
        "type" => Exact(1), CommandHandler::cmd_type;
        "keys" => Exact(1), CommandHandler::cmd_keys;

        // Lists
        "lpush" => AtLeast(2), CommandHandler::cmd_lpush;
        "rpush" => AtLeast(2), CommandHandler::cmd_rpush;
        "lpop" => AtLeast(1), CommandHandler::cmd_lpop;
        "rpop" => AtLeast(1), CommandHandler::cmd_rpop;
        "llen" => Exact(1), CommandHandler::cmd_llen;
        "lrange" => Exact(3), CommandHandler::cmd_lrange;
        "lindex" => Exact(2), CommandHandler::cmd_lindex;

        // Server
        "dbsize" => Exact(0), CommandHandler::cmd_dbsize;
        "flushdb" => AtLeast(0), CommandHandler::cmd_flushdb;
        "flushall" => AtLeast(0), CommandHandler::cmd_flushdb;
        "info" => AtLeast(0), CommandHandler::cmd_info;
        "time" => Exact(0), CommandHandler::cmd_time;
        "command" => AtLeast(0), CommandHandler::cmd_command;
    };

    specs.into_iter().map(|spec| (spec.name, spec)).collect()
});

/// Looks up a command by name, ignoring ASCII case.
pub fn lookup(name: &[u8]) -> Option<&'static CommandSpec> {
    let name = std::str::from_utf8(name).ok()?.to_ascii_lowercase();
    COMMANDS.get(name.as_str())
}

/// Every registered command, sorted by name.
pub fn command_names() -> Vec<&'static str> {
    let mut names: Vec<_> = COMMANDS.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Executes commands against the shared keyspace.
///
/// Cheap to clone; every connection gets its own handle.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    /// The storage engine
    pub(super) storage: Arc<StorageEngine>,
    /// Connection counters reported by INFO
    pub(super) stats: Arc<ConnectionStats>,
    /// Server start time for INFO command
    pub(super) start_time: Instant,
}

impl CommandHandler {
    /// Creates a new command handler with the given storage engine.
    pub fn new(storage: Arc<StorageEngine>, stats: Arc<ConnectionStats>) -> Self {
        Self {
            storage,
            stats,
            start_time: Instant::now(),
        }
    }

    /// The keyspace this handler operates on.
    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    /// Executes a command and returns the reply.
    ///
    /// Never fails: unknown commands, arity mismatches and handler errors all
    /// become error replies.
    pub fn dispatch(&self, command: &Command) -> RespValue {
        match self.try_dispatch(command) {
            Ok(reply) => reply,
            Err(err) => {
                trace!(command = %command.name_lossy(), error = %err, "Command failed");
                err.into()
            }
        }
    }

    fn try_dispatch(&self, command: &Command) -> CommandResult {
        let args = command.args();
        let spec = lookup(command.name())
            .ok_or_else(|| CommandError::unknown(command.name(), args))?;

        if !spec.arity.accepts(args.len()) {
            return Err(CommandError::WrongArity(spec.name.to_string()));
        }

        (spec.handler)(self, args)
    }
}

// ============================================================================
// Argument coercion
// ============================================================================

/// Parses a base-10 signed 64-bit integer argument.
pub(super) fn parse_int(arg: &[u8]) -> Result<i64, CommandError> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(CommandError::NotInteger)
}

/// Parses a non-negative integer argument.
pub(super) fn parse_count(arg: &[u8]) -> Result<usize, CommandError> {
    usize::try_from(parse_int(arg)?).map_err(|_| CommandError::NotInteger)
}

/// Case-insensitive keyword comparison.
#[inline]
pub(super) fn is_keyword(arg: &[u8], keyword: &str) -> bool {
    arg.eq_ignore_ascii_case(keyword.as_bytes())
}

/// Unit of a relative expiry argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TimeUnit {
    Seconds,
    Millis,
}

/// Converts a positive relative TTL into an absolute deadline.
///
/// Returns None if the amount is not positive or the deadline would overflow.
pub(super) fn deadline_after(amount: i64, unit: TimeUnit) -> Option<Instant> {
    if amount <= 0 {
        return None;
    }
    let millis = match unit {
        TimeUnit::Seconds => amount.checked_mul(1000)?,
        TimeUnit::Millis => amount,
    };
    Instant::now().checked_add(Duration::from_millis(millis as u64))
}

/// Encodes a list of values as an array of bulk strings.
pub(super) fn bulk_array(values: impl IntoIterator<Item = Bytes>) -> RespValue {
    RespValue::array(values.into_iter().map(RespValue::bulk_string).collect())
}
