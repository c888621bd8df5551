//! Errors produced while executing a command.

use crate::protocol::RespValue;
use crate::storage::StoreError;
use bytes::Bytes;
use thiserror::Error;

/// A command failure. Every variant becomes an error reply; none of them
/// closes the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR unknown command '{name}', with args beginning with: {args}")]
    UnknownCommand { name: String, args: String },

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),

    #[error("ERR value is not an integer or out of range")]
    NotInteger,

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpireTime(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CommandError {
    /// Builds the unknown-command error, quoting the first few arguments.
    pub fn unknown(name: &[u8], args: &[Bytes]) -> Self {
        let args = args
            .iter()
            .take(20)
            .map(|arg| format!("'{}' ", one_line(arg)))
            .collect();

        Self::UnknownCommand {
            name: one_line(name),
            args,
        }
    }
}

/// Client bytes echoed into an error line, with CR and LF turned into spaces.
fn one_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace(['\r', '\n'], " ")
}

impl From<CommandError> for RespValue {
    fn from(err: CommandError) -> Self {
        RespValue::error(err.to_string())
    }
}

/// Result type for command handlers.
pub type CommandResult = Result<RespValue, CommandError>;
