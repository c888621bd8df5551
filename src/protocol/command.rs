//! Decoded client requests.

use bytes::Bytes;
use std::fmt;

/// A single decoded request: a command name followed by its arguments.
///
/// Both the name and the arguments are kept as raw bytes; any coercion
/// (to integers, upper-cased keywords, ...) is left to the command handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: Bytes,
    args: Vec<Bytes>,
}

impl Command {
    /// Builds a command from its name and arguments.
    pub fn new(name: impl Into<Bytes>, args: Vec<Bytes>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Splits a decoded frame into name + arguments.
    ///
    /// Returns `None` for an empty frame.
    pub fn from_parts(mut parts: Vec<Bytes>) -> Option<Self> {
        if parts.is_empty() {
            return None;
        }
        let name = parts.remove(0);
        Some(Self { name, args: parts })
    }

    /// The command name exactly as sent by the client.
    pub fn name(&self) -> &Bytes {
        &self.name
    }

    /// The command name, lossily decoded as UTF-8.
    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    /// Case-insensitive comparison against an ASCII command name.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.as_bytes())
    }

    /// The arguments following the command name.
    pub fn args(&self) -> &[Bytes] {
        &self.args
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.name))?;
        for arg in &self.args {
            write!(f, " {}", String::from_utf8_lossy(arg))?;
        }
        Ok(())
    }
}
