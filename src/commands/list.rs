//! List commands.

use crate::commands::error::{CommandError, CommandResult};
use crate::commands::handler::{bulk_array, parse_count, parse_int, CommandHandler};
use crate::protocol::RespValue;
use crate::storage::ListEnd;
use bytes::Bytes;

impl CommandHandler {
    /// LPUSH key value [value ...]
    pub(super) fn cmd_lpush(&self, args: &[Bytes]) -> CommandResult {
        self.push(args, ListEnd::Front)
    }

    /// RPUSH key value [value ...]
    pub(super) fn cmd_rpush(&self, args: &[Bytes]) -> CommandResult {
        self.push(args, ListEnd::Back)
    }

    fn push(&self, args: &[Bytes], end: ListEnd) -> CommandResult {
        let len = self.storage.push(&args[0], args[1..].to_vec(), end)?;
        Ok(RespValue::integer(len as i64))
    }

    /// LPOP key [count]
    pub(super) fn cmd_lpop(&self, args: &[Bytes]) -> CommandResult {
        self.pop(args, ListEnd::Front, "lpop")
    }

    /// RPOP key [count]
    pub(super) fn cmd_rpop(&self, args: &[Bytes]) -> CommandResult {
        self.pop(args, ListEnd::Back, "rpop")
    }

    /// Without a count, replies with a single element (or null).
    /// With a count, replies with an array (or a null array).
    fn pop(&self, args: &[Bytes], end: ListEnd, name: &str) -> CommandResult {
        match args {
            [key] => {
                let popped = self.storage.pop(key, end, 1)?;
                let first = popped.and_then(|values| values.into_iter().next());
                Ok(RespValue::optional_bulk(first))
            }
            [key, count] => {
                let count = parse_count(count)?;
                Ok(match self.storage.pop(key, end, count)? {
                    Some(values) => bulk_array(values),
                    None => RespValue::NullArray,
                })
            }
            _ => Err(CommandError::WrongArity(name.to_string())),
        }
    }

    /// LLEN key
    pub(super) fn cmd_llen(&self, args: &[Bytes]) -> CommandResult {
        let len = self.storage.llen(&args[0])?;
        Ok(RespValue::integer(len as i64))
    }

    /// LRANGE key start stop
    pub(super) fn cmd_lrange(&self, args: &[Bytes]) -> CommandResult {
        let start = parse_int(&args[1])?;
        let stop = parse_int(&args[2])?;
        Ok(bulk_array(self.storage.lrange(&args[0], start, stop)?))
    }

    /// LINDEX key index
    pub(super) fn cmd_lindex(&self, args: &[Bytes]) -> CommandResult {
        let index = parse_int(&args[1])?;
        Ok(RespValue::optional_bulk(self.storage.lindex(&args[0], index)?))
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::CommandHandler;
    use crate::connection::ConnectionStats;
    use crate::protocol::{Command, RespValue};
    use crate::storage::StorageEngine;
    use bytes::Bytes;
    use std::sync::Arc;

    fn create_handler() -> CommandHandler {
        CommandHandler::new(
            Arc::new(StorageEngine::new()),
            Arc::new(ConnectionStats::new()),
        )
    }

    fn cmd(handler: &CommandHandler, args: &[&str]) -> RespValue {
        let parts = args.iter().map(|s| Bytes::from(s.to_string())).collect();
        handler.dispatch(&Command::from_parts(parts).unwrap())
    }

    fn bulks(items: &[&'static str]) -> RespValue {
        RespValue::array(items.iter().map(|s| RespValue::bulk_string(*s)).collect())
    }

    #[test]
    fn test_push_and_range() {
        let handler = create_handler();

        assert_eq!(cmd(&handler, &["LPUSH", "l", "a", "b"]), RespValue::integer(2));
        assert_eq!(cmd(&handler, &["RPUSH", "l", "c"]), RespValue::integer(3));
        assert_eq!(cmd(&handler, &["LRANGE", "l", "0", "-1"]), bulks(&["b", "a", "c"]));
        assert_eq!(cmd(&handler, &["LRANGE", "l", "1", "1"]), bulks(&["a"]));
        assert_eq!(cmd(&handler, &["LRANGE", "missing", "0", "-1"]), bulks(&[]));
        assert_eq!(cmd(&handler, &["LLEN", "l"]), RespValue::integer(3));
    }

    #[test]
    fn test_pop() {
        let handler = create_handler();

        cmd(&handler, &["RPUSH", "l", "a", "b", "c", "d"]);
        assert_eq!(cmd(&handler, &["LPOP", "l"]), RespValue::bulk_string("a"));
        assert_eq!(cmd(&handler, &["RPOP", "l"]), RespValue::bulk_string("d"));
        assert_eq!(cmd(&handler, &["LPOP", "l", "5"]), bulks(&["b", "c"]));
        assert_eq!(cmd(&handler, &["LPOP", "l"]), RespValue::null());
        assert_eq!(cmd(&handler, &["LPOP", "l", "2"]), RespValue::NullArray);
        assert_eq!(cmd(&handler, &["EXISTS", "l"]), RespValue::integer(0));
    }

    #[test]
    fn test_pop_arguments() {
        let handler = create_handler();

        cmd(&handler, &["RPUSH", "l", "a"]);
        assert_eq!(
            cmd(&handler, &["LPOP", "l", "-1"]),
            RespValue::error("ERR value is not an integer or out of range")
        );
        assert_eq!(
            cmd(&handler, &["LPOP", "l", "1", "2"]),
            RespValue::error("ERR wrong number of arguments for 'lpop' command")
        );
        assert_eq!(cmd(&handler, &["LLEN", "l"]), RespValue::integer(1));
    }

    #[test]
    fn test_lindex() {
        let handler = create_handler();

        cmd(&handler, &["RPUSH", "l", "a", "b"]);
        assert_eq!(cmd(&handler, &["LINDEX", "l", "0"]), RespValue::bulk_string("a"));
        assert_eq!(cmd(&handler, &["LINDEX", "l", "-1"]), RespValue::bulk_string("b"));
        assert_eq!(cmd(&handler, &["LINDEX", "l", "2"]), RespValue::null());
        assert_eq!(
            cmd(&handler, &["LINDEX", "l", "x"]),
            RespValue::error("ERR value is not an integer or out of range")
        );
    }

    #[test]
    fn test_list_op_on_string_is_wrongtype() {
        let handler = create_handler();
        let wrongtype =
            RespValue::error("WRONGTYPE Operation against a key holding the wrong kind of value");

        cmd(&handler, &["SET", "s", "value"]);
        assert_eq!(cmd(&handler, &["LPUSH", "s", "x"]), wrongtype);
        assert_eq!(cmd(&handler, &["RPOP", "s"]), wrongtype);
        assert_eq!(cmd(&handler, &["LRANGE", "s", "0", "-1"]), wrongtype);
        assert_eq!(cmd(&handler, &["GET", "s"]), RespValue::bulk_string("value"));

        cmd(&handler, &["RPUSH", "l", "x"]);
        assert_eq!(cmd(&handler, &["GET", "l"]), wrongtype);
        assert_eq!(cmd(&handler, &["INCR", "l"]), wrongtype);
    }
}
