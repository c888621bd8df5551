//! Generic key commands: DEL, EXISTS, TTL/PTTL, EXPIRE/PEXPIRE, PERSIST,
//! TYPE and KEYS.

use crate::commands::error::{CommandError, CommandResult};
use crate::commands::handler::{bulk_array, deadline_after, parse_int, CommandHandler, TimeUnit};
use crate::protocol::RespValue;
use crate::storage::KeyTtl;
use bytes::Bytes;
use std::time::Instant;

impl CommandHandler {
    /// DEL key [key ...]
    pub(super) fn cmd_del(&self, args: &[Bytes]) -> CommandResult {
        Ok(RespValue::integer(self.storage.delete_many(args) as i64))
    }

    /// EXISTS key [key ...]
    pub(super) fn cmd_exists(&self, args: &[Bytes]) -> CommandResult {
        Ok(RespValue::integer(self.storage.exists_many(args) as i64))
    }

    /// TTL key
    pub(super) fn cmd_ttl(&self, args: &[Bytes]) -> CommandResult {
        Ok(self.ttl(&args[0], TimeUnit::Seconds))
    }

    /// PTTL key
    pub(super) fn cmd_pttl(&self, args: &[Bytes]) -> CommandResult {
        Ok(self.ttl(&args[0], TimeUnit::Millis))
    }

    /// -2 if the key is missing, -1 if it never expires.
    fn ttl(&self, key: &Bytes, unit: TimeUnit) -> RespValue {
        let value = match self.storage.ttl(key) {
            KeyTtl::Missing => -2,
            KeyTtl::Persistent => -1,
            KeyTtl::Expires(left) => {
                let millis = i64::try_from(left.as_millis()).unwrap_or(i64::MAX);
                match unit {
                    TimeUnit::Millis => millis,
                    TimeUnit::Seconds => millis.saturating_add(500) / 1000,
                }
            }
        };
        RespValue::integer(value)
    }

    /// EXPIRE key seconds
    pub(super) fn cmd_expire(&self, args: &[Bytes]) -> CommandResult {
        self.expire(args, TimeUnit::Seconds, "expire")
    }

    /// PEXPIRE key milliseconds
    pub(super) fn cmd_pexpire(&self, args: &[Bytes]) -> CommandResult {
        self.expire(args, TimeUnit::Millis, "pexpire")
    }

    /// A non-positive TTL deletes the key.
    fn expire(&self, args: &[Bytes], unit: TimeUnit, name: &str) -> CommandResult {
        let amount = parse_int(&args[1])?;
        let deadline = if amount <= 0 {
            Instant::now()
        } else {
            deadline_after(amount, unit)
                .ok_or_else(|| CommandError::InvalidExpireTime(name.to_string()))?
        };
        Ok(RespValue::integer(self.storage.expire(&args[0], deadline) as i64))
    }

    /// PERSIST key
    pub(super) fn cmd_persist(&self, args: &[Bytes]) -> CommandResult {
        Ok(RespValue::integer(self.storage.persist(&args[0]) as i64))
    }

    /// TYPE key
    pub(super) fn cmd_type(&self, args: &[Bytes]) -> CommandResult {
        let name = self.storage.key_type(&args[0]).unwrap_or("none");
        Ok(RespValue::simple_string(name))
    }

    /// KEYS pattern
    pub(super) fn cmd_keys(&self, args: &[Bytes]) -> CommandResult {
        Ok(bulk_array(self.storage.keys(&args[0])))
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

    #[test]
    fn test_del_exists() {
        let handler = create_handler();

        cmd(&handler, &["SET", "key1", "value1"]);
        cmd(&handler, &["SET", "key2", "value2"]);

        assert_eq!(
            cmd(&handler, &["EXISTS", "key1", "key1", "nope"]),
            RespValue::integer(2)
        );
        assert_eq!(
            cmd(&handler, &["DEL", "key1", "key2", "key3"]),
            RespValue::integer(2)
        );
        assert_eq!(cmd(&handler, &["EXISTS", "key1"]), RespValue::integer(0));
    }

    #[test]
    fn test_ttl_states() {
        let handler = create_handler();

        assert_eq!(cmd(&handler, &["TTL", "missing"]), RespValue::integer(-2));
        assert_eq!(cmd(&handler, &["PTTL", "missing"]), RespValue::integer(-2));

        cmd(&handler, &["SET", "k", "v"]);
        assert_eq!(cmd(&handler, &["TTL", "k"]), RespValue::integer(-1));

        assert_eq!(cmd(&handler, &["EXPIRE", "k", "100"]), RespValue::integer(1));
        assert_eq!(cmd(&handler, &["TTL", "k"]), RespValue::integer(100));

        let pttl = cmd(&handler, &["PTTL", "k"]).as_integer().unwrap();
        assert!(pttl > 99_000 && pttl <= 100_000);
    }

    #[test]
    fn test_expire_missing_and_non_positive() {
        let handler = create_handler();

        assert_eq!(cmd(&handler, &["EXPIRE", "missing", "10"]), RespValue::integer(0));

        cmd(&handler, &["SET", "k", "v"]);
        assert_eq!(cmd(&handler, &["EXPIRE", "k", "0"]), RespValue::integer(1));
        assert_eq!(cmd(&handler, &["EXISTS", "k"]), RespValue::integer(0));

        cmd(&handler, &["SET", "k", "v"]);
        assert_eq!(cmd(&handler, &["PEXPIRE", "k", "-1"]), RespValue::integer(1));
        assert_eq!(cmd(&handler, &["GET", "k"]), RespValue::null());

        cmd(&handler, &["SET", "k", "v"]);
        assert_eq!(
            cmd(&handler, &["EXPIRE", "k", "never"]),
            RespValue::error("ERR value is not an integer or out of range")
        );
        assert_eq!(
            cmd(&handler, &["EXPIRE", "k", &i64::MAX.to_string()]),
            RespValue::error("ERR invalid expire time in 'expire' command")
        );
        assert_eq!(cmd(&handler, &["TTL", "k"]), RespValue::integer(-1));
    }

    #[test]
    fn test_persist() {
        let handler = create_handler();

        cmd(&handler, &["SET", "k", "v", "EX", "100"]);
        assert_eq!(cmd(&handler, &["PERSIST", "k"]), RespValue::integer(1));
        assert_eq!(cmd(&handler, &["PERSIST", "k"]), RespValue::integer(0));
        assert_eq!(cmd(&handler, &["TTL", "k"]), RespValue::integer(-1));
    }

    #[test]
    fn test_type() {
        let handler = create_handler();

        cmd(&handler, &["SET", "s", "v"]);
        cmd(&handler, &["RPUSH", "l", "v"]);
        assert_eq!(cmd(&handler, &["TYPE", "s"]), RespValue::simple_string("string"));
        assert_eq!(cmd(&handler, &["TYPE", "l"]), RespValue::simple_string("list"));
        assert_eq!(cmd(&handler, &["TYPE", "x"]), RespValue::simple_string("none"));
    }

    #[test]
    fn test_keys() {
        let handler = create_handler();

        cmd(&handler, &["MSET", "user:1", "a", "user:2", "b", "other", "c"]);
        let reply = cmd(&handler, &["KEYS", "user:*"]);
        let RespValue::Array(items) = reply else {
            panic!("expected array, got {:?}", reply);
        };
        let mut keys: Vec<_> = items.iter().filter_map(|v| v.as_bytes()).collect();
        keys.sort();
        assert_eq!(keys, vec![&b"user:1"[..], &b"user:2"[..]]);
    }
}
