//! Connection and server commands: PING, ECHO, QUIT, DBSIZE, FLUSHDB,
//! FLUSHALL, INFO, TIME, COMMAND.

use crate::commands::error::{CommandError, CommandResult};
use crate::commands::handler::{command_names, is_keyword, CommandHandler};
use crate::protocol::RespValue;
use bytes::Bytes;
use std::sync::atomic::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

impl CommandHandler {
    /// PING [message]
    pub(super) fn cmd_ping(&self, args: &[Bytes]) -> CommandResult {
        match args {
            [] => Ok(RespValue::pong()),
            [message] => Ok(RespValue::bulk_string(message.clone())),
            _ => Err(CommandError::WrongArity("ping".into())),
        }
    }

    /// ECHO message
    pub(super) fn cmd_echo(&self, args: &[Bytes]) -> CommandResult {
        Ok(RespValue::bulk_string(args[0].clone()))
    }

    /// QUIT
    ///
    /// The session closes the connection after flushing this reply.
    pub(super) fn cmd_quit(&self, _args: &[Bytes]) -> CommandResult {
        Ok(RespValue::ok())
    }

    /// DBSIZE
    pub(super) fn cmd_dbsize(&self, _args: &[Bytes]) -> CommandResult {
        Ok(RespValue::integer(self.storage.len() as i64))
    }

    /// FLUSHDB / FLUSHALL [ASYNC | SYNC]
    pub(super) fn cmd_flushdb(&self, args: &[Bytes]) -> CommandResult {
        match args {
            [] => {}
            [mode] if is_keyword(mode, "ASYNC") || is_keyword(mode, "SYNC") => {}
            _ => return Err(CommandError::Syntax),
        }

        let removed = self.storage.flush();
        info!(removed = removed, "Database flushed");
        Ok(RespValue::ok())
    }

    /// INFO [section]
    pub(super) fn cmd_info(&self, args: &[Bytes]) -> CommandResult {
        let section = match args {
            [] => String::from("all"),
            [section] => String::from_utf8_lossy(section).to_ascii_lowercase(),
            _ => return Err(CommandError::Syntax),
        };
        let everything = matches!(section.as_str(), "all" | "default" | "everything");
        let wants = |name: &str| everything || section == name;

        let mut info = String::new();

        if wants("server") {
            info.push_str(&format!(
                "# Server\r\n\
                 emberkv_version:{}\r\n\
                 os:{}\r\n\
                 process_id:{}\r\n\
                 uptime_in_seconds:{}\r\n\
                 \r\n",
                crate::VERSION,
                std::env::consts::OS,
                std::process::id(),
                self.start_time.elapsed().as_secs(),
            ));
        }

        if wants("clients") {
            info.push_str(&format!(
                "# Clients\r\n\
                 connected_clients:{}\r\n\
                 \r\n",
                self.stats.active_connections.load(Ordering::Relaxed),
            ));
        }

        if wants("stats") {
            let storage = self.storage.stats();
            info.push_str(&format!(
                "# Stats\r\n\
                 total_connections_received:{}\r\n\
                 total_commands_processed:{}\r\n\
                 total_net_input_bytes:{}\r\n\
                 total_net_output_bytes:{}\r\n\
                 protocol_errors:{}\r\n\
                 expired_keys:{}\r\n\
                 expired_keys_by_sweeper:{}\r\n\
                 keyspace_hits:{}\r\n\
                 keyspace_misses:{}\r\n\
                 \r\n",
                self.stats.connections_accepted.load(Ordering::Relaxed),
                self.stats.commands_processed.load(Ordering::Relaxed),
                self.stats.bytes_read.load(Ordering::Relaxed),
                self.stats.bytes_written.load(Ordering::Relaxed),
                self.stats.protocol_errors.load(Ordering::Relaxed),
                storage.expired_keys,
                storage.expired_by_sweeper,
                storage.keyspace_hits,
                storage.keyspace_misses,
            ));
        }

        if wants("keyspace") {
            let storage = self.storage.stats();
            info.push_str("# Keyspace\r\n");
            if storage.keys > 0 {
                info.push_str(&format!(
                    "db0:keys={},expires={}\r\n",
                    storage.keys, storage.volatile_keys
                ));
            }
        }

        Ok(RespValue::bulk_string(Bytes::from(info)))
    }

    /// TIME
    pub(super) fn cmd_time(&self, _args: &[Bytes]) -> CommandResult {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        Ok(RespValue::array(vec![
            RespValue::bulk_string(Bytes::from(now.as_secs().to_string())),
            RespValue::bulk_string(Bytes::from(now.subsec_micros().to_string())),
        ]))
    }

    /// COMMAND [COUNT]
    pub(super) fn cmd_command(&self, args: &[Bytes]) -> CommandResult {
        let names = command_names();
        match args {
            [] => Ok(RespValue::array(
                names
                    .into_iter()
                    .map(|name| RespValue::bulk_string(Bytes::from_static(name.as_bytes())))
                    .collect(),
            )),
            [sub] if is_keyword(sub, "COUNT") => Ok(RespValue::integer(names.len() as i64)),
            _ => Err(CommandError::Syntax),
        }
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
    fn test_ping() {
        let handler = create_handler();

        assert_eq!(cmd(&handler, &["PING"]), RespValue::simple_string("PONG"));
        assert_eq!(cmd(&handler, &["PING", "hello"]), RespValue::bulk_string("hello"));
        assert_eq!(
            cmd(&handler, &["PING", "a", "b"]),
            RespValue::error("ERR wrong number of arguments for 'ping' command")
        );
    }

    #[test]
    fn test_echo_and_quit() {
        let handler = create_handler();

        assert_eq!(cmd(&handler, &["ECHO", "hi there"]), RespValue::bulk_string("hi there"));
        assert_eq!(cmd(&handler, &["QUIT"]), RespValue::ok());
    }

    #[test]
    fn test_dbsize_and_flush() {
        let handler = create_handler();

        cmd(&handler, &["MSET", "a", "1", "b", "2"]);
        assert_eq!(cmd(&handler, &["DBSIZE"]), RespValue::integer(2));
        assert_eq!(cmd(&handler, &["FLUSHDB"]), RespValue::ok());
        assert_eq!(cmd(&handler, &["DBSIZE"]), RespValue::integer(0));

        cmd(&handler, &["SET", "a", "1"]);
        assert_eq!(cmd(&handler, &["FLUSHALL", "ASYNC"]), RespValue::ok());
        assert_eq!(cmd(&handler, &["DBSIZE"]), RespValue::integer(0));
        assert_eq!(
            cmd(&handler, &["FLUSHALL", "later"]),
            RespValue::error("ERR syntax error")
        );
    }

    #[test]
    fn test_info_sections() {
        let handler = create_handler();

        cmd(&handler, &["SET", "k", "v", "EX", "100"]);

        let all = cmd(&handler, &["INFO"]);
        let text = String::from_utf8_lossy(all.as_bytes().unwrap()).into_owned();
        assert!(text.contains("# Server"));
        assert!(text.contains("# Stats"));
        assert!(text.contains("db0:keys=1,expires=1"));

        let keyspace = cmd(&handler, &["INFO", "KEYSPACE"]);
        let text = String::from_utf8_lossy(keyspace.as_bytes().unwrap()).into_owned();
        assert!(text.starts_with("# Keyspace"));
        assert!(!text.contains("# Server"));

        let clients = cmd(&handler, &["INFO", "clients"]);
        let text = String::from_utf8_lossy(clients.as_bytes().unwrap()).into_owned();
        assert_eq!(text, "# Clients\r\nconnected_clients:0\r\n\r\n");
    }

    #[test]
    fn test_time() {
        let handler = create_handler();

        let RespValue::Array(parts) = cmd(&handler, &["TIME"]) else {
            panic!("TIME should reply with an array");
        };
        assert_eq!(parts.len(), 2);
        let secs: u64 = std::str::from_utf8(parts[0].as_bytes().unwrap())
            .unwrap()
            .parse()
            .unwrap();
        assert!(secs > 1_600_000_000);
    }

    #[test]
    fn test_command_listing() {
        let handler = create_handler();

        let count = cmd(&handler, &["COMMAND", "COUNT"]).as_integer().unwrap();
        let RespValue::Array(names) = cmd(&handler, &["COMMAND"]) else {
            panic!("COMMAND should reply with an array");
        };
        assert_eq!(names.len() as i64, count);
        assert!(names.contains(&RespValue::bulk_string("get")));
    }
}
