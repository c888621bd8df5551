//! String commands: SET, GET, GETDEL, APPEND, STRLEN, INCR family, MGET,
//! MSET, SETNX, SETEX, PSETEX.

use crate::commands::error::{CommandError, CommandResult};
use crate::commands::handler::{deadline_after, is_keyword, parse_int, CommandHandler, TimeUnit};
use crate::protocol::RespValue;
use crate::storage::{SetCondition, SetExpiry, SetOptions, StoreError};
use bytes::Bytes;

impl CommandHandler {
    /// SET key value [EX seconds | PX milliseconds | KEEPTTL] [NX | XX] [GET]
    pub(super) fn cmd_set(&self, args: &[Bytes]) -> CommandResult {
        let options = parse_set_options(&args[2..])?;
        let outcome = self
            .storage
            .set(args[0].clone(), args[1].clone(), options)?;

        Ok(if options.return_previous {
            RespValue::optional_bulk(outcome.previous)
        } else if outcome.written {
            RespValue::ok()
        } else {
            RespValue::null()
        })
    }

    /// GET key
    pub(super) fn cmd_get(&self, args: &[Bytes]) -> CommandResult {
        Ok(RespValue::optional_bulk(self.storage.get(&args[0])?))
    }

    /// GETDEL key
    pub(super) fn cmd_getdel(&self, args: &[Bytes]) -> CommandResult {
        Ok(RespValue::optional_bulk(self.storage.get_del(&args[0])?))
    }

    /// APPEND key value
    pub(super) fn cmd_append(&self, args: &[Bytes]) -> CommandResult {
        let len = self.storage.append(&args[0], &args[1])?;
        Ok(RespValue::integer(len as i64))
    }

    /// STRLEN key
    pub(super) fn cmd_strlen(&self, args: &[Bytes]) -> CommandResult {
        let len = self.storage.strlen(&args[0])?;
        Ok(RespValue::integer(len as i64))
    }

    /// INCR key
    pub(super) fn cmd_incr(&self, args: &[Bytes]) -> CommandResult {
        self.incr_by(&args[0], 1)
    }

    /// DECR key
    pub(super) fn cmd_decr(&self, args: &[Bytes]) -> CommandResult {
        self.incr_by(&args[0], -1)
    }

    /// INCRBY key increment
    pub(super) fn cmd_incrby(&self, args: &[Bytes]) -> CommandResult {
        let delta = parse_int(&args[1])?;
        self.incr_by(&args[0], delta)
    }

    /// DECRBY key decrement
    pub(super) fn cmd_decrby(&self, args: &[Bytes]) -> CommandResult {
        let delta = parse_int(&args[1])?
            .checked_neg()
            .ok_or(StoreError::Overflow)?;
        self.incr_by(&args[0], delta)
    }

    fn incr_by(&self, key: &Bytes, delta: i64) -> CommandResult {
        Ok(RespValue::integer(self.storage.incr_by(key, delta)?))
    }

    /// MGET key [key ...]
    pub(super) fn cmd_mget(&self, args: &[Bytes]) -> CommandResult {
        let values = self.storage.mget(args);
        Ok(RespValue::array(
            values.into_iter().map(RespValue::optional_bulk).collect(),
        ))
    }

    /// MSET key value [key value ...]
    pub(super) fn cmd_mset(&self, args: &[Bytes]) -> CommandResult {
        if args.len() % 2 != 0 {
            return Err(CommandError::WrongArity("mset".into()));
        }

        let pairs = args
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();
        self.storage.mset(pairs);
        Ok(RespValue::ok())
    }

    /// SETNX key value
    pub(super) fn cmd_setnx(&self, args: &[Bytes]) -> CommandResult {
        let options = SetOptions {
            condition: SetCondition::IfAbsent,
            ..Default::default()
        };
        let outcome = self
            .storage
            .set(args[0].clone(), args[1].clone(), options)?;
        Ok(RespValue::integer(outcome.written as i64))
    }

    /// SETEX key seconds value
    pub(super) fn cmd_setex(&self, args: &[Bytes]) -> CommandResult {
        self.set_with_expiry(args, TimeUnit::Seconds, "setex")
    }

    /// PSETEX key milliseconds value
    pub(super) fn cmd_psetex(&self, args: &[Bytes]) -> CommandResult {
        self.set_with_expiry(args, TimeUnit::Millis, "psetex")
    }

    fn set_with_expiry(&self, args: &[Bytes], unit: TimeUnit, name: &str) -> CommandResult {
        let amount = parse_int(&args[1])?;
        let deadline = deadline_after(amount, unit)
            .ok_or_else(|| CommandError::InvalidExpireTime(name.to_string()))?;

        let options = SetOptions {
            expiry: SetExpiry::At(deadline),
            ..Default::default()
        };
        self.storage.set(args[0].clone(), args[2].clone(), options)?;
        Ok(RespValue::ok())
    }
}

/// Parses the optional flags trailing `SET key value`.
fn parse_set_options(flags: &[Bytes]) -> Result<SetOptions, CommandError> {
    let mut options = SetOptions::default();
    let mut expiry_given = false;
    let mut iter = flags.iter();

    while let Some(flag) = iter.next() {
        if is_keyword(flag, "NX") && options.condition != SetCondition::IfPresent {
            options.condition = SetCondition::IfAbsent;
        } else if is_keyword(flag, "XX") && options.condition != SetCondition::IfAbsent {
            options.condition = SetCondition::IfPresent;
        } else if is_keyword(flag, "GET") {
            options.return_previous = true;
        } else if is_keyword(flag, "KEEPTTL") && !expiry_given {
            options.expiry = SetExpiry::Keep;
            expiry_given = true;
        } else if (is_keyword(flag, "EX") || is_keyword(flag, "PX")) && !expiry_given {
            let unit = if is_keyword(flag, "EX") {
                TimeUnit::Seconds
            } else {
                TimeUnit::Millis
            };
            let amount = parse_int(iter.next().ok_or(CommandError::Syntax)?)?;
            let deadline = deadline_after(amount, unit)
                .ok_or_else(|| CommandError::InvalidExpireTime("set".into()))?;
            options.expiry = SetExpiry::At(deadline);
            expiry_given = true;
        } else {
            return Err(CommandError::Syntax);
        }
    }

    Ok(options)
}
