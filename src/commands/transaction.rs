//! MULTI/EXEC/DISCARD/WATCH/UNWATCH. Queuing and `WATCH` bookkeeping happen
//! on `SessionState::tx`; `exec` replays the queued commands through
//! `commands::execute` while holding the same database lock the router
//! already holds for it.

use super::{execute, Ctx};
use crate::connection::session::SessionState;
use crate::database::Database;
use crate::dispatch::Command;
use crate::error::Error;
use crate::protocol::RespValue;
use bytes::Bytes;

pub fn multi(session: &mut SessionState) -> Result<RespValue, Error> {
    if session.tx.in_transaction {
        return Err(Error::InvalidState("MULTI calls can not be nested".into()));
    }
    session.tx.start();
    Ok(RespValue::ok())
}

pub fn queue(session: &mut SessionState, command: Command) {
    session.tx.queue(command);
}

pub fn discard(session: &mut SessionState) -> Result<RespValue, Error> {
    if !session.tx.in_transaction {
        return Err(Error::InvalidState("DISCARD without MULTI".into()));
    }
    session.tx.reset();
    Ok(RespValue::ok())
}

pub fn watch(session: &mut SessionState, db: &Database, db_index: usize, keys: &[Bytes], now_ms: u64) -> Result<RespValue, Error> {
    if session.tx.in_transaction {
        return Err(Error::InvalidState("WATCH inside MULTI is not allowed".into()));
    }
    for key in keys {
        let version = db.version_of(key, now_ms);
        session.tx.watched_keys.insert((db_index, key.clone()), version);
    }
    Ok(RespValue::ok())
}

pub fn unwatch(session: &mut SessionState) -> RespValue {
    session.tx.watched_keys.clear();
    RespValue::ok()
}

/// Replays the queued commands if every watched key's version still matches
/// what `WATCH` observed. Returns `NullArray` (a "nil" multi-bulk reply) if a
/// watched key changed, matching Redis's `EXEC` abort-on-dirty-watch reply.
pub fn exec(dbs: &mut [Database], ctx: &mut Ctx) -> Result<RespValue, Error> {
    if !ctx.session.tx.in_transaction {
        return Err(Error::InvalidState("EXEC without MULTI".into()));
    }
    let has_error = ctx.session.tx.has_error;
    let commands = std::mem::take(&mut ctx.session.tx.commands);
    let watched = std::mem::take(&mut ctx.session.tx.watched_keys);
    ctx.session.tx.reset();

    if has_error {
        return Err(Error::ExecAbort);
    }
    for ((db_index, key), version) in &watched {
        let current = dbs.get(*db_index).and_then(|db| db.version_of(key, ctx.now_ms));
        if current != *version {
            return Ok(RespValue::NullArray);
        }
    }

    let mut results = Vec::with_capacity(commands.len());
    for command in &commands {
        match execute(dbs, ctx, command) {
            Ok(v) => results.push(v),
            Err(e) => results.push(RespValue::Error(e.to_string())),
        }
    }
    Ok(RespValue::Array(results))
}
