//! Generic key commands: existence, expiry, renaming, scanning, DUMP/RESTORE.

use super::Ctx;
use crate::database::Database;
use crate::dispatch::command::ExpireCondition;
use crate::error::Error;
use crate::protocol::RespValue;
use bytes::Bytes;

pub fn del(ctx: &mut Ctx, db: &mut Database, keys: &[Bytes]) -> Result<RespValue, Error> {
    let mut count = 0;
    for key in keys {
        if db.remove(key, ctx.now_ms).is_some() {
            ctx.notify("del", key);
            count += 1;
        }
    }
    Ok(RespValue::Integer(count))
}

pub fn exists(db: &Database, keys: &[Bytes], now_ms: u64) -> Result<RespValue, Error> {
    Ok(RespValue::Integer(keys.iter().filter(|k| db.contains(k, now_ms)).count() as i64))
}

fn apply_condition(db: &Database, key: &Bytes, new_expire_at: i64, condition: ExpireCondition, now_ms: u64) -> bool {
    let current = db.get(key, now_ms).and_then(|v| v.expire_at_ms);
    match condition {
        ExpireCondition::None => true,
        ExpireCondition::Nx => current.is_none(),
        ExpireCondition::Xx => current.is_some(),
        ExpireCondition::Gt => current.is_some_and(|c| new_expire_at > c as i64),
        ExpireCondition::Lt => current.is_none_or(|c| new_expire_at < c as i64),
    }
}

pub fn expire(ctx: &mut Ctx, db: &mut Database, key: &Bytes, relative_millis: i64, condition: ExpireCondition) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    if !db.contains(key, now_ms) {
        return Ok(RespValue::Integer(0));
    }
    let new_expire_at = now_ms as i64 + relative_millis;
    expireat(ctx, db, key, new_expire_at, condition)
}

pub fn expireat(ctx: &mut Ctx, db: &mut Database, key: &Bytes, absolute_millis: i64, condition: ExpireCondition) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    if !db.contains(key, now_ms) {
        return Ok(RespValue::Integer(0));
    }
    if !apply_condition(db, key, absolute_millis, condition, now_ms) {
        return Ok(RespValue::Integer(0));
    }
    if absolute_millis <= now_ms as i64 {
        db.remove(key, now_ms);
        ctx.notify("del", key);
        return Ok(RespValue::Integer(1));
    }
    if let Some(v) = db.get_mut(key, now_ms) {
        v.expire_at_ms = Some(absolute_millis as u64);
        v.bump_version();
    }
    ctx.notify("expire", key);
    Ok(RespValue::Integer(1))
}

pub fn ttl(db: &Database, key: &Bytes, now_ms: u64, seconds: bool) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        None => Ok(RespValue::Integer(-2)),
        Some(v) => match v.remaining_ttl_ms(now_ms) {
            None => Ok(RespValue::Integer(-1)),
            Some(ms) => Ok(RespValue::Integer(if seconds { (ms + 999) / 1000 } else { ms })),
        },
    }
}

pub fn persist(db: &mut Database, key: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get_mut(key, now_ms) {
        Some(v) if v.expire_at_ms.is_some() => {
            v.expire_at_ms = None;
            v.bump_version();
            Ok(RespValue::Integer(1))
        }
        _ => Ok(RespValue::Integer(0)),
    }
}

pub fn keys(db: &Database, pattern: &str, now_ms: u64) -> Result<RespValue, Error> {
    Ok(RespValue::array_of_bytes(db.keys_matching(pattern, now_ms)))
}

pub fn type_of(db: &Database, key: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::SimpleString(v.type_name().to_string())),
        None => Ok(RespValue::SimpleString("none".to_string())),
    }
}

pub fn rename(ctx: &mut Ctx, db: &mut Database, src: &Bytes, dst: &Bytes, nx: bool) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    if nx && db.contains(dst, now_ms) {
        return Ok(RespValue::Integer(0));
    }
    let Some(v) = db.remove(src, now_ms) else {
        return Err(Error::InvalidState("no such key".into()));
    };
    let field_ttls = db.hash_field_ttls.remove(src.as_ref());
    db.set_with_ttl(dst.clone(), v.data, v.expire_at_ms);
    if let Some(ttls) = field_ttls {
        db.hash_field_ttls.insert(dst.clone(), ttls);
    }
    ctx.notify("rename_from", src);
    ctx.notify("rename_to", dst);
    Ok(if nx { RespValue::Integer(1) } else { RespValue::ok() })
}

pub fn randomkey(db: &Database, now_ms: u64) -> Result<RespValue, Error> {
    Ok(RespValue::from_opt_bytes(db.random_key(now_ms)))
}

pub fn scan(
    db: &Database,
    cursor: u64,
    pattern: Option<&str>,
    count: usize,
    type_filter: Option<&str>,
    now_ms: u64,
) -> Result<RespValue, Error> {
    let (next, keys) = db.scan(cursor, count, pattern, type_filter, now_ms);
    Ok(RespValue::Array(vec![
        RespValue::BulkString(Bytes::from(next.to_string())),
        RespValue::array_of_bytes(keys),
    ]))
}

pub fn dump(db: &Database, key: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::BulkString(crate::persistence::dump::encode(&v.data)?)),
        None => Ok(RespValue::Null),
    }
}

pub fn restore(ctx: &mut Ctx, db: &mut Database, key: &Bytes, ttl_ms: u64, payload: &Bytes, replace: bool) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    if !replace && db.contains(key, now_ms) {
        return Err(Error::InvalidState("BUSYKEY Target key name already exists.".into()));
    }
    let data = crate::persistence::dump::decode(payload)?;
    let expire_at_ms = if ttl_ms == 0 { None } else { Some(now_ms + ttl_ms) };
    db.set_with_ttl(key.clone(), data, expire_at_ms);
    ctx.notify("restore", key);
    Ok(RespValue::ok())
}

pub fn copy(ctx: &mut Ctx, db: &mut Database, src: &Bytes, dst: &Bytes, replace: bool) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    if !replace && db.contains(dst, now_ms) {
        return Ok(RespValue::Integer(0));
    }
    let Some(v) = db.get(src, now_ms).cloned() else {
        return Ok(RespValue::Integer(0));
    };
    db.set_with_ttl(dst.clone(), v.data, v.expire_at_ms);
    ctx.notify("copy_to", dst);
    Ok(RespValue::Integer(1))
}
