//! String commands: GET/SET and friends.

use super::{expect_string, Ctx};
use crate::database::Database;
use crate::dispatch::command::{SetCondition, TtlOption};
use crate::error::Error;
use crate::protocol::RespValue;
use crate::storage::{DataValue, MAX_STRING_SIZE};
use bytes::Bytes;

fn parse_float(s: &Bytes) -> Result<f64, Error> {
    std::str::from_utf8(s).ok().and_then(|s| s.parse::<f64>().ok()).ok_or(Error::NotAFloat)
}

fn ttl_to_expire_at(ttl: TtlOption, now_ms: u64) -> Result<Option<u64>, Error> {
    Ok(match ttl {
        TtlOption::None => None,
        TtlOption::KeepTtl => None,
        TtlOption::Seconds(s) => Some(now_ms + s.saturating_mul(1000)),
        TtlOption::Millis(ms) => Some(now_ms + ms),
        TtlOption::UnixSeconds(s) => Some(s.saturating_mul(1000)),
        TtlOption::UnixMillis(ms) => Some(ms),
    })
}

pub fn get(db: &Database, key: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::BulkString(expect_string(&v.data)?.clone())),
        None => Ok(RespValue::Null),
    }
}

pub fn set(
    ctx: &mut Ctx,
    db: &mut Database,
    key: &Bytes,
    value: &Bytes,
    ttl: TtlOption,
    condition: SetCondition,
    get_old: bool,
) -> Result<RespValue, Error> {
    if value.len() > MAX_STRING_SIZE {
        return Err(Error::Range("string exceeds maximum allowed size".into()));
    }
    let now_ms = ctx.now_ms;
    let exists = db.contains(key, now_ms);
    let old = if get_old {
        match db.get(key, now_ms) {
            Some(v) => Some(RespValue::BulkString(expect_string(&v.data)?.clone())),
            None => Some(RespValue::Null),
        }
    } else {
        None
    };
    let condition_met = match condition {
        SetCondition::None => true,
        SetCondition::Nx => !exists,
        SetCondition::Xx => exists,
        SetCondition::IfEq(ref expected) => match db.get(key, now_ms) {
            Some(v) => expect_string(&v.data)? == expected,
            None => false,
        },
        SetCondition::IfGt(ref other) => match db.get(key, now_ms) {
            Some(v) => parse_float(expect_string(&v.data)?)? > parse_float(other)?,
            None => false,
        },
        SetCondition::IfLt(ref other) => match db.get(key, now_ms) {
            Some(v) => parse_float(expect_string(&v.data)?)? < parse_float(other)?,
            None => false,
        },
    };
    if !condition_met {
        return Ok(old.unwrap_or(RespValue::Null));
    }
    let keep_ttl = matches!(ttl, TtlOption::KeepTtl);
    let expire_at_ms = ttl_to_expire_at(ttl, now_ms)?;
    if keep_ttl {
        let existing_ttl = db.get(key, now_ms).and_then(|v| v.expire_at_ms);
        db.set_with_ttl(key.clone(), DataValue::String(value.clone()), existing_ttl);
    } else {
        db.set_with_ttl(key.clone(), DataValue::String(value.clone()), expire_at_ms);
    }
    ctx.notify("set", key);
    Ok(if get_old { old.unwrap() } else { RespValue::ok() })
}

pub fn setnx(db: &mut Database, key: &Bytes, value: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    if db.contains(key, now_ms) {
        return Ok(RespValue::Integer(0));
    }
    db.set(key.clone(), DataValue::String(value.clone()));
    Ok(RespValue::Integer(1))
}

pub fn setex(ctx: &mut Ctx, db: &mut Database, key: &Bytes, seconds: u64, value: &Bytes) -> Result<RespValue, Error> {
    if seconds == 0 {
        return Err(Error::Range("invalid expire time in 'setex' command".into()));
    }
    db.set_with_ttl(key.clone(), DataValue::String(value.clone()), Some(ctx.now_ms + seconds * 1000));
    Ok(RespValue::ok())
}

pub fn psetex(ctx: &mut Ctx, db: &mut Database, key: &Bytes, millis: u64, value: &Bytes) -> Result<RespValue, Error> {
    if millis == 0 {
        return Err(Error::Range("invalid expire time in 'psetex' command".into()));
    }
    db.set_with_ttl(key.clone(), DataValue::String(value.clone()), Some(ctx.now_ms + millis));
    Ok(RespValue::ok())
}

pub fn getset(db: &mut Database, key: &Bytes, value: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    let old = match db.get(key, now_ms) {
        Some(v) => Some(expect_string(&v.data)?.clone()),
        None => None,
    };
    db.set(key.clone(), DataValue::String(value.clone()));
    Ok(RespValue::from_opt_bytes(old))
}

pub fn getdel(ctx: &mut Ctx, db: &mut Database, key: &Bytes) -> Result<RespValue, Error> {
    match db.get(key, ctx.now_ms) {
        Some(v) => {
            let s = expect_string(&v.data)?.clone();
            db.remove(key, ctx.now_ms);
            ctx.notify("del", key);
            Ok(RespValue::BulkString(s))
        }
        None => Ok(RespValue::Null),
    }
}

pub fn getex(ctx: &mut Ctx, db: &mut Database, key: &Bytes, ttl: TtlOption) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let Some(v) = db.get(key, now_ms) else { return Ok(RespValue::Null) };
    let s = expect_string(&v.data)?.clone();
    match ttl {
        TtlOption::None => {}
        TtlOption::KeepTtl => {
            if let Some(v) = db.get_mut(key, now_ms) {
                v.expire_at_ms = None;
            }
        }
        other => {
            let expire_at_ms = ttl_to_expire_at(other, now_ms)?;
            if let Some(v) = db.get_mut(key, now_ms) {
                v.expire_at_ms = expire_at_ms;
            }
        }
    }
    Ok(RespValue::BulkString(s))
}

pub fn append(db: &mut Database, key: &Bytes, value: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    if let Some(v) = db.get_mut(key, now_ms) {
        let s = match &mut v.data {
            DataValue::String(s) => s,
            _ => return Err(Error::WrongType),
        };
        let mut buf = s.to_vec();
        buf.extend_from_slice(value);
        if buf.len() > MAX_STRING_SIZE {
            return Err(Error::Range("string exceeds maximum allowed size".into()));
        }
        *s = Bytes::from(buf);
        v.bump_version();
        Ok(RespValue::Integer(s.len() as i64))
    } else {
        db.set(key.clone(), DataValue::String(value.clone()));
        Ok(RespValue::Integer(value.len() as i64))
    }
}

pub fn strlen(db: &Database, key: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::Integer(expect_string(&v.data)?.len() as i64)),
        None => Ok(RespValue::Integer(0)),
    }
}

fn clamp_range(len: i64, start: i64, end: i64) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let mut start = if start < 0 { (len + start).max(0) } else { start };
    let mut end = if end < 0 { len + end } else { end };
    if end >= len {
        end = len - 1;
    }
    if start > end || start >= len {
        return None;
    }
    if start < 0 {
        start = 0;
    }
    Some((start as usize, end as usize))
}

pub fn getrange(db: &Database, key: &Bytes, start: i64, end: i64, now_ms: u64) -> Result<RespValue, Error> {
    let Some(v) = db.get(key, now_ms) else { return Ok(RespValue::BulkString(Bytes::new())) };
    let s = expect_string(&v.data)?;
    match clamp_range(s.len() as i64, start, end) {
        Some((a, b)) => Ok(RespValue::BulkString(s.slice(a..=b))),
        None => Ok(RespValue::BulkString(Bytes::new())),
    }
}

pub fn setrange(db: &mut Database, key: &Bytes, offset: usize, value: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    if offset + value.len() > MAX_STRING_SIZE {
        return Err(Error::Range("string exceeds maximum allowed size".into()));
    }
    let mut buf = match db.get(key, now_ms) {
        Some(v) => expect_string(&v.data)?.to_vec(),
        None => Vec::new(),
    };
    if value.is_empty() {
        return Ok(RespValue::Integer(buf.len() as i64));
    }
    if buf.len() < offset + value.len() {
        buf.resize(offset + value.len(), 0);
    }
    buf[offset..offset + value.len()].copy_from_slice(value);
    let len = buf.len();
    db.set(key.clone(), DataValue::String(Bytes::from(buf)));
    Ok(RespValue::Integer(len as i64))
}

pub fn incrby(db: &mut Database, key: &Bytes, delta: i64, now_ms: u64) -> Result<RespValue, Error> {
    let current = match db.get(key, now_ms) {
        Some(v) => {
            let s = expect_string(&v.data)?;
            std::str::from_utf8(s).ok().and_then(|s| s.parse::<i64>().ok()).ok_or(Error::NotAnInteger)?
        }
        None => 0,
    };
    let new_value = current.checked_add(delta).ok_or(Error::Overflow)?;
    db.set(key.clone(), DataValue::String(Bytes::from(new_value.to_string())));
    Ok(RespValue::Integer(new_value))
}

pub fn incrbyfloat(db: &mut Database, key: &Bytes, delta: f64, now_ms: u64) -> Result<RespValue, Error> {
    let current = match db.get(key, now_ms) {
        Some(v) => {
            let s = expect_string(&v.data)?;
            std::str::from_utf8(s).ok().and_then(|s| s.parse::<f64>().ok()).ok_or(Error::NotAFloat)?
        }
        None => 0.0,
    };
    let new_value = current + delta;
    if !new_value.is_finite() {
        return Err(Error::NotAFloat);
    }
    let formatted = crate::protocol::format_double(new_value);
    db.set(key.clone(), DataValue::String(Bytes::from(formatted.clone())));
    Ok(RespValue::BulkString(Bytes::from(formatted)))
}

pub fn mget(db: &Database, keys: &[Bytes], now_ms: u64) -> Result<RespValue, Error> {
    let values = keys
        .iter()
        .map(|k| match db.get(k, now_ms) {
            Some(v) => match &v.data {
                DataValue::String(s) => RespValue::BulkString(s.clone()),
                _ => RespValue::Null,
            },
            None => RespValue::Null,
        })
        .collect();
    Ok(RespValue::Array(values))
}

pub fn mset(db: &mut Database, pairs: &[(Bytes, Bytes)]) -> Result<RespValue, Error> {
    for (k, v) in pairs {
        db.set(k.clone(), DataValue::String(v.clone()));
    }
    Ok(RespValue::ok())
}

pub fn msetnx(db: &mut Database, pairs: &[(Bytes, Bytes)], now_ms: u64) -> Result<RespValue, Error> {
    if pairs.iter().any(|(k, _)| db.contains(k, now_ms)) {
        return Ok(RespValue::Integer(0));
    }
    for (k, v) in pairs {
        db.set(k.clone(), DataValue::String(v.clone()));
    }
    Ok(RespValue::Integer(1))
}
