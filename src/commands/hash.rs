//! Hash commands, including the `HEXPIRE` family backed by
//! `Database.hash_field_ttls` rather than by per-field metadata inside
//! `DataValue::Hash` itself.

use super::{expect_hash, expect_hash_mut, Ctx};
use crate::database::Database;
use crate::dispatch::command::{ExpireCondition, TimeUnit};
use crate::error::Error;
use crate::protocol::RespValue;
use crate::storage::DataValue;
use bytes::Bytes;
use indexmap::IndexMap;

/// Drops any hash fields whose per-field TTL has passed, and removes the key
/// entirely if that empties the hash. Called before every hash read/write so
/// expired fields never leak through.
fn sweep_field_ttls(db: &mut Database, key: &Bytes, now_ms: u64) {
    let Some(ttls) = db.hash_field_ttls.get(key.as_ref()) else { return };
    let expired: Vec<Bytes> = ttls.iter().filter(|(_, &exp)| exp <= now_ms).map(|(f, _)| f.clone()).collect();
    if expired.is_empty() {
        return;
    }
    if let Some(ttls) = db.hash_field_ttls.get_mut(key.as_ref()) {
        for f in &expired {
            ttls.remove(f);
        }
    }
    if let Some(v) = db.get_mut(key, now_ms) {
        if let DataValue::Hash(h) = &mut v.data {
            for f in &expired {
                h.shift_remove(f);
            }
            let empty = h.is_empty();
            v.bump_version();
            if empty {
                db.remove(key, now_ms);
            }
        }
    }
}

pub fn hset(ctx: &mut Ctx, db: &mut Database, key: &Bytes, fields: &[(Bytes, Bytes)]) -> Result<RespValue, Error> {
    sweep_field_ttls(db, key, ctx.now_ms);
    let mut created = 0i64;
    if let Some(v) = db.get_mut(key, ctx.now_ms) {
        let h = expect_hash_mut(&mut v.data)?;
        for (f, val) in fields {
            if h.insert(f.clone(), val.clone()).is_none() {
                created += 1;
            }
        }
        v.bump_version();
    } else {
        let mut h = IndexMap::new();
        for (f, val) in fields {
            if h.insert(f.clone(), val.clone()).is_none() {
                created += 1;
            }
        }
        db.set(key.clone(), DataValue::Hash(h));
    }
    ctx.notify("hset", key);
    Ok(RespValue::Integer(created))
}

pub fn hsetnx(ctx: &mut Ctx, db: &mut Database, key: &Bytes, field: &Bytes, value: &Bytes) -> Result<RespValue, Error> {
    sweep_field_ttls(db, key, ctx.now_ms);
    if let Some(v) = db.get_mut(key, ctx.now_ms) {
        let h = expect_hash_mut(&mut v.data)?;
        if h.contains_key(field) {
            return Ok(RespValue::Integer(0));
        }
        h.insert(field.clone(), value.clone());
        v.bump_version();
    } else {
        let mut h = IndexMap::new();
        h.insert(field.clone(), value.clone());
        db.set(key.clone(), DataValue::Hash(h));
    }
    ctx.notify("hset", key);
    Ok(RespValue::Integer(1))
}

pub fn hget(db: &Database, key: &Bytes, field: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::from_opt_bytes(expect_hash(&v.data)?.get(field).cloned())),
        None => Ok(RespValue::Null),
    }
}

pub fn hgetall(db: &Database, key: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => {
            let h = expect_hash(&v.data)?;
            let mut out = Vec::with_capacity(h.len() * 2);
            for (f, val) in h {
                out.push(RespValue::BulkString(f.clone()));
                out.push(RespValue::BulkString(val.clone()));
            }
            Ok(RespValue::Array(out))
        }
        None => Ok(RespValue::Array(vec![])),
    }
}

pub fn hdel(ctx: &mut Ctx, db: &mut Database, key: &Bytes, fields: &[Bytes]) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    sweep_field_ttls(db, key, now_ms);
    let Some(v) = db.get_mut(key, now_ms) else { return Ok(RespValue::Integer(0)) };
    let h = expect_hash_mut(&mut v.data)?;
    let mut removed = 0i64;
    for f in fields {
        if h.shift_remove(f).is_some() {
            removed += 1;
        }
    }
    let empty = h.is_empty();
    if removed > 0 {
        v.bump_version();
        ctx.notify("hdel", key);
    }
    if empty {
        db.remove(key, now_ms);
    }
    Ok(RespValue::Integer(removed))
}

pub fn hexists(db: &Database, key: &Bytes, field: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::Integer(expect_hash(&v.data)?.contains_key(field) as i64)),
        None => Ok(RespValue::Integer(0)),
    }
}

pub fn hlen(db: &Database, key: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::Integer(expect_hash(&v.data)?.len() as i64)),
        None => Ok(RespValue::Integer(0)),
    }
}

pub fn hkeys(db: &Database, key: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::array_of_bytes(expect_hash(&v.data)?.keys().cloned().collect::<Vec<_>>())),
        None => Ok(RespValue::Array(vec![])),
    }
}

pub fn hvals(db: &Database, key: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::array_of_bytes(expect_hash(&v.data)?.values().cloned().collect::<Vec<_>>())),
        None => Ok(RespValue::Array(vec![])),
    }
}

pub fn hincrby(db: &mut Database, key: &Bytes, field: &Bytes, delta: i64, now_ms: u64) -> Result<RespValue, Error> {
    if let Some(v) = db.get_mut(key, now_ms) {
        let h = expect_hash_mut(&mut v.data)?;
        let current = match h.get(field) {
            Some(s) => std::str::from_utf8(s).ok().and_then(|s| s.parse::<i64>().ok()).ok_or(Error::NotAnInteger)?,
            None => 0,
        };
        let new_value = current.checked_add(delta).ok_or(Error::Overflow)?;
        h.insert(field.clone(), Bytes::from(new_value.to_string()));
        v.bump_version();
        Ok(RespValue::Integer(new_value))
    } else {
        let mut h = IndexMap::new();
        h.insert(field.clone(), Bytes::from(delta.to_string()));
        db.set(key.clone(), DataValue::Hash(h));
        Ok(RespValue::Integer(delta))
    }
}

pub fn hincrbyfloat(db: &mut Database, key: &Bytes, field: &Bytes, delta: f64, now_ms: u64) -> Result<RespValue, Error> {
    let formatted;
    if let Some(v) = db.get_mut(key, now_ms) {
        let h = expect_hash_mut(&mut v.data)?;
        let current = match h.get(field) {
            Some(s) => std::str::from_utf8(s).ok().and_then(|s| s.parse::<f64>().ok()).ok_or(Error::NotAFloat)?,
            None => 0.0,
        };
        let new_value = current + delta;
        if !new_value.is_finite() {
            return Err(Error::NotAFloat);
        }
        formatted = crate::protocol::format_double(new_value);
        h.insert(field.clone(), Bytes::from(formatted.clone()));
        v.bump_version();
    } else {
        if !delta.is_finite() {
            return Err(Error::NotAFloat);
        }
        formatted = crate::protocol::format_double(delta);
        let mut h = IndexMap::new();
        h.insert(field.clone(), Bytes::from(formatted.clone()));
        db.set(key.clone(), DataValue::Hash(h));
    }
    Ok(RespValue::BulkString(Bytes::from(formatted)))
}

pub fn hmget(db: &Database, key: &Bytes, fields: &[Bytes], now_ms: u64) -> Result<RespValue, Error> {
    let h = match db.get(key, now_ms) {
        Some(v) => Some(expect_hash(&v.data)?),
        None => None,
    };
    let out = fields
        .iter()
        .map(|f| RespValue::from_opt_bytes(h.and_then(|h| h.get(f)).cloned()))
        .collect();
    Ok(RespValue::Array(out))
}

pub fn hrandfield(db: &Database, key: &Bytes, count: Option<i64>, withvalues: bool, now_ms: u64) -> Result<RespValue, Error> {
    use rand::seq::{IteratorRandom, SliceRandom};
    let Some(v) = db.get(key, now_ms) else {
        return Ok(if count.is_some() { RespValue::Array(vec![]) } else { RespValue::Null });
    };
    let h = expect_hash(&v.data)?;
    let mut rng = rand::thread_rng();
    match count {
        None => Ok(h.keys().choose(&mut rng).map(|f| RespValue::BulkString(f.clone())).unwrap_or(RespValue::Null)),
        Some(n) if n >= 0 => {
            let entries: Vec<(&Bytes, &Bytes)> = h.iter().collect();
            let chosen: Vec<_> = entries.choose_multiple(&mut rng, n as usize).cloned().collect();
            Ok(field_list(chosen, withvalues))
        }
        Some(n) => {
            let entries: Vec<(&Bytes, &Bytes)> = h.iter().collect();
            if entries.is_empty() {
                return Ok(RespValue::Array(vec![]));
            }
            let chosen: Vec<_> = (0..(-n) as usize).map(|_| *entries.choose(&mut rng).unwrap()).collect();
            Ok(field_list(chosen, withvalues))
        }
    }
}

fn field_list(entries: Vec<(&Bytes, &Bytes)>, withvalues: bool) -> RespValue {
    let mut out = Vec::with_capacity(entries.len() * if withvalues { 2 } else { 1 });
    for (f, v) in entries {
        out.push(RespValue::BulkString(f.clone()));
        if withvalues {
            out.push(RespValue::BulkString(v.clone()));
        }
    }
    RespValue::Array(out)
}

pub fn hstrlen(db: &Database, key: &Bytes, field: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::Integer(expect_hash(&v.data)?.get(field).map(|s| s.len()).unwrap_or(0) as i64)),
        None => Ok(RespValue::Integer(0)),
    }
}

fn condition_met(existing: Option<u64>, condition: ExpireCondition, new_at: u64) -> bool {
    match condition {
        ExpireCondition::None => true,
        ExpireCondition::Nx => existing.is_none(),
        ExpireCondition::Xx => existing.is_some(),
        ExpireCondition::Gt => existing.is_some_and(|e| new_at > e),
        ExpireCondition::Lt => existing.is_none_or(|e| new_at < e),
    }
}

fn to_millis(amount: i64, unit: TimeUnit) -> i64 {
    match unit {
        TimeUnit::Seconds => amount * 1000,
        TimeUnit::Millis => amount,
    }
}

pub fn hexpire(
    db: &mut Database,
    key: &Bytes,
    amount: i64,
    fields: &[Bytes],
    condition: ExpireCondition,
    unit: TimeUnit,
    now_ms: u64,
) -> Result<RespValue, Error> {
    let at_millis = now_ms as i64 + to_millis(amount, unit);
    hexpireat(db, key, at_millis, fields, condition, TimeUnit::Millis, now_ms)
}

pub fn hexpireat(
    db: &mut Database,
    key: &Bytes,
    at_amount: i64,
    fields: &[Bytes],
    condition: ExpireCondition,
    unit: TimeUnit,
    now_ms: u64,
) -> Result<RespValue, Error> {
    sweep_field_ttls(db, key, now_ms);
    let Some(v) = db.get(key, now_ms) else {
        return Ok(RespValue::Array(fields.iter().map(|_| RespValue::Integer(-2)).collect()));
    };
    let h = expect_hash(&v.data)?;
    let at_millis = match unit {
        TimeUnit::Seconds => at_amount * 1000,
        TimeUnit::Millis => at_amount,
    };
    let mut results = Vec::with_capacity(fields.len());
    let mut to_delete = Vec::new();
    for f in fields {
        if !h.contains_key(f) {
            results.push(RespValue::Integer(-2));
            continue;
        }
        let existing = db.hash_field_ttls.get(key.as_ref()).and_then(|m| m.get(f)).copied();
        if !condition_met(existing, condition, at_millis as u64) {
            results.push(RespValue::Integer(0));
            continue;
        }
        if at_millis <= now_ms as i64 {
            to_delete.push(f.clone());
            results.push(RespValue::Integer(2));
        } else {
            db.hash_field_ttls.entry(key.clone()).or_default().insert(f.clone(), at_millis as u64);
            results.push(RespValue::Integer(1));
        }
    }
    if !to_delete.is_empty() {
        if let Some(v) = db.get_mut(key, now_ms) {
            if let DataValue::Hash(h) = &mut v.data {
                for f in &to_delete {
                    h.shift_remove(f);
                }
                let empty = h.is_empty();
                v.bump_version();
                if empty {
                    db.remove(key, now_ms);
                }
            }
        }
    }
    Ok(RespValue::Array(results))
}

pub fn hpersist(db: &mut Database, key: &Bytes, fields: &[Bytes], now_ms: u64) -> Result<RespValue, Error> {
    let Some(v) = db.get(key, now_ms) else {
        return Ok(RespValue::Array(fields.iter().map(|_| RespValue::Integer(-2)).collect()));
    };
    let h = expect_hash(&v.data)?;
    let mut results = Vec::with_capacity(fields.len());
    for f in fields {
        if !h.contains_key(f) {
            results.push(RespValue::Integer(-2));
            continue;
        }
        let removed = db.hash_field_ttls.get_mut(key.as_ref()).map(|m| m.remove(f).is_some()).unwrap_or(false);
        results.push(RespValue::Integer(if removed { 1 } else { -1 }));
    }
    Ok(RespValue::Array(results))
}

pub fn httl(db: &Database, key: &Bytes, fields: &[Bytes], unit: TimeUnit, now_ms: u64) -> Result<RespValue, Error> {
    let Some(v) = db.get(key, now_ms) else {
        return Ok(RespValue::Array(fields.iter().map(|_| RespValue::Integer(-2)).collect()));
    };
    let h = expect_hash(&v.data)?;
    let results = fields
        .iter()
        .map(|f| {
            if !h.contains_key(f) {
                return RespValue::Integer(-2);
            }
            match db.hash_field_ttls.get(key.as_ref()).and_then(|m| m.get(f)) {
                None => RespValue::Integer(-1),
                Some(&exp) => {
                    let remaining = exp.saturating_sub(now_ms) as i64;
                    RespValue::Integer(match unit {
                        TimeUnit::Seconds => (remaining + 999) / 1000,
                        TimeUnit::Millis => remaining,
                    })
                }
            }
        })
        .collect();
    Ok(RespValue::Array(results))
}
