//! Set commands, including the unified SUNION/SINTER/SDIFF family via
//! `SetOpKind`.

use super::{expect_set, expect_set_mut, Ctx};
use crate::database::Database;
use crate::dispatch::command::SetOpKind;
use crate::error::Error;
use crate::protocol::RespValue;
use crate::storage::DataValue;
use bytes::Bytes;
use std::collections::HashSet;

pub fn sadd(ctx: &mut Ctx, db: &mut Database, key: &Bytes, members: &[Bytes]) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let mut added = 0i64;
    if let Some(v) = db.get_mut(key, now_ms) {
        let s = expect_set_mut(&mut v.data)?;
        for m in members {
            if s.insert(m.clone()) {
                added += 1;
            }
        }
        v.bump_version();
    } else {
        let mut s = HashSet::new();
        for m in members {
            if s.insert(m.clone()) {
                added += 1;
            }
        }
        db.set(key.clone(), DataValue::Set(s));
    }
    if added > 0 {
        ctx.notify("sadd", key);
    }
    Ok(RespValue::Integer(added))
}

pub fn srem(ctx: &mut Ctx, db: &mut Database, key: &Bytes, members: &[Bytes]) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let Some(v) = db.get_mut(key, now_ms) else { return Ok(RespValue::Integer(0)) };
    let s = expect_set_mut(&mut v.data)?;
    let mut removed = 0i64;
    for m in members {
        if s.remove(m) {
            removed += 1;
        }
    }
    let empty = s.is_empty();
    if removed > 0 {
        v.bump_version();
        ctx.notify("srem", key);
    }
    if empty {
        db.remove(key, now_ms);
    }
    Ok(RespValue::Integer(removed))
}

pub fn smembers(db: &Database, key: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::array_of_bytes(expect_set(&v.data)?.iter().cloned().collect::<Vec<_>>())),
        None => Ok(RespValue::Array(vec![])),
    }
}

pub fn sismember(db: &Database, key: &Bytes, member: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::Integer(expect_set(&v.data)?.contains(member) as i64)),
        None => Ok(RespValue::Integer(0)),
    }
}

pub fn smismember(db: &Database, key: &Bytes, members: &[Bytes], now_ms: u64) -> Result<RespValue, Error> {
    let s = match db.get(key, now_ms) {
        Some(v) => Some(expect_set(&v.data)?),
        None => None,
    };
    let out = members.iter().map(|m| RespValue::Integer(s.is_some_and(|s| s.contains(m)) as i64)).collect();
    Ok(RespValue::Array(out))
}

pub fn scard(db: &Database, key: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::Integer(expect_set(&v.data)?.len() as i64)),
        None => Ok(RespValue::Integer(0)),
    }
}

pub fn spop(ctx: &mut Ctx, db: &mut Database, key: &Bytes, count: Option<usize>) -> Result<RespValue, Error> {
    use rand::seq::IteratorRandom;
    let now_ms = ctx.now_ms;
    let Some(v) = db.get_mut(key, now_ms) else {
        return Ok(if count.is_some() { RespValue::Array(vec![]) } else { RespValue::Null });
    };
    let s = expect_set_mut(&mut v.data)?;
    let mut rng = rand::thread_rng();
    match count {
        None => {
            let chosen = s.iter().choose(&mut rng).cloned();
            if let Some(m) = &chosen {
                s.remove(m);
            }
            let empty = s.is_empty();
            if chosen.is_some() {
                v.bump_version();
                ctx.notify("spop", key);
            }
            if empty {
                db.remove(key, now_ms);
            }
            Ok(RespValue::from_opt_bytes(chosen))
        }
        Some(n) => {
            let chosen: Vec<Bytes> = s.iter().cloned().choose_multiple(&mut rng, n);
            for m in &chosen {
                s.remove(m);
            }
            let empty = s.is_empty();
            if !chosen.is_empty() {
                v.bump_version();
                ctx.notify("spop", key);
            }
            if empty {
                db.remove(key, now_ms);
            }
            Ok(RespValue::array_of_bytes(chosen))
        }
    }
}

pub fn srandmember(db: &Database, key: &Bytes, count: Option<i64>, now_ms: u64) -> Result<RespValue, Error> {
    use rand::seq::{IteratorRandom, SliceRandom};
    let Some(v) = db.get(key, now_ms) else {
        return Ok(if count.is_some() { RespValue::Array(vec![]) } else { RespValue::Null });
    };
    let s = expect_set(&v.data)?;
    let mut rng = rand::thread_rng();
    match count {
        None => Ok(RespValue::from_opt_bytes(s.iter().choose(&mut rng).cloned())),
        Some(n) if n >= 0 => {
            let members: Vec<&Bytes> = s.iter().collect();
            let chosen: Vec<Bytes> = members.choose_multiple(&mut rng, n as usize).map(|b| (*b).clone()).collect();
            Ok(RespValue::array_of_bytes(chosen))
        }
        Some(n) => {
            let members: Vec<&Bytes> = s.iter().collect();
            if members.is_empty() {
                return Ok(RespValue::Array(vec![]));
            }
            let chosen: Vec<Bytes> = (0..(-n) as usize).map(|_| (*members.choose(&mut rng).unwrap()).clone()).collect();
            Ok(RespValue::array_of_bytes(chosen))
        }
    }
}

pub fn smove(ctx: &mut Ctx, db: &mut Database, src: &Bytes, dst: &Bytes, member: &Bytes) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let Some(v) = db.get_mut(src, now_ms) else { return Ok(RespValue::Integer(0)) };
    let s = expect_set_mut(&mut v.data)?;
    if !s.remove(member) {
        return Ok(RespValue::Integer(0));
    }
    let empty = s.is_empty();
    v.bump_version();
    if empty {
        db.remove(src, now_ms);
    }
    if let Some(dv) = db.get_mut(dst, now_ms) {
        let ds = expect_set_mut(&mut dv.data)?;
        ds.insert(member.clone());
        dv.bump_version();
    } else {
        let mut ds = HashSet::new();
        ds.insert(member.clone());
        db.set(dst.clone(), DataValue::Set(ds));
    }
    ctx.notify("srem", src);
    ctx.notify("sadd", dst);
    Ok(RespValue::Integer(1))
}

pub fn set_op(ctx: &mut Ctx, db: &mut Database, kind: SetOpKind, dest: Option<&Bytes>, keys: &[Bytes], now_ms: u64) -> Result<RespValue, Error> {
    let mut sets = Vec::with_capacity(keys.len());
    for k in keys {
        let s = match db.get(k, now_ms) {
            Some(v) => expect_set(&v.data)?.clone(),
            None => HashSet::new(),
        };
        sets.push(s);
    }
    let result = match kind {
        SetOpKind::Union => sets.into_iter().fold(HashSet::new(), |mut acc, s| {
            acc.extend(s);
            acc
        }),
        SetOpKind::Inter => {
            let mut iter = sets.into_iter();
            match iter.next() {
                Some(first) => iter.fold(first, |acc, s| acc.intersection(&s).cloned().collect()),
                None => HashSet::new(),
            }
        }
        SetOpKind::Diff => {
            let mut iter = sets.into_iter();
            match iter.next() {
                Some(first) => iter.fold(first, |acc, s| acc.difference(&s).cloned().collect()),
                None => HashSet::new(),
            }
        }
    };
    match dest {
        Some(dest) => {
            let len = result.len();
            if len == 0 {
                db.remove(dest, now_ms);
            } else {
                db.set(dest.clone(), DataValue::Set(result));
            }
            ctx.notify("sinterstore", dest);
            Ok(RespValue::Integer(len as i64))
        }
        None => Ok(RespValue::array_of_bytes(result.into_iter().collect::<Vec<_>>())),
    }
}
