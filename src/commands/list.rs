//! List commands: LPUSH/RPUSH and friends.

use super::{expect_list, expect_list_mut, Ctx};
use crate::database::Database;
use crate::error::Error;
use crate::protocol::RespValue;
use crate::storage::DataValue;
use bytes::Bytes;
use std::collections::VecDeque;

pub fn push(ctx: &mut Ctx, db: &mut Database, key: &Bytes, values: &[Bytes], left: bool, only_if_exists: bool) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    if only_if_exists && !db.contains(key, now_ms) {
        return Ok(RespValue::Integer(0));
    }
    if let Some(v) = db.get_mut(key, now_ms) {
        let list = expect_list_mut(&mut v.data)?;
        for value in values {
            if left {
                list.push_front(value.clone());
            } else {
                list.push_back(value.clone());
            }
        }
        v.bump_version();
        let len = list.len();
        ctx.notify(if left { "lpush" } else { "rpush" }, key);
        ctx.server.blockers.notify_one(ctx.db_index, key);
        return Ok(RespValue::Integer(len as i64));
    }
    let mut list = VecDeque::new();
    for value in values {
        if left {
            list.push_front(value.clone());
        } else {
            list.push_back(value.clone());
        }
    }
    let len = list.len();
    db.set(key.clone(), DataValue::List(list));
    ctx.notify(if left { "lpush" } else { "rpush" }, key);
    ctx.server.blockers.notify_one(ctx.db_index, key);
    Ok(RespValue::Integer(len as i64))
}

pub fn pop(ctx: &mut Ctx, db: &mut Database, key: &Bytes, left: bool, count: Option<usize>) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let Some(v) = db.get_mut(key, now_ms) else {
        return Ok(if count.is_some() { RespValue::NullArray } else { RespValue::Null });
    };
    let list = expect_list_mut(&mut v.data)?;
    match count {
        None => {
            let popped = if left { list.pop_front() } else { list.pop_back() };
            if list.is_empty() {
                db.remove(key, now_ms);
            } else {
                v.bump_version();
            }
            if popped.is_some() {
                ctx.notify(if left { "lpop" } else { "rpop" }, key);
            }
            Ok(RespValue::from_opt_bytes(popped))
        }
        Some(n) => {
            let mut out = Vec::with_capacity(n.min(list.len()));
            for _ in 0..n {
                match if left { list.pop_front() } else { list.pop_back() } {
                    Some(x) => out.push(x),
                    None => break,
                }
            }
            let is_empty = list.is_empty();
            if is_empty {
                db.remove(key, now_ms);
            } else if !out.is_empty() {
                v.bump_version();
            }
            if !out.is_empty() {
                ctx.notify(if left { "lpop" } else { "rpop" }, key);
            }
            if out.is_empty() {
                Ok(RespValue::NullArray)
            } else {
                Ok(RespValue::array_of_bytes(out))
            }
        }
    }
}

pub fn llen(db: &Database, key: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::Integer(expect_list(&v.data)?.len() as i64)),
        None => Ok(RespValue::Integer(0)),
    }
}

fn normalize_index(len: i64, index: i64) -> i64 {
    if index < 0 { len + index } else { index }
}

pub fn lrange(db: &Database, key: &Bytes, start: i64, stop: i64, now_ms: u64) -> Result<RespValue, Error> {
    let Some(v) = db.get(key, now_ms) else { return Ok(RespValue::Array(vec![])) };
    let list = expect_list(&v.data)?;
    let len = list.len() as i64;
    if len == 0 {
        return Ok(RespValue::Array(vec![]));
    }
    let start = normalize_index(len, start).max(0);
    let stop = normalize_index(len, stop).min(len - 1);
    if start > stop || start >= len {
        return Ok(RespValue::Array(vec![]));
    }
    let values: Vec<Bytes> = list.iter().skip(start as usize).take((stop - start + 1) as usize).cloned().collect();
    Ok(RespValue::array_of_bytes(values))
}

pub fn lindex(db: &Database, key: &Bytes, index: i64, now_ms: u64) -> Result<RespValue, Error> {
    let Some(v) = db.get(key, now_ms) else { return Ok(RespValue::Null) };
    let list = expect_list(&v.data)?;
    let idx = normalize_index(list.len() as i64, index);
    if idx < 0 || idx as usize >= list.len() {
        return Ok(RespValue::Null);
    }
    Ok(RespValue::BulkString(list[idx as usize].clone()))
}

pub fn lset(db: &mut Database, key: &Bytes, index: i64, value: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    let Some(v) = db.get_mut(key, now_ms) else {
        return Err(Error::InvalidState("no such key".into()));
    };
    let list = expect_list_mut(&mut v.data)?;
    let idx = normalize_index(list.len() as i64, index);
    if idx < 0 || idx as usize >= list.len() {
        return Err(Error::Range("index out of range".into()));
    }
    list[idx as usize] = value.clone();
    v.bump_version();
    Ok(RespValue::ok())
}

pub fn linsert(db: &mut Database, key: &Bytes, before: bool, pivot: &Bytes, value: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    let Some(v) = db.get_mut(key, now_ms) else { return Ok(RespValue::Integer(0)) };
    let list = expect_list_mut(&mut v.data)?;
    match list.iter().position(|x| x == pivot) {
        Some(pos) => {
            let insert_at = if before { pos } else { pos + 1 };
            list.insert(insert_at, value.clone());
            v.bump_version();
            Ok(RespValue::Integer(list.len() as i64))
        }
        None => Ok(RespValue::Integer(-1)),
    }
}

pub fn ltrim(ctx: &mut Ctx, db: &mut Database, key: &Bytes, start: i64, stop: i64) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let Some(v) = db.get_mut(key, now_ms) else { return Ok(RespValue::ok()) };
    let list = expect_list_mut(&mut v.data)?;
    let len = list.len() as i64;
    let start = normalize_index(len, start).max(0);
    let stop = normalize_index(len, stop).min(len - 1);
    if start > stop || start >= len {
        list.clear();
    } else {
        let kept: VecDeque<Bytes> = list.iter().skip(start as usize).take((stop - start + 1) as usize).cloned().collect();
        *list = kept;
    }
    if list.is_empty() {
        db.remove(key, now_ms);
    } else {
        v.bump_version();
    }
    ctx.notify("ltrim", key);
    Ok(RespValue::ok())
}

pub fn lrem(ctx: &mut Ctx, db: &mut Database, key: &Bytes, count: i64, value: &Bytes) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let Some(v) = db.get_mut(key, now_ms) else { return Ok(RespValue::Integer(0)) };
    let list = expect_list_mut(&mut v.data)?;
    let mut removed = 0i64;
    if count >= 0 {
        let limit = if count == 0 { usize::MAX } else { count as usize };
        let mut kept = VecDeque::with_capacity(list.len());
        for item in list.drain(..) {
            if removed < limit as i64 && item == *value {
                removed += 1;
            } else {
                kept.push_back(item);
            }
        }
        *list = kept;
    } else {
        let limit = (-count) as usize;
        let mut kept = VecDeque::with_capacity(list.len());
        for item in list.drain(..).rev() {
            if (removed as usize) < limit && item == *value {
                removed += 1;
            } else {
                kept.push_front(item);
            }
        }
        *list = kept;
    }
    if list.is_empty() {
        db.remove(key, now_ms);
    } else if removed > 0 {
        v.bump_version();
    }
    if removed > 0 {
        ctx.notify("lrem", key);
    }
    Ok(RespValue::Integer(removed))
}

pub fn lpos(
    db: &Database,
    key: &Bytes,
    element: &Bytes,
    rank: Option<i64>,
    count: Option<usize>,
    maxlen: Option<usize>,
    now_ms: u64,
) -> Result<RespValue, Error> {
    let Some(v) = db.get(key, now_ms) else {
        return Ok(if count.is_some() { RespValue::Array(vec![]) } else { RespValue::Null });
    };
    let list = expect_list(&v.data)?;
    let rank = rank.unwrap_or(1);
    if rank == 0 {
        return Err(Error::Syntax);
    }
    let len = list.len();
    let max_scan = maxlen.filter(|&m| m > 0).unwrap_or(len);
    let mut matches = Vec::new();
    let mut skip = rank.unsigned_abs() as usize - 1;
    let want = count.unwrap_or(1);
    let indices: Box<dyn Iterator<Item = usize>> =
        if rank > 0 { Box::new(0..len) } else { Box::new((0..len).rev()) };
    for (scanned, idx) in indices.enumerate() {
        if scanned >= max_scan {
            break;
        }
        if list[idx] == *element {
            if skip > 0 {
                skip -= 1;
                continue;
            }
            matches.push(idx as i64);
            if want != 0 && matches.len() >= want {
                break;
            }
        }
    }
    match count {
        None => Ok(matches.first().map(|i| RespValue::Integer(*i)).unwrap_or(RespValue::Null)),
        Some(_) => Ok(RespValue::Array(matches.into_iter().map(RespValue::Integer).collect())),
    }
}

pub fn lmove(ctx: &mut Ctx, db: &mut Database, src: &Bytes, dst: &Bytes, from_left: bool, to_left: bool) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let Some(v) = db.get_mut(src, now_ms) else { return Ok(RespValue::Null) };
    let list = expect_list_mut(&mut v.data)?;
    let popped = if from_left { list.pop_front() } else { list.pop_back() };
    let Some(value) = popped else { return Ok(RespValue::Null) };
    if list.is_empty() {
        db.remove(src, now_ms);
    } else {
        v.bump_version();
    }
    if let Some(dv) = db.get_mut(dst, now_ms) {
        let dlist = expect_list_mut(&mut dv.data)?;
        if to_left {
            dlist.push_front(value.clone());
        } else {
            dlist.push_back(value.clone());
        }
        dv.bump_version();
    } else {
        let mut dlist = VecDeque::new();
        dlist.push_back(value.clone());
        db.set(dst.clone(), DataValue::List(dlist));
    }
    ctx.notify(if from_left { "lpop" } else { "rpop" }, src);
    ctx.notify(if to_left { "lpush" } else { "rpush" }, dst);
    ctx.server.blockers.notify_one(ctx.db_index, dst);
    Ok(RespValue::BulkString(value))
}
