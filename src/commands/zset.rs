//! Sorted set commands, including the unified `ZRANGE` family via `RangeBy`
//! and the unified `ZUNIONSTORE`/`ZINTERSTORE`/`ZDIFFSTORE` family via
//! `SetOpKind`/`Aggregate`.

use super::{expect_zset, expect_zset_mut, Ctx};
use crate::database::Database;
use crate::dispatch::command::{Aggregate, RangeBy, SetOpKind, ZAddCondition};
use crate::error::Error;
use crate::protocol::RespValue;
use crate::storage::{DataValue, LexBoundary, ScoreBoundary, SortedSet, ZSetEntry};
use bytes::Bytes;

pub fn zadd(
    ctx: &mut Ctx,
    db: &mut Database,
    key: &Bytes,
    members: &[(f64, Bytes)],
    condition: ZAddCondition,
    ch: bool,
    incr: bool,
) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    if !db.contains(key, now_ms) {
        if matches!(condition, ZAddCondition::Xx) {
            return Ok(if incr { RespValue::Null } else { RespValue::Integer(0) });
        }
        db.set(key.clone(), DataValue::SortedSet(SortedSet::new()));
    }
    let v = db.get_mut(key, now_ms).unwrap();
    let z = expect_zset_mut(&mut v.data)?;
    let mut added = 0i64;
    let mut changed = 0i64;
    let mut incr_result = None;
    for (score, member) in members {
        let existing = z.get_score(member);
        let is_new = existing.is_none();
        let condition_met = match condition {
            ZAddCondition::None => true,
            ZAddCondition::Nx => is_new,
            ZAddCondition::Gt => is_new || existing.is_some_and(|e| *score > e),
            ZAddCondition::Lt => is_new || existing.is_some_and(|e| *score < e),
            ZAddCondition::XxGt => existing.is_some_and(|e| *score > e),
            ZAddCondition::XxLt => existing.is_some_and(|e| *score < e),
        };
        if !condition_met {
            continue;
        }
        if incr {
            let new_score = z.increment_score(member, *score);
            incr_result = Some(new_score);
            if is_new {
                added += 1;
            }
            changed += 1;
        } else if z.add(*score, member.clone()) {
            if is_new {
                added += 1;
            }
            changed += 1;
        }
    }
    v.bump_version();
    if changed > 0 {
        ctx.notify("zadd", key);
        ctx.server.blockers.notify_one(ctx.db_index, key);
    }
    if incr {
        Ok(incr_result.map(|s| RespValue::BulkString(Bytes::from(crate::protocol::format_double(s)))).unwrap_or(RespValue::Null))
    } else {
        Ok(RespValue::Integer(if ch { changed } else { added }))
    }
}

pub fn zrem(ctx: &mut Ctx, db: &mut Database, key: &Bytes, members: &[Bytes]) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let Some(v) = db.get_mut(key, now_ms) else { return Ok(RespValue::Integer(0)) };
    let z = expect_zset_mut(&mut v.data)?;
    let mut removed = 0i64;
    for m in members {
        if z.remove(m) {
            removed += 1;
        }
    }
    let empty = z.is_empty();
    if removed > 0 {
        v.bump_version();
        ctx.notify("zrem", key);
    }
    if empty {
        db.remove(key, now_ms);
    }
    Ok(RespValue::Integer(removed))
}

pub fn zscore(db: &Database, key: &Bytes, member: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(score_resp(expect_zset(&v.data)?.get_score(member))),
        None => Ok(RespValue::Null),
    }
}

fn score_resp(score: Option<f64>) -> RespValue {
    match score {
        Some(s) => RespValue::BulkString(Bytes::from(crate::protocol::format_double(s))),
        None => RespValue::Null,
    }
}

pub fn zmscore(db: &Database, key: &Bytes, members: &[Bytes], now_ms: u64) -> Result<RespValue, Error> {
    let z = match db.get(key, now_ms) {
        Some(v) => Some(expect_zset(&v.data)?),
        None => None,
    };
    Ok(RespValue::Array(members.iter().map(|m| score_resp(z.and_then(|z| z.get_score(m)))).collect()))
}

pub fn zcard(db: &Database, key: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::Integer(expect_zset(&v.data)?.len() as i64)),
        None => Ok(RespValue::Integer(0)),
    }
}

pub fn zcount(db: &Database, key: &Bytes, min: &ScoreBoundary, max: &ScoreBoundary, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::Integer(expect_zset(&v.data)?.get_range_by_score(min.clone(), max.clone()).len() as i64)),
        None => Ok(RespValue::Integer(0)),
    }
}

pub fn zlexcount(db: &Database, key: &Bytes, min: &LexBoundary, max: &LexBoundary, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::Integer(expect_zset(&v.data)?.get_range_by_lex(min, max).len() as i64)),
        None => Ok(RespValue::Integer(0)),
    }
}

pub fn zincrby(ctx: &mut Ctx, db: &mut Database, key: &Bytes, delta: f64, member: &Bytes) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    if !db.contains(key, now_ms) {
        db.set(key.clone(), DataValue::SortedSet(SortedSet::new()));
    }
    let v = db.get_mut(key, now_ms).unwrap();
    let z = expect_zset_mut(&mut v.data)?;
    let new_score = z.increment_score(member, delta);
    v.bump_version();
    ctx.notify("zincrby", key);
    ctx.server.blockers.notify_one(ctx.db_index, key);
    Ok(RespValue::BulkString(Bytes::from(crate::protocol::format_double(new_score))))
}

pub fn zrank(db: &Database, key: &Bytes, member: &Bytes, withscore: bool, reverse: bool, now_ms: u64) -> Result<RespValue, Error> {
    let Some(v) = db.get(key, now_ms) else { return Ok(RespValue::Null) };
    let z = expect_zset(&v.data)?;
    let rank = if reverse { z.get_rev_rank(member) } else { z.get_rank(member) };
    match rank {
        None => Ok(RespValue::Null),
        Some(r) if !withscore => Ok(RespValue::Integer(r as i64)),
        Some(r) => {
            let score = z.get_score(member).unwrap();
            Ok(RespValue::Array(vec![RespValue::Integer(r as i64), RespValue::BulkString(Bytes::from(crate::protocol::format_double(score)))]))
        }
    }
}

fn entries_to_resp(entries: Vec<ZSetEntry>, withscores: bool) -> RespValue {
    let mut out = Vec::with_capacity(entries.len() * if withscores { 2 } else { 1 });
    for e in entries {
        out.push(RespValue::BulkString(e.member));
        if withscores {
            out.push(RespValue::BulkString(Bytes::from(crate::protocol::format_double(e.score))));
        }
    }
    RespValue::Array(out)
}

fn apply_range(z: &SortedSet, by: &RangeBy, rev: bool, limit: Option<(i64, i64)>) -> Vec<ZSetEntry> {
    let mut entries = match by {
        RangeBy::Index(start, stop) => {
            if rev {
                z.get_rev_range(*start, *stop)
            } else {
                z.get_range(*start, *stop)
            }
        }
        RangeBy::Score(min, max) => {
            let mut e = z.get_range_by_score(min.clone(), max.clone());
            if rev {
                e.reverse();
            }
            e
        }
        RangeBy::Lex(min, max) => {
            let mut e = z.get_range_by_lex(min, max);
            if rev {
                e.reverse();
            }
            e
        }
    };
    if let Some((offset, count)) = limit {
        let offset = offset.max(0) as usize;
        entries = entries.into_iter().skip(offset).take(if count < 0 { usize::MAX } else { count as usize }).collect();
    }
    entries
}

pub fn zrange(
    db: &Database,
    key: &Bytes,
    by: &RangeBy,
    rev: bool,
    limit: Option<(i64, i64)>,
    withscores: bool,
    now_ms: u64,
) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(entries_to_resp(apply_range(expect_zset(&v.data)?, by, rev, limit), withscores)),
        None => Ok(RespValue::Array(vec![])),
    }
}

pub fn zrangestore(ctx: &mut Ctx, db: &mut Database, dest: &Bytes, key: &Bytes, by: &RangeBy, rev: bool, limit: Option<(i64, i64)>) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let entries = match db.get(key, now_ms) {
        Some(v) => apply_range(expect_zset(&v.data)?, by, rev, limit),
        None => vec![],
    };
    let len = entries.len();
    if len == 0 {
        db.remove(dest, now_ms);
    } else {
        let mut z = SortedSet::new();
        for e in entries {
            z.add(e.score, e.member);
        }
        db.set(dest.clone(), DataValue::SortedSet(z));
    }
    ctx.notify("zrangestore", dest);
    Ok(RespValue::Integer(len as i64))
}

pub fn zremrangebyrank(ctx: &mut Ctx, db: &mut Database, key: &Bytes, start: i64, stop: i64) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let Some(v) = db.get_mut(key, now_ms) else { return Ok(RespValue::Integer(0)) };
    let z = expect_zset_mut(&mut v.data)?;
    let removed = z.remove_range_by_rank(start, stop);
    let empty = z.is_empty();
    if removed > 0 {
        v.bump_version();
        ctx.notify("zremrangebyrank", key);
    }
    if empty {
        db.remove(key, now_ms);
    }
    Ok(RespValue::Integer(removed as i64))
}

pub fn zremrangebyscore(ctx: &mut Ctx, db: &mut Database, key: &Bytes, min: &ScoreBoundary, max: &ScoreBoundary) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let Some(v) = db.get_mut(key, now_ms) else { return Ok(RespValue::Integer(0)) };
    let z = expect_zset_mut(&mut v.data)?;
    let removed = z.remove_range_by_score(min.clone(), max.clone());
    let empty = z.is_empty();
    if removed > 0 {
        v.bump_version();
        ctx.notify("zremrangebyscore", key);
    }
    if empty {
        db.remove(key, now_ms);
    }
    Ok(RespValue::Integer(removed as i64))
}

pub fn zremrangebylex(ctx: &mut Ctx, db: &mut Database, key: &Bytes, min: &LexBoundary, max: &LexBoundary) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let Some(v) = db.get_mut(key, now_ms) else { return Ok(RespValue::Integer(0)) };
    let z = expect_zset_mut(&mut v.data)?;
    let removed = z.remove_range_by_lex(min, max);
    let empty = z.is_empty();
    if removed > 0 {
        v.bump_version();
        ctx.notify("zremrangebylex", key);
    }
    if empty {
        db.remove(key, now_ms);
    }
    Ok(RespValue::Integer(removed as i64))
}

pub fn zpop(ctx: &mut Ctx, db: &mut Database, key: &Bytes, count: Option<usize>, max: bool) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let Some(v) = db.get_mut(key, now_ms) else { return Ok(RespValue::Array(vec![])) };
    let z = expect_zset_mut(&mut v.data)?;
    let n = count.unwrap_or(1);
    let mut out = Vec::new();
    for _ in 0..n {
        let popped = if max { z.pop_last() } else { z.pop_first() };
        match popped {
            Some(e) => out.push(e),
            None => break,
        }
    }
    let empty = z.is_empty();
    if !out.is_empty() {
        v.bump_version();
        ctx.notify(if max { "zpopmax" } else { "zpopmin" }, key);
    }
    if empty {
        db.remove(key, now_ms);
    }
    Ok(entries_to_resp(out, true))
}

pub fn zset_op(
    ctx: &mut Ctx,
    db: &mut Database,
    kind: SetOpKind,
    dest: Option<&Bytes>,
    keys: &[Bytes],
    weights: Option<Vec<f64>>,
    aggregate: Aggregate,
    withscores: bool,
    now_ms: u64,
) -> Result<RespValue, Error> {
    let weights = weights.unwrap_or_else(|| vec![1.0; keys.len()]);
    let mut sets = Vec::with_capacity(keys.len());
    for k in keys {
        let scores: std::collections::HashMap<Bytes, f64> = match db.get(k, now_ms) {
            Some(v) => match &v.data {
                DataValue::SortedSet(z) => z.iter().map(|e| (e.member.clone(), e.score)).collect(),
                DataValue::Set(s) => s.iter().map(|m| (m.clone(), 1.0)).collect(),
                _ => return Err(Error::WrongType),
            },
            None => std::collections::HashMap::new(),
        };
        sets.push(scores);
    }
    let combine = |a: f64, b: f64| match aggregate {
        Aggregate::Sum => a + b,
        Aggregate::Min => a.min(b),
        Aggregate::Max => a.max(b),
    };
    let mut result: std::collections::HashMap<Bytes, f64> = std::collections::HashMap::new();
    match kind {
        SetOpKind::Union => {
            for (set, weight) in sets.iter().zip(weights.iter()) {
                for (member, score) in set {
                    let weighted = score * weight;
                    result.entry(member.clone()).and_modify(|s| *s = combine(*s, weighted)).or_insert(weighted);
                }
            }
        }
        SetOpKind::Inter => {
            if let Some(first) = sets.first() {
                'member: for (member, score) in first {
                    let mut acc = score * weights[0];
                    for (set, weight) in sets.iter().zip(weights.iter()).skip(1) {
                        match set.get(member) {
                            Some(s) => acc = combine(acc, s * weight),
                            None => continue 'member,
                        }
                    }
                    result.insert(member.clone(), acc);
                }
            }
        }
        SetOpKind::Diff => {
            if let Some(first) = sets.first() {
                for (member, score) in first {
                    if sets.iter().skip(1).all(|s| !s.contains_key(member)) {
                        result.insert(member.clone(), *score);
                    }
                }
            }
        }
    }
    match dest {
        Some(dest) => {
            let len = result.len();
            if len == 0 {
                db.remove(dest, now_ms);
            } else {
                let mut z = SortedSet::new();
                for (member, score) in result {
                    z.add(score, member);
                }
                db.set(dest.clone(), DataValue::SortedSet(z));
            }
            ctx.notify("zinterstore", dest);
            Ok(RespValue::Integer(len as i64))
        }
        None => {
            let mut entries: Vec<ZSetEntry> = result.into_iter().map(|(member, score)| ZSetEntry { score, member }).collect();
            entries.sort();
            Ok(entries_to_resp(entries, withscores))
        }
    }
}
