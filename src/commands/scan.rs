//! Cursor-based scans over collection keys: HSCAN/SSCAN/ZSCAN. Each mirrors
//! `Database::scan`'s offset-into-sorted-snapshot cursor scheme, but over a
//! single key's members instead of the whole keyspace.

use super::{expect_hash, expect_set, expect_zset};
use crate::database::Database;
use crate::error::Error;
use crate::protocol::RespValue;
use bytes::Bytes;
use wildmatch::WildMatch;

fn matches(pattern: Option<&WildMatch>, candidate: &[u8]) -> bool {
    pattern.is_none_or(|m| m.matches(&String::from_utf8_lossy(candidate)))
}

pub fn hscan(
    db: &Database,
    key: &Bytes,
    cursor: u64,
    pattern: Option<&str>,
    count: usize,
    novalues: bool,
    now_ms: u64,
) -> Result<RespValue, Error> {
    let Some(v) = db.get(key, now_ms) else {
        return Ok(RespValue::Array(vec![RespValue::BulkString(Bytes::from_static(b"0")), RespValue::Array(vec![])]));
    };
    let h = expect_hash(&v.data)?;
    let matcher = pattern.map(WildMatch::new);
    let mut pairs: Vec<(&Bytes, &Bytes)> = h.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    let start = cursor as usize;
    let mut out = Vec::new();
    let mut i = start;
    while i < pairs.len() && out.len() < count.max(1) * if novalues { 1 } else { 2 } {
        let (f, val) = pairs[i];
        i += 1;
        if !matches(matcher.as_ref(), f) {
            continue;
        }
        out.push(RespValue::BulkString(f.clone()));
        if !novalues {
            out.push(RespValue::BulkString(val.clone()));
        }
    }
    let next_cursor = if i >= pairs.len() { 0 } else { i as u64 };
    Ok(RespValue::Array(vec![RespValue::BulkString(Bytes::from(next_cursor.to_string())), RespValue::Array(out)]))
}

pub fn sscan(db: &Database, key: &Bytes, cursor: u64, pattern: Option<&str>, count: usize, now_ms: u64) -> Result<RespValue, Error> {
    let Some(v) = db.get(key, now_ms) else {
        return Ok(RespValue::Array(vec![RespValue::BulkString(Bytes::from_static(b"0")), RespValue::Array(vec![])]));
    };
    let s = expect_set(&v.data)?;
    let matcher = pattern.map(WildMatch::new);
    let mut members: Vec<&Bytes> = s.iter().collect();
    members.sort();
    let start = cursor as usize;
    let mut out = Vec::new();
    let mut i = start;
    while i < members.len() && out.len() < count.max(1) {
        let m = members[i];
        i += 1;
        if !matches(matcher.as_ref(), m) {
            continue;
        }
        out.push(RespValue::BulkString(m.clone()));
    }
    let next_cursor = if i >= members.len() { 0 } else { i as u64 };
    Ok(RespValue::Array(vec![RespValue::BulkString(Bytes::from(next_cursor.to_string())), RespValue::Array(out)]))
}

pub fn zscan(db: &Database, key: &Bytes, cursor: u64, pattern: Option<&str>, count: usize, now_ms: u64) -> Result<RespValue, Error> {
    let Some(v) = db.get(key, now_ms) else {
        return Ok(RespValue::Array(vec![RespValue::BulkString(Bytes::from_static(b"0")), RespValue::Array(vec![])]));
    };
    let z = expect_zset(&v.data)?;
    let matcher = pattern.map(WildMatch::new);
    let mut entries: Vec<_> = z.iter().collect();
    entries.sort_by(|a, b| a.member.cmp(&b.member));
    let start = cursor as usize;
    let mut out = Vec::new();
    let mut i = start;
    while i < entries.len() && out.len() < count.max(1) * 2 {
        let entry = entries[i];
        i += 1;
        if !matches(matcher.as_ref(), &entry.member) {
            continue;
        }
        out.push(RespValue::BulkString(entry.member.clone()));
        out.push(RespValue::BulkString(Bytes::from(crate::protocol::format_double(entry.score))));
    }
    let next_cursor = if i >= entries.len() { 0 } else { i as u64 };
    Ok(RespValue::Array(vec![RespValue::BulkString(Bytes::from(next_cursor.to_string())), RespValue::Array(out)]))
}
