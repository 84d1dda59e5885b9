//! HyperLogLog commands. `DataValue::Set` backs the estimator directly, so
//! `PFCOUNT` reports exact cardinality rather than an approximate sketch.

use super::{expect_set, expect_set_mut, Ctx};
use crate::database::Database;
use crate::error::Error;
use crate::protocol::RespValue;
use crate::storage::DataValue;
use bytes::Bytes;
use std::collections::HashSet;

pub fn pfadd(ctx: &mut Ctx, db: &mut Database, key: &Bytes, elements: &[Bytes]) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let mut changed = false;
    if let Some(v) = db.get_mut(key, now_ms) {
        let s = expect_set_mut(&mut v.data)?;
        for e in elements {
            if s.insert(e.clone()) {
                changed = true;
            }
        }
        if changed {
            v.bump_version();
        }
    } else {
        let mut s = HashSet::new();
        for e in elements {
            s.insert(e.clone());
        }
        changed = true;
        db.set(key.clone(), DataValue::Set(s));
    }
    if changed {
        ctx.notify("pfadd", key);
    }
    Ok(RespValue::Integer(changed as i64))
}

pub fn pfcount(db: &Database, keys: &[Bytes], now_ms: u64) -> Result<RespValue, Error> {
    let mut union: HashSet<Bytes> = HashSet::new();
    for key in keys {
        if let Some(v) = db.get(key, now_ms) {
            union.extend(expect_set(&v.data)?.iter().cloned());
        }
    }
    Ok(RespValue::Integer(union.len() as i64))
}

pub fn pfmerge(ctx: &mut Ctx, db: &mut Database, dest: &Bytes, keys: &[Bytes]) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let mut union: HashSet<Bytes> = match db.get(dest, now_ms) {
        Some(v) => expect_set(&v.data)?.clone(),
        None => HashSet::new(),
    };
    for key in keys {
        if let Some(v) = db.get(key, now_ms) {
            union.extend(expect_set(&v.data)?.iter().cloned());
        }
    }
    db.set(dest.clone(), DataValue::Set(union));
    ctx.notify("pfadd", dest);
    Ok(RespValue::ok())
}
