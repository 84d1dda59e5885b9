//! Stream commands: XADD/XRANGE/consumer groups.

use super::{expect_stream, expect_stream_mut, Ctx};
use crate::database::Database;
use crate::dispatch::command::StreamTrim;
use crate::error::Error;
use crate::protocol::RespValue;
use crate::storage::{Consumer, ConsumerGroup, DataValue, PendingEntryInfo, Stream, StreamId};
use bytes::Bytes;
use indexmap::IndexMap;

fn apply_trim(stream: &mut Stream, trim: &StreamTrim) {
    match trim {
        StreamTrim::MaxLen { count, .. } => {
            stream.trim_to_maxlen(*count as usize);
        }
        StreamTrim::MinId { id, .. } => {
            stream.trim_before(*id);
        }
    }
}

pub fn xadd(
    ctx: &mut Ctx,
    db: &mut Database,
    key: &Bytes,
    id_spec: Option<StreamId>,
    nomkstream: bool,
    trim: Option<StreamTrim>,
    fields: &[(Bytes, Bytes)],
) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    if nomkstream && !db.contains(key, now_ms) {
        return Ok(RespValue::Null);
    }
    if !db.contains(key, now_ms) {
        db.set(key.clone(), DataValue::Stream(Stream::new()));
    }
    let v = db.get_mut(key, now_ms).unwrap();
    let stream = expect_stream_mut(&mut v.data)?;
    let mut field_map = IndexMap::new();
    for (f, val) in fields {
        field_map.insert(f.clone(), val.clone());
    }
    let id = stream.add_entry(id_spec, field_map).map_err(|e| Error::InvalidState(e.to_string()))?;
    if let Some(trim) = &trim {
        apply_trim(stream, trim);
    }
    v.bump_version();
    ctx.notify("xadd", key);
    ctx.server.blockers.notify_one(ctx.db_index, key);
    Ok(RespValue::BulkString(Bytes::from(id.to_string())))
}

pub fn xlen(db: &Database, key: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::Integer(expect_stream(&v.data)?.length as i64)),
        None => Ok(RespValue::Integer(0)),
    }
}

fn entry_resp(id: StreamId, fields: &IndexMap<Bytes, Bytes>) -> RespValue {
    let mut flat = Vec::with_capacity(fields.len() * 2);
    for (f, v) in fields {
        flat.push(RespValue::BulkString(f.clone()));
        flat.push(RespValue::BulkString(v.clone()));
    }
    RespValue::Array(vec![RespValue::BulkString(Bytes::from(id.to_string())), RespValue::Array(flat)])
}

pub fn xrange(
    db: &Database,
    key: &Bytes,
    start: StreamId,
    start_exclusive: bool,
    end: StreamId,
    end_exclusive: bool,
    count: Option<usize>,
    now_ms: u64,
    reverse: bool,
) -> Result<RespValue, Error> {
    let Some(v) = db.get(key, now_ms) else { return Ok(RespValue::Array(vec![])) };
    let stream = expect_stream(&v.data)?;
    use std::ops::Bound;
    let lower = if start_exclusive { Bound::Excluded(start) } else { Bound::Included(start) };
    let upper = if end_exclusive { Bound::Excluded(end) } else { Bound::Included(end) };
    let mut out: Vec<RespValue> = if reverse {
        stream.entries.range((lower, upper)).rev().map(|(id, e)| entry_resp(*id, &e.fields)).collect()
    } else {
        stream.entries.range((lower, upper)).map(|(id, e)| entry_resp(*id, &e.fields)).collect()
    };
    if let Some(n) = count {
        out.truncate(n);
    }
    Ok(RespValue::Array(out))
}

pub fn xdel(ctx: &mut Ctx, db: &mut Database, key: &Bytes, ids: &[StreamId]) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let Some(v) = db.get_mut(key, now_ms) else { return Ok(RespValue::Integer(0)) };
    let stream = expect_stream_mut(&mut v.data)?;
    let deleted = stream.delete(ids);
    if deleted > 0 {
        v.bump_version();
        ctx.notify("xdel", key);
    }
    Ok(RespValue::Integer(deleted as i64))
}

pub fn xtrim(ctx: &mut Ctx, db: &mut Database, key: &Bytes, trim: StreamTrim) -> Result<RespValue, Error> {
    let now_ms = ctx.now_ms;
    let Some(v) = db.get_mut(key, now_ms) else { return Ok(RespValue::Integer(0)) };
    let stream = expect_stream_mut(&mut v.data)?;
    let before = stream.length;
    apply_trim(stream, &trim);
    let removed = before - stream.length;
    if removed > 0 {
        v.bump_version();
        ctx.notify("xtrim", key);
    }
    Ok(RespValue::Integer(removed as i64))
}

pub fn xgroup_create(db: &mut Database, key: &Bytes, group: &Bytes, id_spec: StreamId, use_last: bool, mkstream: bool) -> Result<RespValue, Error> {
    let now_ms = 0;
    if !db.contains(key, now_ms) {
        if !mkstream {
            return Err(Error::InvalidState("ERR The XGROUP subcommand requires the key to exist. Note that for CREATE you may want to use the MKSTREAM option to create an empty stream automatically.".into()));
        }
        db.set(key.clone(), DataValue::Stream(Stream::new()));
    }
    let v = db.get_mut(key, now_ms).unwrap();
    let stream = expect_stream_mut(&mut v.data)?;
    if stream.groups.contains_key(group) {
        return Err(Error::InvalidState("BUSYGROUP Consumer Group name already exists".into()));
    }
    let start = if use_last { stream.last_generated_id } else { id_spec };
    stream.groups.insert(group.clone(), ConsumerGroup::new(group.clone(), start));
    v.bump_version();
    Ok(RespValue::ok())
}

pub fn xgroup_destroy(db: &mut Database, key: &Bytes, group: &Bytes) -> Result<RespValue, Error> {
    let now_ms = 0;
    let Some(v) = db.get_mut(key, now_ms) else { return Ok(RespValue::Integer(0)) };
    let stream = expect_stream_mut(&mut v.data)?;
    let removed = stream.groups.remove(group).is_some();
    if removed {
        v.bump_version();
    }
    Ok(RespValue::Integer(removed as i64))
}

pub fn xgroup_create_consumer(db: &mut Database, key: &Bytes, group: &Bytes, consumer: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    let Some(v) = db.get_mut(key, now_ms) else { return Err(Error::NoGroup("no such key".into())) };
    let stream = expect_stream_mut(&mut v.data)?;
    let Some(g) = stream.groups.get_mut(group) else {
        return Err(Error::NoGroup(format!("no such consumer group '{}'", String::from_utf8_lossy(group))));
    };
    let created = !g.consumers.contains_key(consumer);
    g.consumers.entry(consumer.clone()).or_insert_with(|| Consumer { name: consumer.clone(), seen_time_ms: now_ms, ..Default::default() });
    Ok(RespValue::Integer(created as i64))
}

pub fn xgroup_del_consumer(db: &mut Database, key: &Bytes, group: &Bytes, consumer: &Bytes) -> Result<RespValue, Error> {
    let now_ms = 0;
    let Some(v) = db.get_mut(key, now_ms) else { return Err(Error::NoGroup("no such key".into())) };
    let stream = expect_stream_mut(&mut v.data)?;
    let Some(g) = stream.groups.get_mut(group) else {
        return Err(Error::NoGroup(format!("no such consumer group '{}'", String::from_utf8_lossy(group))));
    };
    let pending = g.consumers.get(consumer).map(|c| c.pending_ids.len()).unwrap_or(0);
    if let Some(c) = g.consumers.remove(consumer) {
        for id in &c.pending_ids {
            g.pending_entries.remove(id);
        }
    }
    Ok(RespValue::Integer(pending as i64))
}

pub fn xgroup_setid(db: &mut Database, key: &Bytes, group: &Bytes, id_spec: StreamId, use_last: bool) -> Result<RespValue, Error> {
    let now_ms = 0;
    let Some(v) = db.get_mut(key, now_ms) else { return Err(Error::NoGroup("no such key".into())) };
    let stream = expect_stream_mut(&mut v.data)?;
    let last = stream.last_generated_id;
    let Some(g) = stream.groups.get_mut(group) else {
        return Err(Error::NoGroup(format!("no such consumer group '{}'", String::from_utf8_lossy(group))));
    };
    g.last_delivered_id = if use_last { last } else { id_spec };
    Ok(RespValue::ok())
}

fn read_keys(db: &Database, keys: &[Bytes], ids: &[StreamId], count: Option<usize>, now_ms: u64) -> Result<Vec<RespValue>, Error> {
    let mut out = Vec::new();
    for (key, after) in keys.iter().zip(ids.iter()) {
        let Some(v) = db.get(key, now_ms) else { continue };
        let stream = expect_stream(&v.data)?;
        let mut entries: Vec<RespValue> = stream
            .entries
            .range((std::ops::Bound::Excluded(*after), std::ops::Bound::Unbounded))
            .map(|(id, e)| entry_resp(*id, &e.fields))
            .collect();
        if let Some(n) = count {
            entries.truncate(n);
        }
        if !entries.is_empty() {
            out.push(RespValue::Array(vec![RespValue::BulkString(key.clone()), RespValue::Array(entries)]));
        }
    }
    Ok(out)
}

pub fn xread(db: &Database, keys: &[Bytes], ids: &[StreamId], count: Option<usize>, _db_index: usize) -> Result<RespValue, Error> {
    let out = read_keys(db, keys, ids, count, u64::MAX)?;
    if out.is_empty() {
        Ok(RespValue::NullArray)
    } else {
        Ok(RespValue::Array(out))
    }
}

pub fn xreadgroup(
    db: &mut Database,
    group: &Bytes,
    consumer: &Bytes,
    keys: &[Bytes],
    ids: &[StreamId],
    count: Option<usize>,
    noack: bool,
    now_ms: u64,
    _db_index: usize,
) -> Result<RespValue, Error> {
    let mut out = Vec::new();
    for (key, requested) in keys.iter().zip(ids.iter()) {
        let Some(v) = db.get_mut(key, now_ms) else {
            return Err(Error::NoGroup(format!("no such key '{}' or consumer group '{}'", String::from_utf8_lossy(key), String::from_utf8_lossy(group))));
        };
        let stream = expect_stream_mut(&mut v.data)?;
        let Some(g) = stream.groups.get_mut(group) else {
            return Err(Error::NoGroup(format!("no such consumer group '{}'", String::from_utf8_lossy(group))));
        };
        let c = g.consumers.entry(consumer.clone()).or_insert_with(|| Consumer { name: consumer.clone(), seen_time_ms: now_ms, ..Default::default() });
        c.seen_time_ms = now_ms;

        let new_messages = *requested == StreamId::MAX;
        let mut entries = Vec::new();
        if new_messages {
            let last = g.last_delivered_id;
            let collected: Vec<(StreamId, IndexMap<Bytes, Bytes>)> = stream
                .entries
                .range((std::ops::Bound::Excluded(last), std::ops::Bound::Unbounded))
                .take(count.unwrap_or(usize::MAX))
                .map(|(id, e)| (*id, e.fields.clone()))
                .collect();
            if let Some((last_id, _)) = collected.last() {
                g.last_delivered_id = *last_id;
            }
            for (id, fields) in collected {
                if !noack {
                    g.pending_entries.insert(id, PendingEntryInfo { consumer_name: consumer.clone(), delivery_count: 1, delivery_time_ms: now_ms });
                    g.consumers.get_mut(consumer).unwrap().pending_ids.insert(id);
                }
                entries.push(entry_resp(id, &fields));
            }
        } else {
            let pending_ids: Vec<StreamId> = g
                .consumers
                .get(consumer)
                .map(|c| c.pending_ids.iter().filter(|id| **id >= *requested).copied().collect())
                .unwrap_or_default();
            for id in pending_ids {
                if let Some(e) = stream.entries.get(&id) {
                    entries.push(entry_resp(id, &e.fields));
                }
            }
        }
        if !entries.is_empty() || !new_messages {
            out.push(RespValue::Array(vec![RespValue::BulkString(key.clone()), RespValue::Array(entries)]));
        }
    }
    if out.is_empty() {
        Ok(RespValue::NullArray)
    } else {
        Ok(RespValue::Array(out))
    }
}

pub fn xack(db: &mut Database, key: &Bytes, group: &Bytes, ids: &[StreamId]) -> Result<RespValue, Error> {
    let now_ms = 0;
    let Some(v) = db.get_mut(key, now_ms) else { return Ok(RespValue::Integer(0)) };
    let stream = expect_stream_mut(&mut v.data)?;
    let Some(g) = stream.groups.get_mut(group) else { return Ok(RespValue::Integer(0)) };
    let mut acked = 0i64;
    for id in ids {
        if let Some(info) = g.pending_entries.remove(id) {
            if let Some(c) = g.consumers.get_mut(&info.consumer_name) {
                c.pending_ids.remove(id);
            }
            acked += 1;
        }
    }
    Ok(RespValue::Integer(acked))
}

pub fn xpending(db: &Database, key: &Bytes, group: &Bytes, extended: Option<(StreamId, StreamId, usize, Option<Bytes>)>) -> Result<RespValue, Error> {
    let now_ms = 0;
    let Some(v) = db.get(key, now_ms) else { return Ok(RespValue::Array(vec![])) };
    let stream = expect_stream(&v.data)?;
    let Some(g) = stream.groups.get(group) else {
        return Err(Error::NoGroup(format!("no such consumer group '{}'", String::from_utf8_lossy(group))));
    };
    match extended {
        None => {
            if g.pending_entries.is_empty() {
                return Ok(RespValue::Array(vec![RespValue::Integer(0), RespValue::Null, RespValue::Null, RespValue::NullArray]));
            }
            let first = *g.pending_entries.keys().next().unwrap();
            let last = *g.pending_entries.keys().next_back().unwrap();
            let mut per_consumer: std::collections::HashMap<Bytes, i64> = std::collections::HashMap::new();
            for info in g.pending_entries.values() {
                *per_consumer.entry(info.consumer_name.clone()).or_insert(0) += 1;
            }
            let consumers = per_consumer
                .into_iter()
                .map(|(name, count)| RespValue::Array(vec![RespValue::BulkString(name), RespValue::BulkString(Bytes::from(count.to_string()))]))
                .collect();
            Ok(RespValue::Array(vec![
                RespValue::Integer(g.pending_entries.len() as i64),
                RespValue::BulkString(Bytes::from(first.to_string())),
                RespValue::BulkString(Bytes::from(last.to_string())),
                RespValue::Array(consumers),
            ]))
        }
        Some((start, end, count, consumer_filter)) => {
            use std::ops::Bound;
            let out: Vec<RespValue> = g
                .pending_entries
                .range((Bound::Included(start), Bound::Included(end)))
                .filter(|(_, info)| consumer_filter.as_ref().is_none_or(|c| *c == info.consumer_name))
                .take(count)
                .map(|(id, info)| {
                    RespValue::Array(vec![
                        RespValue::BulkString(Bytes::from(id.to_string())),
                        RespValue::BulkString(info.consumer_name.clone()),
                        RespValue::Integer(info.delivery_time_ms as i64),
                        RespValue::Integer(info.delivery_count as i64),
                    ])
                })
                .collect();
            Ok(RespValue::Array(out))
        }
    }
}

pub fn xclaim(
    db: &mut Database,
    key: &Bytes,
    group: &Bytes,
    consumer: &Bytes,
    min_idle_ms: u64,
    ids: &[StreamId],
    justid: bool,
    now_ms: u64,
) -> Result<RespValue, Error> {
    let Some(v) = db.get_mut(key, now_ms) else { return Ok(RespValue::Array(vec![])) };
    let stream = expect_stream_mut(&mut v.data)?;
    let entries_snapshot = stream.entries.clone();
    let Some(g) = stream.groups.get_mut(group) else {
        return Err(Error::NoGroup(format!("no such consumer group '{}'", String::from_utf8_lossy(group))));
    };
    let mut claimed = Vec::new();
    for id in ids {
        let Some(info) = g.pending_entries.get(id).cloned() else { continue };
        if now_ms.saturating_sub(info.delivery_time_ms) < min_idle_ms {
            continue;
        }
        if let Some(old_consumer) = g.consumers.get_mut(&info.consumer_name) {
            old_consumer.pending_ids.remove(id);
        }
        let new_info = PendingEntryInfo { consumer_name: consumer.clone(), delivery_count: info.delivery_count + 1, delivery_time_ms: now_ms };
        g.pending_entries.insert(*id, new_info);
        g.consumers.entry(consumer.clone()).or_insert_with(|| Consumer { name: consumer.clone(), seen_time_ms: now_ms, ..Default::default() }).pending_ids.insert(*id);
        if let Some(e) = entries_snapshot.get(id) {
            claimed.push((*id, e.fields.clone()));
        }
    }
    if justid {
        Ok(RespValue::array_of_bytes(claimed.into_iter().map(|(id, _)| Bytes::from(id.to_string())).collect()))
    } else {
        Ok(RespValue::Array(claimed.into_iter().map(|(id, fields)| entry_resp(id, &fields)).collect()))
    }
}

pub fn xautoclaim(
    db: &mut Database,
    key: &Bytes,
    group: &Bytes,
    consumer: &Bytes,
    min_idle_ms: u64,
    start: StreamId,
    count: usize,
    justid: bool,
    now_ms: u64,
) -> Result<RespValue, Error> {
    let Some(v) = db.get_mut(key, now_ms) else { return Ok(RespValue::Array(vec![])) };
    let stream = expect_stream_mut(&mut v.data)?;
    let entries_snapshot = stream.entries.clone();
    let Some(g) = stream.groups.get_mut(group) else {
        return Err(Error::NoGroup(format!("no such consumer group '{}'", String::from_utf8_lossy(group))));
    };
    let candidate_ids: Vec<StreamId> = g
        .pending_entries
        .range((std::ops::Bound::Included(start), std::ops::Bound::Unbounded))
        .filter(|(_, info)| now_ms.saturating_sub(info.delivery_time_ms) >= min_idle_ms)
        .take(count)
        .map(|(id, _)| *id)
        .collect();
    let mut claimed = Vec::new();
    let mut next_cursor = StreamId::MIN;
    for id in candidate_ids {
        let info = g.pending_entries.get(&id).cloned().unwrap();
        if let Some(old_consumer) = g.consumers.get_mut(&info.consumer_name) {
            old_consumer.pending_ids.remove(&id);
        }
        let new_info = PendingEntryInfo { consumer_name: consumer.clone(), delivery_count: info.delivery_count + 1, delivery_time_ms: now_ms };
        g.pending_entries.insert(id, new_info);
        g.consumers.entry(consumer.clone()).or_insert_with(|| Consumer { name: consumer.clone(), seen_time_ms: now_ms, ..Default::default() }).pending_ids.insert(id);
        next_cursor = StreamId::new(id.timestamp_ms, id.sequence + 1);
        if let Some(e) = entries_snapshot.get(&id) {
            claimed.push((id, e.fields.clone()));
        }
    }
    let claimed_resp = if justid {
        RespValue::array_of_bytes(claimed.into_iter().map(|(id, _)| Bytes::from(id.to_string())).collect())
    } else {
        RespValue::Array(claimed.into_iter().map(|(id, fields)| entry_resp(id, &fields)).collect())
    };
    Ok(RespValue::Array(vec![RespValue::BulkString(Bytes::from(next_cursor.to_string())), claimed_resp, RespValue::Array(vec![])]))
}

pub fn xinfo_stream(db: &Database, key: &Bytes) -> Result<RespValue, Error> {
    let now_ms = 0;
    let Some(v) = db.get(key, now_ms) else { return Err(Error::InvalidState("no such key".into())) };
    let stream = expect_stream(&v.data)?;
    Ok(RespValue::Map(vec![
        (RespValue::BulkString(Bytes::from_static(b"length")), RespValue::Integer(stream.length as i64)),
        (RespValue::BulkString(Bytes::from_static(b"last-generated-id")), RespValue::BulkString(Bytes::from(stream.last_generated_id.to_string()))),
        (RespValue::BulkString(Bytes::from_static(b"max-deleted-entry-id")), RespValue::BulkString(Bytes::from(stream.max_deleted_id.to_string()))),
        (RespValue::BulkString(Bytes::from_static(b"entries-added")), RespValue::Integer(stream.entries_added as i64)),
        (RespValue::BulkString(Bytes::from_static(b"groups")), RespValue::Integer(stream.groups.len() as i64)),
    ]))
}

pub fn xinfo_groups(db: &Database, key: &Bytes) -> Result<RespValue, Error> {
    let now_ms = 0;
    let Some(v) = db.get(key, now_ms) else { return Err(Error::InvalidState("no such key".into())) };
    let stream = expect_stream(&v.data)?;
    let out = stream
        .groups
        .values()
        .map(|g| {
            RespValue::Map(vec![
                (RespValue::BulkString(Bytes::from_static(b"name")), RespValue::BulkString(g.name.clone())),
                (RespValue::BulkString(Bytes::from_static(b"consumers")), RespValue::Integer(g.consumers.len() as i64)),
                (RespValue::BulkString(Bytes::from_static(b"pending")), RespValue::Integer(g.pending_entries.len() as i64)),
                (RespValue::BulkString(Bytes::from_static(b"last-delivered-id")), RespValue::BulkString(Bytes::from(g.last_delivered_id.to_string()))),
            ])
        })
        .collect();
    Ok(RespValue::Array(out))
}

pub fn xinfo_consumers(db: &Database, key: &Bytes, group: &Bytes) -> Result<RespValue, Error> {
    let now_ms = 0;
    let Some(v) = db.get(key, now_ms) else { return Err(Error::InvalidState("no such key".into())) };
    let stream = expect_stream(&v.data)?;
    let Some(g) = stream.groups.get(group) else {
        return Err(Error::NoGroup(format!("no such consumer group '{}'", String::from_utf8_lossy(group))));
    };
    let out = g
        .consumers
        .values()
        .map(|c| {
            RespValue::Map(vec![
                (RespValue::BulkString(Bytes::from_static(b"name")), RespValue::BulkString(c.name.clone())),
                (RespValue::BulkString(Bytes::from_static(b"pending")), RespValue::Integer(c.pending_ids.len() as i64)),
                (RespValue::BulkString(Bytes::from_static(b"seen-time")), RespValue::Integer(c.seen_time_ms as i64)),
            ])
        })
        .collect();
    Ok(RespValue::Array(out))
}
