//! SUBSCRIBE/UNSUBSCRIBE family: updates a session's subscription
//! bookkeeping and builds the confirmation replies. `dispatch::router` owns
//! the actual `broadcast::Receiver` plumbing, since that spans the whole
//! connection rather than a single command.

use crate::connection::session::SessionState;
use crate::protocol::RespValue;
use crate::server::ServerState;
use bytes::Bytes;

fn confirm(kind: &'static str, channel: Bytes, count: usize) -> RespValue {
    RespValue::Array(vec![RespValue::BulkString(Bytes::from_static(kind.as_bytes())), RespValue::BulkString(channel), RespValue::Integer(count as i64)])
}

pub fn subscribe(session: &mut SessionState, channels: &[Bytes]) -> Vec<RespValue> {
    channels
        .iter()
        .map(|c| {
            session.subscribed_channels.insert(c.clone());
            confirm("subscribe", c.clone(), session.subscription_count())
        })
        .collect()
}

pub fn unsubscribe(session: &mut SessionState, channels: &[Bytes]) -> Vec<RespValue> {
    let targets: Vec<Bytes> = if channels.is_empty() { session.subscribed_channels.iter().cloned().collect() } else { channels.to_vec() };
    if targets.is_empty() {
        return vec![confirm("unsubscribe", Bytes::new(), session.subscription_count())];
    }
    targets
        .into_iter()
        .map(|c| {
            session.subscribed_channels.remove(&c);
            confirm("unsubscribe", c, session.subscription_count())
        })
        .collect()
}

pub fn psubscribe(session: &mut SessionState, patterns: &[Bytes]) -> Vec<RespValue> {
    patterns
        .iter()
        .map(|p| {
            session.subscribed_patterns.insert(p.clone());
            confirm("psubscribe", p.clone(), session.subscription_count())
        })
        .collect()
}

pub fn punsubscribe(session: &mut SessionState, patterns: &[Bytes]) -> Vec<RespValue> {
    let targets: Vec<Bytes> = if patterns.is_empty() { session.subscribed_patterns.iter().cloned().collect() } else { patterns.to_vec() };
    if targets.is_empty() {
        return vec![confirm("punsubscribe", Bytes::new(), session.subscription_count())];
    }
    targets
        .into_iter()
        .map(|p| {
            session.subscribed_patterns.remove(&p);
            confirm("punsubscribe", p, session.subscription_count())
        })
        .collect()
}

pub fn ssubscribe(session: &mut SessionState, channels: &[Bytes]) -> Vec<RespValue> {
    channels
        .iter()
        .map(|c| {
            session.subscribed_shard_channels.insert(c.clone());
            confirm("ssubscribe", c.clone(), session.subscription_count())
        })
        .collect()
}

pub fn sunsubscribe(session: &mut SessionState, channels: &[Bytes]) -> Vec<RespValue> {
    let targets: Vec<Bytes> = if channels.is_empty() { session.subscribed_shard_channels.iter().cloned().collect() } else { channels.to_vec() };
    if targets.is_empty() {
        return vec![confirm("sunsubscribe", Bytes::new(), session.subscription_count())];
    }
    targets
        .into_iter()
        .map(|c| {
            session.subscribed_shard_channels.remove(&c);
            confirm("sunsubscribe", c, session.subscription_count())
        })
        .collect()
}

pub fn publish(server: &ServerState, channel: &Bytes, message: &Bytes) -> RespValue {
    RespValue::Integer(server.pubsub.publish(channel, message.clone()) as i64)
}

pub fn spublish(server: &ServerState, channel: &Bytes, message: &Bytes) -> RespValue {
    RespValue::Integer(server.pubsub.publish_shard(channel, message.clone()) as i64)
}

pub fn pubsub_channels(server: &ServerState, pattern: Option<&str>) -> RespValue {
    RespValue::array_of_bytes(server.pubsub.active_channels(pattern))
}

pub fn pubsub_numsub(server: &ServerState, channels: &[Bytes]) -> RespValue {
    let mut out = Vec::with_capacity(channels.len() * 2);
    for c in channels {
        out.push(RespValue::BulkString(c.clone()));
        out.push(RespValue::Integer(server.pubsub.subscriber_count(c) as i64));
    }
    RespValue::Array(out)
}

pub fn pubsub_numpat(server: &ServerState) -> RespValue {
    RespValue::Integer(server.pubsub.pattern_count() as i64)
}

pub fn pubsub_shard_channels(server: &ServerState, pattern: Option<&str>) -> RespValue {
    RespValue::array_of_bytes(server.pubsub.active_shard_channels(pattern))
}

pub fn pubsub_shard_numsub(server: &ServerState, channels: &[Bytes]) -> RespValue {
    let mut out = Vec::with_capacity(channels.len() * 2);
    for c in channels {
        out.push(RespValue::BulkString(c.clone()));
        out.push(RespValue::Integer(server.pubsub.shard_subscriber_count(c) as i64));
    }
    RespValue::Array(out)
}
