//! Publish/subscribe registries: exact-channel, pattern, and the
//! independent shard-channel namespace (`SSUBSCRIBE`/`SPUBLISH`), plus
//! keyspace notification emission gated by a `notify-keyspace-events`
//! bitmask. Grounded in the teacher's `core/pubsub/mod.rs`.

use bitflags::bitflags;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use wildmatch::WildMatch;

/// A channel message delivered to a pattern subscriber: the pattern that
/// matched, the concrete channel, and the payload.
pub type PMessage = (Bytes, Bytes, Bytes);

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Default)]
pub struct PubSubManager {
    channels: DashMap<Bytes, Arc<broadcast::Sender<Bytes>>>,
    pattern_channels: DashMap<Bytes, Arc<broadcast::Sender<PMessage>>>,
    shard_channels: DashMap<Bytes, Arc<broadcast::Sender<Bytes>>>,
}

impl PubSubManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, channel: Bytes) -> broadcast::Receiver<Bytes> {
        self.channels
            .entry(channel)
            .or_insert_with(|| Arc::new(broadcast::channel(CHANNEL_CAPACITY).0))
            .subscribe()
    }

    pub fn subscribe_shard(&self, channel: Bytes) -> broadcast::Receiver<Bytes> {
        self.shard_channels
            .entry(channel)
            .or_insert_with(|| Arc::new(broadcast::channel(CHANNEL_CAPACITY).0))
            .subscribe()
    }

    pub fn subscribe_pattern(&self, pattern: Bytes) -> broadcast::Receiver<PMessage> {
        self.pattern_channels
            .entry(pattern)
            .or_insert_with(|| Arc::new(broadcast::channel(CHANNEL_CAPACITY).0))
            .subscribe()
    }

    /// Publishes to the exact channel and to every matching pattern.
    /// Returns the number of subscribers (exact + pattern) the message was
    /// delivered to, matching `PUBLISH`'s reply.
    pub fn publish(&self, channel: &Bytes, message: Bytes) -> u64 {
        let mut receivers = 0u64;
        if let Some(tx) = self.channels.get(channel) {
            receivers += tx.send(message.clone()).unwrap_or(0) as u64;
        }
        for entry in self.pattern_channels.iter() {
            let pattern = entry.key();
            if WildMatch::new(&String::from_utf8_lossy(pattern)).matches(&String::from_utf8_lossy(channel)) {
                let payload = (pattern.clone(), channel.clone(), message.clone());
                receivers += entry.value().send(payload).unwrap_or(0) as u64;
            }
        }
        self.purge_empty();
        receivers
    }

    pub fn publish_shard(&self, channel: &Bytes, message: Bytes) -> u64 {
        let receivers = self
            .shard_channels
            .get(channel)
            .map(|tx| tx.send(message).unwrap_or(0) as u64)
            .unwrap_or(0);
        self.purge_empty();
        receivers
    }

    fn purge_empty(&self) {
        self.channels.retain(|_, tx| tx.receiver_count() > 0);
        self.pattern_channels.retain(|_, tx| tx.receiver_count() > 0);
        self.shard_channels.retain(|_, tx| tx.receiver_count() > 0);
    }

    pub fn active_channels(&self, pattern: Option<&str>) -> Vec<Bytes> {
        let matcher = pattern.map(WildMatch::new);
        self.channels
            .iter()
            .filter(|e| e.value().receiver_count() > 0)
            .filter(|e| matcher.as_ref().is_none_or(|m| m.matches(&String::from_utf8_lossy(e.key()))))
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn active_shard_channels(&self, pattern: Option<&str>) -> Vec<Bytes> {
        let matcher = pattern.map(WildMatch::new);
        self.shard_channels
            .iter()
            .filter(|e| e.value().receiver_count() > 0)
            .filter(|e| matcher.as_ref().is_none_or(|m| m.matches(&String::from_utf8_lossy(e.key()))))
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn subscriber_count(&self, channel: &Bytes) -> u64 {
        self.channels.get(channel).map(|tx| tx.receiver_count() as u64).unwrap_or(0)
    }

    pub fn shard_subscriber_count(&self, channel: &Bytes) -> u64 {
        self.shard_channels.get(channel).map(|tx| tx.receiver_count() as u64).unwrap_or(0)
    }

    pub fn pattern_count(&self) -> u64 {
        self.pattern_channels.iter().filter(|e| e.value().receiver_count() > 0).count() as u64
    }
}

bitflags! {
    /// Mirrors Redis's `notify-keyspace-events` flag characters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KeyspaceFlags: u32 {
        const KEYSPACE     = 0b0000_0000_0001; // K
        const KEYEVENT     = 0b0000_0000_0010; // E
        const GENERIC      = 0b0000_0000_0100; // g
        const STRING       = 0b0000_0000_1000; // $
        const LIST         = 0b0000_0001_0000; // l
        const SET          = 0b0000_0010_0000; // s
        const HASH         = 0b0000_0100_0000; // h
        const ZSET         = 0b0000_1000_0000; // z
        const EXPIRED      = 0b0001_0000_0000; // x
        const EVICTED      = 0b0010_0000_0000; // e
        const STREAM       = 0b0100_0000_0000; // t
        const KEY_MISS     = 0b1000_0000_0000; // m
        const NEW_KEY      = 0b1_0000_0000_0000; // n
        const ALL = Self::GENERIC.bits() | Self::STRING.bits() | Self::LIST.bits()
            | Self::SET.bits() | Self::HASH.bits() | Self::ZSET.bits()
            | Self::EXPIRED.bits() | Self::EVICTED.bits() | Self::STREAM.bits(); // A
    }
}

pub fn parse_notify_flags(spec: &str) -> KeyspaceFlags {
    let mut flags = KeyspaceFlags::empty();
    for c in spec.chars() {
        flags |= match c {
            'K' => KeyspaceFlags::KEYSPACE,
            'E' => KeyspaceFlags::KEYEVENT,
            'g' => KeyspaceFlags::GENERIC,
            '$' => KeyspaceFlags::STRING,
            'l' => KeyspaceFlags::LIST,
            's' => KeyspaceFlags::SET,
            'h' => KeyspaceFlags::HASH,
            'z' => KeyspaceFlags::ZSET,
            'x' => KeyspaceFlags::EXPIRED,
            'e' => KeyspaceFlags::EVICTED,
            't' => KeyspaceFlags::STREAM,
            'm' => KeyspaceFlags::KEY_MISS,
            'n' => KeyspaceFlags::NEW_KEY,
            'A' => KeyspaceFlags::ALL,
            _ => KeyspaceFlags::empty(),
        };
    }
    flags
}

/// Which class bit (`g`/`$`/`l`/`s`/`h`/`z`/`t`/`x`/`e`) gates a given event
/// name, so callers can write `notify(db, "set", key)` without repeating
/// the class mapping at every call site.
pub fn class_flag_for_event(event: &str) -> KeyspaceFlags {
    match event {
        "expired" => KeyspaceFlags::EXPIRED,
        "evicted" => KeyspaceFlags::EVICTED,
        "del" | "rename_from" | "rename_to" | "move_from" | "move_to" | "copy_to" | "restore"
        | "expire" | "persist" => KeyspaceFlags::GENERIC,
        "lpush" | "rpush" | "lpop" | "rpop" | "linsert" | "lset" | "lrem" | "ltrim" => {
            KeyspaceFlags::LIST
        }
        "sadd" | "srem" | "spop" | "sinterstore" | "sunionstore" | "sdiffstore" => {
            KeyspaceFlags::SET
        }
        "hset" | "hdel" | "hincrby" | "hincrbyfloat" | "hexpire" | "hpersist" => {
            KeyspaceFlags::HASH
        }
        "zadd" | "zrem" | "zincrby" | "zremrangebyscore" | "zremrangebyrank" | "zremrangebylex"
        | "zpopmin" | "zpopmax" | "zdiffstore" | "zinterstore" | "zunionstore" => {
            KeyspaceFlags::ZSET
        }
        "xadd" | "xtrim" | "xdel" | "xgroup-create" | "xclaim" | "xautoclaim" | "xsetid" => {
            KeyspaceFlags::STREAM
        }
        "set" | "setrange" | "incrby" | "incrbyfloat" | "getset" | "getdel" | "append" => {
            KeyspaceFlags::STRING
        }
        _ => KeyspaceFlags::GENERIC,
    }
}

pub fn keyspace_channel(db_index: usize, key: &[u8]) -> Bytes {
    Bytes::from(format!("__keyspace@{db_index}__:{}", String::from_utf8_lossy(key)))
}

pub fn keyevent_channel(db_index: usize, event: &str) -> Bytes {
    Bytes::from(format!("__keyevent@{db_index}__:{event}"))
}
