//! `StoredValue`/`DataValue`: the tagged-union payload kept per key, plus the
//! expiry and optimistic-locking metadata that rides alongside it.

use super::stream::Stream;
use super::zset::SortedSet;
use bytes::Bytes;
use indexmap::IndexMap;
use std::collections::{HashSet, VecDeque};

/// A hard cap on a single string value, mirroring Redis's `proto-max-bulk-len`.
pub const MAX_STRING_SIZE: usize = 512 * 1024 * 1024;

/// One key's value plus the metadata the rest of the engine needs: an
/// absolute expiry (milliseconds since the Unix epoch, per the injectable
/// `Clock`) and a monotonically increasing `version` that `WATCH` snapshots
/// and `EXEC` re-checks.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    pub data: DataValue,
    pub expire_at_ms: Option<u64>,
    pub version: u64,
}

impl StoredValue {
    pub fn new(data: DataValue) -> Self {
        Self { data, expire_at_ms: None, version: 1 }
    }

    pub fn with_ttl(data: DataValue, expire_at_ms: u64) -> Self {
        Self { data, expire_at_ms: Some(expire_at_ms), version: 1 }
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.expire_at_ms.is_some_and(|exp| exp <= now_ms)
    }

    pub fn remaining_ttl_ms(&self, now_ms: u64) -> Option<i64> {
        self.expire_at_ms.map(|exp| exp.saturating_sub(now_ms) as i64)
    }

    pub fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    pub fn type_name(&self) -> &'static str {
        self.data.type_name()
    }

    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>() + self.data.memory_usage()
    }
}

/// The value kinds the database can hold for a key. Every command validates
/// the stored variant matches what it expects and returns `WRONGTYPE`
/// otherwise (see `crate::error::Error::WrongType`).
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    String(Bytes),
    List(VecDeque<Bytes>),
    Hash(IndexMap<Bytes, Bytes>),
    /// Also backs `PFADD`/`PFCOUNT`/`PFMERGE`: cardinality is reported exactly
    /// rather than via a HyperLogLog sketch.
    Set(HashSet<Bytes>),
    SortedSet(SortedSet),
    Stream(Stream),
}

impl DataValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            DataValue::String(_) => "string",
            DataValue::List(_) => "list",
            DataValue::Hash(_) => "hash",
            DataValue::Set(_) => "set",
            DataValue::SortedSet(_) => "zset",
            DataValue::Stream(_) => "stream",
        }
    }

    pub fn memory_usage(&self) -> usize {
        match self {
            DataValue::String(b) => b.len(),
            DataValue::List(l) => l.iter().map(|b| b.len()).sum(),
            DataValue::Hash(h) => h.iter().map(|(k, v)| k.len() + v.len()).sum(),
            DataValue::Set(s) => s.iter().map(|b| b.len()).sum(),
            DataValue::SortedSet(z) => z.memory_usage(),
            DataValue::Stream(s) => s.memory_usage(),
        }
    }

    pub fn is_empty_collection(&self) -> bool {
        match self {
            DataValue::String(_) => false,
            DataValue::List(l) => l.is_empty(),
            DataValue::Hash(h) => h.is_empty(),
            DataValue::Set(s) => s.is_empty(),
            DataValue::SortedSet(z) => z.is_empty(),
            DataValue::Stream(_) => false,
        }
    }
}
