//! Append-only stream data structure backing `XADD`/`XRANGE`/consumer groups.

use bytes::Bytes;
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Default)]
pub struct StreamId {
    pub timestamp_ms: u64,
    pub sequence: u64,
}

impl StreamId {
    pub const MIN: StreamId = StreamId { timestamp_ms: 0, sequence: 0 };
    pub const MAX: StreamId = StreamId { timestamp_ms: u64::MAX, sequence: u64::MAX };

    pub fn new(timestamp_ms: u64, sequence: u64) -> Self {
        Self { timestamp_ms, sequence }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct StreamIdParseError(pub &'static str);

impl fmt::Display for StreamIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StreamId {
    type Err = StreamIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "-" {
            return Ok(StreamId::MIN);
        }
        if s == "+" {
            return Ok(StreamId::MAX);
        }
        let parts: Vec<&str> = s.split('-').collect();
        match parts.len() {
            1 => {
                let timestamp_ms = parts[0].parse().map_err(|_| StreamIdParseError("Invalid timestamp"))?;
                Ok(StreamId::new(timestamp_ms, 0))
            }
            2 => {
                let timestamp_ms = parts[0].parse().map_err(|_| StreamIdParseError("Invalid timestamp"))?;
                let sequence = parts[1].parse().map_err(|_| StreamIdParseError("Invalid sequence"))?;
                Ok(StreamId::new(timestamp_ms, sequence))
            }
            _ => Err(StreamIdParseError("Invalid stream ID format")),
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.timestamp_ms, self.sequence)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    pub id: StreamId,
    pub fields: IndexMap<Bytes, Bytes>,
}

impl StreamEntry {
    pub fn memory_usage(&self) -> usize {
        self.fields.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntryInfo {
    pub consumer_name: Bytes,
    pub delivery_count: u64,
    pub delivery_time_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Consumer {
    pub name: Bytes,
    pub seen_time_ms: u64,
    pub pending_ids: BTreeSet<StreamId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerGroup {
    pub name: Bytes,
    pub last_delivered_id: StreamId,
    pub consumers: HashMap<Bytes, Consumer>,
    pub pending_entries: BTreeMap<StreamId, PendingEntryInfo>,
}

impl ConsumerGroup {
    pub fn new(name: Bytes, start_id: StreamId) -> Self {
        Self {
            name,
            last_delivered_id: start_id,
            consumers: HashMap::new(),
            pending_entries: BTreeMap::new(),
        }
    }
}

/// Entries are kept in a `BTreeMap` keyed by `StreamId` so range scans
/// (`XRANGE`) and trimming from the head are both direct tree operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub entries: BTreeMap<StreamId, StreamEntry>,
    pub length: u64,
    pub last_generated_id: StreamId,
    pub max_deleted_id: StreamId,
    pub entries_added: u64,
    pub groups: HashMap<Bytes, ConsumerGroup>,
    pub maxlen: Option<usize>,
}

impl Default for Stream {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            length: 0,
            last_generated_id: StreamId::default(),
            max_deleted_id: StreamId::default(),
            entries_added: 0,
            groups: HashMap::new(),
            maxlen: None,
        }
    }
}

impl Stream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Auto-generates an ID from the wall clock when `id_spec` is `None`,
    /// bumping the sequence if two entries land in the same millisecond.
    pub fn add_entry(
        &mut self,
        id_spec: Option<StreamId>,
        fields: IndexMap<Bytes, Bytes>,
    ) -> Result<StreamId, &'static str> {
        let new_id = match id_spec {
            Some(id) => {
                if id == StreamId::MIN {
                    return Err("ERR The ID specified in XADD must be greater than 0-0");
                }
                if id <= self.last_generated_id && self.entries_added > 0 {
                    return Err(
                        "ERR The ID specified in XADD is equal or smaller than the target stream top item",
                    );
                }
                id
            }
            None => {
                let mut timestamp_ms =
                    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as u64;
                if timestamp_ms <= self.last_generated_id.timestamp_ms {
                    timestamp_ms = self.last_generated_id.timestamp_ms;
                }
                let sequence = if timestamp_ms == self.last_generated_id.timestamp_ms {
                    self.last_generated_id.sequence + 1
                } else {
                    0
                };
                StreamId::new(timestamp_ms, sequence)
            }
        };

        self.entries.insert(new_id, StreamEntry { id: new_id, fields });
        self.last_generated_id = new_id;
        self.length += 1;
        self.entries_added += 1;
        Ok(new_id)
    }

    pub fn trim_to_maxlen(&mut self, maxlen: usize) -> usize {
        let mut removed = 0;
        while self.length as usize > maxlen {
            if let Some(&id) = self.entries.keys().next() {
                self.entries.remove(&id);
                self.length -= 1;
                if id > self.max_deleted_id {
                    self.max_deleted_id = id;
                }
                removed += 1;
            } else {
                break;
            }
        }
        removed
    }

    pub fn trim_before(&mut self, min_id: StreamId) -> usize {
        let to_remove: Vec<StreamId> =
            self.entries.range(..min_id).map(|(id, _)| *id).collect();
        for id in &to_remove {
            self.entries.remove(id);
            self.length -= 1;
            if *id > self.max_deleted_id {
                self.max_deleted_id = *id;
            }
        }
        to_remove.len()
    }

    pub fn delete(&mut self, ids: &[StreamId]) -> usize {
        let mut deleted = 0;
        for id in ids {
            if self.entries.remove(id).is_some() {
                deleted += 1;
                self.length -= 1;
                if *id > self.max_deleted_id {
                    self.max_deleted_id = *id;
                }
            }
        }
        deleted
    }

    pub fn memory_usage(&self) -> usize {
        let entries_mem: usize = self.entries.values().map(|e| e.memory_usage()).sum();
        let groups_mem: usize = self
            .groups
            .values()
            .map(|g| {
                let consumers_mem: usize = g
                    .consumers
                    .values()
                    .map(|c| c.name.len() + c.pending_ids.len() * std::mem::size_of::<StreamId>())
                    .sum();
                g.name.len()
                    + consumers_mem
                    + g.pending_entries.len()
                        * (std::mem::size_of::<StreamId>() + std::mem::size_of::<PendingEntryInfo>())
            })
            .sum();
        entries_mem + groups_mem
    }
}
