//! `DUMP`/`RESTORE` payload codec: a self-describing, tagged `bincode`
//! encoding private to this crate (no claim of RDB compatibility, per
//! spec.md §6). `Payload` is a plain-data mirror of `DataValue` — only
//! primitive/std-collection fields, so the `bincode::Encode`/`Decode`
//! derives apply without needing upstream impls for `Bytes`/`IndexMap`.
//!
//! A one-byte format version is prepended ahead of the bincode body so a
//! future format change can be detected before attempting to decode it, and
//! an unrecognized `Payload` variant tag (bincode encodes enum
//! discriminants as a leading varint) fails decoding instead of being
//! interpreted as some other shape — satisfying the "reject unknown tags on
//! untrusted input" requirement without executing anything the payload
//! names.

use crate::error::Error;
use crate::storage::{
    Consumer, ConsumerGroup, DataValue, PendingEntryInfo, SortedSet, Stream, StreamEntry, StreamId,
};
use bincode::{Decode, Encode};
use bytes::Bytes;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

const FORMAT_VERSION: u8 = 1;

type FieldPairs = Vec<(Vec<u8>, Vec<u8>)>;

#[derive(Encode, Decode)]
enum Payload {
    String(Vec<u8>),
    List(Vec<Vec<u8>>),
    Hash(FieldPairs),
    Set(Vec<Vec<u8>>),
    SortedSet(Vec<(Vec<u8>, f64)>),
    Stream(StreamPayload),
}

#[derive(Encode, Decode)]
struct StreamPayload {
    entries: Vec<((u64, u64), FieldPairs)>,
    length: u64,
    last_generated_id: (u64, u64),
    max_deleted_id: (u64, u64),
    entries_added: u64,
    groups: Vec<GroupPayload>,
    maxlen: Option<u64>,
}

#[derive(Encode, Decode)]
struct GroupPayload {
    name: Vec<u8>,
    last_delivered_id: (u64, u64),
    consumers: Vec<ConsumerPayload>,
    pending_entries: Vec<((u64, u64), PendingPayload)>,
}

#[derive(Encode, Decode)]
struct ConsumerPayload {
    name: Vec<u8>,
    seen_time_ms: u64,
    pending_ids: Vec<(u64, u64)>,
}

#[derive(Encode, Decode)]
struct PendingPayload {
    consumer_name: Vec<u8>,
    delivery_count: u64,
    delivery_time_ms: u64,
}

fn id_to_pair(id: StreamId) -> (u64, u64) {
    (id.timestamp_ms, id.sequence)
}

fn pair_to_id((timestamp_ms, sequence): (u64, u64)) -> StreamId {
    StreamId::new(timestamp_ms, sequence)
}

impl From<&DataValue> for Payload {
    fn from(data: &DataValue) -> Self {
        match data {
            DataValue::String(b) => Payload::String(b.to_vec()),
            DataValue::List(l) => Payload::List(l.iter().map(|b| b.to_vec()).collect()),
            DataValue::Hash(h) => Payload::Hash(h.iter().map(|(k, v)| (k.to_vec(), v.to_vec())).collect()),
            DataValue::Set(s) => Payload::Set(s.iter().map(|b| b.to_vec()).collect()),
            DataValue::SortedSet(z) => {
                Payload::SortedSet(z.iter().map(|e| (e.member.to_vec(), e.score)).collect())
            }
            DataValue::Stream(s) => Payload::Stream(StreamPayload {
                entries: s
                    .entries
                    .iter()
                    .map(|(id, entry)| {
                        (id_to_pair(*id), entry.fields.iter().map(|(k, v)| (k.to_vec(), v.to_vec())).collect())
                    })
                    .collect(),
                length: s.length,
                last_generated_id: id_to_pair(s.last_generated_id),
                max_deleted_id: id_to_pair(s.max_deleted_id),
                entries_added: s.entries_added,
                groups: s
                    .groups
                    .values()
                    .map(|g| GroupPayload {
                        name: g.name.to_vec(),
                        last_delivered_id: id_to_pair(g.last_delivered_id),
                        consumers: g
                            .consumers
                            .values()
                            .map(|c| ConsumerPayload {
                                name: c.name.to_vec(),
                                seen_time_ms: c.seen_time_ms,
                                pending_ids: c.pending_ids.iter().map(|id| id_to_pair(*id)).collect(),
                            })
                            .collect(),
                        pending_entries: g
                            .pending_entries
                            .iter()
                            .map(|(id, info)| {
                                (
                                    id_to_pair(*id),
                                    PendingPayload {
                                        consumer_name: info.consumer_name.to_vec(),
                                        delivery_count: info.delivery_count,
                                        delivery_time_ms: info.delivery_time_ms,
                                    },
                                )
                            })
                            .collect(),
                    })
                    .collect(),
                maxlen: s.maxlen.map(|m| m as u64),
            }),
        }
    }
}

impl From<Payload> for DataValue {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::String(b) => DataValue::String(Bytes::from(b)),
            Payload::List(items) => DataValue::List(items.into_iter().map(Bytes::from).collect::<VecDeque<_>>()),
            Payload::Hash(pairs) => {
                DataValue::Hash(pairs.into_iter().map(|(k, v)| (Bytes::from(k), Bytes::from(v))).collect::<IndexMap<_, _>>())
            }
            Payload::Set(items) => DataValue::Set(items.into_iter().map(Bytes::from).collect::<HashSet<_>>()),
            Payload::SortedSet(members) => {
                let mut z = SortedSet::new();
                for (member, score) in members {
                    z.add(score, Bytes::from(member));
                }
                DataValue::SortedSet(z)
            }
            Payload::Stream(s) => {
                let mut entries = BTreeMap::new();
                for (id_pair, fields) in s.entries {
                    let id = pair_to_id(id_pair);
                    let fields = fields.into_iter().map(|(k, v)| (Bytes::from(k), Bytes::from(v))).collect::<IndexMap<_, _>>();
                    entries.insert(id, StreamEntry { id, fields });
                }
                let groups = s
                    .groups
                    .into_iter()
                    .map(|g| {
                        let name = Bytes::from(g.name);
                        let consumers = g
                            .consumers
                            .into_iter()
                            .map(|c| {
                                let name = Bytes::from(c.name);
                                (
                                    name.clone(),
                                    Consumer {
                                        name,
                                        seen_time_ms: c.seen_time_ms,
                                        pending_ids: c.pending_ids.into_iter().map(pair_to_id).collect(),
                                    },
                                )
                            })
                            .collect::<HashMap<_, _>>();
                        let pending_entries = g
                            .pending_entries
                            .into_iter()
                            .map(|(id_pair, info)| {
                                (
                                    pair_to_id(id_pair),
                                    PendingEntryInfo {
                                        consumer_name: Bytes::from(info.consumer_name),
                                        delivery_count: info.delivery_count,
                                        delivery_time_ms: info.delivery_time_ms,
                                    },
                                )
                            })
                            .collect::<BTreeMap<_, _>>();
                        (
                            name.clone(),
                            ConsumerGroup {
                                name,
                                last_delivered_id: pair_to_id(g.last_delivered_id),
                                consumers,
                                pending_entries,
                            },
                        )
                    })
                    .collect::<HashMap<_, _>>();
                DataValue::Stream(Stream {
                    entries,
                    length: s.length,
                    last_generated_id: pair_to_id(s.last_generated_id),
                    max_deleted_id: pair_to_id(s.max_deleted_id),
                    entries_added: s.entries_added,
                    groups,
                    maxlen: s.maxlen.map(|m| m as usize),
                })
            }
        }
    }
}

/// Encodes one value into an opaque `DUMP` payload.
pub fn encode(data: &DataValue) -> Result<Bytes, Error> {
    let payload = Payload::from(data);
    let mut buf = Vec::with_capacity(64);
    buf.push(FORMAT_VERSION);
    buf.extend(bincode::encode_to_vec(&payload, bincode::config::standard())?);
    Ok(Bytes::from(buf))
}

/// Decodes a `RESTORE` payload, rejecting anything not produced by `encode`:
/// an unknown format version, a trailing byte past the encoded value, or a
/// `Payload` variant tag `bincode` doesn't recognize.
pub fn decode(bytes: &Bytes) -> Result<DataValue, Error> {
    let (&version, rest) = bytes
        .split_first()
        .ok_or_else(|| Error::InvalidState("DUMP payload version or checksum are wrong".into()))?;
    if version != FORMAT_VERSION {
        return Err(Error::InvalidState("DUMP payload version or checksum are wrong".into()));
    }
    let (payload, consumed): (Payload, usize) = bincode::decode_from_slice(rest, bincode::config::standard())?;
    if consumed != rest.len() {
        return Err(Error::InvalidState("DUMP payload version or checksum are wrong".into()));
    }
    Ok(payload.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::zset::SortedSet as Zs;

    #[test]
    fn round_trips_a_string() {
        let original = DataValue::String(Bytes::from_static(b"hello"));
        let encoded = encode(&original).unwrap();
        assert_eq!(decode(&encoded).unwrap(), original);
    }

    #[test]
    fn round_trips_a_list() {
        let original = DataValue::List(VecDeque::from([Bytes::from_static(b"a"), Bytes::from_static(b"b")]));
        let encoded = encode(&original).unwrap();
        assert_eq!(decode(&encoded).unwrap(), original);
    }

    #[test]
    fn round_trips_a_sorted_set() {
        let mut z = Zs::new();
        z.add(1.5, Bytes::from_static(b"one"));
        z.add(2.5, Bytes::from_static(b"two"));
        let original = DataValue::SortedSet(z);
        let encoded = encode(&original).unwrap();
        assert_eq!(decode(&encoded).unwrap(), original);
    }

    #[test]
    fn rejects_wrong_format_version() {
        let mut encoded = encode(&DataValue::String(Bytes::from_static(b"x"))).unwrap().to_vec();
        encoded[0] = 0xFF;
        assert!(decode(&Bytes::from(encoded)).is_err());
    }

    #[test]
    fn rejects_empty_payload() {
        assert!(decode(&Bytes::new()).is_err());
    }

    #[test]
    fn rejects_truncated_payload() {
        let mut encoded = encode(&DataValue::List(VecDeque::from([Bytes::from_static(b"a")]))).unwrap().to_vec();
        encoded.truncate(encoded.len() - 1);
        assert!(decode(&Bytes::from(encoded)).is_err());
    }
}
