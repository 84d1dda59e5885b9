//! A single logical keyspace. `Database` itself holds no lock: it is only
//! ever touched while the server's single execution mutex
//! (`ServerState::databases`) is held, per the "single logical executor"
//! concurrency model.

pub mod transaction;

use crate::storage::{DataValue, StoredValue};
use bytes::Bytes;
use std::cell::RefCell;
use std::collections::HashMap;
use wildmatch::WildMatch;

pub use transaction::TransactionState;

/// A cursor-based `SCAN` is tolerant of keys added/removed mid-scan
/// (spec.md §9); we encode a plain offset into the snapshot-at-call-time
/// key list rather than a stable hash-bucket cursor, since a single
/// `HashMap` has no shard structure to encode a cursor against.
pub type ScanCursor = u64;

#[derive(Debug, Default)]
pub struct Database {
    pub entries: HashMap<Bytes, StoredValue>,
    /// Per-field expirations for hash keys (`HEXPIRE`/`HPERSIST`/`HTTL`),
    /// kept out of `DataValue::Hash` itself so plain hash operations don't
    /// pay for a feature most hashes never use.
    pub hash_field_ttls: HashMap<Bytes, HashMap<Bytes, u64>>,
    /// Keys discovered expired by a lazy `get`/`get_mut` since the last
    /// drain, queued here rather than notified inline because neither
    /// method has a `Ctx`/`ServerState` to call `notify` through. Drained
    /// by `commands::execute` and by the blocking command helpers in
    /// `dispatch::router`, mirroring `Server::run_active_expiry_cycle`'s
    /// sweep-then-notify pattern for the active-expiry path.
    pending_expired: RefCell<Vec<Bytes>>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a key, treating it as absent if expired. Does not remove
    /// the expired entry (lazy expiry removal happens on write paths or the
    /// active sweep; see `Server::run_active_expiry_cycle`), but queues an
    /// `expired` notification for it via `note_expired`, same as the active
    /// sweep does when it removes the key outright.
    pub fn get(&self, key: &[u8], now_ms: u64) -> Option<&StoredValue> {
        match self.entries.get(key) {
            Some(v) if v.is_expired_at(now_ms) => {
                self.note_expired(key);
                None
            }
            other => other,
        }
    }

    pub fn get_mut(&mut self, key: &[u8], now_ms: u64) -> Option<&mut StoredValue> {
        if self.entries.get(key).is_some_and(|v| v.is_expired_at(now_ms)) {
            self.entries.remove(key);
            self.hash_field_ttls.remove(key);
            self.note_expired(key);
            return None;
        }
        self.entries.get_mut(key)
    }

    /// Queues `key` for an `expired` keyspace notification, deduplicating
    /// against anything already queued and not yet drained. Shared by
    /// `get` and `get_mut` so both lazy-expiry paths notify exactly like
    /// `Server::run_active_expiry_cycle`'s sweep does.
    fn note_expired(&self, key: &[u8]) {
        let mut pending = self.pending_expired.borrow_mut();
        if !pending.iter().any(|k| k.as_ref() == key) {
            pending.push(Bytes::copy_from_slice(key));
        }
    }

    /// Drains the keys queued by lazy expiry since the last drain. The
    /// caller is expected to fire an `expired` notification for each.
    pub fn take_expired(&self) -> Vec<Bytes> {
        self.pending_expired.borrow_mut().drain(..).collect()
    }

    /// Removes a key if present (expired or not). Returns whether it existed
    /// (post-expiry-check) prior to removal.
    pub fn remove(&mut self, key: &[u8], now_ms: u64) -> Option<StoredValue> {
        self.hash_field_ttls.remove(key);
        match self.entries.remove(key) {
            Some(v) if !v.is_expired_at(now_ms) => Some(v),
            _ => None,
        }
    }

    pub fn contains(&self, key: &[u8], now_ms: u64) -> bool {
        self.get(key, now_ms).is_some()
    }

    pub fn set(&mut self, key: Bytes, data: DataValue) {
        let version = self.entries.get(&key).map(|v| v.version + 1).unwrap_or(1);
        self.hash_field_ttls.remove(&key);
        self.entries.insert(key, StoredValue { data, expire_at_ms: None, version });
    }

    pub fn set_with_ttl(&mut self, key: Bytes, data: DataValue, expire_at_ms: Option<u64>) {
        let version = self.entries.get(&key).map(|v| v.version + 1).unwrap_or(1);
        self.hash_field_ttls.remove(&key);
        self.entries.insert(key, StoredValue { data, expire_at_ms, version });
    }

    /// Bumps a key's `version` without changing its data, the way every
    /// write path must so a concurrent `WATCH` observes the change.
    pub fn touch_version(&mut self, key: &[u8]) {
        if let Some(v) = self.entries.get_mut(key) {
            v.bump_version();
        }
    }

    pub fn version_of(&self, key: &[u8], now_ms: u64) -> Option<u64> {
        self.get(key, now_ms).map(|v| v.version)
    }

    /// Sweeps every expired key out of the database. Returns the count
    /// removed. The in-process API exposes this via
    /// `Server::run_active_expiry_cycle` rather than running it on a timer,
    /// so clock-controlled tests stay deterministic.
    pub fn sweep_expired(&mut self, now_ms: u64) -> Vec<Bytes> {
        let expired: Vec<Bytes> = self
            .entries
            .iter()
            .filter(|(_, v)| v.is_expired_at(now_ms))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.entries.remove(key);
            self.hash_field_ttls.remove(key);
        }
        expired
    }

    pub fn flush(&mut self) {
        self.entries.clear();
        self.hash_field_ttls.clear();
    }

    pub fn keys_matching(&self, pattern: &str, now_ms: u64) -> Vec<Bytes> {
        let matcher = WildMatch::new(pattern);
        self.entries
            .iter()
            .filter(|(_, v)| !v.is_expired_at(now_ms))
            .filter(|(k, _)| matcher.matches(&String::from_utf8_lossy(k)))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// A `SCAN` step: snapshots live (non-expired) keys, starts at `cursor`,
    /// and returns up to `count` of them plus the next cursor (`0` once
    /// exhausted). See `ScanCursor`'s doc comment for why this is an offset
    /// rather than a bucket-encoded cursor.
    pub fn scan(
        &self,
        cursor: ScanCursor,
        count: usize,
        pattern: Option<&str>,
        type_filter: Option<&str>,
        now_ms: u64,
    ) -> (ScanCursor, Vec<Bytes>) {
        let mut all: Vec<&Bytes> = self.entries.keys().collect();
        all.sort();
        let matcher = pattern.map(WildMatch::new);
        let start = cursor as usize;
        let mut out = Vec::new();
        let mut i = start;
        while i < all.len() && out.len() < count.max(1) {
            let key = all[i];
            i += 1;
            let Some(stored) = self.entries.get(key) else { continue };
            if stored.is_expired_at(now_ms) {
                continue;
            }
            if let Some(m) = &matcher {
                if !m.matches(&String::from_utf8_lossy(key)) {
                    continue;
                }
            }
            if let Some(t) = type_filter {
                if stored.type_name() != t {
                    continue;
                }
            }
            out.push(key.clone());
        }
        let next_cursor = if i >= all.len() { 0 } else { i as ScanCursor };
        (next_cursor, out)
    }

    pub fn random_key(&self, now_ms: u64) -> Option<Bytes> {
        use rand::seq::IteratorRandom;
        let mut rng = rand::thread_rng();
        self.entries
            .iter()
            .filter(|(_, v)| !v.is_expired_at(now_ms))
            .map(|(k, _)| k.clone())
            .choose(&mut rng)
    }
}
