//! Coordinates `BLPOP`/`BRPOP`/`BLMOVE`/`BZPOPMIN`/`BZPOPMAX`: a FIFO waiter
//! queue per `(db_index, key)`. Grounded in the teacher's `core/blocking.rs`
//! `BlockerManager`, with the cluster-slot-migration polling path dropped
//! (out of scope here).
//!
//! Callers must register a waiter *before* releasing the execution lock
//! that makes the key's absence visible, or a push between the check and
//! the registration would be missed (`orchestrate_blocking_pop` in the
//! teacher follows this same ordering).

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::oneshot;

/// A single blocked waiter's wakeup channel. Shared (`Arc`) across every key
/// a multi-key `BLPOP` registered on, so whichever key gets pushed to first
/// wins and the others become stale no-ops.
pub type SharedWaker = Arc<Mutex<Option<oneshot::Sender<()>>>>;

struct WaiterInfo {
    #[allow(dead_code)]
    session_id: u64,
    waker: SharedWaker,
}

#[derive(Default)]
pub struct BlockerManager {
    waiters: DashMap<(usize, Bytes), VecDeque<WaiterInfo>>,
}

impl BlockerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one waiter across every key in `keys`, returning the
    /// receiver to await and the shared waker handle (needed to cancel
    /// registration on timeout or connection drop).
    pub fn register(&self, db_index: usize, keys: &[Bytes], session_id: u64) -> (oneshot::Receiver<()>, SharedWaker) {
        let (tx, rx) = oneshot::channel();
        let waker: SharedWaker = Arc::new(Mutex::new(Some(tx)));
        for key in keys {
            self.waiters
                .entry((db_index, key.clone()))
                .or_default()
                .push_back(WaiterInfo { session_id, waker: waker.clone() });
        }
        (rx, waker)
    }

    /// Wakes the oldest still-live waiter on `key`, if any. Returns whether
    /// a waiter was actually woken (a waiter may already have been consumed
    /// by a different key in its multi-key registration).
    pub fn notify_one(&self, db_index: usize, key: &Bytes) -> bool {
        let Some(mut queue) = self.waiters.get_mut(&(db_index, key.clone())) else {
            return false;
        };
        while let Some(w) = queue.pop_front() {
            let mut guard = w.waker.lock();
            if let Some(tx) = guard.take() {
                drop(guard);
                if tx.send(()).is_ok() {
                    tracing::debug!(db_index, key = %String::from_utf8_lossy(key), "woke a blocked waiter");
                    return true;
                }
            }
        }
        false
    }

    /// Removes a specific waiter's registration from every key it was
    /// registered under. Called after a wakeup (success or timeout) and on
    /// connection close / `RESET`.
    pub fn remove_waiter(&self, db_index: usize, keys: &[Bytes], waker: &SharedWaker) {
        for key in keys {
            if let Some(mut queue) = self.waiters.get_mut(&(db_index, key.clone())) {
                queue.retain(|w| !Arc::ptr_eq(&w.waker, waker));
            }
        }
    }

    /// Cancels every waiter belonging to `session_id`, e.g. on connection
    /// close, by taking (and dropping, without sending) each matching
    /// waker so the blocked task's `await` resolves to a closed channel.
    pub fn remove_waiters_for_session(&self, session_id: u64) {
        for mut entry in self.waiters.iter_mut() {
            entry.value_mut().retain(|w| {
                if w.session_id == session_id {
                    w.waker.lock().take();
                    false
                } else {
                    true
                }
            });
        }
    }
}
