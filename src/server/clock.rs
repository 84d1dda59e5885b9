//! The injectable wall clock. Every dispatched command reads the time
//! exactly once through this trait, so tests can pin or fast-forward time
//! deterministically instead of racing the real clock (spec.md's "simulated
//! clock" design note).

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default)]
pub struct RealClock;

impl Clock for RealClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_millis() as u64
    }
}

/// A clock under explicit test control: starts at a fixed instant and only
/// advances when told to, via `set` or `advance`.
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self { now_ms: AtomicU64::new(start_ms) }
    }

    pub fn set(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// A handle swappable between `RealClock` and `ManualClock`, so a running
/// `Server` can flip into deterministic-time mode for a test harness.
#[derive(Debug, Clone)]
pub struct SharedClock(Arc<Mutex<Arc<dyn Clock>>>);

impl SharedClock {
    pub fn real() -> Self {
        Self(Arc::new(Mutex::new(Arc::new(RealClock))))
    }

    pub fn set_clock(&self, clock: Arc<dyn Clock>) {
        *self.0.lock() = clock;
    }

    pub fn now_ms(&self) -> u64 {
        self.0.lock().now_ms()
    }
}

impl Default for SharedClock {
    fn default() -> Self {
        Self::real()
    }
}
