//! Server-wide state: the single execution lock over every database, plus
//! the shared registries (pub/sub, blocking, scripts) a connection needs.
//! Grounded in the shape of the teacher's `core/state/core.rs::ServerState`,
//! trimmed to the single-process, single-lock model (see SPEC_FULL.md §6).

pub mod clock;
pub mod config;

use crate::blocking::BlockerManager;
use crate::database::Database;
use crate::dispatch::Command;
use crate::error::Error;
use crate::pubsub::PubSubManager;
use bytes::Bytes;
use clock::SharedClock;
pub use config::Config;
use dashmap::DashMap;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// Embedders supply a `ScriptEvaluator` to back `EVAL`/`EVALSHA`; the crate
/// never embeds an interpreter itself (spec.md's explicit Non-goal). The
/// default `NoScriptingConfigured` fails closed.
pub trait ScriptEvaluator: Send + Sync + std::fmt::Debug {
    fn eval(&self, script: &[u8], keys: &[Bytes], argv: &[Bytes]) -> Result<crate::protocol::RespValue, Error>;
}

#[derive(Debug, Default)]
pub struct NoScriptingConfigured;

impl ScriptEvaluator for NoScriptingConfigured {
    fn eval(&self, _script: &[u8], _keys: &[Bytes], _argv: &[Bytes]) -> Result<crate::protocol::RespValue, Error> {
        Err(Error::Internal("no ScriptEvaluator configured for this server".into()))
    }
}

#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub id: u64,
    pub name: Option<Bytes>,
    pub db_index: usize,
    pub addr: String,
}

/// Everything shared across every connection to one logical server
/// instance. `databases` is the single execution lock: every command holds
/// it for the duration of its own execution, and blocking commands release
/// it between poll attempts (see `dispatch::router`).
#[derive(Debug)]
pub struct ServerState {
    pub databases: AsyncMutex<Vec<Database>>,
    pub pubsub: PubSubManager,
    pub blockers: BlockerManager,
    pub scripts: SyncMutex<HashMap<String, Bytes>>,
    pub clock: SharedClock,
    pub connected: AtomicBool,
    pub config: SyncMutex<Config>,
    pub clients: DashMap<u64, ClientInfo>,
    pub scripting: Arc<dyn ScriptEvaluator>,
    next_client_id: AtomicU64,
}

impl ServerState {
    pub fn new(config: Config) -> Arc<Self> {
        let databases = (0..config.databases.max(1)).map(|_| Database::new()).collect();
        Arc::new(Self {
            databases: AsyncMutex::new(databases),
            pubsub: PubSubManager::new(),
            blockers: BlockerManager::new(),
            scripts: SyncMutex::new(HashMap::new()),
            clock: SharedClock::real(),
            connected: AtomicBool::new(true),
            config: SyncMutex::new(config),
            clients: DashMap::new(),
            scripting: Arc::new(NoScriptingConfigured),
            next_client_id: AtomicU64::new(1),
        })
    }

    pub fn allocate_client_id(&self) -> u64 {
        self.next_client_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn set_clock(&self, clock: Arc<dyn clock::Clock>) {
        self.clock.set_clock(clock);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn set_scripting(&mut self, evaluator: Arc<dyn ScriptEvaluator>) {
        self.scripting = evaluator;
    }

    /// Clears every database. Used by `FLUSHALL` and the public
    /// `flush_all()` test helper alike.
    pub async fn flush_all(&self) {
        let mut dbs = self.databases.lock().await;
        for db in dbs.iter_mut() {
            db.flush();
        }
    }

    /// Seeds `key -> value` as a plain string in database 0, bypassing
    /// command dispatch. Intended for test setup.
    pub async fn seed_string(&self, key: impl Into<Bytes>, value: impl Into<Bytes>) {
        let mut dbs = self.databases.lock().await;
        dbs[0].set(key.into(), crate::storage::DataValue::String(value.into()));
    }

    /// Sweeps expired keys out of every database. The in-process API exposes
    /// this as an explicit step (rather than a timer) so tests using
    /// `ManualClock` stay deterministic; a long-lived embedder may also call
    /// this on an interval.
    pub async fn run_active_expiry_cycle(&self) -> usize {
        let now_ms = self.clock.now_ms();
        let mut dbs = self.databases.lock().await;
        let mut total = 0;
        for (idx, db) in dbs.iter_mut().enumerate() {
            let expired = db.sweep_expired(now_ms);
            for key in &expired {
                self.notify(idx, "expired", key);
            }
            total += expired.len();
        }
        total
    }

    /// Emits a keyspace/keyevent notification pair if the configured
    /// `notify-keyspace-events` mask enables this event's class.
    pub fn notify(&self, db_index: usize, event: &str, key: &[u8]) {
        let mask = crate::pubsub::parse_notify_flags(&self.config.lock().notify_keyspace_events);
        if mask.is_empty() {
            return;
        }
        let class = crate::pubsub::class_flag_for_event(event);
        if !mask.intersects(class) {
            return;
        }
        let key = Bytes::copy_from_slice(key);
        if mask.contains(crate::pubsub::KeyspaceFlags::KEYSPACE) {
            self.pubsub.publish(&crate::pubsub::keyspace_channel(db_index, &key), Bytes::copy_from_slice(event.as_bytes()));
        }
        if mask.contains(crate::pubsub::KeyspaceFlags::KEYEVENT) {
            self.pubsub.publish(&crate::pubsub::keyevent_channel(db_index, event), key);
        }
    }
}

/// A thin, cloneable handle around `Arc<ServerState>`, mirroring the
/// teacher's top-level `Server` entry point (spec.md §6's "in-process API").
#[derive(Debug, Clone)]
pub struct Server(pub Arc<ServerState>);

impl Server {
    pub fn new(config: Config) -> Self {
        Self(ServerState::new(config))
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.0
    }

    pub fn set_clock(&self, clock: Arc<dyn clock::Clock>) {
        self.0.set_clock(clock);
    }

    pub fn set_connected(&self, connected: bool) {
        self.0.set_connected(connected);
    }

    pub async fn flush_all(&self) {
        self.0.flush_all().await;
    }

    pub async fn seed_string(&self, key: impl Into<Bytes>, value: impl Into<Bytes>) {
        self.0.seed_string(key, value).await;
    }

    pub async fn run_active_expiry_cycle(&self) -> usize {
        self.0.run_active_expiry_cycle().await
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Re-exported so callers constructing a transaction replay don't need to
/// reach into `dispatch` directly.
pub type ReplayCommand = Command;
