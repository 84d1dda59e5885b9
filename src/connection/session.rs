//! Per-connection state, mirroring the shape of the teacher's
//! `connection/session.rs::SessionState`.

use crate::database::TransactionState;
use bytes::Bytes;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: u64,
    pub name: Option<Bytes>,
    pub db_index: usize,
    pub is_authenticated: bool,
    pub protocol_version: u8,
    pub tx: TransactionState,
    pub subscribed_channels: HashSet<Bytes>,
    pub subscribed_patterns: HashSet<Bytes>,
    pub subscribed_shard_channels: HashSet<Bytes>,
}

impl SessionState {
    pub fn new(id: u64, requires_auth: bool) -> Self {
        Self {
            id,
            name: None,
            db_index: 0,
            is_authenticated: !requires_auth,
            protocol_version: 2,
            tx: TransactionState::default(),
            subscribed_channels: HashSet::new(),
            subscribed_patterns: HashSet::new(),
            subscribed_shard_channels: HashSet::new(),
        }
    }

    pub fn is_subscribed(&self) -> bool {
        !self.subscribed_channels.is_empty()
            || !self.subscribed_patterns.is_empty()
            || !self.subscribed_shard_channels.is_empty()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscribed_channels.len() + self.subscribed_patterns.len() + self.subscribed_shard_channels.len()
    }

    /// Resets everything `RESET` is documented to clear: subscriptions,
    /// transaction/watch state, and selected db — but not the connection's
    /// identity or auth state (`id`/`name`/`is_authenticated` survive; a
    /// connection that already authenticated does not need to again).
    pub fn reset(&mut self) {
        self.db_index = 0;
        self.tx.reset();
        self.subscribed_channels.clear();
        self.subscribed_patterns.clear();
        self.subscribed_shard_channels.clear();
    }
}
