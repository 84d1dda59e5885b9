//! Per-connection `MULTI`/`WATCH` bookkeeping. Lives on the session rather
//! than the database, since a transaction is scoped to one client.

use crate::dispatch::Command;
use bytes::Bytes;
use std::collections::HashMap;

/// The state of an ongoing transaction for one session: the queue of
/// commands accumulated between `MULTI` and `EXEC`, and the set of watched
/// keys with the key version observed at `WATCH` time (`None` if the key
/// didn't exist yet).
#[derive(Debug, Default, Clone)]
pub struct TransactionState {
    pub commands: Vec<Command>,
    pub watched_keys: HashMap<(usize, Bytes), Option<u64>>,
    pub in_transaction: bool,
    /// Set when a command failed to parse/queue (e.g. unknown command or
    /// wrong arity) during `MULTI`; forces `EXEC` to fail with `EXECABORT`
    /// without running any queued command.
    pub has_error: bool,
}

impl TransactionState {
    pub fn start(&mut self) {
        self.commands.clear();
        self.has_error = false;
        self.in_transaction = true;
    }

    pub fn queue(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn reset(&mut self) {
        *self = TransactionState::default();
    }
}
