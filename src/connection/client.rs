//! The in-process entry point: a `Client` bound to a `Server` that runs
//! commands straight through the dispatcher, no socket involved. Grounded
//! in the teacher's `ConnectionHandler`, stripped to what a test driving the
//! crate in-process needs — no framing, no TLS, no replica handoff.

use crate::connection::session::SessionState;
use crate::dispatch::{self, Command};
use crate::protocol::RespValue;
use crate::server::{ClientInfo, Server, ServerState};
use bytes::Bytes;
use std::sync::Arc;

/// A single client handle bound to a `Server`. Cloning a `Server` and
/// handing out several `Client`s against it is how tests simulate multiple
/// connections sharing state; `Client::new_isolated` gives one its own
/// private server instead.
pub struct Client {
    server: Arc<ServerState>,
    session: SessionState,
}

impl Client {
    /// Binds a new client to `server`, allocating it a fresh session id and
    /// registering it in `server.clients` the way a real connection would.
    pub fn new(server: &Server) -> Self {
        let state = server.state().clone();
        let id = state.allocate_client_id();
        let requires_auth = state.config.lock().requirepass.is_some();
        let session = SessionState::new(id, requires_auth);
        state.clients.insert(id, ClientInfo { id, name: None, db_index: session.db_index, addr: "in-process".to_string() });
        Self { server: state, session }
    }

    /// A client with its own private, unshared server — the default for
    /// tests that don't need to coordinate across connections.
    pub fn new_isolated() -> Self {
        Self::new(&Server::default())
    }

    pub fn id(&self) -> u64 {
        self.session.id
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Parses `name`/`args` into a `Command` and runs it. Parse errors are
    /// returned as `RespValue::Error`, matching what a real connection would
    /// send back over the wire instead of panicking a test.
    pub async fn execute<I, S>(&mut self, name: &str, args: I) -> RespValue
    where
        I: IntoIterator<Item = S>,
        S: Into<Bytes>,
    {
        let args: Vec<Bytes> = args.into_iter().map(Into::into).collect();
        self.execute_command(name, args).await
    }

    /// Same as `execute`, but takes the whole command line as one vector
    /// with the command name in position zero (`["SET", "k", "v"]`).
    pub async fn execute_args(&mut self, mut line: Vec<Bytes>) -> RespValue {
        if line.is_empty() {
            return RespValue::Error(crate::error::Error::Arity(String::new()).to_string());
        }
        let name = String::from_utf8_lossy(&line.remove(0)).to_ascii_uppercase();
        self.execute_command(&name, line).await
    }

    async fn execute_command(&mut self, name: &str, args: Vec<Bytes>) -> RespValue {
        if !self.server.is_connected() {
            return RespValue::Error(crate::error::Error::Connection.to_string());
        }
        let command = match dispatch::parse(&name.to_ascii_uppercase(), args) {
            Ok(c) => c,
            Err(e) => return RespValue::Error(e.to_string()),
        };
        let dispatched = self.run(command).await;
        sync_client_info(&self.server, &self.session);
        dispatched.replies.into_iter().next().unwrap_or(RespValue::ok())
    }

    /// Runs an already-parsed `Command`, for callers (e.g. replaying a
    /// captured transaction) that skip text parsing entirely.
    pub async fn execute_command_raw(&mut self, command: Command) -> dispatch::Dispatched {
        let dispatched = self.run(command).await;
        sync_client_info(&self.server, &self.session);
        dispatched
    }

    async fn run(&mut self, command: Command) -> dispatch::Dispatched {
        dispatch::dispatch(&self.server, &mut self.session, command).await
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.server.clients.remove(&self.session.id);
        self.server.blockers.remove_waiters_for_session(self.session.id);
    }
}

/// Keeps `server.clients`'s snapshot of a session's name/db in sync after a
/// command that might have changed either (`SELECT`, `CLIENT SETNAME`).
pub(super) fn sync_client_info(server: &ServerState, session: &SessionState) {
    if let Some(mut entry) = server.clients.get_mut(&session.id) {
        entry.name = session.name.clone();
        entry.db_index = session.db_index;
    }
}
