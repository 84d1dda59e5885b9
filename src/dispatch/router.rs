//! The dispatch pipeline: takes one parsed `Command` for one connection and
//! decides how to run it. Most commands go straight to `commands::execute`
//! under the database lock; a handful of command families need more context
//! than that single call can see, so they are handled here instead:
//!
//! - `AUTH`/`HELLO`/`SELECT`/`SWAPDB` touch connection or multi-database
//!   state that `commands::execute` has no access to.
//! - `MULTI`/`EXEC`/`DISCARD`/`WATCH`/`UNWATCH` and the command-queueing that
//!   happens between `MULTI` and `EXEC` are session-level, not single-command.
//! - The `SUBSCRIBE` family hands back new `broadcast::Receiver`s for the
//!   connection task to fold into its event loop; building those replies is
//!   cheap and synchronous (`commands::pubsub`), but owning the receivers
//!   themselves is the connection's job, not the router's.
//! - The blocking families (`BLPOP`/`BRPOP`/`BLMOVE`/`BRPOPLPUSH`/
//!   `BZPOPMIN`/`BZPOPMAX`, and `XREAD`/`XREADGROUP` with `BLOCK`) must
//!   release the database lock while waiting, which `commands::execute`
//!   cannot do from inside a single call.
//!
//! Grounded in the teacher's `dispatch/router.rs` request/response loop, with
//! the keyspace-notification and replication hooks that don't apply here
//! (single in-process instance, no replica stream) dropped.

use crate::commands::{self, pubsub as pubsub_cmds, transaction as tx_cmds, Ctx};
use crate::connection::session::SessionState;
use crate::database::Database;
use crate::dispatch::Command;
use crate::error::Error;
use crate::protocol::RespValue;
use crate::pubsub::PMessage;
use crate::server::ServerState;
use bytes::Bytes;
use tokio::sync::broadcast;
use tokio::time::Duration;
use tracing::Instrument;

/// A freshly established subscription the connection task must start
/// polling alongside its socket reads.
pub enum NewSubscription {
    Channel(Bytes, broadcast::Receiver<Bytes>),
    Pattern(Bytes, broadcast::Receiver<PMessage>),
    Shard(Bytes, broadcast::Receiver<Bytes>),
}

/// Everything the connection task needs to act on after one `dispatch` call.
#[derive(Default)]
pub struct Dispatched {
    pub replies: Vec<RespValue>,
    pub new_subscriptions: Vec<NewSubscription>,
    pub should_close: bool,
}

impl Dispatched {
    fn one(reply: RespValue) -> Self {
        Self { replies: vec![reply], ..Default::default() }
    }

    fn many(replies: Vec<RespValue>) -> Self {
        Self { replies, ..Default::default() }
    }
}

fn err_reply(e: Error) -> RespValue {
    RespValue::Error(e.to_string())
}

/// The leading variant name out of `Command`'s `Debug` output (e.g. `"Get"`
/// for `Get { key: .. }`), cheap enough to compute on every dispatch and
/// good enough for a span label — a full `name()` match over the roster
/// would just duplicate `#[derive(Debug)]`.
fn command_name(command: &Command) -> String {
    format!("{command:?}").split(|c: char| !c.is_alphanumeric()).next().unwrap_or_default().to_string()
}

/// Runs one command for one connection. `session` is the caller's
/// per-connection state; `server` is the shared instance it belongs to.
/// Wraps the whole dispatch in a `command` span so embedders correlating
/// logs can see every handler call this command made underneath it.
pub async fn dispatch(server: &ServerState, session: &mut SessionState, command: Command) -> Dispatched {
    let span = tracing::info_span!("command", name = %command_name(&command));
    dispatch_inner(server, session, command).instrument(span).await
}

async fn dispatch_inner(server: &ServerState, session: &mut SessionState, command: Command) -> Dispatched {
    use Command::*;

    if !session.is_authenticated && !matches!(command, Auth { .. } | Hello { .. } | Quit | Reset) {
        return Dispatched::one(err_reply(Error::AuthRequired));
    }

    if session.is_subscribed()
        && !matches!(
            command,
            Subscribe { .. }
                | Unsubscribe { .. }
                | PSubscribe { .. }
                | PUnsubscribe { .. }
                | SSubscribe { .. }
                | SUnsubscribe { .. }
                | Ping { .. }
                | Quit
                | Reset
        )
    {
        return Dispatched::one(err_reply(Error::InvalidState(
            "Can't execute this command while subscribed to channels in this context".into(),
        )));
    }

    if session.tx.in_transaction
        && !matches!(command, Multi | Exec | Discard | Watch { .. } | Unwatch | Quit | Reset)
    {
        tx_cmds::queue(session, command);
        return Dispatched::one(RespValue::SimpleString("QUEUED".to_string()));
    }

    match command {
        Auth { username, password } => Dispatched::one(handle_auth(server, session, username, password)),
        Hello { protover, auth, setname } => Dispatched::one(handle_hello(server, session, protover, auth, setname)),

        Select { index } => {
            let dbs = server.databases.lock().await;
            if index >= dbs.len() {
                Dispatched::one(err_reply(Error::Range("DB index is out of range".into())))
            } else {
                session.db_index = index;
                Dispatched::one(RespValue::ok())
            }
        }
        SwapDb { a, b } => {
            let mut dbs = server.databases.lock().await;
            if a >= dbs.len() || b >= dbs.len() {
                Dispatched::one(err_reply(Error::Range("DB index is out of range".into())))
            } else {
                dbs.swap(a, b);
                Dispatched::one(RespValue::ok())
            }
        }

        Multi => Dispatched::one(tx_cmds::multi(session).unwrap_or_else(err_reply)),
        Discard => Dispatched::one(tx_cmds::discard(session).unwrap_or_else(err_reply)),
        Unwatch => Dispatched::one(tx_cmds::unwatch(session)),
        Watch { keys } => {
            let dbs = server.databases.lock().await;
            let now_ms = server.clock.now_ms();
            let db_index = session.db_index;
            let reply = tx_cmds::watch(session, &dbs[db_index], db_index, &keys, now_ms).unwrap_or_else(err_reply);
            Dispatched::one(reply)
        }
        Exec => {
            let mut dbs = server.databases.lock().await;
            let now_ms = server.clock.now_ms();
            let db_index = session.db_index;
            let mut ctx = Ctx { server, session, db_index, now_ms };
            Dispatched::one(tx_cmds::exec(&mut dbs, &mut ctx).unwrap_or_else(err_reply))
        }

        Subscribe { channels } => {
            let replies = pubsub_cmds::subscribe(session, &channels);
            let new_subscriptions = channels.into_iter().map(|c| {
                let rx = server.pubsub.subscribe(c.clone());
                NewSubscription::Channel(c, rx)
            }).collect();
            Dispatched { replies, new_subscriptions, should_close: false }
        }
        Unsubscribe { channels } => Dispatched::many(pubsub_cmds::unsubscribe(session, &channels)),
        PSubscribe { patterns } => {
            let replies = pubsub_cmds::psubscribe(session, &patterns);
            let new_subscriptions = patterns.into_iter().map(|p| {
                let rx = server.pubsub.subscribe_pattern(p.clone());
                NewSubscription::Pattern(p, rx)
            }).collect();
            Dispatched { replies, new_subscriptions, should_close: false }
        }
        PUnsubscribe { patterns } => Dispatched::many(pubsub_cmds::punsubscribe(session, &patterns)),
        SSubscribe { channels } => {
            let replies = pubsub_cmds::ssubscribe(session, &channels);
            let new_subscriptions = channels.into_iter().map(|c| {
                let rx = server.pubsub.subscribe_shard(c.clone());
                NewSubscription::Shard(c, rx)
            }).collect();
            Dispatched { replies, new_subscriptions, should_close: false }
        }
        SUnsubscribe { channels } => Dispatched::many(pubsub_cmds::sunsubscribe(session, &channels)),
        Publish { channel, message } => Dispatched::one(pubsub_cmds::publish(server, &channel, &message)),
        SPublish { channel, message } => Dispatched::one(pubsub_cmds::spublish(server, &channel, &message)),
        PubSubChannels { pattern } => Dispatched::one(pubsub_cmds::pubsub_channels(server, pattern.as_deref())),
        PubSubNumSub { channels } => Dispatched::one(pubsub_cmds::pubsub_numsub(server, &channels)),
        PubSubNumPat => Dispatched::one(pubsub_cmds::pubsub_numpat(server)),
        PubSubShardChannels { pattern } => Dispatched::one(pubsub_cmds::pubsub_shard_channels(server, pattern.as_deref())),
        PubSubShardNumSub { channels } => Dispatched::one(pubsub_cmds::pubsub_shard_numsub(server, &channels)),

        BLPop { keys, timeout_ms } => Dispatched::one(blocking_list_pop(server, session, keys, timeout_ms, true).await),
        BRPop { keys, timeout_ms } => Dispatched::one(blocking_list_pop(server, session, keys, timeout_ms, false).await),
        BLMove { src, dst, from_left, to_left, timeout_ms } => {
            Dispatched::one(blocking_lmove(server, session, src, dst, from_left, to_left, timeout_ms).await)
        }
        BRPopLPush { src, dst, timeout_ms } => {
            Dispatched::one(blocking_lmove(server, session, src, dst, false, true, timeout_ms).await)
        }
        BZPopMin { keys, timeout_ms } => Dispatched::one(blocking_zset_pop(server, session, keys, timeout_ms, false).await),
        BZPopMax { keys, timeout_ms } => Dispatched::one(blocking_zset_pop(server, session, keys, timeout_ms, true).await),

        XRead { keys, ids, count, block_ms } if block_ms.is_some() => {
            Dispatched::one(blocking_xread(server, session, keys, ids, count, block_ms).await)
        }
        XReadGroup { group, consumer, keys, ids, count, block_ms, noack } if block_ms.is_some() => {
            Dispatched::one(blocking_xreadgroup(server, session, group, consumer, keys, ids, count, block_ms, noack).await)
        }

        Quit => Dispatched { replies: vec![RespValue::ok()], new_subscriptions: Vec::new(), should_close: true },

        other => {
            let mut dbs = server.databases.lock().await;
            let now_ms = server.clock.now_ms();
            let db_index = session.db_index;
            let mut ctx = Ctx { server, session, db_index, now_ms };
            Dispatched::one(commands::execute(&mut dbs, &mut ctx, &other).unwrap_or_else(err_reply))
        }
    }
}

fn handle_auth(server: &ServerState, session: &mut SessionState, username: Option<Bytes>, password: Bytes) -> RespValue {
    if username.is_some_and(|u| u != Bytes::from_static(b"default")) {
        return err_reply(Error::InvalidPassword);
    }
    let requirepass = server.config.lock().requirepass.clone();
    match requirepass {
        None => err_reply(Error::InvalidState("Client sent AUTH, but no password is set. Did you mean AUTH <username> <password>?".into())),
        Some(expected) if expected.as_bytes() == password.as_ref() => {
            session.is_authenticated = true;
            RespValue::ok()
        }
        Some(_) => err_reply(Error::InvalidPassword),
    }
}

fn handle_hello(server: &ServerState, session: &mut SessionState, protover: Option<u8>, auth: Option<(Bytes, Bytes)>, setname: Option<Bytes>) -> RespValue {
    if let Some(v) = protover {
        if v != 2 && v != 3 {
            return err_reply(Error::Protocol("NOPROTO unsupported protocol version".into()));
        }
    }
    if let Some((username, password)) = auth {
        match handle_auth(server, session, Some(username), password) {
            RespValue::Error(e) => return RespValue::Error(e),
            _ => {}
        }
    }
    if !session.is_authenticated {
        return err_reply(Error::AuthRequired);
    }
    if let Some(name) = setname {
        session.name = Some(name);
    }
    if let Some(v) = protover {
        session.protocol_version = v;
    }
    let config = server.config.lock();
    RespValue::Map(vec![
        (RespValue::BulkString(Bytes::from_static(b"server")), RespValue::BulkString(Bytes::from_static(b"redis"))),
        (RespValue::BulkString(Bytes::from_static(b"version")), RespValue::BulkString(Bytes::from(config.server_version.clone()))),
        (RespValue::BulkString(Bytes::from_static(b"proto")), RespValue::Integer(session.protocol_version as i64)),
        (RespValue::BulkString(Bytes::from_static(b"id")), RespValue::Integer(session.id as i64)),
        (RespValue::BulkString(Bytes::from_static(b"mode")), RespValue::BulkString(Bytes::from_static(b"standalone"))),
        (RespValue::BulkString(Bytes::from_static(b"role")), RespValue::BulkString(Bytes::from_static(b"master"))),
        (RespValue::BulkString(Bytes::from_static(b"modules")), RespValue::Array(vec![])),
    ])
}

/// Waits on `rx` up to `timeout_ms` (`None` = block forever), returning
/// whether the waiter actually woke (as opposed to timing out).
async fn await_wakeup(rx: tokio::sync::oneshot::Receiver<()>, timeout_ms: Option<u64>) -> bool {
    match timeout_ms {
        None => rx.await.is_ok(),
        Some(ms) => tokio::time::timeout(Duration::from_millis(ms), rx).await.map(|r| r.is_ok()).unwrap_or(false),
    }
}

async fn blocking_list_pop(server: &ServerState, session: &mut SessionState, keys: Vec<Bytes>, timeout_ms: Option<u64>, left: bool) -> RespValue {
    let db_index = session.db_index;
    loop {
        {
            let mut dbs = server.databases.lock().await;
            let now_ms = server.clock.now_ms();
            for key in &keys {
                let ready = dbs[db_index].contains(key, now_ms);
                notify_lazy_expirations(&dbs[db_index], server, db_index);
                if ready {
                    let mut ctx = Ctx { server, session: &mut *session, db_index, now_ms };
                    return match commands::list::pop(&mut ctx, &mut dbs[db_index], key, left, None) {
                        Ok(RespValue::BulkString(value)) => {
                            RespValue::Array(vec![RespValue::BulkString(key.clone()), RespValue::BulkString(value)])
                        }
                        Ok(_) => continue,
                        Err(e) => return err_reply(e),
                    };
                }
            }
        }
        let (rx, waker) = server.blockers.register(db_index, &keys, session.id);
        let woke = await_wakeup(rx, timeout_ms).await;
        server.blockers.remove_waiter(db_index, &keys, &waker);
        if !woke && timeout_ms.is_some() {
            return RespValue::NullArray;
        }
    }
}

async fn blocking_lmove(
    server: &ServerState,
    session: &mut SessionState,
    src: Bytes,
    dst: Bytes,
    from_left: bool,
    to_left: bool,
    timeout_ms: Option<u64>,
) -> RespValue {
    let db_index = session.db_index;
    let keys = [src.clone()];
    loop {
        {
            let mut dbs = server.databases.lock().await;
            let now_ms = server.clock.now_ms();
            let ready = dbs[db_index].contains(&src, now_ms);
            notify_lazy_expirations(&dbs[db_index], server, db_index);
            if ready {
                let mut ctx = Ctx { server, session: &mut *session, db_index, now_ms };
                return match commands::list::lmove(&mut ctx, &mut dbs[db_index], &src, &dst, from_left, to_left) {
                    Ok(v) => v,
                    Err(e) => err_reply(e),
                };
            }
        }
        let (rx, waker) = server.blockers.register(db_index, &keys, session.id);
        let woke = await_wakeup(rx, timeout_ms).await;
        server.blockers.remove_waiter(db_index, &keys, &waker);
        if !woke && timeout_ms.is_some() {
            return RespValue::Null;
        }
    }
}

async fn blocking_zset_pop(server: &ServerState, session: &mut SessionState, keys: Vec<Bytes>, timeout_ms: Option<u64>, max: bool) -> RespValue {
    let db_index = session.db_index;
    loop {
        {
            let mut dbs = server.databases.lock().await;
            let now_ms = server.clock.now_ms();
            for key in &keys {
                let ready = dbs[db_index].contains(key, now_ms);
                notify_lazy_expirations(&dbs[db_index], server, db_index);
                if ready {
                    let mut ctx = Ctx { server, session: &mut *session, db_index, now_ms };
                    return match commands::zset::zpop(&mut ctx, &mut dbs[db_index], key, Some(1), max) {
                        Ok(RespValue::Array(mut items)) if !items.is_empty() => {
                            let score = items.pop().unwrap();
                            let member = items.pop().unwrap();
                            RespValue::Array(vec![RespValue::BulkString(key.clone()), member, score])
                        }
                        Ok(_) => continue,
                        Err(e) => return err_reply(e),
                    };
                }
            }
        }
        let (rx, waker) = server.blockers.register(db_index, &keys, session.id);
        let woke = await_wakeup(rx, timeout_ms).await;
        server.blockers.remove_waiter(db_index, &keys, &waker);
        if !woke && timeout_ms.is_some() {
            return RespValue::NullArray;
        }
    }
}

/// Mirrors `commands::notify_lazy_expirations` for the blocking helpers
/// above, which call straight into `commands::*` rather than through
/// `commands::execute`'s single chokepoint.
fn notify_lazy_expirations(db: &Database, server: &ServerState, db_index: usize) {
    for key in db.take_expired() {
        server.notify(db_index, "expired", &key);
    }
}

fn block_timeout_ms(block_ms: Option<u64>) -> Option<u64> {
    match block_ms {
        Some(0) => None,
        other => other,
    }
}

async fn blocking_xread(
    server: &ServerState,
    session: &mut SessionState,
    keys: Vec<Bytes>,
    ids: Vec<crate::storage::StreamId>,
    count: Option<usize>,
    block_ms: Option<u64>,
) -> RespValue {
    let db_index = session.db_index;
    let timeout_ms = block_timeout_ms(block_ms);
    loop {
        {
            let dbs = server.databases.lock().await;
            let result = commands::stream::xread(&dbs[db_index], &keys, &ids, count, db_index);
            notify_lazy_expirations(&dbs[db_index], server, db_index);
            match result {
                Ok(RespValue::NullArray) => {}
                other => return other.unwrap_or_else(err_reply),
            }
        }
        let (rx, waker) = server.blockers.register(db_index, &keys, session.id);
        let woke = await_wakeup(rx, timeout_ms).await;
        server.blockers.remove_waiter(db_index, &keys, &waker);
        if !woke && timeout_ms.is_some() {
            return RespValue::NullArray;
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn blocking_xreadgroup(
    server: &ServerState,
    session: &mut SessionState,
    group: Bytes,
    consumer: Bytes,
    keys: Vec<Bytes>,
    ids: Vec<crate::storage::StreamId>,
    count: Option<usize>,
    block_ms: Option<u64>,
    noack: bool,
) -> RespValue {
    let db_index = session.db_index;
    let timeout_ms = block_timeout_ms(block_ms);
    loop {
        {
            let mut dbs = server.databases.lock().await;
            let now_ms = server.clock.now_ms();
            let result = commands::stream::xreadgroup(&mut dbs[db_index], &group, &consumer, &keys, &ids, count, noack, now_ms, db_index);
            notify_lazy_expirations(&dbs[db_index], server, db_index);
            match result {
                Ok(RespValue::NullArray) => {}
                other => return other.unwrap_or_else(err_reply),
            }
        }
        let (rx, waker) = server.blockers.register(db_index, &keys, session.id);
        let woke = await_wakeup(rx, timeout_ms).await;
        server.blockers.remove_waiter(db_index, &keys, &waker);
        if !woke && timeout_ms.is_some() {
            return RespValue::NullArray;
        }
    }
}
