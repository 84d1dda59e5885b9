//! Command execution: one module per command family, matching the
//! teacher's `core/commands/<family>.rs` layout. `execute` is the single
//! entry point `dispatch::router` calls while holding the database lock.

pub mod admin;
pub mod bitmap;
pub mod generic;
pub mod hash;
pub mod hyperloglog;
pub mod list;
pub mod pubsub;
pub mod scan;
pub mod scripting;
pub mod set;
pub mod stream;
pub mod string;
pub mod transaction;
pub mod zset;

use crate::connection::session::SessionState;
use crate::database::Database;
use crate::dispatch::Command;
use crate::error::Error;
use crate::protocol::RespValue;
use crate::server::ServerState;
use crate::storage::DataValue;

fn expect_string(data: &DataValue) -> Result<&bytes::Bytes, Error> {
    match data {
        DataValue::String(b) => Ok(b),
        _ => Err(Error::WrongType),
    }
}

fn expect_list(data: &DataValue) -> Result<&std::collections::VecDeque<bytes::Bytes>, Error> {
    match data {
        DataValue::List(l) => Ok(l),
        _ => Err(Error::WrongType),
    }
}

fn expect_list_mut(data: &mut DataValue) -> Result<&mut std::collections::VecDeque<bytes::Bytes>, Error> {
    match data {
        DataValue::List(l) => Ok(l),
        _ => Err(Error::WrongType),
    }
}

fn expect_hash(data: &DataValue) -> Result<&indexmap::IndexMap<bytes::Bytes, bytes::Bytes>, Error> {
    match data {
        DataValue::Hash(h) => Ok(h),
        _ => Err(Error::WrongType),
    }
}

fn expect_hash_mut(data: &mut DataValue) -> Result<&mut indexmap::IndexMap<bytes::Bytes, bytes::Bytes>, Error> {
    match data {
        DataValue::Hash(h) => Ok(h),
        _ => Err(Error::WrongType),
    }
}

fn expect_set(data: &DataValue) -> Result<&std::collections::HashSet<bytes::Bytes>, Error> {
    match data {
        DataValue::Set(s) => Ok(s),
        _ => Err(Error::WrongType),
    }
}

fn expect_set_mut(data: &mut DataValue) -> Result<&mut std::collections::HashSet<bytes::Bytes>, Error> {
    match data {
        DataValue::Set(s) => Ok(s),
        _ => Err(Error::WrongType),
    }
}

fn expect_zset(data: &DataValue) -> Result<&crate::storage::SortedSet, Error> {
    match data {
        DataValue::SortedSet(z) => Ok(z),
        _ => Err(Error::WrongType),
    }
}

fn expect_zset_mut(data: &mut DataValue) -> Result<&mut crate::storage::SortedSet, Error> {
    match data {
        DataValue::SortedSet(z) => Ok(z),
        _ => Err(Error::WrongType),
    }
}

fn expect_stream_mut(data: &mut DataValue) -> Result<&mut crate::storage::Stream, Error> {
    match data {
        DataValue::Stream(s) => Ok(s),
        _ => Err(Error::WrongType),
    }
}

fn expect_stream(data: &DataValue) -> Result<&crate::storage::Stream, Error> {
    match data {
        DataValue::Stream(s) => Ok(s),
        _ => Err(Error::WrongType),
    }
}

/// Bundles what most handlers need so call sites don't thread five
/// parameters through every function individually.
pub struct Ctx<'a> {
    pub server: &'a ServerState,
    pub session: &'a mut SessionState,
    pub db_index: usize,
    pub now_ms: u64,
}

impl<'a> Ctx<'a> {
    fn notify(&self, event: &str, key: &[u8]) {
        self.server.notify(self.db_index, event, key);
    }
}

/// Executes every non-blocking, non-transaction-control command against the
/// currently selected database. `dispatch::router` handles `MULTI`/`EXEC`/
/// `DISCARD`/`WATCH`/`UNWATCH`, pub/sub subscription commands, and the
/// blocking families itself, since those need more than one database's
/// worth of context (or need to release the lock entirely).
pub fn execute(dbs: &mut [Database], ctx: &mut Ctx, command: &Command) -> Result<RespValue, Error> {
    use Command::*;
    let db_index = ctx.db_index;
    let db = &mut dbs[db_index];
    let result = match command {
        // Strings
        Get { key } => string::get(db, key, ctx.now_ms),
        Set { key, value, ttl, condition, get } => string::set(ctx, db, key, value, *ttl, condition.clone(), *get),
        SetNx { key, value } => string::setnx(db, key, value, ctx.now_ms),
        SetEx { key, seconds, value } => string::setex(ctx, db, key, *seconds, value),
        PSetEx { key, millis, value } => string::psetex(ctx, db, key, *millis, value),
        GetSet { key, value } => string::getset(db, key, value, ctx.now_ms),
        GetDel { key } => string::getdel(ctx, db, key),
        GetEx { key, ttl } => string::getex(ctx, db, key, *ttl),
        Append { key, value } => string::append(db, key, value, ctx.now_ms),
        StrLen { key } => string::strlen(db, key, ctx.now_ms),
        GetRange { key, start, end } => string::getrange(db, key, *start, *end, ctx.now_ms),
        SetRange { key, offset, value } => string::setrange(db, key, *offset, value, ctx.now_ms),
        Incr { key } => string::incrby(db, key, 1, ctx.now_ms),
        Decr { key } => string::incrby(db, key, -1, ctx.now_ms),
        IncrBy { key, delta } => string::incrby(db, key, *delta, ctx.now_ms),
        DecrBy { key, delta } => string::incrby(db, key, -delta, ctx.now_ms),
        IncrByFloat { key, delta } => string::incrbyfloat(db, key, *delta, ctx.now_ms),
        MGet { keys } => string::mget(db, keys, ctx.now_ms),
        MSet { pairs } => string::mset(db, pairs),
        MSetNx { pairs } => string::msetnx(db, pairs, ctx.now_ms),

        // Bitmaps
        SetBit { key, offset, value } => bitmap::setbit(db, key, *offset, *value as usize, ctx.now_ms),
        GetBit { key, offset } => bitmap::getbit(db, key, *offset, ctx.now_ms),
        BitCount { key, range } => bitmap::bitcount(db, key, *range, ctx.now_ms),
        BitOp { op, dest, keys } => bitmap::bitop(db, *op, dest, keys, ctx.now_ms),
        BitPos { key, bit, range } => bitmap::bitpos(db, key, *bit, *range, ctx.now_ms),

        // Generic
        Del { keys } => generic::del(ctx, db, keys),
        Exists { keys } => generic::exists(db, keys, ctx.now_ms),
        Expire { key, seconds, condition } => generic::expire(ctx, db, key, *seconds * 1000, *condition),
        PExpire { key, millis, condition } => generic::expire(ctx, db, key, *millis, *condition),
        ExpireAt { key, unix_secs, condition } => generic::expireat(ctx, db, key, *unix_secs * 1000, *condition),
        PExpireAt { key, unix_millis, condition } => generic::expireat(ctx, db, key, *unix_millis, *condition),
        Ttl { key } => generic::ttl(db, key, ctx.now_ms, true),
        Pttl { key } => generic::ttl(db, key, ctx.now_ms, false),
        Persist { key } => generic::persist(db, key, ctx.now_ms),
        Keys { pattern } => generic::keys(db, pattern, ctx.now_ms),
        TypeOf { key } => generic::type_of(db, key, ctx.now_ms),
        Rename { src, dst } => generic::rename(ctx, db, src, dst, false),
        RenameNx { src, dst } => generic::rename(ctx, db, src, dst, true),
        RandomKey => generic::randomkey(db, ctx.now_ms),
        Scan { cursor, pattern, count, type_filter } => {
            generic::scan(db, *cursor, pattern.as_deref(), *count, type_filter.as_deref(), ctx.now_ms)
        }
        Dump { key } => generic::dump(db, key, ctx.now_ms),
        Restore { key, ttl_ms, payload, replace } => generic::restore(ctx, db, key, *ttl_ms, payload, *replace),
        Copy { src, dst, replace } => generic::copy(ctx, db, src, dst, *replace),

        // Lists
        LPush { key, values, only_if_exists } => list::push(ctx, db, key, values, true, *only_if_exists),
        RPush { key, values, only_if_exists } => list::push(ctx, db, key, values, false, *only_if_exists),
        LPop { key, count } => list::pop(ctx, db, key, true, *count),
        RPop { key, count } => list::pop(ctx, db, key, false, *count),
        LLen { key } => list::llen(db, key, ctx.now_ms),
        LRange { key, start, stop } => list::lrange(db, key, *start, *stop, ctx.now_ms),
        LIndex { key, index } => list::lindex(db, key, *index, ctx.now_ms),
        LSet { key, index, value } => list::lset(db, key, *index, value, ctx.now_ms),
        LInsert { key, before, pivot, value } => list::linsert(db, key, *before, pivot, value, ctx.now_ms),
        LTrim { key, start, stop } => list::ltrim(ctx, db, key, *start, *stop),
        LRem { key, count, value } => list::lrem(ctx, db, key, *count, value),
        LPos { key, element, rank, count, maxlen } => list::lpos(db, key, element, *rank, *count, *maxlen, ctx.now_ms),
        LMove { src, dst, from_left, to_left } => list::lmove(ctx, db, src, dst, *from_left, *to_left),
        RPopLPush { src, dst } => list::lmove(ctx, db, src, dst, false, true),

        // Hashes
        HSet { key, fields } => hash::hset(ctx, db, key, fields),
        HSetNx { key, field, value } => hash::hsetnx(ctx, db, key, field, value),
        HGet { key, field } => hash::hget(db, key, field, ctx.now_ms),
        HGetAll { key } => hash::hgetall(db, key, ctx.now_ms),
        HDel { key, fields } => hash::hdel(ctx, db, key, fields),
        HExists { key, field } => hash::hexists(db, key, field, ctx.now_ms),
        HLen { key } => hash::hlen(db, key, ctx.now_ms),
        HKeys { key } => hash::hkeys(db, key, ctx.now_ms),
        HVals { key } => hash::hvals(db, key, ctx.now_ms),
        HIncrBy { key, field, delta } => hash::hincrby(db, key, field, *delta, ctx.now_ms),
        HIncrByFloat { key, field, delta } => hash::hincrbyfloat(db, key, field, *delta, ctx.now_ms),
        HMGet { key, fields } => hash::hmget(db, key, fields, ctx.now_ms),
        HRandField { key, count, withvalues } => hash::hrandfield(db, key, *count, *withvalues, ctx.now_ms),
        HStrLen { key, field } => hash::hstrlen(db, key, field, ctx.now_ms),
        HExpire { key, millis, fields, condition, unit } => hash::hexpire(db, key, *millis, fields, *condition, *unit, ctx.now_ms),
        HExpireAt { key, at_millis, fields, condition, unit } => hash::hexpireat(db, key, *at_millis, fields, *condition, *unit, ctx.now_ms),
        HPersist { key, fields } => hash::hpersist(db, key, fields, ctx.now_ms),
        HTtl { key, fields, unit } => hash::httl(db, key, fields, *unit, ctx.now_ms),

        // Sets
        SAdd { key, members } => set::sadd(ctx, db, key, members),
        SRem { key, members } => set::srem(ctx, db, key, members),
        SMembers { key } => set::smembers(db, key, ctx.now_ms),
        SIsMember { key, member } => set::sismember(db, key, member, ctx.now_ms),
        SMIsMember { key, members } => set::smismember(db, key, members, ctx.now_ms),
        SCard { key } => set::scard(db, key, ctx.now_ms),
        SPop { key, count } => set::spop(ctx, db, key, *count),
        SRandMember { key, count } => set::srandmember(db, key, *count, ctx.now_ms),
        SMove { src, dst, member } => set::smove(ctx, db, src, dst, member),
        SetOp { kind, dest, keys } => set::set_op(ctx, db, *kind, dest.as_ref(), keys, ctx.now_ms),

        // Sorted sets
        ZAdd { key, members, condition, ch, incr } => zset::zadd(ctx, db, key, members, *condition, *ch, *incr),
        ZRem { key, members } => zset::zrem(ctx, db, key, members),
        ZScore { key, member } => zset::zscore(db, key, member, ctx.now_ms),
        ZMScore { key, members } => zset::zmscore(db, key, members, ctx.now_ms),
        ZCard { key } => zset::zcard(db, key, ctx.now_ms),
        ZCount { key, min, max } => zset::zcount(db, key, min, max, ctx.now_ms),
        ZLexCount { key, min, max } => zset::zlexcount(db, key, min, max, ctx.now_ms),
        ZIncrBy { key, delta, member } => zset::zincrby(ctx, db, key, *delta, member),
        ZRank { key, member, withscore } => zset::zrank(db, key, member, *withscore, false, ctx.now_ms),
        ZRevRank { key, member, withscore } => zset::zrank(db, key, member, *withscore, true, ctx.now_ms),
        ZRange { key, by, rev, limit, withscores } => zset::zrange(db, key, by, *rev, *limit, *withscores, ctx.now_ms),
        ZRangeStore { dest, key, by, rev, limit } => zset::zrangestore(ctx, db, dest, key, by, *rev, *limit),
        ZRemRangeByRank { key, start, stop } => zset::zremrangebyrank(ctx, db, key, *start, *stop),
        ZRemRangeByScore { key, min, max } => zset::zremrangebyscore(ctx, db, key, min, max),
        ZRemRangeByLex { key, min, max } => zset::zremrangebylex(ctx, db, key, min, max),
        ZPopMin { key, count } => zset::zpop(ctx, db, key, *count, false),
        ZPopMax { key, count } => zset::zpop(ctx, db, key, *count, true),
        ZSetOp { kind, dest, keys, weights, aggregate, withscores } => {
            zset::zset_op(ctx, db, *kind, dest.as_ref(), keys, weights.clone(), *aggregate, *withscores, ctx.now_ms)
        }

        // Streams
        XAdd { key, id_spec, nomkstream, trim, fields } => stream::xadd(ctx, db, key, *id_spec, *nomkstream, trim.clone(), fields),
        XLen { key } => stream::xlen(db, key, ctx.now_ms),
        XRange { key, start, start_exclusive, end, end_exclusive, count } => {
            stream::xrange(db, key, *start, *start_exclusive, *end, *end_exclusive, *count, ctx.now_ms, false)
        }
        XRevRange { key, end, end_exclusive, start, start_exclusive, count } => {
            stream::xrange(db, key, *start, *start_exclusive, *end, *end_exclusive, *count, ctx.now_ms, true)
        }
        XDel { key, ids } => stream::xdel(ctx, db, key, ids),
        XTrim { key, trim } => stream::xtrim(ctx, db, key, trim.clone()),
        XGroupCreate { key, group, id_spec, use_last, mkstream } => stream::xgroup_create(db, key, group, *id_spec, *use_last, *mkstream),
        XGroupDestroy { key, group } => stream::xgroup_destroy(db, key, group),
        XGroupCreateConsumer { key, group, consumer } => stream::xgroup_create_consumer(db, key, group, consumer, ctx.now_ms),
        XGroupDelConsumer { key, group, consumer } => stream::xgroup_del_consumer(db, key, group, consumer),
        XGroupSetId { key, group, id_spec, use_last } => stream::xgroup_setid(db, key, group, *id_spec, *use_last),
        XReadGroup { group, consumer, keys, ids, count, noack, .. } => {
            stream::xreadgroup(db, group, consumer, keys, ids, *count, *noack, ctx.now_ms, db_index)
        }
        XRead { keys, ids, count, .. } => stream::xread(db, keys, ids, *count, db_index),
        XAck { key, group, ids } => stream::xack(db, key, group, ids),
        XPending { key, group, extended } => stream::xpending(db, key, group, extended.clone()),
        XClaim { key, group, consumer, min_idle_ms, ids, justid } => stream::xclaim(db, key, group, consumer, *min_idle_ms, ids, *justid, ctx.now_ms),
        XAutoClaim { key, group, consumer, min_idle_ms, start, count, justid } => {
            stream::xautoclaim(db, key, group, consumer, *min_idle_ms, *start, *count, *justid, ctx.now_ms)
        }
        XInfoStream { key } => stream::xinfo_stream(db, key),
        XInfoGroups { key } => stream::xinfo_groups(db, key),
        XInfoConsumers { key, group } => stream::xinfo_consumers(db, key, group),

        // HyperLogLog
        PfAdd { key, elements } => hyperloglog::pfadd(ctx, db, key, elements),
        PfCount { keys } => hyperloglog::pfcount(db, keys, ctx.now_ms),
        PfMerge { dest, keys } => hyperloglog::pfmerge(ctx, db, dest, keys),

        // Scans
        HScan { key, cursor, pattern, count, novalues } => scan::hscan(db, key, *cursor, pattern.as_deref(), *count, *novalues, ctx.now_ms),
        SScan { key, cursor, pattern, count } => scan::sscan(db, key, *cursor, pattern.as_deref(), *count, ctx.now_ms),
        ZScan { key, cursor, pattern, count } => scan::zscan(db, key, *cursor, pattern.as_deref(), *count, ctx.now_ms),

        // Admin
        Ping { message } => admin::ping(message.clone()),
        Echo { message } => Ok(RespValue::BulkString(message.clone())),
        Select { .. } | SwapDb { .. } | Hello { .. } | Auth { .. } => {
            unreachable!("handled by the router before reaching execute()")
        }
        FlushDb => {
            db.flush();
            Ok(RespValue::ok())
        }
        FlushAll => admin::flushall(dbs),
        DbSize => Ok(RespValue::Integer(db.entries.len() as i64)),
        Info { section } => admin::info(ctx.server, section.as_deref()),
        ClientGetName => Ok(RespValue::from_opt_bytes(ctx.session.name.clone())),
        ClientSetName { name } => {
            ctx.session.name = Some(name.clone());
            Ok(RespValue::ok())
        }
        ClientId => Ok(RespValue::Integer(ctx.session.id as i64)),
        ClientList => admin::client_list(ctx.server),
        ClientNoEvict { .. } | ClientNoTouch { .. } => Ok(RespValue::ok()),
        ConfigGet { pattern } => admin::config_get(ctx.server, pattern),
        ConfigSet { pairs } => admin::config_set(ctx.server, pairs),
        ConfigResetStat => Ok(RespValue::ok()),
        // Intentional no-op, not a missing feature: execute() runs synchronously
        // under the single execution lock, so a real sleep here would stall
        // every other client for the duration instead of just this one.
        DebugSleep { .. } => Ok(RespValue::ok()),
        DebugObject { key } => admin::debug_object(db, key, ctx.now_ms),
        Time => admin::time(ctx.now_ms),
        CommandCount => Ok(RespValue::Integer(200)),
        CommandDocs => Ok(RespValue::Array(vec![])),
        Reset => {
            ctx.session.reset();
            Ok(RespValue::SimpleString("RESET".to_string()))
        }
        Quit => Ok(RespValue::ok()),

        Multi | Exec | Discard | Watch { .. } | Unwatch => {
            unreachable!("handled by the router before reaching execute()")
        }
        Subscribe { .. } | Unsubscribe { .. } | PSubscribe { .. } | PUnsubscribe { .. }
        | SSubscribe { .. } | SUnsubscribe { .. } | Publish { .. } | SPublish { .. }
        | PubSubChannels { .. } | PubSubNumSub { .. } | PubSubNumPat
        | PubSubShardChannels { .. } | PubSubShardNumSub { .. } => {
            unreachable!("handled by the router before reaching execute()")
        }
        Eval { script, keys, argv } => scripting::eval(ctx.server, script, keys, argv),
        EvalSha { sha1, keys, argv } => scripting::evalsha(ctx.server, sha1, keys, argv),
        ScriptLoad { script } => scripting::script_load(ctx.server, script),
        ScriptExists { shas } => scripting::script_exists(ctx.server, shas),
        ScriptFlush => {
            ctx.server.scripts.lock().clear();
            Ok(RespValue::ok())
        }

        BLPop { .. } | BRPop { .. } | BLMove { .. } | BRPopLPush { .. } | BZPopMin { .. } | BZPopMax { .. } => {
            unreachable!("blocking commands are handled by the router's blocking loop")
        }
    };
    notify_lazy_expirations(dbs, ctx, db_index);
    result
}

/// Drains whatever `Database::get`/`get_mut` queued as lazily-discovered
/// expired keys during the command just executed and fires the same
/// `expired` keyspace notification `Server::run_active_expiry_cycle` fires
/// for its own sweep.
fn notify_lazy_expirations(dbs: &[Database], ctx: &Ctx, db_index: usize) {
    for key in dbs[db_index].take_expired() {
        ctx.notify("expired", &key);
    }
}
