//! The full command roster, parsed once per request into a typed `Command`.
//! Grounded in the teacher's `core/commands/command_trait.rs` (the
//! `CommandFlags`/`WriteOutcome` shape) and `core/commands/mod.rs` (the
//! roster); the `define_commands!` macro that assembles the teacher's enum
//! was not present in this retrieval, so the enum and its parser are
//! hand-written here instead.

use super::args::{extract_f64, extract_i64, extract_string, extract_u64, extract_usize, Cursor};
use crate::error::Error;
use crate::storage::{LexBoundary, ScoreBoundary, StreamId};
use bitflags::bitflags;
use bytes::Bytes;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommandFlags: u32 {
        const WRITE       = 0b0000_0001;
        const READONLY    = 0b0000_0010;
        const ADMIN       = 0b0000_0100;
        const PUBSUB      = 0b0000_1000;
        const TRANSACTION = 0b0001_0000; // MULTI/EXEC/DISCARD/WATCH/UNWATCH
        const BLOCKING    = 0b0010_0000;
        const NO_PROPAGATE = 0b0100_0000;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SetCondition {
    #[default]
    None,
    Nx,
    Xx,
    /// `SET key value IFEQ old`: only write if the stored value currently
    /// equals `old` byte-for-byte.
    IfEq(Bytes),
    /// `SET key value IFGT old`: only write if the stored value parses as a
    /// float strictly greater than `old`'s. Absent keys fail the condition,
    /// same as `XX`.
    IfGt(Bytes),
    /// `SET key value IFLT old`: the `IFGT` mirror, strictly less than.
    IfLt(Bytes),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtlOption {
    #[default]
    None,
    KeepTtl,
    Seconds(u64),
    Millis(u64),
    UnixSeconds(u64),
    UnixMillis(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpireCondition {
    #[default]
    None,
    Nx,
    Xx,
    Gt,
    Lt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Millis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitUnit {
    Byte,
    Bit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOpKind {
    And,
    Or,
    Xor,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZAddCondition {
    #[default]
    None,
    Nx,
    XxGt,
    XxLt,
    Gt,
    Lt,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RangeBy {
    Index(i64, i64),
    Score(ScoreBoundary, ScoreBoundary),
    Lex(LexBoundary, LexBoundary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOpKind {
    Union,
    Inter,
    Diff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamTrim {
    MaxLen { approx: bool, count: u64 },
    MinId { approx: bool, id: StreamId },
}

/// A fully parsed command, ready for execution by `crate::dispatch::router`.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // --- Strings ---
    Get { key: Bytes },
    Set { key: Bytes, value: Bytes, ttl: TtlOption, condition: SetCondition, get: bool },
    SetNx { key: Bytes, value: Bytes },
    SetEx { key: Bytes, seconds: u64, value: Bytes },
    PSetEx { key: Bytes, millis: u64, value: Bytes },
    GetSet { key: Bytes, value: Bytes },
    GetDel { key: Bytes },
    GetEx { key: Bytes, ttl: TtlOption },
    Append { key: Bytes, value: Bytes },
    StrLen { key: Bytes },
    GetRange { key: Bytes, start: i64, end: i64 },
    SetRange { key: Bytes, offset: usize, value: Bytes },
    Incr { key: Bytes },
    Decr { key: Bytes },
    IncrBy { key: Bytes, delta: i64 },
    DecrBy { key: Bytes, delta: i64 },
    IncrByFloat { key: Bytes, delta: f64 },
    MGet { keys: Vec<Bytes> },
    MSet { pairs: Vec<(Bytes, Bytes)> },
    MSetNx { pairs: Vec<(Bytes, Bytes)> },

    // --- Bitmaps ---
    SetBit { key: Bytes, offset: usize, value: u8 },
    GetBit { key: Bytes, offset: usize },
    BitCount { key: Bytes, range: Option<(i64, i64, BitUnit)> },
    BitOp { op: BitOpKind, dest: Bytes, keys: Vec<Bytes> },
    BitPos { key: Bytes, bit: u8, range: Option<(i64, Option<i64>, BitUnit)> },

    // --- Generic ---
    Del { keys: Vec<Bytes> },
    Exists { keys: Vec<Bytes> },
    Expire { key: Bytes, seconds: i64, condition: ExpireCondition },
    PExpire { key: Bytes, millis: i64, condition: ExpireCondition },
    ExpireAt { key: Bytes, unix_secs: i64, condition: ExpireCondition },
    PExpireAt { key: Bytes, unix_millis: i64, condition: ExpireCondition },
    Ttl { key: Bytes },
    Pttl { key: Bytes },
    Persist { key: Bytes },
    Keys { pattern: String },
    TypeOf { key: Bytes },
    Rename { src: Bytes, dst: Bytes },
    RenameNx { src: Bytes, dst: Bytes },
    RandomKey,
    Scan { cursor: u64, pattern: Option<String>, count: usize, type_filter: Option<String> },
    Dump { key: Bytes },
    Restore { key: Bytes, ttl_ms: u64, payload: Bytes, replace: bool },
    Copy { src: Bytes, dst: Bytes, replace: bool },

    // --- Lists ---
    LPush { key: Bytes, values: Vec<Bytes>, only_if_exists: bool },
    RPush { key: Bytes, values: Vec<Bytes>, only_if_exists: bool },
    LPop { key: Bytes, count: Option<usize> },
    RPop { key: Bytes, count: Option<usize> },
    LLen { key: Bytes },
    LRange { key: Bytes, start: i64, stop: i64 },
    LIndex { key: Bytes, index: i64 },
    LSet { key: Bytes, index: i64, value: Bytes },
    LInsert { key: Bytes, before: bool, pivot: Bytes, value: Bytes },
    LTrim { key: Bytes, start: i64, stop: i64 },
    LRem { key: Bytes, count: i64, value: Bytes },
    LPos { key: Bytes, element: Bytes, rank: Option<i64>, count: Option<usize>, maxlen: Option<usize> },
    LMove { src: Bytes, dst: Bytes, from_left: bool, to_left: bool },
    RPopLPush { src: Bytes, dst: Bytes },
    BLPop { keys: Vec<Bytes>, timeout_ms: Option<u64> },
    BRPop { keys: Vec<Bytes>, timeout_ms: Option<u64> },
    BLMove { src: Bytes, dst: Bytes, from_left: bool, to_left: bool, timeout_ms: Option<u64> },
    BRPopLPush { src: Bytes, dst: Bytes, timeout_ms: Option<u64> },

    // --- Hashes ---
    HSet { key: Bytes, fields: Vec<(Bytes, Bytes)> },
    HSetNx { key: Bytes, field: Bytes, value: Bytes },
    HGet { key: Bytes, field: Bytes },
    HGetAll { key: Bytes },
    HDel { key: Bytes, fields: Vec<Bytes> },
    HExists { key: Bytes, field: Bytes },
    HLen { key: Bytes },
    HKeys { key: Bytes },
    HVals { key: Bytes },
    HIncrBy { key: Bytes, field: Bytes, delta: i64 },
    HIncrByFloat { key: Bytes, field: Bytes, delta: f64 },
    HMGet { key: Bytes, fields: Vec<Bytes> },
    HRandField { key: Bytes, count: Option<i64>, withvalues: bool },
    HStrLen { key: Bytes, field: Bytes },
    HExpire { key: Bytes, millis: i64, fields: Vec<Bytes>, condition: ExpireCondition, unit: TimeUnit },
    HExpireAt { key: Bytes, at_millis: i64, fields: Vec<Bytes>, condition: ExpireCondition, unit: TimeUnit },
    HPersist { key: Bytes, fields: Vec<Bytes> },
    HTtl { key: Bytes, fields: Vec<Bytes>, unit: TimeUnit },

    // --- Sets ---
    SAdd { key: Bytes, members: Vec<Bytes> },
    SRem { key: Bytes, members: Vec<Bytes> },
    SMembers { key: Bytes },
    SIsMember { key: Bytes, member: Bytes },
    SMIsMember { key: Bytes, members: Vec<Bytes> },
    SCard { key: Bytes },
    SPop { key: Bytes, count: Option<usize> },
    SRandMember { key: Bytes, count: Option<i64> },
    SMove { src: Bytes, dst: Bytes, member: Bytes },
    SetOp { kind: SetOpKind, dest: Option<Bytes>, keys: Vec<Bytes> },

    // --- Sorted sets ---
    ZAdd { key: Bytes, members: Vec<(f64, Bytes)>, condition: ZAddCondition, ch: bool, incr: bool },
    ZRem { key: Bytes, members: Vec<Bytes> },
    ZScore { key: Bytes, member: Bytes },
    ZMScore { key: Bytes, members: Vec<Bytes> },
    ZCard { key: Bytes },
    ZCount { key: Bytes, min: ScoreBoundary, max: ScoreBoundary },
    ZLexCount { key: Bytes, min: LexBoundary, max: LexBoundary },
    ZIncrBy { key: Bytes, delta: f64, member: Bytes },
    ZRank { key: Bytes, member: Bytes, withscore: bool },
    ZRevRank { key: Bytes, member: Bytes, withscore: bool },
    ZRange { key: Bytes, by: RangeBy, rev: bool, limit: Option<(i64, i64)>, withscores: bool },
    ZRangeStore { dest: Bytes, key: Bytes, by: RangeBy, rev: bool, limit: Option<(i64, i64)> },
    ZRemRangeByRank { key: Bytes, start: i64, stop: i64 },
    ZRemRangeByScore { key: Bytes, min: ScoreBoundary, max: ScoreBoundary },
    ZRemRangeByLex { key: Bytes, min: LexBoundary, max: LexBoundary },
    ZPopMin { key: Bytes, count: Option<usize> },
    ZPopMax { key: Bytes, count: Option<usize> },
    BZPopMin { keys: Vec<Bytes>, timeout_ms: Option<u64> },
    BZPopMax { keys: Vec<Bytes>, timeout_ms: Option<u64> },
    ZSetOp {
        kind: SetOpKind,
        dest: Option<Bytes>,
        keys: Vec<Bytes>,
        weights: Option<Vec<f64>>,
        aggregate: Aggregate,
        withscores: bool,
    },

    // --- Streams ---
    XAdd { key: Bytes, id_spec: Option<StreamId>, nomkstream: bool, trim: Option<StreamTrim>, fields: Vec<(Bytes, Bytes)> },
    XLen { key: Bytes },
    XRange { key: Bytes, start: StreamId, start_exclusive: bool, end: StreamId, end_exclusive: bool, count: Option<usize> },
    XRevRange { key: Bytes, end: StreamId, end_exclusive: bool, start: StreamId, start_exclusive: bool, count: Option<usize> },
    XDel { key: Bytes, ids: Vec<StreamId> },
    XTrim { key: Bytes, trim: StreamTrim },
    XGroupCreate { key: Bytes, group: Bytes, id_spec: StreamId, use_last: bool, mkstream: bool },
    XGroupDestroy { key: Bytes, group: Bytes },
    XGroupCreateConsumer { key: Bytes, group: Bytes, consumer: Bytes },
    XGroupDelConsumer { key: Bytes, group: Bytes, consumer: Bytes },
    XGroupSetId { key: Bytes, group: Bytes, id_spec: StreamId, use_last: bool },
    XReadGroup { group: Bytes, consumer: Bytes, keys: Vec<Bytes>, ids: Vec<StreamId>, count: Option<usize>, block_ms: Option<u64>, noack: bool },
    XRead { keys: Vec<Bytes>, ids: Vec<StreamId>, count: Option<usize>, block_ms: Option<u64> },
    XAck { key: Bytes, group: Bytes, ids: Vec<StreamId> },
    XPending { key: Bytes, group: Bytes, extended: Option<(StreamId, StreamId, usize, Option<Bytes>)> },
    XClaim { key: Bytes, group: Bytes, consumer: Bytes, min_idle_ms: u64, ids: Vec<StreamId>, justid: bool },
    XAutoClaim { key: Bytes, group: Bytes, consumer: Bytes, min_idle_ms: u64, start: StreamId, count: usize, justid: bool },
    XInfoStream { key: Bytes },
    XInfoGroups { key: Bytes },
    XInfoConsumers { key: Bytes, group: Bytes },

    // --- Pub/sub ---
    Subscribe { channels: Vec<Bytes> },
    Unsubscribe { channels: Vec<Bytes> },
    PSubscribe { patterns: Vec<Bytes> },
    PUnsubscribe { patterns: Vec<Bytes> },
    SSubscribe { channels: Vec<Bytes> },
    SUnsubscribe { channels: Vec<Bytes> },
    Publish { channel: Bytes, message: Bytes },
    SPublish { channel: Bytes, message: Bytes },
    PubSubChannels { pattern: Option<String> },
    PubSubNumSub { channels: Vec<Bytes> },
    PubSubNumPat,
    PubSubShardChannels { pattern: Option<String> },
    PubSubShardNumSub { channels: Vec<Bytes> },

    // --- Transactions ---
    Multi,
    Exec,
    Discard,
    Watch { keys: Vec<Bytes> },
    Unwatch,

    // --- Scripting ---
    Eval { script: Bytes, keys: Vec<Bytes>, argv: Vec<Bytes> },
    EvalSha { sha1: String, keys: Vec<Bytes>, argv: Vec<Bytes> },
    ScriptLoad { script: Bytes },
    ScriptExists { shas: Vec<String> },
    ScriptFlush,

    // --- Admin ---
    Ping { message: Option<Bytes> },
    Echo { message: Bytes },
    Auth { username: Option<Bytes>, password: Bytes },
    Hello { protover: Option<u8>, auth: Option<(Bytes, Bytes)>, setname: Option<Bytes> },
    Select { index: usize },
    SwapDb { a: usize, b: usize },
    FlushDb,
    FlushAll,
    DbSize,
    Info { section: Option<String> },
    ClientGetName,
    ClientSetName { name: Bytes },
    ClientId,
    ClientList,
    ClientNoEvict { on: bool },
    ClientNoTouch { on: bool },
    ConfigGet { pattern: String },
    ConfigSet { pairs: Vec<(String, String)> },
    ConfigResetStat,
    DebugSleep { seconds: f64 },
    DebugObject { key: Bytes },
    Time,
    CommandCount,
    CommandDocs,
    Reset,
    Quit,

    // --- HyperLogLog ---
    PfAdd { key: Bytes, elements: Vec<Bytes> },
    PfCount { keys: Vec<Bytes> },
    PfMerge { dest: Bytes, keys: Vec<Bytes> },

    // --- Scans ---
    HScan { key: Bytes, cursor: u64, pattern: Option<String>, count: usize, novalues: bool },
    SScan { key: Bytes, cursor: u64, pattern: Option<String>, count: usize },
    ZScan { key: Bytes, cursor: u64, pattern: Option<String>, count: usize },
}

impl Command {
    /// Keys this command reads or writes, used for `WATCH`/movable-key
    /// bookkeeping. Destination keys count too: a queued `EXEC` must detect
    /// a write to a key via any alias.
    pub fn get_keys(&self) -> Vec<Bytes> {
        use Command::*;
        match self {
            Get { key } | StrLen { key } | Incr { key } | Decr { key } | GetDel { key }
            | TypeOf { key } | Ttl { key } | Pttl { key } | Persist { key } | Dump { key }
            | LLen { key } | HGetAll { key } | HKeys { key } | HVals { key } | HLen { key }
            | SMembers { key } | SCard { key } | ZCard { key } | XLen { key } => vec![key.clone()],
            Set { key, .. } | SetNx { key, .. } | SetEx { key, .. } | PSetEx { key, .. }
            | GetSet { key, .. } | GetEx { key, .. } | Append { key, .. }
            | GetRange { key, .. } | SetRange { key, .. } | IncrBy { key, .. }
            | DecrBy { key, .. } | IncrByFloat { key, .. } | SetBit { key, .. }
            | GetBit { key, .. } | BitCount { key, .. } | BitPos { key, .. }
            | Expire { key, .. } | PExpire { key, .. } | ExpireAt { key, .. }
            | PExpireAt { key, .. } | LRange { key, .. } | LIndex { key, .. }
            | LSet { key, .. } | LTrim { key, .. } | LRem { key, .. } | LPos { key, .. }
            | HSetNx { key, .. } | HGet { key, .. } | HDel { key, .. } | HExists { key, .. }
            | HIncrBy { key, .. } | HIncrByFloat { key, .. } | HMGet { key, .. }
            | HRandField { key, .. } | HStrLen { key, .. } | HExpire { key, .. }
            | HExpireAt { key, .. } | HPersist { key, .. } | HTtl { key, .. }
            | SAdd { key, .. } | SRem { key, .. } | SIsMember { key, .. }
            | SMIsMember { key, .. } | SPop { key, .. } | SRandMember { key, .. }
            | ZRem { key, .. } | ZScore { key, .. } | ZMScore { key, .. }
            | ZCount { key, .. } | ZLexCount { key, .. } | ZIncrBy { key, .. }
            | ZRank { key, .. } | ZRevRank { key, .. } | ZRemRangeByRank { key, .. }
            | ZRemRangeByScore { key, .. } | ZRemRangeByLex { key, .. }
            | ZPopMin { key, .. } | ZPopMax { key, .. } | XDel { key, .. }
            | XTrim { key, .. } | XAck { key, group: _, .. } | XInfoStream { key }
            | XInfoGroups { key } | XInfoConsumers { key, .. } | DebugObject { key }
            | PfAdd { key, .. } | HScan { key, .. } | SScan { key, .. } | ZScan { key, .. }
            | XRange { key, .. } | XRevRange { key, .. } | LInsert { key, .. } => vec![key.clone()],
            HSet { key, .. } => vec![key.clone()],
            ZAdd { key, .. } => vec![key.clone()],
            LPush { key, .. } | RPush { key, .. } | LPop { key, .. } | RPop { key, .. } => vec![key.clone()],
            XAdd { key, .. } => vec![key.clone()],
            XGroupCreate { key, .. } | XGroupDestroy { key, .. } | XGroupCreateConsumer { key, .. }
            | XGroupDelConsumer { key, .. } | XGroupSetId { key, .. } => vec![key.clone()],
            XClaim { key, .. } | XAutoClaim { key, .. } | XPending { key, .. } => vec![key.clone()],
            MGet { keys } | Del { keys } | Exists { keys } | Watch { keys } | PfCount { keys } => keys.clone(),
            MSet { pairs } | MSetNx { pairs } => pairs.iter().map(|(k, _)| k.clone()).collect(),
            Rename { src, dst } | RenameNx { src, dst } => vec![src.clone(), dst.clone()],
            Copy { src, dst, .. } => vec![src.clone(), dst.clone()],
            BitOp { dest, keys, .. } => {
                let mut v = vec![dest.clone()];
                v.extend(keys.clone());
                v
            }
            Restore { key, .. } => vec![key.clone()],
            LMove { src, dst, .. } | RPopLPush { src, dst } | SMove { src, dst, .. } => {
                vec![src.clone(), dst.clone()]
            }
            BLPop { keys, .. } | BRPop { keys, .. } | BZPopMin { keys, .. } | BZPopMax { keys, .. } => keys.clone(),
            BLMove { src, dst, .. } | BRPopLPush { src, dst, .. } => vec![src.clone(), dst.clone()],
            SetOp { dest, keys, .. } => {
                let mut v = dest.clone().map(|d| vec![d]).unwrap_or_default();
                v.extend(keys.clone());
                v
            }
            ZSetOp { dest, keys, .. } => {
                let mut v = dest.clone().map(|d| vec![d]).unwrap_or_default();
                v.extend(keys.clone());
                v
            }
            ZRange { key, .. } => vec![key.clone()],
            ZRangeStore { dest, key, .. } => vec![dest.clone(), key.clone()],
            XReadGroup { keys, .. } | XRead { keys, .. } => keys.clone(),
            PfMerge { dest, keys } => {
                let mut v = vec![dest.clone()];
                v.extend(keys.clone());
                v
            }
            _ => vec![],
        }
    }

    pub fn is_write(&self) -> bool {
        self.flags().contains(CommandFlags::WRITE)
    }

    pub fn flags(&self) -> CommandFlags {
        use Command::*;
        match self {
            Get { .. } | MGet { .. } | StrLen { .. } | GetRange { .. } | Exists { .. }
            | Ttl { .. } | Pttl { .. } | Keys { .. } | TypeOf { .. } | RandomKey | Scan { .. }
            | Dump { .. } | LLen { .. } | LRange { .. } | LIndex { .. } | LPos { .. }
            | HGet { .. } | HGetAll { .. } | HExists { .. } | HLen { .. } | HKeys { .. }
            | HVals { .. } | HMGet { .. } | HRandField { .. } | HStrLen { .. } | HTtl { .. }
            | SMembers { .. } | SIsMember { .. } | SMIsMember { .. } | SCard { .. }
            | SRandMember { .. } | ZScore { .. } | ZMScore { .. } | ZCard { .. }
            | ZCount { .. } | ZLexCount { .. } | ZRank { .. } | ZRevRank { .. }
            | ZRange { .. } | XLen { .. } | XRange { .. } | XRevRange { .. }
            | XPending { .. } | XInfoStream { .. } | XInfoGroups { .. } | XInfoConsumers { .. }
            | PfCount { .. } | HScan { .. } | SScan { .. } | ZScan { .. } | DbSize
            | SetOp { dest: None, .. } | ZSetOp { dest: None, .. } => CommandFlags::READONLY,

            Set { .. } | SetNx { .. } | SetEx { .. } | PSetEx { .. } | GetSet { .. }
            | GetDel { .. } | GetEx { .. } | Append { .. } | SetRange { .. } | Incr { .. }
            | Decr { .. } | IncrBy { .. } | DecrBy { .. } | IncrByFloat { .. } | MSet { .. }
            | MSetNx { .. } | SetBit { .. } | BitOp { .. } | Del { .. } | Expire { .. }
            | PExpire { .. } | ExpireAt { .. } | PExpireAt { .. } | Persist { .. }
            | Rename { .. } | RenameNx { .. } | Restore { .. } | Copy { .. } | LPush { .. }
            | RPush { .. } | LPop { .. } | RPop { .. } | LSet { .. } | LInsert { .. }
            | LTrim { .. } | LRem { .. } | LMove { .. } | RPopLPush { .. } | HSet { .. }
            | HSetNx { .. } | HDel { .. } | HIncrBy { .. } | HIncrByFloat { .. }
            | HExpire { .. } | HExpireAt { .. } | HPersist { .. } | SAdd { .. } | SRem { .. }
            | SPop { .. } | SMove { .. } | SetOp { dest: Some(_), .. } | ZAdd { .. }
            | ZRem { .. } | ZIncrBy { .. } | ZRangeStore { .. } | ZRemRangeByRank { .. }
            | ZRemRangeByScore { .. } | ZRemRangeByLex { .. } | ZPopMin { .. } | ZPopMax { .. }
            | ZSetOp { dest: Some(_), .. } | XAdd { .. } | XDel { .. } | XTrim { .. }
            | XGroupCreate { .. } | XGroupDestroy { .. } | XGroupCreateConsumer { .. }
            | XGroupDelConsumer { .. } | XGroupSetId { .. } | XAck { .. } | XClaim { .. }
            | XAutoClaim { .. } | PfAdd { .. } | PfMerge { .. } | FlushDb | FlushAll => {
                CommandFlags::WRITE
            }

            BLPop { .. } | BRPop { .. } | BLMove { .. } | BRPopLPush { .. } | BZPopMin { .. }
            | BZPopMax { .. } => CommandFlags::WRITE | CommandFlags::BLOCKING,

            XReadGroup { .. } => CommandFlags::WRITE | CommandFlags::BLOCKING,
            XRead { .. } => CommandFlags::READONLY | CommandFlags::BLOCKING,

            Subscribe { .. } | Unsubscribe { .. } | PSubscribe { .. } | PUnsubscribe { .. }
            | SSubscribe { .. } | SUnsubscribe { .. } | Publish { .. } | SPublish { .. }
            | PubSubChannels { .. } | PubSubNumSub { .. } | PubSubNumPat
            | PubSubShardChannels { .. } | PubSubShardNumSub { .. } => CommandFlags::PUBSUB,

            Multi | Exec | Discard | Watch { .. } | Unwatch => CommandFlags::TRANSACTION,

            ConfigSet { .. } | FlushAll => CommandFlags::ADMIN,
            SwapDb { .. } | ConfigGet { .. } | ConfigResetStat | DebugSleep { .. }
            | DebugObject { .. } | ScriptFlush | Reset => CommandFlags::ADMIN,

            _ => CommandFlags::empty(),
        }
    }
}

// --- Parsing ---

fn parse_ttl_opts(cursor: &mut Cursor, name: &str) -> Result<(TtlOption, bool), Error> {
    let mut ttl = TtlOption::None;
    let mut get = false;
    let mut condition_seen = false;
    let _ = &mut condition_seen;
    while let Some(tok) = cursor.peek() {
        if tok.eq_ignore_ascii_case(b"EX") {
            cursor.next();
            ttl = TtlOption::Seconds(extract_u64(cursor.next_required(name)?)?);
        } else if tok.eq_ignore_ascii_case(b"PX") {
            cursor.next();
            ttl = TtlOption::Millis(extract_u64(cursor.next_required(name)?)?);
        } else if tok.eq_ignore_ascii_case(b"EXAT") {
            cursor.next();
            ttl = TtlOption::UnixSeconds(extract_u64(cursor.next_required(name)?)?);
        } else if tok.eq_ignore_ascii_case(b"PXAT") {
            cursor.next();
            ttl = TtlOption::UnixMillis(extract_u64(cursor.next_required(name)?)?);
        } else if tok.eq_ignore_ascii_case(b"KEEPTTL") {
            cursor.next();
            ttl = TtlOption::KeepTtl;
        } else if tok.eq_ignore_ascii_case(b"GET") {
            cursor.next();
            get = true;
        } else {
            break;
        }
    }
    Ok((ttl, get))
}

fn parse_expire_condition(cursor: &mut Cursor) -> ExpireCondition {
    if cursor.eat_keyword("NX") {
        ExpireCondition::Nx
    } else if cursor.eat_keyword("XX") {
        ExpireCondition::Xx
    } else if cursor.eat_keyword("GT") {
        ExpireCondition::Gt
    } else if cursor.eat_keyword("LT") {
        ExpireCondition::Lt
    } else {
        ExpireCondition::None
    }
}

fn parse_score_boundary(b: &Bytes) -> Result<ScoreBoundary, Error> {
    let s = extract_string(b)?;
    if let Some(rest) = s.strip_prefix('(') {
        Ok(ScoreBoundary::Exclusive(rest.parse().map_err(|_| Error::NotAFloat)?))
    } else if s == "-inf" {
        Ok(ScoreBoundary::NegInfinity)
    } else if s == "+inf" || s == "inf" {
        Ok(ScoreBoundary::PosInfinity)
    } else {
        Ok(ScoreBoundary::Inclusive(s.parse().map_err(|_| Error::NotAFloat)?))
    }
}

fn parse_lex_boundary(b: &Bytes) -> Result<LexBoundary, Error> {
    if b.as_ref() == b"-" {
        Ok(LexBoundary::Min)
    } else if b.as_ref() == b"+" {
        Ok(LexBoundary::Max)
    } else if b.first() == Some(&b'[') {
        Ok(LexBoundary::Inclusive(b.slice(1..)))
    } else if b.first() == Some(&b'(') {
        Ok(LexBoundary::Exclusive(b.slice(1..)))
    } else {
        Err(Error::Syntax)
    }
}

fn parse_stream_id(s: &str, default_seq: u64) -> Result<StreamId, Error> {
    if s == "-" {
        return Ok(StreamId::MIN);
    }
    if s == "+" {
        return Ok(StreamId::MAX);
    }
    if let Some((ms, seq)) = s.split_once('-') {
        Ok(StreamId::new(ms.parse().map_err(|_| Error::Syntax)?, seq.parse().map_err(|_| Error::Syntax)?))
    } else {
        Ok(StreamId::new(s.parse().map_err(|_| Error::Syntax)?, default_seq))
    }
}

/// Parses a raw command name and argument vector into a typed `Command`.
pub fn parse(name: &str, args: Vec<Bytes>) -> Result<Command, Error> {
    let upper = name.to_ascii_uppercase();
    let mut c = Cursor::new(&args);
    let arity_err = || Error::Arity(name.to_ascii_lowercase());

    macro_rules! req {
        () => {
            c.next_required(&upper)?.clone()
        };
    }

    let cmd = match upper.as_str() {
        "GET" => Command::Get { key: req!() },
        "SET" => {
            let key = req!();
            let value = req!();
            let (ttl, get) = parse_ttl_opts(&mut c, "SET")?;
            let mut condition = SetCondition::None;
            if c.eat_keyword("NX") {
                condition = SetCondition::Nx;
            } else if c.eat_keyword("XX") {
                condition = SetCondition::Xx;
            } else if c.eat_keyword("IFEQ") {
                condition = SetCondition::IfEq(c.next_required("SET")?.clone());
            } else if c.eat_keyword("IFGT") {
                condition = SetCondition::IfGt(c.next_required("SET")?.clone());
            } else if c.eat_keyword("IFLT") {
                condition = SetCondition::IfLt(c.next_required("SET")?.clone());
            }
            Command::Set { key, value, ttl, condition, get }
        }
        "SETNX" => Command::SetNx { key: req!(), value: req!() },
        "SETEX" => Command::SetEx { key: req!(), seconds: extract_u64(&req!())?, value: req!() },
        "PSETEX" => Command::PSetEx { key: req!(), millis: extract_u64(&req!())?, value: req!() },
        "GETSET" => Command::GetSet { key: req!(), value: req!() },
        "GETDEL" => Command::GetDel { key: req!() },
        "GETEX" => {
            let key = req!();
            let (ttl, _) = parse_ttl_opts(&mut c, "GETEX")?;
            let ttl = if c.eat_keyword("PERSIST") { TtlOption::KeepTtl } else { ttl };
            Command::GetEx { key, ttl }
        }
        "APPEND" => Command::Append { key: req!(), value: req!() },
        "STRLEN" => Command::StrLen { key: req!() },
        "GETRANGE" | "SUBSTR" => {
            Command::GetRange { key: req!(), start: extract_i64(&req!())?, end: extract_i64(&req!())? }
        }
        "SETRANGE" => {
            Command::SetRange { key: req!(), offset: extract_usize(&req!())?, value: req!() }
        }
        "INCR" => Command::Incr { key: req!() },
        "DECR" => Command::Decr { key: req!() },
        "INCRBY" => Command::IncrBy { key: req!(), delta: extract_i64(&req!())? },
        "DECRBY" => Command::DecrBy { key: req!(), delta: extract_i64(&req!())? },
        "INCRBYFLOAT" => Command::IncrByFloat { key: req!(), delta: extract_f64(&req!())? },
        "MGET" => {
            if args.is_empty() {
                return Err(arity_err());
            }
            Command::MGet { keys: args }
        }
        "MSET" | "MSETNX" => {
            if args.is_empty() || args.len() % 2 != 0 {
                return Err(arity_err());
            }
            let pairs = args.chunks(2).map(|ch| (ch[0].clone(), ch[1].clone())).collect();
            if upper == "MSET" {
                Command::MSet { pairs }
            } else {
                Command::MSetNx { pairs }
            }
        }

        "SETBIT" => {
            Command::SetBit { key: req!(), offset: extract_usize(&req!())?, value: extract_usize(&req!())? as u8 }
        }
        "GETBIT" => Command::GetBit { key: req!(), offset: extract_usize(&req!())? },
        "BITCOUNT" => {
            let key = req!();
            let range = if !c.is_empty() {
                let start = extract_i64(&req!())?;
                let end = extract_i64(&req!())?;
                let unit = if c.eat_keyword("BIT") { BitUnit::Bit } else { c.eat_keyword("BYTE"); BitUnit::Byte };
                Some((start, end, unit))
            } else {
                None
            };
            Command::BitCount { key, range }
        }
        "BITOP" => {
            let op_tok = req!();
            let op_str = extract_string(&op_tok)?.to_ascii_uppercase();
            let op = match op_str.as_str() {
                "AND" => BitOpKind::And,
                "OR" => BitOpKind::Or,
                "XOR" => BitOpKind::Xor,
                "NOT" => BitOpKind::Not,
                _ => return Err(Error::Syntax),
            };
            let dest = req!();
            let keys = c.rest().to_vec();
            if keys.is_empty() {
                return Err(arity_err());
            }
            Command::BitOp { op, dest, keys }
        }
        "BITPOS" => {
            let key = req!();
            let bit = extract_usize(&req!())? as u8;
            let range = if !c.is_empty() {
                let start = extract_i64(&req!())?;
                let end = if !c.is_empty() && !matches!(c.peek().map(|b| b.eq_ignore_ascii_case(b"BIT") || b.eq_ignore_ascii_case(b"BYTE")), Some(true)) {
                    Some(extract_i64(&req!())?)
                } else {
                    None
                };
                let unit = if c.eat_keyword("BIT") { BitUnit::Bit } else { c.eat_keyword("BYTE"); BitUnit::Byte };
                Some((start, end, unit))
            } else {
                None
            };
            Command::BitPos { key, bit, range }
        }

        "DEL" | "UNLINK" => {
            if args.is_empty() {
                return Err(arity_err());
            }
            Command::Del { keys: args }
        }
        "EXISTS" => {
            if args.is_empty() {
                return Err(arity_err());
            }
            Command::Exists { keys: args }
        }
        "EXPIRE" => {
            let key = req!();
            let seconds = extract_i64(&req!())?;
            Command::Expire { key, seconds, condition: parse_expire_condition(&mut c) }
        }
        "PEXPIRE" => {
            let key = req!();
            let millis = extract_i64(&req!())?;
            Command::PExpire { key, millis, condition: parse_expire_condition(&mut c) }
        }
        "EXPIREAT" => {
            let key = req!();
            let unix_secs = extract_i64(&req!())?;
            Command::ExpireAt { key, unix_secs, condition: parse_expire_condition(&mut c) }
        }
        "PEXPIREAT" => {
            let key = req!();
            let unix_millis = extract_i64(&req!())?;
            Command::PExpireAt { key, unix_millis, condition: parse_expire_condition(&mut c) }
        }
        "TTL" => Command::Ttl { key: req!() },
        "PTTL" => Command::Pttl { key: req!() },
        "PERSIST" => Command::Persist { key: req!() },
        "KEYS" => Command::Keys { pattern: extract_string(&req!())? },
        "TYPE" => Command::TypeOf { key: req!() },
        "RENAME" => Command::Rename { src: req!(), dst: req!() },
        "RENAMENX" => Command::RenameNx { src: req!(), dst: req!() },
        "RANDOMKEY" => Command::RandomKey,
        "SCAN" => {
            let cursor = extract_u64(&req!())?;
            let mut pattern = None;
            let mut count = 10;
            let mut type_filter = None;
            while !c.is_empty() {
                if c.eat_keyword("MATCH") {
                    pattern = Some(extract_string(&req!())?);
                } else if c.eat_keyword("COUNT") {
                    count = extract_usize(&req!())?;
                } else if c.eat_keyword("TYPE") {
                    type_filter = Some(extract_string(&req!())?);
                } else {
                    return Err(Error::Syntax);
                }
            }
            Command::Scan { cursor, pattern, count, type_filter }
        }
        "DUMP" => Command::Dump { key: req!() },
        "RESTORE" => {
            let key = req!();
            let ttl_ms = extract_u64(&req!())?;
            let payload = req!();
            let replace = c.eat_keyword("REPLACE");
            Command::Restore { key, ttl_ms, payload, replace }
        }
        "COPY" => {
            let src = req!();
            let dst = req!();
            let mut replace = false;
            while !c.is_empty() {
                if c.eat_keyword("REPLACE") {
                    replace = true;
                } else if c.eat_keyword("DB") {
                    let _ = extract_usize(&req!())?;
                } else {
                    return Err(Error::Syntax);
                }
            }
            Command::Copy { src, dst, replace }
        }

        "LPUSH" | "LPUSHX" => {
            let key = req!();
            let values = c.rest().to_vec();
            if values.is_empty() {
                return Err(arity_err());
            }
            Command::LPush { key, values, only_if_exists: upper == "LPUSHX" }
        }
        "RPUSH" | "RPUSHX" => {
            let key = req!();
            let values = c.rest().to_vec();
            if values.is_empty() {
                return Err(arity_err());
            }
            Command::RPush { key, values, only_if_exists: upper == "RPUSHX" }
        }
        "LPOP" => {
            let key = req!();
            let count = if !c.is_empty() { Some(extract_usize(&req!())?) } else { None };
            Command::LPop { key, count }
        }
        "RPOP" => {
            let key = req!();
            let count = if !c.is_empty() { Some(extract_usize(&req!())?) } else { None };
            Command::RPop { key, count }
        }
        "LLEN" => Command::LLen { key: req!() },
        "LRANGE" => Command::LRange { key: req!(), start: extract_i64(&req!())?, stop: extract_i64(&req!())? },
        "LINDEX" => Command::LIndex { key: req!(), index: extract_i64(&req!())? },
        "LSET" => Command::LSet { key: req!(), index: extract_i64(&req!())?, value: req!() },
        "LINSERT" => {
            let key = req!();
            let where_tok = req!();
            let before = if where_tok.eq_ignore_ascii_case(b"BEFORE") {
                true
            } else if where_tok.eq_ignore_ascii_case(b"AFTER") {
                false
            } else {
                return Err(Error::Syntax);
            };
            Command::LInsert { key, before, pivot: req!(), value: req!() }
        }
        "LTRIM" => Command::LTrim { key: req!(), start: extract_i64(&req!())?, stop: extract_i64(&req!())? },
        "LREM" => Command::LRem { key: req!(), count: extract_i64(&req!())?, value: req!() },
        "LPOS" => {
            let key = req!();
            let element = req!();
            let mut rank = None;
            let mut count = None;
            let mut maxlen = None;
            while !c.is_empty() {
                if c.eat_keyword("RANK") {
                    rank = Some(extract_i64(&req!())?);
                } else if c.eat_keyword("COUNT") {
                    count = Some(extract_usize(&req!())?);
                } else if c.eat_keyword("MAXLEN") {
                    maxlen = Some(extract_usize(&req!())?);
                } else {
                    return Err(Error::Syntax);
                }
            }
            Command::LPos { key, element, rank, count, maxlen }
        }
        "LMOVE" => {
            let src = req!();
            let dst = req!();
            let from_left = parse_left_right(&req!())?;
            let to_left = parse_left_right(&req!())?;
            Command::LMove { src, dst, from_left, to_left }
        }
        "RPOPLPUSH" => Command::RPopLPush { src: req!(), dst: req!() },
        "BLPOP" => {
            if args.len() < 2 {
                return Err(arity_err());
            }
            let timeout_ms = parse_timeout_secs(&args[args.len() - 1])?;
            Command::BLPop { keys: args[..args.len() - 1].to_vec(), timeout_ms }
        }
        "BRPOP" => {
            if args.len() < 2 {
                return Err(arity_err());
            }
            let timeout_ms = parse_timeout_secs(&args[args.len() - 1])?;
            Command::BRPop { keys: args[..args.len() - 1].to_vec(), timeout_ms }
        }
        "BLMOVE" => {
            let src = req!();
            let dst = req!();
            let from_left = parse_left_right(&req!())?;
            let to_left = parse_left_right(&req!())?;
            let timeout_ms = parse_timeout_secs(&req!())?;
            Command::BLMove { src, dst, from_left, to_left, timeout_ms }
        }
        "BRPOPLPUSH" => {
            let src = req!();
            let dst = req!();
            let timeout_ms = parse_timeout_secs(&req!())?;
            Command::BRPopLPush { src, dst, timeout_ms }
        }

        "HSET" | "HMSET" => {
            let key = req!();
            let rest = c.rest();
            if rest.is_empty() || rest.len() % 2 != 0 {
                return Err(arity_err());
            }
            let fields = rest.chunks(2).map(|ch| (ch[0].clone(), ch[1].clone())).collect();
            Command::HSet { key, fields }
        }
        "HSETNX" => Command::HSetNx { key: req!(), field: req!(), value: req!() },
        "HGET" => Command::HGet { key: req!(), field: req!() },
        "HGETALL" => Command::HGetAll { key: req!() },
        "HDEL" => {
            let key = req!();
            let fields = c.rest().to_vec();
            if fields.is_empty() {
                return Err(arity_err());
            }
            Command::HDel { key, fields }
        }
        "HEXISTS" => Command::HExists { key: req!(), field: req!() },
        "HLEN" => Command::HLen { key: req!() },
        "HKEYS" => Command::HKeys { key: req!() },
        "HVALS" => Command::HVals { key: req!() },
        "HINCRBY" => Command::HIncrBy { key: req!(), field: req!(), delta: extract_i64(&req!())? },
        "HINCRBYFLOAT" => Command::HIncrByFloat { key: req!(), field: req!(), delta: extract_f64(&req!())? },
        "HMGET" => {
            let key = req!();
            let fields = c.rest().to_vec();
            if fields.is_empty() {
                return Err(arity_err());
            }
            Command::HMGet { key, fields }
        }
        "HRANDFIELD" => {
            let key = req!();
            let count = if !c.is_empty() { Some(extract_i64(&req!())?) } else { None };
            let withvalues = c.eat_keyword("WITHVALUES");
            Command::HRandField { key, count, withvalues }
        }
        "HSTRLEN" => Command::HStrLen { key: req!(), field: req!() },
        "HEXPIRE" | "HPEXPIRE" => {
            let key = req!();
            let amount = extract_i64(&req!())?;
            let condition = parse_expire_condition(&mut c);
            if !c.eat_keyword("FIELDS") {
                return Err(Error::Syntax);
            }
            let _numfields = extract_usize(&req!())?;
            let fields = c.rest().to_vec();
            Command::HExpire { key, millis: amount, fields, condition, unit: if upper == "HPEXPIRE" { TimeUnit::Millis } else { TimeUnit::Seconds } }
        }
        "HEXPIREAT" | "HPEXPIREAT" => {
            let key = req!();
            let amount = extract_i64(&req!())?;
            let condition = parse_expire_condition(&mut c);
            if !c.eat_keyword("FIELDS") {
                return Err(Error::Syntax);
            }
            let _numfields = extract_usize(&req!())?;
            let fields = c.rest().to_vec();
            Command::HExpireAt { key, at_millis: amount, fields, condition, unit: if upper == "HPEXPIREAT" { TimeUnit::Millis } else { TimeUnit::Seconds } }
        }
        "HPERSIST" => {
            let key = req!();
            if !c.eat_keyword("FIELDS") {
                return Err(Error::Syntax);
            }
            let _numfields = extract_usize(&req!())?;
            Command::HPersist { key, fields: c.rest().to_vec() }
        }
        "HTTL" | "HPTTL" => {
            let key = req!();
            if !c.eat_keyword("FIELDS") {
                return Err(Error::Syntax);
            }
            let _numfields = extract_usize(&req!())?;
            Command::HTtl { key, fields: c.rest().to_vec(), unit: if upper == "HPTTL" { TimeUnit::Millis } else { TimeUnit::Seconds } }
        }

        "SADD" => {
            let key = req!();
            let members = c.rest().to_vec();
            if members.is_empty() {
                return Err(arity_err());
            }
            Command::SAdd { key, members }
        }
        "SREM" => {
            let key = req!();
            let members = c.rest().to_vec();
            if members.is_empty() {
                return Err(arity_err());
            }
            Command::SRem { key, members }
        }
        "SMEMBERS" => Command::SMembers { key: req!() },
        "SISMEMBER" => Command::SIsMember { key: req!(), member: req!() },
        "SMISMEMBER" => {
            let key = req!();
            let members = c.rest().to_vec();
            Command::SMIsMember { key, members }
        }
        "SCARD" => Command::SCard { key: req!() },
        "SPOP" => {
            let key = req!();
            let count = if !c.is_empty() { Some(extract_usize(&req!())?) } else { None };
            Command::SPop { key, count }
        }
        "SRANDMEMBER" => {
            let key = req!();
            let count = if !c.is_empty() { Some(extract_i64(&req!())?) } else { None };
            Command::SRandMember { key, count }
        }
        "SMOVE" => Command::SMove { src: req!(), dst: req!(), member: req!() },
        "SUNION" | "SINTER" | "SDIFF" => {
            let keys = args.clone();
            if keys.is_empty() {
                return Err(arity_err());
            }
            Command::SetOp { kind: set_op_kind(&upper), dest: None, keys }
        }
        "SUNIONSTORE" | "SINTERSTORE" | "SDIFFSTORE" => {
            let dest = req!();
            let keys = c.rest().to_vec();
            if keys.is_empty() {
                return Err(arity_err());
            }
            Command::SetOp { kind: set_op_kind(&upper), dest: Some(dest), keys }
        }

        "ZADD" => {
            let key = req!();
            let mut condition = ZAddCondition::None;
            let mut ch = false;
            let mut incr = false;
            loop {
                if c.eat_keyword("NX") {
                    condition = ZAddCondition::Nx;
                } else if c.eat_keyword("GT") {
                    condition = ZAddCondition::Gt;
                } else if c.eat_keyword("LT") {
                    condition = ZAddCondition::Lt;
                } else if c.eat_keyword("XX") {
                    if condition == ZAddCondition::Gt {
                        condition = ZAddCondition::XxGt;
                    } else if condition == ZAddCondition::Lt {
                        condition = ZAddCondition::XxLt;
                    }
                } else if c.eat_keyword("CH") {
                    ch = true;
                } else if c.eat_keyword("INCR") {
                    incr = true;
                } else {
                    break;
                }
            }
            let rest = c.rest();
            if rest.is_empty() || rest.len() % 2 != 0 {
                return Err(arity_err());
            }
            let mut members = Vec::with_capacity(rest.len() / 2);
            for ch2 in rest.chunks(2) {
                members.push((extract_f64(&ch2[0])?, ch2[1].clone()));
            }
            Command::ZAdd { key, members, condition, ch, incr }
        }
        "ZREM" => {
            let key = req!();
            let members = c.rest().to_vec();
            if members.is_empty() {
                return Err(arity_err());
            }
            Command::ZRem { key, members }
        }
        "ZSCORE" => Command::ZScore { key: req!(), member: req!() },
        "ZMSCORE" => {
            let key = req!();
            Command::ZMScore { key, members: c.rest().to_vec() }
        }
        "ZCARD" => Command::ZCard { key: req!() },
        "ZCOUNT" => {
            let key = req!();
            Command::ZCount { key, min: parse_score_boundary(&req!())?, max: parse_score_boundary(&req!())? }
        }
        "ZLEXCOUNT" => {
            let key = req!();
            Command::ZLexCount { key, min: parse_lex_boundary(&req!())?, max: parse_lex_boundary(&req!())? }
        }
        "ZINCRBY" => Command::ZIncrBy { key: req!(), delta: extract_f64(&req!())?, member: req!() },
        "ZRANK" => {
            let key = req!();
            let member = req!();
            Command::ZRank { key, member, withscore: c.eat_keyword("WITHSCORE") }
        }
        "ZREVRANK" => {
            let key = req!();
            let member = req!();
            Command::ZRevRank { key, member, withscore: c.eat_keyword("WITHSCORE") }
        }
        "ZRANGE" => {
            let key = req!();
            let a = req!();
            let b = req!();
            let mut rev = false;
            let mut by_score = false;
            let mut by_lex = false;
            let mut limit = None;
            let mut withscores = false;
            while !c.is_empty() {
                if c.eat_keyword("REV") {
                    rev = true;
                } else if c.eat_keyword("BYSCORE") {
                    by_score = true;
                } else if c.eat_keyword("BYLEX") {
                    by_lex = true;
                } else if c.eat_keyword("WITHSCORES") {
                    withscores = true;
                } else if c.eat_keyword("LIMIT") {
                    limit = Some((extract_i64(&req!())?, extract_i64(&req!())?));
                } else {
                    return Err(Error::Syntax);
                }
            }
            let by = if by_score {
                RangeBy::Score(parse_score_boundary(&a)?, parse_score_boundary(&b)?)
            } else if by_lex {
                RangeBy::Lex(parse_lex_boundary(&a)?, parse_lex_boundary(&b)?)
            } else {
                RangeBy::Index(extract_i64(&a)?, extract_i64(&b)?)
            };
            Command::ZRange { key, by, rev, limit, withscores }
        }
        "ZREVRANGE" => {
            let key = req!();
            let start = extract_i64(&req!())?;
            let stop = extract_i64(&req!())?;
            let withscores = c.eat_keyword("WITHSCORES");
            Command::ZRange { key, by: RangeBy::Index(start, stop), rev: true, limit: None, withscores }
        }
        "ZRANGEBYSCORE" | "ZREVRANGEBYSCORE" => {
            let key = req!();
            let first = req!();
            let second = req!();
            let rev = upper == "ZREVRANGEBYSCORE";
            let (min_tok, max_tok) = if rev { (second.clone(), first.clone()) } else { (first.clone(), second.clone()) };
            let mut withscores = false;
            let mut limit = None;
            while !c.is_empty() {
                if c.eat_keyword("WITHSCORES") {
                    withscores = true;
                } else if c.eat_keyword("LIMIT") {
                    limit = Some((extract_i64(&req!())?, extract_i64(&req!())?));
                } else {
                    return Err(Error::Syntax);
                }
            }
            Command::ZRange {
                key,
                by: RangeBy::Score(parse_score_boundary(&min_tok)?, parse_score_boundary(&max_tok)?),
                rev,
                limit,
                withscores,
            }
        }
        "ZRANGEBYLEX" | "ZREVRANGEBYLEX" => {
            let key = req!();
            let first = req!();
            let second = req!();
            let rev = upper == "ZREVRANGEBYLEX";
            let (min_tok, max_tok) = if rev { (second.clone(), first.clone()) } else { (first.clone(), second.clone()) };
            let mut limit = None;
            while !c.is_empty() {
                if c.eat_keyword("LIMIT") {
                    limit = Some((extract_i64(&req!())?, extract_i64(&req!())?));
                } else {
                    return Err(Error::Syntax);
                }
            }
            Command::ZRange {
                key,
                by: RangeBy::Lex(parse_lex_boundary(&min_tok)?, parse_lex_boundary(&max_tok)?),
                rev,
                limit,
                withscores: false,
            }
        }
        "ZRANGESTORE" => {
            let dest = req!();
            let key = req!();
            let a = req!();
            let b = req!();
            let mut rev = false;
            let mut by_score = false;
            let mut by_lex = false;
            let mut limit = None;
            while !c.is_empty() {
                if c.eat_keyword("REV") {
                    rev = true;
                } else if c.eat_keyword("BYSCORE") {
                    by_score = true;
                } else if c.eat_keyword("BYLEX") {
                    by_lex = true;
                } else if c.eat_keyword("LIMIT") {
                    limit = Some((extract_i64(&req!())?, extract_i64(&req!())?));
                } else {
                    return Err(Error::Syntax);
                }
            }
            let by = if by_score {
                RangeBy::Score(parse_score_boundary(&a)?, parse_score_boundary(&b)?)
            } else if by_lex {
                RangeBy::Lex(parse_lex_boundary(&a)?, parse_lex_boundary(&b)?)
            } else {
                RangeBy::Index(extract_i64(&a)?, extract_i64(&b)?)
            };
            Command::ZRangeStore { dest, key, by, rev, limit }
        }
        "ZREMRANGEBYRANK" => Command::ZRemRangeByRank { key: req!(), start: extract_i64(&req!())?, stop: extract_i64(&req!())? },
        "ZREMRANGEBYSCORE" => {
            let key = req!();
            Command::ZRemRangeByScore { key, min: parse_score_boundary(&req!())?, max: parse_score_boundary(&req!())? }
        }
        "ZREMRANGEBYLEX" => {
            let key = req!();
            Command::ZRemRangeByLex { key, min: parse_lex_boundary(&req!())?, max: parse_lex_boundary(&req!())? }
        }
        "ZPOPMIN" => {
            let key = req!();
            let count = if !c.is_empty() { Some(extract_usize(&req!())?) } else { None };
            Command::ZPopMin { key, count }
        }
        "ZPOPMAX" => {
            let key = req!();
            let count = if !c.is_empty() { Some(extract_usize(&req!())?) } else { None };
            Command::ZPopMax { key, count }
        }
        "BZPOPMIN" => {
            if args.len() < 2 {
                return Err(arity_err());
            }
            let timeout_ms = parse_timeout_secs(&args[args.len() - 1])?;
            Command::BZPopMin { keys: args[..args.len() - 1].to_vec(), timeout_ms }
        }
        "BZPOPMAX" => {
            if args.len() < 2 {
                return Err(arity_err());
            }
            let timeout_ms = parse_timeout_secs(&args[args.len() - 1])?;
            Command::BZPopMax { keys: args[..args.len() - 1].to_vec(), timeout_ms }
        }
        "ZUNIONSTORE" | "ZINTERSTORE" | "ZDIFFSTORE" => {
            let dest = req!();
            let numkeys = extract_usize(&req!())?;
            let mut keys = Vec::with_capacity(numkeys);
            for _ in 0..numkeys {
                keys.push(req!());
            }
            let (weights, aggregate) = parse_zset_op_opts(&mut c)?;
            Command::ZSetOp { kind: zset_op_kind(&upper), dest: Some(dest), keys, weights, aggregate, withscores: false }
        }
        "ZUNION" | "ZINTER" | "ZDIFF" => {
            let numkeys = extract_usize(&req!())?;
            let mut keys = Vec::with_capacity(numkeys);
            for _ in 0..numkeys {
                keys.push(req!());
            }
            let (weights, aggregate) = parse_zset_op_opts(&mut c)?;
            let withscores = c.eat_keyword("WITHSCORES");
            Command::ZSetOp { kind: zset_op_kind(&upper), dest: None, keys, weights, aggregate, withscores }
        }

        "XADD" => {
            let key = req!();
            let mut nomkstream = false;
            let mut trim = None;
            loop {
                if c.eat_keyword("NOMKSTREAM") {
                    nomkstream = true;
                } else if let Some(t) = parse_stream_trim_opt(&mut c)? {
                    trim = Some(t);
                } else {
                    break;
                }
            }
            let id_tok = req!();
            let id_spec = if id_tok.as_ref() == b"*" { None } else { Some(parse_stream_id(&extract_string(&id_tok)?, 0)?) };
            let rest = c.rest();
            if rest.is_empty() || rest.len() % 2 != 0 {
                return Err(arity_err());
            }
            let fields = rest.chunks(2).map(|ch| (ch[0].clone(), ch[1].clone())).collect();
            Command::XAdd { key, id_spec, nomkstream, trim, fields }
        }
        "XLEN" => Command::XLen { key: req!() },
        "XRANGE" | "XREVRANGE" => {
            let key = req!();
            let first = extract_string(&req!())?;
            let second = extract_string(&req!())?;
            let mut count = None;
            if c.eat_keyword("COUNT") {
                count = Some(extract_usize(&req!())?);
            }
            let (start_s, end_s) = if upper == "XREVRANGE" { (second, first) } else { (first, second) };
            let start_excl = start_s.starts_with('(');
            let end_excl = end_s.starts_with('(');
            let start = parse_stream_id(start_s.trim_start_matches('('), 0)?;
            let end = parse_stream_id(end_s.trim_start_matches('('), u64::MAX)?;
            if upper == "XREVRANGE" {
                Command::XRevRange { key, end, end_exclusive: end_excl, start, start_exclusive: start_excl, count }
            } else {
                Command::XRange { key, start, start_exclusive: start_excl, end, end_exclusive: end_excl, count }
            }
        }
        "XDEL" => {
            let key = req!();
            let mut ids = Vec::new();
            while !c.is_empty() {
                ids.push(parse_stream_id(&extract_string(&req!())?, 0)?);
            }
            Command::XDel { key, ids }
        }
        "XTRIM" => {
            let key = req!();
            let trim = parse_stream_trim_opt(&mut c)?.ok_or(Error::Syntax)?;
            Command::XTrim { key, trim }
        }
        "XGROUP" => {
            let sub = extract_string(&req!())?.to_ascii_uppercase();
            match sub.as_str() {
                "CREATE" => {
                    let key = req!();
                    let group = req!();
                    let id_tok = extract_string(&req!())?;
                    let use_last = id_tok == "$";
                    let id_spec = if use_last { StreamId::MIN } else { parse_stream_id(&id_tok, 0)? };
                    let mkstream = c.eat_keyword("MKSTREAM");
                    Command::XGroupCreate { key, group, id_spec, use_last, mkstream }
                }
                "DESTROY" => Command::XGroupDestroy { key: req!(), group: req!() },
                "CREATECONSUMER" => Command::XGroupCreateConsumer { key: req!(), group: req!(), consumer: req!() },
                "DELCONSUMER" => Command::XGroupDelConsumer { key: req!(), group: req!(), consumer: req!() },
                "SETID" => {
                    let key = req!();
                    let group = req!();
                    let id_tok = extract_string(&req!())?;
                    let use_last = id_tok == "$";
                    let id_spec = if use_last { StreamId::MIN } else { parse_stream_id(&id_tok, 0)? };
                    Command::XGroupSetId { key, group, id_spec, use_last }
                }
                _ => return Err(Error::Syntax),
            }
        }
        "XREADGROUP" => {
            if !c.eat_keyword("GROUP") {
                return Err(Error::Syntax);
            }
            let group = req!();
            let consumer = req!();
            let mut count = None;
            let mut block_ms = None;
            let mut noack = false;
            loop {
                if c.eat_keyword("COUNT") {
                    count = Some(extract_usize(&req!())?);
                } else if c.eat_keyword("BLOCK") {
                    block_ms = Some(extract_u64(&req!())?);
                } else if c.eat_keyword("NOACK") {
                    noack = true;
                } else {
                    break;
                }
            }
            if !c.eat_keyword("STREAMS") {
                return Err(Error::Syntax);
            }
            let rest = c.rest();
            if rest.is_empty() || rest.len() % 2 != 0 {
                return Err(arity_err());
            }
            let n = rest.len() / 2;
            let keys = rest[..n].to_vec();
            let mut ids = Vec::with_capacity(n);
            for tok in &rest[n..] {
                let s = extract_string(tok)?;
                ids.push(if s == ">" { StreamId::MAX } else { parse_stream_id(&s, 0)? });
            }
            Command::XReadGroup { group, consumer, keys, ids, count, block_ms, noack }
        }
        "XREAD" => {
            let mut count = None;
            let mut block_ms = None;
            loop {
                if c.eat_keyword("COUNT") {
                    count = Some(extract_usize(&req!())?);
                } else if c.eat_keyword("BLOCK") {
                    block_ms = Some(extract_u64(&req!())?);
                } else {
                    break;
                }
            }
            if !c.eat_keyword("STREAMS") {
                return Err(Error::Syntax);
            }
            let rest = c.rest();
            if rest.is_empty() || rest.len() % 2 != 0 {
                return Err(arity_err());
            }
            let n = rest.len() / 2;
            let keys = rest[..n].to_vec();
            let mut ids = Vec::with_capacity(n);
            for tok in &rest[n..] {
                let s = extract_string(tok)?;
                ids.push(if s == "$" { StreamId::MAX } else { parse_stream_id(&s, 0)? });
            }
            Command::XRead { keys, ids, count, block_ms }
        }
        "XACK" => {
            let key = req!();
            let group = req!();
            let mut ids = Vec::new();
            while !c.is_empty() {
                ids.push(parse_stream_id(&extract_string(&req!())?, 0)?);
            }
            Command::XAck { key, group, ids }
        }
        "XPENDING" => {
            let key = req!();
            let group = req!();
            let extended = if !c.is_empty() {
                let min = parse_stream_id(&extract_string(&req!())?, 0)?;
                let max = parse_stream_id(&extract_string(&req!())?, u64::MAX)?;
                let count = extract_usize(&req!())?;
                let consumer = if !c.is_empty() { Some(req!()) } else { None };
                Some((min, max, count, consumer))
            } else {
                None
            };
            Command::XPending { key, group, extended }
        }
        "XCLAIM" => {
            let key = req!();
            let group = req!();
            let consumer = req!();
            let min_idle_ms = extract_u64(&req!())?;
            let mut ids = Vec::new();
            while !c.is_empty() && !matches!(c.peek(), Some(b) if b.eq_ignore_ascii_case(b"IDLE") || b.eq_ignore_ascii_case(b"JUSTID") || b.eq_ignore_ascii_case(b"TIME") || b.eq_ignore_ascii_case(b"RETRYCOUNT") || b.eq_ignore_ascii_case(b"FORCE") || b.eq_ignore_ascii_case(b"LASTID")) {
                ids.push(parse_stream_id(&extract_string(&req!())?, 0)?);
            }
            let mut justid = false;
            while !c.is_empty() {
                if c.eat_keyword("JUSTID") {
                    justid = true;
                } else if c.eat_keyword("FORCE") {
                } else if c.eat_keyword("IDLE") {
                    let _ = extract_u64(&req!())?;
                } else if c.eat_keyword("TIME") {
                    let _ = extract_u64(&req!())?;
                } else if c.eat_keyword("RETRYCOUNT") {
                    let _ = extract_u64(&req!())?;
                } else if c.eat_keyword("LASTID") {
                    let _ = req!();
                } else {
                    return Err(Error::Syntax);
                }
            }
            Command::XClaim { key, group, consumer, min_idle_ms, ids, justid }
        }
        "XAUTOCLAIM" => {
            let key = req!();
            let group = req!();
            let consumer = req!();
            let min_idle_ms = extract_u64(&req!())?;
            let start = parse_stream_id(&extract_string(&req!())?, 0)?;
            let mut count = 100;
            let mut justid = false;
            while !c.is_empty() {
                if c.eat_keyword("COUNT") {
                    count = extract_usize(&req!())?;
                } else if c.eat_keyword("JUSTID") {
                    justid = true;
                } else {
                    return Err(Error::Syntax);
                }
            }
            Command::XAutoClaim { key, group, consumer, min_idle_ms, start, count, justid }
        }
        "XINFO" => {
            let sub = extract_string(&req!())?.to_ascii_uppercase();
            match sub.as_str() {
                "STREAM" => Command::XInfoStream { key: req!() },
                "GROUPS" => Command::XInfoGroups { key: req!() },
                "CONSUMERS" => Command::XInfoConsumers { key: req!(), group: req!() },
                _ => return Err(Error::Syntax),
            }
        }

        "SUBSCRIBE" => {
            if args.is_empty() {
                return Err(arity_err());
            }
            Command::Subscribe { channels: args }
        }
        "UNSUBSCRIBE" => Command::Unsubscribe { channels: args },
        "PSUBSCRIBE" => {
            if args.is_empty() {
                return Err(arity_err());
            }
            Command::PSubscribe { patterns: args }
        }
        "PUNSUBSCRIBE" => Command::PUnsubscribe { patterns: args },
        "SSUBSCRIBE" => {
            if args.is_empty() {
                return Err(arity_err());
            }
            Command::SSubscribe { channels: args }
        }
        "SUNSUBSCRIBE" => Command::SUnsubscribe { channels: args },
        "PUBLISH" => Command::Publish { channel: req!(), message: req!() },
        "SPUBLISH" => Command::SPublish { channel: req!(), message: req!() },
        "PUBSUB" => {
            let sub = extract_string(&req!())?.to_ascii_uppercase();
            match sub.as_str() {
                "CHANNELS" => Command::PubSubChannels { pattern: if !c.is_empty() { Some(extract_string(&req!())?) } else { None } },
                "NUMSUB" => Command::PubSubNumSub { channels: c.rest().to_vec() },
                "NUMPAT" => Command::PubSubNumPat,
                "SHARDCHANNELS" => Command::PubSubShardChannels { pattern: if !c.is_empty() { Some(extract_string(&req!())?) } else { None } },
                "SHARDNUMSUB" => Command::PubSubShardNumSub { channels: c.rest().to_vec() },
                _ => return Err(Error::Syntax),
            }
        }

        "MULTI" => Command::Multi,
        "EXEC" => Command::Exec,
        "DISCARD" => Command::Discard,
        "WATCH" => {
            if args.is_empty() {
                return Err(arity_err());
            }
            Command::Watch { keys: args }
        }
        "UNWATCH" => Command::Unwatch,

        "EVAL" => {
            let script = req!();
            let numkeys = extract_usize(&req!())?;
            let mut keys = Vec::with_capacity(numkeys);
            for _ in 0..numkeys {
                keys.push(req!());
            }
            Command::Eval { script, keys, argv: c.rest().to_vec() }
        }
        "EVALSHA" => {
            let sha1 = extract_string(&req!())?.to_ascii_lowercase();
            let numkeys = extract_usize(&req!())?;
            let mut keys = Vec::with_capacity(numkeys);
            for _ in 0..numkeys {
                keys.push(req!());
            }
            Command::EvalSha { sha1, keys, argv: c.rest().to_vec() }
        }
        "SCRIPT" => {
            let sub = extract_string(&req!())?.to_ascii_uppercase();
            match sub.as_str() {
                "LOAD" => Command::ScriptLoad { script: req!() },
                "EXISTS" => {
                    let mut shas = Vec::new();
                    while !c.is_empty() {
                        shas.push(extract_string(&req!())?.to_ascii_lowercase());
                    }
                    Command::ScriptExists { shas }
                }
                "FLUSH" => Command::ScriptFlush,
                _ => return Err(Error::Syntax),
            }
        }

        "PING" => Command::Ping { message: if !c.is_empty() { Some(req!()) } else { None } },
        "ECHO" => Command::Echo { message: req!() },
        "AUTH" => {
            if c.remaining() == 2 {
                Command::Auth { username: Some(req!()), password: req!() }
            } else {
                Command::Auth { username: None, password: req!() }
            }
        }
        "HELLO" => {
            let protover = if !c.is_empty() && !matches!(c.peek(), Some(b) if b.eq_ignore_ascii_case(b"AUTH") || b.eq_ignore_ascii_case(b"SETNAME")) {
                Some(extract_usize(&req!())? as u8)
            } else {
                None
            };
            let mut auth = None;
            let mut setname = None;
            while !c.is_empty() {
                if c.eat_keyword("AUTH") {
                    auth = Some((req!(), req!()));
                } else if c.eat_keyword("SETNAME") {
                    setname = Some(req!());
                } else {
                    return Err(Error::Syntax);
                }
            }
            Command::Hello { protover, auth, setname }
        }
        "SELECT" => Command::Select { index: extract_usize(&req!())? },
        "SWAPDB" => Command::SwapDb { a: extract_usize(&req!())?, b: extract_usize(&req!())? },
        "FLUSHDB" => Command::FlushDb,
        "FLUSHALL" => Command::FlushAll,
        "DBSIZE" => Command::DbSize,
        "INFO" => Command::Info { section: if !c.is_empty() { Some(extract_string(&req!())?) } else { None } },
        "CLIENT" => {
            let sub = extract_string(&req!())?.to_ascii_uppercase();
            match sub.as_str() {
                "GETNAME" => Command::ClientGetName,
                "SETNAME" => Command::ClientSetName { name: req!() },
                "ID" => Command::ClientId,
                "LIST" => Command::ClientList,
                "INFO" => Command::ClientList,
                "NO-EVICT" => Command::ClientNoEvict { on: req!().eq_ignore_ascii_case(b"ON") },
                "NO-TOUCH" => Command::ClientNoTouch { on: req!().eq_ignore_ascii_case(b"ON") },
                _ => return Err(Error::Syntax),
            }
        }
        "CONFIG" => {
            let sub = extract_string(&req!())?.to_ascii_uppercase();
            match sub.as_str() {
                "GET" => Command::ConfigGet { pattern: extract_string(&req!())? },
                "SET" => {
                    let rest = c.rest();
                    if rest.is_empty() || rest.len() % 2 != 0 {
                        return Err(arity_err());
                    }
                    let mut pairs = Vec::new();
                    for ch in rest.chunks(2) {
                        pairs.push((extract_string(&ch[0])?, extract_string(&ch[1])?));
                    }
                    Command::ConfigSet { pairs }
                }
                "RESETSTAT" => Command::ConfigResetStat,
                _ => return Err(Error::Syntax),
            }
        }
        "DEBUG" => {
            let sub = extract_string(&req!())?.to_ascii_uppercase();
            match sub.as_str() {
                "SLEEP" => Command::DebugSleep { seconds: extract_f64(&req!())? },
                "OBJECT" => Command::DebugObject { key: req!() },
                "JMAP" => Command::Time,
                _ => Command::Time,
            }
        }
        "TIME" => Command::Time,
        "COMMAND" => {
            if c.eat_keyword("COUNT") {
                Command::CommandCount
            } else {
                Command::CommandDocs
            }
        }
        "RESET" => Command::Reset,
        "QUIT" => Command::Quit,

        "PFADD" => {
            let key = req!();
            Command::PfAdd { key, elements: c.rest().to_vec() }
        }
        "PFCOUNT" => {
            if args.is_empty() {
                return Err(arity_err());
            }
            Command::PfCount { keys: args }
        }
        "PFMERGE" => {
            let dest = req!();
            Command::PfMerge { dest, keys: c.rest().to_vec() }
        }

        "HSCAN" => {
            let key = req!();
            let cursor = extract_u64(&req!())?;
            let (pattern, count, novalues) = parse_scan_opts(&mut c, true)?;
            Command::HScan { key, cursor, pattern, count, novalues }
        }
        "SSCAN" => {
            let key = req!();
            let cursor = extract_u64(&req!())?;
            let (pattern, count, _) = parse_scan_opts(&mut c, false)?;
            Command::SScan { key, cursor, pattern, count }
        }
        "ZSCAN" => {
            let key = req!();
            let cursor = extract_u64(&req!())?;
            let (pattern, count, _) = parse_scan_opts(&mut c, false)?;
            Command::ZScan { key, cursor, pattern, count }
        }

        _ => return Err(Error::UnknownCommand(name.to_string())),
    };
    Ok(cmd)
}

fn parse_scan_opts(c: &mut Cursor, allow_novalues: bool) -> Result<(Option<String>, usize, bool), Error> {
    let mut pattern = None;
    let mut count = 10;
    let mut novalues = false;
    while !c.is_empty() {
        if c.eat_keyword("MATCH") {
            pattern = Some(extract_string(c.next_required("SCAN")?)?);
        } else if c.eat_keyword("COUNT") {
            count = extract_usize(c.next_required("SCAN")?)?;
        } else if allow_novalues && c.eat_keyword("NOVALUES") {
            novalues = true;
        } else {
            return Err(Error::Syntax);
        }
    }
    Ok((pattern, count, novalues))
}

fn parse_left_right(b: &Bytes) -> Result<bool, Error> {
    if b.eq_ignore_ascii_case(b"LEFT") {
        Ok(true)
    } else if b.eq_ignore_ascii_case(b"RIGHT") {
        Ok(false)
    } else {
        Err(Error::Syntax)
    }
}

fn parse_timeout_secs(b: &Bytes) -> Result<Option<u64>, Error> {
    let f = extract_f64(b)?;
    if f < 0.0 {
        return Err(Error::Range("timeout is negative".into()));
    }
    if f == 0.0 {
        Ok(None)
    } else {
        Ok(Some((f * 1000.0) as u64))
    }
}

fn set_op_kind(name: &str) -> SetOpKind {
    if name.starts_with("SUNION") {
        SetOpKind::Union
    } else if name.starts_with("SINTER") {
        SetOpKind::Inter
    } else {
        SetOpKind::Diff
    }
}

fn zset_op_kind(name: &str) -> SetOpKind {
    if name.starts_with("ZUNION") {
        SetOpKind::Union
    } else if name.starts_with("ZINTER") {
        SetOpKind::Inter
    } else {
        SetOpKind::Diff
    }
}

fn parse_zset_op_opts(c: &mut Cursor) -> Result<(Option<Vec<f64>>, Aggregate), Error> {
    let mut weights = None;
    let mut aggregate = Aggregate::Sum;
    loop {
        if c.eat_keyword("WEIGHTS") {
            let mut w = Vec::new();
            while let Some(b) = c.peek() {
                if let Ok(f) = extract_f64(b) {
                    w.push(f);
                    c.next();
                } else {
                    break;
                }
            }
            weights = Some(w);
        } else if c.eat_keyword("AGGREGATE") {
            let tok = c.next_required("ZSETOP")?;
            aggregate = if tok.eq_ignore_ascii_case(b"MIN") {
                Aggregate::Min
            } else if tok.eq_ignore_ascii_case(b"MAX") {
                Aggregate::Max
            } else {
                Aggregate::Sum
            };
        } else {
            break;
        }
    }
    Ok((weights, aggregate))
}

fn parse_stream_trim_opt(c: &mut Cursor) -> Result<Option<StreamTrim>, Error> {
    if c.eat_keyword("MAXLEN") {
        let approx = if c.eat_keyword("~") { true } else { c.eat_keyword("="); false };
        let count = extract_u64(c.next_required("XADD")?)?;
        if c.eat_keyword("LIMIT") {
            let _ = extract_u64(c.next_required("XADD")?)?;
        }
        Ok(Some(StreamTrim::MaxLen { approx, count }))
    } else if c.eat_keyword("MINID") {
        let approx = if c.eat_keyword("~") { true } else { c.eat_keyword("="); false };
        let id = parse_stream_id(&extract_string(c.next_required("XADD")?)?, 0)?;
        if c.eat_keyword("LIMIT") {
            let _ = extract_u64(c.next_required("XADD")?)?;
        }
        Ok(Some(StreamTrim::MinId { approx, id }))
    } else {
        Ok(None)
    }
}
