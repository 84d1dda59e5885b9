//! A simplified reply value used by command handlers, converted to the wire
//! `RespFrame` by the connection layer. Keeping this separate from
//! `RespFrame` means handlers never think about protocol-version-specific
//! wire shapes (maps degrading to arrays, etc.) — see `frame.rs`.

use super::frame::RespFrame;
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    SimpleString(String),
    BulkString(Bytes),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    BigNumber(String),
    VerbatimString(String, Bytes),
    Array(Vec<RespValue>),
    Map(Vec<(RespValue, RespValue)>),
    Set(Vec<RespValue>),
    Push(Vec<RespValue>),
    Null,
    NullArray,
    Error(String),
}

impl RespValue {
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    pub fn from_bytes(b: impl Into<Bytes>) -> Self {
        RespValue::BulkString(b.into())
    }

    pub fn from_opt_bytes(b: Option<Bytes>) -> Self {
        match b {
            Some(b) => RespValue::BulkString(b),
            None => RespValue::Null,
        }
    }

    pub fn array_of_bytes(items: impl IntoIterator<Item = Bytes>) -> Self {
        RespValue::Array(items.into_iter().map(RespValue::BulkString).collect())
    }
}

impl From<RespValue> for RespFrame {
    fn from(val: RespValue) -> Self {
        match val {
            RespValue::SimpleString(s) => RespFrame::SimpleString(s),
            RespValue::BulkString(b) => RespFrame::BulkString(b),
            RespValue::Integer(i) => RespFrame::Integer(i),
            RespValue::Double(d) => RespFrame::Double(d),
            RespValue::Boolean(b) => RespFrame::Boolean(b),
            RespValue::BigNumber(s) => RespFrame::BigNumber(s),
            RespValue::VerbatimString(fmt, text) => RespFrame::VerbatimString(fmt, text),
            RespValue::Array(items) => RespFrame::Array(items.into_iter().map(Into::into).collect()),
            RespValue::Map(entries) => {
                RespFrame::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
            }
            RespValue::Set(items) => RespFrame::Set(items.into_iter().map(Into::into).collect()),
            RespValue::Push(items) => RespFrame::Push(items.into_iter().map(Into::into).collect()),
            RespValue::Null => RespFrame::Null,
            RespValue::NullArray => RespFrame::NullArray,
            RespValue::Error(s) => RespFrame::Error(s),
        }
    }
}
