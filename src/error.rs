//! The primary error type for the emulator.

use std::num::{ParseFloatError, ParseIntError};
use thiserror::Error;

/// All failure kinds the emulator can surface, grouped the way spec.md §7
/// groups them (protocol, unknown-command, arity, syntax, type, range,
/// state, auth, connection, resource, exec-abort).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("ERR Protocol error: {0}")]
    Protocol(String),

    #[error("Incomplete frame")]
    Incomplete,

    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    #[error("ERR wrong number of arguments for '{0}' command")]
    Arity(String),

    #[error("ERR syntax error")]
    Syntax,

    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    #[error("ERR value is not a valid float")]
    NotAFloat,

    #[error("ERR increment or decrement would overflow")]
    Overflow,

    #[error("ERR {0}")]
    Range(String),

    #[error("NOAUTH Authentication required.")]
    AuthRequired,

    #[error("WRONGPASS invalid username-password pair or user is disabled.")]
    InvalidPassword,

    #[error("ERR {0}")]
    InvalidState(String),

    #[error("EXECABORT Transaction discarded because of previous errors.")]
    ExecAbort,

    #[error("ERR Connection refused: server is not connected")]
    Connection,

    #[error("OOM command not allowed when used memory > 'maxmemory'.")]
    OutOfMemory,

    #[error("READONLY {0}")]
    ReadOnly(String),

    #[error("NOSCRIPT No matching script. Please use EVAL.")]
    NoScript,

    #[error("BUSY {0}")]
    Busy(String),

    #[error("NOGROUP {0}")]
    NoGroup(String),

    #[error("ERR {0}")]
    Internal(String),
}

impl From<ParseIntError> for Error {
    fn from(_: ParseIntError) -> Self {
        Error::NotAnInteger
    }
}

impl From<ParseFloatError> for Error {
    fn from(_: ParseFloatError) -> Self {
        Error::NotAFloat
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Internal(format!("I/O error: {e}"))
    }
}

impl From<bincode::error::EncodeError> for Error {
    fn from(e: bincode::error::EncodeError) -> Self {
        Error::Internal(format!("encode error: {e}"))
    }
}

impl From<bincode::error::DecodeError> for Error {
    fn from(e: bincode::error::DecodeError) -> Self {
        Error::Internal(format!("RESTORE payload is invalid or corrupted: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
