//! An in-process emulator of a Redis-compatible key/value server, for tests.
//! Embed it with [`Server`] and [`connection::Client`] to drive commands
//! without a socket, or hand [`connection::serve_connection`] any
//! `AsyncRead + AsyncWrite` to serve the real wire protocol.

pub mod blocking;
pub mod commands;
pub mod connection;
pub mod database;
pub mod dispatch;
pub mod error;
pub mod persistence;
pub mod protocol;
pub mod pubsub;
pub mod server;
pub mod storage;

pub use connection::Client;
pub use error::Error;
pub use server::{Config, Server};
