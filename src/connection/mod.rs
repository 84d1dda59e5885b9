//! Per-connection state and the two entry points built on top of it: the
//! in-process `Client` (no socket, straight through the dispatcher) and
//! `serve_connection` (a real byte stream framed with `RespCodec`). Mirrors
//! the shape of the teacher's `connection` module, minus TLS detection and
//! replica handoff, which don't apply to an in-process emulator.

pub mod client;
pub mod session;
mod stream;

pub use client::Client;
pub use stream::serve_connection;
