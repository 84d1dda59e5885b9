//! Command parsing and dispatch: turning a raw `(name, args)` pair into a
//! typed `Command`, and later (in `router`) executing it.

pub mod args;
pub mod command;
pub mod router;

pub use command::{parse, Command, CommandFlags};
pub use router::{dispatch, Dispatched, NewSubscription};
