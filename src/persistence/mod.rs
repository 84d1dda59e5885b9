//! Serialization for commands that hand a value's bytes to the client
//! (`DUMP`/`RESTORE`). Not a snapshot/AOF persistence layer — this crate
//! keeps no on-disk state, per spec.md's non-goals.

pub mod dump;
