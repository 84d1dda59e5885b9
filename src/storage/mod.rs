//! The in-memory value model: what a key can hold, independent of the
//! database/connection machinery that manipulates it.

pub mod stream;
pub mod value;
pub mod zset;

pub use stream::{Consumer, ConsumerGroup, PendingEntryInfo, Stream, StreamEntry, StreamId};
pub use value::{DataValue, StoredValue, MAX_STRING_SIZE};
pub use zset::{LexBoundary, ScoreBoundary, SortedSet, ZSetEntry};
