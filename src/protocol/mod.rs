//! Wire protocol: RESP2/RESP3 framing and the higher-level reply type
//! command handlers build.

mod frame;
mod value;

pub use frame::{format_double, frame_to_args, RespCodec, RespFrame};
pub use value::RespValue;
