//! Value codec - the single encode/decode path every call and event shares

mod decode;
mod encode;
mod value;

pub use decode::{decode_event_fields, decode_returns, decode_revert};
pub use encode::{encode_call, topic_for};
pub use value::{format_value, NamedValue, Returns};

// The tagged value type callers build arguments with.
pub use alloy_dyn_abi::{DynSolType, DynSolValue};
