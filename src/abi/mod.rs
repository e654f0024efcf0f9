//! ABI loading and descriptor resolution

mod descriptor;
mod registry;

pub use descriptor::{ErrorDescriptor, EventDescriptor, EventField, MethodDescriptor};
pub use registry::InterfaceRegistry;

pub(crate) use descriptor::{field_name, output_name};

// Callers work with these alloy types directly when walking an interface.
pub use alloy_json_abi::{JsonAbi, Param, StateMutability};
