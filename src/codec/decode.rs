//! Output, log, and revert-data decoding into named values

use alloy_dyn_abi::{DynSolType, DynSolValue, EventExt, FunctionExt};
use alloy_primitives::B256;
use alloy_sol_types::{Panic, Revert, SolError};
use tracing::trace;

use crate::abi::{field_name, output_name, EventDescriptor, InterfaceRegistry, MethodDescriptor};
use crate::codec::value::{NamedValue, Returns};
use crate::error::{Error, Result, RevertReason};

/// Decode the raw return data of a call into named output values
pub fn decode_returns(method: &MethodDescriptor, data: &[u8]) -> Result<Returns> {
    let outputs = method.outputs();
    if outputs.is_empty() {
        // Nothing declared; tolerate whatever the node sent back
        return Ok(Returns::default());
    }
    let values = method.function().abi_decode_output(data).map_err(|e| {
        Error::decode(format!("output of `{}`", method.signature()), e)
    })?;
    if values.len() != outputs.len() {
        return Err(Error::decode(
            format!("output of `{}`", method.signature()),
            format!("expected {} value(s), got {}", outputs.len(), values.len()),
        ));
    }
    let named = outputs
        .iter()
        .zip(values)
        .enumerate()
        .map(|(position, (param, value))| NamedValue {
            name: output_name(&param.name, position),
            value,
        })
        .collect();
    Ok(Returns::new(named))
}

/// Decode one log's topics and data into the event's fields, in declaration
/// order
pub fn decode_event_fields(
    descriptor: &EventDescriptor,
    topics: &[B256],
    data: &[u8],
) -> Result<Vec<NamedValue>> {
    let context = || format!("log for `{}`", descriptor.signature());
    let decoded = descriptor
        .event()
        .decode_log_parts(topics.iter().copied(), data)
        .map_err(|e| Error::decode(context(), e))?;

    // Indexed and body values come back as two runs; interleave them back
    // into declaration order.
    let mut indexed = decoded.indexed.into_iter();
    let mut body = decoded.body.into_iter();
    let mut fields = Vec::with_capacity(descriptor.event().inputs.len());
    for (position, input) in descriptor.event().inputs.iter().enumerate() {
        let value = if input.indexed {
            indexed.next()
        } else {
            body.next()
        };
        let Some(value) = value else {
            return Err(Error::decode(context(), "fewer values than declared fields"));
        };
        fields.push(NamedValue {
            name: field_name(&input.name, position),
            value,
        });
    }
    trace!(event = descriptor.signature(), fields = fields.len(), "decoded log");
    Ok(fields)
}

/// Decode revert data as far as the interface allows
///
/// Tries ABI-declared custom errors first, then the standard `Error(string)`
/// and `Panic(uint256)` shapes, and falls back to the raw bytes.
pub fn decode_revert(registry: &InterfaceRegistry, data: &[u8]) -> RevertReason {
    if data.len() >= 4 {
        let selector: [u8; 4] = data[..4].try_into().unwrap();
        let payload = &data[4..];

        if let Some(decl) = registry.error_by_selector(selector) {
            if let Some(fields) = decode_error_fields(decl.param_types(), decl.inputs(), payload) {
                return RevertReason::Custom {
                    name: decl.name().to_string(),
                    fields,
                };
            }
        }
        if selector == Revert::SELECTOR {
            if let Ok(revert) = Revert::abi_decode_raw(payload) {
                return RevertReason::Message(revert.reason);
            }
        }
        if selector == Panic::SELECTOR {
            if let Ok(panic) = Panic::abi_decode_raw(payload) {
                return RevertReason::Panic(panic.code);
            }
        }
    }
    RevertReason::Raw(data.to_vec().into())
}

fn decode_error_fields(
    types: &[DynSolType],
    params: &[alloy_json_abi::Param],
    payload: &[u8],
) -> Option<Vec<NamedValue>> {
    let tuple = DynSolType::Tuple(types.to_vec());
    let DynSolValue::Tuple(values) = tuple.abi_decode_params(payload).ok()? else {
        return None;
    };
    Some(
        params
            .iter()
            .zip(values)
            .enumerate()
            .map(|(position, (param, value))| NamedValue {
                name: field_name(&param.name, position),
                value,
            })
            .collect(),
    )
}
