//! Call data and topic encoding with argument shape validation

use alloy_dyn_abi::{DynSolType, DynSolValue, JsonAbiExt};
use alloy_primitives::{keccak256, B256, I256};
use tracing::trace;

use crate::abi::{field_name, EventField, MethodDescriptor};
use crate::error::{Error, Result};

/// Encode selector-prefixed calldata for one method invocation
///
/// Every argument is checked against the declared parameter shape first, so
/// mismatches surface as errors naming the offending parameter instead of as
/// silently corrupt calldata.
pub fn encode_call(method: &MethodDescriptor, args: &[DynSolValue]) -> Result<Vec<u8>> {
    let coerced = check_args(method, args)?;
    let data = method
        .function()
        .abi_encode_input(&coerced)
        .map_err(|e| Error::encoding(method.signature(), e))?;
    trace!(
        method = method.signature(),
        calldata_len = data.len(),
        "encoded call"
    );
    Ok(data)
}

/// Validate arguments against the declared parameter types
///
/// Returns the arguments with integer width tags rewritten to the declared
/// widths, after checking the values actually fit.
fn check_args(method: &MethodDescriptor, args: &[DynSolValue]) -> Result<Vec<DynSolValue>> {
    let declared = method.input_types();
    if declared.len() != args.len() {
        return Err(Error::encoding(
            method.signature(),
            format!(
                "expected {} argument(s), got {}",
                declared.len(),
                args.len()
            ),
        ));
    }
    declared
        .iter()
        .zip(args)
        .enumerate()
        .map(|(position, (ty, value))| {
            let param = &method.inputs()[position];
            let label = field_name(&param.name, position);
            coerce(ty, value, &label).map_err(|reason| Error::encoding(method.signature(), reason))
        })
        .collect()
}

/// Encode one indexed-field candidate as a 32-byte log topic
///
/// Static scalars become their padded word; `string` and `bytes` become the
/// keccak-256 hash of their payload, matching how the EVM stores dynamic
/// indexed fields. Arrays and tuples have no addressable topic form.
pub fn topic_for(event: &str, field: &EventField, value: &DynSolValue) -> Result<B256> {
    match &field.ty {
        DynSolType::String => match value {
            DynSolValue::String(s) => Ok(keccak256(s.as_bytes())),
            other => Err(Error::filter(
                event,
                &field.name,
                format!("expected `string`, got {}", value_kind(other)),
            )),
        },
        DynSolType::Bytes => match value {
            DynSolValue::Bytes(b) => Ok(keccak256(b)),
            other => Err(Error::filter(
                event,
                &field.name,
                format!("expected `bytes`, got {}", value_kind(other)),
            )),
        },
        DynSolType::Array(_) | DynSolType::FixedArray(_, _) | DynSolType::Tuple(_) => Err(
            Error::filter(event, &field.name, "arrays and tuples cannot be topic-encoded"),
        ),
        ty => {
            let coerced =
                coerce(ty, value, &field.name).map_err(|reason| Error::filter(event, &field.name, reason))?;
            coerced.as_word().ok_or_else(|| {
                Error::filter(event, &field.name, format!("`{ty}` has no 32-byte topic form"))
            })
        }
    }
}

/// Check one value against a declared type, rebuilding it with declared
/// integer widths
///
/// Integer values are accepted under any width tag as long as the value fits
/// the declared width; everything else must match structurally.
fn coerce(
    declared: &DynSolType,
    value: &DynSolValue,
    path: &str,
) -> std::result::Result<DynSolValue, String> {
    match (declared, value) {
        (DynSolType::Bool, DynSolValue::Bool(b)) => Ok(DynSolValue::Bool(*b)),
        (DynSolType::Address, DynSolValue::Address(a)) => Ok(DynSolValue::Address(*a)),
        (DynSolType::Function, DynSolValue::Function(f)) => Ok(DynSolValue::Function(*f)),
        (DynSolType::String, DynSolValue::String(s)) => Ok(DynSolValue::String(s.clone())),
        (DynSolType::Bytes, DynSolValue::Bytes(b)) => Ok(DynSolValue::Bytes(b.clone())),
        (DynSolType::FixedBytes(size), DynSolValue::FixedBytes(word, value_size)) => {
            if size == value_size {
                Ok(DynSolValue::FixedBytes(*word, *size))
            } else {
                Err(format!(
                    "`{path}`: expected `bytes{size}`, got `bytes{value_size}`"
                ))
            }
        }
        (DynSolType::Uint(bits), DynSolValue::Uint(v, _)) => {
            if *bits < 256 && v.bit_len() > *bits {
                Err(format!("`{path}`: value does not fit in `uint{bits}`"))
            } else {
                Ok(DynSolValue::Uint(*v, *bits))
            }
        }
        (DynSolType::Int(bits), DynSolValue::Int(v, _)) => {
            if *bits < 256 {
                // Sign bits above the declared width must all agree
                let spill = v.asr(bits - 1);
                if spill != I256::ZERO && spill != I256::MINUS_ONE {
                    return Err(format!("`{path}`: value does not fit in `int{bits}`"));
                }
            }
            Ok(DynSolValue::Int(*v, *bits))
        }
        (DynSolType::Array(inner), DynSolValue::Array(items)) => {
            let coerced = coerce_items(inner, items, path)?;
            Ok(DynSolValue::Array(coerced))
        }
        (DynSolType::FixedArray(inner, len), DynSolValue::FixedArray(items)) => {
            if items.len() != *len {
                return Err(format!(
                    "`{path}`: expected {len} element(s), got {}",
                    items.len()
                ));
            }
            let coerced = coerce_items(inner, items, path)?;
            Ok(DynSolValue::FixedArray(coerced))
        }
        (DynSolType::Tuple(types), DynSolValue::Tuple(fields)) => {
            if types.len() != fields.len() {
                return Err(format!(
                    "`{path}`: expected a {}-field tuple, got {} field(s)",
                    types.len(),
                    fields.len()
                ));
            }
            let coerced = types
                .iter()
                .zip(fields)
                .enumerate()
                .map(|(i, (ty, field))| coerce(ty, field, &format!("{path}.{i}")))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(DynSolValue::Tuple(coerced))
        }
        (declared, value) => Err(format!(
            "`{path}`: expected `{declared}`, got {}",
            value_kind(value)
        )),
    }
}

fn coerce_items(
    inner: &DynSolType,
    items: &[DynSolValue],
    path: &str,
) -> std::result::Result<Vec<DynSolValue>, String> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| coerce(inner, item, &format!("{path}[{i}]")))
        .collect()
}

fn value_kind(value: &DynSolValue) -> &'static str {
    match value {
        DynSolValue::Bool(_) => "a bool",
        DynSolValue::Int(_, _) => "a signed integer",
        DynSolValue::Uint(_, _) => "an unsigned integer",
        DynSolValue::FixedBytes(_, _) => "fixed bytes",
        DynSolValue::Address(_) => "an address",
        DynSolValue::Bytes(_) => "dynamic bytes",
        DynSolValue::String(_) => "a string",
        DynSolValue::Array(_) => "an array",
        DynSolValue::FixedArray(_) => "a fixed array",
        DynSolValue::Tuple(_) => "a tuple",
        _ => "an unsupported value kind",
    }
}
