//! Decoded value containers that keep ABI-declared names and order

use std::fmt;

use alloy_dyn_abi::DynSolValue;

use crate::error::{Error, Result};

/// A decoded value paired with its ABI-declared name
///
/// Unnamed parameters get positional fallback names so every value stays
/// addressable.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    pub name: String,
    pub value: DynSolValue,
}

impl fmt::Display for NamedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, format_value(&self.value))
    }
}

/// The decoded outputs of one method call, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Returns {
    values: Vec<NamedValue>,
}

impl Returns {
    pub(crate) fn new(values: Vec<NamedValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The sole return value of a single-output method
    pub fn single(&self) -> Result<&DynSolValue> {
        match self.values.as_slice() {
            [only] => Ok(&only.value),
            _ => Err(Error::decode(
                "single return value",
                format!("method returned {} values", self.values.len()),
            )),
        }
    }

    /// Consume and return the sole value of a single-output method
    pub fn into_single(mut self) -> Result<DynSolValue> {
        let count = self.values.len();
        match self.values.pop() {
            Some(only) if count == 1 => Ok(only.value),
            _ => Err(Error::decode(
                "single return value",
                format!("method returned {count} values"),
            )),
        }
    }

    /// Look up an output by its declared name
    pub fn get(&self, name: &str) -> Option<&DynSolValue> {
        self.values.iter().find(|v| v.name == name).map(|v| &v.value)
    }

    /// Look up an output by declaration position
    pub fn position(&self, index: usize) -> Option<&DynSolValue> {
        self.values.get(index).map(|v| &v.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedValue> {
        self.values.iter()
    }

    pub fn into_vec(self) -> Vec<NamedValue> {
        self.values
    }
}

impl fmt::Display for Returns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

impl IntoIterator for Returns {
    type Item = NamedValue;
    type IntoIter = std::vec::IntoIter<NamedValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// Render a value the way it would appear in Solidity source
pub fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::FixedBytes(word, size) => {
            let bytes = &word.as_slice()[..(*size).min(32)];
            format!("0x{}", hex::encode(bytes))
        }
        DynSolValue::Address(addr) => format!("{addr}"),
        DynSolValue::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        DynSolValue::String(s) => format!("\"{s}\""),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            let rendered: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", rendered.join(", "))
        }
        DynSolValue::Tuple(fields) => {
            let rendered: Vec<String> = fields.iter().map(format_value).collect();
            format!("({})", rendered.join(", "))
        }
        other => format!("{other:?}"),
    }
}
