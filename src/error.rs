//! Error taxonomy for the binding layer

use std::fmt;

use alloy_primitives::{Bytes, U256};
use thiserror::Error;

use crate::codec::{format_value, NamedValue};

/// Convenience alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong between a typed call and the wire
#[derive(Debug, Error)]
pub enum Error {
    /// A supplied argument does not fit the declared parameter shape
    #[error("encoding `{method}` failed: {reason}")]
    Encoding { method: String, reason: String },

    /// Returned bytes are inconsistent with the declared output or event shape
    #[error("decoding {context} failed: {reason}")]
    Decode { context: String, reason: String },

    /// The ABI document itself could not be parsed or resolved
    #[error("invalid ABI: {reason}")]
    InvalidAbi { reason: String },

    /// Node unreachable, request rejected, or stream dropped
    #[error("transport: {message}")]
    Transport { message: String },

    /// Contract execution reverted; the reason is decoded as far as the ABI allows
    #[error("execution reverted: {0}")]
    Revert(RevertReason),

    /// An indexed-field candidate cannot be represented as a log topic
    #[error("cannot build filter on `{event}`.`{field}`: {reason}")]
    FilterConstruction {
        event: String,
        field: String,
        reason: String,
    },

    /// The transport lapped its subscription buffer and dropped events
    #[error("subscription overflowed, {missed} event(s) lost")]
    SubscriptionOverflow { missed: u64 },

    /// Method name absent from the contract interface
    #[error("method `{0}` not found in contract interface")]
    UnknownMethod(String),

    /// Event name absent from the contract interface
    #[error("event `{0}` not found in contract interface")]
    UnknownEvent(String),
}

impl Error {
    pub(crate) fn encoding(method: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Encoding {
            method: method.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn decode(context: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Decode {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_abi(reason: impl fmt::Display) -> Self {
        Self::InvalidAbi {
            reason: reason.to_string(),
        }
    }

    pub(crate) fn transport(message: impl fmt::Display) -> Self {
        Self::Transport {
            message: message.to_string(),
        }
    }

    pub(crate) fn filter(
        event: impl Into<String>,
        field: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self::FilterConstruction {
            event: event.into(),
            field: field.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors raised by the node rather than by local validation
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Revert(_) | Self::SubscriptionOverflow { .. }
        )
    }
}

/// Why a contract execution reverted
#[derive(Debug, Clone)]
pub enum RevertReason {
    /// An error declared in the contract ABI, with its decoded fields
    Custom { name: String, fields: Vec<NamedValue> },
    /// The standard `Error(string)` revert
    Message(String),
    /// The standard `Panic(uint256)` revert with its Solidity panic code
    Panic(U256),
    /// Revert data that matched no known shape (possibly empty)
    Raw(Bytes),
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom { name, fields } => {
                write!(f, "{name}(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, format_value(&field.value))?;
                }
                write!(f, ")")
            }
            Self::Message(msg) => write!(f, "{msg}"),
            Self::Panic(code) => write!(f, "panic code 0x{code:x}"),
            Self::Raw(data) if data.is_empty() => write!(f, "no revert data"),
            Self::Raw(data) => write!(f, "0x{}", hex::encode(data)),
        }
    }
}
