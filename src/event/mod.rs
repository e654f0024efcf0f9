//! Event queries and decoded emissions
//!
//! [`EventQuery`] is the single entry point: built from a contract handle, it
//! fetches history, streams history-then-live, or subscribes live-only. Every
//! emission comes back as a [`DecodedEvent`] regardless of which event or
//! which path produced it.

mod feed;
mod filter;
mod stream;
mod subscription;

pub use filter::{EventQuery, FilterRange};
pub use stream::EventStream;
pub use subscription::EventSubscription;

pub(crate) use feed::LogFeed;

use alloy::rpc::types::Log;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, B256};

use crate::abi::EventDescriptor;
use crate::codec::{self, NamedValue};
use crate::error::Result;

/// Where in the chain a log was emitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogMeta {
    /// Contract that emitted the log
    pub address: Address,
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
    pub transaction_hash: Option<B256>,
    pub transaction_index: Option<u64>,
    /// Position within the block
    pub log_index: Option<u64>,
    /// True when the emitting block was reorged out
    pub removed: bool,
}

impl LogMeta {
    pub(crate) fn from_log(log: &Log) -> Self {
        Self {
            address: log.address(),
            block_number: log.block_number,
            block_hash: log.block_hash,
            transaction_hash: log.transaction_hash,
            transaction_index: log.transaction_index,
            log_index: log.log_index,
            removed: log.removed,
        }
    }
}

/// One decoded emission of an event
#[derive(Debug, Clone)]
pub struct DecodedEvent {
    /// Event name as declared in the ABI
    pub name: String,
    /// Every field in declaration order, indexed and non-indexed interleaved
    pub fields: Vec<NamedValue>,
    /// Chain position of the emission
    pub meta: LogMeta,
}

impl DecodedEvent {
    /// Look a field up by name
    pub fn get(&self, name: &str) -> Option<&DynSolValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Look a field up by declaration position
    pub fn position(&self, position: usize) -> Option<&DynSolValue> {
        self.fields.get(position).map(|f| &f.value)
    }
}

impl std::fmt::Display for DecodedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}")?;
        }
        write!(f, ")")
    }
}

/// Decode one raw log against the event it was filtered for
pub(crate) fn decode_log(descriptor: &EventDescriptor, log: &Log) -> Result<DecodedEvent> {
    let fields =
        codec::decode_event_fields(descriptor, log.topics(), log.data().data.as_ref())?;
    Ok(DecodedEvent {
        name: descriptor.name().to_string(),
        fields,
        meta: LogMeta::from_log(log),
    })
}
