//! Contract interface registry - descriptor lookups by name, signature, selector, and topic

use std::collections::HashMap;
use std::path::Path;

use alloy_json_abi::{JsonAbi, StateMutability};
use alloy_primitives::B256;

use crate::abi::descriptor::{ErrorDescriptor, EventDescriptor, MethodDescriptor};
use crate::error::{Error, Result};

/// All descriptors of one contract interface, indexed for dispatch
///
/// Methods and events are addressable by plain name; overloads share a name
/// and the first declared one wins, with the canonical signature available
/// for disambiguation.
#[derive(Debug, Clone, Default)]
pub struct InterfaceRegistry {
    methods: Vec<MethodDescriptor>,
    methods_by_name: HashMap<String, Vec<usize>>,
    methods_by_signature: HashMap<String, usize>,
    methods_by_selector: HashMap<[u8; 4], usize>,
    events: Vec<EventDescriptor>,
    events_by_name: HashMap<String, Vec<usize>>,
    events_by_signature: HashMap<String, usize>,
    events_by_topic0: HashMap<B256, usize>,
    errors: Vec<ErrorDescriptor>,
    errors_by_selector: HashMap<[u8; 4], usize>,
    receive_declared: bool,
    payable_fallback: bool,
}

impl InterfaceRegistry {
    /// Build the registry from a parsed ABI document
    pub fn from_abi(abi: &JsonAbi) -> Result<Self> {
        let mut registry = Self {
            receive_declared: abi.receive.is_some(),
            payable_fallback: abi
                .fallback
                .as_ref()
                .is_some_and(|f| f.state_mutability == StateMutability::Payable),
            ..Self::default()
        };
        for function in abi.functions() {
            registry.insert_method(MethodDescriptor::resolve(function.clone())?);
        }
        for event in abi.events() {
            registry.insert_event(EventDescriptor::resolve(event.clone())?);
        }
        for decl in abi.errors() {
            registry.insert_error(ErrorDescriptor::resolve(decl.clone())?);
        }
        Ok(registry)
    }

    /// Build the registry from ABI JSON text
    ///
    /// Accepts both a bare ABI array and the common artifact wrapper with an
    /// `abi` field.
    pub fn from_json(json: &str) -> Result<Self> {
        let abi = parse_abi_json(json)?;
        Self::from_abi(&abi)
    }

    /// Build the registry from an ABI JSON file on disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::invalid_abi(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Look up a method by plain name; first declared overload wins
    pub fn method(&self, name: &str) -> Result<&MethodDescriptor> {
        self.methods_by_name
            .get(name)
            .and_then(|indices| indices.first())
            .map(|&i| &self.methods[i])
            .ok_or_else(|| Error::UnknownMethod(name.to_string()))
    }

    /// Look up a method by canonical signature, e.g. `transfer(address,uint256)`
    pub fn method_by_signature(&self, signature: &str) -> Result<&MethodDescriptor> {
        self.methods_by_signature
            .get(signature)
            .map(|&i| &self.methods[i])
            .ok_or_else(|| Error::UnknownMethod(signature.to_string()))
    }

    /// Look up a method by 4-byte selector
    pub fn method_by_selector(&self, selector: [u8; 4]) -> Option<&MethodDescriptor> {
        self.methods_by_selector.get(&selector).map(|&i| &self.methods[i])
    }

    /// Look up a method by selector hex string (e.g., "0xa9059cbb")
    pub fn method_by_selector_hex(&self, selector_hex: &str) -> Option<&MethodDescriptor> {
        let normalized = selector_hex
            .strip_prefix("0x")
            .or_else(|| selector_hex.strip_prefix("0X"))
            .unwrap_or(selector_hex);
        if normalized.len() != 8 {
            return None;
        }
        let bytes = hex::decode(normalized).ok()?;
        let selector: [u8; 4] = bytes.try_into().ok()?;
        self.method_by_selector(selector)
    }

    /// All overloads declared under one method name, in declaration order
    pub fn method_overloads(&self, name: &str) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods_by_name
            .get(name)
            .into_iter()
            .flatten()
            .map(|&i| &self.methods[i])
    }

    /// Look up an event by plain name; first declared overload wins
    pub fn event(&self, name: &str) -> Result<&EventDescriptor> {
        self.events_by_name
            .get(name)
            .and_then(|indices| indices.first())
            .map(|&i| &self.events[i])
            .ok_or_else(|| Error::UnknownEvent(name.to_string()))
    }

    /// Look up an event by canonical signature
    pub fn event_by_signature(&self, signature: &str) -> Result<&EventDescriptor> {
        self.events_by_signature
            .get(signature)
            .map(|&i| &self.events[i])
            .ok_or_else(|| Error::UnknownEvent(signature.to_string()))
    }

    /// Look up an event by its topic-0 hash
    pub fn event_by_topic0(&self, topic0: B256) -> Option<&EventDescriptor> {
        self.events_by_topic0.get(&topic0).map(|&i| &self.events[i])
    }

    /// Look up a custom error by the 4-byte selector of revert data
    pub fn error_by_selector(&self, selector: [u8; 4]) -> Option<&ErrorDescriptor> {
        self.errors_by_selector.get(&selector).map(|&i| &self.errors[i])
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.iter()
    }

    pub fn events(&self) -> impl Iterator<Item = &EventDescriptor> {
        self.events.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ErrorDescriptor> {
        self.errors.iter()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// True when the contract can accept a plain value transfer, either via a
    /// `receive` function or a payable fallback
    pub fn can_receive(&self) -> bool {
        self.receive_declared || self.payable_fallback
    }

    /// Insert a method descriptor
    ///
    /// Note: first descriptor for a given selector wins (no overwrite)
    fn insert_method(&mut self, method: MethodDescriptor) {
        let index = self.methods.len();
        self.methods_by_name
            .entry(method.name().to_string())
            .or_default()
            .push(index);
        self.methods_by_signature
            .entry(method.signature().to_string())
            .or_insert(index);
        self.methods_by_selector
            .entry(method.selector())
            .or_insert(index);
        self.methods.push(method);
    }

    fn insert_event(&mut self, event: EventDescriptor) {
        let index = self.events.len();
        self.events_by_name
            .entry(event.name().to_string())
            .or_default()
            .push(index);
        self.events_by_signature
            .entry(event.signature().to_string())
            .or_insert(index);
        self.events_by_topic0.entry(event.topic0()).or_insert(index);
        self.events.push(event);
    }

    fn insert_error(&mut self, error: ErrorDescriptor) {
        let index = self.errors.len();
        self.errors_by_selector
            .entry(error.selector())
            .or_insert(index);
        self.errors.push(error);
    }
}

fn parse_abi_json(json: &str) -> Result<JsonAbi> {
    if let Ok(abi) = serde_json::from_str::<JsonAbi>(json) {
        return Ok(abi);
    }
    // Compiler artifacts wrap the ABI array in an object
    #[derive(serde::Deserialize)]
    struct Artifact {
        abi: JsonAbi,
    }
    serde_json::from_str::<Artifact>(json)
        .map(|artifact| artifact.abi)
        .map_err(Error::invalid_abi)
}
