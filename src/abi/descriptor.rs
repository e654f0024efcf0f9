//! Resolved descriptors for the callable surface of a contract

use alloy_dyn_abi::{DynSolType, Specifier};
use alloy_json_abi::{Error as ErrorDecl, Event, EventParam, Function, Param, StateMutability};
use alloy_primitives::B256;

use crate::error::{Error, Result};

/// Name to fall back on when an ABI leaves a parameter unnamed
pub(crate) fn field_name(declared: &str, position: usize) -> String {
    if declared.is_empty() {
        format!("arg{position}")
    } else {
        declared.to_string()
    }
}

pub(crate) fn output_name(declared: &str, position: usize) -> String {
    if declared.is_empty() {
        format!("ret{position}")
    } else {
        declared.to_string()
    }
}

/// A callable method with its parameter types resolved ahead of time
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    function: Function,
    selector: [u8; 4],
    signature: String,
    input_types: Vec<DynSolType>,
    output_types: Vec<DynSolType>,
}

impl MethodDescriptor {
    pub(crate) fn resolve(function: Function) -> Result<Self> {
        let selector = function.selector().0;
        let signature = function.signature();
        let input_types = resolve_params(&function.inputs, &signature)?;
        let output_types = resolve_params(&function.outputs, &signature)?;
        Ok(Self {
            function,
            selector,
            signature,
            input_types,
            output_types,
        })
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// First four bytes of the keccak-256 hash of the canonical signature
    pub fn selector(&self) -> [u8; 4] {
        self.selector
    }

    pub fn selector_hex(&self) -> String {
        format!("0x{}", hex::encode(self.selector))
    }

    pub fn mutability(&self) -> StateMutability {
        self.function.state_mutability
    }

    /// True for `view` and `pure` methods
    pub fn is_read_only(&self) -> bool {
        matches!(
            self.function.state_mutability,
            StateMutability::View | StateMutability::Pure
        )
    }

    pub fn is_payable(&self) -> bool {
        matches!(self.function.state_mutability, StateMutability::Payable)
    }

    pub fn inputs(&self) -> &[Param] {
        &self.function.inputs
    }

    pub fn outputs(&self) -> &[Param] {
        &self.function.outputs
    }

    pub fn input_types(&self) -> &[DynSolType] {
        &self.input_types
    }

    pub fn output_types(&self) -> &[DynSolType] {
        &self.output_types
    }

    pub(crate) fn function(&self) -> &Function {
        &self.function
    }
}

/// One event field in declaration order
#[derive(Debug, Clone)]
pub struct EventField {
    pub name: String,
    pub ty: DynSolType,
    pub indexed: bool,
    /// Position across all fields of the event, indexed and not
    pub position: usize,
}

/// An event with its topic hash and field layout resolved ahead of time
#[derive(Debug, Clone)]
pub struct EventDescriptor {
    event: Event,
    topic0: B256,
    signature: String,
    fields: Vec<EventField>,
}

impl EventDescriptor {
    pub(crate) fn resolve(event: Event) -> Result<Self> {
        let topic0 = event.selector();
        let signature = event.signature();
        let mut fields = Vec::with_capacity(event.inputs.len());
        for (position, input) in event.inputs.iter().enumerate() {
            let ty = resolve_event_param(input, &signature)?;
            fields.push(EventField {
                name: field_name(&input.name, position),
                ty,
                indexed: input.indexed,
                position,
            });
        }
        let indexed = fields.iter().filter(|f| f.indexed).count();
        let max = if event.anonymous { 4 } else { 3 };
        if indexed > max {
            return Err(Error::invalid_abi(format!(
                "event `{signature}` declares {indexed} indexed fields, at most {max} fit in topics"
            )));
        }
        Ok(Self {
            event,
            topic0,
            signature,
            fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.event.name
    }

    /// Canonical signature, e.g. `Transfer(address,address,uint256)`
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Keccak-256 hash of the canonical signature; topic 0 of every
    /// non-anonymous emission
    pub fn topic0(&self) -> B256 {
        self.topic0
    }

    pub fn is_anonymous(&self) -> bool {
        self.event.anonymous
    }

    /// All fields in declaration order
    pub fn fields(&self) -> &[EventField] {
        &self.fields
    }

    /// Indexed fields only, in declaration order
    pub fn indexed_fields(&self) -> impl Iterator<Item = &EventField> {
        self.fields.iter().filter(|f| f.indexed)
    }

    pub(crate) fn event(&self) -> &Event {
        &self.event
    }
}

/// An ABI-declared custom error, keyed by selector in revert data
#[derive(Debug, Clone)]
pub struct ErrorDescriptor {
    decl: ErrorDecl,
    selector: [u8; 4],
    signature: String,
    param_types: Vec<DynSolType>,
}

impl ErrorDescriptor {
    pub(crate) fn resolve(decl: ErrorDecl) -> Result<Self> {
        let selector = decl.selector().0;
        let signature = decl.signature();
        let param_types = resolve_params(&decl.inputs, &signature)?;
        Ok(Self {
            decl,
            selector,
            signature,
            param_types,
        })
    }

    pub fn name(&self) -> &str {
        &self.decl.name
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn selector(&self) -> [u8; 4] {
        self.selector
    }

    pub fn inputs(&self) -> &[Param] {
        &self.decl.inputs
    }

    pub fn param_types(&self) -> &[DynSolType] {
        &self.param_types
    }
}

fn resolve_params(params: &[Param], owner: &str) -> Result<Vec<DynSolType>> {
    params
        .iter()
        .map(|p| {
            p.resolve().map_err(|e| {
                Error::invalid_abi(format!("parameter `{}` of `{owner}`: {e}", p.name))
            })
        })
        .collect()
}

fn resolve_event_param(param: &EventParam, owner: &str) -> Result<DynSolType> {
    param
        .resolve()
        .map_err(|e| Error::invalid_abi(format!("field `{}` of `{owner}`: {e}", param.name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{b256, keccak256};

    fn transfer_function() -> Function {
        Function::parse("transfer(address to, uint256 amount) returns (bool)")
            .expect("valid signature")
    }

    #[test]
    fn selector_is_first_four_bytes_of_signature_hash() {
        let method = MethodDescriptor::resolve(transfer_function()).unwrap();
        assert_eq!(method.signature(), "transfer(address,uint256)");
        assert_eq!(method.selector(), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(method.selector_hex(), "0xa9059cbb");

        let hash = keccak256(method.signature().as_bytes());
        assert_eq!(&hash[..4], &method.selector());
    }

    #[test]
    fn selector_changes_with_parameter_types() {
        let narrow = Function::parse("transfer(address to, uint128 amount)").unwrap();
        let narrow = MethodDescriptor::resolve(narrow).unwrap();
        assert_ne!(narrow.selector(), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn mutability_classification() {
        let mut view = transfer_function();
        view.state_mutability = StateMutability::View;
        let view = MethodDescriptor::resolve(view).unwrap();
        assert!(view.is_read_only());
        assert!(!view.is_payable());

        let mut payable = transfer_function();
        payable.state_mutability = StateMutability::Payable;
        let payable = MethodDescriptor::resolve(payable).unwrap();
        assert!(!payable.is_read_only());
        assert!(payable.is_payable());
    }

    #[test]
    fn event_topic0_and_field_split() {
        let event =
            Event::parse("event Transfer(address indexed from, address indexed to, uint256 value)")
                .unwrap();
        let descriptor = EventDescriptor::resolve(event).unwrap();
        assert_eq!(
            descriptor.topic0(),
            b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"),
        );
        assert!(!descriptor.is_anonymous());
        assert_eq!(descriptor.indexed_fields().count(), 2);
        assert_eq!(descriptor.fields()[2].name, "value");
        assert!(!descriptor.fields()[2].indexed);
    }

    #[test]
    fn unnamed_fields_get_positional_names() {
        let event = Event::parse("event Ping(address indexed, uint256)").unwrap();
        let descriptor = EventDescriptor::resolve(event).unwrap();
        assert_eq!(descriptor.fields()[0].name, "arg0");
        assert_eq!(descriptor.fields()[1].name, "arg1");
    }

    #[test]
    fn too_many_indexed_fields_is_rejected() {
        let event = Event::parse(
            "event Crowded(address indexed a, address indexed b, address indexed c, address indexed d)",
        )
        .unwrap();
        assert!(matches!(
            EventDescriptor::resolve(event),
            Err(Error::InvalidAbi { .. })
        ));
    }

    #[test]
    fn error_descriptor_selector() {
        let decl = ErrorDecl::parse("InsufficientBalance(uint256 available, uint256 required)")
            .unwrap();
        let descriptor = ErrorDescriptor::resolve(decl).unwrap();
        assert_eq!(descriptor.signature(), "InsufficientBalance(uint256,uint256)");
        let hash = keccak256(descriptor.signature().as_bytes());
        assert_eq!(&hash[..4], &descriptor.selector());
        assert_eq!(descriptor.param_types().len(), 2);
    }
}
