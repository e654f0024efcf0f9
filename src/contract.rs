//! Contract handles and call/transaction dispatch
//!
//! One parametric path serves every method: descriptors drive encoding and
//! decoding, so no per-method glue code exists anywhere.

use std::sync::Arc;

use alloy::network::TransactionBuilder;
use alloy::rpc::types::TransactionRequest;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, B256, U256};
use tracing::debug;

use crate::abi::{InterfaceRegistry, MethodDescriptor, StateMutability};
use crate::codec::{self, Returns};
use crate::error::{Error, Result, RevertReason};
use crate::event::EventQuery;
use crate::provider::{BlockRef, NodeClient};

/// A deployed contract: where it lives and what it answers to
#[derive(Debug, Clone)]
pub struct ContractDescriptor {
    address: Address,
    registry: Arc<InterfaceRegistry>,
}

impl ContractDescriptor {
    pub fn new(address: Address, registry: InterfaceRegistry) -> Self {
        Self {
            address,
            registry: Arc::new(registry),
        }
    }

    pub fn with_shared_registry(address: Address, registry: Arc<InterfaceRegistry>) -> Self {
        Self { address, registry }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn registry(&self) -> &InterfaceRegistry {
        &self.registry
    }
}

/// Per-call overrides for read-only dispatch
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Apparent sender (`msg.sender`) for the simulated execution
    pub from: Option<Address>,
    /// Block to pin the read to
    pub block: BlockRef,
    /// Gas cap hint for the simulation
    pub gas: Option<u64>,
    /// Value hint for simulating payable paths
    pub value: Option<U256>,
}

/// Per-transaction overrides for state-changing dispatch
#[derive(Debug, Clone, Default)]
pub struct TxOptions {
    pub from: Option<Address>,
    pub value: Option<U256>,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub nonce: Option<u64>,
}

/// A bound contract handle; cheap to clone, shares the interface registry
#[derive(Clone)]
pub struct Contract {
    descriptor: ContractDescriptor,
    client: Arc<dyn NodeClient>,
}

impl Contract {
    pub fn new(
        address: Address,
        registry: InterfaceRegistry,
        client: Arc<dyn NodeClient>,
    ) -> Self {
        Self {
            descriptor: ContractDescriptor::new(address, registry),
            client,
        }
    }

    pub fn from_descriptor(descriptor: ContractDescriptor, client: Arc<dyn NodeClient>) -> Self {
        Self { descriptor, client }
    }

    pub fn address(&self) -> Address {
        self.descriptor.address()
    }

    pub fn registry(&self) -> &InterfaceRegistry {
        self.descriptor.registry()
    }

    pub fn descriptor(&self) -> &ContractDescriptor {
        &self.descriptor
    }

    pub(crate) fn client(&self) -> &Arc<dyn NodeClient> {
        &self.client
    }

    /// Start a read-only call to `method` (first declared overload)
    ///
    /// Any method can be read, regardless of declared mutability; reading a
    /// state-changing method simulates it without submitting anything.
    pub fn call(&self, method: &str) -> Result<CallBuilder<'_>> {
        Ok(CallBuilder::new(self, self.registry().method(method)?))
    }

    /// Start a read-only call addressed by canonical signature
    pub fn call_signature(&self, signature: &str) -> Result<CallBuilder<'_>> {
        Ok(CallBuilder::new(
            self,
            self.registry().method_by_signature(signature)?,
        ))
    }

    /// Start a state-changing transaction for `method`
    ///
    /// Rejected immediately for `view`/`pure` methods; those cannot change
    /// state and submitting them is a caller bug.
    pub fn transact(&self, method: &str) -> Result<TransactBuilder<'_>> {
        TransactBuilder::new(self, self.registry().method(method)?)
    }

    /// Start a state-changing transaction addressed by canonical signature
    pub fn transact_signature(&self, signature: &str) -> Result<TransactBuilder<'_>> {
        TransactBuilder::new(self, self.registry().method_by_signature(signature)?)
    }

    /// Start a plain value transfer to the contract's receive path
    ///
    /// Fails unless the interface declares a `receive` function or a payable
    /// fallback.
    pub fn transfer(&self) -> Result<TransferBuilder<'_>> {
        if !self.registry().can_receive() {
            return Err(Error::encoding(
                "receive",
                "contract declares no receive function or payable fallback",
            ));
        }
        Ok(TransferBuilder::new(self))
    }

    /// Start an event query for `event` (first declared overload)
    pub fn event(&self, event: &str) -> Result<EventQuery> {
        let descriptor = self.registry().event(event)?.clone();
        Ok(EventQuery::new(
            descriptor,
            self.address(),
            Arc::clone(&self.client),
        ))
    }

    /// Start an event query addressed by canonical signature
    pub fn event_signature(&self, signature: &str) -> Result<EventQuery> {
        let descriptor = self.registry().event_by_signature(signature)?.clone();
        Ok(EventQuery::new(
            descriptor,
            self.address(),
            Arc::clone(&self.client),
        ))
    }

    /// Encode selector-prefixed calldata without dispatching it
    pub fn encode_call(&self, method: &str, args: &[DynSolValue]) -> Result<Vec<u8>> {
        codec::encode_call(self.registry().method(method)?, args)
    }

    /// Decode raw return data for `method` without dispatching anything
    pub fn decode_returns(&self, method: &str, data: &[u8]) -> Result<Returns> {
        codec::decode_returns(self.registry().method(method)?, data)
    }

    /// Upgrade raw revert data into the richest reason the ABI can name
    fn upgrade_revert(&self, err: Error) -> Error {
        match err {
            Error::Revert(RevertReason::Raw(data)) => {
                Error::Revert(codec::decode_revert(self.registry(), &data))
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for Contract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Contract")
            .field("address", &self.address())
            .field("endpoint", &self.client.endpoint_name())
            .finish()
    }
}

/// Builder for one read-only call
#[derive(Debug)]
#[must_use = "a call does nothing until executed"]
pub struct CallBuilder<'a> {
    contract: &'a Contract,
    method: &'a MethodDescriptor,
    args: Vec<DynSolValue>,
    options: CallOptions,
}

impl<'a> CallBuilder<'a> {
    fn new(contract: &'a Contract, method: &'a MethodDescriptor) -> Self {
        Self {
            contract,
            method,
            args: Vec::new(),
            options: CallOptions::default(),
        }
    }

    /// Append one argument in declaration order
    pub fn arg(mut self, value: DynSolValue) -> Self {
        self.args.push(value);
        self
    }

    /// Append arguments in declaration order
    pub fn args(mut self, values: impl IntoIterator<Item = DynSolValue>) -> Self {
        self.args.extend(values);
        self
    }

    /// Set the apparent sender for the simulated execution
    pub fn from(mut self, caller: Address) -> Self {
        self.options.from = Some(caller);
        self
    }

    /// Pin the read to a block
    pub fn at(mut self, block: impl Into<BlockRef>) -> Self {
        self.options.block = block.into();
        self
    }

    pub fn gas(mut self, gas: u64) -> Self {
        self.options.gas = Some(gas);
        self
    }

    pub fn value(mut self, value: U256) -> Self {
        self.options.value = Some(value);
        self
    }

    pub fn options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// Encode, dispatch, and decode the call
    pub async fn execute(self) -> Result<Returns> {
        let data = codec::encode_call(self.method, &self.args)?;
        let mut request = TransactionRequest::default()
            .to(self.contract.address())
            .input(data.into());
        if let Some(from) = self.options.from {
            request = request.from(from);
        }
        if let Some(value) = self.options.value {
            request = request.value(value);
        }
        if let Some(gas) = self.options.gas {
            request = request.with_gas_limit(gas);
        }

        debug!(
            method = self.method.signature(),
            address = %self.contract.address(),
            "dispatching call"
        );
        let raw = self
            .contract
            .client()
            .call(request, self.options.block.to_block_id())
            .await
            .map_err(|e| self.contract.upgrade_revert(e))?;
        codec::decode_returns(self.method, &raw)
    }
}

/// Builder for one state-changing transaction
#[derive(Debug)]
#[must_use = "a transaction does nothing until sent"]
pub struct TransactBuilder<'a> {
    contract: &'a Contract,
    method: &'a MethodDescriptor,
    args: Vec<DynSolValue>,
    options: TxOptions,
}

impl<'a> TransactBuilder<'a> {
    fn new(contract: &'a Contract, method: &'a MethodDescriptor) -> Result<Self> {
        if method.is_read_only() {
            let kind = match method.mutability() {
                StateMutability::Pure => "pure",
                _ => "view",
            };
            return Err(Error::encoding(
                method.signature(),
                format!("`{kind}` methods cannot be transacted, use call instead"),
            ));
        }
        Ok(Self {
            contract,
            method,
            args: Vec::new(),
            options: TxOptions::default(),
        })
    }

    /// Append one argument in declaration order
    pub fn arg(mut self, value: DynSolValue) -> Self {
        self.args.push(value);
        self
    }

    /// Append arguments in declaration order
    pub fn args(mut self, values: impl IntoIterator<Item = DynSolValue>) -> Self {
        self.args.extend(values);
        self
    }

    pub fn from(mut self, sender: Address) -> Self {
        self.options.from = Some(sender);
        self
    }

    /// Attach value; rejected at send time unless the method is payable
    pub fn value(mut self, value: U256) -> Self {
        self.options.value = Some(value);
        self
    }

    pub fn gas_limit(mut self, gas: u64) -> Self {
        self.options.gas_limit = Some(gas);
        self
    }

    pub fn gas_price(mut self, price: u128) -> Self {
        self.options.gas_price = Some(price);
        self
    }

    pub fn fee_caps(mut self, max_fee: u128, max_priority_fee: u128) -> Self {
        self.options.max_fee_per_gas = Some(max_fee);
        self.options.max_priority_fee_per_gas = Some(max_priority_fee);
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.options.nonce = Some(nonce);
        self
    }

    pub fn options(mut self, options: TxOptions) -> Self {
        self.options = options;
        self
    }

    /// Encode, sign, and submit; resolves to the transaction hash once the
    /// node accepts it, well before inclusion
    pub async fn send(self) -> Result<B256> {
        let attached_value = self.options.value.unwrap_or(U256::ZERO);
        if !self.method.is_payable() && attached_value > U256::ZERO {
            return Err(Error::encoding(
                self.method.signature(),
                "method is not payable but a value was attached",
            ));
        }
        let data = codec::encode_call(self.method, &self.args)?;
        let request = build_tx_request(self.contract.address(), Some(data), &self.options);

        debug!(
            method = self.method.signature(),
            address = %self.contract.address(),
            "submitting transaction"
        );
        self.contract
            .client()
            .send_transaction(request)
            .await
            .map_err(|e| self.contract.upgrade_revert(e))
    }
}

/// Builder for a plain value transfer into the receive path
#[derive(Debug)]
#[must_use = "a transfer does nothing until sent"]
pub struct TransferBuilder<'a> {
    contract: &'a Contract,
    options: TxOptions,
}

impl<'a> TransferBuilder<'a> {
    fn new(contract: &'a Contract) -> Self {
        Self {
            contract,
            options: TxOptions::default(),
        }
    }

    pub fn from(mut self, sender: Address) -> Self {
        self.options.from = Some(sender);
        self
    }

    pub fn value(mut self, value: U256) -> Self {
        self.options.value = Some(value);
        self
    }

    pub fn gas_limit(mut self, gas: u64) -> Self {
        self.options.gas_limit = Some(gas);
        self
    }

    pub fn options(mut self, options: TxOptions) -> Self {
        self.options = options;
        self
    }

    /// Submit the transfer; calldata stays empty so the node routes it to
    /// `receive` (or the payable fallback)
    pub async fn send(self) -> Result<B256> {
        let request = build_tx_request(self.contract.address(), None, &self.options);
        self.contract
            .client()
            .send_transaction(request)
            .await
            .map_err(|e| self.contract.upgrade_revert(e))
    }
}

fn build_tx_request(
    to: Address,
    calldata: Option<Vec<u8>>,
    options: &TxOptions,
) -> TransactionRequest {
    let mut request = TransactionRequest::default().to(to);
    if let Some(data) = calldata {
        request = request.input(data.into());
    }
    if let Some(from) = options.from {
        request = request.from(from);
    }
    if let Some(value) = options.value {
        request = request.value(value);
    }
    if let Some(gas) = options.gas_limit {
        request = request.with_gas_limit(gas);
    }
    if let Some(price) = options.gas_price {
        request = request.with_gas_price(price);
    }
    if let Some(max_fee) = options.max_fee_per_gas {
        request = request.with_max_fee_per_gas(max_fee);
    }
    if let Some(priority) = options.max_priority_fee_per_gas {
        request = request.with_max_priority_fee_per_gas(priority);
    }
    if let Some(nonce) = options.nonce {
        request = request.with_nonce(nonce);
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_request_carries_options() {
        let to = Address::repeat_byte(0x42);
        let options = TxOptions {
            from: Some(Address::repeat_byte(0x11)),
            value: Some(U256::from(5)),
            gas_limit: Some(21_000),
            gas_price: None,
            max_fee_per_gas: Some(30),
            max_priority_fee_per_gas: Some(2),
            nonce: Some(7),
        };
        let request = build_tx_request(to, Some(vec![0xa9, 0x05, 0x9c, 0xbb]), &options);
        assert_eq!(request.from, Some(Address::repeat_byte(0x11)));
        assert_eq!(request.value, Some(U256::from(5)));
        assert_eq!(request.gas, Some(21_000));
        assert_eq!(request.max_fee_per_gas, Some(30));
        assert_eq!(request.nonce, Some(7));

        // A transfer has no calldata at all
        let transfer = build_tx_request(to, None, &TxOptions::default());
        assert!(transfer.input.input().is_none());
    }
}
