//! ABI-driven access to deployed EVM contracts
//!
//! A contract handle is built from nothing but an ABI document and an
//! endpoint; every method and event declared there becomes callable through
//! one parametric dispatch path. Reads, transactions, plain transfers, and
//! event queries all run through descriptors resolved once at registry
//! construction, and reverts come back decoded as far as the ABI allows.
//!
//! ```no_run
//! use evmbind::{connect, Address, Contract, DynSolValue, InterfaceRegistry, ProviderConfig};
//!
//! # async fn demo() -> evmbind::Result<()> {
//! let registry = InterfaceRegistry::from_file("abi/erc20.json")?;
//! let client = connect(ProviderConfig::from_url("wss://node.example/ws")).await?;
//! let token = Contract::new(Address::ZERO, registry, client);
//!
//! let supply = token.call("totalSupply")?.execute().await?;
//! println!("supply: {supply}");
//!
//! let mut transfers = token
//!     .event("Transfer")?
//!     .filter_field("to", [DynSolValue::Address(Address::ZERO)])?
//!     .stream()
//!     .await?;
//! while let Some(event) = transfers.next().await {
//!     println!("{}", event?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod abi;
pub mod codec;
pub mod contract;
pub mod error;
pub mod event;
pub mod provider;

pub use abi::{ErrorDescriptor, EventDescriptor, InterfaceRegistry, MethodDescriptor};
pub use codec::{format_value, DynSolType, DynSolValue, NamedValue, Returns};
pub use contract::{
    CallBuilder, CallOptions, Contract, ContractDescriptor, TransactBuilder, TransferBuilder,
    TxOptions,
};
pub use error::{Error, Result, RevertReason};
pub use event::{
    DecodedEvent, EventQuery, EventStream, EventSubscription, FilterRange, LogMeta,
};
pub use provider::{
    connect, connect_with, BlockRef, EndpointsConfig, NodeClient, ProviderConfig,
};

// Chain primitives that appear throughout the public surface
pub use alloy_primitives::{Address, Bytes, B256, U256};
