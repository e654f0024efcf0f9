//! Node transport seam - the narrow RPC surface the bindings consume
//!
//! Everything above this module speaks [`NodeClient`]; only the alloy-backed
//! implementation below knows which wire transport is in play.

mod alloy_client;

use std::path::PathBuf;
use std::sync::Arc;

use alloy::eips::BlockId;
use alloy::network::EthereumWallet;
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use alloy_primitives::{Bytes, B256};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use alloy_client::AlloyNodeClient;

use crate::error::{Error, Result};

/// Environment variable consulted for an endpoint override
pub const ENDPOINT_ENV: &str = "EVMBIND_RPC";

/// A point in chain history a read can be pinned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockRef {
    /// The most recently mined block
    #[default]
    Latest,
    /// The pending block
    Pending,
    /// A specific block height
    Number(u64),
    /// A specific block hash
    Hash(B256),
}

impl BlockRef {
    pub(crate) fn to_block_id(self) -> BlockId {
        match self {
            BlockRef::Latest => BlockId::latest(),
            BlockRef::Pending => BlockId::pending(),
            BlockRef::Number(number) => BlockId::number(number),
            BlockRef::Hash(hash) => BlockId::hash(hash),
        }
    }
}

impl From<u64> for BlockRef {
    fn from(number: u64) -> Self {
        BlockRef::Number(number)
    }
}

impl From<B256> for BlockRef {
    fn from(hash: B256) -> Self {
        BlockRef::Hash(hash)
    }
}

/// An open log stream: the receiving half plus the forwarding task
///
/// Dropping the receiver stops the forwarder; aborting the task releases the
/// transport-side subscription.
pub struct LogSubscription {
    pub receiver: mpsc::Receiver<Result<Log>>,
    pub task: JoinHandle<()>,
}

/// Node endpoint configuration
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    /// HTTP JSON-RPC endpoint
    Http(String),
    /// WebSocket endpoint
    WebSocket(String),
    /// IPC socket path (Unix only)
    #[cfg(unix)]
    Ipc(PathBuf),
}

impl ProviderConfig {
    /// Classify an endpoint string by scheme
    ///
    /// `ws://`/`wss://` select WebSocket, a plain path selects IPC, anything
    /// else is treated as HTTP.
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("ws://") || url.starts_with("wss://") {
            return ProviderConfig::WebSocket(url.to_string());
        }
        #[cfg(unix)]
        if !url.contains("://") && (url.starts_with('/') || url.ends_with(".ipc")) {
            return ProviderConfig::Ipc(PathBuf::from(url));
        }
        ProviderConfig::Http(url.to_string())
    }

    /// Read the endpoint from `EVMBIND_RPC`, if set
    pub fn from_env() -> Option<Self> {
        std::env::var(ENDPOINT_ENV).ok().map(|url| Self::from_url(&url))
    }

    /// Get display name for this endpoint
    pub fn display(&self) -> String {
        match self {
            ProviderConfig::Http(url) => url.clone(),
            ProviderConfig::WebSocket(url) => url.clone(),
            #[cfg(unix)]
            ProviderConfig::Ipc(path) => path.display().to_string(),
        }
    }

    /// Check if this endpoint can serve push subscriptions
    pub fn supports_subscriptions(&self) -> bool {
        match self {
            ProviderConfig::Http(_) => false,
            ProviderConfig::WebSocket(_) => true,
            #[cfg(unix)]
            ProviderConfig::Ipc(_) => true,
        }
    }
}

/// One endpoint entry in a host configuration file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointConfig {
    /// Optional label for logs and diagnostics
    pub name: Option<String>,
    /// HTTP or WebSocket URL
    pub rpc: Option<String>,
    /// IPC socket path
    pub ipc: Option<String>,
}

impl EndpointConfig {
    /// Resolve this entry to a provider configuration; IPC wins over RPC
    pub fn provider_config(&self) -> Option<ProviderConfig> {
        #[cfg(unix)]
        if let Some(ipc) = &self.ipc {
            return Some(ProviderConfig::Ipc(PathBuf::from(ipc)));
        }
        self.rpc.as_deref().map(ProviderConfig::from_url)
    }
}

/// Endpoint table parsed from TOML host configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

impl EndpointsConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::transport(format!("bad endpoint config: {e}")))
    }

    /// All resolvable endpoints, environment override first
    pub fn provider_configs(&self) -> Vec<ProviderConfig> {
        let mut configs = Vec::new();
        if let Some(env) = ProviderConfig::from_env() {
            configs.push(env);
        }
        configs.extend(self.endpoints.iter().filter_map(|e| e.provider_config()));
        configs
    }
}

/// The three node operations the binding layer is built on, plus stream setup
#[async_trait::async_trait]
pub trait NodeClient: Send + Sync + 'static {
    /// Execute a read-only call (eth_call), pinned to `block`
    async fn call(&self, request: TransactionRequest, block: BlockId) -> Result<Bytes>;

    /// Sign with the connected wallet and submit a state-changing transaction
    /// (eth_sendTransaction); resolves as soon as the node accepts it
    async fn send_transaction(&self, request: TransactionRequest) -> Result<B256>;

    /// Fetch historical logs matching the filter (eth_getLogs)
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>>;

    /// Open a live log stream (eth_subscribe) matching the filter
    async fn subscribe_logs(&self, filter: &Filter) -> Result<LogSubscription>;

    /// Check if subscriptions are supported by this transport
    fn supports_subscriptions(&self) -> bool;

    /// Get endpoint display name
    fn endpoint_name(&self) -> String;
}

/// Connect to a node without a wallet; transactions will be rejected by the
/// node unless it manages the sending account itself
pub async fn connect(config: ProviderConfig) -> Result<Arc<dyn NodeClient>> {
    connect_with(config, None).await
}

/// Connect to a node, optionally attaching a wallet for transaction signing
pub async fn connect_with(
    config: ProviderConfig,
    wallet: Option<EthereumWallet>,
) -> Result<Arc<dyn NodeClient>> {
    let client = AlloyNodeClient::connect(config, wallet).await?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_classification() {
        assert!(matches!(
            ProviderConfig::from_url("https://eth.example.org"),
            ProviderConfig::Http(_)
        ));
        assert!(matches!(
            ProviderConfig::from_url("wss://eth.example.org"),
            ProviderConfig::WebSocket(_)
        ));
        #[cfg(unix)]
        assert!(matches!(
            ProviderConfig::from_url("/var/run/geth.ipc"),
            ProviderConfig::Ipc(_)
        ));
    }

    #[test]
    fn endpoint_entries_resolve_with_ipc_priority() {
        let config = EndpointsConfig::from_toml(
            r#"
            [[endpoints]]
            name = "local"
            rpc = "http://localhost:8545"

            [[endpoints]]
            name = "live"
            rpc = "wss://eth.example.org"
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoints.len(), 2);
        assert!(matches!(
            config.endpoints[0].provider_config(),
            Some(ProviderConfig::Http(_))
        ));
        assert!(matches!(
            config.endpoints[1].provider_config(),
            Some(ProviderConfig::WebSocket(_))
        ));

        #[cfg(unix)]
        {
            let both = EndpointConfig {
                name: None,
                rpc: Some("http://localhost:8545".to_string()),
                ipc: Some("/tmp/node.ipc".to_string()),
            };
            assert!(matches!(
                both.provider_config(),
                Some(ProviderConfig::Ipc(_))
            ));
        }
    }

    #[test]
    fn block_ref_maps_onto_block_id() {
        assert_eq!(BlockRef::default(), BlockRef::Latest);
        assert_eq!(BlockRef::from(42u64), BlockRef::Number(42));
        let id = BlockRef::Number(42).to_block_id();
        assert_eq!(id, BlockId::number(42));
        assert_eq!(BlockRef::Pending.to_block_id(), BlockId::pending());
    }
}
