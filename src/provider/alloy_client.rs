//! Alloy-backed node client over HTTP, WebSocket, and IPC transports

use alloy::eips::BlockId;
use alloy::network::EthereumWallet;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use alloy::transports::TransportError;
use alloy_primitives::{Bytes, B256};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, Result, RevertReason};
use crate::provider::{LogSubscription, NodeClient, ProviderConfig};

/// How many in-flight logs one subscription buffers before the forwarder
/// blocks on the consumer
const LOG_CHANNEL_CAPACITY: usize = 256;

enum TransportKind {
    Http,
    WebSocket,
    #[cfg(unix)]
    Ipc,
}

/// The one concrete [`NodeClient`]; every transport is erased into a
/// [`DynProvider`] so dispatch stays uniform above this point
pub struct AlloyNodeClient {
    provider: DynProvider,
    endpoint: String,
    kind: TransportKind,
}

impl AlloyNodeClient {
    /// Connect to the configured endpoint, attaching a wallet when one is
    /// supplied so `send_transaction` can sign locally
    pub async fn connect(
        config: ProviderConfig,
        wallet: Option<EthereumWallet>,
    ) -> Result<Self> {
        match config {
            ProviderConfig::Http(url) => {
                let rpc_url = url
                    .parse()
                    .map_err(|e| Error::transport(format!("invalid HTTP URL `{url}`: {e}")))?;
                let provider = match wallet {
                    Some(wallet) => ProviderBuilder::new()
                        .wallet(wallet)
                        .connect_http(rpc_url)
                        .erased(),
                    None => ProviderBuilder::new().connect_http(rpc_url).erased(),
                };
                debug!(endpoint = %url, "connected over HTTP");
                Ok(Self {
                    provider,
                    endpoint: url,
                    kind: TransportKind::Http,
                })
            }
            ProviderConfig::WebSocket(url) => {
                let provider = match wallet {
                    Some(wallet) => ProviderBuilder::new()
                        .wallet(wallet)
                        .connect(&url)
                        .await
                        .map_err(|e| Error::transport(format!("websocket connect failed: {e}")))?
                        .erased(),
                    None => ProviderBuilder::new()
                        .connect(&url)
                        .await
                        .map_err(|e| Error::transport(format!("websocket connect failed: {e}")))?
                        .erased(),
                };
                debug!(endpoint = %url, "connected over WebSocket");
                Ok(Self {
                    provider,
                    endpoint: url,
                    kind: TransportKind::WebSocket,
                })
            }
            #[cfg(unix)]
            ProviderConfig::Ipc(path) => {
                use alloy::providers::IpcConnect;
                let endpoint = path.display().to_string();
                let ipc = IpcConnect::new(path.to_string_lossy().to_string());
                let provider = match wallet {
                    Some(wallet) => ProviderBuilder::new()
                        .wallet(wallet)
                        .connect_ipc(ipc)
                        .await
                        .map_err(|e| Error::transport(format!("ipc connect failed: {e}")))?
                        .erased(),
                    None => ProviderBuilder::new()
                        .connect_ipc(ipc)
                        .await
                        .map_err(|e| Error::transport(format!("ipc connect failed: {e}")))?
                        .erased(),
                };
                debug!(endpoint = %endpoint, "connected over IPC");
                Ok(Self {
                    provider,
                    endpoint,
                    kind: TransportKind::Ipc,
                })
            }
        }
    }
}

#[async_trait::async_trait]
impl NodeClient for AlloyNodeClient {
    async fn call(&self, request: TransactionRequest, block: BlockId) -> Result<Bytes> {
        self.provider
            .call(request)
            .block(block)
            .await
            .map_err(classify_rpc_error)
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<B256> {
        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(classify_rpc_error)?;
        Ok(*pending.tx_hash())
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>> {
        self.provider
            .get_logs(filter)
            .await
            .map_err(classify_rpc_error)
    }

    async fn subscribe_logs(&self, filter: &Filter) -> Result<LogSubscription> {
        if !self.supports_subscriptions() {
            return Err(Error::transport(format!(
                "{} does not support subscriptions, use a websocket or ipc endpoint",
                self.endpoint
            )));
        }
        let mut subscription = self
            .provider
            .subscribe_logs(filter)
            .await
            .map_err(classify_rpc_error)?;

        let (tx, rx) = mpsc::channel(LOG_CHANNEL_CAPACITY);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Receiver dropped; release the transport subscription
                    _ = tx.closed() => break,
                    received = subscription.recv() => match received {
                        Ok(log) => {
                            if tx.send(Ok(log)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(missed)) => {
                            warn!(missed, "log subscription lagged");
                            let _ = tx.send(Err(Error::SubscriptionOverflow { missed })).await;
                            break;
                        }
                        Err(RecvError::Closed) => {
                            let _ = tx
                                .send(Err(Error::transport("log subscription closed by node")))
                                .await;
                            break;
                        }
                    },
                }
            }
        });

        Ok(LogSubscription { receiver: rx, task })
    }

    fn supports_subscriptions(&self) -> bool {
        match self.kind {
            TransportKind::Http => false,
            TransportKind::WebSocket => true,
            #[cfg(unix)]
            TransportKind::Ipc => true,
        }
    }

    fn endpoint_name(&self) -> String {
        self.endpoint.clone()
    }
}

/// Split node failures into reverts (carrying their revert data) and plain
/// transport errors
fn classify_rpc_error(err: TransportError) -> Error {
    if let Some(data) = err.as_error_resp().and_then(|payload| payload.as_revert_data()) {
        return Error::Revert(RevertReason::Raw(data));
    }
    Error::transport(err)
}
