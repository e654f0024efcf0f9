//! Scripted node stand-in shared by the integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use alloy::eips::BlockId;
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use alloy_primitives::{Address, Bytes, LogData, B256, U256};
use tokio::sync::mpsc;

use evmbind::provider::LogSubscription;
use evmbind::{Error, NodeClient, Result};

/// A node whose every answer is scripted ahead of time
///
/// Requests are recorded so tests can assert what actually went over the
/// seam. Unscripted calls fail loudly instead of hanging.
pub struct MockNode {
    calls: Mutex<VecDeque<Result<Bytes>>>,
    sends: Mutex<VecDeque<Result<B256>>>,
    log_batches: Mutex<VecDeque<Result<Vec<Log>>>>,
    push_feed: Mutex<Option<mpsc::Receiver<Result<Log>>>>,
    pushes: bool,

    pub seen_calls: Mutex<Vec<(TransactionRequest, BlockId)>>,
    pub seen_sends: Mutex<Vec<TransactionRequest>>,
    pub seen_filters: Mutex<Vec<Filter>>,
    pub seen_subscriptions: Mutex<Vec<Filter>>,
}

impl MockNode {
    /// An HTTP-like node: request/response only, no pushes
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(VecDeque::new()),
            sends: Mutex::new(VecDeque::new()),
            log_batches: Mutex::new(VecDeque::new()),
            push_feed: Mutex::new(None),
            pushes: false,
            seen_calls: Mutex::new(Vec::new()),
            seen_sends: Mutex::new(Vec::new()),
            seen_filters: Mutex::new(Vec::new()),
            seen_subscriptions: Mutex::new(Vec::new()),
        })
    }

    /// A WebSocket-like node; the returned sender feeds its push side
    pub fn with_pushes() -> (Arc<Self>, mpsc::Sender<Result<Log>>) {
        let (tx, rx) = mpsc::channel(64);
        let node = Arc::new(Self {
            calls: Mutex::new(VecDeque::new()),
            sends: Mutex::new(VecDeque::new()),
            log_batches: Mutex::new(VecDeque::new()),
            push_feed: Mutex::new(Some(rx)),
            pushes: true,
            seen_calls: Mutex::new(Vec::new()),
            seen_sends: Mutex::new(Vec::new()),
            seen_filters: Mutex::new(Vec::new()),
            seen_subscriptions: Mutex::new(Vec::new()),
        });
        (node, tx)
    }

    pub fn queue_call(&self, response: Result<Bytes>) {
        self.calls.lock().unwrap().push_back(response);
    }

    pub fn queue_send(&self, response: Result<B256>) {
        self.sends.lock().unwrap().push_back(response);
    }

    pub fn queue_logs(&self, batch: Result<Vec<Log>>) {
        self.log_batches.lock().unwrap().push_back(batch);
    }
}

#[async_trait::async_trait]
impl NodeClient for MockNode {
    async fn call(&self, request: TransactionRequest, block: BlockId) -> Result<Bytes> {
        self.seen_calls.lock().unwrap().push((request, block));
        self.calls.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(Error::Transport {
                message: "unscripted call".to_string(),
            })
        })
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<B256> {
        self.seen_sends.lock().unwrap().push(request);
        self.sends.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(Error::Transport {
                message: "unscripted transaction".to_string(),
            })
        })
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>> {
        self.seen_filters.lock().unwrap().push(filter.clone());
        self.log_batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn subscribe_logs(&self, filter: &Filter) -> Result<LogSubscription> {
        self.seen_subscriptions.lock().unwrap().push(filter.clone());
        let receiver = self.push_feed.lock().unwrap().take().ok_or(Error::Transport {
            message: "push side not scripted".to_string(),
        })?;
        Ok(LogSubscription {
            receiver,
            task: tokio::spawn(async {}),
        })
    }

    fn supports_subscriptions(&self) -> bool {
        self.pushes
    }

    fn endpoint_name(&self) -> String {
        "mock://node".to_string()
    }
}

/// ERC20-ish interface exercising every declaration kind the registry knows
pub const TOKEN_ABI: &str = r#"[
    {
        "type": "function",
        "name": "balanceOf",
        "inputs": [{"name": "owner", "type": "address"}],
        "outputs": [{"name": "", "type": "uint256"}],
        "stateMutability": "view"
    },
    {
        "type": "function",
        "name": "getBtcBlockchainBestChainHeight",
        "inputs": [],
        "outputs": [{"name": "", "type": "int256"}],
        "stateMutability": "view"
    },
    {
        "type": "function",
        "name": "transfer",
        "inputs": [
            {"name": "to", "type": "address"},
            {"name": "amount", "type": "uint256"}
        ],
        "outputs": [{"name": "", "type": "bool"}],
        "stateMutability": "nonpayable"
    },
    {
        "type": "function",
        "name": "deposit",
        "inputs": [],
        "outputs": [],
        "stateMutability": "payable"
    },
    {
        "type": "event",
        "name": "Transfer",
        "inputs": [
            {"name": "from", "type": "address", "indexed": true},
            {"name": "to", "type": "address", "indexed": true},
            {"name": "value", "type": "uint256", "indexed": false}
        ],
        "anonymous": false
    },
    {
        "type": "error",
        "name": "InsufficientBalance",
        "inputs": [
            {"name": "available", "type": "uint256"},
            {"name": "required", "type": "uint256"}
        ]
    },
    {"type": "receive", "stateMutability": "payable"}
]"#;

pub fn token_address() -> Address {
    Address::repeat_byte(0x70)
}

/// One 32-byte return word holding a small number
pub fn word(value: u64) -> Bytes {
    Bytes::from(U256::from(value).to_be_bytes::<32>().to_vec())
}

pub const TRANSFER_TOPIC0: B256 = alloy_primitives::b256!(
    "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
);

/// The `value` field of a decoded Transfer emission
pub fn transfer_value(event: &evmbind::DecodedEvent) -> u64 {
    let Some(evmbind::DynSolValue::Uint(value, _)) = event.get("value") else {
        panic!("missing value field");
    };
    value.to::<u64>()
}

/// A mined Transfer(from, to, value) log at the given chain position
pub fn transfer_log(block: u64, index: u64, from: Address, to: Address, value: u64) -> Log {
    Log {
        inner: alloy_primitives::Log {
            address: token_address(),
            data: LogData::new_unchecked(
                vec![TRANSFER_TOPIC0, from.into_word(), to.into_word()],
                word(value),
            ),
        },
        block_number: Some(block),
        log_index: Some(index),
        transaction_hash: Some(B256::repeat_byte(0xab)),
        ..Default::default()
    }
}
