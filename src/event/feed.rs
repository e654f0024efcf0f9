//! Live log sources: push subscriptions and the polling fallback

use std::sync::Arc;
use std::time::Duration;

use alloy::rpc::types::{Filter, Log};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Result;
use crate::provider::NodeClient;

const FEED_CAPACITY: usize = 256;

/// A running source of live logs, transport details erased
///
/// Backed either by a node push subscription or by a cursor-polling task on
/// transports that cannot push. Ends after yielding an error; dropping it
/// aborts whatever tasks are feeding it.
pub(crate) struct LogFeed {
    receiver: mpsc::Receiver<Result<Log>>,
    tasks: Vec<JoinHandle<()>>,
}

impl LogFeed {
    /// Open a push-backed feed
    pub(crate) async fn subscribe(client: &Arc<dyn NodeClient>, filter: &Filter) -> Result<Self> {
        let subscription = client.subscribe_logs(filter).await?;
        Ok(Self {
            receiver: subscription.receiver,
            tasks: vec![subscription.task],
        })
    }

    /// Start a polling feed that re-queries from `cursor` every `interval`
    pub(crate) fn poll(
        client: Arc<dyn NodeClient>,
        filter: Filter,
        cursor: u64,
        interval: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let task = tokio::spawn(poll_loop(client, filter, cursor, interval, tx));
        Self {
            receiver: rx,
            tasks: vec![task],
        }
    }

    /// Wrap a bare channel, for exercising consumers without a node
    #[cfg(test)]
    pub(crate) fn from_channel(receiver: mpsc::Receiver<Result<Log>>) -> Self {
        Self {
            receiver,
            tasks: Vec::new(),
        }
    }

    pub(crate) async fn recv(&mut self) -> Option<Result<Log>> {
        self.receiver.recv().await
    }

    /// Stop the feeding tasks and wait for them to release their resources
    pub(crate) async fn shut_down(mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for LogFeed {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Re-query cadence loop for transports without push
///
/// Mined blocks never gain logs, so each round only asks from the cursor on
/// and advances it past the newest block seen. A transport failure is sent
/// once and ends the feed.
async fn poll_loop(
    client: Arc<dyn NodeClient>,
    filter: Filter,
    mut cursor: u64,
    interval: Duration,
    tx: mpsc::Sender<Result<Log>>,
) {
    debug!(from = cursor, "starting log polling");
    loop {
        tokio::select! {
            _ = tx.closed() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        match client.get_logs(&filter.clone().from_block(cursor)).await {
            Ok(batch) => {
                let newest = batch.iter().filter_map(|log| log.block_number).max();
                for log in batch {
                    if tx.send(Ok(log)).await.is_err() {
                        return;
                    }
                }
                if let Some(block) = newest {
                    cursor = cursor.max(block + 1);
                }
            }
            Err(err) => {
                warn!(error = %err, "log polling failed");
                let _ = tx.send(Err(err)).await;
                return;
            }
        }
    }
}
