//! Live-only push subscription over one event

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::abi::EventDescriptor;
use crate::error::Result;
use crate::event::{decode_log, DecodedEvent, LogFeed};

const SUBSCRIPTION_CAPACITY: usize = 256;

/// A push subscription delivering decoded emissions as they land
///
/// Produced by [`EventQuery::subscribe`](crate::event::EventQuery::subscribe).
/// Emissions buffer up to a bounded depth while the consumer is busy. The
/// first error delivered is also the last item; afterwards the subscription
/// is dead. Dropping it releases the node-side subscription.
#[derive(Debug)]
pub struct EventSubscription {
    receiver: mpsc::Receiver<Result<DecodedEvent>>,
    tasks: Vec<JoinHandle<()>>,
}

impl EventSubscription {
    pub(crate) fn start(descriptor: EventDescriptor, feed: LogFeed) -> Self {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        let task = tokio::spawn(forward(descriptor, feed, tx));
        Self {
            receiver: rx,
            tasks: vec![task],
        }
    }

    /// Next emission; `None` once the subscription has ended
    pub async fn recv(&mut self) -> Option<Result<DecodedEvent>> {
        self.receiver.recv().await
    }

    /// End the subscription and wait until the node-side one is released
    pub async fn cancel(mut self) {
        self.receiver.close();
        for task in self.tasks.drain(..) {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Decode incoming logs until the feed ends, an item fails, or the consumer
/// goes away
async fn forward(
    descriptor: EventDescriptor,
    mut feed: LogFeed,
    tx: mpsc::Sender<Result<DecodedEvent>>,
) {
    loop {
        tokio::select! {
            _ = tx.closed() => break,
            received = feed.recv() => match received {
                Some(Ok(log)) => {
                    let item = decode_log(&descriptor, &log);
                    let failed = item.is_err();
                    if tx.send(item).await.is_err() || failed {
                        break;
                    }
                }
                Some(Err(err)) => {
                    let _ = tx.send(Err(err)).await;
                    break;
                }
                None => break,
            }
        }
    }
    debug!(event = descriptor.name(), "subscription forwarder stopped");
    feed.shut_down().await;
}
