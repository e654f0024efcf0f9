//! Query construction: topic filters, block ranges, and the three read paths

use std::sync::Arc;
use std::time::Duration;

use alloy::rpc::types::Filter;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, B256};
use tracing::debug;

use crate::abi::{EventDescriptor, EventField};
use crate::codec;
use crate::error::{Error, Result};
use crate::event::{decode_log, DecodedEvent, EventStream, EventSubscription, LogFeed};
use crate::provider::NodeClient;

/// How often the live phase re-queries when the transport cannot push
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Bounds for the historical part of a query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRange {
    /// First block to include; genesis when unset
    pub from: Option<u64>,
    /// Last block to include, inclusive; the chain head when unset
    pub to: Option<u64>,
    /// Contracts whose logs match; empty means the contract the query was
    /// built for
    pub addresses: Vec<Address>,
}

/// A query for one event of one contract
///
/// Indexed fields narrow the query server-side through topic slots; block
/// bounds narrow the historical part. The finished query can [`fetch`]
/// history, [`stream`] history then live emissions, or [`subscribe`] to live
/// emissions only.
///
/// [`fetch`]: EventQuery::fetch
/// [`stream`]: EventQuery::stream
/// [`subscribe`]: EventQuery::subscribe
pub struct EventQuery {
    descriptor: EventDescriptor,
    address: Address,
    client: Arc<dyn NodeClient>,
    /// Candidate sets per topic slot; an empty set is a wildcard
    slots: [Vec<B256>; 4],
    range: FilterRange,
    poll_interval: Duration,
}

impl std::fmt::Debug for EventQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQuery")
            .field("event", &self.descriptor.signature())
            .field("contract", &self.address)
            .field("range", &self.range)
            .finish()
    }
}

impl EventQuery {
    pub(crate) fn new(
        descriptor: EventDescriptor,
        address: Address,
        client: Arc<dyn NodeClient>,
    ) -> Self {
        Self {
            descriptor,
            address,
            client,
            slots: Default::default(),
            range: FilterRange::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn event_name(&self) -> &str {
        self.descriptor.name()
    }

    /// Constrain an indexed field to a set of candidate values
    ///
    /// A log matches when the field equals any candidate; separate fields
    /// combine conjunctively. Passing no candidates clears the constraint.
    /// Non-indexed fields live in log data, not topics, and are rejected.
    pub fn filter_field(
        mut self,
        field: &str,
        candidates: impl IntoIterator<Item = DynSolValue>,
    ) -> Result<Self> {
        let event = self.descriptor.name().to_string();
        let Some(target) = self.descriptor.fields().iter().find(|f| f.name == field) else {
            return Err(Error::filter(event, field, "event declares no such field"));
        };
        if !target.indexed {
            return Err(Error::filter(
                event,
                field,
                "field is not indexed; only indexed fields appear in topics",
            ));
        }
        let mut encoded = Vec::new();
        for candidate in candidates {
            encoded.push(codec::topic_for(&event, target, &candidate)?);
        }
        let slot = self.topic_slot(target);
        self.slots[slot] = encoded;
        Ok(self)
    }

    /// Topic slot an indexed field occupies
    ///
    /// Indexed fields take slots in declaration order. Slot 0 holds the
    /// signature hash for ordinary events, so their fields start at 1;
    /// anonymous events have no signature topic and start at 0.
    fn topic_slot(&self, field: &EventField) -> usize {
        let preceding = self
            .descriptor
            .indexed_fields()
            .filter(|f| f.position < field.position)
            .count();
        if self.descriptor.is_anonymous() {
            preceding
        } else {
            preceding + 1
        }
    }

    /// Widen the query to another contract emitting the same event
    ///
    /// The contract the query was built for stays in the allow-list. To
    /// replace the list outright, set [`FilterRange::addresses`] through
    /// [`range`](EventQuery::range).
    pub fn also_address(mut self, address: Address) -> Self {
        if self.range.addresses.is_empty() {
            self.range.addresses.push(self.address);
        }
        self.range.addresses.push(address);
        self
    }

    /// First block of the historical part
    pub fn from_block(mut self, block: u64) -> Self {
        self.range.from = Some(block);
        self
    }

    /// Last block of the historical part; bounding it makes [`stream`] end
    /// after the backlog instead of going live
    ///
    /// [`stream`]: EventQuery::stream
    pub fn to_block(mut self, block: u64) -> Self {
        self.range.to = Some(block);
        self
    }

    pub fn range(mut self, range: FilterRange) -> Self {
        self.range = range;
        self
    }

    /// Re-query cadence for the polling live phase; ignored on transports
    /// that push
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The wire filter this query will send
    pub fn build_filter(&self) -> Filter {
        self.assemble(true)
    }

    fn assemble(&self, with_range: bool) -> Filter {
        let addresses = if self.range.addresses.is_empty() {
            vec![self.address]
        } else {
            self.range.addresses.clone()
        };
        let mut filter = Filter::new().address(addresses);
        if !self.descriptor.is_anonymous() {
            filter = filter.event_signature(self.descriptor.topic0());
        } else if !self.slots[0].is_empty() {
            filter = filter.event_signature(self.slots[0].clone());
        }
        if !self.slots[1].is_empty() {
            filter = filter.topic1(self.slots[1].clone());
        }
        if !self.slots[2].is_empty() {
            filter = filter.topic2(self.slots[2].clone());
        }
        if !self.slots[3].is_empty() {
            filter = filter.topic3(self.slots[3].clone());
        }
        if with_range {
            if let Some(from) = self.range.from {
                filter = filter.from_block(from);
            }
            if let Some(to) = self.range.to {
                filter = filter.to_block(to);
            }
        }
        filter
    }

    /// Fetch and decode all matching historical emissions, oldest first
    pub async fn fetch(&self) -> Result<Vec<DecodedEvent>> {
        let logs = self.client.get_logs(&self.assemble(true)).await?;
        debug!(
            event = self.descriptor.signature(),
            count = logs.len(),
            "fetched historical logs"
        );
        logs.iter().map(|log| decode_log(&self.descriptor, log)).collect()
    }

    /// Open a pull stream of the backlog followed by live emissions
    ///
    /// The backlog is fetched up front; live emissions arrive by push where
    /// the transport supports it and by cursor polling where it does not.
    /// With [`to_block`] set the stream ends once the backlog drains.
    ///
    /// [`to_block`]: EventQuery::to_block
    pub async fn stream(self) -> Result<EventStream> {
        if self.range.to.is_some() {
            let backlog = self.client.get_logs(&self.assemble(true)).await?;
            return Ok(EventStream::backlog_only(self.descriptor, backlog));
        }
        if self.client.supports_subscriptions() {
            // Push first, history second: emissions landing in between show
            // up on both sides and the stream drops the replays, whereas the
            // other order would lose them outright.
            let live = LogFeed::subscribe(&self.client, &self.assemble(false)).await?;
            let backlog = self.client.get_logs(&self.assemble(true)).await?;
            debug!(
                event = self.descriptor.signature(),
                backlog = backlog.len(),
                "opened pushed event stream"
            );
            Ok(EventStream::new(self.descriptor, backlog, live))
        } else {
            let backlog = self.client.get_logs(&self.assemble(true)).await?;
            // Blocks past the last backlog hit were already covered and
            // cannot gain logs, so the cursor starts right after it.
            let cursor = backlog
                .iter()
                .filter_map(|log| log.block_number)
                .max()
                .map(|block| block + 1)
                .or(self.range.from)
                .unwrap_or(0);
            debug!(
                event = self.descriptor.signature(),
                backlog = backlog.len(),
                cursor,
                "opened polled event stream"
            );
            let live = LogFeed::poll(
                Arc::clone(&self.client),
                self.assemble(false),
                cursor,
                self.poll_interval,
            );
            Ok(EventStream::new(self.descriptor, backlog, live))
        }
    }

    /// Open a push subscription to live emissions only
    ///
    /// Needs a transport that can push; HTTP endpoints are refused rather
    /// than approximated with polling.
    pub async fn subscribe(self) -> Result<EventSubscription> {
        if !self.client.supports_subscriptions() {
            return Err(Error::transport(format!(
                "endpoint `{}` cannot push log subscriptions, use stream() instead",
                self.client.endpoint_name()
            )));
        }
        let feed = LogFeed::subscribe(&self.client, &self.assemble(false)).await?;
        debug!(event = self.descriptor.signature(), "opened live subscription");
        Ok(EventSubscription::start(self.descriptor, feed))
    }
}
