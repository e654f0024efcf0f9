//! History-then-live pull stream over one event

use std::collections::VecDeque;

use alloy::rpc::types::Log;

use crate::abi::EventDescriptor;
use crate::error::Result;
use crate::event::{decode_log, DecodedEvent, LogFeed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Still delivering, backlog first and live after
    Active,
    /// An error was yielded; nothing more will come
    Failed,
    /// Closed by the consumer, or a bounded backlog ran out
    Finished,
}

/// A pull stream of decoded emissions, oldest first
///
/// Produced by [`EventQuery::stream`](crate::event::EventQuery::stream).
/// History arrives before anything live, without gaps or replays across the
/// seam. The first yielded error is terminal.
pub struct EventStream {
    descriptor: EventDescriptor,
    backlog: VecDeque<Log>,
    live: Option<LogFeed>,
    /// Chain position of the newest delivered emission, used to drop logs
    /// the live side replays from the backlog
    delivered: Option<(u64, u64)>,
    phase: Phase,
}

impl EventStream {
    pub(crate) fn new(descriptor: EventDescriptor, backlog: Vec<Log>, live: LogFeed) -> Self {
        Self {
            descriptor,
            backlog: backlog.into(),
            live: Some(live),
            delivered: None,
            phase: Phase::Active,
        }
    }

    pub(crate) fn backlog_only(descriptor: EventDescriptor, backlog: Vec<Log>) -> Self {
        Self {
            descriptor,
            backlog: backlog.into(),
            live: None,
            delivered: None,
            phase: Phase::Active,
        }
    }

    pub fn event_name(&self) -> &str {
        self.descriptor.name()
    }

    /// True once history is drained and only live emissions remain
    pub fn is_live(&self) -> bool {
        self.phase == Phase::Active && self.backlog.is_empty() && self.live.is_some()
    }

    /// Next emission; `None` once the stream has ended
    ///
    /// Backlog decoding happens here, so a malformed historical log surfaces
    /// at the position it occupies. Any yielded error ends the stream: every
    /// later call returns `None`.
    pub async fn next(&mut self) -> Option<Result<DecodedEvent>> {
        loop {
            if self.phase != Phase::Active {
                return None;
            }
            if let Some(log) = self.backlog.pop_front() {
                match self.deliver(&log) {
                    Some(item) => return Some(item),
                    None => continue,
                }
            }
            let Some(feed) = self.live.as_mut() else {
                self.phase = Phase::Finished;
                return None;
            };
            match feed.recv().await {
                Some(Ok(log)) => match self.deliver(&log) {
                    Some(item) => return Some(item),
                    None => continue,
                },
                Some(Err(err)) => {
                    self.phase = Phase::Failed;
                    self.live = None;
                    return Some(Err(err));
                }
                None => {
                    self.phase = Phase::Finished;
                    self.live = None;
                    return None;
                }
            }
        }
    }

    /// Decode and account one log; `None` when it was already delivered
    fn deliver(&mut self, log: &Log) -> Option<Result<DecodedEvent>> {
        let position = log.block_number.zip(log.log_index);
        if let (Some(position), Some(delivered)) = (position, self.delivered) {
            if position <= delivered {
                return None;
            }
        }
        match decode_log(&self.descriptor, log) {
            Ok(event) => {
                if position.is_some() {
                    self.delivered = position;
                }
                Some(Ok(event))
            }
            Err(err) => {
                self.phase = Phase::Failed;
                self.backlog.clear();
                self.live = None;
                Some(Err(err))
            }
        }
    }

    /// End the stream and wait for its live source to release
    ///
    /// Safe to call at any point and more than once. Dropping the stream
    /// releases the source too, just without waiting.
    pub async fn close(&mut self) {
        if self.phase == Phase::Active {
            self.phase = Phase::Finished;
        }
        self.backlog.clear();
        if let Some(feed) = self.live.take() {
            feed.shut_down().await;
        }
    }
}
