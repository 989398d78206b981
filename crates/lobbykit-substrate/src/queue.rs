//! Ordered inbound event queue.
//!
//! Room-list snapshots are incremental, so applying them out of order
//! corrupts the cache. The queue guarantees the consumer sees events in
//! strictly increasing sequence order:
//!
//! ```text
//! substrate ──EventSender──▶ [ bounded mpsc ] ──EventReceiver──▶ coordinator
//!             stamps seq                       drops seq <= last
//! ```
//!
//! There is exactly one producer per queue. [`EventSender`] is not
//! `Clone` for that reason: two producers stamping independently could
//! race and make a later event look stale.

use lobbykit_protocol::NetworkEvent;
use tokio::sync::mpsc;

use crate::SubstrateError;

/// Default number of events buffered between substrate and consumer.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 256;

/// An event tagged with its position in the substrate's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequenced<T> {
    pub seq: u64,
    pub event: T,
}

/// Creates a bounded event queue. Capacity is clamped to at least 1.
pub fn event_queue(capacity: usize) -> (EventSender, EventReceiver) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (
        EventSender { sender, next_seq: 1 },
        EventReceiver {
            receiver,
            last_seq: 0,
            dropped: 0,
        },
    )
}

/// Producer half, owned by the substrate adapter.
#[derive(Debug)]
pub struct EventSender {
    sender: mpsc::Sender<Sequenced<NetworkEvent>>,
    next_seq: u64,
}

impl EventSender {
    /// Stamps the next sequence number and enqueues the event, waiting
    /// for room if the queue is full.
    pub async fn send(
        &mut self,
        event: NetworkEvent,
    ) -> Result<u64, SubstrateError> {
        let seq = self.next_seq;
        self.sender
            .send(Sequenced { seq, event })
            .await
            .map_err(|_| SubstrateError::QueueClosed)?;
        self.next_seq += 1;
        Ok(seq)
    }

    /// Like [`send`](Self::send) but never waits. For substrates that
    /// deliver callbacks on a non-async thread.
    pub fn try_send(
        &mut self,
        event: NetworkEvent,
    ) -> Result<u64, SubstrateError> {
        let seq = self.next_seq;
        self.sender
            .try_send(Sequenced { seq, event })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SubstrateError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => {
                    SubstrateError::QueueClosed
                }
            })?;
        self.next_seq += 1;
        Ok(seq)
    }

    /// Enqueues an event under a sequence number the substrate assigned
    /// itself. Later auto-stamped events continue after `seq`.
    pub async fn send_sequenced(
        &mut self,
        seq: u64,
        event: NetworkEvent,
    ) -> Result<(), SubstrateError> {
        self.sender
            .send(Sequenced { seq, event })
            .await
            .map_err(|_| SubstrateError::QueueClosed)?;
        self.next_seq = self.next_seq.max(seq.saturating_add(1));
        Ok(())
    }
}

/// Consumer half, owned by the coordinator runtime.
#[derive(Debug)]
pub struct EventReceiver {
    receiver: mpsc::Receiver<Sequenced<NetworkEvent>>,
    last_seq: u64,
    dropped: u64,
}

impl EventReceiver {
    /// Returns the next in-order event, or `None` once the sender is gone
    /// and the queue is drained.
    ///
    /// Events whose sequence number is not greater than the last one
    /// delivered are discarded. Cancel-safe: nothing is lost if the
    /// future is dropped inside `tokio::select!`.
    pub async fn recv(&mut self) -> Option<Sequenced<NetworkEvent>> {
        loop {
            let item = self.receiver.recv().await?;
            if item.seq <= self.last_seq {
                self.dropped += 1;
                tracing::warn!(
                    seq = item.seq,
                    last_seq = self.last_seq,
                    "dropping out-of-order substrate event"
                );
                continue;
            }
            self.last_seq = item.seq;
            return Some(item);
        }
    }

    /// Sequence number of the last delivered event (0 before the first).
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// How many stale events have been discarded so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
