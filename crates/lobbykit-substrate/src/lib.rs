//! Substrate boundary for lobbykit.
//!
//! The lobby core never talks to a network itself. An external
//! networking substrate (a relay SDK, a test harness, a replay file)
//! sits behind two seams:
//!
//! - [`Substrate`]: the outbound side. The core hands it a
//!   [`NetworkRequest`] and returns immediately.
//! - [`event_queue`]: the inbound side. The substrate pushes
//!   network events into an [`EventSender`]; the core drains the matching
//!   [`EventReceiver`] one event at a time.
//!
//! The event queue is where ordering is enforced: every event carries a
//! sequence number and the receiver refuses anything that isn't newer
//! than what it already delivered.

mod channel;
mod error;
mod queue;

pub use channel::ChannelSubstrate;
pub use error::SubstrateError;
pub use queue::{
    DEFAULT_EVENT_QUEUE_CAPACITY, EventReceiver, EventSender, Sequenced,
    event_queue,
};

use lobbykit_protocol::NetworkRequest;

/// Accepts outbound requests for the networking substrate.
///
/// `request` must not block: it queues or sends the request and returns.
/// Whether the request succeeded is reported later as a
/// [`NetworkEvent`](lobbykit_protocol::NetworkEvent). An `Err` here means
/// the request never left.
pub trait Substrate: Send + 'static {
    fn request(&self, req: NetworkRequest) -> Result<(), SubstrateError>;
}
