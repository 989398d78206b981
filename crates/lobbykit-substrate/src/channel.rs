//! A [`Substrate`] that forwards requests into a Tokio channel.
//!
//! Adapters for a real networking SDK read the channel and translate each
//! request into SDK calls. Tests read it to assert exactly which requests
//! the lobby core issued.

use lobbykit_protocol::NetworkRequest;
use tokio::sync::mpsc;

use crate::{Substrate, SubstrateError};

/// Forwards every request into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSubstrate {
    sender: mpsc::UnboundedSender<NetworkRequest>,
}

impl ChannelSubstrate {
    /// Creates the substrate and the receiving end of its request channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NetworkRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Substrate for ChannelSubstrate {
    fn request(&self, req: NetworkRequest) -> Result<(), SubstrateError> {
        tracing::trace!(?req, "forwarding request to substrate");
        self.sender.send(req).map_err(|e| {
            SubstrateError::Closed(format!("request channel closed ({:?})", e.0))
        })
    }
}
