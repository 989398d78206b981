//! Shared vocabulary for lobbykit.
//!
//! This crate defines the data that crosses the boundary between the
//! external networking substrate and the lobby core:
//!
//! - **Room data** ([`RoomInfo`], [`RoomDelta`], [`RoomOptions`]): what
//!   the room list and room creation speak in.
//! - **Players** ([`Player`], [`ActorNumber`]): roster entries.
//! - **Substrate traffic** ([`NetworkEvent`], [`NetworkRequest`],
//!   [`FailureReason`]): what the substrate delivers and what the core
//!   asks of it.
//!
//! # Architecture
//!
//! The protocol layer has no behaviour of its own. It doesn't know about
//! caches, sessions, or matchmaking: only the shapes of the data.
//!
//! ```text
//! Substrate (events) → Protocol (types) → Registry / Sessions → Coordinator
//! ```

mod error;
mod types;

pub use error::ProtocolError;
pub use types::{
    ActorNumber, FailureReason, NetworkEvent, NetworkRequest, Player,
    RoomDelta, RoomInfo, RoomOptions,
};
