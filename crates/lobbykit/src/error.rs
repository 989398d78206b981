//! Unified error type for lobbykit.

use lobbykit_protocol::{FailureReason, ProtocolError};
use lobbykit_registry::RegistryError;
use lobbykit_session::{ConnectionState, SessionError};
use lobbykit_substrate::SubstrateError;

/// Top-level error for coordinator operations.
///
/// Sub-crate errors convert through `From`, so `?` works across the
/// layers. Malformed input from the protocol and registry layers becomes
/// [`LobbyError::Validation`]. The remaining variants classify why a
/// lobby action was refused. None of them is fatal: the coordinator is
/// left as it was.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// Malformed input: empty nickname, unreadable capacity, malformed
    /// room-list delta.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A room with that name already exists and is open.
    #[error("room {0:?} already exists")]
    Conflict(String),

    #[error("room {0:?} not found")]
    NotFound(String),

    #[error("room {0:?} is full")]
    Capacity(String),

    #[error("room {0:?} is closed")]
    Closed(String),

    /// Random join found no room. The coordinator recovers from this by
    /// creating a room, so callers only see it outside that path.
    #[error("no rooms available")]
    Unavailable,

    /// A create, join, or leave request is still waiting for its outcome.
    #[error("another room request is in flight")]
    Busy,

    /// The action needs a master-server connection.
    #[error("not connected to the master server (state: {0})")]
    NotConnected(ConnectionState),

    /// The action isn't possible from inside a room.
    #[error("already in room {0:?}")]
    InRoom(String),

    /// A roster event arrived while not in a room.
    #[error("not in a room")]
    NotInRoom,

    /// A failure the substrate reported that the lobby doesn't interpret.
    #[error("substrate error {code}: {message}")]
    Substrate { code: i32, message: String },

    /// The coordinator task has stopped.
    #[error("coordinator stopped")]
    Stopped,

    #[error(transparent)]
    Transport(#[from] SubstrateError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl LobbyError {
    /// Maps a substrate failure for the room `name` the request was about.
    ///
    /// `name` is empty for random joins.
    pub fn from_failure(reason: FailureReason, name: &str) -> Self {
        match reason {
            FailureReason::NameConflict => Self::Conflict(name.to_string()),
            FailureReason::RoomFull => Self::Capacity(name.to_string()),
            FailureReason::RoomClosed => Self::Closed(name.to_string()),
            FailureReason::RoomNotFound => Self::NotFound(name.to_string()),
            FailureReason::NoRoomsAvailable => Self::Unavailable,
            FailureReason::Other { code, message } => {
                Self::Substrate { code, message }
            }
        }
    }
}

impl From<ProtocolError> for LobbyError {
    fn from(err: ProtocolError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<RegistryError> for LobbyError {
    fn from(err: RegistryError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<FailureReason> for LobbyError {
    fn from(reason: FailureReason) -> Self {
        Self::from_failure(reason, "")
    }
}
