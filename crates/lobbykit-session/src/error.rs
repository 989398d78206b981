//! Error types for the session layer.

use lobbykit_protocol::ActorNumber;
use lobbykit_registry::RegistryError;

use crate::ConnectionState;

/// Errors that can occur while applying substrate events to a session.
///
/// None of these are fatal: the session is left exactly as it was before
/// the offending event.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The lobby state machine doesn't allow this step.
    #[error("invalid connection transition {from} -> {to}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },

    /// A room-list snapshot arrived outside the lobby.
    #[error("room list update while {0}, not in lobby")]
    NotInLobby(ConnectionState),

    /// A roster event named an actor the room doesn't have.
    #[error("actor {0} is not in the room")]
    UnknownActor(ActorNumber),

    /// A join-succeeded roster didn't include the local player.
    #[error("joined roster is missing local actor {0}")]
    LocalPlayerMissing(ActorNumber),

    /// The snapshot itself was malformed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
