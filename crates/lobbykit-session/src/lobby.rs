//! Lobby session: connection state machine plus the room-list cache.

use lobbykit_protocol::RoomDelta;
use lobbykit_registry::{ChangeSet, RoomRegistry};
use serde::{Deserialize, Serialize};

use crate::SessionError;

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// Where the client is on its way into the lobby.
///
/// ```text
/// Disconnected ──▶ Connecting ──▶ ConnectedToMaster ◀──▶ InLobby
///       ▲              │                  │                  │
///       └──────────────┴──────────────────┴──────────────────┘
///                         (disconnect, from anywhere)
/// ```
///
/// - **Connecting**: a connect request is out; the substrate may report
///   intermediate progress but no requests are possible yet.
/// - **ConnectedToMaster**: rooms can be created or joined; no room list.
/// - **InLobby**: subscribed to room-list snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    ConnectedToMaster,
    InLobby,
}

impl ConnectionState {
    /// Returns `true` if moving to `target` is a legal step.
    pub fn can_transition_to(self, target: Self) -> bool {
        use ConnectionState::*;
        matches!(
            (self, target),
            (Disconnected, Connecting)
                | (Connecting, ConnectedToMaster)
                | (ConnectedToMaster, InLobby)
                | (InLobby, ConnectedToMaster)
                | (Connecting | ConnectedToMaster | InLobby, Disconnected)
        )
    }

    /// Returns `true` once the master server accepts room requests.
    pub fn is_ready(self) -> bool {
        matches!(self, Self::ConnectedToMaster | Self::InLobby)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::ConnectedToMaster => write!(f, "ConnectedToMaster"),
            Self::InLobby => write!(f, "InLobby"),
        }
    }
}

// ---------------------------------------------------------------------------
// LobbySession
// ---------------------------------------------------------------------------

/// The client's view of the lobby.
///
/// Owns the [`RoomRegistry`]. The cache only fills while `InLobby` and is
/// wiped, not diffed, whenever the client leaves the lobby or drops its
/// connection.
#[derive(Debug)]
pub struct LobbySession {
    state: ConnectionState,
    registry: RoomRegistry,
}

impl LobbySession {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            registry: RoomRegistry::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn in_lobby(&self) -> bool {
        self.state == ConnectionState::InLobby
    }

    /// A connect request went out.
    pub fn begin_connect(&mut self) -> Result<(), SessionError> {
        self.transition(ConnectionState::Connecting)
    }

    /// The master server accepted us.
    ///
    /// The substrate reports this again every time the client returns to
    /// the master server (e.g. after leaving a room), so a repeat while
    /// already `ConnectedToMaster` is accepted as a no-op.
    pub fn on_connected_to_master(&mut self) -> Result<(), SessionError> {
        if self.state == ConnectionState::ConnectedToMaster {
            return Ok(());
        }
        if self.state == ConnectionState::InLobby {
            self.registry.clear();
        }
        self.transition(ConnectionState::ConnectedToMaster)
    }

    /// The lobby join went through; snapshots will follow.
    pub fn on_joined_lobby(&mut self) -> Result<(), SessionError> {
        if self.in_lobby() {
            return Ok(());
        }
        self.transition(ConnectionState::InLobby)
    }

    /// Applies one room-list snapshot to the cache.
    ///
    /// # Errors
    /// - [`SessionError::NotInLobby`] outside the lobby; nothing changes.
    /// - [`SessionError::Registry`] if the snapshot is malformed; nothing
    ///   changes.
    pub fn apply_snapshot(
        &mut self,
        deltas: &[RoomDelta],
    ) -> Result<ChangeSet, SessionError> {
        if !self.in_lobby() {
            return Err(SessionError::NotInLobby(self.state));
        }
        Ok(self.registry.apply_delta(deltas)?)
    }

    /// Left the lobby: full cache reset. Returns how many rooms were
    /// dropped.
    pub fn on_left_lobby(&mut self) -> usize {
        let cleared = self.registry.clear();
        if self.in_lobby() {
            self.state = ConnectionState::ConnectedToMaster;
        }
        tracing::debug!(cleared, "left lobby, room cache cleared");
        cleared
    }

    /// Connection dropped, from whatever state. Clears the cache.
    pub fn on_disconnected(&mut self) -> usize {
        let cleared = self.registry.clear();
        self.state = ConnectionState::Disconnected;
        cleared
    }

    fn transition(
        &mut self,
        to: ConnectionState,
    ) -> Result<(), SessionError> {
        if !self.state.can_transition_to(to) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        tracing::debug!(from = %self.state, %to, "connection state changed");
        self.state = to;
        Ok(())
    }
}

impl Default for LobbySession {
    fn default() -> Self {
        Self::new()
    }
}
