//! Client-side session state for lobbykit.
//!
//! Two sessions live here, one per scope a client can be in:
//!
//! 1. **Lobby** ([`LobbySession`]): the connection state machine and the
//!    room-list cache that is only meaningful while in the lobby.
//! 2. **Room** ([`RoomSession`]): the roster of a joined room, which
//!    player is master, and whether the local player may start the match.
//!
//! # How it fits in the stack
//!
//! ```text
//! Coordinator (above)  ← feeds substrate events in, forwards change-sets out
//!     ↕
//! Session Layer (this crate)  ← connection state, room cache, roster
//!     ↕
//! Registry / Protocol (below)  ← RoomRegistry, RoomDelta, Player
//! ```

mod error;
mod lobby;
mod room;

pub use error::SessionError;
pub use lobby::{ConnectionState, LobbySession};
pub use room::{PlayerChangeSet, PlayerView, RoomSession, RoomSummary};
