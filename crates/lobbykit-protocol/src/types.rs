//! Core protocol types.
//!
//! Everything here is plain data with serde derives, so a substrate
//! adapter can move it over whatever framing it owns. The lobby core never
//! encodes these itself.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The substrate-assigned number of a player inside one room.
///
/// Actor numbers are unique per room session and are never reused while
/// the session lives, so they double as the roster key. Lower numbers
/// joined earlier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ActorNumber(pub u32);

impl fmt::Display for ActorNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

/// Options sent along with a create-room request.
///
/// `max_players == 0` means the room has no player limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomOptions {
    pub max_players: u8,
    pub is_open: bool,
    pub is_visible: bool,
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            max_players: 0,
            is_open: true,
            is_visible: true,
        }
    }
}

impl RoomOptions {
    /// Options for an open, visible room with the given capacity.
    pub fn with_max_players(max_players: u8) -> Self {
        Self {
            max_players,
            ..Self::default()
        }
    }

    /// Builds options from the raw text of a capacity input field.
    ///
    /// Blank input keeps the default (unlimited) capacity. Surrounding
    /// whitespace is ignored.
    pub fn from_capacity_input(input: &str) -> Result<Self, ProtocolError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let max_players: u8 =
            trimmed.parse().map_err(|_| ProtocolError::InvalidCapacity {
                input: input.to_string(),
            })?;
        Ok(Self::with_max_players(max_players))
    }
}

/// A room as the room list shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub name: String,
    pub player_count: u8,
    /// 0 means no limit.
    pub max_players: u8,
    pub is_open: bool,
    pub is_visible: bool,
}

impl RoomInfo {
    /// Returns `true` if the room has a limit and has reached it.
    pub fn is_full(&self) -> bool {
        self.max_players != 0 && self.player_count >= self.max_players
    }
}

impl fmt::Display for RoomInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.max_players == 0 {
            write!(f, "{} ({})", self.name, self.player_count)
        } else {
            write!(
                f,
                "{} ({}/{})",
                self.name, self.player_count, self.max_players
            )
        }
    }
}

fn yes() -> bool {
    true
}

/// One entry of a room-list snapshot.
///
/// Snapshots are incremental: each delta describes a single room that
/// was added, changed, or dropped since the last snapshot. A delta that
/// is closed, invisible, or flagged as removed means "take this room off
/// the list".
///
/// Missing fields fall back to an open, visible, not-removed room so a
/// partial delta like `{"name": "A", "is_open": false}` reads naturally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDelta {
    /// Empty when the substrate sent no name; such deltas are malformed.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub player_count: u8,
    #[serde(default)]
    pub max_players: u8,
    #[serde(default = "yes")]
    pub is_open: bool,
    #[serde(default = "yes")]
    pub is_visible: bool,
    #[serde(default)]
    pub removed_from_list: bool,
}

impl RoomDelta {
    /// An open, visible room with the given occupancy.
    pub fn open(
        name: impl Into<String>,
        player_count: u8,
        max_players: u8,
    ) -> Self {
        Self {
            name: name.into(),
            player_count,
            max_players,
            is_open: true,
            is_visible: true,
            removed_from_list: false,
        }
    }

    /// A room that has been closed to new players.
    pub fn closed(name: impl Into<String>) -> Self {
        Self {
            is_open: false,
            ..Self::open(name, 0, 0)
        }
    }

    /// A room that has been hidden from the list.
    pub fn hidden(name: impl Into<String>) -> Self {
        Self {
            is_visible: false,
            ..Self::open(name, 0, 0)
        }
    }

    /// A room the server dropped from the list.
    pub fn removed(name: impl Into<String>) -> Self {
        Self {
            removed_from_list: true,
            ..Self::open(name, 0, 0)
        }
    }

    /// Returns `true` if this delta takes the room off the visible list.
    pub fn hides_room(&self) -> bool {
        !self.is_open || !self.is_visible || self.removed_from_list
    }

    /// The list entry this delta describes.
    pub fn to_info(&self) -> RoomInfo {
        RoomInfo {
            name: self.name.clone(),
            player_count: self.player_count,
            max_players: self.max_players,
            is_open: self.is_open,
            is_visible: self.is_visible,
        }
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// A player in a joined room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub actor: ActorNumber,
    pub nickname: String,
    #[serde(default)]
    pub is_master: bool,
}

impl Player {
    pub fn new(actor: u32, nickname: impl Into<String>) -> Self {
        Self {
            actor: ActorNumber(actor),
            nickname: nickname.into(),
            is_master: false,
        }
    }

    pub fn master(actor: u32, nickname: impl Into<String>) -> Self {
        Self {
            is_master: true,
            ..Self::new(actor, nickname)
        }
    }
}

// ---------------------------------------------------------------------------
// Failure reasons
// ---------------------------------------------------------------------------

/// Why the substrate refused a create, join, or join-random request.
///
/// Providers report failures as a numeric code plus a message.
/// [`FailureReason::from_code`] maps the codes the lobby core reacts to;
/// everything else is kept opaque in [`FailureReason::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FailureReason {
    /// A room with that name already exists and is open.
    NameConflict,
    RoomFull,
    RoomClosed,
    RoomNotFound,
    /// Random join found nothing to join.
    NoRoomsAvailable,
    /// A provider failure the core doesn't interpret.
    Other { code: i32, message: String },
}

impl FailureReason {
    pub const CODE_NAME_CONFLICT: i32 = 32766;
    pub const CODE_ROOM_FULL: i32 = 32765;
    pub const CODE_ROOM_CLOSED: i32 = 32764;
    pub const CODE_NO_ROOMS_AVAILABLE: i32 = 32760;
    pub const CODE_ROOM_NOT_FOUND: i32 = 32758;

    /// Maps a provider code/message pair to a reason.
    pub fn from_code(code: i32, message: impl Into<String>) -> Self {
        match code {
            Self::CODE_NAME_CONFLICT => Self::NameConflict,
            Self::CODE_ROOM_FULL => Self::RoomFull,
            Self::CODE_ROOM_CLOSED => Self::RoomClosed,
            Self::CODE_NO_ROOMS_AVAILABLE => Self::NoRoomsAvailable,
            Self::CODE_ROOM_NOT_FOUND => Self::RoomNotFound,
            _ => Self::Other {
                code,
                message: message.into(),
            },
        }
    }

    /// The provider code for this reason.
    pub fn code(&self) -> i32 {
        match self {
            Self::NameConflict => Self::CODE_NAME_CONFLICT,
            Self::RoomFull => Self::CODE_ROOM_FULL,
            Self::RoomClosed => Self::CODE_ROOM_CLOSED,
            Self::NoRoomsAvailable => Self::CODE_NO_ROOMS_AVAILABLE,
            Self::RoomNotFound => Self::CODE_ROOM_NOT_FOUND,
            Self::Other { code, .. } => *code,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameConflict => write!(f, "room name already in use"),
            Self::RoomFull => write!(f, "room is full"),
            Self::RoomClosed => write!(f, "room is closed"),
            Self::RoomNotFound => write!(f, "room does not exist"),
            Self::NoRoomsAvailable => write!(f, "no rooms available"),
            Self::Other { code, message } => {
                write!(f, "provider error {code}: {message}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Substrate traffic
// ---------------------------------------------------------------------------

/// Everything the networking substrate can tell the lobby core.
///
/// Events are delivered one at a time, in the order the substrate
/// produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NetworkEvent {
    // -- Connection lifecycle --

    /// Reached the substrate's entry server.
    Connected,

    /// Authenticated against the master server; lobby and room requests
    /// are now possible.
    ConnectedToMaster,

    Disconnected { cause: String },

    /// The substrate's own human-readable client state. Passed through to
    /// the UI untouched.
    ClientStateChanged { state: String },

    // -- Lobby --

    JoinedLobby,

    /// An incremental room-list snapshot.
    RoomListUpdate { rooms: Vec<RoomDelta> },

    LeftLobby,

    // -- Room lifecycle --

    /// The room this client asked to create now exists. A `JoinedRoom`
    /// follows.
    CreatedRoom { name: String },

    /// This client is now in a room. `players` is the full roster,
    /// including the local player.
    JoinedRoom {
        room: RoomInfo,
        players: Vec<Player>,
        local_actor: ActorNumber,
    },

    /// The last create, join, or join-random request failed.
    JoinFailed { reason: FailureReason },

    PlayerEntered { player: Player },

    PlayerLeft { actor: ActorNumber },

    /// The substrate elected a new master client.
    MasterClientSwitched { actor: ActorNumber },

    /// This client left its room.
    LeftRoom,
}

/// Everything the lobby core can ask of the networking substrate.
///
/// Requests are fire-and-forget: the outcome arrives later as a
/// [`NetworkEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NetworkRequest {
    Connect { nickname: String },
    JoinLobby,
    LeaveLobby,
    CreateRoom { name: String, options: RoomOptions },
    JoinRoom { name: String },
    JoinRandomRoom,
    LeaveRoom,
    /// Switch every client in the room to the given level.
    LoadLevel { level: u32 },
}

// =========================================================================
// Tests
// =========================================================================
