//! Room session: the roster of the room this client has joined.
//!
//! The substrate elects the master client; this session tracks the
//! result so the UI can tell whether the local player may start the
//! match. When the substrate's word is missing (no master flagged on
//! join, or the master just left and no switch event has arrived yet),
//! the player with the lowest actor number is master.

use std::collections::BTreeMap;
use std::fmt;

use lobbykit_protocol::{ActorNumber, Player, RoomInfo};
use serde::{Deserialize, Serialize};

use crate::SessionError;

/// Room header shown above the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub name: String,
    pub player_count: usize,
    /// 0 means no limit.
    pub max_players: u8,
}

impl fmt::Display for RoomSummary {
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

/// One roster line as the UI renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub actor: ActorNumber,
    pub nickname: String,
    pub is_master: bool,
    /// This line is the local player.
    pub is_local: bool,
}

/// The roster after a membership event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerChangeSet {
    pub room: RoomSummary,
    /// Full roster, ordered by actor number.
    pub players: Vec<PlayerView>,
    pub added: Vec<ActorNumber>,
    pub removed: Vec<ActorNumber>,
    pub master: Option<ActorNumber>,
    /// The local player is master and may start the match.
    pub can_start_match: bool,
}

/// Membership state for a joined room.
///
/// Created from a join-succeeded event and dropped when the client
/// leaves. While the roster is non-empty exactly one player is master.
#[derive(Debug)]
pub struct RoomSession {
    name: String,
    max_players: u8,
    local_actor: ActorNumber,
    players: BTreeMap<ActorNumber, Player>,
    master: Option<ActorNumber>,
}

impl RoomSession {
    /// Builds the session from the roster the substrate sent on join.
    ///
    /// If the roster flags exactly one master, that player is master;
    /// otherwise the lowest actor number is. A repeated actor keeps the
    /// last entry.
    ///
    /// # Errors
    /// [`SessionError::LocalPlayerMissing`] if `local_actor` is not in
    /// `players`.
    pub fn join(
        room: &RoomInfo,
        players: Vec<Player>,
        local_actor: ActorNumber,
    ) -> Result<(Self, PlayerChangeSet), SessionError> {
        let players: BTreeMap<ActorNumber, Player> =
            players.into_iter().map(|p| (p.actor, p)).collect();

        if !players.contains_key(&local_actor) {
            return Err(SessionError::LocalPlayerMissing(local_actor));
        }

        let mut flagged = players.values().filter(|p| p.is_master);
        let master = match (flagged.next(), flagged.next()) {
            (Some(only), None) => Some(only.actor),
            _ => players.keys().next().copied(),
        };

        let mut session = Self {
            name: room.name.clone(),
            max_players: room.max_players,
            local_actor,
            players,
            master,
        };
        session.sync_master_flags();

        tracing::info!(
            room = %session.name,
            actor = %local_actor,
            players = session.players.len(),
            master = ?session.master,
            "joined room"
        );

        let added = session.players.keys().copied().collect();
        let changes = session.changes(added, Vec::new());
        Ok((session, changes))
    }

    /// Another player entered. A repeat for a known actor refreshes the
    /// nickname and leaves master status alone.
    pub fn player_entered(&mut self, player: Player) -> PlayerChangeSet {
        let actor = player.actor;
        let is_new = !self.players.contains_key(&actor);
        self.players.insert(actor, player);
        if self.master.is_none() {
            self.master = Some(actor);
        }
        self.sync_master_flags();

        tracing::debug!(room = %self.name, %actor, is_new, "player entered");

        let added = if is_new { vec![actor] } else { Vec::new() };
        self.changes(added, Vec::new())
    }

    /// A player left. If it was the master, the lowest remaining actor
    /// number takes over.
    ///
    /// # Errors
    /// [`SessionError::UnknownActor`] if `actor` isn't in the roster; the
    /// roster is unchanged.
    pub fn player_left(
        &mut self,
        actor: ActorNumber,
    ) -> Result<PlayerChangeSet, SessionError> {
        if self.players.remove(&actor).is_none() {
            return Err(SessionError::UnknownActor(actor));
        }

        if self.master == Some(actor) {
            self.master = self.players.keys().next().copied();
            tracing::info!(
                room = %self.name,
                old = %actor,
                new = ?self.master,
                "master left, promoted lowest actor"
            );
        }
        self.sync_master_flags();

        tracing::debug!(room = %self.name, %actor, "player left");
        Ok(self.changes(Vec::new(), vec![actor]))
    }

    /// The substrate elected `actor` as master.
    ///
    /// # Errors
    /// [`SessionError::UnknownActor`] if `actor` isn't in the roster.
    pub fn master_switched(
        &mut self,
        actor: ActorNumber,
    ) -> Result<PlayerChangeSet, SessionError> {
        if !self.players.contains_key(&actor) {
            return Err(SessionError::UnknownActor(actor));
        }
        self.master = Some(actor);
        self.sync_master_flags();
        tracing::info!(room = %self.name, %actor, "master switched");
        Ok(self.changes(Vec::new(), Vec::new()))
    }

    /// Tears the session down on self-leave, returning the final
    /// change-set with every actor removed.
    pub fn close(mut self) -> PlayerChangeSet {
        let removed: Vec<ActorNumber> = self.players.keys().copied().collect();
        self.players.clear();
        self.master = None;
        tracing::info!(room = %self.name, "left room, roster cleared");
        self.changes(Vec::new(), removed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_actor(&self) -> ActorNumber {
        self.local_actor
    }

    pub fn master(&self) -> Option<ActorNumber> {
        self.master
    }

    /// The local player is master.
    pub fn can_start_match(&self) -> bool {
        self.master == Some(self.local_actor)
    }

    pub fn player(&self, actor: ActorNumber) -> Option<&Player> {
        self.players.get(&actor)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            name: self.name.clone(),
            player_count: self.players.len(),
            max_players: self.max_players,
        }
    }

    /// The roster as UI lines, ordered by actor number.
    pub fn roster(&self) -> Vec<PlayerView> {
        self.players
            .values()
            .map(|p| PlayerView {
                actor: p.actor,
                nickname: p.nickname.clone(),
                is_master: p.is_master,
                is_local: p.actor == self.local_actor,
            })
            .collect()
    }

    fn sync_master_flags(&mut self) {
        for player in self.players.values_mut() {
            player.is_master = Some(player.actor) == self.master;
        }
    }

    fn changes(
        &self,
        added: Vec<ActorNumber>,
        removed: Vec<ActorNumber>,
    ) -> PlayerChangeSet {
        PlayerChangeSet {
            room: self.summary(),
            players: self.roster(),
            added,
            removed,
            master: self.master,
            can_start_match: self.can_start_match(),
        }
    }
}
