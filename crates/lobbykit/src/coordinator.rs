//! The matchmaking coordinator.
//!
//! Owns the lobby and room sessions, turns UI actions into substrate
//! requests, and turns substrate events back into [`CoordinatorEvent`]s.
//! Everything here is synchronous; [`crate::runtime`] drives it from a
//! Tokio task.

use lobbykit_protocol::{
    ActorNumber, FailureReason, NetworkEvent, NetworkRequest, Player,
    RoomDelta, RoomInfo, RoomOptions,
};
use lobbykit_registry::{ChangeSet, RoomRegistry};
use lobbykit_session::{
    ConnectionState, LobbySession, PlayerChangeSet, RoomSession, SessionError,
};
use lobbykit_substrate::Substrate;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{CoordinatorConfig, LobbyError};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// What the coordinator tells the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    /// The substrate's client-state string, passed through untouched.
    ConnectionStatus(String),
    StateChanged(ConnectionState),
    /// The room list after a snapshot, a lobby leave, or a disconnect.
    RoomListChanged(ChangeSet),
    /// This client joined a room; carries the full roster.
    RoomJoined(PlayerChangeSet),
    PlayersChanged(PlayerChangeSet),
    /// Whether the local player may start the match. Sent on join and
    /// whenever the answer changes.
    CanStartMatch(bool),
    LeftRoom,
    /// A create, join, or random join failed and wasn't recovered.
    RequestFailed(FailureReason),
    /// The load-level request went out.
    MatchStarting { level: u32 },
}

/// Receiving end of the coordinator's event channel.
pub type EventStream = mpsc::UnboundedReceiver<CoordinatorEvent>;

/// The room request waiting for its outcome event.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingRequest {
    Create { name: String },
    Join { name: String },
    JoinRandom,
    Leave,
}

impl PendingRequest {
    fn room_name(&self) -> &str {
        match self {
            Self::Create { name } | Self::Join { name } => name,
            Self::JoinRandom | Self::Leave => "",
        }
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Single owner of all lobby state.
///
/// Actions return as soon as the request is handed to the substrate; the
/// outcome comes back later through [`handle_event`](Self::handle_event).
/// At most one create/join/leave request is in flight at a time.
pub struct Coordinator<S: Substrate> {
    substrate: S,
    config: CoordinatorConfig,
    lobby: LobbySession,
    room: Option<RoomSession>,
    pending: Option<PendingRequest>,
    nickname: Option<String>,
    status: String,
    can_start: bool,
    events: mpsc::UnboundedSender<CoordinatorEvent>,
}

impl<S: Substrate> Coordinator<S> {
    /// Creates a disconnected coordinator and the stream its events go to.
    pub fn new(substrate: S, config: CoordinatorConfig) -> (Self, EventStream) {
        let (events, stream) = mpsc::unbounded_channel();
        let coordinator = Self {
            substrate,
            config: config.validated(),
            lobby: LobbySession::new(),
            room: None,
            pending: None,
            nickname: None,
            status: String::new(),
            can_start: false,
            events,
        };
        (coordinator, stream)
    }

    // -- UI actions --------------------------------------------------------

    /// Sets the local nickname and starts connecting.
    pub fn connect(&mut self, nickname: &str) -> Result<(), LobbyError> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(LobbyError::Validation(
                "nickname must not be empty".into(),
            ));
        }

        self.lobby.begin_connect()?;
        if let Err(e) = self.substrate.request(NetworkRequest::Connect {
            nickname: nickname.to_string(),
        }) {
            self.lobby.on_disconnected();
            return Err(e.into());
        }

        info!(%nickname, "connecting");
        self.nickname = Some(nickname.to_string());
        self.emit(CoordinatorEvent::StateChanged(ConnectionState::Connecting));
        Ok(())
    }

    /// Asks to enter the lobby. A no-op if already there.
    pub fn join_lobby(&mut self) -> Result<(), LobbyError> {
        if self.lobby.in_lobby() {
            debug!("join_lobby while in lobby, ignoring");
            return Ok(());
        }
        self.ensure_on_master()?;
        self.substrate.request(NetworkRequest::JoinLobby)?;
        Ok(())
    }

    /// Asks to leave the lobby. A no-op outside it.
    pub fn leave_lobby(&mut self) -> Result<(), LobbyError> {
        if !self.lobby.in_lobby() {
            return Ok(());
        }
        self.substrate.request(NetworkRequest::LeaveLobby)?;
        Ok(())
    }

    /// Requests a new room.
    ///
    /// `max_players_input` is the raw text of the capacity field: blank
    /// means unlimited. A blank `name` gets a generated one.
    pub fn create_room(
        &mut self,
        name: &str,
        max_players_input: &str,
    ) -> Result<(), LobbyError> {
        self.ensure_idle()?;
        self.ensure_on_master()?;

        let options = RoomOptions::from_capacity_input(max_players_input)?;

        let name = match name.trim() {
            "" => self.generate_room_name(),
            given => given.to_string(),
        };
        if self.lobby.registry().get(&name).is_some_and(|r| r.is_open) {
            return Err(LobbyError::Conflict(name));
        }

        self.send_create(name, options)
    }

    /// Requests to join the named room, leaving the lobby first.
    pub fn join_room(&mut self, name: &str) -> Result<(), LobbyError> {
        self.ensure_idle()?;
        self.ensure_on_master()?;

        let name = name.trim();
        if name.is_empty() {
            return Err(LobbyError::Validation(
                "room name must not be empty".into(),
            ));
        }
        if self.lobby.registry().get(name).is_some_and(RoomInfo::is_full) {
            return Err(LobbyError::Capacity(name.to_string()));
        }

        let left_lobby = self.lobby.in_lobby();
        if left_lobby {
            self.substrate.request(NetworkRequest::LeaveLobby)?;
        }
        if let Err(e) = self.substrate.request(NetworkRequest::JoinRoom {
            name: name.to_string(),
        }) {
            // Undo the lobby leave so the room list keeps coming.
            if left_lobby {
                if let Err(rejoin) =
                    self.substrate.request(NetworkRequest::JoinLobby)
                {
                    warn!(error = %rejoin, "could not rejoin lobby");
                }
            }
            return Err(e.into());
        }

        info!(room = %name, "join requested");
        self.pending = Some(PendingRequest::Join {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Requests any open room. If none exists, a room is created instead.
    pub fn join_random_room(&mut self) -> Result<(), LobbyError> {
        self.ensure_idle()?;
        self.ensure_on_master()?;

        self.substrate.request(NetworkRequest::JoinRandomRoom)?;
        info!("random join requested");
        self.pending = Some(PendingRequest::JoinRandom);
        Ok(())
    }

    /// Leaves the current room. A no-op outside a room.
    pub fn leave_room(&mut self) -> Result<(), LobbyError> {
        self.ensure_idle()?;
        let Some(room) = &self.room else {
            debug!("leave_room outside a room, ignoring");
            return Ok(());
        };
        let name = room.name().to_string();

        self.substrate.request(NetworkRequest::LeaveRoom)?;
        info!(room = %name, "leave requested");
        self.pending = Some(PendingRequest::Leave);
        Ok(())
    }

    /// Starts the match if the local player is master; otherwise does
    /// nothing.
    pub fn start_match(&mut self) -> Result<(), LobbyError> {
        let Some(room) = &self.room else {
            debug!("start_match outside a room, ignoring");
            return Ok(());
        };
        if !room.can_start_match() {
            debug!(room = %room.name(), "start_match by non-master, ignoring");
            return Ok(());
        }

        let level = self.config.match_level;
        self.substrate.request(NetworkRequest::LoadLevel { level })?;
        info!(room = %room.name(), level, "match starting");
        self.emit(CoordinatorEvent::MatchStarting { level });
        Ok(())
    }

    // -- Substrate events --------------------------------------------------

    /// Applies one substrate event.
    ///
    /// An `Err` means the event didn't fit the current state and was
    /// ignored; the coordinator is unchanged.
    pub fn handle_event(&mut self, event: NetworkEvent) -> Result<(), LobbyError> {
        match event {
            NetworkEvent::Connected => {
                info!("connected to entry server");
                Ok(())
            }
            NetworkEvent::ConnectedToMaster => self.on_connected_to_master(),
            NetworkEvent::Disconnected { cause } => {
                self.on_disconnected(&cause);
                Ok(())
            }
            NetworkEvent::ClientStateChanged { state } => {
                self.status.clone_from(&state);
                self.emit(CoordinatorEvent::ConnectionStatus(state));
                Ok(())
            }
            NetworkEvent::JoinedLobby => {
                let before = self.lobby.state();
                self.lobby.on_joined_lobby()?;
                self.emit_state_if_changed(before);
                Ok(())
            }
            NetworkEvent::RoomListUpdate { rooms } => self.on_room_list(&rooms),
            NetworkEvent::LeftLobby => {
                self.leave_lobby_locally();
                Ok(())
            }
            NetworkEvent::CreatedRoom { name } => {
                info!(room = %name, "room created");
                Ok(())
            }
            NetworkEvent::JoinedRoom {
                room,
                players,
                local_actor,
            } => self.on_joined_room(&room, players, local_actor),
            NetworkEvent::JoinFailed { reason } => self.on_join_failed(reason),
            NetworkEvent::PlayerEntered { player } => {
                let changes = self.room_mut()?.player_entered(player);
                self.publish_roster(changes);
                Ok(())
            }
            NetworkEvent::PlayerLeft { actor } => {
                let changes = self.room_mut()?.player_left(actor)?;
                self.publish_roster(changes);
                Ok(())
            }
            NetworkEvent::MasterClientSwitched { actor } => {
                let changes = self.room_mut()?.master_switched(actor)?;
                self.publish_roster(changes);
                Ok(())
            }
            NetworkEvent::LeftRoom => {
                self.on_left_room();
                Ok(())
            }
        }
    }

    fn on_connected_to_master(&mut self) -> Result<(), LobbyError> {
        let before = self.lobby.state();
        let removed = self.cached_names();
        self.lobby.on_connected_to_master()?;
        if before == ConnectionState::InLobby {
            self.emit(CoordinatorEvent::RoomListChanged(ChangeSet {
                removed,
                ..ChangeSet::default()
            }));
        }
        self.emit_state_if_changed(before);
        Ok(())
    }

    fn on_disconnected(&mut self, cause: &str) {
        warn!(%cause, pending = ?self.pending, "disconnected");
        self.pending = None;

        if let Some(room) = self.room.take() {
            self.emit(CoordinatorEvent::PlayersChanged(room.close()));
            self.emit(CoordinatorEvent::LeftRoom);
        }
        self.set_can_start(false);

        let before = self.lobby.state();
        let removed = self.cached_names();
        self.lobby.on_disconnected();
        if !removed.is_empty() {
            self.emit(CoordinatorEvent::RoomListChanged(ChangeSet {
                removed,
                ..ChangeSet::default()
            }));
        }
        self.emit_state_if_changed(before);
    }

    fn on_room_list(&mut self, rooms: &[RoomDelta]) -> Result<(), LobbyError> {
        let changes = self.lobby.apply_snapshot(rooms).map_err(|e| match e {
            SessionError::Registry(err) => LobbyError::from(err),
            other => LobbyError::Session(other),
        })?;
        self.emit(CoordinatorEvent::RoomListChanged(changes));
        Ok(())
    }

    fn leave_lobby_locally(&mut self) {
        let before = self.lobby.state();
        let removed = self.cached_names();
        self.lobby.on_left_lobby();
        if before == ConnectionState::InLobby || !removed.is_empty() {
            self.emit(CoordinatorEvent::RoomListChanged(ChangeSet {
                removed,
                ..ChangeSet::default()
            }));
        }
        self.emit_state_if_changed(before);
    }

    fn on_joined_room(
        &mut self,
        room: &RoomInfo,
        players: Vec<Player>,
        local_actor: ActorNumber,
    ) -> Result<(), LobbyError> {
        // Nothing changes until the roster is known to be usable.
        let (session, changes) = RoomSession::join(room, players, local_actor)?;
        let pending = self.pending.take();

        // Entering a room implicitly leaves the lobby.
        if self.lobby.in_lobby() {
            self.leave_lobby_locally();
        }
        if let Some(old) = self.room.take() {
            warn!(old = %old.name(), new = %room.name, "joined a room while in another");
            self.emit(CoordinatorEvent::PlayersChanged(old.close()));
            self.emit(CoordinatorEvent::LeftRoom);
        }

        info!(room = %room.name, actor = %local_actor, ?pending, "room joined");

        self.room = Some(session);
        self.can_start = changes.can_start_match;
        let can_start = changes.can_start_match;
        self.emit(CoordinatorEvent::RoomJoined(changes));
        self.emit(CoordinatorEvent::CanStartMatch(can_start));
        Ok(())
    }

    fn on_join_failed(&mut self, reason: FailureReason) -> Result<(), LobbyError> {
        let pending = self.pending.take();

        if reason == FailureReason::NoRoomsAvailable
            && pending == Some(PendingRequest::JoinRandom)
        {
            let name = self.generate_room_name();
            let capacity = self.config.random_join_capacity;
            info!(room = %name, capacity, "no room to join at random, creating one");
            return self.send_create(name, RoomOptions::with_max_players(capacity));
        }

        let name = pending
            .as_ref()
            .map(PendingRequest::room_name)
            .unwrap_or_default();
        let err = LobbyError::from_failure(reason.clone(), name);
        warn!(error = %err, code = reason.code(), ?pending, "room request failed");
        self.emit(CoordinatorEvent::RequestFailed(reason));
        Ok(())
    }

    fn on_left_room(&mut self) {
        if self.pending == Some(PendingRequest::Leave) {
            self.pending = None;
        }
        match self.room.take() {
            Some(room) => {
                self.emit(CoordinatorEvent::PlayersChanged(room.close()));
            }
            None => debug!("left-room event without a joined room"),
        }
        self.emit(CoordinatorEvent::LeftRoom);
        self.set_can_start(false);
    }

    // -- Accessors ---------------------------------------------------------

    pub fn state(&self) -> ConnectionState {
        self.lobby.state()
    }

    pub fn registry(&self) -> &RoomRegistry {
        self.lobby.registry()
    }

    /// The cached room list, in display order.
    pub fn rooms(&self) -> Vec<RoomInfo> {
        self.lobby.registry().visible()
    }

    pub fn room(&self) -> Option<&RoomSession> {
        self.room.as_ref()
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// The last client-state string the substrate reported.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// A room request is waiting for its outcome.
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn can_start_match(&self) -> bool {
        self.can_start
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    // -- Helpers -----------------------------------------------------------

    fn ensure_idle(&self) -> Result<(), LobbyError> {
        match &self.pending {
            Some(pending) => {
                debug!(?pending, "request refused, another is in flight");
                Err(LobbyError::Busy)
            }
            None => Ok(()),
        }
    }

    fn ensure_on_master(&self) -> Result<(), LobbyError> {
        if let Some(room) = &self.room {
            return Err(LobbyError::InRoom(room.name().to_string()));
        }
        let state = self.lobby.state();
        if !state.is_ready() {
            return Err(LobbyError::NotConnected(state));
        }
        Ok(())
    }

    fn send_create(
        &mut self,
        name: String,
        options: RoomOptions,
    ) -> Result<(), LobbyError> {
        let max_players = options.max_players;
        self.substrate.request(NetworkRequest::CreateRoom {
            name: name.clone(),
            options,
        })?;
        info!(room = %name, max_players, "create requested");
        self.pending = Some(PendingRequest::Create { name });
        Ok(())
    }

    /// `"{prefix}{n}"` with `n` drawn from `0..room_name_range`.
    fn generate_room_name(&self) -> String {
        let mut rng = rand::rng();
        let prefix = &self.config.room_name_prefix;
        let range = self.config.room_name_range;
        let mut roll = || format!("{prefix}{}", rng.random_range(0..range));

        let mut name = roll();
        if self.config.avoid_known_names {
            let mut attempts = 1;
            while self.lobby.registry().contains(&name)
                && attempts < CoordinatorConfig::MAX_NAME_ATTEMPTS
            {
                name = roll();
                attempts += 1;
            }
        }
        name
    }

    fn room_mut(&mut self) -> Result<&mut RoomSession, LobbyError> {
        self.room.as_mut().ok_or(LobbyError::NotInRoom)
    }

    fn publish_roster(&mut self, changes: PlayerChangeSet) {
        let can_start = changes.can_start_match;
        self.emit(CoordinatorEvent::PlayersChanged(changes));
        self.set_can_start(can_start);
    }

    fn set_can_start(&mut self, can_start: bool) {
        if self.can_start != can_start {
            self.can_start = can_start;
            self.emit(CoordinatorEvent::CanStartMatch(can_start));
        }
    }

    fn cached_names(&self) -> Vec<String> {
        self.lobby.registry().iter().map(|r| r.name.clone()).collect()
    }

    fn emit_state_if_changed(&self, before: ConnectionState) {
        let after = self.lobby.state();
        if after != before {
            self.emit(CoordinatorEvent::StateChanged(after));
        }
    }

    fn emit(&self, event: CoordinatorEvent) {
        if self.events.send(event).is_err() {
            debug!("event stream closed, dropping coordinator event");
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use lobbykit_substrate::{ChannelSubstrate, SubstrateError};
    use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

    /// Forwards every request except `JoinRoom`, which it refuses.
    struct RefusesJoin {
        sender: UnboundedSender<NetworkRequest>,
    }

    impl Substrate for RefusesJoin {
        fn request(&self, req: NetworkRequest) -> Result<(), SubstrateError> {
            if matches!(req, NetworkRequest::JoinRoom { .. }) {
                return Err(SubstrateError::Closed("join refused".into()));
            }
            self.sender
                .send(req)
                .map_err(|_| SubstrateError::Closed("receiver gone".into()))
        }
    }

    struct Harness {
        coordinator: Coordinator<ChannelSubstrate>,
        requests: UnboundedReceiver<NetworkRequest>,
        events: EventStream,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(CoordinatorConfig::default())
        }

        fn with_config(config: CoordinatorConfig) -> Self {
            let (substrate, requests) = ChannelSubstrate::new();
            let (coordinator, events) = Coordinator::new(substrate, config);
            Self {
                coordinator,
                requests,
                events,
            }
        }

        /// Connected and in the lobby, with all traffic drained.
        fn in_lobby() -> Self {
            let mut h = Self::new();
            h.coordinator.connect("ana").unwrap();
            h.event(NetworkEvent::ConnectedToMaster);
            h.coordinator.join_lobby().unwrap();
            h.event(NetworkEvent::JoinedLobby);
            h.drain();
            h
        }

        fn event(&mut self, event: NetworkEvent) {
            self.coordinator.handle_event(event).unwrap();
        }

        fn requests(&mut self) -> Vec<NetworkRequest> {
            let mut out = Vec::new();
            while let Ok(req) = self.requests.try_recv() {
                out.push(req);
            }
            out
        }

        fn events(&mut self) -> Vec<CoordinatorEvent> {
            let mut out = Vec::new();
            while let Ok(ev) = self.events.try_recv() {
                out.push(ev);
            }
            out
        }

        fn drain(&mut self) {
            self.requests();
            self.events();
        }

        fn snapshot(&mut self, rooms: Vec<RoomDelta>) {
            self.event(NetworkEvent::RoomListUpdate { rooms });
        }

        fn joined(&mut self, name: &str, players: Vec<Player>, local: u32) {
            self.event(NetworkEvent::JoinedRoom {
                room: RoomDelta::open(name, players.len() as u8, 4).to_info(),
                players,
                local_actor: ActorNumber(local),
            });
        }
    }

    fn generated_number(name: &str) -> u32 {
        name.strip_prefix("Room ")
            .and_then(|n| n.parse().ok())
            .unwrap_or_else(|| panic!("not a generated name: {name}"))
    }

    // =====================================================================
    // connect() / lobby
    // =====================================================================

    #[test]
    fn test_connect_empty_nickname_is_rejected() {
        let mut h = Harness::new();

        let result = h.coordinator.connect("   ");

        assert!(matches!(result, Err(LobbyError::Validation(_))));
        assert!(h.requests().is_empty());
        assert_eq!(h.coordinator.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_connect_sends_request_and_reports_state() {
        let mut h = Harness::new();

        h.coordinator.connect("ana").unwrap();

        assert_eq!(
            h.requests(),
            vec![NetworkRequest::Connect {
                nickname: "ana".into()
            }]
        );
        assert_eq!(
            h.events(),
            vec![CoordinatorEvent::StateChanged(ConnectionState::Connecting)]
        );
        assert_eq!(h.coordinator.nickname(), Some("ana"));
    }

    #[test]
    fn test_connect_twice_is_rejected() {
        let mut h = Harness::new();
        h.coordinator.connect("ana").unwrap();

        let result = h.coordinator.connect("ana");

        assert!(matches!(result, Err(LobbyError::Session(_))));
    }

    #[test]
    fn test_join_lobby_before_master_is_rejected() {
        let mut h = Harness::new();
        h.coordinator.connect("ana").unwrap();
        h.drain();

        let result = h.coordinator.join_lobby();

        assert!(matches!(
            result,
            Err(LobbyError::NotConnected(ConnectionState::Connecting))
        ));
        assert!(h.requests().is_empty());
    }

    #[test]
    fn test_join_lobby_in_lobby_is_noop() {
        let mut h = Harness::in_lobby();

        h.coordinator.join_lobby().unwrap();

        assert!(h.requests().is_empty());
    }

    #[test]
    fn test_client_state_is_passed_through() {
        let mut h = Harness::new();

        h.event(NetworkEvent::ClientStateChanged {
            state: "Authenticating".into(),
        });

        assert_eq!(h.coordinator.status(), "Authenticating");
        assert_eq!(
            h.events(),
            vec![CoordinatorEvent::ConnectionStatus("Authenticating".into())]
        );
    }

    #[test]
    fn test_room_list_open_then_closed_scenario() {
        let mut h = Harness::in_lobby();

        h.snapshot(vec![RoomDelta::open("A", 1, 4)]);
        h.snapshot(vec![RoomDelta::closed("A")]);

        let lists: Vec<Vec<String>> = h
            .events()
            .into_iter()
            .filter_map(|e| match e {
                CoordinatorEvent::RoomListChanged(c) => {
                    Some(c.names().iter().map(|n| n.to_string()).collect())
                }
                _ => None,
            })
            .collect();
        assert_eq!(lists, vec![vec!["A".to_string()], vec![]]);
    }

    #[test]
    fn test_malformed_room_list_is_validation_error() {
        let mut h = Harness::in_lobby();

        let result = h.coordinator.handle_event(NetworkEvent::RoomListUpdate {
            rooms: vec![RoomDelta::open("", 1, 4)],
        });

        assert!(matches!(result, Err(LobbyError::Validation(_))));
    }

    #[test]
    fn test_left_lobby_clears_cache() {
        let mut h = Harness::in_lobby();
        h.snapshot(vec![RoomDelta::open("A", 1, 4), RoomDelta::open("B", 2, 4)]);
        h.drain();

        h.coordinator.leave_lobby().unwrap();
        assert_eq!(h.requests(), vec![NetworkRequest::LeaveLobby]);
        h.event(NetworkEvent::LeftLobby);

        assert!(h.coordinator.rooms().is_empty());
        assert_eq!(h.coordinator.state(), ConnectionState::ConnectedToMaster);
        let events = h.events();
        assert!(events.iter().any(|e| matches!(
            e,
            CoordinatorEvent::RoomListChanged(c)
                if c.rooms.is_empty() && c.removed == vec!["A", "B"]
        )));
    }

    // =====================================================================
    // create_room()
    // =====================================================================

    #[test]
    fn test_create_room_blank_inputs_generate_name_and_default_capacity() {
        let mut h = Harness::in_lobby();

        h.coordinator.create_room("", "").unwrap();

        let requests = h.requests();
        assert_eq!(requests.len(), 1);
        match &requests[0] {
            NetworkRequest::CreateRoom { name, options } => {
                assert!(generated_number(name) <= 999);
                assert_eq!(*options, RoomOptions::default());
            }
            other => panic!("unexpected request {other:?}"),
        }
        assert!(h.coordinator.is_busy());
    }

    #[test]
    fn test_create_room_generated_names_stay_in_range() {
        let h = Harness::new();
        for _ in 0..200 {
            let name = h.coordinator.generate_room_name();
            assert!(generated_number(&name) <= 999);
        }
    }

    #[test]
    fn test_create_room_bad_capacity_is_validation_error() {
        let mut h = Harness::in_lobby();

        let result = h.coordinator.create_room("A", "lots");

        assert!(matches!(result, Err(LobbyError::Validation(_))));
        assert!(h.requests().is_empty());
        assert!(!h.coordinator.is_busy());
    }

    #[test]
    fn test_create_room_with_capacity_sends_options() {
        let mut h = Harness::in_lobby();

        h.coordinator.create_room("Arena", " 4 ").unwrap();

        assert_eq!(
            h.requests(),
            vec![NetworkRequest::CreateRoom {
                name: "Arena".into(),
                options: RoomOptions::with_max_players(4),
            }]
        );
    }

    #[test]
    fn test_create_room_existing_open_name_is_conflict() {
        let mut h = Harness::in_lobby();
        h.snapshot(vec![RoomDelta::open("A", 1, 4)]);
        h.drain();

        let result = h.coordinator.create_room("A", "");

        assert!(matches!(result, Err(LobbyError::Conflict(ref n)) if n == "A"));
        assert!(h.requests().is_empty());
    }

    #[test]
    fn test_create_room_avoid_known_names_falls_back_after_attempts() {
        let mut h = Harness::with_config(CoordinatorConfig {
            room_name_range: 1,
            avoid_known_names: true,
            ..CoordinatorConfig::default()
        });
        h.coordinator.connect("ana").unwrap();
        h.event(NetworkEvent::ConnectedToMaster);
        h.event(NetworkEvent::JoinedLobby);
        h.snapshot(vec![RoomDelta::open("Room 0", 1, 4)]);

        // Only one name exists, so re-rolling can't help.
        assert_eq!(h.coordinator.generate_room_name(), "Room 0");
    }

    // =====================================================================
    // join_room() / join_random_room()
    // =====================================================================

    #[test]
    fn test_join_room_from_lobby_leaves_lobby_first() {
        let mut h = Harness::in_lobby();
        h.snapshot(vec![RoomDelta::open("A", 1, 4)]);
        h.drain();

        h.coordinator.join_room("A").unwrap();

        assert_eq!(
            h.requests(),
            vec![
                NetworkRequest::LeaveLobby,
                NetworkRequest::JoinRoom { name: "A".into() },
            ]
        );
    }

    #[test]
    fn test_join_room_empty_name_is_validation_error() {
        let mut h = Harness::in_lobby();

        let result = h.coordinator.join_room("");

        assert!(matches!(result, Err(LobbyError::Validation(_))));
        assert!(h.requests().is_empty());
        assert!(!h.coordinator.is_busy());
    }

    #[test]
    fn test_join_room_full_room_is_capacity_error() {
        let mut h = Harness::in_lobby();
        h.snapshot(vec![RoomDelta::open("A", 4, 4)]);
        h.drain();

        let result = h.coordinator.join_room("A");

        assert!(matches!(result, Err(LobbyError::Capacity(_))));
        assert!(h.requests().is_empty());
    }

    #[test]
    fn test_join_room_while_in_flight_is_busy() {
        let mut h = Harness::in_lobby();
        h.coordinator.join_room("A").unwrap();
        h.drain();

        let result = h.coordinator.join_room("B");

        assert!(matches!(result, Err(LobbyError::Busy)));
        assert!(matches!(h.coordinator.create_room("C", ""), Err(LobbyError::Busy)));
        assert!(matches!(h.coordinator.join_random_room(), Err(LobbyError::Busy)));
        assert!(h.requests().is_empty());
    }

    #[test]
    fn test_join_failed_clears_guard_and_reports() {
        let mut h = Harness::in_lobby();
        h.coordinator.join_room("A").unwrap();
        h.drain();

        h.event(NetworkEvent::JoinFailed {
            reason: FailureReason::RoomClosed,
        });

        assert!(!h.coordinator.is_busy());
        assert_eq!(
            h.events(),
            vec![CoordinatorEvent::RequestFailed(FailureReason::RoomClosed)]
        );
    }

    #[test]
    fn test_join_random_no_rooms_creates_exactly_one_room_of_twenty() {
        let mut h = Harness::in_lobby();
        h.coordinator.join_random_room().unwrap();
        assert_eq!(h.requests(), vec![NetworkRequest::JoinRandomRoom]);
        h.drain();

        h.event(NetworkEvent::JoinFailed {
            reason: FailureReason::NoRoomsAvailable,
        });

        let requests = h.requests();
        assert_eq!(requests.len(), 1);
        match &requests[0] {
            NetworkRequest::CreateRoom { name, options } => {
                assert!(generated_number(name) <= 999);
                assert_eq!(options.max_players, 20);
            }
            other => panic!("unexpected request {other:?}"),
        }
        // Recovered locally: nothing surfaces to the UI.
        assert!(h.events().is_empty());
        assert!(h.coordinator.is_busy());
    }

    #[test]
    fn test_join_random_other_failure_is_surfaced() {
        let mut h = Harness::in_lobby();
        h.coordinator.join_random_room().unwrap();
        h.drain();

        h.event(NetworkEvent::JoinFailed {
            reason: FailureReason::from_code(-1, "timeout"),
        });

        assert!(h.requests().is_empty());
        assert!(matches!(
            h.events().as_slice(),
            [CoordinatorEvent::RequestFailed(FailureReason::Other { .. })]
        ));
    }

    // =====================================================================
    // Room events
    // =====================================================================

    #[test]
    fn test_joined_room_leaves_lobby_and_emits_roster() {
        let mut h = Harness::in_lobby();
        h.snapshot(vec![RoomDelta::open("A", 1, 4)]);
        h.coordinator.join_room("A").unwrap();
        h.drain();

        h.joined("A", vec![Player::master(1, "bo"), Player::new(2, "ana")], 2);

        assert!(!h.coordinator.is_busy());
        assert!(h.coordinator.rooms().is_empty());
        let events = h.events();
        assert!(events.iter().any(|e| matches!(
            e,
            CoordinatorEvent::RoomJoined(c) if c.players.len() == 2
        )));
        assert_eq!(events.last(), Some(&CoordinatorEvent::CanStartMatch(false)));
    }

    #[test]
    fn test_master_leaving_lets_local_player_start() {
        let mut h = Harness::in_lobby();
        h.joined("A", vec![Player::master(1, "bo"), Player::new(2, "ana")], 2);
        h.drain();

        h.event(NetworkEvent::PlayerLeft { actor: ActorNumber(1) });

        let events = h.events();
        match &events[0] {
            CoordinatorEvent::PlayersChanged(c) => {
                assert_eq!(c.removed, vec![ActorNumber(1)]);
                assert_eq!(c.players.len(), 1);
                assert!(c.can_start_match);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[1], CoordinatorEvent::CanStartMatch(true));
        assert!(h.coordinator.can_start_match());
    }

    #[test]
    fn test_joined_room_without_local_player_keeps_lobby_and_pending() {
        let mut h = Harness::in_lobby();
        h.snapshot(vec![RoomDelta::open("A", 1, 4), RoomDelta::open("B", 2, 4)]);
        h.coordinator.join_room("A").unwrap();
        h.drain();

        let result = h.coordinator.handle_event(NetworkEvent::JoinedRoom {
            room: RoomDelta::open("A", 1, 4).to_info(),
            players: vec![Player::new(1, "bo")],
            local_actor: ActorNumber(9),
        });

        assert!(matches!(
            result,
            Err(LobbyError::Session(SessionError::LocalPlayerMissing(_)))
        ));
        assert!(h.coordinator.is_busy());
        assert_eq!(h.coordinator.rooms().len(), 2);
        assert_eq!(h.coordinator.state(), ConnectionState::InLobby);
        assert!(h.events().is_empty());
    }

    #[test]
    fn test_joined_room_without_local_player_keeps_current_room() {
        let mut h = Harness::in_lobby();
        h.joined("A", vec![Player::new(1, "ana")], 1);
        h.drain();

        let result = h.coordinator.handle_event(NetworkEvent::JoinedRoom {
            room: RoomDelta::open("B", 1, 4).to_info(),
            players: vec![Player::new(2, "bo")],
            local_actor: ActorNumber(9),
        });

        assert!(result.is_err());
        assert_eq!(h.coordinator.room().map(RoomSession::name), Some("A"));
        assert!(h.coordinator.can_start_match());
        assert!(h.events().is_empty());
    }

    #[test]
    fn test_joined_room_while_in_another_closes_the_old_one() {
        let mut h = Harness::in_lobby();
        h.joined("A", vec![Player::new(1, "ana")], 1);
        h.drain();

        h.joined("B", vec![Player::master(3, "cy"), Player::new(4, "ana")], 4);

        let events = h.events();
        match &events[0] {
            CoordinatorEvent::PlayersChanged(c) => {
                assert_eq!(c.room.name, "A");
                assert_eq!(c.removed, vec![ActorNumber(1)]);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[1], CoordinatorEvent::LeftRoom);
        assert!(matches!(
            &events[2],
            CoordinatorEvent::RoomJoined(c) if c.room.name == "B"
        ));
        assert_eq!(events[3], CoordinatorEvent::CanStartMatch(false));
        assert!(!h.coordinator.can_start_match());
    }

    #[test]
    fn test_join_room_refused_by_substrate_rejoins_lobby() {
        let (sender, mut requests) = mpsc::unbounded_channel();
        let (mut coordinator, _events) =
            Coordinator::new(RefusesJoin { sender }, CoordinatorConfig::default());
        coordinator.connect("ana").unwrap();
        coordinator.handle_event(NetworkEvent::ConnectedToMaster).unwrap();
        coordinator.handle_event(NetworkEvent::JoinedLobby).unwrap();
        while requests.try_recv().is_ok() {}

        let result = coordinator.join_room("A");

        assert!(matches!(result, Err(LobbyError::Transport(_))));
        assert!(!coordinator.is_busy());
        assert_eq!(requests.try_recv().unwrap(), NetworkRequest::LeaveLobby);
        assert_eq!(requests.try_recv().unwrap(), NetworkRequest::JoinLobby);
        assert!(requests.try_recv().is_err());
        // A later attempt isn't blocked by a stale in-flight request.
        coordinator.join_random_room().unwrap();
        assert!(coordinator.is_busy());
    }

    #[test]
    fn test_roster_event_outside_room_is_rejected() {
        let mut h = Harness::in_lobby();

        let result = h.coordinator.handle_event(NetworkEvent::PlayerEntered {
            player: Player::new(3, "cy"),
        });

        assert!(matches!(result, Err(LobbyError::NotInRoom)));
    }

    #[test]
    fn test_start_match_non_master_sends_nothing() {
        let mut h = Harness::in_lobby();
        h.joined("A", vec![Player::master(1, "bo"), Player::new(2, "ana")], 2);
        h.drain();

        h.coordinator.start_match().unwrap();

        assert!(h.requests().is_empty());
        assert!(h.events().is_empty());
    }

    #[test]
    fn test_start_match_master_loads_level() {
        let mut h = Harness::in_lobby();
        h.joined("A", vec![Player::new(1, "ana")], 1);
        h.drain();

        h.coordinator.start_match().unwrap();

        assert_eq!(h.requests(), vec![NetworkRequest::LoadLevel { level: 1 }]);
        assert_eq!(
            h.events(),
            vec![CoordinatorEvent::MatchStarting { level: 1 }]
        );
    }

    #[test]
    fn test_leave_room_round_trip() {
        let mut h = Harness::in_lobby();
        h.joined("A", vec![Player::new(1, "ana")], 1);
        h.drain();

        h.coordinator.leave_room().unwrap();
        assert_eq!(h.requests(), vec![NetworkRequest::LeaveRoom]);
        assert!(matches!(h.coordinator.leave_room(), Err(LobbyError::Busy)));
        h.event(NetworkEvent::LeftRoom);

        assert!(h.coordinator.room().is_none());
        assert!(!h.coordinator.is_busy());
        let events = h.events();
        assert!(events.contains(&CoordinatorEvent::LeftRoom));
        assert_eq!(events.last(), Some(&CoordinatorEvent::CanStartMatch(false)));
    }

    #[test]
    fn test_create_room_inside_room_is_rejected() {
        let mut h = Harness::in_lobby();
        h.joined("A", vec![Player::new(1, "ana")], 1);

        let result = h.coordinator.create_room("B", "");

        assert!(matches!(result, Err(LobbyError::InRoom(ref n)) if n == "A"));
    }

    #[test]
    fn test_disconnect_resets_everything() {
        let mut h = Harness::in_lobby();
        h.snapshot(vec![RoomDelta::open("A", 1, 4)]);
        h.coordinator.join_random_room().unwrap();
        h.drain();

        h.event(NetworkEvent::Disconnected {
            cause: "timeout".into(),
        });

        assert_eq!(h.coordinator.state(), ConnectionState::Disconnected);
        assert!(h.coordinator.rooms().is_empty());
        assert!(!h.coordinator.is_busy());
        assert_eq!(
            h.events().last(),
            Some(&CoordinatorEvent::StateChanged(ConnectionState::Disconnected))
        );
    }
}
