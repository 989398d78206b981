//! Coordinator actor: one Tokio task that owns the [`Coordinator`].
//!
//! UI actions arrive as commands through a [`CoordinatorHandle`];
//! substrate events arrive through the ordered [`EventReceiver`]. The
//! task handles one input at a time, so all lobby state is mutated from a
//! single place and never shared.

use lobbykit_protocol::RoomInfo;
use lobbykit_session::{ConnectionState, PlayerView};
use lobbykit_substrate::{
    EventReceiver, EventSender, Sequenced, Substrate, event_queue,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::{Coordinator, CoordinatorConfig, EventStream, LobbyError};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// A UI action forwarded to the coordinator.
#[derive(Debug)]
enum Action {
    Connect(String),
    JoinLobby,
    LeaveLobby,
    CreateRoom { name: String, max_players: String },
    JoinRoom(String),
    JoinRandomRoom,
    LeaveRoom,
    StartMatch,
}

impl Action {
    fn apply<S: Substrate>(
        self,
        coordinator: &mut Coordinator<S>,
    ) -> Result<(), LobbyError> {
        match self {
            Self::Connect(nickname) => coordinator.connect(&nickname),
            Self::JoinLobby => coordinator.join_lobby(),
            Self::LeaveLobby => coordinator.leave_lobby(),
            Self::CreateRoom { name, max_players } => {
                coordinator.create_room(&name, &max_players)
            }
            Self::JoinRoom(name) => coordinator.join_room(&name),
            Self::JoinRandomRoom => coordinator.join_random_room(),
            Self::LeaveRoom => coordinator.leave_room(),
            Self::StartMatch => coordinator.start_match(),
        }
    }
}

/// Commands sent to the coordinator actor. The `oneshot::Sender` is the
/// reply channel.
enum Command {
    Act {
        action: Action,
        reply: oneshot::Sender<Result<(), LobbyError>>,
    },
    State {
        reply: oneshot::Sender<ConnectionState>,
    },
    Rooms {
        reply: oneshot::Sender<Vec<RoomInfo>>,
    },
    Roster {
        reply: oneshot::Sender<Option<Vec<PlayerView>>>,
    },
    Shutdown,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a running coordinator. Cheap to clone.
///
/// Every method fails with [`LobbyError::Stopped`] once the task is gone.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    pub async fn connect(&self, nickname: &str) -> Result<(), LobbyError> {
        self.act(Action::Connect(nickname.to_string())).await
    }

    pub async fn join_lobby(&self) -> Result<(), LobbyError> {
        self.act(Action::JoinLobby).await
    }

    pub async fn leave_lobby(&self) -> Result<(), LobbyError> {
        self.act(Action::LeaveLobby).await
    }

    /// See [`Coordinator::create_room`].
    pub async fn create_room(
        &self,
        name: &str,
        max_players_input: &str,
    ) -> Result<(), LobbyError> {
        self.act(Action::CreateRoom {
            name: name.to_string(),
            max_players: max_players_input.to_string(),
        })
        .await
    }

    pub async fn join_room(&self, name: &str) -> Result<(), LobbyError> {
        self.act(Action::JoinRoom(name.to_string())).await
    }

    pub async fn join_random_room(&self) -> Result<(), LobbyError> {
        self.act(Action::JoinRandomRoom).await
    }

    pub async fn leave_room(&self) -> Result<(), LobbyError> {
        self.act(Action::LeaveRoom).await
    }

    pub async fn start_match(&self) -> Result<(), LobbyError> {
        self.act(Action::StartMatch).await
    }

    pub async fn state(&self) -> Result<ConnectionState, LobbyError> {
        self.query(|reply| Command::State { reply }).await
    }

    /// The cached room list.
    pub async fn rooms(&self) -> Result<Vec<RoomInfo>, LobbyError> {
        self.query(|reply| Command::Rooms { reply }).await
    }

    /// The roster of the joined room, or `None` outside a room.
    pub async fn roster(&self) -> Result<Option<Vec<PlayerView>>, LobbyError> {
        self.query(|reply| Command::Roster { reply }).await
    }

    /// Tells the coordinator to stop.
    pub async fn shutdown(&self) -> Result<(), LobbyError> {
        self.sender
            .send(Command::Shutdown)
            .await
            .map_err(|_| LobbyError::Stopped)
    }

    async fn act(&self, action: Action) -> Result<(), LobbyError> {
        self.query(|reply| Command::Act { action, reply }).await?
    }

    async fn query<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| LobbyError::Stopped)?;
        reply_rx.await.map_err(|_| LobbyError::Stopped)
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct CoordinatorActor<S: Substrate> {
    coordinator: Coordinator<S>,
    commands: mpsc::Receiver<Command>,
    inbound: EventReceiver,
}

impl<S: Substrate> CoordinatorActor<S> {
    /// Runs until shutdown or until every handle is dropped.
    ///
    /// Queued substrate events go before commands, so a command always
    /// sees the newest state the substrate has reported.
    async fn run(mut self) {
        tracing::info!("coordinator started");
        let mut inbound_open = true;

        loop {
            tokio::select! {
                biased;

                item = self.inbound.recv(), if inbound_open => match item {
                    Some(Sequenced { seq, event }) => {
                        if let Err(e) = self.coordinator.handle_event(event) {
                            tracing::warn!(seq, error = %e, "substrate event ignored");
                        }
                    }
                    None => {
                        tracing::info!("substrate event queue closed");
                        inbound_open = false;
                    }
                },
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => {
                        if !self.handle_command(cmd) {
                            tracing::info!("coordinator shutting down");
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        tracing::info!(
            last_seq = self.inbound.last_seq(),
            dropped = self.inbound.dropped(),
            "coordinator stopped"
        );
    }

    /// Returns `false` on shutdown.
    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Act { action, reply } => {
                let result = action.apply(&mut self.coordinator);
                if let Err(e) = &result {
                    tracing::debug!(error = %e, "action refused");
                }
                let _ = reply.send(result);
            }
            Command::State { reply } => {
                let _ = reply.send(self.coordinator.state());
            }
            Command::Rooms { reply } => {
                let _ = reply.send(self.coordinator.rooms());
            }
            Command::Roster { reply } => {
                let _ = reply.send(self.coordinator.room().map(|r| r.roster()));
            }
            Command::Shutdown => return false,
        }
        true
    }
}

/// Spawns the coordinator actor and returns a handle to it.
///
/// `command_capacity` bounds the command channel; callers wait when it
/// is full.
pub fn spawn_coordinator<S: Substrate>(
    coordinator: Coordinator<S>,
    inbound: EventReceiver,
    command_capacity: usize,
) -> (CoordinatorHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(command_capacity.max(1));

    let actor = CoordinatorActor {
        coordinator,
        commands: rx,
        inbound,
    };
    let task = tokio::spawn(actor.run());

    (CoordinatorHandle { sender: tx }, task)
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Everything a host needs after spawning a coordinator.
pub struct SpawnedCoordinator {
    /// Sends UI actions.
    pub handle: CoordinatorHandle,
    /// The substrate adapter pushes network events here.
    pub inbound: EventSender,
    /// Change-sets for the presentation layer.
    pub events: EventStream,
    pub task: JoinHandle<()>,
}

/// Builder for a [`Coordinator`].
///
/// # Example
///
/// ```rust,ignore
/// let (substrate, requests) = ChannelSubstrate::new();
/// let spawned = CoordinatorBuilder::new()
///     .random_join_capacity(8)
///     .spawn(substrate);
/// spawned.handle.connect("ana").await?;
/// ```
pub struct CoordinatorBuilder {
    config: CoordinatorConfig,
}

impl CoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            config: CoordinatorConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn random_join_capacity(mut self, capacity: u8) -> Self {
        self.config.random_join_capacity = capacity;
        self
    }

    pub fn match_level(mut self, level: u32) -> Self {
        self.config.match_level = level;
        self
    }

    pub fn avoid_known_names(mut self, avoid: bool) -> Self {
        self.config.avoid_known_names = avoid;
        self
    }

    /// Builds a coordinator to drive by hand.
    pub fn build<S: Substrate>(self, substrate: S) -> (Coordinator<S>, EventStream) {
        Coordinator::new(substrate, self.config)
    }

    /// Builds the coordinator, its event queue, and spawns the actor.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn spawn<S: Substrate>(self, substrate: S) -> SpawnedCoordinator {
        let config = self.config.validated();
        let (inbound, receiver) = event_queue(config.event_capacity);
        let command_capacity = config.command_capacity;

        let (coordinator, events) = Coordinator::new(substrate, config);
        let (handle, task) =
            spawn_coordinator(coordinator, receiver, command_capacity);

        SpawnedCoordinator {
            handle,
            inbound,
            events,
            task,
        }
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
