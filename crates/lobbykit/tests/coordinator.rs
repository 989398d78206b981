//! End-to-end tests for the spawned coordinator.
//!
//! A `ChannelSubstrate` stands in for the network: tests read the
//! requests the coordinator issues and push substrate events through the
//! ordered event queue, then observe the UI event stream.

use std::time::Duration;

use lobbykit::prelude::*;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

// =========================================================================
// Helpers
// =========================================================================

const WAIT: Duration = Duration::from_secs(2);

struct Client {
    spawned: SpawnedCoordinator,
    requests: UnboundedReceiver<NetworkRequest>,
}

impl Client {
    fn start() -> Self {
        Self::start_with(CoordinatorBuilder::new())
    }

    fn start_with(builder: CoordinatorBuilder) -> Self {
        let (substrate, requests) = ChannelSubstrate::new();
        Self {
            spawned: builder.spawn(substrate),
            requests,
        }
    }

    fn handle(&self) -> &CoordinatorHandle {
        &self.spawned.handle
    }

    async fn push(&mut self, event: NetworkEvent) {
        self.spawned.inbound.send(event).await.unwrap();
    }

    async fn next_request(&mut self) -> NetworkRequest {
        timeout(WAIT, self.requests.recv())
            .await
            .expect("timed out waiting for request")
            .expect("request channel closed")
    }

    async fn next_event(&mut self) -> CoordinatorEvent {
        timeout(WAIT, self.spawned.events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event stream closed")
    }

    /// Skips events until one matches.
    async fn wait_for(
        &mut self,
        pred: impl Fn(&CoordinatorEvent) -> bool,
    ) -> CoordinatorEvent {
        loop {
            let event = self.next_event().await;
            if pred(&event) {
                return event;
            }
        }
    }

    /// Connects and enters the lobby.
    async fn enter_lobby(&mut self) {
        self.handle().connect("ana").await.unwrap();
        assert!(matches!(
            self.next_request().await,
            NetworkRequest::Connect { .. }
        ));
        self.push(NetworkEvent::Connected).await;
        self.push(NetworkEvent::ConnectedToMaster).await;
        self.handle().join_lobby().await.unwrap();
        assert_eq!(self.next_request().await, NetworkRequest::JoinLobby);
        self.push(NetworkEvent::JoinedLobby).await;
        self.wait_for(|e| {
            *e == CoordinatorEvent::StateChanged(ConnectionState::InLobby)
        })
        .await;
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_lobby_flow_lists_rooms() {
    let mut client = Client::start();
    client.enter_lobby().await;

    client
        .push(NetworkEvent::RoomListUpdate {
            rooms: vec![RoomDelta::open("A", 1, 4), RoomDelta::hidden("B")],
        })
        .await;

    let event = client
        .wait_for(|e| matches!(e, CoordinatorEvent::RoomListChanged(_)))
        .await;
    let CoordinatorEvent::RoomListChanged(changes) = event else {
        unreachable!()
    };
    assert_eq!(changes.names(), vec!["A"]);

    let rooms = client.handle().rooms().await.unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].name, "A");
}

#[tokio::test]
async fn test_join_random_falls_back_to_create() {
    let mut client = Client::start();
    client.enter_lobby().await;

    client.handle().join_random_room().await.unwrap();
    assert_eq!(client.next_request().await, NetworkRequest::JoinRandomRoom);

    client
        .push(NetworkEvent::JoinFailed {
            reason: FailureReason::from_code(
                FailureReason::CODE_NO_ROOMS_AVAILABLE,
                "No match found",
            ),
        })
        .await;

    match client.next_request().await {
        NetworkRequest::CreateRoom { name, options } => {
            assert!(name.starts_with("Room "));
            assert_eq!(options.max_players, 20);
        }
        other => panic!("expected CreateRoom, got {other:?}"),
    }

    // Still waiting for the create: a second request is refused.
    let result = client.handle().join_room("X").await;
    assert!(matches!(result, Err(LobbyError::Busy)));
}

#[tokio::test]
async fn test_room_lifecycle_with_master_handover() {
    let mut client = Client::start();
    client.enter_lobby().await;

    client.handle().create_room("Arena", "4").await.unwrap();
    assert_eq!(
        client.next_request().await,
        NetworkRequest::CreateRoom {
            name: "Arena".into(),
            options: RoomOptions::with_max_players(4),
        }
    );
    client
        .push(NetworkEvent::CreatedRoom {
            name: "Arena".into(),
        })
        .await;
    client
        .push(NetworkEvent::JoinedRoom {
            room: RoomDelta::open("Arena", 1, 4).to_info(),
            players: vec![Player::new(1, "ana")],
            local_actor: ActorNumber(1),
        })
        .await;
    client
        .wait_for(|e| *e == CoordinatorEvent::CanStartMatch(true))
        .await;

    // Another player joins, the substrate hands them master.
    client
        .push(NetworkEvent::PlayerEntered {
            player: Player::new(2, "bo"),
        })
        .await;
    client
        .push(NetworkEvent::MasterClientSwitched {
            actor: ActorNumber(2),
        })
        .await;
    client
        .wait_for(|e| *e == CoordinatorEvent::CanStartMatch(false))
        .await;

    client.handle().start_match().await.unwrap();

    // They leave again: the local player is promoted.
    client
        .push(NetworkEvent::PlayerLeft {
            actor: ActorNumber(2),
        })
        .await;
    client
        .wait_for(|e| *e == CoordinatorEvent::CanStartMatch(true))
        .await;

    client.handle().start_match().await.unwrap();
    // The non-master start above sent nothing; this is the first request
    // since the create.
    assert_eq!(
        client.next_request().await,
        NetworkRequest::LoadLevel { level: 1 }
    );

    let roster = client.handle().roster().await.unwrap().unwrap();
    assert_eq!(roster.len(), 1);
    assert!(roster[0].is_master && roster[0].is_local);
}

#[tokio::test]
async fn test_leave_lobby_clears_room_list() {
    let mut client = Client::start();
    client.enter_lobby().await;
    client
        .push(NetworkEvent::RoomListUpdate {
            rooms: vec![RoomDelta::open("A", 1, 4), RoomDelta::open("B", 0, 0)],
        })
        .await;

    client.handle().leave_lobby().await.unwrap();
    assert_eq!(client.next_request().await, NetworkRequest::LeaveLobby);
    client.push(NetworkEvent::LeftLobby).await;

    client
        .wait_for(|e| {
            *e == CoordinatorEvent::StateChanged(
                ConnectionState::ConnectedToMaster,
            )
        })
        .await;
    assert!(client.handle().rooms().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_out_of_order_events_never_reach_coordinator() {
    let mut client = Client::start();
    client.enter_lobby().await;

    let inbound = &mut client.spawned.inbound;
    inbound
        .send_sequenced(
            100,
            NetworkEvent::RoomListUpdate {
                rooms: vec![RoomDelta::open("new", 1, 4)],
            },
        )
        .await
        .unwrap();
    // Stale snapshot that would re-add a room the list already dropped.
    inbound
        .send_sequenced(
            99,
            NetworkEvent::RoomListUpdate {
                rooms: vec![RoomDelta::open("stale", 1, 4)],
            },
        )
        .await
        .unwrap();

    let names: Vec<String> = client
        .handle()
        .rooms()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["new"]);
}

#[tokio::test]
async fn test_validation_errors_reach_caller() {
    let client = Client::start();

    let result = client.handle().connect("").await;
    assert!(matches!(result, Err(LobbyError::Validation(_))));

    let result = client.handle().create_room("A", "").await;
    assert!(matches!(result, Err(LobbyError::NotConnected(_))));
}

#[tokio::test]
async fn test_shutdown_stops_handle() {
    let client = Client::start_with(CoordinatorBuilder::new().match_level(3));
    let handle = client.handle().clone();

    handle.shutdown().await.unwrap();
    timeout(WAIT, client.spawned.task)
        .await
        .expect("task did not stop")
        .unwrap();

    assert!(matches!(handle.state().await, Err(LobbyError::Stopped)));
}
