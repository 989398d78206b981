//! # lobbykit
//!
//! Room directory and matchmaking coordinator for lobby-based multiplayer
//! clients.
//!
//! lobbykit keeps the client's view of a lobby (the room list), of the
//! joined room (roster and master client), and turns UI actions such as
//! "create room" or "join random" into requests for an external
//! networking substrate. The substrate reports back through an ordered
//! event queue; the coordinator answers with change-sets for the UI.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lobbykit::prelude::*;
//!
//! # async fn run() -> Result<(), LobbyError> {
//! let (substrate, _requests) = ChannelSubstrate::new();
//! let mut spawned = CoordinatorBuilder::new().spawn(substrate);
//!
//! spawned.handle.connect("ana").await?;
//! spawned.inbound.send(NetworkEvent::ConnectedToMaster).await?;
//! spawned.handle.join_random_room().await?;
//!
//! while let Some(event) = spawned.events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod coordinator;
mod error;
pub mod logging;
mod runtime;

pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, CoordinatorEvent, EventStream};
pub use error::LobbyError;
pub use runtime::{
    CoordinatorBuilder, CoordinatorHandle, SpawnedCoordinator,
    spawn_coordinator,
};

pub mod prelude {
    pub use crate::{
        Coordinator, CoordinatorBuilder, CoordinatorConfig, CoordinatorEvent,
        CoordinatorHandle, LobbyError, SpawnedCoordinator,
    };
    pub use lobbykit_protocol::{
        ActorNumber, FailureReason, NetworkEvent, NetworkRequest, Player,
        RoomDelta, RoomInfo, RoomOptions,
    };
    pub use lobbykit_registry::ChangeSet;
    pub use lobbykit_session::{
        ConnectionState, PlayerChangeSet, PlayerView, RoomSummary,
    };
    pub use lobbykit_substrate::{
        ChannelSubstrate, EventReceiver, EventSender, Substrate, event_queue,
    };
}
