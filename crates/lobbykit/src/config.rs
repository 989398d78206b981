//! Coordinator configuration.

use serde::Deserialize;
use tracing::warn;

/// Tunables for the matchmaking coordinator.
///
/// Every field has a default, so a partial TOML/JSON document only needs
/// the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Capacity of the room created when a random join finds nothing.
    pub random_join_capacity: u8,
    /// Prefix of generated room names.
    pub room_name_prefix: String,
    /// Generated names use a number in `0..room_name_range`.
    pub room_name_range: u32,
    /// Level sent with the load-level request when the master starts the
    /// match.
    pub match_level: u32,
    /// Re-roll generated names that the room cache already knows.
    /// Off by default: the substrate rejects real collisions anyway.
    pub avoid_known_names: bool,
    /// UI command channel size of the spawned coordinator.
    pub command_capacity: usize,
    /// Substrate event queue size.
    pub event_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            random_join_capacity: 20,
            room_name_prefix: "Room ".to_string(),
            room_name_range: 1000,
            match_level: 1,
            avoid_known_names: false,
            command_capacity: 32,
            event_capacity: lobbykit_substrate::DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }
}

impl CoordinatorConfig {
    /// Re-roll attempts before a colliding generated name is used anyway.
    pub const MAX_NAME_ATTEMPTS: u32 = 16;

    /// Fixes out-of-range values so the config is safe to use.
    ///
    /// - `room_name_range` is at least 1.
    /// - Channel capacities are at least 1 (Tokio panics on 0).
    pub fn validated(mut self) -> Self {
        if self.room_name_range == 0 {
            warn!("room_name_range is 0, using 1");
            self.room_name_range = 1;
        }
        if self.command_capacity == 0 {
            warn!("command_capacity is 0, using 1");
            self.command_capacity = 1;
        }
        if self.event_capacity == 0 {
            warn!("event_capacity is 0, using 1");
            self.event_capacity = 1;
        }
        self
    }
}
