//! Room-list cache for lobbykit.
//!
//! The substrate broadcasts the room list as a stream of incremental
//! snapshots. [`RoomRegistry`] folds those snapshots into the set of rooms
//! a player can actually join, and reports each batch as a [`ChangeSet`]
//! in a stable order so list rendering is deterministic.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: name → room cache, insertion ordered
//! - [`ChangeSet`]: the visible list after a batch, plus what changed
//! - [`RegistryError`]: malformed snapshot input

mod error;
mod registry;

pub use error::RegistryError;
pub use registry::{ChangeSet, RoomRegistry};
