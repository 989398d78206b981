//! The room-list cache.

use indexmap::IndexMap;
use lobbykit_protocol::{RoomDelta, RoomInfo};

use crate::RegistryError;

/// The outcome of applying one snapshot batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Every room now visible, in first-seen order.
    pub rooms: Vec<RoomInfo>,
    /// Names that entered the list in this batch.
    pub added: Vec<String>,
    /// Names whose entry changed in this batch.
    pub updated: Vec<String>,
    /// Names that left the list in this batch.
    pub removed: Vec<String>,
}

impl ChangeSet {
    /// Returns `true` if the batch changed nothing.
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
    }

    /// Names of the visible rooms, in list order.
    pub fn names(&self) -> Vec<&str> {
        self.rooms.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Cache of joinable rooms, keyed by name.
///
/// Only open, visible, not-removed rooms are ever stored. Iteration
/// follows the order in which each name was first inserted; a room that
/// drops off the list and comes back is appended at the end.
///
/// Not thread-safe. The registry is owned by the lobby session and only
/// mutated from the single event-processing task.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: IndexMap<String, RoomInfo>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one snapshot batch.
    ///
    /// For each delta: a closed, invisible, or removed room is dropped
    /// from the cache (no-op if absent); anything else is inserted or
    /// overwritten. Applying the same batch twice leaves the cache as
    /// after the first application.
    ///
    /// # Errors
    /// Returns [`RegistryError::MissingName`] if any delta has an empty
    /// name. Validation happens before any mutation, so a rejected batch
    /// leaves the cache untouched.
    pub fn apply_delta(
        &mut self,
        deltas: &[RoomDelta],
    ) -> Result<ChangeSet, RegistryError> {
        if let Some(index) = deltas.iter().position(|d| d.name.is_empty()) {
            return Err(RegistryError::MissingName { index });
        }

        let mut changes = ChangeSet::default();

        for delta in deltas {
            if delta.hides_room() {
                if self.rooms.shift_remove(&delta.name).is_some() {
                    changes.removed.push(delta.name.clone());
                }
                continue;
            }

            let info = delta.to_info();
            match self.rooms.get_mut(&delta.name) {
                Some(existing) => {
                    if *existing != info {
                        *existing = info;
                        changes.updated.push(delta.name.clone());
                    }
                }
                None => {
                    self.rooms.insert(delta.name.clone(), info);
                    changes.added.push(delta.name.clone());
                }
            }
        }

        changes.rooms = self.visible();

        tracing::debug!(
            deltas = deltas.len(),
            added = changes.added.len(),
            updated = changes.updated.len(),
            removed = changes.removed.len(),
            visible = changes.rooms.len(),
            "applied room list snapshot"
        );

        Ok(changes)
    }

    /// Drops every cached room. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.rooms.len();
        self.rooms.clear();
        count
    }

    /// Looks up a room by name.
    pub fn get(&self, name: &str) -> Option<&RoomInfo> {
        self.rooms.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rooms.contains_key(name)
    }

    /// Iterates the cached rooms in list order.
    pub fn iter(&self) -> impl Iterator<Item = &RoomInfo> {
        self.rooms.values()
    }

    /// Clones the current list in order.
    pub fn visible(&self) -> Vec<RoomInfo> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
