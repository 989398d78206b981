//! Error types for the room registry.

/// Errors that can occur while applying a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A delta arrived without a room name. `index` is its position in
    /// the batch. The whole batch is rejected.
    #[error("room delta at index {index} has no name")]
    MissingName { index: usize },
}
