//! Error types for the protocol layer.

/// Errors raised while turning raw user input into protocol values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The capacity field could not be read as a player count.
    ///
    /// Capacities are a single byte on the substrate side, so anything
    /// that isn't an integer in `0..=255` is rejected.
    #[error("invalid max players {input:?}: expected a number from 0 to 255")]
    InvalidCapacity { input: String },
}
