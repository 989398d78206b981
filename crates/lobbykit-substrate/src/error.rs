/// Errors at the substrate boundary.
#[derive(Debug, thiserror::Error)]
pub enum SubstrateError {
    /// Nothing is listening for requests anymore.
    #[error("substrate closed: {0}")]
    Closed(String),

    /// The event queue is full.
    #[error("event queue full")]
    QueueFull,

    /// The event queue's consumer is gone.
    #[error("event queue closed")]
    QueueClosed,
}
