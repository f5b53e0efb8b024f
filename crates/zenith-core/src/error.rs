use thiserror::Error;

/// Errors raised by the core message/queue primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("lane queue is full")]
    QueueFull,
    #[error("lane queue is closed")]
    Closed,
}
