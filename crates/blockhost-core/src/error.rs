//! Error types for blockhost-core.

use thiserror::Error;

/// Error type for blockhost-core operations.
///
/// `NotReady` and `Overflow` come back from ring-buffer operations. The frame
/// bridge treats both as non-fatal (silence or a dropped block) and never
/// forwards them to the audio callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Not enough buffered frames: requested {requested}, available {available}")]
    NotReady { requested: usize, available: usize },

    #[error("Ring buffer overflow: block of {requested} frames dropped, {free} free")]
    Overflow { requested: usize, free: usize },

    #[error("Event queue full: {capacity} events already pending for the next block")]
    EventQueueFull { capacity: usize },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid block size: {size}. Must be between 1 and {max}")]
    InvalidBlockSize { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, CoreError>;
