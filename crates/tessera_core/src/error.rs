//! # Buffer Error Types
//!
//! All errors that can occur while handing buffers between parties.

use thiserror::Error;

use crate::buffer::BufferId;
use crate::swapper::BufferState;

/// Errors that can occur in the buffer core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// The caller broke the hand-off protocol (e.g. over-acquiring).
    #[error("protocol violation: {reason}")]
    ProtocolViolation {
        /// What the caller did wrong.
        reason: String,
    },

    /// The buffer is not part of this swapper's pool.
    #[error("buffer {0} does not belong to this pool")]
    UnknownBuffer(BufferId),

    /// The buffer is not in the state the operation requires.
    #[error("buffer {id} is {actual}, expected {expected}")]
    InvalidTransition {
        /// The buffer.
        id: BufferId,
        /// State the operation requires.
        expected: BufferState,
        /// State the buffer is actually in.
        actual: BufferState,
    },

    /// Nothing has been produced that the compositor could show.
    #[error("no frame available for composition")]
    NoFrameAvailable,

    /// The swapper was torn down.
    #[error("swapper has been shut down")]
    ShutDown,

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The allocator could not provide a buffer.
    #[error("allocation failed: {0}")]
    Allocation(String),
}

/// Result type for buffer core operations.
pub type BufferResult<T> = Result<T, BufferError>;
