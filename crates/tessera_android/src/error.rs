//! # Driver Error Types
//!
//! Errors surfaced to native drivers and to the gralloc-facing layers.

use std::fmt;
use tessera_core::BufferError;
use tessera_shared::PixelFormat;
use thiserror::Error;

/// The gralloc entry point that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GrallocOp {
    /// `registerBuffer`
    Register,
    /// `unregisterBuffer`
    Unregister,
    /// `lock`
    Lock,
    /// `unlock`
    Unlock,
    /// `alloc` on the alloc device
    Alloc,
    /// `free` on the alloc device
    Free,
}

impl fmt::Display for GrallocOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Register => "register",
            Self::Unregister => "unregister",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::Alloc => "alloc",
            Self::Free => "free",
        })
    }
}

/// A status code returned by the gralloc module or alloc device.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("gralloc {op} failed with status {code}")]
pub struct GrallocError {
    /// Which call failed.
    pub op: GrallocOp,
    /// Module status code (negative errno by convention).
    pub code: i32,
}

impl GrallocError {
    /// Creates an error for `op`.
    #[must_use]
    pub const fn new(op: GrallocOp, code: i32) -> Self {
        Self { op, code }
    }
}

/// Errors that can occur while serving a native driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The driver handed back a handle it was never given (or a null one).
    #[error("unknown native buffer handle")]
    UnknownHandle,

    /// The driver asked about something we do not answer.
    #[error("unsupported query code {0}")]
    UnsupportedQuery(i32),

    /// No HAL format corresponds to this pixel format.
    #[error("pixel format {0:?} has no HAL equivalent")]
    UnsupportedFormat(PixelFormat),

    /// The swapper refused the operation.
    #[error(transparent)]
    Swapper(#[from] BufferError),

    /// The gralloc module refused the operation.
    #[error(transparent)]
    Gralloc(#[from] GrallocError),
}

/// Result type for driver-facing operations.
pub type DriverResult<T> = Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swapper_errors_propagate_unchanged() {
        let err: DriverError = BufferError::NoFrameAvailable.into();
        assert_eq!(err, DriverError::Swapper(BufferError::NoFrameAvailable));
        assert_eq!(err.to_string(), BufferError::NoFrameAvailable.to_string());
    }

    #[test]
    fn test_gralloc_error_display() {
        let err = GrallocError::new(GrallocOp::Lock, -22);
        assert_eq!(err.to_string(), "gralloc lock failed with status -22");
    }
}
