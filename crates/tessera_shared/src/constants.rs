//! # Buffering Constants
//!
//! Pool depth limits shared by configuration parsing and the swapper.

// =============================================================================
// POOL DEPTH
// =============================================================================

/// Smallest supported pool (degenerate single buffering).
pub const MIN_BUFFER_COUNT: usize = 1;

/// Default pool depth (double buffering).
pub const DEFAULT_BUFFER_COUNT: usize = 2;

/// Largest supported pool (triple buffering).
pub const MAX_BUFFER_COUNT: usize = 3;

// =============================================================================
// IPC LIMITS
// =============================================================================

/// Maximum file descriptors carried by one buffer package.
pub const MAX_PACKAGE_FDS: usize = 10;

/// Maximum integers carried by one buffer package.
pub const MAX_PACKAGE_INTS: usize = 32;
