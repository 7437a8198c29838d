//! # TESSERA Shared
//!
//! Common value types used by both the display server and its clients.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - threading or locking crates
//! - any allocator back end (gralloc, shm, ...)
//!
//! If you need buffer ownership, put it in `tessera_core`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod geometry;
pub mod package;

pub use constants::{DEFAULT_BUFFER_COUNT, MAX_BUFFER_COUNT, MIN_BUFFER_COUNT};
pub use geometry::{PixelFormat, Size, Stride};
pub use package::{BufferPackage, PackageHeader};
