//! # Buffers
//!
//! A buffer is one graphics surface: size, stride, pixel format and the
//! platform-opaque native handle used to share it across processes and
//! APIs.
//!
//! The swapper and the render window only ever see the [`Buffer`]
//! capability set. Concrete back ends:
//!
//! - [`SoftwareBuffer`]: CPU memory, synthesized native handle.
//! - hardware-handle-backed buffers, provided by the platform crates.

mod native;
mod software;

pub use native::{HandleKey, NativeBufferHandle, NativeHandle};
pub use software::{SoftwareAllocator, SoftwareBuffer};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tessera_shared::{BufferPackage, PixelFormat, Size, Stride};

use crate::config::AllocatorBackend;
use crate::error::BufferResult;
use crate::sync::SyncObject;

/// Stable identity of a buffer, usable as a map key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct BufferId(u32);

/// Process-wide id source. Zero is never handed out.
static NEXT_BUFFER_ID: AtomicU32 = AtomicU32::new(1);

impl BufferId {
    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Allocates a fresh, process-unique id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the buffer will be used for. Drives allocator usage flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferUsage {
    /// Rendered by the GPU and composited by the GPU.
    #[default]
    HardwareComposited,
    /// Written and read by the CPU.
    Software,
}

/// Properties requested from an allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferProperties {
    /// Pixel dimensions.
    pub size: Size,
    /// Pixel format.
    pub format: PixelFormat,
    /// Intended usage.
    pub usage: BufferUsage,
}

impl BufferProperties {
    /// Creates a new property set.
    #[must_use]
    pub const fn new(size: Size, format: PixelFormat, usage: BufferUsage) -> Self {
        Self { size, format, usage }
    }
}

/// The capability set every back end provides.
pub trait Buffer: Send + Sync + fmt::Debug {
    /// Stable identity.
    fn id(&self) -> BufferId;

    /// Pixel dimensions.
    fn size(&self) -> Size;

    /// Row pitch in bytes.
    fn stride(&self) -> Stride;

    /// Pixel format.
    fn pixel_format(&self) -> PixelFormat;

    /// Driver-facing handle. The same `Arc` is returned on every call, so its
    /// address identifies the buffer to native drivers.
    fn native_buffer_handle(&self) -> Arc<NativeBufferHandle>;

    /// Fence over the producer's work, if the back end tracks one.
    fn sync(&self) -> Option<Arc<dyn SyncObject>> {
        None
    }

    /// Read-only IPC view of the native handle and metadata.
    fn package(&self) -> BufferPackage {
        let native = self.native_buffer_handle();
        BufferPackage {
            fds: native.handle().fds().to_vec(),
            data: native.handle().ints().to_vec(),
            stride: self.stride(),
            size: self.size(),
            format: self.pixel_format(),
        }
    }
}

/// Produces buffers for a swapper. Lives outside the core; the swapper never
/// allocates or frees memory itself.
pub trait GraphicBufferAllocator: Send + Sync {
    /// Allocates one buffer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BufferError::Allocation`] if the back end refuses.
    fn alloc_buffer(&self, properties: &BufferProperties) -> BufferResult<Arc<dyn Buffer>>;

    /// Formats this allocator can produce.
    fn supported_pixel_formats(&self) -> Vec<PixelFormat>;

    /// Which back end this allocator is.
    fn backend(&self) -> AllocatorBackend;
}
