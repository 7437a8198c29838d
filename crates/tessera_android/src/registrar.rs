//! # Native Buffer Registrar
//!
//! Imports foreign native handles into the process through the gralloc
//! module, and maps them for CPU access.
//!
//! ```text
//!   secure_for_cpu(buffer)
//!        │ lock ──────────────> MemoryRegion { vaddr, rect, layout }
//!        │                            │
//!        │                   release() or drop
//!        │                            │
//!        └──────────────────── unlock (exactly once)
//! ```

use std::fmt;
use std::sync::Arc;
use tessera_core::{NativeBufferHandle, NativeHandle};
use tessera_shared::{PixelFormat, Stride};

use crate::driver::{
    pixel_format_from_hal, GRALLOC_USAGE_SW_READ_OFTEN, GRALLOC_USAGE_SW_WRITE_OFTEN,
};
use crate::error::GrallocError;

/// A region of a buffer, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl Rect {
    /// Creates a rectangle.
    #[must_use]
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// The platform gralloc module.
pub trait GrallocModule: Send + Sync {
    /// Imports `handle` into this process.
    ///
    /// # Errors
    ///
    /// The module's status code.
    fn register_buffer(&self, handle: &NativeHandle) -> Result<(), GrallocError>;

    /// Releases an imported `handle`.
    ///
    /// # Errors
    ///
    /// The module's status code.
    fn unregister_buffer(&self, handle: &NativeHandle) -> Result<(), GrallocError>;

    /// Maps `rect` of `handle` for `usage`, returning its address.
    ///
    /// # Errors
    ///
    /// The module's status code, e.g. for an unregistered handle.
    fn lock(&self, handle: &NativeHandle, usage: u32, rect: Rect) -> Result<usize, GrallocError>;

    /// Unmaps a locked `handle`.
    ///
    /// # Errors
    ///
    /// The module's status code.
    fn unlock(&self, handle: &NativeHandle) -> Result<(), GrallocError>;
}

/// Registration and CPU mapping of native handles.
pub trait Registrar: Send + Sync {
    /// Imports `handle`.
    ///
    /// # Errors
    ///
    /// The module's error, unchanged.
    fn register_buffer(&self, handle: &NativeHandle) -> Result<(), GrallocError>;

    /// Releases `handle`.
    ///
    /// # Errors
    ///
    /// The module's error, unchanged.
    fn unregister_buffer(&self, handle: &NativeHandle) -> Result<(), GrallocError>;

    /// Maps `rect` of `buffer` for CPU reads and writes until the returned
    /// region is released or dropped.
    ///
    /// # Errors
    ///
    /// The module's lock error, unchanged. No region exists in that case.
    fn secure_for_cpu(
        &self,
        buffer: Arc<NativeBufferHandle>,
        rect: Rect,
    ) -> Result<MemoryRegion, GrallocError>;
}

/// A CPU mapping of a buffer. Unlocks exactly once.
#[must_use = "dropping the region unlocks the buffer"]
pub struct MemoryRegion {
    module: Arc<dyn GrallocModule>,
    buffer: Arc<NativeBufferHandle>,
    vaddr: usize,
    rect: Rect,
    locked: bool,
}

impl MemoryRegion {
    /// Mapped address.
    #[must_use]
    pub fn vaddr(&self) -> usize {
        self.vaddr
    }

    /// Mapped region.
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Buffer width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Buffer height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Pixel layout of the mapping. [`PixelFormat::Invalid`] for HAL formats
    /// with no counterpart.
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        pixel_format_from_hal(self.buffer.format()).unwrap_or(PixelFormat::Invalid)
    }

    /// Bytes between the starts of two rows.
    #[must_use]
    pub fn stride(&self) -> Stride {
        Stride(self.buffer.stride().saturating_mul(self.format().bytes_per_pixel()))
    }

    /// The mapped handle.
    #[must_use]
    pub fn handle(&self) -> &Arc<NativeHandle> {
        self.buffer.handle()
    }

    /// Ends the mapping now.
    ///
    /// # Errors
    ///
    /// The module's unlock error.
    pub fn release(mut self) -> Result<(), GrallocError> {
        self.unlock()
    }

    fn unlock(&mut self) -> Result<(), GrallocError> {
        if !self.locked {
            return Ok(());
        }
        self.locked = false;
        self.module.unlock(self.buffer.handle())
    }
}

impl Drop for MemoryRegion {
    fn drop(&mut self) {
        if let Err(e) = self.unlock() {
            tracing::warn!(error = %e, "failed to unlock buffer");
        }
    }
}

impl fmt::Debug for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRegion")
            .field("vaddr", &format_args!("{:#x}", self.vaddr))
            .field("rect", &self.rect)
            .field("format", &self.format())
            .field("locked", &self.locked)
            .finish_non_exhaustive()
    }
}

/// [`Registrar`] over a gralloc module.
pub struct GrallocRegistrar {
    module: Arc<dyn GrallocModule>,
}

impl GrallocRegistrar {
    /// Creates a registrar over `module`.
    #[must_use]
    pub fn new(module: Arc<dyn GrallocModule>) -> Self {
        Self { module }
    }
}

impl Registrar for GrallocRegistrar {
    fn register_buffer(&self, handle: &NativeHandle) -> Result<(), GrallocError> {
        self.module.register_buffer(handle)
    }

    fn unregister_buffer(&self, handle: &NativeHandle) -> Result<(), GrallocError> {
        self.module.unregister_buffer(handle)
    }

    fn secure_for_cpu(
        &self,
        buffer: Arc<NativeBufferHandle>,
        rect: Rect,
    ) -> Result<MemoryRegion, GrallocError> {
        let usage = GRALLOC_USAGE_SW_READ_OFTEN | GRALLOC_USAGE_SW_WRITE_OFTEN;
        let vaddr = self.module.lock(buffer.handle(), usage, rect)?;
        tracing::trace!(vaddr, ?rect, "buffer mapped for cpu");
        Ok(MemoryRegion {
            module: Arc::clone(&self.module),
            buffer,
            vaddr,
            rect,
            locked: true,
        })
    }
}

impl fmt::Debug for GrallocRegistrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrallocRegistrar").finish_non_exhaustive()
    }
}
