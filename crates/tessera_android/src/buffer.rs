//! Hardware buffers: memory owned by the gralloc alloc device.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tessera_core::{Buffer, BufferId, BufferUsage, NativeBufferHandle, SyncObject};
use tessera_shared::{PixelFormat, Size, Stride};

use crate::allocator::AllocDevice;
use crate::driver::{hal_format_from, usage_flags};
use crate::error::DriverResult;

/// A buffer allocated by a gralloc alloc device. Frees its handle through
/// the device when dropped.
pub struct AndroidBuffer {
    id: BufferId,
    size: Size,
    stride: Stride,
    format: PixelFormat,
    native: Arc<NativeBufferHandle>,
    device: Arc<dyn AllocDevice>,
    sync: Mutex<Option<Arc<dyn SyncObject>>>,
}

impl AndroidBuffer {
    /// Allocates a buffer from `device`.
    ///
    /// # Errors
    ///
    /// [`crate::DriverError::UnsupportedFormat`] if the format has no HAL
    /// code, [`crate::DriverError::Gralloc`] if the device refuses.
    pub fn new(
        device: Arc<dyn AllocDevice>,
        size: Size,
        format: PixelFormat,
        usage: BufferUsage,
    ) -> DriverResult<Self> {
        let hal_format = hal_format_from(format)?;
        let usage = usage_flags(usage);
        let (handle, stride_pixels) = device.alloc(size, hal_format, usage)?;

        let native = NativeBufferHandle::new(
            size.width,
            size.height,
            stride_pixels,
            hal_format,
            usage,
            handle,
        );
        let id = BufferId::next();
        tracing::trace!(buffer = %id, %size, hal_format, stride_pixels, "hardware buffer allocated");

        Ok(Self {
            id,
            size,
            stride: Stride(stride_pixels.saturating_mul(format.bytes_per_pixel())),
            format,
            native: Arc::new(native),
            device,
            sync: Mutex::new(None),
        })
    }

    /// Attaches the fence of the producer's latest GPU work.
    pub fn set_sync(&self, sync: Arc<dyn SyncObject>) {
        *self.sync.lock() = Some(sync);
    }
}

impl Buffer for AndroidBuffer {
    fn id(&self) -> BufferId {
        self.id
    }

    fn size(&self) -> Size {
        self.size
    }

    fn stride(&self) -> Stride {
        self.stride
    }

    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn native_buffer_handle(&self) -> Arc<NativeBufferHandle> {
        Arc::clone(&self.native)
    }

    fn sync(&self) -> Option<Arc<dyn SyncObject>> {
        self.sync.lock().clone()
    }
}

impl Drop for AndroidBuffer {
    fn drop(&mut self) {
        if let Err(e) = self.device.free(self.native.handle()) {
            tracing::warn!(buffer = %self.id, error = %e, "failed to free hardware buffer");
        }
    }
}

impl fmt::Debug for AndroidBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AndroidBuffer")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("stride", &self.stride)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
