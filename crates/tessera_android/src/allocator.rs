//! Hardware allocator back end over the gralloc alloc device.

use std::fmt;
use std::sync::Arc;
use tessera_core::{
    AllocatorBackend, Buffer, BufferError, BufferProperties, BufferResult, GraphicBufferAllocator,
    NativeHandle,
};
use tessera_shared::{PixelFormat, Size};

use crate::buffer::AndroidBuffer;
use crate::error::GrallocError;

/// The platform alloc device.
pub trait AllocDevice: Send + Sync {
    /// Allocates memory for a `size` buffer. Returns the handle and the
    /// row stride in pixels.
    ///
    /// # Errors
    ///
    /// The device's status code.
    fn alloc(
        &self,
        size: Size,
        hal_format: i32,
        usage: u32,
    ) -> Result<(Arc<NativeHandle>, u32), GrallocError>;

    /// Releases memory obtained from [`alloc`](Self::alloc).
    ///
    /// # Errors
    ///
    /// The device's status code.
    fn free(&self, handle: &NativeHandle) -> Result<(), GrallocError>;
}

/// Produces [`AndroidBuffer`]s for swappers.
pub struct AndroidGraphicBufferAllocator {
    device: Arc<dyn AllocDevice>,
}

impl AndroidGraphicBufferAllocator {
    /// Creates an allocator over `device`.
    #[must_use]
    pub fn new(device: Arc<dyn AllocDevice>) -> Self {
        Self { device }
    }
}

impl GraphicBufferAllocator for AndroidGraphicBufferAllocator {
    fn alloc_buffer(&self, properties: &BufferProperties) -> BufferResult<Arc<dyn Buffer>> {
        let buffer = AndroidBuffer::new(
            Arc::clone(&self.device),
            properties.size,
            properties.format,
            properties.usage,
        )
        .map_err(|e| BufferError::Allocation(e.to_string()))?;
        Ok(Arc::new(buffer))
    }

    fn supported_pixel_formats(&self) -> Vec<PixelFormat> {
        vec![
            PixelFormat::Abgr8888,
            PixelFormat::Xbgr8888,
            PixelFormat::Argb8888,
            PixelFormat::Xrgb8888,
            PixelFormat::Bgr888,
        ]
    }

    fn backend(&self) -> AllocatorBackend {
        AllocatorBackend::Hardware
    }
}

impl fmt::Debug for AndroidGraphicBufferAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AndroidGraphicBufferAllocator")
            .finish_non_exhaustive()
    }
}
