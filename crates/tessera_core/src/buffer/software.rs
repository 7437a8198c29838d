//! Software-backed buffers: plain CPU memory.
//!
//! Used when no hardware allocator is present (headless servers, tests)
//! and for software composition.

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tessera_shared::{PixelFormat, Size, Stride};

use super::{
    Buffer, BufferId, BufferProperties, GraphicBufferAllocator, NativeBufferHandle, NativeHandle,
};
use crate::config::AllocatorBackend;
use crate::error::{BufferError, BufferResult};
use crate::sync::SyncObject;

/// A buffer whose pixels live in process memory.
pub struct SoftwareBuffer {
    id: BufferId,
    size: Size,
    stride: Stride,
    format: PixelFormat,
    pixels: RwLock<Vec<u8>>,
    native: Arc<NativeBufferHandle>,
    sync: Mutex<Option<Arc<dyn SyncObject>>>,
}

impl SoftwareBuffer {
    /// Allocates a zeroed buffer.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Allocation`] for an empty size or an invalid format.
    pub fn new(size: Size, format: PixelFormat) -> BufferResult<Self> {
        if size.is_empty() {
            return Err(BufferError::Allocation(format!("cannot allocate {size} buffer")));
        }
        if format == PixelFormat::Invalid {
            return Err(BufferError::Allocation("invalid pixel format".to_string()));
        }

        let id = BufferId::next();
        let stride = Stride::packed(size.width, format);
        let len = usize::try_from(u64::from(stride.as_u32()) * u64::from(size.height))
            .map_err(|_| BufferError::Allocation(format!("{size} buffer too large")))?;

        // No fds: the ints carry enough for a same-process importer.
        let handle = NativeHandle::new(
            Vec::new(),
            vec![
                as_int(id.as_u32()),
                as_int(size.width),
                as_int(size.height),
                as_int(stride.as_u32()),
            ],
        );
        let native = NativeBufferHandle::new(
            size.width,
            size.height,
            size.width,
            as_int(format.as_u32()),
            0,
            Arc::new(handle),
        );

        Ok(Self {
            id,
            size,
            stride,
            format,
            pixels: RwLock::new(vec![0; len]),
            native: Arc::new(native),
            sync: Mutex::new(None),
        })
    }

    /// Runs `f` over the pixels with exclusive access.
    pub fn write_pixels<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut self.pixels.write())
    }

    /// Runs `f` over the pixels with shared access.
    pub fn read_pixels<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.pixels.read())
    }

    /// Attaches the fence of the producer's latest write.
    pub fn set_sync(&self, sync: Arc<dyn SyncObject>) {
        *self.sync.lock() = Some(sync);
    }
}

fn as_int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl fmt::Debug for SoftwareBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareBuffer")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("stride", &self.stride)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl Buffer for SoftwareBuffer {
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

/// Allocator for [`SoftwareBuffer`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoftwareAllocator;

impl SoftwareAllocator {
    /// Creates the allocator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl GraphicBufferAllocator for SoftwareAllocator {
    fn alloc_buffer(&self, properties: &BufferProperties) -> BufferResult<Arc<dyn Buffer>> {
        let buffer = SoftwareBuffer::new(properties.size, properties.format)?;
        tracing::trace!(buffer = %buffer.id(), size = %properties.size, "software buffer allocated");
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
        AllocatorBackend::Software
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::CpuFence;

    #[test]
    fn test_software_buffer_layout() {
        let buffer = SoftwareBuffer::new(Size::new(4, 2), PixelFormat::Bgr888).unwrap();
        assert_eq!(buffer.stride(), Stride(12));
        assert_eq!(buffer.read_pixels(<[u8]>::len), 24);

        let native = buffer.native_buffer_handle();
        assert_eq!(native.width(), 4);
        assert_eq!(native.stride(), 4);
        assert!(Arc::ptr_eq(&native, &buffer.native_buffer_handle()));
    }

    #[test]
    fn test_software_buffer_rejects_bad_requests() {
        assert!(matches!(
            SoftwareBuffer::new(Size::new(0, 5), PixelFormat::Abgr8888),
            Err(BufferError::Allocation(_))
        ));
        assert!(matches!(
            SoftwareBuffer::new(Size::new(5, 5), PixelFormat::Invalid),
            Err(BufferError::Allocation(_))
        ));
    }

    #[test]
    fn test_pixels_and_sync() {
        let buffer = SoftwareBuffer::new(Size::new(2, 2), PixelFormat::Abgr8888).unwrap();
        buffer.write_pixels(|px| px.fill(0xff));
        assert!(buffer.read_pixels(|px| px.iter().all(|&b| b == 0xff)));

        assert!(buffer.sync().is_none());
        buffer.set_sync(Arc::new(CpuFence::new()));
        assert!(buffer.sync().is_some());
    }
}
