//! Native handles as seen by allocators and drivers.

use std::sync::Arc;

/// Allocator-level handle: the fds and ints that describe the memory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NativeHandle {
    fds: Vec<i32>,
    ints: Vec<i32>,
}

impl NativeHandle {
    /// Creates a handle from its fd and int payloads.
    #[must_use]
    pub fn new(fds: Vec<i32>, ints: Vec<i32>) -> Self {
        Self { fds, ints }
    }

    /// File descriptors.
    #[must_use]
    pub fn fds(&self) -> &[i32] {
        &self.fds
    }

    /// Integer payload.
    #[must_use]
    pub fn ints(&self) -> &[i32] {
        &self.ints
    }
}

/// Driver-facing window buffer.
///
/// Drivers hold these by address and hand the same object back when they
/// are done, so identity is pointer identity (see [`HandleKey`]).
#[derive(Debug)]
pub struct NativeBufferHandle {
    width: u32,
    height: u32,
    /// Stride in pixels, as native drivers expect.
    stride: u32,
    /// Driver-visible format code.
    format: i32,
    usage: u32,
    handle: Arc<NativeHandle>,
}

impl NativeBufferHandle {
    /// Creates a window buffer over an allocator handle.
    #[must_use]
    pub fn new(
        width: u32,
        height: u32,
        stride: u32,
        format: i32,
        usage: u32,
        handle: Arc<NativeHandle>,
    ) -> Self {
        Self {
            width,
            height,
            stride,
            format,
            usage,
            handle,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Stride in pixels.
    #[must_use]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Driver-visible format code.
    #[must_use]
    pub fn format(&self) -> i32 {
        self.format
    }

    /// Usage flags the memory was allocated with.
    #[must_use]
    pub fn usage(&self) -> u32 {
        self.usage
    }

    /// The allocator-level handle.
    #[must_use]
    pub fn handle(&self) -> &Arc<NativeHandle> {
        &self.handle
    }

    /// Identity key of this object.
    #[must_use]
    pub fn key(&self) -> HandleKey {
        HandleKey::of(self)
    }
}

/// Pointer identity of a [`NativeBufferHandle`].
///
/// Only meaningful while the `Arc` that owns the handle is alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandleKey(usize);

impl HandleKey {
    /// Key for the handle at this address.
    #[must_use]
    pub fn of(handle: &NativeBufferHandle) -> Self {
        Self(std::ptr::addr_of!(*handle) as usize)
    }
}
