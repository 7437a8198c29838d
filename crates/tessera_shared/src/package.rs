//! IPC packaging of a buffer's native handle and metadata.
//!
//! The buffer core never marshals these itself. It only exposes them,
//! read-only, to the packer that sends them to another process.

use crate::constants::{MAX_PACKAGE_FDS, MAX_PACKAGE_INTS};
use crate::geometry::{PixelFormat, Size, Stride};
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Everything a receiving process needs to import a buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferPackage {
    /// File descriptors of the native handle (sent out of band)
    pub fds: Vec<i32>,
    /// Integer payload of the native handle
    pub data: Vec<i32>,
    /// Row pitch in bytes
    pub stride: Stride,
    /// Pixel dimensions
    pub size: Size,
    /// Pixel format
    pub format: PixelFormat,
}

/// Fixed-size header sent in front of the fd and int payloads.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PackageHeader {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Stride in bytes
    pub stride: u32,
    /// Raw [`PixelFormat`] value
    pub format: u32,
    /// Number of fds that follow
    pub fd_count: u32,
    /// Number of ints that follow
    pub data_count: u32,
}

impl BufferPackage {
    /// Whether the handle fits in a single IPC message
    #[must_use]
    pub fn is_within_limits(&self) -> bool {
        self.fds.len() <= MAX_PACKAGE_FDS && self.data.len() <= MAX_PACKAGE_INTS
    }

    /// Builds the wire header for this package
    #[must_use]
    pub fn header(&self) -> PackageHeader {
        PackageHeader {
            width: self.size.width,
            height: self.size.height,
            stride: self.stride.as_u32(),
            format: self.format.as_u32(),
            fd_count: u32::try_from(self.fds.len()).unwrap_or(u32::MAX),
            data_count: u32::try_from(self.data.len()).unwrap_or(u32::MAX),
        }
    }

    /// Header as raw bytes, ready for the packer
    #[must_use]
    pub fn header_bytes(&self) -> Vec<u8> {
        bytemuck::bytes_of(&self.header()).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BufferPackage {
        BufferPackage {
            fds: vec![7, 8],
            data: vec![1, 2, 3],
            stride: Stride(136),
            size: Size::new(34, 10),
            format: PixelFormat::Argb8888,
        }
    }

    #[test]
    fn test_header_mirrors_package() {
        let header = sample().header();
        assert_eq!(header.width, 34);
        assert_eq!(header.height, 10);
        assert_eq!(header.stride, 136);
        assert_eq!(header.format, PixelFormat::Argb8888.as_u32());
        assert_eq!(header.fd_count, 2);
        assert_eq!(header.data_count, 3);
    }

    #[test]
    fn test_header_bytes_length() {
        assert_eq!(sample().header_bytes().len(), std::mem::size_of::<PackageHeader>());
        assert_eq!(std::mem::size_of::<PackageHeader>(), 24);
    }

    #[test]
    fn test_package_limits() {
        let mut package = sample();
        assert!(package.is_within_limits());
        package.fds = vec![0; MAX_PACKAGE_FDS + 1];
        assert!(!package.is_within_limits());
    }
}
