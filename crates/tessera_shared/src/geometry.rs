//! Geometry and pixel format types shared between server and client.
//!
//! These are the canonical representations used when describing buffers.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel dimensions of a buffer or display.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Size {
    /// Creates a new size
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True if either dimension is zero
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Row pitch of a buffer, in bytes.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
pub struct Stride(pub u32);

impl Stride {
    /// Tightly packed stride for `width` pixels of `format`
    #[must_use]
    pub const fn packed(width: u32, format: PixelFormat) -> Self {
        Self(width * format.bytes_per_pixel())
    }

    /// Stride in bytes
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Pixel formats understood by the buffer core.
///
/// Channel order is memory order on a little-endian machine, matching the
/// naming used by the display and client protocols.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// No valid format
    #[default]
    Invalid = 0,
    /// 32bpp, alpha in the high byte, then blue, green, red
    Abgr8888 = 1,
    /// 32bpp, ignored high byte, then blue, green, red
    Xbgr8888 = 2,
    /// 32bpp, alpha in the high byte, then red, green, blue
    Argb8888 = 3,
    /// 32bpp, ignored high byte, then red, green, blue
    Xrgb8888 = 4,
    /// 24bpp blue, green, red
    Bgr888 = 5,
}

impl PixelFormat {
    /// Bytes occupied by one pixel
    #[must_use]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Invalid => 0,
            Self::Bgr888 => 3,
            Self::Abgr8888 | Self::Xbgr8888 | Self::Argb8888 | Self::Xrgb8888 => 4,
        }
    }

    /// Whether the format carries a meaningful alpha channel
    #[must_use]
    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::Abgr8888 | Self::Argb8888)
    }

    /// Converts from the raw wire value
    #[must_use]
    pub const fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::Abgr8888,
            2 => Self::Xbgr8888,
            3 => Self::Argb8888,
            4 => Self::Xrgb8888,
            5 => Self::Bgr888,
            _ => Self::Invalid,
        }
    }

    /// Raw wire value
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}
