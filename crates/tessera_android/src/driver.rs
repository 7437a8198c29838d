//! # Driver Vocabulary
//!
//! The integer codes native drivers speak: window queries, perform
//! operations, HAL pixel formats and gralloc usage bits.
//!
//! Values match the platform headers so they can cross the boundary
//! untranslated.

use std::fmt;
use tessera_core::BufferUsage;
use tessera_shared::PixelFormat;

use crate::error::{DriverError, DriverResult};

/// A window query issued by a driver.
///
/// Any `i32` is representable; the associated constants name the ones
/// drivers commonly issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QueryCode(pub i32);

impl QueryCode {
    /// Buffer width in pixels.
    pub const WIDTH: Self = Self(0);
    /// Buffer height in pixels.
    pub const HEIGHT: Self = Self(1);
    /// Buffer format (HAL code).
    pub const FORMAT: Self = Self(2);
    /// Buffers the consumer keeps dequeued.
    pub const MIN_UNDEQUEUED_BUFFERS: Self = Self(3);
    /// Whether queued buffers go straight to the window composer.
    pub const QUEUES_TO_WINDOW_COMPOSER: Self = Self(4);
    /// Concrete window type.
    pub const CONCRETE_TYPE: Self = Self(5);
    /// Default buffer width.
    pub const DEFAULT_WIDTH: Self = Self(6);
    /// Default buffer height.
    pub const DEFAULT_HEIGHT: Self = Self(7);
    /// Preferred buffer transform.
    pub const TRANSFORM_HINT: Self = Self(8);
}

impl From<i32> for QueryCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl fmt::Display for QueryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::WIDTH => "WIDTH",
            Self::HEIGHT => "HEIGHT",
            Self::FORMAT => "FORMAT",
            Self::MIN_UNDEQUEUED_BUFFERS => "MIN_UNDEQUEUED_BUFFERS",
            Self::QUEUES_TO_WINDOW_COMPOSER => "QUEUES_TO_WINDOW_COMPOSER",
            Self::CONCRETE_TYPE => "CONCRETE_TYPE",
            Self::DEFAULT_WIDTH => "DEFAULT_WIDTH",
            Self::DEFAULT_HEIGHT => "DEFAULT_HEIGHT",
            Self::TRANSFORM_HINT => "TRANSFORM_HINT",
            Self(code) => return write!(f, "query {code}"),
        };
        f.write_str(name)
    }
}

/// A `perform()` request from a driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PerformOp {
    /// Usage bits for subsequent buffers.
    SetUsage(u32),
    /// Driver-chosen buffer format. Overrides the display format in queries.
    SetBuffersFormat(i32),
    /// Requested buffer dimensions.
    SetBuffersDimensions {
        /// Width in pixels.
        width: i32,
        /// Height in pixels.
        height: i32,
    },
    /// Requested buffer transform.
    SetBuffersTransform(i32),
    /// API connect.
    Connect(i32),
    /// API disconnect.
    Disconnect(i32),
    /// Any other operation code.
    Other(i32),
}

/// `HAL_PIXEL_FORMAT_RGBA_8888`
pub const HAL_PIXEL_FORMAT_RGBA_8888: i32 = 1;
/// `HAL_PIXEL_FORMAT_RGBX_8888`
pub const HAL_PIXEL_FORMAT_RGBX_8888: i32 = 2;
/// `HAL_PIXEL_FORMAT_RGB_888`
pub const HAL_PIXEL_FORMAT_RGB_888: i32 = 3;
/// `HAL_PIXEL_FORMAT_RGB_565`
pub const HAL_PIXEL_FORMAT_RGB_565: i32 = 4;
/// `HAL_PIXEL_FORMAT_BGRA_8888`
pub const HAL_PIXEL_FORMAT_BGRA_8888: i32 = 5;

/// HAL code for a pixel format.
///
/// Displays scan out opaquely, so the alpha-carrying ABGR layout is
/// reported as RGBX.
///
/// # Errors
///
/// Returns [`DriverError::UnsupportedFormat`] for [`PixelFormat::Invalid`].
pub fn hal_format_from(format: PixelFormat) -> DriverResult<i32> {
    match format {
        PixelFormat::Abgr8888 | PixelFormat::Xbgr8888 => Ok(HAL_PIXEL_FORMAT_RGBX_8888),
        PixelFormat::Argb8888 | PixelFormat::Xrgb8888 => Ok(HAL_PIXEL_FORMAT_BGRA_8888),
        PixelFormat::Bgr888 => Ok(HAL_PIXEL_FORMAT_RGB_888),
        PixelFormat::Invalid => Err(DriverError::UnsupportedFormat(format)),
    }
}

/// Pixel format for a HAL code, if it has one.
#[must_use]
pub fn pixel_format_from_hal(code: i32) -> Option<PixelFormat> {
    match code {
        HAL_PIXEL_FORMAT_RGBA_8888 => Some(PixelFormat::Abgr8888),
        HAL_PIXEL_FORMAT_RGBX_8888 => Some(PixelFormat::Xbgr8888),
        HAL_PIXEL_FORMAT_RGB_888 => Some(PixelFormat::Bgr888),
        HAL_PIXEL_FORMAT_BGRA_8888 => Some(PixelFormat::Argb8888),
        _ => None,
    }
}

/// CPU reads often.
pub const GRALLOC_USAGE_SW_READ_OFTEN: u32 = 0x0000_0003;
/// CPU writes often.
pub const GRALLOC_USAGE_SW_WRITE_OFTEN: u32 = 0x0000_0030;
/// Sampled as a GPU texture.
pub const GRALLOC_USAGE_HW_TEXTURE: u32 = 0x0000_0100;
/// GPU render target.
pub const GRALLOC_USAGE_HW_RENDER: u32 = 0x0000_0200;
/// Handed to the hardware composer.
pub const GRALLOC_USAGE_HW_COMPOSER: u32 = 0x0000_0800;

/// Gralloc usage bits for a buffer usage.
#[must_use]
pub const fn usage_flags(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::HardwareComposited => {
            GRALLOC_USAGE_HW_TEXTURE | GRALLOC_USAGE_HW_RENDER | GRALLOC_USAGE_HW_COMPOSER
        }
        BufferUsage::Software => GRALLOC_USAGE_SW_READ_OFTEN | GRALLOC_USAGE_SW_WRITE_OFTEN,
    }
}

/// Clamps a pixel dimension into the driver's `int`.
pub(crate) fn dimension(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
