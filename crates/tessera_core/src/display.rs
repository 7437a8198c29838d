//! Display support: the sink that posts front-buffers to the screen.
//!
//! Implemented outside the core (framebuffer HAL, hwcomposer, nested
//! display). The core treats it as authoritative and stateless between
//! calls.

use std::sync::Arc;
use tessera_shared::{PixelFormat, Size};

use crate::buffer::Buffer;

/// Display-side collaborator consumed by the render window.
pub trait DisplaySupportProvider: Send + Sync {
    /// Current display size in pixels.
    fn display_size(&self) -> Size;

    /// Native pixel format of the display.
    fn display_format(&self) -> PixelFormat;

    /// Posts `buffer` as the next front-buffer.
    fn set_next_frontbuffer(&self, buffer: Arc<dyn Buffer>);

    /// Whether posting should wait for vsync. Displays without a swap
    /// interval ignore it.
    fn sync_to_display(&self, _sync: bool) {}
}
