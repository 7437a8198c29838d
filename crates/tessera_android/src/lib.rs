//! # TESSERA Android
//!
//! Graphics-HAL integration for the buffer core.
//!
//! ## Architecture
//!
//! ```text
//!   native driver
//!        │  query / perform / dequeue / queue / cancel
//!        ▼
//!   ┌──────────────┐     ┌───────────────────────────┐
//!   │ NativeWindow │────>│ AndroidDriverInterpreter  │
//!   └──────────────┘     ├─────────────┬─────────────┤
//!                        │ server side │ client side │
//!                        └──────┬──────┴──────┬──────┘
//!                               ▼             ▼
//!                     swapper + display   client surface
//! ```
//!
//! Alongside: the gralloc [`Registrar`] for importing and CPU-mapping
//! foreign handles, and [`AndroidGraphicBufferAllocator`] for hardware
//! buffers.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod allocator;
pub mod buffer;
pub mod client_interpreter;
pub mod driver;
pub mod error;
pub mod interpreter;
pub mod native_window;
pub mod registrar;
pub mod server_render_window;

pub use allocator::{AllocDevice, AndroidGraphicBufferAllocator};
pub use buffer::AndroidBuffer;
pub use client_interpreter::{ClientDriverInterpreter, ClientSurface, SurfaceParameters};
pub use driver::{hal_format_from, pixel_format_from_hal, PerformOp, QueryCode};
pub use error::{DriverError, DriverResult, GrallocError, GrallocOp};
pub use interpreter::AndroidDriverInterpreter;
pub use native_window::{status_of, DequeuedBuffer, NativeWindow};
pub use registrar::{GrallocModule, GrallocRegistrar, MemoryRegion, Rect, Registrar};
pub use server_render_window::ServerRenderWindow;
