//! # TESSERA Core
//!
//! Race-free hand-off of a bounded pool of graphics buffers between a
//! producer (an application rendering frames), a compositor and a display.
//!
//! ## Architecture Rules
//!
//! 1. **One owner per buffer** - every pooled buffer is free, producer-owned,
//!    ready or consumer-owned, never two at once
//! 2. **One lock per pool** - partial transitions are never observable
//! 3. **Only the producer blocks** - the compositor degrades to the last frame
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_core::{BufferSwapper, SoftwareAllocator, SwapperConfig, SwapperFactory};
//!
//! let factory = SwapperFactory::new(Arc::new(SoftwareAllocator::new()));
//! let swapper = factory.create_swapper(&config, properties)?;
//! let frame = swapper.producer_acquire()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod buffer;
pub mod config;
pub mod display;
pub mod error;
pub mod observer;
pub mod swapper;
pub mod sync;

pub use buffer::{
    Buffer, BufferId, BufferProperties, BufferUsage, GraphicBufferAllocator, HandleKey,
    NativeBufferHandle, NativeHandle, SoftwareAllocator, SoftwareBuffer,
};
pub use config::{AllocatorBackend, SwapperConfig};
pub use display::DisplaySupportProvider;
pub use error::{BufferError, BufferResult};
pub use observer::{
    Executor, FrameObserver, FrameObserverMultiplexer, ImmediateExecutor, ObserverMultiplexer,
    ThreadExecutor,
};
pub use swapper::{BufferState, BufferSwapper, PoolSwapper, SwapperFactory, SwapperStats};
pub use sync::{CpuFence, SignalledFence, SyncObject};
