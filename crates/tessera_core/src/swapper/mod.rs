//! # Buffer Swapper
//!
//! Owns a fixed pool of buffers and hands each one to exactly one party at
//! a time.
//!
//! ```text
//!            producer_acquire           producer_release
//!   ┌──────┐ ─────────────> ┌───────────────┐ ─────────────> ┌───────┐
//!   │ Free │                │ ProducerOwned │                │ Ready │ (FIFO)
//!   └──────┘ <───────┐      └───────────────┘                └───┬───┘
//!       │            │                                           │
//!       │ stale      │ compositor_release      compositor_acquire│
//!       │ reuse      │                                           ▼
//!       │        ┌───┴───────────┐                               │
//!       └──────> │ ConsumerOwned │ <─────────────────────────────┘
//!                └───────────────┘
//! ```
//!
//! ## Blocking
//!
//! - `producer_acquire`: blocks while no buffer is free (backpressure).
//! - `compositor_acquire`: never blocks. Falls back to the last composited
//!   frame, or reports [`BufferError::NoFrameAvailable`](crate::BufferError::NoFrameAvailable).
//! - `shutdown`: wakes every blocked producer with [`BufferError::ShutDown`](crate::BufferError::ShutDown).

mod factory;
mod pool;

pub use factory::SwapperFactory;
pub use pool::PoolSwapper;

use std::fmt;
use std::sync::Arc;

use crate::buffer::Buffer;
use crate::error::BufferResult;

/// Ownership tag of a pooled buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferState {
    /// Available to the producer.
    Free,
    /// Being written by the producer.
    ProducerOwned,
    /// Complete, queued for the compositor.
    Ready,
    /// Being read by the compositor.
    ConsumerOwned,
}

impl fmt::Display for BufferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Free => "free",
            Self::ProducerOwned => "producer-owned",
            Self::Ready => "ready",
            Self::ConsumerOwned => "consumer-owned",
        })
    }
}

/// Counters kept by a swapper since construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SwapperStats {
    /// Buffers released by the producer.
    pub frames_produced: u64,
    /// Buffers handed to the compositor, stale reuse included.
    pub frames_composited: u64,
    /// Compositor acquires served by reusing the last frame.
    pub stale_frames: u64,
    /// Producer acquires that had to wait for a free buffer.
    pub producer_waits: u64,
}

/// Mediates exclusive buffer hand-off between one producer and one
/// compositor.
pub trait BufferSwapper: Send + Sync {
    /// Takes a free buffer for rendering. Blocks while none is free.
    ///
    /// # Errors
    ///
    /// [`BufferError::ProtocolViolation`](crate::BufferError::ProtocolViolation) if the producer already holds its
    /// maximum, [`BufferError::ShutDown`](crate::BufferError::ShutDown) after teardown.
    fn producer_acquire(&self) -> BufferResult<Arc<dyn Buffer>>;

    /// Queues a finished buffer for the compositor.
    ///
    /// # Errors
    ///
    /// [`BufferError::UnknownBuffer`](crate::BufferError::UnknownBuffer) for a foreign buffer,
    /// [`BufferError::InvalidTransition`](crate::BufferError::InvalidTransition) if the producer does not own it.
    fn producer_release(&self, buffer: &Arc<dyn Buffer>) -> BufferResult<()>;

    /// Takes the oldest ready frame, or the last frame again. Never blocks.
    ///
    /// # Errors
    ///
    /// [`BufferError::NoFrameAvailable`](crate::BufferError::NoFrameAvailable) if there is nothing to show,
    /// [`BufferError::ShutDown`](crate::BufferError::ShutDown) after teardown.
    fn compositor_acquire(&self) -> BufferResult<Arc<dyn Buffer>>;

    /// Returns a composited buffer to the free list.
    ///
    /// # Errors
    ///
    /// [`BufferError::UnknownBuffer`](crate::BufferError::UnknownBuffer) for a foreign buffer,
    /// [`BufferError::InvalidTransition`](crate::BufferError::InvalidTransition) if the compositor does not own it.
    fn compositor_release(&self, buffer: &Arc<dyn Buffer>) -> BufferResult<()>;

    /// Tears the swapper down and wakes every blocked producer.
    fn shutdown(&self);

    /// Snapshot of the counters.
    fn stats(&self) -> SwapperStats;
}
