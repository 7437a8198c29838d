//! Fixed-pool swapper guarded by a single lock.
//!
//! Every transition happens under one `parking_lot::Mutex`, so no party
//! ever observes a half-moved buffer. The producer parks on a `Condvar`
//! while the pool has nothing free.

use parking_lot::{Condvar, Mutex};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use super::{BufferState, BufferSwapper, SwapperStats};
use crate::buffer::{Buffer, BufferId};
use crate::config::SwapperConfig;
use crate::error::{BufferError, BufferResult};

struct Slot {
    buffer: Arc<dyn Buffer>,
    state: BufferState,
}

/// Everything behind the pool lock.
struct PoolState {
    slots: Vec<Slot>,
    /// Free slot indices, oldest first.
    free: VecDeque<usize>,
    /// Ready slot indices in producer release order.
    ready: VecDeque<usize>,
    /// Slot most recently handed to the compositor.
    last_consumed: Option<usize>,
    producer_held: usize,
    shut_down: bool,
    stats: SwapperStats,
}

impl PoolState {
    fn index_of(&self, buffer: &Arc<dyn Buffer>) -> BufferResult<usize> {
        let id = buffer.id();
        self.slots
            .iter()
            .position(|slot| slot.buffer.id() == id)
            .ok_or_else(|| {
                tracing::warn!(buffer = %id, "buffer does not belong to this pool");
                BufferError::UnknownBuffer(id)
            })
    }

    fn transition(
        &mut self,
        index: usize,
        expected: BufferState,
        next: BufferState,
    ) -> BufferResult<()> {
        let slot = &mut self.slots[index];
        let id = slot.buffer.id();
        if slot.state != expected {
            tracing::warn!(buffer = %id, state = %slot.state, %expected, "invalid buffer transition");
            return Err(BufferError::InvalidTransition {
                id,
                expected,
                actual: slot.state,
            });
        }
        slot.state = next;
        tracing::trace!(buffer = %id, from = %expected, to = %next, "buffer transition");
        Ok(())
    }

    /// Pops a free slot, leaving the last composited frame for last so it
    /// stays reusable as long as possible.
    fn take_free(&mut self) -> Option<usize> {
        let last = self.last_consumed;
        let position = self
            .free
            .iter()
            .position(|&index| Some(index) != last)
            .or(if self.free.is_empty() { None } else { Some(0) })?;
        self.free.remove(position)
    }

    /// Reclaims the last composited frame if nobody holds it.
    fn take_stale(&mut self) -> Option<usize> {
        let index = self.last_consumed?;
        if self.slots[index].state != BufferState::Free {
            return None;
        }
        let position = self.free.iter().position(|&free| free == index)?;
        self.free.remove(position);
        self.slots[index].state = BufferState::ConsumerOwned;
        Some(index)
    }
}

/// Swapper over a fixed pool of 1, 2 or 3 buffers.
///
/// ## Usage
///
/// ```rust,ignore
/// let swapper = PoolSwapper::new(&SwapperConfig::double_buffered(), buffers)?;
///
/// // Render thread
/// let frame = swapper.producer_acquire()?;
/// draw(&frame);
/// swapper.producer_release(&frame)?;
///
/// // Compositor thread
/// let frame = swapper.compositor_acquire()?;
/// composite(&frame);
/// swapper.compositor_release(&frame)?;
/// ```
pub struct PoolSwapper {
    state: Mutex<PoolState>,
    /// Signalled when a buffer returns to the free list or on shutdown.
    buffer_freed: Condvar,
    buffer_count: usize,
    max_producer_buffers: usize,
}

impl PoolSwapper {
    /// Builds a swapper over `buffers`. All buffers start free.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::InvalidConfig`] if the configuration is invalid,
    /// the buffer count differs from `config.buffer_count` or two buffers
    /// share an id.
    pub fn new(config: &SwapperConfig, buffers: Vec<Arc<dyn Buffer>>) -> BufferResult<Self> {
        config.validate()?;
        if buffers.len() != config.buffer_count {
            return Err(BufferError::InvalidConfig(format!(
                "expected {} buffers, got {}",
                config.buffer_count,
                buffers.len()
            )));
        }
        let mut ids = HashSet::with_capacity(buffers.len());
        if let Some(duplicate) = buffers.iter().map(|b| b.id()).find(|id| !ids.insert(*id)) {
            return Err(BufferError::InvalidConfig(format!(
                "buffer {duplicate} appears twice in the pool"
            )));
        }

        let slots: Vec<Slot> = buffers
            .into_iter()
            .map(|buffer| Slot {
                buffer,
                state: BufferState::Free,
            })
            .collect();
        let free = (0..slots.len()).collect();
        let max_producer_buffers = config.max_producer_buffers();

        tracing::info!(
            buffers = config.buffer_count,
            max_producer_buffers,
            "buffer swapper created"
        );

        Ok(Self {
            state: Mutex::new(PoolState {
                slots,
                free,
                ready: VecDeque::new(),
                last_consumed: None,
                producer_held: 0,
                shut_down: false,
                stats: SwapperStats::default(),
            }),
            buffer_freed: Condvar::new(),
            buffer_count: config.buffer_count,
            max_producer_buffers,
        })
    }

    /// Pool depth.
    #[inline]
    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    /// How many buffers the producer may hold at once.
    #[inline]
    #[must_use]
    pub fn max_producer_buffers(&self) -> usize {
        self.max_producer_buffers
    }

    /// Current state of a pooled buffer, `None` if it is not in the pool.
    #[must_use]
    pub fn state_of(&self, id: BufferId) -> Option<BufferState> {
        self.state
            .lock()
            .slots
            .iter()
            .find(|slot| slot.buffer.id() == id)
            .map(|slot| slot.state)
    }

    /// Whether [`BufferSwapper::shutdown`] has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }
}

impl BufferSwapper for PoolSwapper {
    fn producer_acquire(&self) -> BufferResult<Arc<dyn Buffer>> {
        let mut guard = self.state.lock();
        let mut waited = false;

        let index = loop {
            let state = &mut *guard;
            if state.shut_down {
                return Err(BufferError::ShutDown);
            }
            if state.producer_held >= self.max_producer_buffers {
                tracing::warn!(
                    held = state.producer_held,
                    max = self.max_producer_buffers,
                    "producer over-acquire"
                );
                return Err(BufferError::ProtocolViolation {
                    reason: format!(
                        "producer already holds {} of {} allowed buffers",
                        state.producer_held, self.max_producer_buffers
                    ),
                });
            }
            if let Some(index) = state.take_free() {
                break index;
            }
            if !waited {
                waited = true;
                state.stats.producer_waits += 1;
                tracing::debug!("producer waiting for a free buffer");
            }
            self.buffer_freed.wait(&mut guard);
        };

        let state = &mut *guard;
        state.slots[index].state = BufferState::ProducerOwned;
        state.producer_held += 1;
        let buffer = Arc::clone(&state.slots[index].buffer);
        tracing::trace!(buffer = %buffer.id(), from = %BufferState::Free, to = %BufferState::ProducerOwned, "buffer transition");
        Ok(buffer)
    }

    fn producer_release(&self, buffer: &Arc<dyn Buffer>) -> BufferResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let index = state.index_of(buffer)?;
        state.transition(index, BufferState::ProducerOwned, BufferState::Ready)?;
        state.producer_held -= 1;
        state.ready.push_back(index);
        state.stats.frames_produced += 1;
        Ok(())
    }

    fn compositor_acquire(&self) -> BufferResult<Arc<dyn Buffer>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.shut_down {
            return Err(BufferError::ShutDown);
        }

        if let Some(index) = state.ready.pop_front() {
            state.transition(index, BufferState::Ready, BufferState::ConsumerOwned)?;
            state.last_consumed = Some(index);
            state.stats.frames_composited += 1;
            return Ok(Arc::clone(&state.slots[index].buffer));
        }

        match state.take_stale() {
            Some(index) => {
                state.stats.frames_composited += 1;
                state.stats.stale_frames += 1;
                let buffer = Arc::clone(&state.slots[index].buffer);
                tracing::debug!(buffer = %buffer.id(), stale = true, "reusing last frame");
                Ok(buffer)
            }
            None => Err(BufferError::NoFrameAvailable),
        }
    }

    fn compositor_release(&self, buffer: &Arc<dyn Buffer>) -> BufferResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let index = state.index_of(buffer)?;
        state.transition(index, BufferState::ConsumerOwned, BufferState::Free)?;
        state.free.push_back(index);
        drop(guard);
        self.buffer_freed.notify_one();
        Ok(())
    }

    fn shutdown(&self) {
        let mut state = self.state.lock();
        if state.shut_down {
            return;
        }
        state.shut_down = true;
        self.buffer_freed.notify_all();
        tracing::info!(stats = ?state.stats, "buffer swapper shut down");
    }

    fn stats(&self) -> SwapperStats {
        self.state.lock().stats
    }
}

impl fmt::Debug for PoolSwapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolSwapper")
            .field("buffer_count", &self.buffer_count)
            .field("max_producer_buffers", &self.max_producer_buffers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SoftwareBuffer;
    use std::thread;
    use std::time::Duration;
    use tessera_shared::{PixelFormat, Size};

    fn buffers(count: usize) -> Vec<Arc<dyn Buffer>> {
        (0..count)
            .map(|_| {
                Arc::new(SoftwareBuffer::new(Size::new(4, 4), PixelFormat::Abgr8888).unwrap())
                    as Arc<dyn Buffer>
            })
            .collect()
    }

    fn swapper(count: usize) -> PoolSwapper {
        let config = SwapperConfig::default().with_buffer_count(count);
        PoolSwapper::new(&config, buffers(count)).unwrap()
    }

    #[test]
    fn test_new_validates_pool() {
        let config = SwapperConfig::double_buffered();
        assert!(matches!(
            PoolSwapper::new(&config, buffers(3)),
            Err(BufferError::InvalidConfig(_))
        ));

        let one = buffers(1).remove(0);
        let duplicated = vec![Arc::clone(&one), one];
        assert!(matches!(
            PoolSwapper::new(&config, duplicated),
            Err(BufferError::InvalidConfig(_))
        ));

        let too_deep = SwapperConfig::default().with_buffer_count(4);
        assert!(matches!(
            PoolSwapper::new(&too_deep, buffers(4)),
            Err(BufferError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_full_cycle_states() {
        let swapper = swapper(2);
        let frame = swapper.producer_acquire().unwrap();
        assert_eq!(swapper.state_of(frame.id()), Some(BufferState::ProducerOwned));

        swapper.producer_release(&frame).unwrap();
        assert_eq!(swapper.state_of(frame.id()), Some(BufferState::Ready));

        let shown = swapper.compositor_acquire().unwrap();
        assert_eq!(shown.id(), frame.id());
        assert_eq!(swapper.state_of(frame.id()), Some(BufferState::ConsumerOwned));

        swapper.compositor_release(&shown).unwrap();
        assert_eq!(swapper.state_of(frame.id()), Some(BufferState::Free));

        let stats = swapper.stats();
        assert_eq!(stats.frames_produced, 1);
        assert_eq!(stats.frames_composited, 1);
        assert_eq!(stats.stale_frames, 0);
    }

    #[test]
    fn test_double_buffer_over_acquire_is_violation() {
        let swapper = swapper(2);
        let _held = swapper.producer_acquire().unwrap();
        assert!(matches!(
            swapper.producer_acquire(),
            Err(BufferError::ProtocolViolation { .. })
        ));
    }

    #[test]
    fn test_triple_buffer_producer_runs_ahead() {
        let swapper = swapper(3);
        assert_eq!(swapper.max_producer_buffers(), 2);
        let a = swapper.producer_acquire().unwrap();
        let b = swapper.producer_acquire().unwrap();
        assert_ne!(a.id(), b.id());
        assert!(matches!(
            swapper.producer_acquire(),
            Err(BufferError::ProtocolViolation { .. })
        ));
    }

    #[test]
    fn test_compositor_without_frames() {
        let swapper = swapper(2);
        assert_eq!(swapper.compositor_acquire().unwrap_err(), BufferError::NoFrameAvailable);

        // A frame still being drawn is never visible.
        let _drawing = swapper.producer_acquire().unwrap();
        assert_eq!(swapper.compositor_acquire().unwrap_err(), BufferError::NoFrameAvailable);
    }

    #[test]
    fn test_stale_frame_reuse() {
        let swapper = swapper(2);
        let frame = swapper.producer_acquire().unwrap();
        swapper.producer_release(&frame).unwrap();
        let shown = swapper.compositor_acquire().unwrap();
        swapper.compositor_release(&shown).unwrap();

        let again = swapper.compositor_acquire().unwrap();
        assert_eq!(again.id(), frame.id());
        assert_eq!(swapper.state_of(again.id()), Some(BufferState::ConsumerOwned));
        assert_eq!(swapper.stats().stale_frames, 1);

        // Still owned by the compositor: no second copy handed out.
        assert_eq!(swapper.compositor_acquire().unwrap_err(), BufferError::NoFrameAvailable);
    }

    #[test]
    fn test_producer_keeps_last_frame_reusable() {
        let swapper = swapper(2);
        let first = swapper.producer_acquire().unwrap();
        swapper.producer_release(&first).unwrap();
        let shown = swapper.compositor_acquire().unwrap();
        swapper.compositor_release(&shown).unwrap();

        let next = swapper.producer_acquire().unwrap();
        assert_ne!(next.id(), first.id());
        assert_eq!(swapper.compositor_acquire().unwrap().id(), first.id());
    }

    #[test]
    fn test_stale_frame_not_taken_from_producer() {
        let swapper = swapper(1);
        let frame = swapper.producer_acquire().unwrap();
        swapper.producer_release(&frame).unwrap();
        let shown = swapper.compositor_acquire().unwrap();
        swapper.compositor_release(&shown).unwrap();

        let _drawing = swapper.producer_acquire().unwrap();
        assert_eq!(swapper.compositor_acquire().unwrap_err(), BufferError::NoFrameAvailable);
    }

    #[test]
    fn test_foreign_and_misplaced_buffers() {
        let swapper = swapper(2);
        let foreign = buffers(1).remove(0);
        assert_eq!(
            swapper.producer_release(&foreign).unwrap_err(),
            BufferError::UnknownBuffer(foreign.id())
        );

        let frame = swapper.producer_acquire().unwrap();
        assert!(matches!(
            swapper.compositor_release(&frame),
            Err(BufferError::InvalidTransition {
                expected: BufferState::ConsumerOwned,
                actual: BufferState::ProducerOwned,
                ..
            })
        ));

        swapper.producer_release(&frame).unwrap();
        assert!(matches!(
            swapper.producer_release(&frame),
            Err(BufferError::InvalidTransition { actual: BufferState::Ready, .. })
        ));
    }

    #[test]
    fn test_producer_blocks_until_compositor_release() {
        let swapper = Arc::new(swapper(1));
        let frame = swapper.producer_acquire().unwrap();
        swapper.producer_release(&frame).unwrap();
        let shown = swapper.compositor_acquire().unwrap();

        let producer = {
            let swapper = Arc::clone(&swapper);
            thread::spawn(move || swapper.producer_acquire().map(|b| b.id()))
        };

        thread::sleep(Duration::from_millis(20));
        swapper.compositor_release(&shown).unwrap();
        assert_eq!(producer.join().unwrap(), Ok(frame.id()));
        assert_eq!(swapper.stats().producer_waits, 1);
    }

    #[test]
    fn test_shutdown_wakes_blocked_producer() {
        let swapper = Arc::new(swapper(1));
        let frame = swapper.producer_acquire().unwrap();
        swapper.producer_release(&frame).unwrap();
        let _shown = swapper.compositor_acquire().unwrap();

        let producer = {
            let swapper = Arc::clone(&swapper);
            thread::spawn(move || swapper.producer_acquire().map(|b| b.id()))
        };

        thread::sleep(Duration::from_millis(20));
        swapper.shutdown();
        assert_eq!(producer.join().unwrap(), Err(BufferError::ShutDown));
        assert!(swapper.is_shut_down());
        assert_eq!(swapper.compositor_acquire().unwrap_err(), BufferError::ShutDown);
    }
}
