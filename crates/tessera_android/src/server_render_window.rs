//! # Server Render Window
//!
//! Serves the display's native window from a swapper.
//!
//! ```text
//!   driver                ServerRenderWindow                 swapper / display
//!   ──────                ──────────────────                 ─────────────────
//!   dequeue ───────────>  driver_requests_buffer ──────────> compositor_acquire
//!           <─ handle ──  remember handle -> buffer
//!   queue ─────────────>  driver_returns_buffer  ──────────> compositor_release
//!                         forget handle          ──────────> set_next_frontbuffer
//!                                                ──────────> frame observers
//! ```
//!
//! Returns are serialized from release to post: the display always shows
//! the buffer of the most recent successful return.
//!
//! The handle map belongs to this adapter alone. A handle is only accepted
//! back if this window handed it out and has not taken it back yet.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tessera_core::{
    Buffer, BufferSwapper, DisplaySupportProvider, FrameObserver, FrameObserverMultiplexer,
    HandleKey, NativeBufferHandle, SyncObject,
};

use crate::driver::{dimension, hal_format_from, QueryCode};
use crate::error::{DriverError, DriverResult};
use crate::interpreter::AndroidDriverInterpreter;

/// A buffer currently held by the driver.
struct InFlight {
    /// Keeps the handle, and so its key, alive while the driver holds it.
    _handle: Arc<NativeBufferHandle>,
    buffer: Arc<dyn Buffer>,
}

/// Adapts a swapper and a display to the native-window driver protocol.
pub struct ServerRenderWindow {
    swapper: Arc<dyn BufferSwapper>,
    display: Arc<dyn DisplaySupportProvider>,
    in_flight: Mutex<HashMap<HandleKey, InFlight>>,
    /// Held from `compositor_release` until the frame is posted and
    /// announced, so frames reach the display in release order.
    posting: Mutex<()>,
    format_override: Mutex<Option<i32>>,
    /// Fence of the most recently posted front-buffer.
    front_sync: Mutex<Option<Arc<dyn SyncObject>>>,
    observers: Arc<FrameObserverMultiplexer>,
}

impl ServerRenderWindow {
    /// Creates a window over `swapper`, posting to `display`.
    #[must_use]
    pub fn new(
        swapper: Arc<dyn BufferSwapper>,
        display: Arc<dyn DisplaySupportProvider>,
    ) -> Self {
        Self {
            swapper,
            display,
            in_flight: Mutex::new(HashMap::new()),
            posting: Mutex::new(()),
            format_override: Mutex::new(None),
            front_sync: Mutex::new(None),
            observers: Arc::new(FrameObserverMultiplexer::default()),
        }
    }

    /// Observers told about every posted frame.
    #[must_use]
    pub fn observers(&self) -> &Arc<FrameObserverMultiplexer> {
        &self.observers
    }

    /// Number of buffers the driver currently holds.
    #[must_use]
    pub fn buffers_in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Blocks until the driver's work on the current front-buffer is done.
    /// Returns false if nothing has been posted yet.
    pub fn wait_for_front_buffer(&self) -> bool {
        let sync = self.front_sync.lock().clone();
        match sync {
            Some(sync) => {
                sync.wait();
                true
            }
            None => false,
        }
    }
}

impl AndroidDriverInterpreter for ServerRenderWindow {
    fn driver_requests_buffer(&self) -> DriverResult<Arc<NativeBufferHandle>> {
        let buffer = self.swapper.compositor_acquire()?;
        let handle = buffer.native_buffer_handle();
        tracing::trace!(buffer = %buffer.id(), "buffer handed to driver");
        self.in_flight.lock().insert(
            handle.key(),
            InFlight {
                _handle: Arc::clone(&handle),
                buffer,
            },
        );
        Ok(handle)
    }

    fn driver_returns_buffer(
        &self,
        handle: Option<&NativeBufferHandle>,
        sync: Arc<dyn SyncObject>,
    ) -> DriverResult<()> {
        let Some(handle) = handle else {
            tracing::warn!("driver returned a null buffer");
            return Err(DriverError::UnknownHandle);
        };
        let key = handle.key();

        // Lock order: posting, then in_flight. Dequeues never take posting.
        let _posting = self.posting.lock();
        let buffer = {
            let mut in_flight = self.in_flight.lock();
            let Some(entry) = in_flight.get(&key) else {
                tracing::warn!(?key, "driver returned a buffer it was never given");
                return Err(DriverError::UnknownHandle);
            };
            let buffer = Arc::clone(&entry.buffer);
            self.swapper.compositor_release(&buffer)?;
            in_flight.remove(&key);
            buffer
        };

        *self.front_sync.lock() = Some(sync);
        tracing::trace!(buffer = %buffer.id(), "buffer returned by driver, posting");
        let id = buffer.id();
        self.display.set_next_frontbuffer(buffer);
        self.observers.frame_posted(id);
        Ok(())
    }

    fn dispatch_driver_request_format(&self, format: i32) {
        tracing::trace!(format, "driver format override");
        *self.format_override.lock() = Some(format);
    }

    fn driver_requests_info(&self, query: QueryCode) -> DriverResult<i32> {
        match query {
            QueryCode::FORMAT => {
                let format_override = *self.format_override.lock();
                match format_override {
                    Some(format) => Ok(format),
                    None => hal_format_from(self.display.display_format()),
                }
            }
            QueryCode::DEFAULT_WIDTH => Ok(dimension(self.display.display_size().width)),
            QueryCode::DEFAULT_HEIGHT => Ok(dimension(self.display.display_size().height)),
            other => {
                tracing::warn!(query = %other, "unsupported driver query");
                Err(DriverError::UnsupportedQuery(other.0))
            }
        }
    }

    fn sync_to_display(&self, sync: bool) {
        self.display.sync_to_display(sync);
    }
}

impl fmt::Debug for ServerRenderWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerRenderWindow")
            .field("buffers_in_flight", &self.buffers_in_flight())
            .field("format_override", &*self.format_override.lock())
            .finish_non_exhaustive()
    }
}
