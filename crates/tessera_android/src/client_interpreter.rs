//! Client-side driver interpreter.
//!
//! In a client process the driver renders into the surface's current
//! buffer; handing it back submits the surface and advances it to the next
//! buffer.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tessera_core::{Buffer, BufferResult, NativeBufferHandle, SyncObject};
use tessera_shared::{PixelFormat, Size};

use crate::driver::{dimension, hal_format_from, QueryCode};
use crate::error::{DriverError, DriverResult};
use crate::interpreter::AndroidDriverInterpreter;

/// Geometry a client surface was created with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceParameters {
    /// Surface size in pixels.
    pub size: Size,
    /// Surface pixel format.
    pub format: PixelFormat,
}

/// A client surface as the driver interpreter sees it.
pub trait ClientSurface: Send + Sync {
    /// Creation parameters.
    fn parameters(&self) -> SurfaceParameters;

    /// The buffer the client should render into now.
    fn current_buffer(&self) -> Arc<dyn Buffer>;

    /// Sends the current buffer to the server and advances to the next one.
    ///
    /// # Errors
    ///
    /// Propagates the transport's failure.
    fn submit_buffer(&self) -> BufferResult<()>;
}

/// Drives a [`ClientSurface`] on behalf of a native driver.
pub struct ClientDriverInterpreter {
    surface: Arc<dyn ClientSurface>,
    in_flight: Mutex<Option<Arc<NativeBufferHandle>>>,
    format_override: Mutex<Option<i32>>,
    swap_interval: AtomicBool,
}

impl ClientDriverInterpreter {
    /// Creates an interpreter over `surface`. Vsync is on until the driver
    /// says otherwise.
    #[must_use]
    pub fn new(surface: Arc<dyn ClientSurface>) -> Self {
        Self {
            surface,
            in_flight: Mutex::new(None),
            format_override: Mutex::new(None),
            swap_interval: AtomicBool::new(true),
        }
    }

    /// Last swap-interval intent from the driver.
    #[must_use]
    pub fn swap_interval_enabled(&self) -> bool {
        self.swap_interval.load(Ordering::Acquire)
    }
}

impl AndroidDriverInterpreter for ClientDriverInterpreter {
    fn driver_requests_buffer(&self) -> DriverResult<Arc<NativeBufferHandle>> {
        let buffer = self.surface.current_buffer();
        let handle = buffer.native_buffer_handle();
        tracing::trace!(buffer = %buffer.id(), "client buffer handed to driver");
        *self.in_flight.lock() = Some(Arc::clone(&handle));
        Ok(handle)
    }

    fn driver_returns_buffer(
        &self,
        handle: Option<&NativeBufferHandle>,
        sync: Arc<dyn SyncObject>,
    ) -> DriverResult<()> {
        let key = {
            let in_flight = self.in_flight.lock();
            match (handle, in_flight.as_deref()) {
                (Some(returned), Some(current)) if returned.key() == current.key() => {
                    current.key()
                }
                _ => {
                    tracing::warn!("driver returned a buffer that is not in flight");
                    return Err(DriverError::UnknownHandle);
                }
            }
        };

        // Unfinished pixels must not leave the process.
        sync.wait();
        self.surface.submit_buffer()?;

        // The driver keeps its handle if the submit failed.
        let mut in_flight = self.in_flight.lock();
        if in_flight.as_deref().map(NativeBufferHandle::key) == Some(key) {
            *in_flight = None;
        }
        Ok(())
    }

    fn dispatch_driver_request_format(&self, format: i32) {
        *self.format_override.lock() = Some(format);
    }

    fn driver_requests_info(&self, query: QueryCode) -> DriverResult<i32> {
        match query {
            QueryCode::WIDTH | QueryCode::DEFAULT_WIDTH => {
                Ok(dimension(self.surface.parameters().size.width))
            }
            QueryCode::HEIGHT | QueryCode::DEFAULT_HEIGHT => {
                Ok(dimension(self.surface.parameters().size.height))
            }
            QueryCode::FORMAT => {
                let format_override = *self.format_override.lock();
                match format_override {
                    Some(format) => Ok(format),
                    None => hal_format_from(self.surface.parameters().format),
                }
            }
            // No rotation or flip.
            QueryCode::TRANSFORM_HINT => Ok(0),
            other => {
                tracing::warn!(query = %other, "unsupported driver query");
                Err(DriverError::UnsupportedQuery(other.0))
            }
        }
    }

    fn sync_to_display(&self, sync: bool) {
        self.swap_interval.store(sync, Ordering::Release);
    }
}

impl fmt::Debug for ClientDriverInterpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientDriverInterpreter")
            .field("in_flight", &self.in_flight.lock().is_some())
            .field("swap_interval", &self.swap_interval_enabled())
            .finish_non_exhaustive()
    }
}
