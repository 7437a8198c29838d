//! The seam between the native-window hooks and whoever serves them.

use std::sync::Arc;
use tessera_core::{NativeBufferHandle, SyncObject};

use crate::driver::QueryCode;
use crate::error::DriverResult;

/// Answers a native driver's buffer, format and query requests.
///
/// Implemented in the server by [`crate::ServerRenderWindow`] (backed by a
/// swapper) and in clients by [`crate::ClientDriverInterpreter`] (backed by
/// a client surface).
pub trait AndroidDriverInterpreter: Send + Sync {
    /// Hands the driver a buffer to work with.
    ///
    /// # Errors
    ///
    /// Propagates the backing source's failure.
    fn driver_requests_buffer(&self) -> DriverResult<Arc<NativeBufferHandle>>;

    /// Takes a buffer back from the driver. `sync` covers the driver's work.
    ///
    /// # Errors
    ///
    /// [`crate::DriverError::UnknownHandle`] for a null or foreign handle.
    fn driver_returns_buffer(
        &self,
        handle: Option<&NativeBufferHandle>,
        sync: Arc<dyn SyncObject>,
    ) -> DriverResult<()>;

    /// Records the driver's chosen buffer format.
    fn dispatch_driver_request_format(&self, format: i32);

    /// Answers a window query.
    ///
    /// # Errors
    ///
    /// [`crate::DriverError::UnsupportedQuery`] for codes this side does not
    /// answer.
    fn driver_requests_info(&self, query: QueryCode) -> DriverResult<i32>;

    /// Whether posting should wait for vsync.
    fn sync_to_display(&self, sync: bool);
}
