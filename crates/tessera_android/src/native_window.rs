//! # Native Window Hooks
//!
//! The entry points a native graphics driver calls on its window. Each hook
//! forwards to an [`AndroidDriverInterpreter`]; failures stay scoped to the
//! driver transaction and are reported as negative errno-style status
//! codes through [`status_of`].

use std::fmt;
use std::sync::Arc;
use tessera_core::{BufferError, NativeBufferHandle, SyncObject};

use crate::driver::{PerformOp, QueryCode};
use crate::error::{DriverError, DriverResult};
use crate::interpreter::AndroidDriverInterpreter;

/// Fence fd meaning "no fence, usable now".
pub const NO_FENCE: i32 = -1;

/// Invalid argument.
pub const EINVAL: i32 = 22;
/// Resource busy.
pub const EBUSY: i32 = 16;
/// No such device.
pub const ENODEV: i32 = 19;
/// Try again.
pub const EAGAIN: i32 = 11;
/// Out of memory.
pub const ENOMEM: i32 = 12;

/// A buffer handed to the driver by `dequeue_buffer`.
#[derive(Debug, Clone)]
pub struct DequeuedBuffer {
    /// The buffer.
    pub handle: Arc<NativeBufferHandle>,
    /// Fence the driver waits on before writing. Always [`NO_FENCE`].
    pub fence_fd: i32,
}

/// Driver-facing window over an interpreter.
pub struct NativeWindow {
    interpreter: Arc<dyn AndroidDriverInterpreter>,
}

impl NativeWindow {
    /// Creates a window over `interpreter`.
    #[must_use]
    pub fn new(interpreter: Arc<dyn AndroidDriverInterpreter>) -> Self {
        Self { interpreter }
    }

    /// `query` hook.
    ///
    /// # Errors
    ///
    /// Whatever the interpreter reports for `code`.
    pub fn query(&self, code: i32) -> DriverResult<i32> {
        self.interpreter.driver_requests_info(QueryCode::from(code))
    }

    /// `perform` hook. Only the buffer format matters; other operations are
    /// accepted and ignored.
    pub fn perform(&self, op: PerformOp) {
        match op {
            PerformOp::SetBuffersFormat(format) => {
                self.interpreter.dispatch_driver_request_format(format);
            }
            other => tracing::trace!(op = ?other, "ignoring perform"),
        }
    }

    /// `setSwapInterval` hook. Any positive interval means vsync.
    pub fn set_swap_interval(&self, interval: i32) {
        self.interpreter.sync_to_display(interval > 0);
    }

    /// `dequeueBuffer` hook.
    ///
    /// # Errors
    ///
    /// Whatever the interpreter reports.
    pub fn dequeue_buffer(&self) -> DriverResult<DequeuedBuffer> {
        let handle = self.interpreter.driver_requests_buffer()?;
        Ok(DequeuedBuffer {
            handle,
            fence_fd: NO_FENCE,
        })
    }

    /// `queueBuffer` hook.
    ///
    /// # Errors
    ///
    /// [`DriverError::UnknownHandle`] for a handle this window did not hand
    /// out.
    pub fn queue_buffer(
        &self,
        handle: Option<&NativeBufferHandle>,
        sync: Arc<dyn SyncObject>,
    ) -> DriverResult<()> {
        self.interpreter.driver_returns_buffer(handle, sync)
    }

    /// `cancelBuffer` hook. A cancelled buffer goes back the same way as a
    /// queued one.
    ///
    /// # Errors
    ///
    /// [`DriverError::UnknownHandle`] for a handle this window did not hand
    /// out.
    pub fn cancel_buffer(
        &self,
        handle: Option<&NativeBufferHandle>,
        sync: Arc<dyn SyncObject>,
    ) -> DriverResult<()> {
        self.interpreter.driver_returns_buffer(handle, sync)
    }
}

impl fmt::Debug for NativeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeWindow").finish_non_exhaustive()
    }
}

/// The status code a driver expects for `result`: zero or a negative errno.
#[must_use]
pub fn status_of<T>(result: &DriverResult<T>) -> i32 {
    let Err(error) = result else {
        return 0;
    };
    match error {
        DriverError::UnknownHandle
        | DriverError::UnsupportedQuery(_)
        | DriverError::UnsupportedFormat(_) => -EINVAL,
        DriverError::Swapper(error) => match error {
            BufferError::ProtocolViolation { .. } => -EBUSY,
            BufferError::ShutDown => -ENODEV,
            BufferError::NoFrameAvailable => -EAGAIN,
            BufferError::Allocation(_) => -ENOMEM,
            BufferError::UnknownBuffer(_)
            | BufferError::InvalidTransition { .. }
            | BufferError::InvalidConfig(_) => -EINVAL,
        },
        DriverError::Gralloc(error) if error.code < 0 => error.code,
        DriverError::Gralloc(_) => -EINVAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GrallocError, GrallocOp};
    use parking_lot::Mutex;
    use tessera_core::{NativeHandle, SignalledFence};

    /// Records every call it receives.
    #[derive(Default)]
    struct RecordingInterpreter {
        calls: Mutex<Vec<String>>,
        handle: Mutex<Option<Arc<NativeBufferHandle>>>,
    }

    impl AndroidDriverInterpreter for RecordingInterpreter {
        fn driver_requests_buffer(&self) -> DriverResult<Arc<NativeBufferHandle>> {
            self.calls.lock().push("requests_buffer".into());
            let handle = Arc::new(NativeBufferHandle::new(
                2,
                2,
                2,
                1,
                0,
                Arc::new(NativeHandle::default()),
            ));
            *self.handle.lock() = Some(Arc::clone(&handle));
            Ok(handle)
        }

        fn driver_returns_buffer(
            &self,
            handle: Option<&NativeBufferHandle>,
            _sync: Arc<dyn SyncObject>,
        ) -> DriverResult<()> {
            self.calls.lock().push("returns_buffer".into());
            match (handle, self.handle.lock().as_deref()) {
                (Some(returned), Some(given)) if returned.key() == given.key() => Ok(()),
                _ => Err(DriverError::UnknownHandle),
            }
        }

        fn dispatch_driver_request_format(&self, format: i32) {
            self.calls.lock().push(format!("format {format}"));
        }

        fn driver_requests_info(&self, query: QueryCode) -> DriverResult<i32> {
            self.calls.lock().push(format!("info {}", query.0));
            Ok(query.0 * 10)
        }

        fn sync_to_display(&self, sync: bool) {
            self.calls.lock().push(format!("sync {sync}"));
        }
    }

    fn window() -> (NativeWindow, Arc<RecordingInterpreter>) {
        let interpreter = Arc::new(RecordingInterpreter::default());
        (NativeWindow::new(interpreter.clone()), interpreter)
    }

    #[test]
    fn test_query_forwards() {
        let (window, interpreter) = window();
        assert_eq!(window.query(7), Ok(70));
        assert_eq!(*interpreter.calls.lock(), vec!["info 7".to_string()]);
    }

    #[test]
    fn test_perform_forwards_only_format() {
        let (window, interpreter) = window();
        window.perform(PerformOp::SetUsage(0x33));
        window.perform(PerformOp::SetBuffersFormat(945));
        window.perform(PerformOp::Connect(1));
        assert_eq!(*interpreter.calls.lock(), vec!["format 945".to_string()]);
    }

    #[test]
    fn test_swap_interval() {
        let (window, interpreter) = window();
        window.set_swap_interval(0);
        window.set_swap_interval(1);
        window.set_swap_interval(2);
        assert_eq!(
            *interpreter.calls.lock(),
            vec!["sync false".to_string(), "sync true".into(), "sync true".into()]
        );
    }

    #[test]
    fn test_dequeue_has_no_fence() {
        let (window, _interpreter) = window();
        let dequeued = window.dequeue_buffer().unwrap();
        assert_eq!(dequeued.fence_fd, NO_FENCE);
    }

    #[test]
    fn test_queue_and_cancel_return_the_buffer() {
        let (window, interpreter) = window();
        let dequeued = window.dequeue_buffer().unwrap();
        window
            .queue_buffer(Some(&*dequeued.handle), SignalledFence::shared())
            .unwrap();
        window
            .cancel_buffer(Some(&*dequeued.handle), SignalledFence::shared())
            .unwrap();
        assert_eq!(
            *interpreter.calls.lock(),
            vec![
                "requests_buffer".to_string(),
                "returns_buffer".into(),
                "returns_buffer".into()
            ]
        );
        assert_eq!(status_of(&window.queue_buffer(None, SignalledFence::shared())), -EINVAL);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_of(&Ok::<(), DriverError>(())), 0);
        assert_eq!(status_of::<()>(&Err(DriverError::UnsupportedQuery(8))), -EINVAL);
        assert_eq!(
            status_of::<()>(&Err(BufferError::ProtocolViolation { reason: String::new() }.into())),
            -EBUSY
        );
        assert_eq!(status_of::<()>(&Err(BufferError::ShutDown.into())), -ENODEV);
        assert_eq!(status_of::<()>(&Err(BufferError::NoFrameAvailable.into())), -EAGAIN);
        assert_eq!(
            status_of::<()>(&Err(GrallocError::new(GrallocOp::Lock, -13).into())),
            -13
        );
    }
}
