//! # Sync Primitives
//!
//! A fence says "the producer-side work on this buffer is finished".
//! Consumers that need complete pixel data call [`SyncObject::wait`]
//! before touching the contents.
//!
//! ```text
//!   Render thread                 Compositor thread
//!   ─────────────                 ─────────────────
//!   draw into buffer
//!   fence.signal()  ───────────>  fence.wait()   (returns)
//!                                 read pixels
//! ```

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// An opaque fence over producer-side work.
pub trait SyncObject: Send + Sync {
    /// Blocks until the producer-side work has completed.
    fn wait(&self);
}

impl fmt::Debug for dyn SyncObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SyncObject")
    }
}

/// A fence whose work is already complete. `wait()` returns immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignalledFence;

impl SignalledFence {
    /// Shared, type-erased instance.
    #[must_use]
    pub fn shared() -> Arc<dyn SyncObject> {
        Arc::new(Self)
    }
}

impl SyncObject for SignalledFence {
    #[inline]
    fn wait(&self) {}
}

/// A fence signalled from the CPU by the producer.
///
/// Used by software renderers and by tests that need to observe who waits.
pub struct CpuFence {
    signalled: AtomicBool,
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl CpuFence {
    /// Creates an unsignalled fence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signalled: AtomicBool::new(false),
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }

    /// Marks the work as complete and wakes every waiter.
    pub fn signal(&self) {
        let _guard = self.mutex.lock();
        self.signalled.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    /// Returns true once `signal()` has been called.
    #[inline]
    #[must_use]
    pub fn is_signalled(&self) -> bool {
        self.signalled.load(Ordering::Acquire)
    }

    /// Waits with timeout. Returns true if the fence is signalled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_signalled() {
            return true;
        }
        let mut guard = self.mutex.lock();
        if !self.is_signalled() {
            self.condvar.wait_for(&mut guard, timeout);
        }
        self.is_signalled()
    }
}

impl Default for CpuFence {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CpuFence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuFence")
            .field("signalled", &self.is_signalled())
            .finish()
    }
}

impl SyncObject for CpuFence {
    fn wait(&self) {
        if self.is_signalled() {
            return;
        }
        let mut guard = self.mutex.lock();
        while !self.is_signalled() {
            self.condvar.wait(&mut guard);
        }
    }
}
