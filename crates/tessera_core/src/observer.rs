//! # Observer Multiplexer
//!
//! A registry of interested parties, each paired with the executor its
//! callbacks run on.
//!
//! ```text
//!   for_each_observer(f)
//!          │  snapshot (registration order)
//!          ├──> executor A ──> f(observer A)
//!          ├──> executor B ──> f(observer B)   (skipped if unregistered
//!          └──> executor C ──> f(observer C)    before its turn)
//! ```
//!
//! Observers are held weakly: dropping the last `Arc` is as good as
//! unregistering.

use crossbeam_channel::{bounded, unbounded, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use crate::buffer::BufferId;

/// A unit of work handed to an [`Executor`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Execution context for observer callbacks.
pub trait Executor: Send + Sync {
    /// Runs `task`, now or later.
    fn spawn(&self, task: Task);
}

/// Runs every task inline on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateExecutor;

impl Executor for ImmediateExecutor {
    #[inline]
    fn spawn(&self, task: Task) {
        task();
    }
}

/// Runs tasks in submission order on one dedicated worker thread.
pub struct ThreadExecutor {
    sender: Mutex<Option<Sender<Task>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadExecutor {
    /// Starts the worker thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn new(name: &str) -> io::Result<Self> {
        let (sender, receiver) = unbounded::<Task>();
        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for task in receiver {
                    task();
                }
            })?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Blocks until every task spawned so far has run.
    pub fn flush(&self) {
        let (done, finished) = bounded::<()>(1);
        self.spawn(Box::new(move || {
            let _ = done.send(());
        }));
        // A closed channel means the worker is gone and nothing is pending.
        let _ = finished.recv();
    }
}

impl Executor for ThreadExecutor {
    fn spawn(&self, task: Task) {
        let sent = match self.sender.lock().as_ref() {
            Some(sender) => sender.send(task).is_ok(),
            None => false,
        };
        if !sent {
            tracing::warn!("executor stopped, dropping task");
        }
    }
}

impl Drop for ThreadExecutor {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.sender.lock().take();
        if let Some(worker) = self.worker.lock().take() {
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                tracing::warn!("observer worker panicked");
            }
        }
    }
}

impl fmt::Debug for ThreadExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadExecutor")
            .field("running", &self.sender.lock().is_some())
            .finish()
    }
}

struct Registration<O: ?Sized> {
    observer: Weak<O>,
    executor: Arc<dyn Executor>,
    live: Arc<AtomicBool>,
}

impl<O: ?Sized> Clone for Registration<O> {
    fn clone(&self) -> Self {
        Self {
            observer: Weak::clone(&self.observer),
            executor: Arc::clone(&self.executor),
            live: Arc::clone(&self.live),
        }
    }
}

/// Registry of observers of type `O`, each with its own executor.
pub struct ObserverMultiplexer<O: ?Sized + Send + Sync + 'static> {
    registrations: Mutex<Vec<Registration<O>>>,
    default_executor: Arc<dyn Executor>,
}

impl<O: ?Sized + Send + Sync + 'static> ObserverMultiplexer<O> {
    /// Creates an empty registry. `default_executor` serves
    /// [`register_interest`](Self::register_interest).
    #[must_use]
    pub fn new(default_executor: Arc<dyn Executor>) -> Self {
        Self {
            registrations: Mutex::new(Vec::new()),
            default_executor,
        }
    }

    /// Registers `observer` on the default executor.
    pub fn register_interest(&self, observer: &Arc<O>) {
        self.register_interest_with(observer, Arc::clone(&self.default_executor));
    }

    /// Registers `observer` on `executor`.
    pub fn register_interest_with(&self, observer: &Arc<O>, executor: Arc<dyn Executor>) {
        let mut registrations = self.registrations.lock();
        registrations.retain(|r| r.observer.strong_count() > 0);
        registrations.push(Registration {
            observer: Arc::downgrade(observer),
            executor,
            live: Arc::new(AtomicBool::new(true)),
        });
        tracing::trace!(observers = registrations.len(), "observer registered");
    }

    /// Removes `observer`. Callbacks already queued for it are skipped.
    pub fn unregister_interest(&self, observer: &O) {
        let target = (observer as *const O).cast::<()>();
        let mut registrations = self.registrations.lock();
        registrations.retain(|r| {
            let same = Weak::as_ptr(&r.observer).cast::<()>() == target;
            if same {
                r.live.store(false, Ordering::Release);
            }
            !same
        });
        tracing::trace!(observers = registrations.len(), "observer unregistered");
    }

    /// Invokes `f` once for every registered observer, in registration
    /// order, through that observer's executor.
    pub fn for_each_observer<F>(&self, f: F)
    where
        F: Fn(&O) + Send + Sync + 'static,
    {
        let snapshot = self.registrations.lock().clone();
        let f = Arc::new(f);
        for registration in snapshot {
            let Some(observer) = registration.observer.upgrade() else {
                continue;
            };
            let f = Arc::clone(&f);
            let live = registration.live;
            registration.executor.spawn(Box::new(move || {
                if live.load(Ordering::Acquire) {
                    (*f)(&*observer);
                }
            }));
        }
    }

    /// Number of registered observers still alive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations
            .lock()
            .iter()
            .filter(|r| r.observer.strong_count() > 0)
            .count()
    }

    /// True if no live observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<O: ?Sized + Send + Sync + 'static> Default for ObserverMultiplexer<O> {
    fn default() -> Self {
        Self::new(Arc::new(ImmediateExecutor))
    }
}

impl<O: ?Sized + Send + Sync + 'static> fmt::Debug for ObserverMultiplexer<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverMultiplexer")
            .field("observers", &self.len())
            .finish_non_exhaustive()
    }
}

/// Told whenever a buffer has been posted to the display.
pub trait FrameObserver: Send + Sync {
    /// `buffer` is now the front-buffer.
    fn frame_posted(&self, buffer: BufferId);
}

/// Fans frame notifications out to every registered [`FrameObserver`].
pub type FrameObserverMultiplexer = ObserverMultiplexer<dyn FrameObserver>;

impl FrameObserver for ObserverMultiplexer<dyn FrameObserver> {
    fn frame_posted(&self, buffer: BufferId) {
        self.for_each_observer(move |observer| observer.frame_posted(buffer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{CpuFence, SyncObject};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(usize, BufferId)>>,
        tag: usize,
        log: Option<Arc<Mutex<Vec<usize>>>>,
    }

    impl FrameObserver for Recorder {
        fn frame_posted(&self, buffer: BufferId) {
            self.seen.lock().push((self.tag, buffer));
            if let Some(log) = &self.log {
                log.lock().push(self.tag);
            }
        }
    }

    fn recorder(tag: usize, log: &Arc<Mutex<Vec<usize>>>) -> Arc<Recorder> {
        Arc::new(Recorder {
            tag,
            log: Some(Arc::clone(log)),
            ..Recorder::default()
        })
    }

    #[test]
    fn test_fan_out_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mux = FrameObserverMultiplexer::default();
        let a = recorder(1, &log);
        let b = recorder(2, &log);
        let a_dyn: Arc<dyn FrameObserver> = a.clone();
        let b_dyn: Arc<dyn FrameObserver> = b.clone();
        mux.register_interest(&a_dyn);
        mux.register_interest(&b_dyn);

        mux.frame_posted(BufferId::new(7));

        assert_eq!(*log.lock(), vec![1, 2]);
        assert_eq!(*a.seen.lock(), vec![(1, BufferId::new(7))]);
        assert_eq!(mux.len(), 2);
    }

    #[test]
    fn test_unregistered_observer_is_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mux = FrameObserverMultiplexer::default();
        let a: Arc<dyn FrameObserver> = recorder(1, &log);
        let b: Arc<dyn FrameObserver> = recorder(2, &log);
        mux.register_interest(&a);
        mux.register_interest(&b);

        mux.unregister_interest(&*a);
        mux.frame_posted(BufferId::new(1));

        assert_eq!(*log.lock(), vec![2]);
        assert_eq!(mux.len(), 1);
    }

    #[test]
    fn test_dropped_observer_is_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mux = FrameObserverMultiplexer::default();
        {
            let a: Arc<dyn FrameObserver> = recorder(1, &log);
            mux.register_interest(&a);
        }
        mux.frame_posted(BufferId::new(1));

        assert!(log.lock().is_empty());
        assert!(mux.is_empty());
    }

    #[test]
    fn test_thread_executor_runs_in_order() {
        let executor = ThreadExecutor::new("observer-test").unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..16 {
            let order = Arc::clone(&order);
            executor.spawn(Box::new(move || order.lock().push(i)));
        }
        executor.flush();
        assert_eq!(*order.lock(), (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_unregister_before_turn_on_worker() {
        let executor = Arc::new(ThreadExecutor::new("observer-test").unwrap());
        let gate = Arc::new(CpuFence::new());
        {
            let gate = Arc::clone(&gate);
            executor.spawn(Box::new(move || gate.wait()));
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let mux = FrameObserverMultiplexer::default();
        let a: Arc<dyn FrameObserver> = recorder(1, &log);
        mux.register_interest_with(&a, executor.clone());

        mux.frame_posted(BufferId::new(3));
        mux.unregister_interest(&*a);
        gate.signal();
        executor.flush();

        assert!(log.lock().is_empty());
    }
}
