#![forbid(unsafe_code)]

//! Marshalling binding updates onto a designated execution context.
//!
//! A manager may carry a [`Dispatcher`]. When one is set, every
//! read-convert-write sequence of every binding owned by that manager runs
//! through [`Dispatcher::run`] instead of inline on the thread that mutated the
//! property. `run` is a synchronous hand-off: it returns only after the work
//! has executed.
//!
//! # Implementations
//!
//! - [`InlineDispatcher`]: executes on the caller. Useful as an interception
//!   point.
//! - [`ThreadDispatcher`]: one dedicated worker thread fed by a channel.
//!   Calls made from the worker itself run inline, so an update that cascades
//!   into another binding cannot wait on its own thread.
//!
//! A thread that is already inside a binding update never hands off again:
//! nested updates run inline on that thread. The outer update still owns the
//! endpoint monitors, so a worker waiting to enter them would never finish.
//!
//! # Failure Modes
//!
//! - Work panics on the worker: the panic is caught there and resumed on the
//!   thread blocked in `run`, so it surfaces to whoever mutated the property.
//! - Worker already shut down: the work runs inline and a warning is logged.

use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle, ThreadId};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

thread_local! {
    static UPDATE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as running a binding update until dropped.
pub(crate) struct UpdateScope {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl UpdateScope {
    pub(crate) fn enter() -> Self {
        UPDATE_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self {
            _not_send: std::marker::PhantomData,
        }
    }

    /// Whether the calling thread is inside a binding update.
    pub(crate) fn is_active() -> bool {
        UPDATE_DEPTH.with(|depth| depth.get() > 0)
    }
}

impl Drop for UpdateScope {
    fn drop(&mut self) {
        UPDATE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// A unit of work handed to a dispatcher.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Executes binding updates on a designated context.
pub trait Dispatcher: Send + Sync {
    /// Execute `work` and return once it has completed.
    fn run(&self, work: Work);
}

/// Runs every unit of work on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn run(&self, work: Work) {
        work();
    }
}

struct Job {
    work: Work,
    done: mpsc::SyncSender<thread::Result<()>>,
}

/// A dispatcher backed by one dedicated, named worker thread.
pub struct ThreadDispatcher {
    name: String,
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    worker: ThreadId,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadDispatcher {
    /// Start the worker thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn(name: impl Into<String>) -> std::io::Result<Self> {
        let name = name.into();
        let (tx, rx) = mpsc::channel::<Job>();
        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            for job in rx {
                let outcome = panic::catch_unwind(AssertUnwindSafe(job.work));
                let _ = job.done.send(outcome);
            }
        })?;
        let worker = handle.thread().id();
        tracing::debug!(dispatcher = %name, "dispatcher thread started");
        Ok(Self {
            name,
            sender: Mutex::new(Some(tx)),
            worker,
            handle: Mutex::new(Some(handle)),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the calling thread is this dispatcher's worker.
    #[must_use]
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.worker
    }

    /// Stop accepting work and wait for the worker to drain its queue.
    pub fn shutdown(&self) {
        drop(self.sender.lock().take());
        if self.is_current() {
            return;
        }
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
            tracing::debug!(dispatcher = %self.name, "dispatcher thread stopped");
        }
    }
}

impl Dispatcher for ThreadDispatcher {
    fn run(&self, work: Work) {
        if self.is_current() {
            work();
            return;
        }

        let (done_tx, done_rx) = mpsc::sync_channel(1);
        let job = Job {
            work,
            done: done_tx,
        };
        let rejected = match self.sender.lock().as_ref() {
            Some(tx) => tx.send(job).err().map(|e| e.0),
            None => Some(job),
        };
        if let Some(job) = rejected {
            tracing::warn!(dispatcher = %self.name, "dispatcher stopped; running update inline");
            (job.work)();
            return;
        }

        match done_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(payload)) => panic::resume_unwind(payload),
            // The worker catches every panic, so it only exits once the
            // channel closes; a lost reply means the update never ran.
            Err(_) => {
                tracing::error!(dispatcher = %self.name, "dispatcher worker exited before reporting completion; update lost");
            }
        }
    }
}

impl Drop for ThreadDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ThreadDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadDispatcher")
            .field("name", &self.name)
            .field("running", &self.sender.lock().is_some())
            .finish()
    }
}

/// The current dispatcher of one manager, shared with all of its bindings.
#[derive(Default)]
pub(crate) struct DispatchSlot {
    current: ArcSwapOption<Arc<dyn Dispatcher>>,
}

impl DispatchSlot {
    pub(crate) fn new(dispatcher: Option<Arc<dyn Dispatcher>>) -> Self {
        Self {
            current: ArcSwapOption::new(dispatcher.map(Arc::new)),
        }
    }

    pub(crate) fn get(&self) -> Option<Arc<dyn Dispatcher>> {
        self.current.load_full().map(|d| Arc::clone(&*d))
    }

    pub(crate) fn set(&self, dispatcher: Option<Arc<dyn Dispatcher>>) {
        self.current.store(dispatcher.map(Arc::new));
    }

    pub(crate) fn is_set(&self) -> bool {
        self.current.load().is_some()
    }

    /// Run `work` through the current dispatcher, or inline if none is set
    /// or the calling thread is already inside a binding update.
    pub(crate) fn execute(&self, work: impl FnOnce() + Send + 'static) {
        if UpdateScope::is_active() {
            work();
            return;
        }
        match self.current.load_full() {
            Some(dispatcher) => dispatcher.run(Box::new(work)),
            None => work(),
        }
    }
}

impl fmt::Debug for DispatchSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchSlot")
            .field("set", &self.is_set())
            .finish()
    }
}
