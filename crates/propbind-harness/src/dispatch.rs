#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use propbind_runtime::dispatch::{Dispatcher, Work};

/// Runs work inline while counting hand-offs and recording the thread of each.
#[derive(Debug, Default)]
pub struct CountingDispatcher {
    runs: AtomicUsize,
    threads: Mutex<Vec<ThreadId>>,
}

impl CountingDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Units of work executed so far.
    #[must_use]
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Thread of every run, in order.
    #[must_use]
    pub fn threads(&self) -> Vec<ThreadId> {
        self.threads.lock().clone()
    }
}

impl Dispatcher for CountingDispatcher {
    fn run(&self, work: Work) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.threads.lock().push(thread::current().id());
        work();
    }
}
