use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

const RUNNING: u8 = 0;
const ABORT_REQUESTED: u8 = 1;
const CLOSED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Running,
    AbortRequested,
    Closed,
}

/// Returned by [`CancellationToken::checkpoint`] once an abort was requested.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("aborted")]
pub struct Aborted;

struct Inner {
    state: AtomicU8,
    stopped: Mutex<bool>,
    stopped_cond: Condvar,
}

/// Shared between a session's owner and its computation thread.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: AtomicU8::new(RUNNING),
                stopped: Mutex::new(false),
                stopped_cond: Condvar::new(),
            }),
        }
    }

    pub fn state(&self) -> TokenState {
        match self.inner.state.load(Ordering::Acquire) {
            RUNNING => TokenState::Running,
            ABORT_REQUESTED => TokenState::AbortRequested,
            _ => TokenState::Closed,
        }
    }

    /// Ask the computation to stop. Returns `true` only for the call that
    /// actually moved the token out of `Running`.
    pub fn request_abort(&self) -> bool {
        self.inner
            .state
            .compare_exchange(RUNNING, ABORT_REQUESTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_abort_requested(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == ABORT_REQUESTED
    }

    /// Poll point for computation loops: `token.checkpoint()?`.
    pub fn checkpoint(&self) -> Result<(), Aborted> {
        if self.is_abort_requested() {
            Err(Aborted)
        } else {
            Ok(())
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.inner.stopped.lock()
    }

    /// Block until the computation thread has returned.
    pub fn wait_stopped(&self) {
        let mut stopped = self.inner.stopped.lock();
        while !*stopped {
            self.inner.stopped_cond.wait(&mut stopped);
        }
    }

    /// Like [`wait_stopped`](Self::wait_stopped) with an upper bound.
    /// Returns whether the computation stopped in time.
    pub fn wait_stopped_timeout(&self, timeout: Duration) -> bool {
        let mut stopped = self.inner.stopped.lock();
        if !*stopped {
            self.inner.stopped_cond.wait_while_for(&mut stopped, |s| !*s, timeout);
        }
        *stopped
    }

    pub(crate) fn mark_stopped(&self) {
        let mut stopped = self.inner.stopped.lock();
        *stopped = true;
        self.inner.stopped_cond.notify_all();
    }

    pub(crate) fn close(&self) {
        self.inner.state.store(CLOSED, Ordering::Release);
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
