//! CancellableSession: long-running computations with cooperative abort.
//!
//! A session runs one [`SessionWork`] on its own thread. The owner may
//! [`abort`](SessionHandle::abort) at any time; the work polls the
//! [`CancellationToken`] and returns early. The outcome is delivered once,
//! after the computation has stopped, and [`close`](SessionHandle::close)
//! then releases the work's resources.

pub mod eclipse;
pub mod token;

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use orrery_types::SessionError;

use crate::fault::coordination_fault;

pub use eclipse::{EclipseFinder, EclipseSearch};
pub use token::{Aborted, CancellationToken, TokenState};

/// How a computation ended early.
#[derive(Debug, Clone, PartialEq)]
pub enum Interrupt<E> {
    Aborted,
    Failed(E),
}

impl<E> From<Aborted> for Interrupt<E> {
    fn from(_: Aborted) -> Self {
        Interrupt::Aborted
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome<T, E> {
    /// Finished normally. May be empty.
    Completed(Vec<T>),
    Aborted,
    Failed(E),
}

impl<T, E> SessionOutcome<T, E> {
    pub fn is_aborted(&self) -> bool {
        matches!(self, SessionOutcome::Aborted)
    }
}

impl<T, E> From<Result<Vec<T>, Interrupt<E>>> for SessionOutcome<T, E> {
    fn from(result: Result<Vec<T>, Interrupt<E>>) -> Self {
        match result {
            Ok(items) => SessionOutcome::Completed(items),
            Err(Interrupt::Aborted) => SessionOutcome::Aborted,
            Err(Interrupt::Failed(e)) => SessionOutcome::Failed(e),
        }
    }
}

/// A computation that can be run as a session.
pub trait SessionWork: Send + 'static {
    type Input: Send + 'static;
    type Item: Send + 'static;
    type Error: Send + 'static;

    /// Run to completion, checking `token` at least once per unit of work.
    fn compute(
        &mut self,
        input: Self::Input,
        token: &CancellationToken,
    ) -> Result<Vec<Self::Item>, Interrupt<Self::Error>>;

    /// Free resources. Called once, from `close`, after `compute` returned.
    fn release(&mut self) {}
}

pub type Outcome<W> = SessionOutcome<<W as SessionWork>::Item, <W as SessionWork>::Error>;

pub struct CancellableSession;

impl CancellableSession {
    /// Start `work` on a background thread. The outcome is read with
    /// [`SessionHandle::wait`].
    pub fn run<W: SessionWork>(work: W, input: W::Input) -> std::io::Result<SessionHandle<W>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut handle = Self::spawn(work, input, move |outcome| {
            let _ = tx.send(outcome);
        })?;
        handle.outcome = Some(rx);
        Ok(handle)
    }

    /// Start `work` and hand its outcome to `callback` on the session
    /// thread. The callback must not close the session.
    pub fn run_with_callback<W, F>(work: W, input: W::Input, callback: F) -> std::io::Result<SessionHandle<W>>
    where
        W: SessionWork,
        F: FnOnce(Outcome<W>) + Send + 'static,
    {
        Self::spawn(work, input, callback)
    }

    fn spawn<W, F>(mut work: W, input: W::Input, deliver: F) -> std::io::Result<SessionHandle<W>>
    where
        W: SessionWork,
        F: FnOnce(Outcome<W>) + Send + 'static,
    {
        let token = CancellationToken::new();
        let thread_token = token.clone();
        let thread = thread::Builder::new().name("session".into()).spawn(move || {
            let stop = StopGuard(&thread_token);
            let outcome = Outcome::<W>::from(work.compute(input, &thread_token));
            drop(stop);
            if outcome.is_aborted() {
                log::debug!(target: "session", "computation aborted");
            }
            deliver(outcome);
            work
        })?;

        Ok(SessionHandle {
            token,
            outcome: None,
            thread: Some(thread),
            closed: false,
        })
    }
}

/// Marks the token stopped when the computation returns or unwinds.
struct StopGuard<'a>(&'a CancellationToken);

impl Drop for StopGuard<'_> {
    fn drop(&mut self) {
        self.0.mark_stopped();
    }
}

pub struct SessionHandle<W: SessionWork> {
    token: CancellationToken,
    outcome: Option<Receiver<Outcome<W>>>,
    thread: Option<JoinHandle<W>>,
    closed: bool,
}

impl<W: SessionWork> SessionHandle<W> {
    /// A clone of the token, e.g. for a cancel button on another thread.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request an abort. Never blocks; repeated calls have no further effect.
    pub fn abort(&self) {
        if self.token.request_abort() {
            log::debug!(target: "session", "abort requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_stopped()
    }

    /// Block for the outcome. Returns it at most once; `None` afterwards,
    /// for callback sessions, or if the computation panicked.
    pub fn wait(&mut self) -> Option<Outcome<W>> {
        self.outcome.take()?.recv().ok()
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`, keeping the
    /// outcome available for a later call.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<Outcome<W>> {
        let rx = self.outcome.take()?;
        match rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => {
                self.outcome = Some(rx);
                None
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Release the session's resources. Only valid once the computation
    /// has stopped, and only once.
    pub fn try_close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::AlreadyClosed);
        }
        if !self.token.is_stopped() {
            return Err(SessionError::StillRunning);
        }
        if let Some(thread) = self.thread.take() {
            match thread.join() {
                Ok(mut work) => work.release(),
                Err(_) => log::error!(target: "session", "computation panicked; resources dropped"),
            }
        }
        self.token.close();
        self.closed = true;
        Ok(())
    }

    pub fn close(&mut self) {
        if let Err(e) = self.try_close() {
            coordination_fault(&e);
        }
    }

    /// Await the outcome, then close unconditionally.
    pub fn finish(mut self) -> Option<Outcome<W>> {
        let outcome = self.wait();
        self.token.wait_stopped();
        self.close();
        outcome
    }
}

impl<W: SessionWork> Drop for SessionHandle<W> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.abort();
        self.token.wait_stopped();
        let _ = self.try_close();
    }
}
