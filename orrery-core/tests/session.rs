mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::TIMEOUT;
use orrery_core::session::{
    CancellableSession, CancellationToken, Interrupt, SessionOutcome, SessionWork, TokenState,
};
use orrery_types::SessionError;

/// Simulated work: one checkpoint per millisecond, for up to `units` ms.
struct Ticker {
    units: u32,
    checks: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl Ticker {
    fn new(units: u32) -> Self {
        Self {
            units,
            checks: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SessionWork for Ticker {
    type Input = ();
    type Item = u32;
    type Error = String;

    fn compute(&mut self, _: (), token: &CancellationToken) -> Result<Vec<u32>, Interrupt<String>> {
        let mut done = Vec::new();
        for unit in 0..self.units {
            self.checks.fetch_add(1, Ordering::SeqCst);
            token.checkpoint()?;
            thread::sleep(Duration::from_millis(1));
            done.push(unit);
        }
        Ok(done)
    }

    fn release(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_abort_after_five_ms_reports_aborted_once() {
    let work = Ticker::new(60_000);
    let released = Arc::clone(&work.released);
    let deliveries = Arc::new(AtomicUsize::new(0));
    let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded();

    let counter = Arc::clone(&deliveries);
    let mut session = CancellableSession::run_with_callback(work, (), move |outcome| {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = outcome_tx.send(outcome);
    })
    .unwrap();

    thread::sleep(Duration::from_millis(5));
    let aborted_at = Instant::now();
    session.abort();

    let outcome = outcome_rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(outcome, SessionOutcome::Aborted);
    assert!(aborted_at.elapsed() < TIMEOUT);
    assert!(session.is_stopped());

    assert_eq!(session.try_close(), Ok(()));
    assert!(outcome_rx.recv_timeout(Duration::from_millis(20)).is_err());
    assert_eq!(deliveries.load(Ordering::SeqCst), 1);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn test_double_abort_matches_single_abort() {
    let work = Ticker::new(60_000);
    let mut session = CancellableSession::run(work, ()).unwrap();
    thread::sleep(Duration::from_millis(2));

    session.abort();
    session.abort();
    let token = session.token();
    assert_eq!(token.state(), TokenState::AbortRequested);

    assert_eq!(session.wait_timeout(TIMEOUT), Some(SessionOutcome::Aborted));
    assert_eq!(session.wait(), None);
    token.wait_stopped();
    session.close();
    assert_eq!(token.state(), TokenState::Closed);
}

#[test]
fn test_abort_from_another_thread() {
    let work = Ticker::new(60_000);
    let checks = Arc::clone(&work.checks);
    let session = CancellableSession::run(work, ()).unwrap();
    let token = session.token();

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        token.request_abort();
    });

    assert_eq!(session.finish(), Some(SessionOutcome::Aborted));
    canceller.join().unwrap();
    assert!(checks.load(Ordering::SeqCst) < 60_000);
}

#[test]
fn test_abort_after_completion_is_harmless() {
    let mut session = CancellableSession::run(Ticker::new(3), ()).unwrap();
    assert_eq!(session.wait_timeout(TIMEOUT), Some(SessionOutcome::Completed(vec![0, 1, 2])));
    session.token().wait_stopped();
    session.abort();
    assert_eq!(session.try_close(), Ok(()));
    session.abort();
    assert_eq!(session.try_close(), Err(SessionError::AlreadyClosed));
}

#[test]
fn test_early_close_is_a_usage_error() {
    let mut session = CancellableSession::run(Ticker::new(60_000), ()).unwrap();
    assert_eq!(session.try_close(), Err(SessionError::StillRunning));
    session.abort();
    assert_eq!(session.finish(), Some(SessionOutcome::Aborted));
}
