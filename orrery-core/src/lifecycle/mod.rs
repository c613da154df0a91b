//! Process-wide load/ready state machine.
//!
//! Holds the single `LifecycleState`, the current progress text and the
//! cause of the last failed attempt. Reads never wait on a transition in
//! progress; transitions are serialized and validated against
//! [`LifecycleState::can_transition_to`]. Listeners are notified on the
//! thread that committed the change, in commit order.

mod listeners;
pub mod resume;
pub mod snapshot;

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::{Mutex, ReentrantMutex};

use orrery_types::{LifecycleState, LoadError, TransitionError};

use crate::fault::coordination_fault;
use listeners::ListenerRegistry;

pub use listeners::{ListenerId, StateListener};
pub use resume::ResumePlan;
pub use snapshot::LifecycleSnapshot;

struct Details {
    status: String,
    failure: Option<LoadError>,
}

pub struct StateMachine {
    state: AtomicU8,
    /// Set while a load worker owns the machine.
    attempt: AtomicBool,
    /// Serializes transitions; also guards status text and failure cause.
    details: Mutex<Details>,
    /// Held from commit until the broadcast returns, so listeners see
    /// changes in commit order. Reentrant for callbacks that change state.
    delivery: ReentrantMutex<()>,
    listeners: ListenerRegistry,
}

static GLOBAL: OnceLock<Arc<StateMachine>> = OnceLock::new();

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Unstarted.as_u8()),
            attempt: AtomicBool::new(false),
            details: Mutex::new(Details {
                status: String::new(),
                failure: None,
            }),
            delivery: ReentrantMutex::new(()),
            listeners: ListenerRegistry::new(),
        }
    }

    /// The instance shared by the whole process.
    pub fn global() -> Arc<StateMachine> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(StateMachine::new())))
    }

    /// The last committed state.
    pub fn current(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or_default()
    }

    pub fn status(&self) -> String {
        self.details.lock().status.clone()
    }

    /// Cause of the last failed attempt, if the machine is in a failure state.
    pub fn failure(&self) -> Option<LoadError> {
        self.details.lock().failure.clone()
    }

    /// Commit `next`, or report a coordination fault if the edge is illegal.
    pub fn transition(&self, next: LifecycleState) {
        if let Err(e) = self.try_transition(next) {
            coordination_fault(&e);
        }
    }

    pub fn try_transition(&self, next: LifecycleState) -> Result<(), TransitionError> {
        let _delivery = self.delivery.lock();
        {
            let _details = self.details.lock();
            self.commit(next)?;
        }
        self.notify(next);
        Ok(())
    }

    /// Move to a failure state, recording `cause` for display.
    pub fn fail(&self, next: LifecycleState, cause: LoadError) {
        if let Err(e) = self.try_fail(next, cause) {
            coordination_fault(&e);
        }
    }

    pub fn try_fail(&self, next: LifecycleState, cause: LoadError) -> Result<(), TransitionError> {
        if !next.is_failure() {
            return Err(TransitionError::NotAFailure(next));
        }
        let _delivery = self.delivery.lock();
        {
            let mut details = self.details.lock();
            self.commit(next)?;
            log::error!(target: "lifecycle", "load attempt failed ({}): {}", next, cause);
            details.failure = Some(cause);
        }
        self.notify(next);
        Ok(())
    }

    /// Return to `Unstarted` so a new attempt can begin. Only legal before
    /// the first attempt or after a failed one.
    pub fn reset(&self) -> Result<(), TransitionError> {
        let _delivery = self.delivery.lock();
        {
            let mut details = self.details.lock();
            let current = self.current();
            if !current.is_restartable() {
                return Err(TransitionError::NotRestartable(current));
            }
            self.state.store(LifecycleState::Unstarted.as_u8(), Ordering::Release);
            details.failure = None;
            details.status.clear();
            log::info!(target: "lifecycle", "reset from {}", current);
        }
        self.notify(LifecycleState::Unstarted);
        Ok(())
    }

    pub fn update_status(&self, text: impl Into<String>) {
        let text = text.into();
        let _delivery = self.delivery.lock();
        {
            let mut details = self.details.lock();
            if details.status == text {
                return;
            }
            details.status.clone_from(&text);
        }
        log::debug!(target: "lifecycle", "status: {}", text);
        self.listeners.broadcast(|l| l.on_status_changed(&text));
    }

    /// Register a non-owning observer. Read [`current`](Self::current)
    /// afterwards to catch up on transitions that already happened.
    pub fn register<L: StateListener + 'static>(&self, listener: &Arc<L>) -> ListenerId {
        let weak: Weak<dyn StateListener> = Arc::downgrade(listener) as Weak<dyn StateListener>;
        self.listeners.register(weak)
    }

    /// After this returns the observer is never called again.
    pub fn unregister(&self, id: ListenerId) -> bool {
        self.listeners.unregister(id)
    }

    /// Whether a load worker is currently driving the machine.
    pub fn attempt_running(&self) -> bool {
        self.attempt.load(Ordering::Acquire)
    }

    /// Claim the machine for one load worker. False if another holds it.
    pub(crate) fn claim_attempt(&self) -> bool {
        self.attempt
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn release_attempt(&self) {
        self.attempt.store(false, Ordering::Release);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn snapshot(&self) -> LifecycleSnapshot {
        let details = self.details.lock();
        LifecycleSnapshot {
            state: self.current(),
            status: details.status.clone(),
            failure: details.failure.as_ref().map(|e| e.to_string()),
        }
    }

    /// Caller holds `details`.
    fn commit(&self, next: LifecycleState) -> Result<(), TransitionError> {
        let current = self.current();
        if !current.can_transition_to(next) {
            return Err(TransitionError::Illegal {
                from: current,
                to: next,
            });
        }
        self.state.store(next.as_u8(), Ordering::Release);
        log::info!(target: "lifecycle", "{} -> {}", current, next);
        Ok(())
    }

    fn notify(&self, state: LifecycleState) {
        self.listeners.broadcast(|l| l.on_state_changed(state));
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
