//! Non-owning listener registry.
//!
//! Observers are held through `Weak` so registration never extends their
//! lifetime. Each registration owns a slot guarded by a reentrant lock: a
//! broadcast holds the slot lock while calling into the listener, so
//! `unregister` on another thread waits for an in-flight callback and no
//! callback can start once `unregister` has returned. The same thread may
//! unregister from inside its own callback.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};

use orrery_types::LifecycleState;

/// Observer of lifecycle changes.
///
/// Callbacks run on the thread that performed the change. Re-post to a UI
/// thread if needed.
pub trait StateListener: Send + Sync {
    fn on_state_changed(&self, state: LifecycleState);

    /// Stage-progress text for display.
    fn on_status_changed(&self, _status: &str) {}
}

/// Stable identity of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn get(self) -> u64 {
        self.0
    }
}

struct Slot {
    listener: ReentrantMutex<RefCell<Option<Weak<dyn StateListener>>>>,
}

pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    slots: Mutex<HashMap<ListenerId, Arc<Slot>>>,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn register(&self, listener: Weak<dyn StateListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let slot = Arc::new(Slot {
            listener: ReentrantMutex::new(RefCell::new(Some(listener))),
        });
        self.slots.lock().insert(id, slot);
        id
    }

    /// Returns false if `id` was not registered.
    pub(crate) fn unregister(&self, id: ListenerId) -> bool {
        let Some(slot) = self.slots.lock().remove(&id) else {
            return false;
        };
        // Blocks until a callback running on another thread returns.
        let guard = slot.listener.lock();
        guard.borrow_mut().take();
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Calls `f` for every live listener registered when the broadcast
    /// started, in registration order.
    pub(crate) fn broadcast(&self, mut f: impl FnMut(&dyn StateListener)) {
        let mut snapshot: Vec<(ListenerId, Arc<Slot>)> = self
            .slots
            .lock()
            .iter()
            .map(|(id, slot)| (*id, Arc::clone(slot)))
            .collect();
        snapshot.sort_by_key(|(id, _)| *id);

        let mut dead = Vec::new();
        for (id, slot) in snapshot {
            let guard = slot.listener.lock();
            let strong = {
                let cell = guard.borrow();
                match cell.as_ref() {
                    Some(weak) => match weak.upgrade() {
                        Some(strong) => Some(strong),
                        None => {
                            dead.push(id);
                            None
                        }
                    },
                    None => None,
                }
            };
            if let Some(listener) = strong {
                f(listener.as_ref());
            }
        }

        if !dead.is_empty() {
            let mut slots = self.slots.lock();
            for id in dead {
                slots.remove(&id);
            }
            log::debug!(target: "lifecycle", "pruned dropped listeners, {} remain", slots.len());
        }
    }
}
