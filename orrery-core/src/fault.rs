//! Coordination faults: misuse of the core by its caller.
//!
//! These are bugs, not runtime conditions. Debug builds stop immediately;
//! release builds log and carry on without touching the guarded state.

use std::fmt::Display;

#[track_caller]
pub(crate) fn coordination_fault(err: &dyn Display) {
    if cfg!(debug_assertions) {
        panic!("coordination fault: {}", err);
    }
    log::error!(target: "lifecycle", "coordination fault ignored: {}", err);
}
