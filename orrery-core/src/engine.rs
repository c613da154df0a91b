//! The narrow interface the core needs from the simulation engine.
//!
//! The engine is not thread-safe. It is moved onto the engine thread when
//! the [`TaskDispatchQueue`](crate::dispatch::TaskDispatchQueue) is spawned
//! and only ever touched from tasks running there.

use std::time::Duration;

use orrery_types::{EngineError, SettingValue};

use crate::pipeline::LaunchConfig;
use crate::session::EclipseFinder;

pub trait Engine: Send + 'static {
    /// Load engine data for the given launch configuration.
    fn load(&mut self, launch: &LaunchConfig) -> Result<(), EngineError>;

    /// Periodic engine work (one frame). Never runs concurrently with a task.
    fn tick(&mut self, _elapsed: Duration) {}

    /// Apply one persisted setting to an engine field.
    fn apply_setting(&mut self, field: &str, value: SettingValue);

    /// Create a finder for eclipses involving `object`. The finder is handed
    /// to a background session and must not borrow engine state.
    fn eclipse_finder(&mut self, object: &str) -> Result<Box<dyn EclipseFinder>, EngineError> {
        Err(EngineError::UnknownObject(object.to_string()))
    }
}
