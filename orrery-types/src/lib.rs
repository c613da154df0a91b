//! # orrery-types
//!
//! Shared type definitions for the Orrery viewer shell.
//! This crate holds the plain data that flows between the coordination core
//! (`orrery-core`) and the shell binary: lifecycle states, pipeline stages,
//! the error taxonomy, settings values and event-search results.

pub mod error;
pub mod lifecycle;
pub mod search;
pub mod settings;
pub mod stage;

pub use error::{
    DispatchError, EngineError, LoadError, SessionError, StageError, TransitionError,
};
pub use lifecycle::LifecycleState;
pub use search::{Eclipse, EclipseKind, SearchRange};
pub use settings::{SettingValue, SettingsCatalog};
pub use stage::{PipelineStage, StageStatus};
