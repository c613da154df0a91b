//! Error taxonomy.
//!
//! Coordination errors (`TransitionError`, `SessionError`) indicate a bug in
//! the caller. Stage and engine errors are runtime conditions that end one
//! load attempt. Everything is `Clone` so a failure cause can be stored and
//! handed to observers that arrive late.

use std::path::PathBuf;

use thiserror::Error;

use crate::lifecycle::LifecycleState;
use crate::stage::PipelineStage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("illegal lifecycle transition {from} -> {to}")]
    Illegal {
        from: LifecycleState,
        to: LifecycleState,
    },
    #[error("cannot restart from {0}")]
    NotRestartable(LifecycleState),
    #[error("{0} is not a failure state")]
    NotAFailure(LifecycleState),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The engine thread is shutting down or gone.
    #[error("engine queue is closed")]
    Closed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("failed to copy bundled '{name}' to '{}': {reason}", .destination.display())]
    AssetCopy {
        name: String,
        destination: PathBuf,
        reason: String,
    },
    #[error("failed to store data version marker: {0}")]
    Marker(String),
    #[error("failed to read configuration: {0}")]
    Config(String),
}

impl StageError {
    pub fn stage(&self) -> PipelineStage {
        match self {
            StageError::AssetCopy { .. } | StageError::Marker(_) => PipelineStage::PrepareAssets,
            StageError::Config(_) => PipelineStage::ParseConfig,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("engine failed to load: {0}")]
    Load(String),
    #[error("no such object: {0}")]
    UnknownObject(String),
    #[error("event search failed: {0}")]
    Search(String),
}

/// Cause attached to a failed load attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("{} stage failed: {}", .0.stage(), .0)]
    Stage(#[from] StageError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("could not start load worker: {0}")]
    Spawn(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("session closed while its computation is still running")]
    StillRunning,
    #[error("session already closed")]
    AlreadyClosed,
}
