use serde::{Deserialize, Serialize};

/// Overall startup progress of the application.
///
/// Moves forward along
/// `Unstarted → ExternalLoading → Loading → LoadSucceeded → Finished`;
/// the two failure states end an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LifecycleState {
    #[default]
    Unstarted,
    /// Shell-side preparation: assets, directories, configuration.
    ExternalLoading,
    /// The engine is loading its own data.
    Loading,
    LoadSucceeded,
    LoadFailed,
    ExternalLoadFailed,
    /// Settings applied; the shell is ready for interaction.
    Finished,
}

impl LifecycleState {
    pub const ALL: [LifecycleState; 7] = [
        LifecycleState::Unstarted,
        LifecycleState::ExternalLoading,
        LifecycleState::Loading,
        LifecycleState::LoadSucceeded,
        LifecycleState::LoadFailed,
        LifecycleState::ExternalLoadFailed,
        LifecycleState::Finished,
    ];

    /// The allowed-transition table. Anything not listed here is a
    /// coordination bug.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Unstarted, ExternalLoading)
                | (ExternalLoading, Loading)
                | (ExternalLoading, ExternalLoadFailed)
                | (Loading, LoadSucceeded)
                | (Loading, LoadFailed)
                | (LoadSucceeded, Finished)
        )
    }

    pub fn is_failure(self) -> bool {
        matches!(self, LifecycleState::LoadFailed | LifecycleState::ExternalLoadFailed)
    }

    /// States from which an explicit restart may begin a new attempt.
    pub fn is_restartable(self) -> bool {
        self == LifecycleState::Unstarted || self.is_failure()
    }

    pub fn as_u8(self) -> u8 {
        match self {
            LifecycleState::Unstarted => 0,
            LifecycleState::ExternalLoading => 1,
            LifecycleState::Loading => 2,
            LifecycleState::LoadSucceeded => 3,
            LifecycleState::LoadFailed => 4,
            LifecycleState::ExternalLoadFailed => 5,
            LifecycleState::Finished => 6,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Unstarted => "unstarted",
            LifecycleState::ExternalLoading => "external-loading",
            LifecycleState::Loading => "loading",
            LifecycleState::LoadSucceeded => "load-succeeded",
            LifecycleState::LoadFailed => "load-failed",
            LifecycleState::ExternalLoadFailed => "external-load-failed",
            LifecycleState::Finished => "finished",
        };
        f.write_str(name)
    }
}
