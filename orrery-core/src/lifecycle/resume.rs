use orrery_types::LifecycleState;

/// What a freshly attached shell must do for the state it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePlan {
    /// Start the load pipeline. From `ExternalLoading` this resumes an
    /// abandoned attempt by running the stages again.
    StartPipeline,
    /// The engine is loading; wait for `LoadSucceeded` or `LoadFailed`.
    AwaitEngine,
    /// Settings are being applied on the engine thread; wait for `Finished`.
    /// A process whose queue shut down before the finalize task ran stays
    /// here; only a new process can continue.
    AwaitSettings,
    /// Interaction may begin.
    Ready,
    /// The last attempt failed; show the cause and offer a restart.
    ShowFailure,
}

impl ResumePlan {
    pub fn for_state(state: LifecycleState) -> Self {
        match state {
            LifecycleState::Unstarted | LifecycleState::ExternalLoading => ResumePlan::StartPipeline,
            LifecycleState::Loading => ResumePlan::AwaitEngine,
            LifecycleState::LoadSucceeded => ResumePlan::AwaitSettings,
            LifecycleState::Finished => ResumePlan::Ready,
            LifecycleState::LoadFailed | LifecycleState::ExternalLoadFailed => ResumePlan::ShowFailure,
        }
    }

    pub fn allows_interaction(self) -> bool {
        self == ResumePlan::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_finished_allows_interaction() {
        for state in LifecycleState::ALL {
            let plan = ResumePlan::for_state(state);
            assert_eq!(plan.allows_interaction(), state == LifecycleState::Finished);
        }
    }

    #[test]
    fn test_failures_show_failure() {
        assert_eq!(
            ResumePlan::for_state(LifecycleState::LoadFailed),
            ResumePlan::ShowFailure
        );
        assert_eq!(
            ResumePlan::for_state(LifecycleState::ExternalLoadFailed),
            ResumePlan::ShowFailure
        );
    }
}
