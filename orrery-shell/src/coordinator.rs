//! Wires the core together for one process and gates user commands on
//! the lifecycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use orrery_core::config::Config;
use orrery_core::dispatch::TaskDispatchQueue;
use orrery_core::engine::Engine;
use orrery_core::lifecycle::{LifecycleSnapshot, ListenerId, ResumePlan, StateListener, StateMachine};
use orrery_core::pipeline::{LaunchConfig, Liveness, LoadPipeline, PipelineEnv, PipelineOptions, PipelineOutcome};
use orrery_core::session::{CancellableSession, EclipseSearch, SessionOutcome};
use orrery_types::{
    DispatchError, Eclipse, EngineError, LifecycleState, LoadError, SearchRange, TransitionError,
};

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("not ready ({0}); run `load` first")]
    NotReady(LifecycleState),
    #[error("loading failed: {0}")]
    Load(#[from] LoadError),
    #[error("loading was abandoned")]
    Cancelled,
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("search session ended without a result")]
    SessionLost,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Writes the lifecycle snapshot to disk on every change.
struct SnapshotWriter {
    machine: Arc<StateMachine>,
    path: PathBuf,
}

impl SnapshotWriter {
    fn persist(&self) {
        if let Err(e) = self.machine.snapshot().save(&self.path) {
            log::warn!(target: "lifecycle", "could not save snapshot {}: {}", self.path.display(), e);
        }
    }
}

impl StateListener for SnapshotWriter {
    fn on_state_changed(&self, _state: LifecycleState) {
        self.persist();
    }

    fn on_status_changed(&self, _status: &str) {
        self.persist();
    }
}

pub struct Coordinator<E: Engine> {
    machine: Arc<StateMachine>,
    queue: TaskDispatchQueue<E>,
    pipeline: LoadPipeline<E>,
    liveness: Liveness,
    writer: Arc<SnapshotWriter>,
    writer_id: ListenerId,
    previous: Option<LifecycleSnapshot>,
    step_days: f64,
}

impl<E: Engine> Coordinator<E> {
    pub fn new(
        engine: E,
        config: &Config,
        machine: Arc<StateMachine>,
        env: PipelineEnv,
        options: PipelineOptions,
        snapshot_path: &Path,
    ) -> std::io::Result<Self> {
        let previous = LifecycleSnapshot::load(snapshot_path);
        let queue = TaskDispatchQueue::spawn(engine, config.tick_interval())?;
        let pipeline = LoadPipeline::new(Arc::clone(&machine), queue.submitter(), env, options);

        let writer = Arc::new(SnapshotWriter {
            machine: Arc::clone(&machine),
            path: snapshot_path.to_path_buf(),
        });
        let writer_id = machine.register(&writer);
        writer.persist();

        Ok(Self {
            machine,
            queue,
            pipeline,
            liveness: Liveness::new(),
            writer,
            writer_id,
            previous,
            step_days: config.search_step_days(),
        })
    }

    /// How the previous process left things, if it wrote a snapshot.
    pub fn previous(&self) -> Option<&LifecycleSnapshot> {
        self.previous.as_ref()
    }

    pub fn state(&self) -> LifecycleState {
        self.machine.current()
    }

    pub fn status_line(&self) -> String {
        let snapshot = self.machine.snapshot();
        let mut line = format!("state: {}", snapshot.state);
        if !snapshot.status.is_empty() {
            line.push_str(&format!(" ({})", snapshot.status));
        }
        if let Some(failure) = snapshot.failure {
            line.push_str(&format!("; cause: {}", failure));
        }
        line
    }

    /// Run the load pipeline to completion, restarting it after a failure.
    /// Returns the launch configuration when this call did the loading.
    pub fn load(&self) -> Result<Option<LaunchConfig>, ShellError> {
        match ResumePlan::for_state(self.machine.current()) {
            ResumePlan::Ready => return Ok(None),
            ResumePlan::ShowFailure => {
                log::info!(target: "lifecycle", "restarting failed load");
                self.pipeline.restart(self.liveness.clone())?;
            }
            ResumePlan::StartPipeline => {
                self.pipeline.start(self.liveness.clone());
            }
            ResumePlan::AwaitEngine | ResumePlan::AwaitSettings => {}
        }

        match self.pipeline.join() {
            Some(PipelineOutcome::Completed { launch, directories }) => {
                for (kind, path) in &directories.failed {
                    log::warn!(target: "pipeline", "{:?} folder unavailable: {}", kind, path.display());
                }
                self.drain()?;
                self.ensure_ready()?;
                Ok(Some(launch))
            }
            Some(PipelineOutcome::Cancelled { .. }) => Err(ShellError::Cancelled),
            Some(PipelineOutcome::Failed(cause)) => Err(cause.into()),
            None => {
                self.drain()?;
                self.ensure_ready()?;
                Ok(None)
            }
        }
    }

    /// Search for eclipses seen from `object`. With `abort_after`, the
    /// search is aborted if it has not finished by then.
    pub fn search(
        &self,
        object: &str,
        range: SearchRange,
        abort_after: Option<Duration>,
    ) -> Result<SessionOutcome<Eclipse, EngineError>, ShellError> {
        self.ensure_ready()?;

        let object = object.to_string();
        let finder = self
            .queue
            .submit_with_reply(move |engine| engine.eclipse_finder(&object))?
            .recv()
            .map_err(|_| DispatchError::Closed)??;

        let mut session = CancellableSession::run(EclipseSearch::new(finder, self.step_days), range)?;
        if let Some(limit) = abort_after {
            if let Some(outcome) = session.wait_timeout(limit) {
                session.token().wait_stopped();
                session.close();
                return Ok(outcome);
            }
            log::info!(target: "session", "search exceeded {:?}, aborting", limit);
            session.abort();
        }
        session.finish().ok_or(ShellError::SessionLost)
    }

    /// Run `f` on the engine thread and wait for its result.
    pub fn with_engine<R: Send + 'static>(
        &self,
        f: impl FnOnce(&mut E) -> R + Send + 'static,
    ) -> Result<R, ShellError> {
        let reply = self.queue.submit_with_reply(f)?;
        reply.recv().map_err(|_| DispatchError::Closed.into())
    }

    fn ensure_ready(&self) -> Result<(), ShellError> {
        let state = self.machine.current();
        if ResumePlan::for_state(state).allows_interaction() {
            Ok(())
        } else {
            Err(ShellError::NotReady(state))
        }
    }

    /// Wait for every task queued so far, including the finalize step.
    fn drain(&self) -> Result<(), ShellError> {
        self.with_engine(|_| ())
    }
}

impl<E: Engine> Drop for Coordinator<E> {
    fn drop(&mut self) {
        self.liveness.revoke();
        let _ = self.pipeline.join();
        self.machine.unregister(self.writer_id);
        self.writer.persist();
    }
}
