//! LoadPipeline: drives the state machine from `Unstarted` to `Finished`.
//!
//! The stages run on a background worker. The engine load and the finalize
//! step run on the engine thread through the dispatch queue. Cancellation
//! (a revoked [`Liveness`]) abandons the attempt without a failure state,
//! and a later [`LoadPipeline::start`] picks it up again from
//! `ExternalLoading`. A failed attempt stays failed until
//! [`LoadPipeline::restart`].

pub mod liveness;
pub mod settings;
pub mod stages;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::Mutex;

use orrery_types::{
    DispatchError, EngineError, LifecycleState, LoadError, PipelineStage, SettingsCatalog, StageError,
    StageStatus, TransitionError,
};

use crate::config::Config;
use crate::dispatch::TaskSubmitter;
use crate::engine::Engine;
use crate::lifecycle::StateMachine;
use crate::paths;
use crate::platform::{AssetProvider, FileSystem, PreferenceStore};

pub use liveness::Liveness;
pub use settings::resolve_settings;
pub use stages::{DirectoryReport, ExternalDir, LaunchConfig};

/// External collaborators used by the stages and the finalize step.
#[derive(Clone)]
pub struct PipelineEnv {
    /// Shell preferences, including the data-version marker.
    pub prefs: Arc<dyn PreferenceStore>,
    /// Custom engine setting overrides.
    pub settings: Arc<dyn PreferenceStore>,
    pub assets: Arc<dyn AssetProvider>,
    pub fs: Arc<dyn FileSystem>,
}

/// Where things live and what the current build ships.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Destination of the bundled data and font folders.
    pub data_root: PathBuf,
    pub legacy_root: Option<PathBuf>,
    pub data_folder: String,
    pub font_folder: String,
    pub config_file: String,
    pub data_version: String,
    pub external_roots: Vec<PathBuf>,
    pub extras_folder: String,
    pub scripts_folder: String,
    pub default_frame_rate: u32,
    pub defaults_asset: String,
    pub settings: SettingsCatalog,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self::with_roots(config, paths::data_root(), paths::external_roots())
    }

    pub fn with_roots(config: &Config, data_root: PathBuf, external_roots: Vec<PathBuf>) -> Self {
        Self {
            data_root,
            legacy_root: config.legacy_root(),
            data_folder: config.data_folder(),
            font_folder: config.font_folder(),
            config_file: config.config_file(),
            data_version: config.data_version(),
            external_roots,
            extras_folder: config.extras_folder(),
            scripts_folder: config.scripts_folder(),
            default_frame_rate: config.default_frame_rate(),
            defaults_asset: config.defaults_asset(),
            settings: SettingsCatalog::default(),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_root.join(&self.data_folder)
    }

    pub fn font_dir(&self) -> PathBuf {
        self.data_root.join(&self.font_folder)
    }

    #[cfg(test)]
    pub(crate) fn test_layout(home: &std::path::Path) -> Self {
        Self::with_roots(
            &Config::load_with_override(None),
            home.join("data"),
            vec![home.join("external")],
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// All stages ran, the engine loaded and the finalize task was queued.
    /// `Finished` is committed on the engine thread once that task runs.
    Completed {
        launch: LaunchConfig,
        directories: DirectoryReport,
    },
    /// Liveness was revoked. `after` is the last stage that completed.
    Cancelled { after: Option<PipelineStage> },
    Failed(LoadError),
}

impl PipelineOutcome {
    pub fn stage_status(&self, stage: PipelineStage) -> StageStatus {
        match self {
            PipelineOutcome::Completed { .. } => StageStatus::Succeeded,
            PipelineOutcome::Cancelled { after } => match after {
                Some(last) if stage <= *last => StageStatus::Succeeded,
                _ => StageStatus::Skipped,
            },
            PipelineOutcome::Failed(LoadError::Stage(e)) => {
                let failed = e.stage();
                if stage < failed {
                    StageStatus::Succeeded
                } else if stage == failed {
                    StageStatus::Failed
                } else {
                    StageStatus::Skipped
                }
            }
            PipelineOutcome::Failed(LoadError::Spawn(_)) => StageStatus::Skipped,
            PipelineOutcome::Failed(_) => StageStatus::Succeeded,
        }
    }
}

pub struct LoadPipeline<E: Engine> {
    machine: Arc<StateMachine>,
    submitter: TaskSubmitter<E>,
    env: PipelineEnv,
    options: Arc<PipelineOptions>,
    worker: Mutex<Option<JoinHandle<PipelineOutcome>>>,
}

impl<E: Engine> LoadPipeline<E> {
    pub fn new(
        machine: Arc<StateMachine>,
        submitter: TaskSubmitter<E>,
        env: PipelineEnv,
        options: PipelineOptions,
    ) -> Self {
        Self {
            machine,
            submitter,
            env,
            options: Arc::new(options),
            worker: Mutex::new(None),
        }
    }

    pub fn machine(&self) -> &Arc<StateMachine> {
        &self.machine
    }

    /// Begin a load attempt, or resume one that was abandoned at
    /// `ExternalLoading`. Returns `false` without doing anything if an
    /// attempt is already running or the machine is past external loading.
    pub fn start(&self, liveness: Liveness) -> bool {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            log::debug!(target: "pipeline", "start ignored: already started");
            return false;
        }
        if !self.machine.claim_attempt() {
            log::debug!(target: "pipeline", "start ignored: another load worker is running");
            return false;
        }
        match self.machine.current() {
            LifecycleState::ExternalLoading => {
                log::info!(target: "pipeline", "resuming abandoned load");
            }
            _ => {
                if let Err(e) = self.machine.try_transition(LifecycleState::ExternalLoading) {
                    self.machine.release_attempt();
                    log::debug!(target: "pipeline", "start ignored: {}", e);
                    return false;
                }
            }
        }

        let run = PipelineRun {
            machine: Arc::clone(&self.machine),
            submitter: self.submitter.clone(),
            env: self.env.clone(),
            options: Arc::clone(&self.options),
            liveness,
        };
        let spawned = thread::Builder::new()
            .name("load-pipeline".into())
            .spawn(move || run.execute());
        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                true
            }
            Err(e) => {
                self.machine.release_attempt();
                self.machine.fail(
                    LifecycleState::ExternalLoadFailed,
                    LoadError::Spawn(e.to_string()),
                );
                false
            }
        }
    }

    /// Wait for the running attempt. `None` if nothing was started since
    /// the last join, or if the worker panicked.
    pub fn join(&self) -> Option<PipelineOutcome> {
        let handle = self.worker.lock().take()?;
        match handle.join() {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                log::error!(target: "pipeline", "load worker panicked");
                None
            }
        }
    }

    /// Explicit retry after a failed attempt: reset the machine and start
    /// again.
    pub fn restart(&self, liveness: Liveness) -> Result<bool, TransitionError> {
        let _ = self.join();
        self.machine.reset()?;
        Ok(self.start(liveness))
    }
}

struct PipelineRun<E: Engine> {
    machine: Arc<StateMachine>,
    submitter: TaskSubmitter<E>,
    env: PipelineEnv,
    options: Arc<PipelineOptions>,
    liveness: Liveness,
}

/// Gives the machine back when the worker ends, including by unwinding.
struct AttemptClaim(Arc<StateMachine>);

impl Drop for AttemptClaim {
    fn drop(&mut self) {
        self.0.release_attempt();
    }
}

impl<E: Engine> PipelineRun<E> {
    fn execute(self) -> PipelineOutcome {
        let _claim = AttemptClaim(Arc::clone(&self.machine));
        let started = Instant::now();
        if !self.liveness.is_alive() {
            return self.cancelled(None);
        }

        self.enter(PipelineStage::PrepareAssets);
        if let Err(e) = stages::prepare_assets(&self.env, &self.options) {
            return self.stage_failed(e);
        }
        if !self.liveness.is_alive() {
            return self.cancelled(Some(PipelineStage::PrepareAssets));
        }

        self.enter(PipelineStage::CreateDirectories);
        let directories = stages::create_directories(&self.env, &self.options);
        if !self.liveness.is_alive() {
            return self.cancelled(Some(PipelineStage::CreateDirectories));
        }

        self.enter(PipelineStage::ParseConfig);
        let launch = match stages::parse_config(&self.env, &self.options, &directories) {
            Ok(launch) => launch,
            Err(e) => return self.stage_failed(e),
        };
        if !self.liveness.is_alive() {
            return self.cancelled(Some(PipelineStage::ParseConfig));
        }
        log::info!(target: "pipeline", "stages done in {:?}", started.elapsed());

        self.machine.transition(LifecycleState::Loading);
        self.machine.update_status("Loading engine…");
        if let Err(cause) = self.load_engine(&launch) {
            self.machine.fail(LifecycleState::LoadFailed, cause.clone());
            return PipelineOutcome::Failed(cause);
        }
        self.machine.transition(LifecycleState::LoadSucceeded);

        // Only a shut-down queue refuses the task. The machine has no edge
        // out of LoadSucceeded other than Finished, so it stays there.
        if let Err(e) = self.submit_finalize() {
            log::error!(target: "pipeline", "could not queue settings, staying at load-succeeded: {}", e);
            return PipelineOutcome::Failed(e.into());
        }
        log::info!(target: "pipeline", "engine loaded in {:?}", started.elapsed());

        PipelineOutcome::Completed {
            launch,
            directories,
        }
    }

    fn enter(&self, stage: PipelineStage) {
        log::debug!(target: "pipeline", "stage {}", stage.name());
        self.machine.update_status(stage.status_text());
    }

    fn load_engine(&self, launch: &LaunchConfig) -> Result<(), LoadError> {
        let launch = launch.clone();
        let reply = self
            .submitter
            .submit_with_reply(move |engine: &mut E| engine.load(&launch))?;
        match reply.recv() {
            Ok(result) => result.map_err(LoadError::from),
            Err(_) => Err(EngineError::Load("load task did not complete".into()).into()),
        }
    }

    /// Queue the task that applies persisted settings and then commits
    /// `Finished` on the engine thread.
    fn submit_finalize(&self) -> Result<(), DispatchError> {
        let machine = Arc::clone(&self.machine);
        let env = self.env.clone();
        let options = Arc::clone(&self.options);
        self.submitter.try_submit(move |engine: &mut E| {
            let defaults = env.assets.read_text(&options.defaults_asset).unwrap_or_else(|e| {
                log::warn!(target: "pipeline", "no setting defaults ({}): {}", options.defaults_asset, e);
                String::new()
            });
            let resolved = resolve_settings(&defaults, env.settings.as_ref(), &options.settings);
            log::debug!(target: "pipeline", "applying {} settings", resolved.len());
            for (field, value) in resolved {
                engine.apply_setting(&field, value);
            }
            machine.transition(LifecycleState::Finished);
        })
    }

    fn stage_failed(&self, error: StageError) -> PipelineOutcome {
        let cause = LoadError::from(error);
        self.machine.fail(LifecycleState::ExternalLoadFailed, cause.clone());
        PipelineOutcome::Failed(cause)
    }

    fn cancelled(&self, after: Option<PipelineStage>) -> PipelineOutcome {
        log::info!(
            target: "pipeline",
            "load abandoned after {}",
            after.map(PipelineStage::name).unwrap_or("start")
        );
        PipelineOutcome::Cancelled { after }
    }
}
