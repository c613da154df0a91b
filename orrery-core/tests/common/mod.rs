#![allow(dead_code)]
//! Recording fakes shared by orrery-core integration tests.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tempfile::TempDir;

use orrery_core::config::Config;
use orrery_core::dispatch::TaskDispatchQueue;
use orrery_core::engine::Engine;
use orrery_core::lifecycle::{StateListener, StateMachine};
use orrery_core::pipeline::{LaunchConfig, LoadPipeline, PipelineEnv, PipelineOptions};
use orrery_core::platform::{
    AssetProvider, FileSystem, MemoryPreferenceStore, PreferenceStore, StdFileSystem,
};
use orrery_types::{EngineError, LifecycleState, SettingValue};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// In-memory preferences that remember which keys were read.
pub struct RecordingPrefs {
    inner: MemoryPreferenceStore,
    reads: Mutex<Vec<String>>,
}

impl RecordingPrefs {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            inner: MemoryPreferenceStore::with(entries),
            reads: Mutex::new(Vec::new()),
        }
    }

    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().clone()
    }

    /// The stored data-version marker, without recording a read.
    pub fn get_marker(&self) -> Option<String> {
        self.inner.get("data_version")
    }

    pub fn was_read(&self, key: &str) -> bool {
        self.reads.lock().iter().any(|k| k == key)
    }
}

impl PreferenceStore for RecordingPrefs {
    fn get(&self, key: &str) -> Option<String> {
        self.reads.lock().push(key.to_string());
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.inner.remove(key)
    }
}

type CopyHook = Box<dyn Fn(&str) + Send + Sync>;

/// Asset provider that creates empty folders and records every copy.
pub struct RecordingAssets {
    copies: Mutex<Vec<String>>,
    defaults: String,
    fail: Option<String>,
    on_copy: Mutex<Option<CopyHook>>,
}

impl RecordingAssets {
    pub fn new() -> Self {
        Self {
            copies: Mutex::new(Vec::new()),
            defaults: r#"{"showStars": 1, "showOrbits": 0, "timeZone": 1, "faintestVisible": 7.0}"#.into(),
            fail: None,
            on_copy: Mutex::new(None),
        }
    }

    /// Copying `name` fails with `NotFound`.
    pub fn failing(name: &str) -> Self {
        Self {
            fail: Some(name.to_string()),
            ..Self::new()
        }
    }

    /// Run `hook` after each successful copy.
    pub fn on_copy(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.on_copy.lock() = Some(Box::new(hook));
    }

    pub fn copies(&self) -> Vec<String> {
        self.copies.lock().clone()
    }
}

impl AssetProvider for RecordingAssets {
    fn copy(&self, name: &str, destination: &Path) -> io::Result<()> {
        if self.fail.as_deref() == Some(name) {
            return Err(io::Error::new(io::ErrorKind::NotFound, format!("{} not bundled", name)));
        }
        std::fs::create_dir_all(destination.join(name).join("locale").join("en"))?;
        self.copies.lock().push(name.to_string());
        if let Some(hook) = self.on_copy.lock().as_ref() {
            hook(name);
        }
        Ok(())
    }

    fn read_text(&self, name: &str) -> io::Result<String> {
        if name == "defaults.json" {
            Ok(self.defaults.clone())
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, name.to_string()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsOp {
    Exists(PathBuf),
    CreateDirectory(PathBuf),
    RemoveAll(PathBuf),
    ListDirs(PathBuf),
}

/// Real filesystem calls, recorded. Paths listed in `deny` cannot be created.
pub struct RecordingFs {
    ops: Mutex<Vec<FsOp>>,
    deny: Mutex<Vec<PathBuf>>,
}

impl RecordingFs {
    pub fn new() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
            deny: Mutex::new(Vec::new()),
        }
    }

    pub fn deny(&self, path: PathBuf) {
        self.deny.lock().push(path);
    }

    pub fn ops(&self) -> Vec<FsOp> {
        self.ops.lock().clone()
    }

    pub fn created(&self) -> Vec<PathBuf> {
        self.ops
            .lock()
            .iter()
            .filter_map(|op| match op {
                FsOp::CreateDirectory(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }
}

impl FileSystem for RecordingFs {
    fn exists(&self, path: &Path) -> bool {
        self.ops.lock().push(FsOp::Exists(path.to_path_buf()));
        StdFileSystem.exists(path)
    }

    fn create_directory(&self, path: &Path) -> io::Result<()> {
        self.ops.lock().push(FsOp::CreateDirectory(path.to_path_buf()));
        if self.deny.lock().iter().any(|p| p == path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        StdFileSystem.create_directory(path)
    }

    fn read_text(&self, path: &Path) -> io::Result<String> {
        StdFileSystem.read_text(path)
    }

    fn write_text(&self, path: &Path, contents: &str) -> io::Result<()> {
        StdFileSystem.write_text(path, contents)
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        self.ops.lock().push(FsOp::RemoveAll(path.to_path_buf()));
        StdFileSystem.remove_all(path)
    }

    fn list_dirs(&self, path: &Path) -> io::Result<Vec<String>> {
        self.ops.lock().push(FsOp::ListDirs(path.to_path_buf()));
        StdFileSystem.list_dirs(path)
    }
}

/// Stand-in engine that records what it was asked to do.
#[derive(Default)]
pub struct RecordingEngine {
    pub loaded: Option<LaunchConfig>,
    pub applied: Vec<(String, SettingValue)>,
    pub fail_load: bool,
    pub log: Vec<u64>,
}

impl Engine for RecordingEngine {
    fn load(&mut self, launch: &LaunchConfig) -> Result<(), EngineError> {
        if self.fail_load {
            return Err(EngineError::Load("star catalog missing".into()));
        }
        self.loaded = Some(launch.clone());
        Ok(())
    }

    fn apply_setting(&mut self, field: &str, value: SettingValue) {
        self.applied.push((field.to_string(), value));
    }
}

/// Records every state it is told about.
#[derive(Default)]
pub struct StateLog {
    pub states: Mutex<Vec<LifecycleState>>,
}

impl StateListener for StateLog {
    fn on_state_changed(&self, state: LifecycleState) {
        self.states.lock().push(state);
    }
}

impl StateLog {
    pub fn states(&self) -> Vec<LifecycleState> {
        self.states.lock().clone()
    }
}

/// A pipeline wired to recording fakes inside a temp directory.
pub struct Harness {
    pub home: TempDir,
    pub prefs: Arc<RecordingPrefs>,
    pub assets: Arc<RecordingAssets>,
    pub fs: Arc<RecordingFs>,
    pub machine: Arc<StateMachine>,
    pub queue: TaskDispatchQueue<RecordingEngine>,
    pub pipeline: LoadPipeline<RecordingEngine>,
    pub options: PipelineOptions,
}

impl Harness {
    pub fn new(prefs: RecordingPrefs, assets: RecordingAssets) -> Self {
        Self::with_engine(RecordingEngine::default(), prefs, assets)
    }

    pub fn with_engine(engine: RecordingEngine, prefs: RecordingPrefs, assets: RecordingAssets) -> Self {
        let home = tempfile::tempdir().unwrap();
        let options = PipelineOptions::with_roots(
            &Config::load_with_override(None),
            home.path().join("data"),
            vec![home.path().join("external"), home.path().join("documents")],
        );
        let prefs = Arc::new(prefs);
        let assets = Arc::new(assets);
        let fs = Arc::new(RecordingFs::new());
        let machine = Arc::new(StateMachine::new());
        let queue = TaskDispatchQueue::spawn(engine, Duration::from_millis(1)).unwrap();

        let env = PipelineEnv {
            prefs: Arc::clone(&prefs) as Arc<dyn PreferenceStore>,
            settings: Arc::new(MemoryPreferenceStore::with(&[("timeZone", "3")])),
            assets: Arc::clone(&assets) as Arc<dyn AssetProvider>,
            fs: Arc::clone(&fs) as Arc<dyn FileSystem>,
        };
        let pipeline = LoadPipeline::new(Arc::clone(&machine), queue.submitter(), env, options.clone());

        Self {
            home,
            prefs,
            assets,
            fs,
            machine,
            queue,
            pipeline,
            options,
        }
    }

    /// Wait until every task queued so far has run.
    pub fn drain(&self) {
        self.queue
            .submit_with_reply(|_| ())
            .unwrap()
            .recv_timeout(TIMEOUT)
            .unwrap();
    }

    pub fn engine<R: Send + 'static>(&self, f: impl FnOnce(&mut RecordingEngine) -> R + Send + 'static) -> R {
        self.queue.submit_with_reply(f).unwrap().recv_timeout(TIMEOUT).unwrap()
    }
}
