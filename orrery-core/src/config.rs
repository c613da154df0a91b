use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    data: DataConfig,
    #[serde(default)]
    engine: EngineConfig,
    #[serde(default)]
    search: SearchConfig,
    #[serde(default)]
    settings: SettingsConfig,
}

#[derive(Deserialize, Default)]
struct DataConfig {
    version: Option<String>,
    data_folder: Option<String>,
    font_folder: Option<String>,
    config_file: Option<String>,
    extras_folder: Option<String>,
    scripts_folder: Option<String>,
    legacy_root: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
struct EngineConfig {
    tick_interval_ms: Option<u64>,
    frame_rate: Option<u32>,
}

#[derive(Deserialize, Default)]
struct SearchConfig {
    step_days: Option<f64>,
}

#[derive(Deserialize, Default)]
struct SettingsConfig {
    defaults_asset: Option<String>,
}

pub struct Config {
    data: DataConfig,
    engine: EngineConfig,
    search: SearchConfig,
    settings: SettingsConfig,
}

impl Config {
    /// Embedded defaults merged with the user's config file, if any.
    pub fn load() -> Self {
        Self::load_with_override(user_config_path().as_deref())
    }

    pub fn load_with_override(user_path: Option<&Path>) -> Self {
        let mut base: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
            log::error!(target: "config", "embedded config.toml is invalid: {}", e);
            ConfigFile::default()
        });

        if let Some(path) = user_path {
            if path.exists() {
                match std::fs::read_to_string(path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => {
                            merge_data(&mut base.data, user.data);
                            merge_engine(&mut base.engine, user.engine);
                            if user.search.step_days.is_some() {
                                base.search.step_days = user.search.step_days;
                            }
                            if user.settings.defaults_asset.is_some() {
                                base.settings.defaults_asset = user.settings.defaults_asset;
                            }
                        }
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        Config {
            data: base.data,
            engine: base.engine,
            search: base.search,
            settings: base.settings,
        }
    }

    /// Marker for the bundled data shipped with this build.
    pub fn data_version(&self) -> String {
        self.data.version.clone().unwrap_or_else(|| "1".to_string())
    }

    pub fn data_folder(&self) -> String {
        non_empty(&self.data.data_folder).unwrap_or_else(|| "resources".to_string())
    }

    pub fn font_folder(&self) -> String {
        non_empty(&self.data.font_folder).unwrap_or_else(|| "fonts".to_string())
    }

    /// Engine configuration file name inside the data folder.
    pub fn config_file(&self) -> String {
        non_empty(&self.data.config_file).unwrap_or_else(|| "engine.cfg".to_string())
    }

    pub fn extras_folder(&self) -> String {
        non_empty(&self.data.extras_folder).unwrap_or_else(|| "resources/extras".to_string())
    }

    pub fn scripts_folder(&self) -> String {
        non_empty(&self.data.scripts_folder).unwrap_or_else(|| "resources/scripts".to_string())
    }

    /// Root used by older releases; stale data there is removed on refresh.
    pub fn legacy_root(&self) -> Option<PathBuf> {
        self.data.legacy_root.clone()
    }

    /// Engine tick pacing (clamped to 1..=1000 ms).
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.engine.tick_interval_ms.unwrap_or(16).clamp(1, 1000))
    }

    /// Frame rate used when no preference is stored (clamped to 1..=240).
    pub fn default_frame_rate(&self) -> u32 {
        self.engine.frame_rate.unwrap_or(60).clamp(1, 240)
    }

    /// Width of one unit of event-search work, in days.
    pub fn search_step_days(&self) -> f64 {
        match self.search.step_days {
            Some(days) if days.is_finite() => days.clamp(1.0 / 1440.0, 365.0),
            _ => 1.0,
        }
    }

    /// Bundled JSON object holding the default value of each setting.
    pub fn defaults_asset(&self) -> String {
        non_empty(&self.settings.defaults_asset).unwrap_or_else(|| "defaults.json".to_string())
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.trim().is_empty()).cloned()
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("orrery").join("config.toml"))
}

fn merge_data(base: &mut DataConfig, user: DataConfig) {
    if user.version.is_some() {
        base.version = user.version;
    }
    if user.data_folder.is_some() {
        base.data_folder = user.data_folder;
    }
    if user.font_folder.is_some() {
        base.font_folder = user.font_folder;
    }
    if user.config_file.is_some() {
        base.config_file = user.config_file;
    }
    if user.extras_folder.is_some() {
        base.extras_folder = user.extras_folder;
    }
    if user.scripts_folder.is_some() {
        base.scripts_folder = user.scripts_folder;
    }
    if user.legacy_root.is_some() {
        base.legacy_root = user.legacy_root;
    }
}

fn merge_engine(base: &mut EngineConfig, user: EngineConfig) {
    if user.tick_interval_ms.is_some() {
        base.tick_interval_ms = user.tick_interval_ms;
    }
    if user.frame_rate.is_some() {
        base.frame_rate = user.frame_rate;
    }
}
