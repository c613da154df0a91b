//! The three load stages. Each takes the collaborators explicitly so it can
//! be exercised on its own.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use orrery_types::StageError;

use super::{PipelineEnv, PipelineOptions};
use crate::platform::PredefinedKey;

/// Everything the engine needs to load, resolved from preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfig {
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
    pub font_dir: PathBuf,
    pub addon_paths: Vec<PathBuf>,
    pub script_paths: Vec<PathBuf>,
    pub frame_rate: u32,
    pub language: String,
    pub multisample: bool,
    pub high_dpi: bool,
    /// Locale codes shipped with the data, sorted.
    pub locales: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExternalDir {
    Extras,
    Scripts,
}

/// Result of creating the external folders. Individual failures are
/// recorded here and never fail the stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryReport {
    pub available: Vec<(ExternalDir, PathBuf)>,
    pub failed: Vec<(ExternalDir, PathBuf)>,
}

impl DirectoryReport {
    pub fn paths(&self, kind: ExternalDir) -> Vec<PathBuf> {
        self.available
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

/// Refresh the bundled data when the stored version marker differs from
/// ours. Returns whether a copy happened.
pub fn prepare_assets(env: &PipelineEnv, options: &PipelineOptions) -> Result<bool, StageError> {
    let key = PredefinedKey::DataVersion.as_str();
    let stored = env.prefs.get(key);
    if stored.as_deref() == Some(options.data_version.as_str()) {
        log::debug!(target: "pipeline", "bundled data {} is up to date", options.data_version);
        return Ok(false);
    }
    log::info!(
        target: "pipeline",
        "refreshing bundled data ({} -> {})",
        stored.as_deref().unwrap_or("none"),
        options.data_version
    );

    let mut stale = vec![options.data_dir(), options.font_dir()];
    if let Some(legacy) = &options.legacy_root {
        stale.push(legacy.join(&options.data_folder));
        stale.push(legacy.join(&options.font_folder));
    }
    for path in &stale {
        if let Err(e) = env.fs.remove_all(path) {
            log::warn!(target: "pipeline", "could not remove old data {}: {}", path.display(), e);
        }
    }

    for name in [&options.data_folder, &options.font_folder] {
        env.assets
            .copy(name, &options.data_root)
            .map_err(|e| StageError::AssetCopy {
                name: name.clone(),
                destination: options.data_root.clone(),
                reason: e.to_string(),
            })?;
    }

    env.prefs
        .set(key, &options.data_version)
        .map_err(|e| StageError::Marker(e.to_string()))?;
    Ok(true)
}

/// Create the extras and scripts folders under every external root.
pub fn create_directories(env: &PipelineEnv, options: &PipelineOptions) -> DirectoryReport {
    let mut report = DirectoryReport::default();
    for root in &options.external_roots {
        for (kind, folder) in [
            (ExternalDir::Extras, &options.extras_folder),
            (ExternalDir::Scripts, &options.scripts_folder),
        ] {
            let path = root.join(folder);
            let result = if env.fs.exists(&path) {
                Ok(())
            } else {
                env.fs.create_directory(&path)
            };
            match result {
                Ok(()) => report.available.push((kind, path)),
                Err(e) => {
                    log::warn!(target: "pipeline", "could not create {}: {}", path.display(), e);
                    report.failed.push((kind, path));
                }
            }
        }
    }
    report
}

/// Resolve the launch configuration. Missing or malformed preferences fall
/// back to defaults; only a missing data directory fails the stage.
pub fn parse_config(
    env: &PipelineEnv,
    options: &PipelineOptions,
    directories: &DirectoryReport,
) -> Result<LaunchConfig, StageError> {
    let prefs = env.prefs.as_ref();
    let text = |key: PredefinedKey| prefs.get(key.as_str()).filter(|v| !v.trim().is_empty());

    let default_data_dir = options.data_dir();
    let data_dir = match text(PredefinedKey::DataDirPath).map(PathBuf::from) {
        Some(custom) if env.fs.exists(&custom) => custom,
        Some(custom) => {
            log::warn!(
                target: "pipeline",
                "custom data directory {} is missing, using {}",
                custom.display(),
                default_data_dir.display()
            );
            default_data_dir.clone()
        }
        None => default_data_dir.clone(),
    };
    if !env.fs.exists(&data_dir) {
        return Err(StageError::Config(format!(
            "data directory {} does not exist",
            data_dir.display()
        )));
    }

    let config_file = text(PredefinedKey::ConfigFilePath)
        .map(PathBuf::from)
        .unwrap_or_else(|| default_data_dir.join(&options.config_file));

    let frame_rate = match text(PredefinedKey::FrameRateOption) {
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(rate) if rate > 0 => rate,
            _ => {
                log::warn!(target: "pipeline", "ignoring frame rate option '{}'", raw);
                options.default_frame_rate
            }
        },
        None => options.default_frame_rate,
    };

    let language = text(PredefinedKey::Language).unwrap_or_else(|| "en".to_string());
    let multisample = prefs.get(PredefinedKey::Multisample.as_str()).as_deref() == Some("true");
    let high_dpi = prefs.get(PredefinedKey::FullDpi.as_str()).as_deref() != Some("false");

    Ok(LaunchConfig {
        locales: list_locales(env, &data_dir),
        data_dir,
        config_file,
        font_dir: options.font_dir(),
        addon_paths: directories.paths(ExternalDir::Extras),
        script_paths: directories.paths(ExternalDir::Scripts),
        frame_rate,
        language,
        multisample,
        high_dpi,
    })
}

fn list_locales(env: &PipelineEnv, data_dir: &Path) -> Vec<String> {
    let locale_dir = data_dir.join("locale");
    match env.fs.list_dirs(&locale_dir) {
        Ok(mut codes) => {
            codes.sort();
            codes
        }
        Err(e) => {
            log::debug!(target: "pipeline", "no locales under {}: {}", locale_dir.display(), e);
            Vec::new()
        }
    }
}
