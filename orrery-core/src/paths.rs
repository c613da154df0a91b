use std::path::PathBuf;

/// Resolve the bundled asset directory.
///
/// Fallback chain:
/// 1. `ORRERY_BUNDLE_DIR` env var (runtime override)
/// 2. `CARGO_MANIFEST_DIR/bundle` (compile-time, resolves to orrery-core/)
/// 3. `./bundle` relative to CWD
pub fn bundle_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ORRERY_BUNDLE_DIR") {
        return PathBuf::from(dir);
    }

    let compile_time = PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/bundle"));
    if compile_time.exists() {
        return compile_time;
    }

    PathBuf::from("bundle")
}

/// Where bundled data is copied to (`~/.local/share/orrery/`).
pub fn data_root() -> PathBuf {
    if let Ok(dir) = std::env::var("ORRERY_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .map(|d| d.join("orrery"))
        .unwrap_or_else(|| PathBuf::from("orrery-data"))
}

/// `~/.config/orrery/`
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("orrery"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Roots under which add-on and script folders are created. The first is
/// always present; the documents folder is added when the platform has one.
/// Neither overlaps the copied data folder, which is replaced on refresh.
pub fn external_roots() -> Vec<PathBuf> {
    let mut roots = vec![data_root().join("external")];
    if let Some(docs) = dirs::document_dir() {
        roots.push(docs.join("Orrery"));
    }
    roots
}

pub fn preferences_path() -> PathBuf {
    config_dir().join("preferences.json")
}

/// Custom engine settings, kept apart from shell preferences.
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn lifecycle_snapshot_path() -> PathBuf {
    data_root().join("lifecycle.json")
}

pub fn log_path() -> PathBuf {
    config_dir().join("orrery.log")
}
