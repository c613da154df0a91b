use std::io;
use std::path::{Path, PathBuf};

/// Bundled, read-only data shipped with the application.
pub trait AssetProvider: Send + Sync {
    /// Copy the bundled file or folder `name` into `destination`, producing
    /// `destination/name`.
    fn copy(&self, name: &str, destination: &Path) -> io::Result<()>;

    fn read_text(&self, name: &str) -> io::Result<String>;
}

/// Assets served from a directory on disk.
pub struct BundleDir {
    root: PathBuf,
}

impl BundleDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetProvider for BundleDir {
    fn copy(&self, name: &str, destination: &Path) -> io::Result<()> {
        let source = self.root.join(name);
        let target = destination.join(name);
        if source.is_dir() {
            copy_dir_recursive(&source, &target)
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&source, &target).map(|_| ())
        }
    }

    fn read_text(&self, name: &str) -> io::Result<String> {
        std::fs::read_to_string(self.root.join(name))
    }
}

fn copy_dir_recursive(source: &Path, target: &Path) -> io::Result<()> {
    std::fs::create_dir_all(target)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let dest = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&path, &dest)?;
        } else {
            std::fs::copy(&path, &dest)?;
        }
    }
    Ok(())
}
