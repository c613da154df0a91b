use std::io;
use std::path::Path;

/// Filesystem capability used by the load pipeline.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    /// Create `path` and any missing parents.
    fn create_directory(&self, path: &Path) -> io::Result<()>;
    fn read_text(&self, path: &Path) -> io::Result<String>;
    fn write_text(&self, path: &Path, contents: &str) -> io::Result<()>;
    /// Remove a file or folder tree. Missing paths are not an error.
    fn remove_all(&self, path: &Path) -> io::Result<()>;
    /// Names of the immediate sub-directories of `path`.
    fn list_dirs(&self, path: &Path) -> io::Result<Vec<String>>;
}

pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_directory(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn read_text(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_text(&self, path: &Path, contents: &str) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        let result = if path.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        match result {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn list_dirs(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(StdFileSystem.remove_all(&dir.path().join("nothing")).is_ok());
    }

    #[test]
    fn test_list_dirs_skips_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("en")).unwrap();
        std::fs::create_dir(dir.path().join("ja")).unwrap();
        std::fs::write(dir.path().join("README"), "").unwrap();

        let mut names = StdFileSystem.list_dirs(dir.path()).unwrap();
        names.sort();
        assert_eq!(names, vec!["en".to_string(), "ja".to_string()]);
    }
}
