//! External collaborators: preferences, bundled assets, filesystem.

pub mod assets;
pub mod fs;
pub mod prefs;

pub use assets::{AssetProvider, BundleDir};
pub use fs::{FileSystem, StdFileSystem};
pub use prefs::{JsonPreferenceStore, MemoryPreferenceStore, PredefinedKey, PreferenceStore};
