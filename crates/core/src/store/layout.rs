use std::env;
use std::path::{Path, PathBuf};

/// Environment variable overriding the storage base directory.
pub const BINTAG_HOME_ENV: &str = "BINTAG_HOME";

/// Name of the base directory created under the user's home.
pub const BASE_DIR_NAME: &str = ".bintag";

/// Logical layout of the tag store on disk.
///
/// This is derived from a chosen base path. It does *not* perform any IO itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    /// Base directory (`~/.bintag` by default).
    pub base_dir: PathBuf,
    /// Directory holding one document per tag.
    pub tags_dir: PathBuf,
    /// Optional configuration file (JSON).
    pub config_path: PathBuf,
}

impl StoreLayout {
    /// Compute the layout for a store rooted at `base`.
    ///
    /// This does *not* touch the filesystem.
    pub fn new(base: impl AsRef<Path>) -> Self {
        let base_dir = base.as_ref().to_path_buf();
        let tags_dir = base_dir.join("tags");
        let config_path = base_dir.join("config.json");
        Self { base_dir, tags_dir, config_path }
    }

    /// Layout at the default location (see [`default_base_dir`]).
    pub fn discover() -> Self {
        Self::new(default_base_dir())
    }

    /// Path of the document for tag `name` (no validation).
    pub fn tag_path(&self, name: &str) -> PathBuf {
        self.tags_dir.join(name)
    }
}

/// Resolve the storage base directory.
///
/// `$BINTAG_HOME` wins; otherwise `~/.bintag`; if no home directory can be
/// determined, `.bintag` under the system temporary directory.
pub fn default_base_dir() -> PathBuf {
    if let Some(dir) = env::var_os(BINTAG_HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(BASE_DIR_NAME),
        None => env::temp_dir().join(BASE_DIR_NAME),
    }
}
