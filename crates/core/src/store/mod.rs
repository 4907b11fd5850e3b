//! Flat-file tag store.
//!
//! Tags live as one JSON document per file directly inside
//! `<base>/tags/`, the file name being the tag name. This module defines:
//! - `StoreLayout`: computed paths for the base directory, tags and config.
//! - `BintagConfig`: optional matching configuration stored next to the tags.
//! - `TagStore`: reading, writing and deleting tag documents.
//!
//! Reading is forgiving: unreadable or malformed documents are logged and
//! skipped so one broken file never aborts a ranking run.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::model::Tag;

pub mod config;
pub mod layout;
pub mod util;

pub use config::BintagConfig;
pub use layout::{default_base_dir, StoreLayout, BASE_DIR_NAME, BINTAG_HOME_ENV};
pub use util::{load_config, save_config};

/// Error type for tag store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid tag document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid tag name {0:?}")]
    InvalidTagName(String),

    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("File at {0} is not a regular file")]
    NotARegularFile(PathBuf),

    #[error("Tag {0:?} not found")]
    TagNotFound(String),
}

/// Convenience result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io { path: path.to_path_buf(), source }
}

/// Asks the user whether an existing tag may be replaced.
pub trait OverwritePrompt {
    fn confirm_overwrite(&mut self, path: &Path) -> bool;
}

impl<F: FnMut(&Path) -> bool> OverwritePrompt for F {
    fn confirm_overwrite(&mut self, path: &Path) -> bool {
        self(path)
    }
}

/// Result of writing a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No tag of that name existed.
    Written,
    /// An existing tag was replaced after confirmation.
    Overwritten,
    /// The user declined to replace the existing tag; nothing changed.
    Declined,
}

/// Tag names double as file names and must stay inside the tags directory.
pub fn validate_tag_name(name: &str) -> StoreResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || name.trim().is_empty();
    if invalid {
        return Err(StoreError::InvalidTagName(name.to_string()));
    }
    Ok(())
}

/// Parse a tag document strictly; any missing or mistyped field fails.
pub fn parse_tag(body: &str) -> StoreResult<Tag> {
    Ok(serde_json::from_str(body)?)
}

/// Load every usable tag found directly inside `dir`.
///
/// Non-regular entries are ignored, malformed documents are logged and
/// skipped, and tags with an empty histogram are discarded. A missing
/// directory yields an empty list. Entries are visited in file-name order.
pub fn load_tags_from_dir(dir: &Path) -> Vec<Tag> {
    if !dir.is_dir() {
        warn!("the tag directory {} does not exist", dir.display());
        return Vec::new();
    }
    info!("reading tags from {}", dir.display());

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("could not read tag directory {}: {err}", dir.display());
            return Vec::new();
        }
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut tags = Vec::new();
    for path in paths {
        info!("loading tag {}", path.display());
        let parsed = fs::read_to_string(&path)
            .map_err(io_error(&path))
            .and_then(|body| parse_tag(&body));
        match parsed {
            Ok(tag) if tag.histogram.is_empty() => {
                info!("ignoring tag {} with an empty histogram", path.display());
            }
            Ok(tag) => tags.push(tag),
            Err(err) => warn!("could not load tag {}: {err}", path.display()),
        }
    }
    tags
}

/// Handle on the tag store described by a [`StoreLayout`].
#[derive(Debug, Clone)]
pub struct TagStore {
    layout: StoreLayout,
}

impl TagStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// Store rooted at `base`.
    pub fn at(base: impl AsRef<Path>) -> Self {
        Self::new(StoreLayout::new(base))
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Validated path of the document for tag `name`.
    pub fn tag_path(&self, name: &str) -> StoreResult<PathBuf> {
        validate_tag_name(name)?;
        Ok(self.layout.tag_path(name))
    }

    /// All usable tags (see [`load_tags_from_dir`]).
    pub fn load_tags(&self) -> Vec<Tag> {
        load_tags_from_dir(&self.layout.tags_dir)
    }

    /// Load a single tag by name.
    pub fn load_tag(&self, name: &str) -> StoreResult<Tag> {
        let path = self.tag_path(name)?;
        if !path.is_file() {
            return Err(StoreError::TagNotFound(name.to_string()));
        }
        let body = fs::read_to_string(&path).map_err(io_error(&path))?;
        parse_tag(&body)
    }

    /// Sorted names of the regular files in the tags directory.
    pub fn list_tags(&self) -> StoreResult<Vec<String>> {
        let dir = &self.layout.tags_dir;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_error(dir))? {
            let entry = entry.map_err(io_error(dir))?;
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Create the base and tags directories if missing.
    pub fn ensure_dirs(&self) -> StoreResult<()> {
        for dir in [&self.layout.base_dir, &self.layout.tags_dir] {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(io_error(dir))?;
            }
            if !dir.is_dir() {
                return Err(StoreError::NotADirectory(dir.clone()));
            }
        }
        Ok(())
    }

    /// Persist `tag` under its name.
    ///
    /// An existing tag is only replaced when `prompt` agrees; the old file is
    /// removed before the new one is written.
    pub fn write_tag(
        &self,
        tag: &Tag,
        prompt: &mut dyn OverwritePrompt,
    ) -> StoreResult<WriteOutcome> {
        let path = self.tag_path(&tag.name)?;
        self.ensure_dirs()?;

        let mut outcome = WriteOutcome::Written;
        if path.is_file() {
            if !prompt.confirm_overwrite(&path) {
                info!("keeping existing tag at {}", path.display());
                return Ok(WriteOutcome::Declined);
            }
            fs::remove_file(&path).map_err(io_error(&path))?;
            outcome = WriteOutcome::Overwritten;
        } else if path.exists() {
            return Err(StoreError::NotARegularFile(path));
        }

        let mut body = serde_json::to_string(tag)?;
        body.push('\n');
        fs::write(&path, body).map_err(io_error(&path))?;
        info!("wrote tag {} to {}", tag.name, path.display());
        Ok(outcome)
    }

    /// Remove the document for tag `name`.
    pub fn delete_tag(&self, name: &str) -> StoreResult<()> {
        let path = self.tag_path(name)?;
        if !path.exists() {
            return Err(StoreError::TagNotFound(name.to_string()));
        }
        if !path.is_file() {
            return Err(StoreError::NotARegularFile(path));
        }
        fs::remove_file(&path).map_err(io_error(&path))?;
        info!("deleted tag {name}");
        Ok(())
    }
}
