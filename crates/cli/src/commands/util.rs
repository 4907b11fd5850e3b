use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use bintag_core::model::FeatureSet;
use bintag_core::services::backends::CapstoneHost;
use bintag_core::services::session::TagSession;
use bintag_core::store::{BintagConfig, OverwritePrompt, TagStore};

use crate::sha256_file;

/// Where the features of the "current binary" come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureInput {
    /// Disassemble a binary on disk.
    Binary { path: PathBuf, arch: Option<String> },
    /// Read a previously exported feature document.
    Features(PathBuf),
}

impl FeatureInput {
    /// Build from the mutually exclusive `--binary`/`--features` flags.
    pub fn from_args(
        binary: Option<PathBuf>,
        arch: Option<String>,
        features: Option<PathBuf>,
    ) -> Result<Self> {
        match (binary, features) {
            (Some(path), None) => Ok(Self::Binary { path, arch }),
            (None, Some(path)) => {
                if arch.is_some() {
                    bail!("--arch only applies to --binary");
                }
                Ok(Self::Features(path))
            }
            (Some(_), Some(_)) => Err(anyhow!("Pass either --binary or --features, not both")),
            (None, None) => Err(anyhow!("One of --binary or --features is required")),
        }
    }
}

/// Open `path` with the Capstone host.
pub fn open_host(path: &Path, arch: Option<&str>) -> Result<CapstoneHost> {
    if !path.is_file() {
        bail!("Binary file does not exist: {}", path.display());
    }
    CapstoneHost::open(path, arch).with_context(|| format!("Failed to open {}", path.display()))
}

/// Read an exported feature document.
pub fn load_features_file(path: &Path) -> Result<FeatureSet> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("Failed to read feature document {}", path.display()))?;
    serde_json::from_str(&body)
        .with_context(|| format!("Failed to parse feature document {}", path.display()))
}

/// SHA-256 of the binary behind `input`; feature documents have none.
pub fn source_sha256(input: &FeatureInput) -> Result<Option<String>> {
    match input {
        FeatureInput::Binary { path, .. } => {
            if !path.is_file() {
                bail!("Binary file does not exist: {}", path.display());
            }
            sha256_file(path).map(Some)
        }
        FeatureInput::Features(_) => Ok(None),
    }
}

/// Build a session for `input` and hand it to `f`.
///
/// `sha256` is recorded in tags captured through the session.
pub fn with_session<T>(
    input: &FeatureInput,
    store: TagStore,
    config: BintagConfig,
    sha256: Option<String>,
    f: impl FnOnce(&TagSession<'_>) -> Result<T>,
) -> Result<T> {
    match input {
        FeatureInput::Binary { path, arch } => {
            let host = open_host(path, arch.as_deref())?;
            let session = TagSession::with_host(&host, store, config).with_source_sha256(sha256);
            f(&session)
        }
        FeatureInput::Features(path) => {
            let features = load_features_file(path)?;
            f(&TagSession::with_features(features, store, config).with_source_sha256(sha256))
        }
    }
}

/// Tag description from `--description` or `--description-file`.
pub fn read_description(inline: Option<String>, file: Option<&Path>) -> Result<String> {
    match (inline, file) {
        (Some(_), Some(_)) => Err(anyhow!("Pass either --description or --description-file")),
        (Some(text), None) => Ok(text),
        (None, Some(path)) => fs::read_to_string(path)
            .map(|text| text.trim_end_matches(['\r', '\n']).to_string())
            .with_context(|| format!("Failed to read description file {}", path.display())),
        (None, None) => Ok(String::new()),
    }
}

/// Interactive y/N overwrite confirmation on stdin.
///
/// Anything but `y`/`yes` (including end of input) declines.
pub struct StdinPrompt;

impl OverwritePrompt for StdinPrompt {
    fn confirm_overwrite(&mut self, path: &Path) -> bool {
        eprint!("Tag file {} already exists. Overwrite? [y/N] ", path.display());
        let _ = io::stderr().flush();
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(_) => false,
        }
    }
}

/// Accepts `y` and `yes` in any case, ignoring surrounding whitespace.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Helper to print whether a directory exists.
pub fn print_dir_status(label: &str, path: &Path) {
    let exists = path.is_dir();
    println!("- {label}: {} ({})", if exists { "OK" } else { "MISSING" }, path.display());
}
