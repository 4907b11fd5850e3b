//! Core data model for tag matching.
//!
//! - `MnemonicHistogram`: per-function mnemonic occurrence counts
//! - `ArchFlags`: bitness flags reported by the host
//! - `FeatureSet`: everything extracted from one binary
//! - `Tag`: a named, analyst-described feature set persisted in the tag store

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Mnemonic counts for a single function.
pub type MnemonicCounts = BTreeMap<String, u32>;

/// Mapping from function name to the mnemonic counts observed in it.
///
/// Serialized transparently as `{ "func": { "mov": 5, ... }, ... }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MnemonicHistogram {
    functions: BTreeMap<String, MnemonicCounts>,
}

impl MnemonicHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `mnemonic` inside `function`.
    pub fn record(&mut self, function: &str, mnemonic: &str) {
        let counts = self.functions.entry(function.to_string()).or_default();
        *counts.entry(mnemonic.to_string()).or_insert(0) += 1;
    }

    /// Register `function` without counting anything; existing counts are kept.
    pub fn add_function(&mut self, function: &str) {
        self.functions.entry(function.to_string()).or_default();
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn get(&self, function: &str) -> Option<&MnemonicCounts> {
        self.functions.get(function)
    }

    /// Iterate functions in name order.
    pub fn functions(&self) -> impl Iterator<Item = (&str, &MnemonicCounts)> {
        self.functions.iter().map(|(name, counts)| (name.as_str(), counts))
    }

    /// All distinct mnemonics used anywhere in this histogram.
    pub fn mnemonics(&self) -> BTreeSet<&str> {
        self.functions.values().flat_map(|counts| counts.keys().map(String::as_str)).collect()
    }

    /// Total number of instructions counted across all functions.
    pub fn instruction_count(&self) -> u64 {
        self.functions.values().flat_map(|counts| counts.values()).map(|c| u64::from(*c)).sum()
    }
}

impl<N: Into<String>> FromIterator<(N, MnemonicCounts)> for MnemonicHistogram {
    fn from_iter<I: IntoIterator<Item = (N, MnemonicCounts)>>(iter: I) -> Self {
        Self { functions: iter.into_iter().map(|(name, counts)| (name.into(), counts)).collect() }
    }
}

/// Bitness flags of a binary.
///
/// The two flags are stored verbatim; they are not required to be mutually
/// exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArchFlags {
    pub is_32bit: bool,
    pub is_64bit: bool,
}

impl ArchFlags {
    pub fn new(is_32bit: bool, is_64bit: bool) -> Self {
        Self { is_32bit, is_64bit }
    }

    /// Flags for a binary of the given pointer width in bits.
    pub fn from_bitness(bits: u32) -> Self {
        Self { is_32bit: bits == 32, is_64bit: bits == 64 }
    }
}

/// Features extracted from one binary.
///
/// This is also the on-disk format of an exported feature document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub arch: ArchFlags,
    pub imports: Vec<String>,
    pub histogram: MnemonicHistogram,
}

/// A persisted, analyst-described reference binary.
///
/// Field names match the tag document format:
/// `tag`, `description`, `histogram`, `arch`, `imports`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "tag")]
    pub name: String,
    pub description: String,
    pub histogram: MnemonicHistogram,
    pub arch: ArchFlags,
    pub imports: Vec<String>,
    /// RFC 3339 timestamp of capture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<String>,
    /// SHA-256 of the binary the tag was captured from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl Tag {
    /// Build a tag from a name, an analyst description, and extracted features.
    pub fn from_features(
        name: impl Into<String>,
        description: impl Into<String>,
        features: FeatureSet,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            histogram: features.histogram,
            arch: features.arch,
            imports: features.imports,
            captured_at: None,
            sha256: None,
        }
    }

    pub fn with_captured_at(mut self, captured_at: Option<String>) -> Self {
        self.captured_at = captured_at;
        self
    }

    pub fn with_sha256(mut self, sha256: Option<String>) -> Self {
        self.sha256 = sha256;
        self
    }
}
