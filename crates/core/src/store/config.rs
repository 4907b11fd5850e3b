use serde::{Deserialize, Serialize};

use crate::analysis::filter::{CompatibilityPolicy, DEFAULT_MAX_FUNCTION_COUNT_RATIO};
use crate::analysis::rank::DEFAULT_DISPLAY_THRESHOLD;

/// Serializable matching configuration.
///
/// This lives (optionally) at `config.json` in the store base directory.
/// Every field falls back to its default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BintagConfig {
    /// Candidates at or above this distance are not displayed.
    #[serde(default = "default_display_threshold")]
    pub display_threshold: f64,
    /// Relative function-count difference above which a tag is skipped.
    #[serde(default = "default_max_function_count_ratio")]
    pub max_function_count_ratio: f64,
    /// Skip tags whose 32/64-bit flags differ from the current binary.
    #[serde(default = "default_match_architecture")]
    pub match_architecture: bool,
}

fn default_display_threshold() -> f64 {
    DEFAULT_DISPLAY_THRESHOLD
}

fn default_max_function_count_ratio() -> f64 {
    DEFAULT_MAX_FUNCTION_COUNT_RATIO
}

fn default_match_architecture() -> bool {
    true
}

impl Default for BintagConfig {
    fn default() -> Self {
        Self {
            display_threshold: default_display_threshold(),
            max_function_count_ratio: default_max_function_count_ratio(),
            match_architecture: default_match_architecture(),
        }
    }
}

impl BintagConfig {
    pub fn compatibility_policy(&self) -> CompatibilityPolicy {
        CompatibilityPolicy {
            max_function_count_ratio: self.max_function_count_ratio,
            match_architecture: self.match_architecture,
        }
    }
}
