use serde::{Deserialize, Serialize};

use crate::model::{ArchFlags, MnemonicHistogram, Tag};

/// Default ceiling for the relative function-count difference.
pub const DEFAULT_MAX_FUNCTION_COUNT_RATIO: f64 = 0.3;

/// Knobs for the compatibility pre-check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityPolicy {
    /// Skip when `|a - b| / (a + b)` of the function counts exceeds this.
    pub max_function_count_ratio: f64,
    /// Skip candidates whose bitness flags differ from the current binary.
    pub match_architecture: bool,
}

impl Default for CompatibilityPolicy {
    fn default() -> Self {
        Self {
            max_function_count_ratio: DEFAULT_MAX_FUNCTION_COUNT_RATIO,
            match_architecture: true,
        }
    }
}

/// Why a candidate tag was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SkipReason {
    ArchitectureMismatch { current: ArchFlags, candidate: ArchFlags },
    FunctionCountDisparity { current: usize, candidate: usize, ratio: f64 },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ArchitectureMismatch { current, candidate } => write!(
                f,
                "architecture mismatch (current 32/64: {}/{}, tag: {}/{})",
                current.is_32bit, current.is_64bit, candidate.is_32bit, candidate.is_64bit
            ),
            SkipReason::FunctionCountDisparity { current, candidate, ratio } => write!(
                f,
                "function count disparity ({current} vs {candidate}, ratio {ratio:.3})"
            ),
        }
    }
}

/// Relative difference `|a - b| / (a + b)`; zero when the counts are equal.
pub fn function_count_ratio(a: usize, b: usize) -> f64 {
    if a == b {
        return 0.0;
    }
    let (a, b) = (a as f64, b as f64);
    (a - b).abs() / (a + b)
}

/// First rule that rules `candidate` out, if any.
pub fn skip_reason(
    current: &MnemonicHistogram,
    current_arch: ArchFlags,
    candidate: &Tag,
    policy: &CompatibilityPolicy,
) -> Option<SkipReason> {
    if policy.match_architecture && current_arch != candidate.arch {
        return Some(SkipReason::ArchitectureMismatch {
            current: current_arch,
            candidate: candidate.arch,
        });
    }

    let current_count = current.function_count();
    let candidate_count = candidate.histogram.function_count();
    let ratio = function_count_ratio(current_count, candidate_count);
    if ratio > policy.max_function_count_ratio {
        return Some(SkipReason::FunctionCountDisparity {
            current: current_count,
            candidate: candidate_count,
            ratio,
        });
    }

    None
}

/// Cheap check run before the distance computation.
pub fn should_skip(
    current: &MnemonicHistogram,
    current_arch: ArchFlags,
    candidate: &Tag,
    policy: &CompatibilityPolicy,
) -> bool {
    skip_reason(current, current_arch, candidate, policy).is_some()
}
