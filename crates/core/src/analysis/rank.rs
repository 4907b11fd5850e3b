use serde::{Deserialize, Serialize};

use crate::analysis::imports::imports_match;

/// Default display threshold; candidates at or above it are not shown.
pub const DEFAULT_DISPLAY_THRESHOLD: f64 = 5.0;

/// Annotation line emitted when a candidate's imports equal the current ones.
pub const IMPORTS_MATCH_ANNOTATION: &str = "* imports match";

/// One surviving tag of a ranking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub tag: String,
    pub distance: f64,
    pub description: String,
    pub imports: Vec<String>,
}

/// Sort ascending by distance and keep entries strictly below `threshold`.
///
/// The sort is stable, so equal distances keep their input order.
pub fn rank_candidates(
    mut candidates: Vec<RankedCandidate>,
    threshold: f64,
) -> Vec<RankedCandidate> {
    candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    candidates.retain(|c| c.distance < threshold);
    candidates
}

/// Text view of ranked candidates.
///
/// Per candidate: `name (distance)`, the import annotation when the imports
/// match `current_imports`, the description line by line, then a blank line.
pub fn render_candidates(
    candidates: &[RankedCandidate],
    current_imports: &[String],
) -> Vec<String> {
    let mut lines = Vec::new();
    for candidate in candidates {
        lines.push(format!("{} ({:.4})", candidate.tag, candidate.distance));
        if imports_match(&candidate.imports, current_imports) {
            lines.push(IMPORTS_MATCH_ANNOTATION.to_string());
        }
        lines.extend(candidate.description.lines().map(str::to_string));
        lines.push(String::new());
    }
    lines
}
