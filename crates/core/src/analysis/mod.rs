//! Tag-matching pipeline.
//!
//! - `extract`: mnemonic histogram and import extraction from a host binary
//! - `filter`: cheap compatibility pre-check before distance computation
//! - `distance`: two-stage histogram distance (per-function pair, then
//!   bipartite aggregation)
//! - `imports`: multiset import comparison used to annotate results
//! - `rank`: ordering, thresholding and text rendering of candidates

pub mod distance;
pub mod extract;
pub mod filter;
pub mod imports;
pub mod rank;

pub use distance::histogram_distance;
pub use extract::{extract_features, extract_histogram, extract_imports};
pub use filter::{should_skip, CompatibilityPolicy, SkipReason};
pub use imports::imports_match;
pub use rank::{rank_candidates, render_candidates, RankedCandidate};
