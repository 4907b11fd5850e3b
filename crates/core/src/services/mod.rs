//! Host collaborators and the session layer driving the pipeline.
//!
//! - `host`: the `HostBinary` trait, cancellation and the analysis context
//! - `backends`: concrete hosts (Capstone/goblin, synthetic)
//! - `session`: ranking and capture runs, event dispatch

pub mod backends;
pub mod host;
pub mod session;

pub use host::{
    AnalysisContext, CancellationToken, DecodedInstruction, FunctionChunk, HostBinary, HostError,
    ImportModule, BADADDR,
};
pub use session::{
    rank_features, CaptureOutcome, HostEvent, RankingReport, SessionOutcome, SkippedTag,
    TagSession,
};
