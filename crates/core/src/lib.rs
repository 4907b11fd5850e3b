//! bintag-core
//!
//! Core library for matching a freshly loaded binary against a corpus of
//! analyst-tagged reference binaries.
//!
//! This crate defines the feature model (per-function mnemonic histograms,
//! import sets, bitness flags), the host abstraction that supplies them, the
//! on-disk tag store, and the matching pipeline: compatibility filtering,
//! histogram distance, import comparison, and ranking.
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from multiple frontends (CLI, disassembler plugins, etc.).

pub mod model;
pub mod analysis;
pub mod store;
pub mod services;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
