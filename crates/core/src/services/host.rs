use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ArchFlags;

/// Invalid-address sentinel reported by hosts for corrupt or unmapped state.
pub const BADADDR: u64 = u64::MAX;

/// Returns true when `address` is the null or invalid sentinel.
pub fn is_sentinel_address(address: u64) -> bool {
    address == 0 || address == BADADDR
}

/// Contiguous address range `[start, end)` belonging to one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionChunk {
    pub start: u64,
    pub end: u64,
}

impl FunctionChunk {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, address: u64) -> bool {
        address >= self.start && address < self.end
    }
}

/// A single decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedInstruction {
    pub mnemonic: String,
    pub size: u64,
}

/// Imported symbols grouped under the module that provides them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportModule {
    pub name: String,
    pub symbols: Vec<String>,
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Binary not found at {0}")]
    MissingBinary(PathBuf),
    #[error("Unsupported architecture: {0}")]
    UnsupportedArch(String),
    #[error("Disassembler error: {0}")]
    Disassembler(String),
}

/// The loaded binary as exposed by a disassembly host.
///
/// Implementations supply function boundaries, instruction decoding,
/// import tables and bitness. The matching pipeline only talks to this
/// trait so it can run against synthetic binaries in tests.
pub trait HostBinary {
    /// Lowest mapped address of the binary.
    fn min_address(&self) -> u64;

    /// First function chunk starting at or after `address`, in address order.
    fn next_chunk(&self, address: u64) -> Option<FunctionChunk>;

    /// Decode the instruction at `address`.
    ///
    /// `None` or a zero-sized instruction means the bytes are undecodable.
    fn decode(&self, address: u64) -> Option<DecodedInstruction>;

    /// Name of the function containing `address`, if the host knows one.
    fn function_name(&self, address: u64) -> Option<String>;

    /// All import modules and the symbols imported from each.
    fn import_modules(&self) -> Vec<ImportModule>;

    /// Bitness flags of the loaded binary.
    fn arch(&self) -> ArchFlags;

    /// Progress hook, called once per function chunk during extraction.
    fn report_progress(&self, _address: u64) {}
}

/// Shared cooperative cancellation flag.
///
/// Clones observe the same flag, so a frontend can keep one handle and pass
/// another into a long-running extraction or ranking run.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag for every clone, ready for the next invocation.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Explicit analysis context: the currently loaded binary plus the
/// cancellation flag for this invocation.
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub host: &'a dyn HostBinary,
    pub cancel: &'a CancellationToken,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(host: &'a dyn HostBinary, cancel: &'a CancellationToken) -> Self {
        Self { host, cancel }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
