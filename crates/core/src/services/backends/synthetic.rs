use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use crate::model::{ArchFlags, MnemonicHistogram};
use crate::services::host::{
    CancellationToken, DecodedInstruction, FunctionChunk, HostBinary, ImportModule,
};

/// Base address of the first synthetic function.
const SYNTHETIC_BASE: u64 = 0x1000;
/// Gap left between consecutive synthetic functions.
const FUNCTION_GAP: u64 = 0x10;

#[derive(Debug, Clone)]
struct SyntheticFunction {
    name: String,
    chunk: FunctionChunk,
}

/// In-memory binary for driving the pipeline without a disassembler.
///
/// Functions are laid out one after another from `0x1000`; every
/// instruction occupies the number of bytes it was declared with.
#[derive(Debug)]
pub struct SyntheticBinary {
    arch: ArchFlags,
    functions: Vec<SyntheticFunction>,
    instructions: BTreeMap<u64, DecodedInstruction>,
    imports: Vec<ImportModule>,
    next_address: u64,
    decode_calls: Cell<usize>,
    progress: RefCell<Vec<u64>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl SyntheticBinary {
    pub fn new(arch: ArchFlags) -> Self {
        Self {
            arch,
            functions: Vec::new(),
            instructions: BTreeMap::new(),
            imports: Vec::new(),
            next_address: SYNTHETIC_BASE,
            decode_calls: Cell::new(0),
            progress: RefCell::new(Vec::new()),
            cancel_after: None,
        }
    }

    /// Add a function made of one-byte instructions.
    pub fn with_function(self, name: &str, mnemonics: &[&str]) -> Self {
        let sized: Vec<(&str, u64)> = mnemonics.iter().map(|m| (*m, 1)).collect();
        self.with_sized_function(name, &sized)
    }

    /// Add a function whose instructions have explicit sizes.
    pub fn with_sized_function(self, name: &str, instructions: &[(&str, u64)]) -> Self {
        self.push_function(name, instructions, 0)
    }

    /// Add a function whose instruction stream is followed by `garbage`
    /// undecodable bytes before the chunk ends.
    pub fn with_truncated_function(self, name: &str, mnemonics: &[&str], garbage: u64) -> Self {
        let sized: Vec<(&str, u64)> = mnemonics.iter().map(|m| (*m, 1)).collect();
        self.push_function(name, &sized, garbage)
    }

    /// Add a bare chunk with arbitrary bounds and no decodable instructions.
    pub fn with_raw_chunk(mut self, name: &str, start: u64, end: u64) -> Self {
        let chunk = FunctionChunk::new(start, end);
        self.functions.push(SyntheticFunction { name: name.to_string(), chunk });
        self.next_address = self.next_address.max(end.saturating_add(FUNCTION_GAP));
        self
    }

    pub fn with_import_module(mut self, module: &str, symbols: &[&str]) -> Self {
        self.imports.push(ImportModule {
            name: module.to_string(),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    /// Cancel `token` once `chunks` function chunks have been reported.
    pub fn cancel_after_chunks(mut self, chunks: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((chunks, token));
        self
    }

    /// Build a binary whose extracted histogram equals `histogram`.
    pub fn from_histogram(arch: ArchFlags, histogram: &MnemonicHistogram) -> Self {
        let mut binary = Self::new(arch);
        for (name, counts) in histogram.functions() {
            let mut stream: Vec<(&str, u64)> = Vec::new();
            for (mnemonic, count) in counts {
                for _ in 0..*count {
                    stream.push((mnemonic.as_str(), 1));
                }
            }
            binary = binary.push_function(name, &stream, 0);
        }
        binary
    }

    /// Number of `decode` calls served so far.
    pub fn decode_calls(&self) -> usize {
        self.decode_calls.get()
    }

    /// Addresses passed to `report_progress`, in call order.
    pub fn progress(&self) -> Vec<u64> {
        self.progress.borrow().clone()
    }

    fn push_function(mut self, name: &str, instructions: &[(&str, u64)], garbage: u64) -> Self {
        let start = self.next_address;
        let mut address = start;
        for (mnemonic, size) in instructions {
            self.instructions.insert(
                address,
                DecodedInstruction { mnemonic: mnemonic.to_string(), size: *size },
            );
            address += size;
        }
        let end = address + garbage;
        self.functions.push(SyntheticFunction {
            name: name.to_string(),
            chunk: FunctionChunk::new(start, end.max(start + 1)),
        });
        self.next_address = end.max(start + 1) + FUNCTION_GAP;
        self
    }
}

impl HostBinary for SyntheticBinary {
    fn min_address(&self) -> u64 {
        self.functions.iter().map(|f| f.chunk.start).min().unwrap_or(SYNTHETIC_BASE)
    }

    fn next_chunk(&self, address: u64) -> Option<FunctionChunk> {
        self.functions
            .iter()
            .map(|f| f.chunk)
            .filter(|chunk| chunk.start >= address)
            .min_by_key(|chunk| chunk.start)
    }

    fn decode(&self, address: u64) -> Option<DecodedInstruction> {
        self.decode_calls.set(self.decode_calls.get() + 1);
        self.instructions.get(&address).cloned()
    }

    fn function_name(&self, address: u64) -> Option<String> {
        self.functions.iter().find(|f| f.chunk.contains(address)).map(|f| f.name.clone())
    }

    fn import_modules(&self) -> Vec<ImportModule> {
        self.imports.clone()
    }

    fn arch(&self) -> ArchFlags {
        self.arch
    }

    fn report_progress(&self, address: u64) {
        let mut progress = self.progress.borrow_mut();
        progress.push(address);
        if let Some((chunks, token)) = &self.cancel_after {
            if progress.len() >= *chunks {
                token.cancel();
            }
        }
    }
}
