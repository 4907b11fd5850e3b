use tracing::{debug, info, trace, warn};

use crate::model::{FeatureSet, MnemonicHistogram};
use crate::services::host::{is_sentinel_address, AnalysisContext, FunctionChunk, HostBinary};

/// Name used for functions the host cannot name.
pub fn default_function_name(address: u64) -> String {
    format!("sub_{address:X}")
}

/// Linearly decode `chunk` and return the mnemonics in address order.
///
/// Decoding stops at the end of the chunk or at the first undecodable
/// (missing or zero-length) instruction.
pub fn chunk_mnemonics(host: &dyn HostBinary, chunk: FunctionChunk) -> Vec<String> {
    let mut mnemonics = Vec::new();
    let mut address = chunk.start;
    while address < chunk.end {
        let Some(insn) = host.decode(address) else {
            trace!("undecodable instruction at 0x{address:X}");
            break;
        };
        if insn.size == 0 {
            trace!("zero-length instruction at 0x{address:X}");
            break;
        }
        if !insn.mnemonic.is_empty() {
            mnemonics.push(insn.mnemonic);
        }
        match address.checked_add(insn.size) {
            Some(next) => address = next,
            None => break,
        }
    }
    mnemonics
}

/// Build the per-function mnemonic histogram of the loaded binary.
///
/// Chunks are visited in address order from the binary's lowest address.
/// The cancellation flag is polled once per chunk; on cancellation the
/// histogram accumulated so far is returned. A chunk with a null/invalid
/// bound, or one that does not advance, ends enumeration. Every visited
/// function gets an entry, even when none of its instructions decode.
pub fn extract_histogram(ctx: &AnalysisContext<'_>) -> MnemonicHistogram {
    let host = ctx.host;
    let mut histogram = MnemonicHistogram::new();
    let mut cursor = host.min_address();
    let mut chunks = 0usize;

    while let Some(chunk) = host.next_chunk(cursor) {
        if ctx.is_cancelled() {
            info!("mnemonic extraction cancelled after {chunks} chunks");
            break;
        }
        if is_sentinel_address(chunk.start) || is_sentinel_address(chunk.end) {
            warn!(
                "function chunk 0x{:X}-0x{:X} has an invalid bound; stopping enumeration",
                chunk.start, chunk.end
            );
            break;
        }
        if chunk.end <= chunk.start {
            warn!(
                "function chunk 0x{:X}-0x{:X} is empty; stopping enumeration",
                chunk.start, chunk.end
            );
            break;
        }

        host.report_progress(chunk.start);
        let name =
            host.function_name(chunk.start).unwrap_or_else(|| default_function_name(chunk.start));
        histogram.add_function(&name);
        for mnemonic in chunk_mnemonics(host, chunk) {
            histogram.record(&name, &mnemonic);
        }

        chunks += 1;
        cursor = chunk.end;
    }

    debug!("extracted {} functions from {chunks} chunks", histogram.function_count());
    histogram
}

/// Flat list of imported symbol names; module grouping is discarded.
pub fn extract_imports(host: &dyn HostBinary) -> Vec<String> {
    host.import_modules().into_iter().flat_map(|module| module.symbols).collect()
}

/// Histogram, imports and bitness of the loaded binary.
pub fn extract_features(ctx: &AnalysisContext<'_>) -> FeatureSet {
    let histogram = extract_histogram(ctx);
    FeatureSet { arch: ctx.host.arch(), imports: extract_imports(ctx.host), histogram }
}
