use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use bintag_core::analysis::extract::extract_features;
use bintag_core::services::host::{AnalysisContext, CancellationToken};

use crate::commands::util::open_host;

/// Extract the features of `binary` and write them as a JSON document.
pub fn export_command(binary: &Path, arch: Option<&str>, out: &Path) -> Result<()> {
    let host = open_host(binary, arch)?;
    let cancel = CancellationToken::new();
    let features = extract_features(&AnalysisContext::new(&host, &cancel));

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output dir: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&features)?;
    fs::write(out, json)
        .with_context(|| format!("Failed to write feature document: {}", out.display()))?;

    println!("Exported features:");
    println!("  Binary: {}", binary.display());
    println!("  Functions: {}", features.histogram.function_count());
    println!("  Imports: {}", features.imports.len());
    println!("  Output: {}", out.display());
    Ok(())
}
