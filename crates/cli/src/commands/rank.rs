use anyhow::{Context, Result};
use bintag_core::store::{load_config, StoreLayout, TagStore};

use crate::commands::util::{with_session, FeatureInput};

/// Rank the current binary (or feature document) against every stored tag.
pub fn rank_command(
    layout: &StoreLayout,
    input: &FeatureInput,
    threshold: Option<f64>,
    json: bool,
) -> Result<()> {
    let mut config = load_config(layout)?;
    if let Some(threshold) = threshold {
        config.display_threshold = threshold;
    }
    let store = TagStore::new(layout.clone());

    let report = with_session(input, store, config, None, |session| Ok(session.run_ranking()))?;

    if json {
        let serialized = serde_json::to_string_pretty(&report)
            .context("Failed to serialize ranking report to JSON")?;
        println!("{}", serialized);
        return Ok(());
    }

    if report.candidates.is_empty() {
        println!(
            "No matching tags ({} evaluated, {} skipped).",
            report.evaluated,
            report.skipped.len()
        );
        return Ok(());
    }

    for line in report.render_lines() {
        println!("{line}");
    }
    Ok(())
}
