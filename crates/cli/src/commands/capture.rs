use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use bintag_core::services::session::CaptureOutcome;
use bintag_core::store::{load_config, OverwritePrompt, StoreLayout, TagStore};

use crate::commands::util::{
    read_description, source_sha256, with_session, FeatureInput, StdinPrompt,
};
use crate::infer_tag_name;

/// Capture the current binary (or feature document) as a new tag.
///
/// Without a `name`, binaries are tagged under their file name. An existing
/// tag is only replaced after confirmation (`assume_yes` skips the prompt);
/// declining is reported as an error so the exit status reflects it.
pub fn capture_command(
    layout: &StoreLayout,
    name: Option<String>,
    input: &FeatureInput,
    description: Option<String>,
    description_file: Option<&Path>,
    assume_yes: bool,
) -> Result<()> {
    let name = match (name, input) {
        (Some(name), _) => name,
        (None, FeatureInput::Binary { path, .. }) => infer_tag_name(path),
        (None, FeatureInput::Features(_)) => {
            bail!("--name is required when capturing from --features")
        }
    };
    let description = read_description(description, description_file)?;
    let config = load_config(layout)?;
    let store = TagStore::new(layout.clone());
    let tag_path = store.tag_path(&name).map_err(|err| anyhow!(err))?;

    let mut yes = |_: &Path| true;
    let mut stdin = StdinPrompt;
    let prompt: &mut dyn OverwritePrompt = if assume_yes { &mut yes } else { &mut stdin };

    let sha256 = source_sha256(input)?;
    let outcome = with_session(input, store, config, sha256, |session| {
        session
            .try_capture_tag(&name, &description, prompt)
            .with_context(|| format!("Failed to capture tag {name}"))
    })?;

    match outcome {
        CaptureOutcome::Written => {
            println!("Captured tag:");
            println!("  Name: {name}");
            println!("  Path: {}", tag_path.display());
        }
        CaptureOutcome::Overwritten => {
            println!("Replaced tag:");
            println!("  Name: {name}");
            println!("  Path: {}", tag_path.display());
        }
        CaptureOutcome::Declined => {
            bail!("Tag {name} already exists; kept the existing tag");
        }
    }
    Ok(())
}
