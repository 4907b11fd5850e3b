use anyhow::{anyhow, Context, Result};
use bintag_core::model::ArchFlags;
use bintag_core::store::{StoreLayout, TagStore};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct TagSummary {
    pub name: String,
    /// `None` when the document cannot be parsed.
    pub functions: Option<usize>,
    pub arch: Option<ArchFlags>,
    pub description: Option<String>,
    pub captured_at: Option<String>,
}

/// Summaries of every document in the tags directory.
pub fn collect_tag_summaries(store: &TagStore) -> Result<Vec<TagSummary>> {
    let names = store.list_tags().context("Failed to list tags")?;
    let mut summaries = Vec::with_capacity(names.len());
    for name in names {
        let summary = match store.load_tag(&name) {
            Ok(tag) => TagSummary {
                functions: Some(tag.histogram.function_count()),
                arch: Some(tag.arch),
                description: Some(tag.description),
                captured_at: tag.captured_at,
                name,
            },
            Err(err) => {
                warn!("could not load tag {name}: {err}");
                TagSummary {
                    name,
                    functions: None,
                    arch: None,
                    description: None,
                    captured_at: None,
                }
            }
        };
        summaries.push(summary);
    }
    Ok(summaries)
}

/// List all tags in the store.
pub fn list_tags_command(layout: &StoreLayout, json: bool) -> Result<()> {
    let store = TagStore::new(layout.clone());
    let summaries = collect_tag_summaries(&store)?;

    if json {
        let serialized = serde_json::to_string_pretty(&summaries)
            .context("Failed to serialize tags to JSON")?;
        println!("{}", serialized);
        return Ok(());
    }

    println!("Tags ({}):", summaries.len());
    if summaries.is_empty() {
        println!("  (none)");
        return Ok(());
    }

    for summary in summaries {
        match (summary.functions, summary.description) {
            (Some(functions), Some(desc)) => {
                let first_line = desc.lines().next().unwrap_or("");
                if first_line.is_empty() {
                    println!("  - {} [{} functions]", summary.name, functions);
                } else {
                    println!("  - {} [{} functions] - {}", summary.name, functions, first_line);
                }
            }
            _ => println!("  - {} [unreadable]", summary.name),
        }
    }

    Ok(())
}

/// Show a single tag.
pub fn show_tag_command(layout: &StoreLayout, name: &str, json: bool) -> Result<()> {
    let store = TagStore::new(layout.clone());
    let tag = store.load_tag(name).map_err(|err| anyhow!(err))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tag)?);
        return Ok(());
    }

    println!("Tag: {}", tag.name);
    println!("Arch: 32-bit={} 64-bit={}", tag.arch.is_32bit, tag.arch.is_64bit);
    println!("Functions: {}", tag.histogram.function_count());
    println!("Instructions: {}", tag.histogram.instruction_count());
    println!("Imports: {}", tag.imports.len());
    if let Some(captured_at) = &tag.captured_at {
        println!("Captured at: {captured_at}");
    }
    if let Some(sha256) = &tag.sha256 {
        println!("SHA-256: {sha256}");
    }
    if !tag.description.is_empty() {
        println!();
        for line in tag.description.lines() {
            println!("{line}");
        }
    }
    Ok(())
}

/// Delete a tag by name.
pub fn delete_tag_command(layout: &StoreLayout, name: &str) -> Result<()> {
    let store = TagStore::new(layout.clone());
    store.delete_tag(name).map_err(|err| anyhow!(err))?;
    println!("Deleted tag {name}");
    Ok(())
}
