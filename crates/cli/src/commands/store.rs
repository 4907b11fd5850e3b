use std::path::PathBuf;

use anyhow::{Context, Result};
use bintag_core::store::{load_config, BintagConfig, StoreLayout, TagStore};
use serde::Serialize;

use crate::commands::util::print_dir_status;

#[derive(Debug, Serialize)]
pub struct StoreInfo {
    pub base_dir: PathBuf,
    pub tags_dir: PathBuf,
    pub config_path: PathBuf,
    pub config_present: bool,
    pub config: BintagConfig,
    pub tag_count: usize,
}

/// Show the resolved store layout, effective config and tag count.
pub fn store_info_command(layout: &StoreLayout, json: bool) -> Result<()> {
    let config = load_config(layout)?;
    let tag_count = TagStore::new(layout.clone()).list_tags().context("Failed to list tags")?.len();
    let info = StoreInfo {
        base_dir: layout.base_dir.clone(),
        tags_dir: layout.tags_dir.clone(),
        config_path: layout.config_path.clone(),
        config_present: layout.config_path.is_file(),
        config,
        tag_count,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("bintag store");
    println!("============");
    println!("Base dir: {}", info.base_dir.display());
    println!(
        "Config file: {} ({})",
        info.config_path.display(),
        if info.config_present { "present" } else { "defaults" }
    );
    println!("Display threshold: {}", info.config.display_threshold);
    println!("Max function count ratio: {}", info.config.max_function_count_ratio);
    println!("Match architecture: {}", info.config.match_architecture);
    println!("Tags: {}", info.tag_count);
    println!();

    println!("Directories:");
    print_dir_status("Base dir", &layout.base_dir);
    print_dir_status("Tags dir", &layout.tags_dir);

    Ok(())
}
