use anyhow::{Context, Result};

use crate::store::{BintagConfig, StoreLayout};

/// Load the config JSON for a given layout, or defaults when there is none.
pub fn load_config(layout: &StoreLayout) -> Result<BintagConfig> {
    if !layout.config_path.exists() {
        return Ok(BintagConfig::default());
    }
    let config_json = std::fs::read_to_string(&layout.config_path).with_context(|| {
        format!("Failed to read bintag config at {}", layout.config_path.display())
    })?;
    let config: BintagConfig =
        serde_json::from_str(&config_json).context("Failed to parse bintag config JSON")?;
    Ok(config)
}

/// Write `config` as pretty JSON, creating the base directory if needed.
pub fn save_config(layout: &StoreLayout, config: &BintagConfig) -> Result<()> {
    std::fs::create_dir_all(&layout.base_dir).with_context(|| {
        format!("Failed to create store base dir: {}", layout.base_dir.display())
    })?;
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&layout.config_path, json).with_context(|| {
        format!("Failed to write bintag config: {}", layout.config_path.display())
    })?;
    Ok(())
}
