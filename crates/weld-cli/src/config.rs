use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// The CLI's own tunables, loaded from `~/.config/weld/config.toml` if it
/// exists. Distinct from a document's `Settings`: this is per-machine
/// defaults (shared template vars, a preferred worker-pool size), not
/// anything a document author declares.
#[derive(Debug, Default, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    #[serde(default)]
    pub parallel: Option<u32>,
}

pub fn load() -> Result<CliConfig> {
    let Some(path) = config_path() else {
        return Ok(CliConfig::default());
    };
    if !path.exists() {
        return Ok(CliConfig::default());
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/weld/config.toml"))
}
