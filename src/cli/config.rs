// FILE: src/cli/config.rs

use crate::error::{CompilerError, Result};
use crate::passes::PruneMode;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub prefix_mode: Option<PruneMode>,
    pub manifest: Option<String>,
    pub emit_capability_map: Option<bool>,
    pub capability_map_path: Option<String>,
    pub root_selector: Option<String>,
    pub pretty_print: Option<bool>,
    pub expand_prefixes: Option<bool>,
    pub output_directory: Option<String>,
}

pub fn load(config_path: &str) -> Result<ConfigFile> {
    let config_content = fs::read_to_string(config_path).map_err(|e| {
        CompilerError::FileNotFound {
            path: format!("Config file {}: {}", config_path, e),
        }
    })?;

    let config = if config_path.ends_with(".json") {
        serde_json::from_str(&config_content).map_err(|e| CompilerError::InvalidFormat {
            message: format!("Invalid JSON config: {}", e),
        })?
    } else if config_path.ends_with(".toml") {
        toml::from_str(&config_content).map_err(|e| CompilerError::InvalidFormat {
            message: format!("Invalid TOML config: {}", e),
        })?
    } else {
        return Err(CompilerError::config("Config file must be .json or .toml format"));
    };

    log::info!("Loaded configuration from {}", config_path);
    Ok(config)
}
