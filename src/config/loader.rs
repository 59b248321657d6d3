// src/config/loader.rs

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::model::{EngineConfig, RawEngineConfig};
use crate::errors::{CommandError, Result};

/// Load a configuration file and return the raw, unvalidated model.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] to get
/// typed settings.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawEngineConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawEngineConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let raw_config = load_from_path(&path)?;
    let config = EngineConfig::try_from(raw_config)?;
    Ok(config)
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let raw: RawEngineConfig = toml::from_str(s)?;
        EngineConfig::try_from(raw)
    }
}

impl FromStr for EngineConfig {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_toml_str(s)
    }
}
