// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{HarnessConfig, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// A relative `[harness].root` is resolved against the directory containing
/// the config file, so a config can sit next to the project it drives.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<HarnessConfig> {
    let path = path.as_ref();
    let mut raw_config = load_from_path(path)?;

    if raw_config.harness.root.is_relative() {
        raw_config.harness.root = config_dir(path).join(&raw_config.harness.root);
    }

    HarnessConfig::try_from(raw_config)
}

/// Default config location: `Harness.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Harness.toml")
}

fn config_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_file_name_resolves_to_current_dir() {
        assert_eq!(config_dir(Path::new("Harness.toml")), PathBuf::from("."));
        assert_eq!(
            config_dir(Path::new("fixtures/Harness.toml")),
            PathBuf::from("fixtures")
        );
    }
}
