mod types;

pub use types::*;

use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Returns the config directory: `<platform config dir>/signage-ar/`.
pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("signage-ar");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Returns the config file path: `<config dir>/config.toml`.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load config from the default location, or return defaults if not found.
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path()?)
}

/// Load config from `path`, or return defaults if the file does not exist.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        info!(?path, objects = config.scene.objects.len(), "Loaded config");
        Ok(config)
    } else {
        info!(?path, "No config found, using defaults");
        Ok(AppConfig::default())
    }
}

/// Write `config` to the default location unless a file is already there.
///
/// Returns `true` if a new file was written.
pub fn write_config_if_missing(config: &AppConfig) -> Result<bool> {
    write_config_if_missing_at(&config_path()?, config)
}

/// Write `config` to `path` unless a file is already there. An existing file
/// is never touched, even if it failed to parse.
pub fn write_config_if_missing_at(path: &Path, config: &AppConfig) -> Result<bool> {
    let contents = toml::to_string_pretty(config)?;
    let mut file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    file.write_all(contents.as_bytes())?;
    info!(?path, "Wrote default config");
    Ok(true)
}
