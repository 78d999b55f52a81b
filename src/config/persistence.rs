use crate::config::paths::get_config_path;
use crate::config::schema::{validate_config, Config};
use crate::error::{Result, SyncError};
use std::path::Path;

/// Load the configuration from the default location.
pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_path()?)
}

/// Load the configuration at `config_path`, creating and persisting the
/// default configuration first if the file does not exist.
pub fn load_config_from(config_path: &Path) -> Result<Config> {
    let mut config = if !config_path.exists() {
        let config = Config::default();
        save_config_to(config_path, &config)?;
        tracing::info!("Created default config at {}", config_path.display());
        config
    } else {
        let toml_content = std::fs::read_to_string(config_path).map_err(|e| {
            SyncError::Config(format!(
                "Failed to read config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        toml::from_str(&toml_content).map_err(|e| {
            SyncError::Config(format!(
                "Failed to parse config {}: {}",
                config_path.display(),
                e
            ))
        })?
    };

    validate_config(&mut config);
    Ok(config)
}

pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(&get_config_path()?, config)
}

pub fn save_config_to(config_path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            SyncError::Config(format!(
                "Failed to create config directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| SyncError::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(config_path, toml_str)
        .map_err(|e| SyncError::Config(format!("Failed to write config file: {}", e)))?;
    Ok(())
}
