mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./pixelforge.toml",
        "~/.config/pixelforge/config.toml",
        "/etc/pixelforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.processing.blur_radius == 0 {
        anyhow::bail!("Blur radius must be at least 1");
    }

    if !(1..=100).contains(&config.processing.jpeg_quality) {
        anyhow::bail!(
            "JPEG quality must be between 1 and 100, got {}",
            config.processing.jpeg_quality
        );
    }

    if config.processing.max_upload_bytes == 0 {
        anyhow::bail!("Upload limit cannot be 0");
    }

    if config.activity_log.flush_interval_secs == 0 {
        anyhow::bail!("Activity log flush interval cannot be 0");
    }

    if let Some(ref dir) = config.server.static_dir {
        if !dir.exists() {
            tracing::warn!("Static directory does not exist: {:?}", dir);
        }
    }

    Ok(())
}
