// Configuration loader
// Loads settings from ~/.lanpipe/config.toml (or an explicit path), then
// applies LANPIPE_* environment overrides

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::Config;

/// Load configuration.
///
/// An explicit path must exist. The default path is optional; when it is
/// absent the built-in defaults apply.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("Configuration file not found: {}", path.display());
            }
            load_from_file(path)?
        }
        None => match default_config_path() {
            Some(path) if path.exists() => load_from_file(&path)?,
            _ => Config::default(),
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    config
        .validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

/// `~/.lanpipe/config.toml`, if a home directory can be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".lanpipe").join("config.toml"))
}

fn load_from_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config at {}", path.display()))
}

/// Apply `LANPIPE_*` overrides. `lookup` abstracts the environment for tests.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup("LANPIPE_BIND_ADDR") {
        config.bind_addr = raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid LANPIPE_BIND_ADDR: {}", raw))?;
    }
    if let Some(raw) = lookup("LANPIPE_POLL_INTERVAL_MS") {
        config.poll_interval_ms = raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid LANPIPE_POLL_INTERVAL_MS: {}", raw))?;
    }
    if let Some(raw) = lookup("LANPIPE_DIAL_TIMEOUT_MS") {
        config.dial_timeout_ms = raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid LANPIPE_DIAL_TIMEOUT_MS: {}", raw))?;
    }
    Ok(())
}
