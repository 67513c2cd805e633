//! Configuration for the relay binary

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::size::WinSize;

/// Relay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Program to run on the slave; `$SHELL` when unset
    pub shell: Option<String>,
    /// Arguments passed to the program
    pub args: Vec<String>,
    /// Initial size; takes precedence over the outer terminal's size
    pub size: Option<WinSize>,
    /// Put the outer terminal in raw mode while relaying
    pub raw: bool,
    /// Leave echo enabled on the inner pty
    pub echo: bool,
    /// Leave ONLCR enabled on the inner pty
    pub onlcr: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            shell: None,
            args: Vec::new(),
            size: None,
            raw: true,
            echo: true,
            onlcr: true,
        }
    }
}

impl RelayConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: RelayConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from default location or return default config
    pub fn load_or_default() -> Self {
        // ~/.config/ptyconsole/relay.json
        if let Some(config_dir) = dirs_config_path() {
            let config_path = config_dir.join("relay.json");
            if config_path.exists() {
                match Self::load(&config_path) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Ignoring {}: {}", config_path.display(), e),
                }
            }
        }
        Self::default()
    }

    /// Program to run: the configured shell, then `$SHELL`, then `/bin/sh`
    pub fn resolved_shell(&self) -> String {
        self.shell
            .clone()
            .or_else(|| std::env::var("SHELL").ok())
            .unwrap_or_else(|| "/bin/sh".to_string())
    }
}

/// Get the configuration directory path
fn dirs_config_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config").join("ptyconsole"))
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
