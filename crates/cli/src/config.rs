//! Optional TOML configuration for the CLI.
//!
//! ```toml
//! [socket]
//! promiscuous = false
//! tx_timestamp_timeout_ms = 200
//! ```

use anyhow::Context;
use rawether::SocketConfig;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub socket: SocketConfig,
}

/// Load the configuration file, or defaults when no path is given.
pub fn load(path: Option<&Path>) -> anyhow::Result<CliConfig> {
    let Some(path) = path else {
        return Ok(CliConfig::default());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: CliConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;

    tracing::debug!("Loaded config from {}: {:?}", path.display(), config);
    Ok(config)
}
