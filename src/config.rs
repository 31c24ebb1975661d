use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where and how to talk to the portal. Defaults target the production
/// catalogue; a TOML file pointed at by `OPAC_CONFIG` overrides them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    pub base_url: String,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_rate_limit() -> f64 {
    2.0
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://library.bracu.ac.bd/".to_string(),
            rate_limit: default_rate_limit(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl PortalConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;
        toml::from_str(&raw).context("Failed to parse config file")
    }

    /// Config from `OPAC_CONFIG` when set and readable, defaults otherwise.
    pub fn load() -> Self {
        match std::env::var("OPAC_CONFIG") {
            Ok(path) => match Self::from_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Ignoring config file {}: {}", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}
