use std::{fs, path::Path};

use anyhow::Context;
use recon_model::ControllerConfig;
use recon_observe::LoggerConfig;
use serde::Deserialize;

/// Environment variable holding the path of the JSON config file.
pub const CONFIG_ENV: &str = "RECON_CONFIG";

/// Process configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logger: LoggerConfig,
    pub controller: ControllerConfig,
}

impl AppConfig {
    /// Load from the file named by `RECON_CONFIG`, or defaults when it is unset.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_json::from_str(raw)?;
        cfg.controller.validate()?;
        Ok(cfg)
    }
}
