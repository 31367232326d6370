use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::schema::ShuntConfig;

/// Loads the gateway configuration from disk. The config is immutable for
/// the lifetime of the process; handlers see a snapshot taken at startup.
pub struct ConfigLoader {
    config: ShuntConfig,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > SHUNT_CONFIG env > ./shunt.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("SHUNT_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("shunt.toml")
    }

    /// Load the config from disk. A missing file is a hard error: the
    /// provider list has no usable default.
    pub fn load(path: Option<&Path>) -> shunt_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        if !config_path.exists() {
            return Err(shunt_core::ShuntError::Config(format!(
                "config file not found: {}",
                config_path.display()
            )));
        }

        info!(?config_path, "loading configuration");
        let raw = std::fs::read_to_string(&config_path)?;
        let config = toml::from_str::<ShuntConfig>(&raw).map_err(|e| {
            shunt_core::ShuntError::Config(format!(
                "failed to parse {}: {}",
                config_path.display(),
                e
            ))
        })?;

        let config = Self::apply_env_overrides(config);
        let config = Self::normalize(config);

        // Validate config — log warnings, fail on errors
        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(shunt_core::ShuntError::Config(e));
            }
        }

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Snapshot of the loaded config.
    pub fn get(&self) -> ShuntConfig {
        self.config.clone()
    }

    /// Path the config was loaded from.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides (SHUNT_ACCESS_TOKEN, SHUNT_LISTEN, SHUNT_LOG_LEVEL).
    fn apply_env_overrides(mut config: ShuntConfig) -> ShuntConfig {
        if let Ok(v) = std::env::var("SHUNT_ACCESS_TOKEN") {
            config.gateway.access_token = v;
        }
        if let Ok(v) = std::env::var("SHUNT_LISTEN") {
            config.server.listen = v;
        }
        if let Ok(v) = std::env::var("SHUNT_LOG_LEVEL") {
            config.logging.level = v;
        }
        config
    }

    /// Normalize loaded values. Base URLs lose their trailing slashes so the
    /// client path can be appended verbatim.
    fn normalize(mut config: ShuntConfig) -> ShuntConfig {
        for p in &mut config.providers {
            while p.base_url.ends_with('/') {
                p.base_url.pop();
            }
        }
        config
    }
}
