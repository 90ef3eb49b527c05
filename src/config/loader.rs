//! Configuration Loader
//!
//! Environment-aware loading built on the `config` crate. Sources are layered, later ones
//! winning:
//!
//! 1. The base file, e.g. `config/disaster_recovery.toml`
//! 2. An optional environment override next to it, e.g.
//!    `config/disaster_recovery.production.toml`
//! 3. Environment variables with the `DR__` prefix, e.g. `DR__FAILURE_THRESHOLD=5`

use super::error::{ConfigResult, ConfigurationError};
use super::DisasterRecoveryConfig;
use crate::constants::system;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Options controlling which sources are layered on top of the base file
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub environment: String,
    pub env_prefix: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            environment: ConfigManager::detect_environment(),
            env_prefix: system::CONFIG_ENV_PREFIX.to_string(),
        }
    }
}

/// Loaded, validated configuration together with where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Arc<DisasterRecoveryConfig>,
    environment: String,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load configuration from the default location with environment auto-detection
    pub fn load() -> ConfigResult<ConfigManager> {
        Self::load_from_path(system::DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific base file
    pub fn load_from_path(path: impl AsRef<Path>) -> ConfigResult<ConfigManager> {
        Self::load_with_options(path, &LoadOptions::default())
    }

    /// Load configuration with explicit environment and variable prefix
    /// This is useful for testing without modifying global environment variables
    pub fn load_with_options(
        path: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> ConfigResult<ConfigManager> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigurationError::ConfigFileNotFound {
                path: path.to_path_buf(),
            });
        }

        let override_path = Self::environment_override_path(path, &options.environment);

        debug!(
            base = %path.display(),
            override_file = %override_path.display(),
            environment = %options.environment,
            "Loading disaster recovery configuration"
        );

        let config: DisasterRecoveryConfig = config::Config::builder()
            .add_source(config::File::from(path.to_path_buf()))
            .add_source(config::File::from(override_path).required(false))
            .add_source(
                config::Environment::with_prefix(&options.env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
            .map_err(|e| ConfigurationError::load_error(path.display().to_string(), e))?;

        config.validate()?;

        debug!(
            config = %config.sanitized_for_logging(),
            "Configuration loaded successfully"
        );

        info!(
            environment = %options.environment,
            steps = config.recovery_steps.len(),
            auto_failover = config.auto_failover,
            "⚙️ CONFIG: Disaster recovery configuration loaded"
        );

        Ok(ConfigManager {
            config: Arc::new(config),
            environment: options.environment.clone(),
            config_path: path.to_path_buf(),
        })
    }

    /// Wrap an in-memory configuration after validating it
    pub fn from_config(config: DisasterRecoveryConfig) -> ConfigResult<ConfigManager> {
        config.validate()?;
        Ok(ConfigManager {
            config: Arc::new(config),
            environment: Self::detect_environment(),
            config_path: PathBuf::new(),
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &DisasterRecoveryConfig {
        &self.config
    }

    /// Shared handle to the loaded configuration
    pub fn shared_config(&self) -> Arc<DisasterRecoveryConfig> {
        self.config.clone()
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get current environment from environment variables
    pub fn detect_environment() -> String {
        std::env::var("DR_ENV")
            .or_else(|_| std::env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    /// `dir/name.toml` becomes `dir/name.<environment>.toml`
    fn environment_override_path(base: &Path, environment: &str) -> PathBuf {
        let stem = base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = match base.extension() {
            Some(ext) => format!("{stem}.{environment}.{}", ext.to_string_lossy()),
            None => format!("{stem}.{environment}"),
        };
        base.with_file_name(file_name)
    }
}
