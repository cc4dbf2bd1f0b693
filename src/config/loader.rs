//! Configuration loading and management
//!
//! This module handles loading configuration from files and environment variables.

use std::path::Path;

use tracing::{debug, info};

use super::types::Config;
use crate::chain::allocator::IdGenerationAlgorithm;
use crate::error::ConfigError;
use crate::selection::SchedulerType;

/// Load configuration from a JSON file
///
/// # Arguments
///
/// * `path` - Path to the configuration file
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    debug!("Loading configuration from {:?}", path);

    // Check if file exists
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    // Read file contents
    let contents = std::fs::read_to_string(path)?;

    // Parse JSON
    let config: Config = serde_json::from_str(&contents).map_err(|e| {
        ConfigError::ParseError(format!("Failed to parse JSON: {e} at {path:?}"))
    })?;

    // Validate configuration
    config.validate()?;

    info!(
        forwarders = config.topology.forwarders.len(),
        service_functions = config.topology.service_functions.len(),
        chains = config.topology.chains.len(),
        paths = config.paths.len(),
        policy = %config.scheduler.policy,
        "Configuration loaded"
    );

    Ok(config)
}

/// Load configuration from a JSON string
///
/// # Errors
///
/// Returns `ConfigError` if parsing or validation fails.
pub fn load_config_str(json: &str) -> Result<Config, ConfigError> {
    let config: Config =
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.validate()?;

    Ok(config)
}

/// Load configuration with environment variable overrides
///
/// Environment variables:
/// - `SFC_RENDERER_LOG_LEVEL`: Override log level
/// - `SFC_RENDERER_POLICY`: Override default scheduler type
/// - `SFC_RENDERER_ID_ALGORITHM`: Override path id algorithm
/// - `SFC_RENDERER_STARTING_INDEX`: Override starting service index
///
/// # Errors
///
/// Returns `ConfigError` if loading or parsing fails.
pub fn load_config_with_env(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

    // Re-validate after overrides
    config.validate()?;

    Ok(config)
}

/// Apply overrides from `lookup`, which maps a variable name to its value
fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    // Override log level
    if let Some(level) = lookup("SFC_RENDERER_LOG_LEVEL") {
        config.log.level = level;
        debug!("Log level overridden to {}", config.log.level);
    }

    // Override scheduler type
    if let Some(policy) = lookup("SFC_RENDERER_POLICY") {
        config.scheduler.policy =
            SchedulerType::from_name(&policy).ok_or_else(|| ConfigError::EnvError {
                name: "SFC_RENDERER_POLICY".into(),
                reason: format!("Unknown scheduler type: {policy}"),
            })?;
        debug!("Scheduler overridden to {}", config.scheduler.policy);
    }

    // Override id generation algorithm
    if let Some(algorithm) = lookup("SFC_RENDERER_ID_ALGORITHM") {
        config.allocator.algorithm =
            IdGenerationAlgorithm::from_name(&algorithm).ok_or_else(|| ConfigError::EnvError {
                name: "SFC_RENDERER_ID_ALGORITHM".into(),
                reason: format!("Unknown algorithm: {algorithm}"),
            })?;
        debug!("Id algorithm overridden to {}", config.allocator.algorithm);
    }

    // Override starting index
    if let Some(index) = lookup("SFC_RENDERER_STARTING_INDEX") {
        config.scheduler.starting_index = index.parse().map_err(|_| ConfigError::EnvError {
            name: "SFC_RENDERER_STARTING_INDEX".into(),
            reason: format!("Invalid service index: {index}"),
        })?;
        debug!(
            "Starting index overridden to {}",
            config.scheduler.starting_index
        );
    }

    Ok(())
}

/// Create a default configuration file at the given path
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be written.
pub fn create_default_config(path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let config = Config::default_config();
    let json = serde_json::to_string_pretty(&config)
        .map_err(|e| ConfigError::ParseError(format!("Failed to serialize config: {e}")))?;

    std::fs::write(path, json)?;
    Ok(())
}
