#![allow(clippy::result_large_err)]

use super::{ComposableConfig, ConfigValidator};
use crate::core::error::AppError;
use std::env;
use std::path::Path;

pub const CONFIG_FILE: &str = "composable.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from workspace root (workspace/composable.toml)
    /// Environment variables override config file values
    /// Missing file means defaults + env vars
    pub fn load_from_workspace(workspace_path: &Path) -> Result<ComposableConfig, AppError> {
        let config_path = workspace_path.join(CONFIG_FILE);
        let config_file = Self::load_from_file(&config_path)?;

        let mut config = config_file.unwrap_or_default();

        Self::apply_env_overrides(&mut config);
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<ComposableConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                crate::core::types::ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: ComposableConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                crate::core::types::ErrorCategory::ValidationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
        })?;

        Ok(Some(config))
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(config: &mut ComposableConfig) {
        if let Ok(parallel_str) = env::var("COMPOSABLE_PARALLEL") {
            if let Ok(parallel) = parallel_str.parse::<bool>() {
                config.runner.parallel = parallel;
            }
        }

        if let Ok(max_workers_str) = env::var("COMPOSABLE_MAX_WORKERS") {
            if let Ok(max_workers) = max_workers_str.parse::<usize>() {
                config.runner.max_workers = Some(max_workers);
            }
        }

        if let Ok(cleanup_str) = env::var("COMPOSABLE_CLEANUP") {
            if let Ok(cleanup) = cleanup_str.parse::<bool>() {
                config.runner.cleanup = cleanup;
            }
        }

        if let Ok(suffix) = env::var("COMPOSABLE_STORE_SUFFIX") {
            config.store.suffix = suffix;
        }

        if let Ok(if_exists) = env::var("COMPOSABLE_IF_EXISTS") {
            config.store.if_exists = if_exists;
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "COMPOSABLE_PARALLEL - Run batch items on a worker pool (true/false)",
            "COMPOSABLE_MAX_WORKERS - Worker pool size (default: number of CPUs)",
            "COMPOSABLE_CLEANUP - Remove the run log after it is copied into the store (true/false)",
            "COMPOSABLE_STORE_SUFFIX - Suffix of written members (default: json)",
            "COMPOSABLE_IF_EXISTS - Policy for existing outputs: skip, ignore, raise, overwrite (default: skip)",
        ]
    }
}
