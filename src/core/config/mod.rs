use crate::core::error::AppError;
use crate::core::runner::RunnerConfig;
use crate::core::types::ErrorCategory;
use composable_backend::IfExists;
use serde::{Deserialize, Serialize};

/// Configuration loaded from composable.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ComposableConfig {
    /// Batch runner configuration
    #[serde(default)]
    pub runner: RunnerSection,

    /// Output store configuration
    #[serde(default)]
    pub store: StoreSection,
}

/// Batch runner configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RunnerSection {
    /// Run items on a worker pool
    #[serde(default)]
    pub parallel: bool,

    /// Worker pool size, defaults to the CPU count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,

    /// Remove the run log after copying it into the store
    #[serde(default)]
    pub cleanup: bool,
}

/// Output store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreSection {
    /// Suffix of written members
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// One of skip, ignore, raise, overwrite
    #[serde(default = "default_if_exists")]
    pub if_exists: String,
}

fn default_suffix() -> String {
    "json".to_string()
}

fn default_if_exists() -> String {
    IfExists::default().to_string()
}

impl Default for StoreSection {
    fn default() -> Self {
        StoreSection {
            suffix: default_suffix(),
            if_exists: default_if_exists(),
        }
    }
}

impl StoreSection {
    pub fn policy(&self) -> Result<IfExists, AppError> {
        self.if_exists.parse::<IfExists>().map_err(|_| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!(
                    "store.if_exists must be one of skip, ignore, raise, overwrite, got '{}'",
                    self.if_exists
                ),
            )
            .with_code("CMP-CFG-003")
        })
    }
}

impl ComposableConfig {
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            parallel: self.runner.parallel,
            max_workers: self.runner.max_workers,
            cleanup: self.runner.cleanup,
            log_file_path: None,
        }
    }
}


pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;
