#![allow(clippy::result_large_err)]

use super::ComposableConfig;
use crate::core::error::AppError;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &ComposableConfig) -> Result<(), AppError> {
        if config.runner.max_workers == Some(0) {
            return Err(AppError::new(
                crate::core::types::ErrorCategory::ValidationError,
                "runner.max_workers must be at least 1",
            )
            .with_code("CMP-CFG-001"));
        }

        if config.store.suffix.trim().trim_start_matches('.').is_empty() {
            return Err(AppError::new(
                crate::core::types::ErrorCategory::ValidationError,
                "store.suffix cannot be empty",
            )
            .with_code("CMP-CFG-002"));
        }

        config.store.policy()?;

        Ok(())
    }
}
