use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use composable_backend::{DataStore, IfExists};
use std::fmt;
use std::sync::Arc;

type NameCallback = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Output-existence check performed before a stage does any work.
#[derive(Clone)]
pub struct Checkpoint {
    store: Arc<dyn DataStore>,
    policy: IfExists,
    name_callback: Option<NameCallback>,
}

impl Checkpoint {
    /// Checkpoint against `store` using the store's own `if_exists` policy.
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        let policy = store.if_exists();
        Self {
            store,
            policy,
            name_callback: None,
        }
    }

    pub fn with_policy(mut self, policy: IfExists) -> Self {
        self.policy = policy;
        self
    }

    /// Derive the output name from the reference value before the store
    /// makes it absolute.
    pub fn with_name_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.name_callback = Some(Arc::new(callback));
        self
    }

    pub fn policy(&self) -> IfExists {
        self.policy
    }

    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    pub fn output_identifier(&self, reference: &str) -> String {
        let name = match &self.name_callback {
            Some(callback) => callback(reference),
            None => reference.to_string(),
        };
        self.store.make_absolute_identifier(&name)
    }

    /// Returns the existing identifier when the stage should short-circuit,
    /// `None` when it should run.
    pub fn existing_output(
        &self,
        reference: &str,
        stage: &str,
    ) -> Result<Option<String>, AppError> {
        let identifier = self.output_identifier(reference);
        if !self.store.contains(&identifier) {
            return Ok(None);
        }
        match self.policy {
            IfExists::Raise => {
                let mut error = AppError::new(
                    ErrorCategory::CheckpointError,
                    format!("'{}' already exists", identifier),
                )
                .with_code("CMP-CKPT-001");
                error.add_context("stage", stage);
                Err(error)
            }
            IfExists::Overwrite => Ok(None),
            IfExists::Skip | IfExists::Ignore => {
                tracing::debug!(stage, identifier = %identifier, "checkpoint hit, skipping");
                Ok(Some(identifier))
            }
        }
    }
}

impl fmt::Debug for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checkpoint")
            .field("store", &self.store.source())
            .field("policy", &self.policy)
            .field("name_callback", &self.name_callback.is_some())
            .finish()
    }
}
