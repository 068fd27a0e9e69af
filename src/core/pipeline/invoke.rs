use super::{Params, Stage};
use crate::core::error::AppError;
use crate::core::types::{AppKind, ErrorCategory};
use composable_types::{Data, NotCompleted, Outcome};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Per-call state threaded through a chain invocation.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Reference used by checkpoints instead of the input value.
    pub identifier: Option<String>,
    /// Keyword arguments merged over those captured by function stages.
    pub kwargs: Params,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_kwargs(mut self, kwargs: Params) -> Self {
        self.kwargs = kwargs;
        self
    }
}

impl Stage {
    /// Push `value` through the chain ending at this stage.
    ///
    /// Content failures come back as `Outcome::Incomplete`; only checkpoint
    /// `raise` and storage faults surface as `Err`.
    pub fn invoke(&self, value: Outcome, ctx: &CallContext) -> Result<Outcome, AppError> {
        let data = match value {
            Outcome::Incomplete(_) => return Ok(value),
            Outcome::Success(data) => data,
        };
        if data.value.is_null() {
            let failure = NotCompleted::error(self.name(), "unexpected input value None")
                .with_source_of(&data);
            return Ok(failure.into());
        }
        if !data.is_truthy() {
            return Ok(Outcome::Success(data));
        }

        if let Some(checkpoint) = self.checkpoint() {
            let reference = ctx.identifier.clone().or_else(|| data.data_source());
            if let Some(reference) = reference {
                if let Some(existing) = checkpoint.existing_output(&reference, self.name())? {
                    return Ok(Outcome::Success(Data::identifier(existing)));
                }
            }
        }

        let data = match self.predecessor() {
            Some(predecessor) if self.kind() != AppKind::Loader => {
                match predecessor.invoke(Outcome::Success(data), ctx)? {
                    Outcome::Success(upstream) if upstream.is_truthy() => upstream,
                    other => return Ok(other),
                }
            }
            _ => data,
        };

        Ok(self.run_main(data, ctx))
    }

    /// Invoke with a default context.
    pub fn call(&self, value: impl Into<Outcome>) -> Result<Outcome, AppError> {
        self.invoke(value.into(), &CallContext::default())
    }

    /// Used by the batch runner to finish an item on the driving thread:
    /// results are written without a checkpoint, and every failure, whether
    /// it arrived from upstream or came from this writer, is recorded in the
    /// store.
    pub fn write_outcome(&self, identifier: &str, result: Outcome) -> Result<Outcome, AppError> {
        let store = self.data_store().ok_or_else(|| {
            AppError::new(
                ErrorCategory::ExecutionError,
                format!("{}() has no data store to write to", self.name()),
            )
            .with_code("CMP-RUN-004")
        })?;
        let outcome = match result {
            Outcome::Success(data) if data.is_truthy() => {
                self.run_main(data, &CallContext::default().with_identifier(identifier))
            }
            other => other,
        };
        if let Outcome::Incomplete(record) = &outcome {
            store.write_incomplete(identifier, record)?;
        }
        Ok(outcome)
    }

    /// Validate, then run the operation with errors and panics trapped.
    fn run_main(&self, data: Data, ctx: &CallContext) -> Outcome {
        if let Err(failure) = self.tags().accepts(&data, self.name()) {
            return failure.into();
        }
        let source = data.data_source();
        let trapped = panic::catch_unwind(AssertUnwindSafe(|| self.operation().main(data, ctx)));
        let outcome = match trapped {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                tracing::debug!(stage = self.name(), error = %err, "stage returned an error");
                self.trapped_failure(format!("{:?}", err), source.clone())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(stage = self.name(), %message, "stage panicked");
                self.trapped_failure(format!("panicked: {}", message), source.clone())
            }
        };
        match outcome {
            Outcome::Success(data) if !data.is_truthy() => {
                let mut record = NotCompleted::bug(
                    self.name(),
                    format!("main returned a falsy value {}", data.value),
                );
                record.source = source.or_else(|| data.data_source());
                record.into()
            }
            other => other,
        }
    }

    fn trapped_failure(&self, message: String, source: Option<String>) -> Outcome {
        let mut record = NotCompleted::error(self.name(), message);
        record.source = source;
        record.into()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
