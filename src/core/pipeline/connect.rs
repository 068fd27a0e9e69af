use super::Stage;
use crate::core::error::AppError;
use crate::core::tags::{compatible, format_types};
use crate::core::types::{AppKind, ErrorCategory};
use std::ops::Add;

fn connection_error(code: &str, message: String) -> AppError {
    AppError::new(ErrorCategory::ConnectionError, message).with_code(code)
}

/// Make `producer` the predecessor of `consumer` and return the consumer.
///
/// Every rule is checked before anything is mutated, so a rejected connection
/// leaves both stages untouched.
pub fn connect(producer: &Stage, consumer: &Stage) -> Result<Stage, AppError> {
    if producer.ptr_eq(consumer) {
        return Err(connection_error(
            "CMP-CONN-001",
            format!("cannot connect {}() to itself", consumer.name()),
        ));
    }

    for stage in [producer, consumer] {
        if !stage.is_composable() {
            return Err(connection_error(
                "CMP-CONN-002",
                format!("{}() is not composable", stage.name()),
            ));
        }
    }

    if producer.kind() == AppKind::Writer {
        return Err(connection_error(
            "CMP-CONN-003",
            format!("{}() is a writer and cannot feed another stage", producer.name()),
        ));
    }
    if consumer.kind() == AppKind::Loader {
        return Err(connection_error(
            "CMP-CONN-004",
            format!("{}() is a loader and cannot take input from another stage", consumer.name()),
        ));
    }

    if !compatible(producer.tags(), consumer.tags()) {
        return Err(connection_error(
            "CMP-CONN-005",
            format!(
                "{}() requires input type {}, {}() produces {}",
                consumer.name(),
                format_types(consumer.tags().input_types()),
                producer.name(),
                format_types(producer.tags().output_types()),
            ),
        ));
    }

    if producer.chain().iter().any(|stage| stage.ptr_eq(consumer)) {
        return Err(connection_error(
            "CMP-CONN-006",
            format!(
                "{}() is upstream of {}(), connecting them would form a cycle",
                consumer.name(),
                producer.name()
            ),
        ));
    }

    let mut slot = consumer.predecessor_slot();
    if slot.is_some() {
        return Err(already_composed(consumer));
    }
    if producer
        .inner
        .has_successor
        .compare_exchange(
            false,
            true,
            std::sync::atomic::Ordering::SeqCst,
            std::sync::atomic::Ordering::SeqCst,
        )
        .is_err()
    {
        return Err(already_composed(producer));
    }
    *slot = Some(producer.clone());
    drop(slot);

    tracing::debug!(
        producer = producer.name(),
        consumer = consumer.name(),
        "connected stages"
    );
    Ok(consumer.clone())
}

fn already_composed(stage: &Stage) -> AppError {
    connection_error(
        "CMP-CONN-007",
        format!(
            "{}() is already part of a composed function, use disconnect() to free them up",
            stage.name()
        ),
    )
}

impl Stage {
    /// Break the chain ending here into independent stages.
    pub fn disconnect(&self) {
        let predecessor = self.predecessor_slot().take();
        if let Some(predecessor) = predecessor {
            predecessor.set_has_successor(false);
            predecessor.disconnect();
        }
    }

    /// Remove the link to the predecessor only, leaving the rest of the chain intact.
    pub(crate) fn detach(&self) -> Option<Stage> {
        let predecessor = self.predecessor_slot().take();
        if let Some(predecessor) = &predecessor {
            predecessor.set_has_successor(false);
        }
        predecessor
    }

    /// Restore a link removed by [`Stage::detach`].
    pub(crate) fn reattach(&self, predecessor: Stage) {
        predecessor.set_has_successor(true);
        *self.predecessor_slot() = Some(predecessor);
    }
}

impl Add<Stage> for Stage {
    type Output = Result<Stage, AppError>;

    fn add(self, consumer: Stage) -> Self::Output {
        connect(&self, &consumer)
    }
}

impl Add<&Stage> for &Stage {
    type Output = Result<Stage, AppError>;

    fn add(self, consumer: &Stage) -> Self::Output {
        connect(self, consumer)
    }
}

/// Lets `a + b + c` chain; the first failure short-circuits.
impl Add<Stage> for Result<Stage, AppError> {
    type Output = Result<Stage, AppError>;

    fn add(self, consumer: Stage) -> Self::Output {
        self.and_then(|producer| connect(&producer, &consumer))
    }
}
