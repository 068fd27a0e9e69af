use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use composable_types::{Data, Outcome};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

/// Work applied to each batch item on a worker, given the item's identifier.
pub type Task = Arc<dyn Fn(&str, Data) -> Result<Outcome, AppError> + Send + Sync>;

/// Results paired with the identifier of the item that produced them.
pub type Completed = Box<dyn Iterator<Item = (String, Result<Outcome, AppError>)>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Upper bound on concurrently running items; defaults to the number of CPUs.
    pub max_workers: Option<usize>,
}

impl ParallelConfig {
    pub fn workers(&self) -> usize {
        self.max_workers.filter(|workers| *workers > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|count| count.get())
                .unwrap_or(1)
        })
    }
}

/// Runs a task over many items, yielding results as they finish.
pub trait ParallelExecutor: Send + Sync {
    fn as_completed(
        &self,
        task: Task,
        items: Vec<(String, Data)>,
        config: ParallelConfig,
    ) -> Result<Completed, AppError>;
}

/// Executor backed by the blocking pool of a dedicated tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPoolExecutor;

impl ThreadPoolExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl ParallelExecutor for ThreadPoolExecutor {
    fn as_completed(
        &self,
        task: Task,
        items: Vec<(String, Data)>,
        config: ParallelConfig,
    ) -> Result<Completed, AppError> {
        let workers = config.workers();
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name("composable-worker")
            .build()
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::ExecutionError,
                    format!("failed to start worker pool: {}", err),
                )
                .with_code("CMP-RUN-005")
            })?;

        let expected = items.len();
        let (sender, receiver) = mpsc::channel();
        for (identifier, data) in items {
            let task = Arc::clone(&task);
            let sender = sender.clone();
            runtime.spawn_blocking(move || {
                let result = task(&identifier, data);
                let _ = sender.send((identifier, result));
            });
        }
        drop(sender);
        tracing::debug!(items = expected, workers, "dispatched batch to worker pool");

        Ok(Box::new(CompletionIter {
            runtime: Some(runtime),
            receiver,
            remaining: expected,
        }))
    }
}

struct CompletionIter {
    runtime: Option<Runtime>,
    receiver: Receiver<(String, Result<Outcome, AppError>)>,
    remaining: usize,
}

impl Iterator for CompletionIter {
    type Item = (String, Result<Outcome, AppError>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        match self.receiver.recv() {
            Ok(item) => {
                self.remaining -= 1;
                Some(item)
            }
            Err(_) => {
                self.remaining = 0;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl Drop for CompletionIter {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
