//! Batch execution of a composed chain over many inputs.

pub mod executor;

pub use executor::{Completed, ParallelConfig, ParallelExecutor, Task, ThreadPoolExecutor};

use crate::core::error::AppError;
use crate::core::pipeline::{CallContext, Stage};
use crate::core::run_log::{default_log_path, CachingLogger, LogSink};
use crate::core::types::ErrorCategory;
use composable_backend::DataStore;
use composable_types::{identifier_stem, Data, Outcome};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Runtime options of a batch run.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    pub parallel: bool,
    pub max_workers: Option<usize>,
    /// Delete the log file once it has been copied into the store.
    pub cleanup: bool,
    /// Overrides the default log location for writer chains.
    pub log_file_path: Option<PathBuf>,
}

/// Drives a chain over a batch of inputs.
pub struct BatchRunner {
    config: RunnerConfig,
    executor: Arc<dyn ParallelExecutor>,
    logger: Option<Box<dyn LogSink>>,
}

impl BatchRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            executor: Arc::new(ThreadPoolExecutor::new()),
            logger: None,
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn ParallelExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Use `logger` instead of a fresh [`CachingLogger`] for writer chains.
    pub fn with_logger(mut self, logger: Box<dyn LogSink>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Apply the chain ending at `tail` to every truthy input.
    ///
    /// One outcome is returned per input: in submission order when sequential,
    /// in completion order when parallel. Item failures are outcomes; only
    /// malformed input, checkpoint `raise` and storage or log faults abort.
    pub fn run(&mut self, tail: &Stage, inputs: Vec<Data>) -> Result<Vec<Outcome>, AppError> {
        let inputs: Vec<Data> = inputs.into_iter().filter(Data::is_truthy).collect();
        if inputs.is_empty() {
            return Err(AppError::new(ErrorCategory::ValidationError, "no inputs to process")
                .with_code("CMP-RUN-001"));
        }
        let items = identify(inputs)?;
        let checksums: HashMap<String, Option<String>> = items
            .iter()
            .map(|(identifier, data)| (identifier.clone(), data.checksum.clone()))
            .collect();

        let started = Instant::now();
        let mut writer = match tail.data_store() {
            Some(store) => Some(self.open_log(tail, Arc::clone(store))?),
            None => None,
        };

        tracing::info!(
            chain = %tail,
            items = items.len(),
            parallel = self.config.parallel,
            "starting batch"
        );

        let guard = Detached::new(tail);
        let process = guard.process();
        let detached = guard.is_detached();

        let completed: Completed = if self.config.parallel {
            let task: Task = Arc::new(move |identifier: &str, data: Data| {
                apply(process.as_ref(), identifier, data)
            });
            self.executor.as_completed(
                task,
                items,
                ParallelConfig {
                    max_workers: self.config.max_workers,
                },
            )?
        } else {
            Box::new(items.into_iter().map(move |(identifier, data)| {
                let result = apply(process.as_ref(), &identifier, data);
                (identifier, result)
            }))
        };

        let mut outcomes = Vec::with_capacity(checksums.len());
        for (identifier, result) in completed {
            let result = result?;
            let outcome = if tail.is_writer() {
                tail.write_outcome(&identifier, result)?
            } else if detached {
                let ctx = CallContext::default().with_identifier(identifier.as_str());
                tail.invoke(result, &ctx)?
            } else {
                result
            };
            if let Some(log) = writer.as_mut() {
                log.record(&identifier, checksums.get(&identifier).cloned().flatten(), &outcome)?;
            }
            outcomes.push(outcome);
        }
        drop(guard);

        if let Some(log) = writer.take() {
            log.finish(started, self.config.cleanup)?;
        }
        tracing::info!(
            items = outcomes.len(),
            incomplete = outcomes.iter().filter(|o| o.is_incomplete()).count(),
            "batch finished"
        );
        Ok(outcomes)
    }

    fn open_log(&mut self, tail: &Stage, store: Arc<dyn DataStore>) -> Result<WriterLog, AppError> {
        let mut sink = self
            .logger
            .take()
            .unwrap_or_else(|| Box::new(CachingLogger::new()));
        let chain = tail.to_string();
        if sink.log_file_path().is_none() {
            let path = match &self.config.log_file_path {
                Some(path) => path.clone(),
                None => default_log_path(store.source(), &chain),
            };
            sink.set_log_file_path(path)?;
        }
        sink.log_message(&chain, "composable function")?;
        sink.log_versions(&[
            ("composable", crate::VERSION),
            ("composable-types", composable_types::VERSION),
        ])?;
        Ok(WriterLog { sink, store })
    }
}

/// Push one item through `process`, or hand it on untouched when there is
/// nothing to run before the writer.
fn apply(process: Option<&Stage>, identifier: &str, data: Data) -> Result<Outcome, AppError> {
    match process {
        Some(stage) => {
            let ctx = CallContext::default().with_identifier(identifier);
            stage.invoke(data.into(), &ctx)
        }
        None => Ok(data.into()),
    }
}

/// Pair each input with the suffix-free basename of its source.
fn identify(inputs: Vec<Data>) -> Result<Vec<(String, Data)>, AppError> {
    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(inputs.len());
    for data in inputs {
        let reference = data
            .data_source()
            .unwrap_or_else(|| data.value.to_string());
        let identifier = identifier_stem(&reference);
        seen.insert(identifier.clone());
        items.push((identifier, data));
    }
    if seen.len() < items.len() {
        let diff = items.len() - seen.len();
        return Err(AppError::new(
            ErrorCategory::ValidationError,
            format!(
                "could not construct unique identifiers for {} records, \
                 avoid using '.' as a delimiter in names.",
                diff
            ),
        )
        .with_code("CMP-RUN-002"));
    }
    Ok(items)
}

/// Tail temporarily cut from its predecessor; the link is restored on drop.
struct Detached<'a> {
    tail: &'a Stage,
    predecessor: Option<Stage>,
}

impl<'a> Detached<'a> {
    fn new(tail: &'a Stage) -> Self {
        Self {
            predecessor: tail.detach(),
            tail,
        }
    }

    /// Stages applied to each item before the driving thread finishes it. A
    /// writer is never part of it, so a lone writer leaves nothing to run.
    fn process(&self) -> Option<Stage> {
        match &self.predecessor {
            Some(predecessor) => Some(predecessor.clone()),
            None if self.tail.is_writer() => None,
            None => Some(self.tail.clone()),
        }
    }

    fn is_detached(&self) -> bool {
        self.predecessor.is_some()
    }
}

impl Drop for Detached<'_> {
    fn drop(&mut self) {
        if let Some(predecessor) = self.predecessor.take() {
            self.tail.reattach(predecessor);
        }
    }
}

struct WriterLog {
    sink: Box<dyn LogSink>,
    store: Arc<dyn DataStore>,
}

impl WriterLog {
    fn record(
        &mut self,
        identifier: &str,
        input_checksum: Option<String>,
        outcome: &Outcome,
    ) -> Result<(), AppError> {
        self.sink.log_message(identifier, "input")?;
        if let Some(checksum) = input_checksum {
            self.sink.log_message(&checksum, "input sha256sum")?;
        }
        match outcome {
            Outcome::Incomplete(record) => self.sink.log_message(
                &format!("{} : {}", record.origin, record.message),
                record.kind.as_str(),
            ),
            Outcome::Success(data) if !data.is_truthy() => self
                .sink
                .log_message(&format!("unexpected value {}", data.value), "FAIL"),
            Outcome::Success(data) => {
                let output = data.data_source().unwrap_or_else(|| data.value.to_string());
                self.sink.log_message(&output, "output")?;
                if let Some(checksum) = &data.checksum {
                    self.sink.log_message(checksum, "output sha256sum")?;
                }
                Ok(())
            }
        }
    }

    fn finish(mut self, started: Instant, cleanup: bool) -> Result<(), AppError> {
        let taken = humantime::format_duration(started.elapsed());
        self.sink.log_message(&taken.to_string(), "TIME TAKEN")?;
        self.sink.shutdown()?;
        if let Some(path) = self.sink.log_file_path() {
            self.store.add_file(path, cleanup, true)?;
        }
        self.store.close()?;
        Ok(())
    }
}

impl Stage {
    /// Run this chain over `inputs` with a default [`BatchRunner`].
    pub fn apply_to(
        &self,
        inputs: Vec<Data>,
        config: RunnerConfig,
    ) -> Result<Vec<Outcome>, AppError> {
        BatchRunner::new(config).run(self, inputs)
    }
}
