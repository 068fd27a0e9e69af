use composable::apps::{BuiltinApps, LoadText, MinLength, WriteJson};
use composable::backend::{DataStore, DirectoryDataStore, IfExists};
use composable::core::error::AppError;
use composable::core::pipeline::Stage;
use composable::core::registry::AppRegistry;
use composable::core::runner::{
    BatchRunner, Completed, ParallelConfig, ParallelExecutor, RunnerConfig, Task,
    ThreadPoolExecutor,
};
use composable::types::{Data, FailureKind, Outcome};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn write_inputs(dir: &Path, count: usize) -> Vec<Data> {
    (0..count)
        .map(|index| {
            let path = dir.join(format!("seq{}.txt", index));
            // every third input is too short
            let content = if index % 3 == 0 { "GA".to_string() } else { "GATTACA".repeat(index) };
            fs::write(&path, content).unwrap();
            Data::from(path)
        })
        .collect()
}

fn pipeline(store: Arc<dyn DataStore>) -> Stage {
    let registry = AppRegistry::new();
    let apps = BuiltinApps::register(&registry).unwrap();
    (apps.load_text.build(LoadText).unwrap()
        + apps.min_length.build(MinLength::new(5)).unwrap()
        + apps.write_json.build(WriteJson::new(store)).unwrap())
    .unwrap()
}

fn open_store(dir: &Path) -> Arc<dyn DataStore> {
    Arc::new(DirectoryDataStore::new(dir.join("out"), "json", true, IfExists::Skip).unwrap())
}

/// Outcomes keyed by the file stem they came from.
fn by_source(outcomes: &[Outcome]) -> BTreeMap<String, bool> {
    outcomes
        .iter()
        .map(|outcome| {
            let source = outcome.source().unwrap_or_default();
            let stem = composable::types::identifier_stem(&source);
            (stem, outcome.is_success())
        })
        .collect()
}

/// Runs items one at a time, newest first, remembering the order.
#[derive(Default)]
struct ReverseExecutor {
    seen: Mutex<Vec<String>>,
    workers: Mutex<Option<usize>>,
}

impl ParallelExecutor for ReverseExecutor {
    fn as_completed(
        &self,
        task: Task,
        items: Vec<(String, Data)>,
        config: ParallelConfig,
    ) -> Result<Completed, AppError> {
        *self.workers.lock().unwrap() = config.max_workers;
        let mut results = Vec::new();
        for (identifier, data) in items.into_iter().rev() {
            self.seen.lock().unwrap().push(identifier.clone());
            let result = task(&identifier, data);
            results.push((identifier, result));
        }
        Ok(Box::new(results.into_iter()))
    }
}

#[test]
fn test_parallel_matches_sequential() {
    let dir = TempDir::new().unwrap();
    let inputs = write_inputs(dir.path(), 9);

    let sequential_dir = TempDir::new().unwrap();
    let sequential = pipeline(open_store(sequential_dir.path()))
        .apply_to(inputs.clone(), RunnerConfig::default())
        .unwrap();

    let parallel_dir = TempDir::new().unwrap();
    let store = open_store(parallel_dir.path());
    let parallel = pipeline(Arc::clone(&store))
        .apply_to(
            inputs,
            RunnerConfig {
                parallel: true,
                max_workers: Some(3),
                ..RunnerConfig::default()
            },
        )
        .unwrap();

    assert_eq!(parallel.len(), 9);
    assert_eq!(by_source(&parallel), by_source(&sequential));
    assert_eq!(store.members().len(), 6);
    assert_eq!(store.incomplete().len(), 3);
}

#[test]
fn test_parallel_failures_keep_their_source() {
    let dir = TempDir::new().unwrap();
    let inputs = write_inputs(dir.path(), 6);
    let store = open_store(dir.path());

    let outcomes = pipeline(Arc::clone(&store))
        .apply_to(
            inputs,
            RunnerConfig {
                parallel: true,
                ..RunnerConfig::default()
            },
        )
        .unwrap();

    let mut failed: Vec<String> = outcomes
        .iter()
        .filter_map(Outcome::incomplete)
        .inspect(|record| assert_eq!(record.kind, FailureKind::Fail))
        .filter_map(|record| record.source.clone())
        .map(|source| composable::types::identifier_stem(&source))
        .collect();
    failed.sort();
    assert_eq!(failed, vec!["seq0", "seq3"]);

    let recorded: Vec<String> = store.incomplete().into_iter().map(|member| member.name).collect();
    assert_eq!(recorded, vec!["seq0", "seq3"]);
}

#[test]
fn test_custom_executor_order_is_preserved() {
    let dir = TempDir::new().unwrap();
    let inputs = write_inputs(dir.path(), 4);
    let store = open_store(dir.path());
    let chain = pipeline(Arc::clone(&store));
    let executor = Arc::new(ReverseExecutor::default());

    let outcomes = BatchRunner::new(RunnerConfig {
        parallel: true,
        max_workers: Some(2),
        ..RunnerConfig::default()
    })
    .with_executor(executor.clone())
    .run(&chain, inputs)
    .unwrap();

    assert_eq!(
        *executor.seen.lock().unwrap(),
        vec!["seq3", "seq2", "seq1", "seq0"]
    );
    assert_eq!(*executor.workers.lock().unwrap(), Some(2));
    let order: Vec<String> = outcomes
        .iter()
        .map(|outcome| composable::types::identifier_stem(&outcome.source().unwrap_or_default()))
        .collect();
    assert_eq!(order, vec!["seq3", "seq2", "seq1", "seq0"]);
    assert!(outcomes[3].is_incomplete());
    assert_eq!(chain.chain().len(), 3);
}

#[test]
fn test_sequential_run_does_not_use_executor() {
    let dir = TempDir::new().unwrap();
    let inputs = write_inputs(dir.path(), 3);
    let chain = pipeline(open_store(dir.path()));
    let executor = Arc::new(ReverseExecutor::default());

    BatchRunner::new(RunnerConfig::default())
        .with_executor(executor.clone())
        .run(&chain, inputs)
        .unwrap();
    assert!(executor.seen.lock().unwrap().is_empty());
}

#[test]
fn test_thread_pool_executor_runs_every_item() {
    let items: Vec<(String, Data)> = (0..20)
        .map(|index| (format!("item{}", index), Data::new("Count", index + 1)))
        .collect();
    let task: Task = Arc::new(|_identifier: &str, data: Data| {
        let n = data.value.as_i64().unwrap_or_default();
        Ok(Data::new("Count", n * 10).into())
    });

    let completed: Vec<_> = ThreadPoolExecutor::new()
        .as_completed(task, items, ParallelConfig { max_workers: Some(4) })
        .unwrap()
        .collect();

    assert_eq!(completed.len(), 20);
    let mut values: Vec<i64> = completed
        .iter()
        .map(|(_, result)| {
            result
                .as_ref()
                .unwrap()
                .success()
                .unwrap()
                .value
                .as_i64()
                .unwrap()
        })
        .collect();
    values.sort();
    assert_eq!(values, (1..=20).map(|n| n * 10).collect::<Vec<i64>>());
}
