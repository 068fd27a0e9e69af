use crate::{
    apps::{BuiltinApps, LoadText, MinLength, WriteJson},
    cli::args::{RunArgs, ShowIncompleteArgs},
    core::{AppRegistry, ComposableConfig, ConfigLoader, ConfigValidator},
    Result,
};
use anyhow::Context;
use composable_backend::{compute_sha256_hex, DataStore, DirectoryDataStore};
use composable_types::{Data, NotCompleted, Outcome};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn resolve_workspace(workspace: Option<PathBuf>) -> Result<PathBuf> {
    match workspace {
        Some(path) => Ok(path),
        None => env::current_dir().context("failed to resolve current directory"),
    }
}

fn load_config(workspace: &Path, args: &RunArgs) -> Result<ComposableConfig> {
    let mut config = ConfigLoader::load_from_workspace(workspace)?;
    if args.parallel {
        config.runner.parallel = true;
    }
    if args.max_workers.is_some() {
        config.runner.max_workers = args.max_workers;
    }
    if args.cleanup {
        config.runner.cleanup = true;
    }
    if let Some(policy) = &args.if_exists {
        config.store.if_exists = policy.clone();
    }
    ConfigValidator::validate(&config)?;
    Ok(config)
}

/// Input record for a path, carrying the file's hash when it can be read.
fn input_data(path: &Path) -> Data {
    let data = Data::from(path);
    match fs::read(path) {
        Ok(bytes) => data.with_checksum(compute_sha256_hex(&bytes)),
        Err(_) => data,
    }
}

pub async fn run(args: RunArgs) -> Result<()> {
    let workspace = resolve_workspace(args.workspace.clone())?;
    let config = load_config(&workspace, &args)?;
    let policy = config.store.policy()?;

    let store: Arc<dyn DataStore> = Arc::new(DirectoryDataStore::new(
        args.out.clone(),
        &config.store.suffix,
        true,
        policy,
    )?);

    let registry = AppRegistry::new();
    let apps = BuiltinApps::register(&registry)?;
    let chain = (apps.load_text.build(LoadText)?
        + apps.min_length.build(MinLength::new(args.min_length))?
        + apps.write_json.build(WriteJson::new(Arc::clone(&store)))?)?;

    let inputs: Vec<Data> = args.inputs.iter().map(|path| input_data(path)).collect();
    let runner_config = config.runner_config();
    tracing::info!(chain = %chain, inputs = inputs.len(), "running pipeline");

    let outcomes = tokio::task::spawn_blocking(move || chain.apply_to(inputs, runner_config))
        .await
        .context("pipeline worker stopped unexpectedly")??;

    let incomplete: Vec<&NotCompleted> = outcomes.iter().filter_map(Outcome::incomplete).collect();
    println!(
        "Processed {} inputs: {} completed, {} incomplete",
        outcomes.len(),
        outcomes.len() - incomplete.len(),
        incomplete.len()
    );
    for record in incomplete {
        println!(
            "  {}\t{}\t{}\t{}",
            record.kind,
            record.origin,
            record.source.as_deref().unwrap_or("Unknown"),
            record.message
        );
    }
    println!("Output store: {}", store.source().display());
    Ok(())
}

pub async fn show_incomplete(args: ShowIncompleteArgs) -> Result<()> {
    let workspace = resolve_workspace(args.workspace.clone())?;
    let config = ConfigLoader::load_from_workspace(&workspace)?;
    let store = DirectoryDataStore::new(
        args.store.clone(),
        &config.store.suffix,
        false,
        config.store.policy()?,
    )?;

    let members = store.incomplete();
    if members.is_empty() {
        println!("No incomplete records in {}", args.store.display());
        return Ok(());
    }
    for member in members {
        let content = fs::read_to_string(&member.identifier)
            .with_context(|| format!("failed to read {}", member.identifier))?;
        let record = NotCompleted::from_json(&content)
            .with_context(|| format!("failed to parse {}", member.identifier))?;
        println!(
            "{}\t{}\t{}\t{}",
            record.kind,
            record.origin,
            record.source.as_deref().unwrap_or("Unknown"),
            record.message
        );
    }
    Ok(())
}
