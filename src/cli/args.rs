use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Text files to process
    #[arg(value_name = "INPUTS", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory of the output store (created when missing)
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,

    /// Inputs shorter than this many characters are recorded as failures
    #[arg(long, default_value = "1")]
    pub min_length: usize,

    /// Process inputs on a worker pool
    #[arg(long, help_heading = "Execution")]
    pub parallel: bool,

    /// Worker pool size (default: number of CPUs)
    #[arg(long, value_name = "N", help_heading = "Execution")]
    pub max_workers: Option<usize>,

    /// Policy for outputs that already exist: skip, ignore, raise, overwrite
    #[arg(long, value_name = "POLICY", help_heading = "Execution")]
    pub if_exists: Option<String>,

    /// Remove the run log once it has been copied into the store
    #[arg(long, help_heading = "Execution")]
    pub cleanup: bool,

    /// Workspace holding composable.toml and .composable/ (default: current directory)
    #[arg(long, value_name = "PATH")]
    pub workspace: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowIncompleteArgs {
    /// Directory of the output store
    #[arg(value_name = "DIR")]
    pub store: PathBuf,

    /// Workspace holding composable.toml and .composable/ (default: current directory)
    #[arg(long, value_name = "PATH")]
    pub workspace: Option<PathBuf>,
}
