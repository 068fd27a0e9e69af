pub mod args;
pub mod commands;

pub use args::{RunArgs, ShowIncompleteArgs};
use clap::{Parser, Subcommand};

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
PIPELINE COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "composable")]
#[command(version = crate::VERSION)]
#[command(about = "Type-checked linear processing pipelines with checkpointing")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: run a pipeline over a batch of inputs, then inspect the records of inputs that did not complete."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Load, filter and write a batch of text files",
        long_about = "Run composes load_text + min_length + write_json and applies it to every input, writing one JSON member per input into the output store together with a run log.",
        after_help = "Example:\n    composable run seqs/*.fasta --out results --min-length 10 --parallel"
    )]
    Run(RunArgs),
    #[command(
        about = "List inputs that did not complete",
        long_about = "ShowIncomplete prints every failure record stored in an output store: its kind, origin, source and message.",
        after_help = "Example:\n    composable show-incomplete results"
    )]
    ShowIncomplete(ShowIncompleteArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    match args.command {
        Command::Run(run_args) => commands::run(run_args).await,
        Command::ShowIncomplete(show_args) => commands::show_incomplete(show_args).await,
    }
}
