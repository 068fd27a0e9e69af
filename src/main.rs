use clap::Parser;
use composable::cli::{self, Args};
use composable::logging;

#[tokio::main]
async fn main() -> composable::Result<()> {
    let args = Args::parse();
    let _guard = logging::init(&args.command)?;
    cli::run(args).await
}
