use clean_pdf::browser::ChromeLauncher;
use clean_pdf::config::Args;
use clean_pdf::fetcher::{Fetcher, run_to_exit_status};
use clap::Parser;
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose { "warn,clean_pdf=debug" } else { "warn,clean_pdf=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {

    let args = Args::parse();
    init_logging(args.verbose);

    let fetcher = Fetcher::new(ChromeLauncher::default());

    ExitCode::from(run_to_exit_status(fetcher.run(&args)).await)
}
