use clap::Parser;
use std::process::ExitCode;
use tidysort::cli::{Cli, CliError, run_cli};
use tidysort::logging;
use tidysort::output::OutputFormatter;
use tracing_subscriber::filter::LevelFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    // Per-file problems are already shown by the report, keep stderr for the rest
    let _guard = logging::init(&cli.log_file, LevelFilter::ERROR)?;
    run_cli(cli)
}
