use clap::Parser;
use handlergen::cli::{run_cli, Cli};
use handlergen::logging::init_logging_with_config;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging_with_config(&cli.log_config()) {
        eprintln!("Warning: {e:#}");
    }

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
