mod cli;
mod commands;
mod config;
mod progress;

use std::process::ExitCode;

use audit_logging::{audit_error, level_for_verbosity, LogDestination};
use clap::Parser;

use crate::cli::Cli;
use crate::config::AppConfig;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let destination = match &cli.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    if !audit_logging::initialize(destination, level_for_verbosity(cli.verbose)) {
        eprintln!("warning: logging could not be initialized");
    }

    // A missing .env is normal; passwords may already be exported.
    let _ = dotenvy::dotenv();

    let result = AppConfig::load(&cli.config).and_then(|config| commands::run(cli, config));
    match result {
        Ok(code) => code,
        Err(err) => {
            audit_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
