/// # partscan
///
/// A zero-copy multipart/form-data decoder. The `multipart` module scans a
/// seekable request body for boundary lines and exposes every part as a
/// read-only window into the body; `form` routes parts into fields and files.
///
/// The `run` function drives the `partscan` inspector binary.
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod form;
pub mod inspect;
pub mod multipart;

use crate::cli::Cli;
use crate::config::Config;
use clap::Parser;
use log::error;

/// Parses command-line arguments, loads configuration, initializes the
/// logger and inspects every requested body. Exits non-zero on failure.
pub fn run() {
    let cli = Cli::parse();

    // Load configuration with precedence: CLI > INI > Defaults
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    let log_level = config.log_level();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    log::debug!("Log level set to: {log_level}");

    if config.verbose {
        config.print_summary();
    }

    if let Err(e) = cli.validate() {
        error!("Configuration validation error: {e}");
        std::process::exit(1);
    }

    if let Err(e) = inspect::run_inspection(&config) {
        error!("Inspection failed: {e}");
        std::process::exit(1);
    }
}
