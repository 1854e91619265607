//! Configuration management for partscan
//! Supports INI files with CLI argument overrides

pub mod ini_parser;

use crate::cli::Cli;
use crate::error::AppError;
use crate::form::{extract_boundary, validate_boundary};
use ini_parser::{IniConfig, split_list};
use std::path::{Path, PathBuf};

const DEFAULT_PREVIEW_BYTES: usize = 64;

#[derive(Debug, Clone)]
pub struct Config {
    // Input
    pub bodies: Vec<String>,
    pub boundary: String,

    // Output
    pub preview_bytes: usize,
    pub extract_dir: Option<PathBuf>,
    pub allowed_extensions: Vec<String>,

    // Logging settings
    pub verbose: bool,
    pub detailed_logging: bool,
}

impl Config {
    /// Load configuration with precedence: CLI args > INI file > Defaults
    pub fn load(cli: &Cli) -> Result<Self, AppError> {
        let ini = match Self::find_config_file(cli)? {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                IniConfig::load_file(&path)?
            }
            None => {
                log::info!("No configuration file found, using defaults and CLI overrides");
                IniConfig::new()
            }
        };

        Ok(Self {
            bodies: cli.bodies.clone(),
            boundary: Self::get_boundary(&ini, cli)?,

            preview_bytes: Self::get_preview_bytes(&ini, cli),
            extract_dir: Self::get_extract_dir(&ini, cli),
            allowed_extensions: Self::get_allowed_extensions(&ini, cli),

            verbose: Self::get_verbose(&ini, cli),
            detailed_logging: Self::get_detailed_logging(&ini, cli),
        })
    }

    /// Find configuration file in order of preference
    fn find_config_file(cli: &Cli) -> Result<Option<PathBuf>, AppError> {
        // 1. Explicit --config-file
        if let Some(ref config_path) = cli.config_file {
            let path = PathBuf::from(config_path);
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(AppError::invalid_configuration(format!(
                "Config file specified but not found: {config_path}"
            )));
        }

        // 2. Current directory
        let current_config = PathBuf::from("partscan.ini");
        if current_config.exists() {
            return Ok(Some(current_config));
        }

        // 3. User config directory (~/.config/partscan/config.ini)
        if let Some(home_dir) = std::env::var_os("HOME") {
            let user_config = Path::new(&home_dir)
                .join(".config")
                .join("partscan")
                .join("config.ini");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // 4. System config (Unix-like systems)
        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/partscan/config.ini");
            if system_config.exists() {
                return Ok(Some(system_config));
            }
        }

        Ok(None)
    }

    // Configuration value getters with precedence: CLI > INI > Default

    fn get_boundary(ini: &IniConfig, cli: &Cli) -> Result<String, AppError> {
        // CLI argument, either form
        if let Some(ref boundary) = cli.boundary {
            validate_boundary(boundary)?;
            return Ok(boundary.clone());
        }
        if let Some(ref content_type) = cli.content_type {
            return extract_boundary(content_type);
        }

        // INI file
        if let Some(boundary) = ini.get_string("scan", "boundary") {
            validate_boundary(&boundary)?;
            return Ok(boundary);
        }
        if let Some(content_type) = ini.get_string("scan", "content_type") {
            return extract_boundary(&content_type);
        }

        // No sensible default exists
        Err(AppError::invalid_configuration(
            "No boundary given: pass --boundary or --content-type, or set [scan] boundary",
        ))
    }

    fn get_preview_bytes(ini: &IniConfig, cli: &Cli) -> usize {
        if let Some(preview) = cli.preview_bytes {
            return preview;
        }

        if let Some(preview) = ini.get_size("scan", "preview_bytes") {
            return usize::try_from(preview).unwrap_or(usize::MAX).min(4096);
        }

        DEFAULT_PREVIEW_BYTES
    }

    fn get_extract_dir(ini: &IniConfig, cli: &Cli) -> Option<PathBuf> {
        if let Some(ref dir) = cli.extract_dir {
            return Some(dir.clone());
        }

        ini.get_string("extract", "directory").map(PathBuf::from)
    }

    fn get_allowed_extensions(ini: &IniConfig, cli: &Cli) -> Vec<String> {
        if let Some(ref extensions) = cli.allowed_extensions {
            return split_list(extensions);
        }

        // INI file; empty means every extension is allowed
        ini.get_list("extract", "allowed_extensions")
    }

    fn get_verbose(ini: &IniConfig, cli: &Cli) -> bool {
        cli.verbose
            .or_else(|| ini.get_bool("logging", "verbose"))
            .unwrap_or(false)
    }

    fn get_detailed_logging(ini: &IniConfig, cli: &Cli) -> bool {
        cli.detailed_logging
            .or_else(|| ini.get_bool("logging", "detailed"))
            .unwrap_or(false)
    }

    /// Log level derived from the logging switches
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.detailed_logging {
            "info"
        } else {
            "warn"
        }
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        log::info!("Configuration Summary:");
        log::info!("  Bodies: {:?}", self.bodies);
        log::info!("  Boundary: {}", self.boundary);
        log::info!("  Preview Bytes: {}", self.preview_bytes);
        match self.extract_dir {
            Some(ref dir) => {
                log::info!("  Extract Directory: {}", dir.display());
                log::info!("  Allowed Extensions: {:?}", self.allowed_extensions);
            }
            None => log::info!("  Extraction: Disabled"),
        }
        log::info!("  Verbose Logging: {}", self.verbose);
        log::info!("  Detailed Logging: {}", self.detailed_logging);
    }
}
