use crate::error::AppError;
use clap::Parser;
use log::warn;
use std::path::PathBuf;

/// Command-line interface for the multipart body inspector.
#[derive(Parser, Clone, Debug)]
#[command(
    name = "partscan",
    version,
    about = "Inspect captured multipart/form-data bodies part by part.",
    long_about = "Scans one or more captured multipart/form-data request bodies and lists every part with its field name, filename, content type and size.\n Part content is read in place from the body file and never buffered whole.\n File parts can optionally be extracted to a directory, filtered by extension globs."
)]
pub struct Cli {
    /// Body files or glob patterns (e.g. "captures/*.bin")
    #[arg(required = true)]
    pub bodies: Vec<String>,

    /// Boundary token, without the leading dashes
    #[arg(short, long, conflicts_with = "content_type")]
    pub boundary: Option<String>,

    /// Full Content-Type header value to take the boundary from
    #[arg(short = 't', long)]
    pub content_type: Option<String>,

    /// Directory to write file parts into
    #[arg(short = 'x', long)]
    pub extract_dir: Option<PathBuf>,

    /// Extensions allowed for extraction (comma-separated globs like *.png,*.pdf)
    #[arg(short, long)]
    pub allowed_extensions: Option<String>,

    /// Number of content bytes shown (base64) per part; 0 disables previews
    #[arg(short, long, value_parser = validate_preview_bytes)]
    pub preview_bytes: Option<usize>,

    /// Enable verbose logging (log level: debug)
    #[arg(short, long)]
    pub verbose: Option<bool>,

    /// Enable more detailed logging (log level: info)
    #[arg(long)]
    pub detailed_logging: Option<bool>,

    /// Configuration file path (INI). Defaults to ./partscan.ini or ~/.config/partscan/config.ini
    #[arg(long, value_parser = validate_config_file)]
    pub config_file: Option<String>,
}

/// Preview sizes are capped so one line per part stays readable
fn validate_preview_bytes(s: &str) -> Result<usize, String> {
    let size: usize = s
        .parse()
        .map_err(|_| "Preview size must be a non-negative number".to_string())?;

    if size > 4096 {
        return Err("Preview size must not exceed 4096 bytes".to_string());
    }

    Ok(size)
}

/// Validate config file path exists and is readable
fn validate_config_file(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("Config file path cannot be empty".to_string());
    }

    let path = PathBuf::from(s);

    if !path.exists() {
        return Err(format!("Config file does not exist: {s}"));
    }

    if !path.is_file() {
        return Err(format!("Config path is not a file: {s}"));
    }

    match std::fs::File::open(&path) {
        Ok(_) => Ok(s.to_string()),
        Err(e) => Err(format!("Cannot read config file {s}: {e}")),
    }
}

impl Cli {
    /// Validate option combinations clap cannot express
    pub fn validate(&self) -> Result<(), AppError> {
        if self.allowed_extensions.is_some() && self.extract_dir.is_none() {
            warn!("--allowed-extensions has no effect without --extract-dir");
        }

        if let Some(ref dir) = self.extract_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(AppError::invalid_configuration(format!(
                    "Extraction target is not a directory: {}",
                    dir.display()
                )));
            }
        }

        Ok(())
    }
}
