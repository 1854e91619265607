//! Body inspection behind the `partscan` binary.

use crate::config::Config;
use crate::error::AppError;
use crate::extract::{ExtractedFile, Extractor};
use crate::multipart::MultipartScanner;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, info, warn};
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// What one part looked like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSummary {
    pub index: usize,
    pub name: String,
    pub filename: String,
    pub content_type: String,
    pub len: u64,
    /// Base64 of the first content bytes, empty when previews are off
    pub preview: String,
    pub extracted: Option<ExtractedFile>,
}

impl PartSummary {
    /// One-line rendering used by the CLI.
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "#{} name={:?} filename={:?} type={:?} bytes={}",
            self.index, self.name, self.filename, self.content_type, self.len
        );
        if !self.preview.is_empty() {
            line.push_str(&format!(" preview={}", self.preview));
        }
        if let Some(ref extracted) = self.extracted {
            line.push_str(&format!(" saved={}", extracted.saved_path.display()));
        }
        line
    }
}

/// Scans one body and summarises every part. File parts are handed to
/// `extractor` when one is given.
pub fn inspect_body<S: Read + Seek>(
    body: &RefCell<S>,
    boundary: &str,
    preview_bytes: usize,
    extractor: Option<&Extractor>,
) -> Result<Vec<PartSummary>, AppError> {
    let mut summaries = Vec::new();

    for (index, part) in MultipartScanner::new(body, boundary)?.into_iter().enumerate() {
        let mut part = part?;

        let preview = if preview_bytes > 0 {
            let value = part.value();
            let mut head = Vec::with_capacity(preview_bytes);
            Read::take(&mut *value, preview_bytes as u64).read_to_end(&mut head)?;
            value.seek(SeekFrom::Start(0))?;
            STANDARD.encode(&head)
        } else {
            String::new()
        };

        let extracted = match extractor {
            Some(extractor) if part.is_file() => {
                let filename = part.filename.clone();
                extractor.save(&filename, part.value())?
            }
            _ => None,
        };

        summaries.push(PartSummary {
            index,
            len: part.len(),
            name: part.name,
            filename: part.filename,
            content_type: part.content_type,
            preview,
            extracted,
        });
    }

    if summaries.is_empty() {
        warn!("No parts found for boundary '{boundary}'");
    }
    Ok(summaries)
}

/// Expands body arguments: existing paths pass through, anything else is
/// treated as a glob pattern that must match at least one file.
pub fn expand_bodies(patterns: &[String]) -> Result<Vec<PathBuf>, AppError> {
    let mut paths = Vec::new();

    for pattern in patterns {
        if Path::new(pattern).is_file() {
            paths.push(PathBuf::from(pattern));
            continue;
        }

        let before = paths.len();
        for entry in glob::glob(pattern)? {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable match for '{pattern}': {e}"),
            }
        }
        if paths.len() == before {
            return Err(AppError::NotFound(pattern.clone()));
        }
    }

    Ok(paths)
}

/// Inspects every configured body, printing one line per part.
pub fn run_inspection(config: &Config) -> Result<(), AppError> {
    let extractor = match config.extract_dir {
        Some(ref dir) => Some(Extractor::new(dir, &config.allowed_extensions)?),
        None => None,
    };

    for path in expand_bodies(&config.bodies)? {
        info!("Inspecting {}", path.display());
        let body = RefCell::new(BufReader::new(File::open(&path)?));
        let summaries = inspect_body(
            &body,
            &config.boundary,
            config.preview_bytes,
            extractor.as_ref(),
        )?;

        println!("{} ({} parts)", path.display(), summaries.len());
        for summary in &summaries {
            println!("  {}", summary.to_line());
        }
        debug!("Finished {}", path.display());
    }

    Ok(())
}
