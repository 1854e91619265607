// SPDX-License-Identifier: MIT

//! Writes file parts to disk.
//!
//! Content is streamed straight from the part window into a temporary file
//! next to the target and renamed into place once complete, so a partially
//! written file never appears under its final name.

use crate::error::AppError;
use glob::Pattern;
use log::{debug, error, info, warn};
use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

use crate::multipart::StreamWindow;

const TEMP_FILE_PREFIX: &str = ".partscan_";
const MAX_FILENAME_LENGTH: usize = 255;

/// Outcome of one saved file part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub original_name: String,
    pub saved_path: PathBuf,
    pub size: u64,
    pub renamed: bool,
}

#[derive(Debug)]
pub struct Extractor {
    target_dir: PathBuf,
    /// Allowed file extensions (glob patterns), empty allows all
    allowed_extensions: Vec<Pattern>,
}

impl Extractor {
    /// Creates the target directory if needed and compiles the extension globs.
    pub fn new<P: AsRef<Path>>(target_dir: P, allowed_extensions: &[String]) -> Result<Self, AppError> {
        let target_dir = target_dir.as_ref().to_path_buf();
        if !target_dir.exists() {
            fs::create_dir_all(&target_dir)?;
            info!("Created extraction directory: {}", target_dir.display());
        } else if !target_dir.is_dir() {
            return Err(AppError::invalid_configuration(format!(
                "Extraction target is not a directory: {}",
                target_dir.display()
            )));
        }

        let allowed_extensions = allowed_extensions
            .iter()
            .filter(|p| !p.is_empty() && p.as_str() != "*")
            .map(|p| Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            target_dir,
            allowed_extensions,
        })
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Checks a filename against the extension globs.
    pub fn is_allowed(&self, filename: &str) -> bool {
        self.allowed_extensions.is_empty()
            || self
                .allowed_extensions
                .iter()
                .any(|pattern| pattern.matches_path(Path::new(filename)))
    }

    /// Saves the remaining content of `value` under a sanitized `filename`.
    ///
    /// Returns `Ok(None)` when the name is unusable or the extension is not
    /// allowed. Only filesystem failures are errors.
    pub fn save<S: Read + Seek>(
        &self,
        filename: &str,
        value: &mut StreamWindow<'_, S>,
    ) -> Result<Option<ExtractedFile>, AppError> {
        let sanitized = match sanitize_filename(filename) {
            Ok(name) => name,
            Err(e) => {
                warn!("Skipping '{filename}': {e}");
                return Ok(None);
            }
        };
        if !self.is_allowed(&sanitized) {
            warn!("Skipping '{filename}': extension not allowed");
            return Ok(None);
        }

        let (final_name, renamed) = self.unique_filename(&sanitized)?;
        let target_path = self.target_dir.join(&final_name);
        let size = self.write_atomically(&target_path, value)?;

        info!("Extracted '{filename}' to {} ({size} bytes)", target_path.display());
        Ok(Some(ExtractedFile {
            original_name: filename.to_string(),
            saved_path: target_path,
            size,
            renamed,
        }))
    }

    fn unique_filename(&self, original: &str) -> Result<(String, bool), AppError> {
        if !self.target_dir.join(original).exists() {
            return Ok((original.to_string(), false));
        }

        let path = Path::new(original);
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        for i in 1..=9999 {
            let candidate = format!("{stem}_{i}{extension}");
            if !self.target_dir.join(&candidate).exists() {
                return Ok((candidate, true));
            }
        }

        Err(AppError::invalid_configuration(format!(
            "Unable to find a free name for '{original}' after 9999 attempts"
        )))
    }

    fn write_atomically<R: Read>(&self, target_path: &Path, content: &mut R) -> Result<u64, AppError> {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let temp_path = self.target_dir.join(format!(
            "{TEMP_FILE_PREFIX}{}_{nanos:x}.tmp",
            std::process::id()
        ));

        let written = (|| -> io::Result<u64> {
            let mut temp_file = File::create(&temp_path)?;
            let written = io::copy(content, &mut temp_file)?;
            temp_file.flush()?;
            temp_file.sync_all()?;
            Ok(written)
        })();

        let written = written.map_err(|e| {
            error!("Failed to write temporary file {}: {e}", temp_path.display());
            let _ = fs::remove_file(&temp_path);
            AppError::from(e)
        })?;

        fs::rename(&temp_path, target_path).map_err(|e| {
            error!(
                "Failed to rename {} to {}: {e}",
                temp_path.display(),
                target_path.display()
            );
            let _ = fs::remove_file(&temp_path);
            AppError::from(e)
        })?;

        debug!("Wrote {written} bytes to {}", target_path.display());
        Ok(written)
    }
}

/// Strip a client-supplied filename down to something safe to create.
///
/// Only the last path segment is kept (clients such as old IE send
/// `C:\Users\me\photo.jpg`), so the result never names another directory.
/// Other unsafe characters are dropped. Leading dots get a `file` prefix so
/// nothing lands hidden.
pub fn sanitize_filename(filename: &str) -> Result<String, AppError> {
    let segment = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if segment == "." || segment == ".." {
        return Err(AppError::invalid_multipart(format!(
            "Filename has no usable name: {filename}"
        )));
    }

    let sanitized: String = segment
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*'))
        .collect();

    if sanitized.trim().is_empty() {
        return Err(AppError::invalid_multipart(
            "Empty filename after sanitization",
        ));
    }
    if sanitized.len() > MAX_FILENAME_LENGTH {
        return Err(AppError::invalid_multipart(format!(
            "Filename too long: {} bytes",
            sanitized.len()
        )));
    }

    if sanitized.starts_with('.') {
        Ok(format!("file{sanitized}"))
    } else {
        Ok(sanitized)
    }
}
