//! Routing of decoded parts into form fields and uploaded files.
//!
//! This is the glue a request handler puts in front of the decoder: pull the
//! boundary out of the `Content-Type` header, scan the body, then split parts
//! into text fields and file uploads.

use crate::error::AppError;
use crate::multipart::{MultipartPart, MultipartScanner, StreamWindow};
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Read, Seek};

const MIN_BOUNDARY_LENGTH: usize = 1;
const MAX_BOUNDARY_LENGTH: usize = 70; // RFC 2046 limit

/// Validate a boundary token against the RFC 2046 character set
pub fn validate_boundary(boundary: &str) -> Result<(), AppError> {
    if boundary.len() < MIN_BOUNDARY_LENGTH {
        return Err(AppError::invalid_multipart("Boundary too short"));
    }

    if boundary.len() > MAX_BOUNDARY_LENGTH {
        return Err(AppError::invalid_multipart("Boundary too long"));
    }

    if boundary.contains('\r') || boundary.contains('\n') {
        return Err(AppError::invalid_multipart("Boundary contains line breaks"));
    }

    if !boundary
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "'()+_,-./:=?".contains(c))
    {
        return Err(AppError::invalid_multipart(
            "Boundary contains invalid characters",
        ));
    }

    Ok(())
}

/// Extract the boundary token from a `multipart/form-data` Content-Type value
pub fn extract_boundary(content_type: &str) -> Result<String, AppError> {
    let mut params = content_type.split(';');
    let media_type = params.next().unwrap_or_default().trim();
    if !media_type.eq_ignore_ascii_case("multipart/form-data") {
        return Err(AppError::invalid_multipart("Not multipart/form-data"));
    }

    for param in params {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("boundary") {
            let boundary = value.trim().trim_matches('"');
            validate_boundary(boundary)?;
            return Ok(boundary.to_string());
        }
    }

    Err(AppError::invalid_multipart(
        "No boundary found in Content-Type",
    ))
}

/// A part that carried a filename.
#[derive(Debug)]
pub struct UploadedFile<'a, S> {
    pub content_type: String,
    pub filename: String,
    /// Form field name the file was submitted under
    pub key: String,
    pub value: StreamWindow<'a, S>,
}

/// Text fields and file uploads of one multipart body.
#[derive(Debug)]
pub struct FormData<'a, S> {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile<'a, S>>,
}

impl<'a, S: Read + Seek> FormData<'a, S> {
    /// Scan `body` for `boundary` and route every part.
    pub fn parse(body: &'a RefCell<S>, boundary: &str) -> Result<Self, AppError> {
        Self::collect(MultipartScanner::new(body, boundary)?)
    }

    /// Like [`FormData::parse`], taking the raw Content-Type header value.
    pub fn from_content_type(body: &'a RefCell<S>, content_type: &str) -> Result<Self, AppError> {
        let boundary = extract_boundary(content_type)?;
        Self::parse(body, &boundary)
    }

    /// Parts without a filename become fields (a repeated name keeps the
    /// last value); parts with one become files, in document order.
    pub fn collect<I>(parts: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = Result<MultipartPart<'a, S>, AppError>>,
    {
        let mut fields = HashMap::new();
        let mut files = Vec::new();

        for part in parts {
            let mut part = part?;
            if part.is_file() {
                debug!(
                    "File part '{}' ({}, {} bytes)",
                    part.filename,
                    part.content_type,
                    part.len()
                );
                let key = std::mem::take(&mut part.name);
                files.push(UploadedFile {
                    content_type: std::mem::take(&mut part.content_type),
                    filename: std::mem::take(&mut part.filename),
                    key,
                    value: part.into_value(),
                });
            } else {
                let text = part.read_to_string_lossy()?;
                debug!("Field part '{}' ({} bytes)", part.name, text.len());
                fields.insert(part.name, text);
            }
        }

        Ok(Self { fields, files })
    }

    /// Looks up a text field by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}
