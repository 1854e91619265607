// SPDX-License-Identifier: MIT

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum AppError {
    Io(io::Error),
    Glob(glob::PatternError),
    NotFound(String),
    // Decoder errors
    InvalidSeek { target: i128, len: u64 }, // Window-relative target that fell outside [0, len]
    InvalidMultipart(String),               // Contains the reason the body or header was rejected
    InvalidConfiguration(String),           // Contains configuration error details
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "IO error: {err}"),
            AppError::Glob(err) => write!(f, "Glob pattern error: {err}"),
            AppError::NotFound(what) => write!(f, "Not found: {what}"),
            AppError::InvalidSeek { target, len } => {
                write!(
                    f,
                    "Invalid seek to {target}: window position must stay within 0..={len}"
                )
            }
            AppError::InvalidMultipart(msg) => write!(f, "Invalid multipart data: {msg}"),
            AppError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<glob::PatternError> for AppError {
    fn from(err: glob::PatternError) -> Self {
        AppError::Glob(err)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Glob(err) => Some(err),
            _ => None,
        }
    }
}

impl AppError {
    /// Creates an InvalidMultipart error
    pub fn invalid_multipart<S: Into<String>>(msg: S) -> Self {
        AppError::InvalidMultipart(msg.into())
    }

    /// Creates an InvalidConfiguration error
    pub fn invalid_configuration<S: Into<String>>(msg: S) -> Self {
        AppError::InvalidConfiguration(msg.into())
    }

    /// Creates an InvalidSeek error for a window of `len` bytes
    pub fn invalid_seek(target: i128, len: u64) -> Self {
        AppError::InvalidSeek { target, len }
    }

    /// Wraps the error in an `io::Error` so it can cross `Read`/`Seek` boundaries.
    ///
    /// Seek violations map to `InvalidInput`; everything else to `Other`.
    pub fn into_io(self) -> io::Error {
        match self {
            AppError::Io(err) => err,
            err @ AppError::InvalidSeek { .. } => io::Error::new(io::ErrorKind::InvalidInput, err),
            err => io::Error::other(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = [
            AppError::invalid_seek(-1, 10),
            AppError::invalid_multipart("missing boundary"),
            AppError::invalid_configuration("bad size"),
            AppError::NotFound("body.bin".to_string()),
        ];

        let expected = [
            "Invalid seek to -1: window position must stay within 0..=10",
            "Invalid multipart data: missing boundary",
            "Invalid configuration: bad size",
            "Not found: body.bin",
        ];

        for (error, expected_msg) in errors.iter().zip(expected.iter()) {
            assert_eq!(error.to_string(), *expected_msg);
        }
    }

    #[test]
    fn test_into_io_kinds() {
        let seek = AppError::invalid_seek(11, 10).into_io();
        assert_eq!(seek.kind(), io::ErrorKind::InvalidInput);
        assert!(seek.to_string().contains("Invalid seek to 11"));

        let other = AppError::invalid_multipart("x").into_io();
        assert_eq!(other.kind(), io::ErrorKind::Other);

        let passthrough =
            AppError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "eof")).into_io();
        assert_eq!(passthrough.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_error_trait_implementation() {
        let error = AppError::from(io::Error::other("boom"));
        let dyn_error: &dyn std::error::Error = &error;
        assert!(dyn_error.source().is_some());
    }
}
