// SPDX-License-Identifier: MIT

//! Streaming multipart/form-data decoder
//!
//! The decoder makes a single forward pass over a seekable request body,
//! locating `--token\r\n` boundary lines and exposing every part as a
//! [`StreamWindow`] into the original body. No part content is copied.
//!
//! # Example
//! ```rust,no_run
//! use partscan::multipart::MultipartScanner;
//! use std::cell::RefCell;
//! use std::io::Cursor;
//!
//! fn list_parts() -> Result<(), Box<dyn std::error::Error>> {
//!     let body = RefCell::new(Cursor::new(b"--XyZ\r\n\
//!         Content-Disposition: form-data; name=\"field\"\r\n\
//!         \r\n\
//!         value\r\n\
//!         --XyZ--\r\n".to_vec()));
//!
//!     for part in MultipartScanner::new(&body, "XyZ")? {
//!         let mut part = part?;
//!         let value = part.read_to_string_lossy()?;
//!         println!("{} = {value}", part.name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Boundary lines are matched with a fixed-length buffer that realigns after
//! every LF and every full-buffer miss, so a boundary line is only recognised
//! when it starts right after a line break (or at the start of the scan).
//! Every boundary line in a conforming body satisfies this.

pub mod boundary;
pub mod part;
pub mod window;

pub use boundary::BoundaryMatcher;
pub use part::MultipartPart;
pub use window::StreamWindow;

use crate::error::AppError;
use log::debug;
use std::cell::RefCell;
use std::io::{self, Read, Seek, SeekFrom};

/// Bytes of the CRLF that precedes a boundary line and belongs to it.
const DELIMITER_CRLF_LEN: u64 = 2;

/// Outcome of one boundary search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoundaryHit {
    /// `--token\r\n` ending at this absolute offset.
    Separator(u64),
    /// `--token--` ending at this absolute offset.
    Closing(u64),
    /// End of stream without a match.
    NotFound,
}

/// Locates part boundaries in a body stream it borrows but does not own.
pub struct MultipartScanner<'a, S> {
    stream: &'a RefCell<S>,
    matcher: BoundaryMatcher,
    /// Absolute offset the next boundary search resumes from.
    scan_offset: u64,
    stream_len: u64,
}

impl<'a, S: Read + Seek> MultipartScanner<'a, S> {
    /// Prepares a scan of `stream` from its current position for parts
    /// separated by `--token\r\n`.
    pub fn new(stream: &'a RefCell<S>, token: &str) -> Result<Self, AppError> {
        let (scan_offset, stream_len) = {
            let mut body = stream
                .try_borrow_mut()
                .map_err(|_| AppError::invalid_multipart("body stream is already borrowed"))?;
            let offset = body.stream_position()?;
            let len = body.seek(SeekFrom::End(0))?;
            body.seek(SeekFrom::Start(offset))?;
            (offset, len)
        };

        debug!(
            "Scanning {} byte body from offset {scan_offset} for boundary '{token}'",
            stream_len
        );

        Ok(Self {
            stream,
            matcher: BoundaryMatcher::new(token),
            scan_offset,
            stream_len,
        })
    }

    /// Length of the boundary marker `--token\r\n`.
    pub fn marker_len(&self) -> usize {
        self.matcher.len()
    }

    /// Lazy, single-pass sequence of the body's parts in document order.
    pub fn parts(self) -> Parts<'a, S> {
        Parts {
            scanner: self,
            current_start: None,
            started: false,
            finished: false,
        }
    }

    /// Reads forward one byte at a time until a boundary line completes.
    fn find_next_boundary(&mut self) -> io::Result<BoundaryHit> {
        self.matcher.reset();

        let stream = self.stream;
        let mut body = stream
            .try_borrow_mut()
            .map_err(|_| io::Error::other("body stream is already being read"))?;
        window::reposition(&mut *body, self.scan_offset)?;

        let mut byte = [0u8; 1];
        loop {
            if body.read(&mut byte)? == 0 {
                self.scan_offset = self.stream_len.max(self.scan_offset);
                return Ok(BoundaryHit::NotFound);
            }
            self.scan_offset += 1;

            self.matcher.insert(byte[0]);
            if self.matcher.is_full() {
                if self.matcher.is_boundary() {
                    return Ok(BoundaryHit::Separator(self.scan_offset));
                }
                if self.matcher.is_closing_boundary() {
                    return Ok(BoundaryHit::Closing(self.scan_offset));
                }
            }
            if byte[0] == b'\n' || self.matcher.is_full() {
                self.matcher.reset();
            }
        }
    }

    /// Absolute end of the content that precedes a delimiter ending at
    /// `hit_end`: the marker and its leading CRLF are excluded.
    fn content_end(&self, hit_end: u64) -> u64 {
        hit_end.saturating_sub(self.marker_len() as u64 + DELIMITER_CRLF_LEN)
    }
}

impl<'a, S: Read + Seek> IntoIterator for MultipartScanner<'a, S> {
    type Item = Result<MultipartPart<'a, S>, AppError>;
    type IntoIter = Parts<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts()
    }
}

/// Single-pass iterator over the parts of one body.
///
/// Parts share the body's cursor, so it cannot be cloned or restarted. A part
/// may be read before or after later parts are pulled; reads from different
/// parts must not overlap in time.
pub struct Parts<'a, S> {
    scanner: MultipartScanner<'a, S>,
    /// Absolute offset right after the boundary line that opened the pending part.
    current_start: Option<u64>,
    started: bool,
    finished: bool,
}

impl<'a, S: Read + Seek> Parts<'a, S> {
    fn next_window(&mut self) -> io::Result<Option<StreamWindow<'a, S>>> {
        if !self.started {
            self.started = true;
            self.current_start = match self.scanner.find_next_boundary()? {
                BoundaryHit::Separator(offset) => Some(offset),
                BoundaryHit::Closing(_) | BoundaryHit::NotFound => {
                    debug!("No opening boundary found");
                    None
                }
            };
        }

        let Some(start) = self.current_start else {
            return Ok(None);
        };

        let (end, next_start) = match self.scanner.find_next_boundary()? {
            BoundaryHit::Separator(offset) => (self.scanner.content_end(offset), Some(offset)),
            BoundaryHit::Closing(offset) => (self.scanner.content_end(offset), None),
            BoundaryHit::NotFound => {
                if start >= self.scanner.stream_len {
                    // A boundary line at the very end opens nothing.
                    self.current_start = None;
                    return Ok(None);
                }
                (self.scanner.stream_len, None)
            }
        };
        self.current_start = next_start;

        debug!("Found part spanning bytes {start}..{}", end.max(start));
        Ok(Some(StreamWindow::new(self.scanner.stream, start, end)))
    }
}

impl<'a, S: Read + Seek> Iterator for Parts<'a, S> {
    type Item = Result<MultipartPart<'a, S>, AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = self
            .next_window()
            .and_then(|window| window.map(MultipartPart::parse).transpose());

        match result {
            Ok(Some(part)) => Some(Ok(part)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(AppError::Io(e)))
            }
        }
    }
}

impl<'a, S: Read + Seek> std::iter::FusedIterator for Parts<'a, S> {}
