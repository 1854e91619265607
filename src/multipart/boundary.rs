// SPDX-License-Identifier: MIT

//! Fixed-length boundary matcher.
//!
//! Boundary lines in a multipart body are always LF-terminated and have a
//! length known before scanning starts, so instead of a general substring
//! search the matcher keeps a buffer exactly as long as the marker and the
//! scanner realigns it after every LF or every full-buffer miss.

/// Builds the part separator `--token\r\n`.
pub fn boundary_marker(token: &str) -> Vec<u8> {
    let mut marker = Vec::with_capacity(token.len() + 4);
    marker.extend_from_slice(b"--");
    marker.extend_from_slice(token.as_bytes());
    marker.extend_from_slice(b"\r\n");
    marker
}

/// Builds the closing delimiter `--token--`. Same length as the marker.
pub fn closing_marker(token: &str) -> Vec<u8> {
    let mut marker = Vec::with_capacity(token.len() + 4);
    marker.extend_from_slice(b"--");
    marker.extend_from_slice(token.as_bytes());
    marker.extend_from_slice(b"--");
    marker
}

/// Rolling buffer compared byte-for-byte against a boundary marker.
#[derive(Debug)]
pub struct BoundaryMatcher {
    marker: Box<[u8]>,
    closing: Box<[u8]>,
    buffer: Box<[u8]>,
    position: usize,
}

impl BoundaryMatcher {
    /// Creates a matcher for `token`, sized to `--token\r\n`.
    pub fn new(token: &str) -> Self {
        let marker = boundary_marker(token).into_boxed_slice();
        let closing = closing_marker(token).into_boxed_slice();
        let buffer = vec![0u8; marker.len()].into_boxed_slice();
        Self {
            marker,
            closing,
            buffer,
            position: 0,
        }
    }

    /// Marker length `L`.
    pub fn len(&self) -> usize {
        self.marker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// Appends one byte. Returns `false` and drops the byte when the buffer
    /// is already full; callers reset once `is_full` turns true.
    pub fn insert(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.buffer[self.position] = byte;
        self.position += 1;
        true
    }

    pub fn is_full(&self) -> bool {
        self.position == self.buffer.len()
    }

    /// True when the buffer holds exactly `--token\r\n`.
    pub fn is_boundary(&self) -> bool {
        self.is_full() && *self.buffer == *self.marker
    }

    /// True when the buffer holds exactly `--token--`.
    pub fn is_closing_boundary(&self) -> bool {
        self.is_full() && *self.buffer == *self.closing
    }

    /// Empties the buffer logically. Old bytes stay until overwritten.
    pub fn reset(&mut self) {
        self.position = 0;
    }
}
