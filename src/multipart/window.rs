// SPDX-License-Identifier: MIT

//! Read-only windows over a shared body stream.
//!
//! A [`StreamWindow`] covers the absolute range `[start, end)` of a stream it
//! does not own. Every window created from one body borrows the same
//! `RefCell`, so the stream cursor is shared: each read repositions the
//! cursor first and never assumes it was left where this window put it.

use crate::error::AppError;
use std::cell::RefCell;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

pub struct StreamWindow<'a, S> {
    stream: &'a RefCell<S>,
    start: u64,
    end: u64,
    position: u64,
}

impl<'a, S: Read + Seek> StreamWindow<'a, S> {
    /// Creates a window over `[start, end)`. `end` below `start` is clamped to
    /// an empty window.
    pub fn new(stream: &'a RefCell<S>, start: u64, end: u64) -> Self {
        let end = end.max(start);
        Self {
            stream,
            start,
            end,
            position: start,
        }
    }

    /// Number of bytes covered by the window.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Window-relative read position.
    pub fn position(&self) -> u64 {
        self.position - self.start
    }

    /// Absolute offset of the first byte in the underlying stream.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Absolute offset one past the last byte in the underlying stream.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Bytes left between the read position and the end of the window.
    pub fn remaining(&self) -> u64 {
        self.end - self.position
    }

    /// Moves `start` to the current read position. Bytes before it become
    /// unreachable and `position()` reads 0 again.
    pub fn pin_start_here(&mut self) {
        self.start = self.position;
    }

    /// Reads a single byte, `Ok(None)` at the end of the window.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Reads the rest of the window into a fresh buffer.
    pub fn read_to_bytes(&mut self) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(self.remaining() as usize);
        self.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn borrow_stream(&self) -> io::Result<std::cell::RefMut<'a, S>> {
        self.stream
            .try_borrow_mut()
            .map_err(|_| io::Error::other("body stream is already being read"))
    }
}

/// Moves `stream` to the absolute offset `target` unless it is already there.
/// Skipping the redundant seek keeps buffered readers from dropping their buffer.
pub(crate) fn reposition<S: Seek + ?Sized>(stream: &mut S, target: u64) -> io::Result<()> {
    if stream.stream_position()? != target {
        stream.seek(SeekFrom::Start(target))?;
    }
    Ok(())
}

impl<S: Read + Seek> Read for StreamWindow<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let count = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));

        let mut stream = self.borrow_stream()?;
        reposition(&mut *stream, self.position)?;
        let read = stream.read(&mut buf[..count])?;

        if read == 0 {
            // The stream is shorter than the window claimed.
            self.position = self.end;
        } else {
            self.position += read as u64;
        }
        Ok(read)
    }
}

impl<S: Read + Seek> Seek for StreamWindow<'_, S> {
    /// Seeks within the window. Targets below 0 or past `len()` are rejected
    /// with `InvalidInput`.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = i128::from(self.len());
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(offset) => i128::from(self.position()) + i128::from(offset),
            SeekFrom::End(offset) => len + i128::from(offset),
        };

        if target < 0 || target > len {
            return Err(AppError::invalid_seek(target, self.len()).into_io());
        }

        // In range, so it fits the window's u64 span.
        self.position = self.start + target as u64;
        Ok(self.position())
    }
}

impl<S> fmt::Debug for StreamWindow<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamWindow")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("position", &self.position)
            .finish()
    }
}
