// SPDX-License-Identifier: MIT

//! Part header parsing.
//!
//! A part window starts right after its boundary line and spans the header
//! block, the blank line and the content. Parsing consumes the header block
//! and pins the window so what remains is exactly the content.

use super::window::StreamWindow;
use log::{trace, warn};
use std::io::{self, Read, Seek};

const CONTENT_DISPOSITION: &[u8] = b"content-disposition";
const CONTENT_TYPE: &[u8] = b"content-type";

/// One decoded part of a multipart body.
#[derive(Debug)]
pub struct MultipartPart<'a, S> {
    /// `name` parameter of `Content-Disposition`, empty when absent
    pub name: String,
    /// `filename` parameter of `Content-Disposition`, empty when absent
    pub filename: String,
    /// Value of `Content-Type`, empty when absent
    pub content_type: String,
    value: StreamWindow<'a, S>,
}

impl<'a, S: Read + Seek> MultipartPart<'a, S> {
    /// Reads the header block from `window` and re-pins it at the first
    /// content byte. Missing or truncated headers leave fields empty; only
    /// stream I/O errors are returned.
    pub fn parse(mut window: StreamWindow<'a, S>) -> io::Result<Self> {
        let mut name = String::new();
        let mut filename = String::new();
        let mut content_type = String::new();
        let mut terminated = false;

        while let Some(line) = read_line(&mut window)? {
            if line.is_empty() {
                terminated = true;
                break;
            }
            trace!("Part header line: {line}");

            if starts_with_ignore_case(&line, CONTENT_DISPOSITION) {
                name = disposition_param(&line, "name").unwrap_or_default().to_string();
                filename = disposition_param(&line, "filename")
                    .unwrap_or_default()
                    .to_string();
            } else if starts_with_ignore_case(&line, CONTENT_TYPE) {
                content_type = header_value(&line)
                    .split_whitespace()
                    .last()
                    .unwrap_or_default()
                    .to_string();
            }
        }

        if !terminated {
            warn!(
                "Part at offset {} ended before its header block was terminated",
                window.start()
            );
        }

        window.pin_start_here();

        Ok(Self {
            name,
            filename,
            content_type,
            value: window,
        })
    }

    /// True when the part carries a filename, i.e. it is a file upload.
    pub fn is_file(&self) -> bool {
        !self.filename.is_empty()
    }

    /// The content window, positioned at content start.
    pub fn value(&mut self) -> &mut StreamWindow<'a, S> {
        &mut self.value
    }

    /// Consumes the part and hands back its content window.
    pub fn into_value(self) -> StreamWindow<'a, S> {
        self.value
    }

    /// Content length in bytes.
    pub fn len(&self) -> u64 {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Reads the remaining content into memory.
    pub fn read_to_bytes(&mut self) -> io::Result<Vec<u8>> {
        self.value.read_to_bytes()
    }

    /// Reads the remaining content as text, replacing invalid UTF-8.
    pub fn read_to_string_lossy(&mut self) -> io::Result<String> {
        let bytes = self.read_to_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Reads bytes up to and including LF, dropping the LF and one trailing CR.
/// Returns `None` only when the window is already exhausted.
fn read_line<S: Read + Seek>(window: &mut StreamWindow<'_, S>) -> io::Result<Option<String>> {
    let mut bytes = Vec::new();
    let mut saw_any = false;

    while let Some(byte) = window.read_byte()? {
        saw_any = true;
        if byte == b'\n' {
            break;
        }
        bytes.push(byte);
    }

    if !saw_any {
        return Ok(None);
    }
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    Ok(Some(decode_header_bytes(&bytes)))
}

/// Valid UTF-8 runs are kept as is; each invalid byte becomes the Latin-1
/// char of the same value, so nothing is dropped.
fn decode_header_bytes(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
        text.extend(chunk.invalid().iter().map(|&b| char::from(b)));
    }
    text
}

fn starts_with_ignore_case(line: &str, prefix: &[u8]) -> bool {
    let bytes = line.as_bytes();
    bytes.len() >= prefix.len() && bytes[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Text after the first colon, or the whole line when there is none.
fn header_value(line: &str) -> &str {
    line.split_once(':').map_or(line, |(_, value)| value)
}

/// Finds `key=value` in a Content-Disposition line. The key must sit at a
/// parameter boundary so `filename=` never satisfies a lookup for `name`.
/// Quoted values run to the closing quote; bare values stop at `;` or
/// whitespace.
fn disposition_param<'l>(line: &'l str, key: &str) -> Option<&'l str> {
    // ASCII lowercasing keeps byte offsets identical to `line`.
    let lower = line.to_ascii_lowercase();
    let bytes = line.as_bytes();

    for (at, _) in lower.match_indices(key) {
        let at_boundary = at == 0 || matches!(bytes[at - 1], b';' | b' ' | b'\t' | b':');
        if !at_boundary {
            continue;
        }

        let rest = line[at + key.len()..].trim_start();
        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };
        let rest = rest.trim_start();

        let value = match rest.strip_prefix('"') {
            Some(quoted) => quoted.split('"').next().unwrap_or_default(),
            None => rest
                .split(|c: char| c == ';' || c == '"' || c.is_whitespace())
                .next()
                .unwrap_or_default(),
        };
        return Some(value);
    }
    None
}
