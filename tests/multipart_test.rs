// SPDX-License-Identifier: MIT

use partscan::error::AppError;
use partscan::multipart::{MultipartPart, MultipartScanner, StreamWindow};
use std::cell::RefCell;
use std::io::{Cursor, Read, Seek, SeekFrom};

type Body = RefCell<Cursor<Vec<u8>>>;

fn body(bytes: Vec<u8>) -> Body {
    RefCell::new(Cursor::new(bytes))
}

fn collect_parts<'a>(
    body: &'a Body,
    boundary: &str,
) -> Vec<MultipartPart<'a, Cursor<Vec<u8>>>> {
    MultipartScanner::new(body, boundary)
        .unwrap()
        .into_iter()
        .collect::<Result<Vec<_>, AppError>>()
        .unwrap()
}

/// Small deterministic generator so "random" content is reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    /// 1..=200 arbitrary bytes, CR and LF included
    fn content(&mut self) -> Vec<u8> {
        let len = 1 + (self.next() % 200) as usize;
        (0..len).map(|_| self.next() as u8).collect()
    }
}

fn field_part(boundary: &str, name: &str, content: &[u8]) -> Vec<u8> {
    let mut part = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n"
    )
    .into_bytes();
    part.extend_from_slice(content);
    part.extend_from_slice(b"\r\n");
    part
}

#[test]
fn test_ten_random_sections_are_found() {
    let mut rng = Lcg(42);
    let mut raw = Vec::new();
    for _ in 0..10 {
        raw.extend_from_slice(b"--BOUNDARY\r\n");
        raw.extend_from_slice(&rng.content());
        raw.extend_from_slice(b"\r\n");
    }
    raw.extend_from_slice(b"\r\n----BOUNDARY--");

    let stream = body(raw);
    let scanner = MultipartScanner::new(&stream, "BOUNDARY").unwrap();
    assert_eq!(scanner.parts().count(), 10);
}

#[test]
fn test_ten_sections_across_seeds() {
    for seed in 0..50 {
        let mut rng = Lcg(seed);
        let mut raw = Vec::new();
        for _ in 0..10 {
            raw.extend_from_slice(b"--BOUNDARY\r\n");
            raw.extend_from_slice(&rng.content());
            raw.extend_from_slice(b"\r\n");
        }
        raw.extend_from_slice(b"\r\n----BOUNDARY--");

        let stream = body(raw);
        let scanner = MultipartScanner::new(&stream, "BOUNDARY").unwrap();
        assert_eq!(scanner.parts().count(), 10, "seed {seed}");
    }
}

#[test]
fn test_leading_padding_is_skipped() {
    let raw = b"some padding in the stream\r\n--BOUNDARY\r\n<content>\r\n\r\n----BOUNDARY--".to_vec();
    let stream = body(raw);
    let scanner = MultipartScanner::new(&stream, "BOUNDARY").unwrap();
    assert_eq!(scanner.parts().count(), 1);
}

#[test]
fn test_part_count_matches_for_any_n() {
    for n in 0..6 {
        let mut rng = Lcg(n as u64 + 7);
        let mut raw = b"preamble line\r\n".to_vec();
        for i in 0..n {
            raw.extend(field_part("----WebKitFormBoundary7MA4YWxkTrZu0gW", &format!("f{i}"), &rng.content()));
        }
        raw.extend_from_slice(b"------WebKitFormBoundary7MA4YWxkTrZu0gW--\r\n");

        let stream = body(raw);
        let parts = collect_parts(&stream, "----WebKitFormBoundary7MA4YWxkTrZu0gW");
        assert_eq!(parts.len(), n, "expected {n} parts");
        for (i, part) in parts.iter().enumerate() {
            assert_eq!(part.name, format!("f{i}"));
        }
    }
}

#[test]
fn test_values_are_exact_between_blank_line_and_next_boundary() {
    let mut rng = Lcg(3);
    let contents: Vec<Vec<u8>> = vec![
        rng.content(),
        b"line one\r\nline two\r\n".to_vec(),
        vec![0x00, 0xff, b'\r', b'\n', 0x80, b'-', b'-'],
        Vec::new(),
        rng.content(),
    ];

    let mut raw = Vec::new();
    for (i, content) in contents.iter().enumerate() {
        raw.extend(field_part("XyZ", &format!("p{i}"), content));
    }
    raw.extend_from_slice(b"--XyZ--\r\nepilogue that is ignored\r\n");

    let stream = body(raw);
    let mut parts = collect_parts(&stream, "XyZ");
    assert_eq!(parts.len(), contents.len());
    for (part, expected) in parts.iter_mut().zip(&contents) {
        assert_eq!(part.len(), expected.len() as u64);
        assert_eq!(&part.read_to_bytes().unwrap(), expected);
    }
}

#[test]
fn test_headers_are_parsed_per_part() {
    let raw = "--XyZ\r\n\
        Content-Disposition: form-data; name=\"name\"; filename=\"Данные.txt\"\r\n\
        Content-Type: application/octet-stream\r\n\
        \r\n\
        \r\n\
        --XyZ\r\n\
        Content-Disposition: form-data; filename=\"b.png\"; name=\"avatar\"\r\n\
        Content-Type: image/png\r\n\
        \r\n\
        PNG\r\n\
        --XyZ\r\n\
        Content-Disposition: form-data; name=\"comment\"\r\n\
        \r\n\
        plain text\r\n\
        --XyZ--\r\n";

    let stream = body(raw.as_bytes().to_vec());
    let mut parts = collect_parts(&stream, "XyZ");
    assert_eq!(parts.len(), 3);

    assert_eq!(parts[0].name, "name");
    assert_eq!(parts[0].filename, "Данные.txt");
    assert_eq!(parts[0].content_type, "application/octet-stream");
    assert!(parts[0].read_to_bytes().unwrap().is_empty());

    assert_eq!(parts[1].name, "avatar");
    assert_eq!(parts[1].filename, "b.png");
    assert_eq!(parts[1].content_type, "image/png");
    assert!(parts[1].is_file());

    assert_eq!(parts[2].name, "comment");
    assert_eq!(parts[2].filename, "");
    assert_eq!(parts[2].content_type, "");
    assert!(!parts[2].is_file());
    assert_eq!(parts[2].read_to_string_lossy().unwrap(), "plain text");
}

#[test]
fn test_cyrillic_filename_round_trips_from_header_block() {
    let headers = "Content-Disposition: form-data; name=\"name\"; filename=\"Данные.txt\"\r\n\
                   Content-Type: application/octet-stream\r\n\
                   \r\n";
    let stream = body(headers.as_bytes().to_vec());
    let window = StreamWindow::new(&stream, 0, headers.len() as u64);
    let mut part = MultipartPart::parse(window).unwrap();

    assert_eq!(part.name, "name");
    assert_eq!(part.filename.as_bytes(), "Данные.txt".as_bytes());
    assert_eq!(part.content_type, "application/octet-stream");
    assert!(part.read_to_bytes().unwrap().is_empty());
}

#[test]
fn test_parts_can_be_read_in_any_order_after_scanning() {
    let mut raw = Vec::new();
    raw.extend(field_part("B", "a", b"first"));
    raw.extend(field_part("B", "b", b"second"));
    raw.extend(field_part("B", "c", b"third"));
    raw.extend_from_slice(b"--B--");

    let stream = body(raw);
    let mut parts = collect_parts(&stream, "B");
    assert_eq!(parts[2].read_to_bytes().unwrap(), b"third");
    assert_eq!(parts[0].read_to_bytes().unwrap(), b"first");
    assert_eq!(parts[1].read_to_bytes().unwrap(), b"second");
}

#[test]
fn test_reading_a_part_before_pulling_the_next() {
    let mut raw = Vec::new();
    raw.extend(field_part("B", "a", b"alpha"));
    raw.extend(field_part("B", "b", b"beta"));
    raw.extend_from_slice(b"--B--");

    let stream = body(raw);
    let mut parts = MultipartScanner::new(&stream, "B").unwrap().parts();

    let mut first = parts.next().unwrap().unwrap();
    assert_eq!(first.read_to_bytes().unwrap(), b"alpha");
    let mut second = parts.next().unwrap().unwrap();
    assert_eq!(second.read_to_bytes().unwrap(), b"beta");
    assert!(parts.next().is_none());
}

#[test]
fn test_truncated_body_keeps_what_it_has() {
    let mut raw = field_part("B", "whole", b"done");
    raw.extend_from_slice(b"--B\r\nContent-Disposition: form-data; name=\"cut\"\r\n\r\npartial conte");

    let stream = body(raw);
    let mut parts = collect_parts(&stream, "B");
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].read_to_bytes().unwrap(), b"done");
    assert_eq!(parts[1].name, "cut");
    assert_eq!(parts[1].read_to_bytes().unwrap(), b"partial conte");
}

#[test]
fn test_truncated_headers_give_empty_fields() {
    let stream = body(b"--B\r\nContent-Disposition: form-da".to_vec());
    let mut parts = collect_parts(&stream, "B");
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].name, "");
    assert_eq!(parts[0].filename, "");
    assert!(parts[0].read_to_bytes().unwrap().is_empty());
}

#[test]
fn test_wrong_boundary_finds_nothing() {
    let mut raw = field_part("right", "a", b"x");
    raw.extend_from_slice(b"--right--\r\n");
    let stream = body(raw);
    assert!(collect_parts(&stream, "wrong").is_empty());
}

#[test]
fn test_value_window_seek_contract() {
    let mut raw = field_part("B", "a", b"0123456789");
    raw.extend_from_slice(b"--B--");
    let stream = body(raw);
    let mut parts = collect_parts(&stream, "B");
    let value = parts[0].value();

    assert_eq!(value.seek(SeekFrom::End(-3)).unwrap(), 7);
    let mut tail = String::new();
    value.read_to_string(&mut tail).unwrap();
    assert_eq!(tail, "789");

    assert!(value.seek(SeekFrom::Start(11)).is_err());
    assert!(value.seek(SeekFrom::Current(-11)).is_err());
    assert_eq!(value.seek(SeekFrom::Start(10)).unwrap(), 10);
}

#[test]
fn test_io_errors_surface_once() {
    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk on fire"))
        }
    }

    impl Seek for Failing {
        fn seek(&mut self, _pos: SeekFrom) -> std::io::Result<u64> {
            Ok(0)
        }
    }

    let stream = RefCell::new(Failing);
    let mut parts = MultipartScanner::new(&stream, "B").unwrap().parts();
    assert!(matches!(parts.next(), Some(Err(AppError::Io(_)))));
    assert!(parts.next().is_none());
}
