//! Round-trip tests for audiowrap
//!
//! Every container is written from a descriptor, parsed back and compared,
//! then written with an unknown length and patched on a real file.

use audiowrap::format::padding::write_padding;
use audiowrap::format::{open_header, writer_for, ContainerKind, ParseOptions};
use audiowrap::session::{export_trailer, export_wrapper, import_file, MemorySession};
use std::io::{Cursor, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

#[path = "common/mod.rs"]
mod common;

use common::*;

// ============================================================================
// Parse / Write Round Trips
// ============================================================================

#[test]
fn test_round_trip_every_kind() {
    for (kind, format) in sample_formats() {
        let file = build_file(kind, &format, 0x5a, &[]);
        let header_len = writer_for(kind)
            .render_header(&format, format.total_samples)
            .unwrap()
            .len();

        let mut input = Cursor::new(file.clone());
        let (found, parsed) =
            open_header(&mut input, file.len() as u64, &ParseOptions::default()).unwrap();

        assert_eq!(found, kind, "{}", kind);
        assert_eq!(parsed.format, format, "{}", kind);
        assert_eq!(parsed.header_len, header_len as u64, "{}", kind);
        assert!(parsed.warnings.is_empty(), "{}: {:?}", kind, parsed.warnings);

        let wrapper = parsed.wrapper.unwrap();
        assert_eq!(wrapper.header, &file[..header_len], "{}", kind);
    }
}

#[test]
fn test_rewrite_is_byte_identical() {
    for (kind, format) in sample_formats() {
        let first = writer_for(kind)
            .render_header(&format, format.total_samples)
            .unwrap();
        let file = build_file(kind, &format, 0, &[]);

        let mut input = Cursor::new(file.clone());
        let (_, parsed) =
            open_header(&mut input, file.len() as u64, &ParseOptions::default()).unwrap();
        let second = writer_for(kind)
            .render_header(&parsed.format, parsed.format.total_samples)
            .unwrap();

        assert_eq!(first, second, "{}", kind);
    }
}

#[test]
fn test_parse_without_wrapper_storage() {
    let format = cd_stereo(10);
    let file = build_file(ContainerKind::Wav, &format, 1, &[]);
    let options = ParseOptions::default().store_wrapper(false);

    let mut input = Cursor::new(file.clone());
    let (_, parsed) = open_header(&mut input, file.len() as u64, &options).unwrap();
    assert!(parsed.wrapper.is_none());
    assert_eq!(parsed.format, format);
}

// ============================================================================
// Two-Phase Write and Patch
// ============================================================================

#[test]
fn test_patch_is_idempotent() {
    for (kind, format) in sample_formats() {
        let writer = writer_for(kind);
        let total = format.total_samples.unwrap();
        let payload = payload_len(kind, &format);

        let mut temp = NamedTempFile::new().unwrap();
        {
            let file = temp.as_file_mut();
            let written = writer.write_header(file, &format, None).unwrap();
            file.write_all(&vec![0x11u8; payload]).unwrap();
            write_padding(file, payload as u64, kind.alignment()).unwrap();
            let end = file.stream_position().unwrap();

            writer.patch_header(file, &format, total).unwrap();
            assert_eq!(file.stream_position().unwrap(), end, "{}", kind);
            assert!(written > 0);
        }
        let once = std::fs::read(temp.path()).unwrap();

        writer.patch_header(temp.as_file_mut(), &format, total).unwrap();
        let twice = std::fs::read(temp.path()).unwrap();
        assert_eq!(once, twice, "{}", kind);

        assert_eq!(once, build_file(kind, &format, 0x11, &[]), "{}", kind);
    }
}

#[test]
fn test_unknown_length_headers_parse_as_unknown() {
    let format = cd_stereo(10).conformed_to(ContainerKind::Caf);
    let mut file = Vec::new();
    writer_for(ContainerKind::Caf)
        .write_header(&mut file, &format, None)
        .unwrap();
    file.extend_from_slice(&[0u8; 40]);

    let mut input = Cursor::new(file);
    let (_, parsed) = open_header(&mut input, 0, &ParseOptions::default()).unwrap();
    assert_eq!(parsed.format.total_samples, None);
}

#[test]
fn test_patch_restores_position_mid_stream() {
    let format = surround_51(4);
    let writer = writer_for(ContainerKind::Wave64);
    let mut out = Cursor::new(Vec::new());

    writer.write_header(&mut out, &format, None).unwrap();
    out.write_all(&[0u8; 72]).unwrap();
    out.seek(SeekFrom::Start(100)).unwrap();

    writer.patch_header(&mut out, &format, 4).unwrap();
    assert_eq!(out.position(), 100);
}

// ============================================================================
// File Import With Trailers
// ============================================================================

#[test]
fn test_import_file_captures_trailer() {
    let trailer = b"LIST\x04\0\0\0INFO";
    for (kind, format) in sample_formats() {
        let bytes = build_file(kind, &format, 0x22, trailer);
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(&bytes).unwrap();
        temp.flush().unwrap();

        let mut session = MemorySession::new();
        let (found, parsed) =
            import_file(temp.path(), &ParseOptions::default(), &mut session).unwrap();
        assert_eq!(found, kind);
        assert!(parsed.warnings.is_empty(), "{}: {:?}", kind, parsed.warnings);
        assert_eq!(parsed.wrapper.unwrap().trailer, trailer.to_vec(), "{}", kind);

        let mut header = Vec::new();
        export_wrapper(&session, &mut header).unwrap();
        assert_eq!(header, &bytes[..parsed.header_len as usize], "{}", kind);

        let mut tail = Vec::new();
        export_trailer(&session, &mut tail).unwrap();
        assert_eq!(tail, trailer.to_vec(), "{}", kind);
    }
}

#[test]
fn test_import_file_without_trailer() {
    let format = cd_stereo(3);
    let bytes = build_file(ContainerKind::Wav, &format, 0, &[]);
    let mut temp = NamedTempFile::new().unwrap();
    temp.write_all(&bytes).unwrap();

    let mut session = MemorySession::new();
    import_file(temp.path(), &ParseOptions::default(), &mut session).unwrap();
    assert!(audiowrap::session::CodecSession::trailer(&session).is_empty());
}
