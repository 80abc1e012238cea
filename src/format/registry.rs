//! Container identification and parser/writer lookup

use super::caf::{CafParser, CafWriter};
use super::dsdiff::{DsdiffParser, DsdiffWriter};
use super::dsf::{DsfParser, DsfWriter};
use super::parser::{HeaderParser, ParseOptions, ParsedHeader};
use super::wav::{WavParser, WavWriter};
use super::wave64::{Wave64Parser, Wave64Writer, RIFF_GUID};
use super::writer::HeaderWriter;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Cursor, Read};
use tracing::debug;

/// Number of leading bytes [`open_header`] inspects
pub const MAGIC_LEN: usize = 16;

/// The container grammars this crate understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    /// Microsoft RIFF WAVE
    Wav,
    /// RIFF WAVE with 64-bit sizes (EBU Tech 3306)
    Rf64,
    /// Sony Wave64
    Wave64,
    /// Apple Core Audio Format
    Caf,
    /// Philips DSD Interchange File Format
    Dsdiff,
    /// Sony DSD Stream File
    Dsf,
}

impl ContainerKind {
    /// Every kind, in identification order
    pub const ALL: [ContainerKind; 6] = [
        ContainerKind::Wav,
        ContainerKind::Rf64,
        ContainerKind::Wave64,
        ContainerKind::Caf,
        ContainerKind::Dsdiff,
        ContainerKind::Dsf,
    ];

    /// Leading bytes of a file of this kind
    pub fn magic(&self) -> &'static [u8] {
        match self {
            ContainerKind::Wav => b"RIFF",
            ContainerKind::Rf64 => b"RF64",
            ContainerKind::Wave64 => &RIFF_GUID,
            ContainerKind::Caf => b"caff",
            ContainerKind::Dsdiff => b"FRM8",
            ContainerKind::Dsf => b"DSD ",
        }
    }

    /// Chunk alignment in bytes
    pub fn alignment(&self) -> u8 {
        match self {
            ContainerKind::Wav | ContainerKind::Rf64 | ContainerKind::Dsdiff => 2,
            ContainerKind::Wave64 => 8,
            ContainerKind::Caf | ContainerKind::Dsf => 1,
        }
    }

    /// Long descriptive name
    pub fn long_name(&self) -> &'static str {
        match self {
            ContainerKind::Wav => "Microsoft RIFF",
            ContainerKind::Rf64 => "RIFF64 (RF64)",
            ContainerKind::Wave64 => "Sony Wave64",
            ContainerKind::Caf => "Apple Core Audio",
            ContainerKind::Dsdiff => "Philips DSDIFF",
            ContainerKind::Dsf => "Sony DSD Stream",
        }
    }

    /// Conventional file extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerKind::Wav | ContainerKind::Rf64 => "wav",
            ContainerKind::Wave64 => "w64",
            ContainerKind::Caf => "caf",
            ContainerKind::Dsdiff => "dff",
            ContainerKind::Dsf => "dsf",
        }
    }

    /// True for the DSD containers
    pub fn is_dsd(&self) -> bool {
        matches!(self, ContainerKind::Dsdiff | ContainerKind::Dsf)
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContainerKind::Wav => "WAV",
            ContainerKind::Rf64 => "RF64",
            ContainerKind::Wave64 => "Wave64",
            ContainerKind::Caf => "CAF",
            ContainerKind::Dsdiff => "DSDIFF",
            ContainerKind::Dsf => "DSF",
        };
        f.write_str(name)
    }
}

/// Identify a container from its leading bytes
///
/// Wave64 shares its first four bytes with nothing else, but when more bytes
/// are supplied the rest of the `riff` GUID must match too.
pub fn identify(magic: &[u8]) -> Option<ContainerKind> {
    if magic.len() < 4 {
        return None;
    }

    match &magic[..4] {
        b"RIFF" => Some(ContainerKind::Wav),
        b"RF64" => Some(ContainerKind::Rf64),
        b"caff" => Some(ContainerKind::Caf),
        b"FRM8" => Some(ContainerKind::Dsdiff),
        b"DSD " => Some(ContainerKind::Dsf),
        b"riff" => {
            let checked = magic.len().min(RIFF_GUID.len());
            if magic[..checked] == RIFF_GUID[..checked] {
                Some(ContainerKind::Wave64)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Chunk alignment of a container kind
pub fn alignment_of(kind: ContainerKind) -> u8 {
    kind.alignment()
}

/// Map a file extension (with or without the dot) to a container kind
pub fn kind_from_extension(ext: &str) -> Option<ContainerKind> {
    let ext = ext.trim_start_matches('.').to_lowercase();
    match ext.as_str() {
        "wav" => Some(ContainerKind::Wav),
        "w64" => Some(ContainerKind::Wave64),
        "caf" => Some(ContainerKind::Caf),
        "dff" => Some(ContainerKind::Dsdiff),
        "dsf" => Some(ContainerKind::Dsf),
        _ => None,
    }
}

/// Create a parser for a container kind
pub fn parser_for(kind: ContainerKind) -> Box<dyn HeaderParser> {
    match kind {
        ContainerKind::Wav | ContainerKind::Rf64 => Box::new(WavParser::new()),
        ContainerKind::Wave64 => Box::new(Wave64Parser::new()),
        ContainerKind::Caf => Box::new(CafParser::new()),
        ContainerKind::Dsdiff => Box::new(DsdiffParser::new()),
        ContainerKind::Dsf => Box::new(DsfParser::new()),
    }
}

/// Create a writer for a container kind
///
/// `Rf64` yields a WAV writer that always emits the 64-bit form; `Wav`
/// switches to it only when the payload needs it.
pub fn writer_for(kind: ContainerKind) -> Box<dyn HeaderWriter> {
    match kind {
        ContainerKind::Wav => Box::new(WavWriter::new()),
        ContainerKind::Rf64 => Box::new(WavWriter::rf64()),
        ContainerKind::Wave64 => Box::new(Wave64Writer::new()),
        ContainerKind::Caf => Box::new(CafWriter::new()),
        ContainerKind::Dsdiff => Box::new(DsdiffWriter::new()),
        ContainerKind::Dsf => Box::new(DsfWriter::new()),
    }
}

/// Peek at the magic bytes, pick a parser and parse the header
///
/// The magic bytes are replayed in front of `reader`, so the parser still
/// sees the stream from its first byte.
pub fn open_header(
    reader: &mut dyn Read,
    file_size: u64,
    options: &ParseOptions,
) -> Result<(ContainerKind, ParsedHeader)> {
    let magic = read_magic(reader)?;
    let kind = identify(&magic).ok_or(Error::UnknownFormat)?;
    debug!("Identified {} container", kind.long_name());

    let mut replay = Cursor::new(magic).chain(reader);
    let header = parser_for(kind).parse(&mut replay, file_size, options)?;

    // RIFF and RF64 share a parser; report what was actually found
    let kind = match kind {
        ContainerKind::Wav | ContainerKind::Rf64 => header.container,
        other => other,
    };

    Ok((kind, header))
}

fn read_magic(reader: &mut dyn Read) -> Result<Vec<u8>> {
    let mut magic = vec![0u8; MAGIC_LEN];
    let mut filled = 0;

    while filled < MAGIC_LEN {
        match reader.read(&mut magic[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }

    magic.truncate(filled);
    Ok(magic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_each_magic() {
        assert_eq!(identify(b"RIFF\0\0\0\0WAVE"), Some(ContainerKind::Wav));
        assert_eq!(identify(b"RF64"), Some(ContainerKind::Rf64));
        assert_eq!(identify(b"caff\0\x01\0\0"), Some(ContainerKind::Caf));
        assert_eq!(identify(b"FRM8"), Some(ContainerKind::Dsdiff));
        assert_eq!(identify(b"DSD \x1c\0\0\0"), Some(ContainerKind::Dsf));
        assert_eq!(identify(&RIFF_GUID), Some(ContainerKind::Wave64));
        assert_eq!(identify(&RIFF_GUID[..8]), Some(ContainerKind::Wave64));
    }

    #[test]
    fn test_identify_rejects() {
        assert_eq!(identify(b"RIF"), None);
        assert_eq!(identify(b""), None);
        assert_eq!(identify(b"OggS"), None);
        assert_eq!(identify(b"riff\0\0\0\0"), None);
    }

    #[test]
    fn test_alignment() {
        assert_eq!(alignment_of(ContainerKind::Wav), 2);
        assert_eq!(alignment_of(ContainerKind::Rf64), 2);
        assert_eq!(alignment_of(ContainerKind::Dsdiff), 2);
        assert_eq!(alignment_of(ContainerKind::Wave64), 8);
        assert_eq!(alignment_of(ContainerKind::Caf), 1);
        assert_eq!(alignment_of(ContainerKind::Dsf), 1);
    }

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(kind_from_extension("WAV"), Some(ContainerKind::Wav));
        assert_eq!(kind_from_extension(".w64"), Some(ContainerKind::Wave64));
        assert_eq!(kind_from_extension("dff"), Some(ContainerKind::Dsdiff));
        assert_eq!(kind_from_extension("mp3"), None);
    }

    #[test]
    fn test_every_kind_has_parser_and_writer() {
        for kind in ContainerKind::ALL {
            let writer = writer_for(kind);
            let parser = parser_for(kind);
            if kind == ContainerKind::Rf64 {
                assert_eq!(parser.kind(), ContainerKind::Wav);
            } else {
                assert_eq!(parser.kind(), kind);
            }
            assert_eq!(writer.kind(), kind);
        }
    }

    #[test]
    fn test_open_header_unknown() {
        let mut input = Cursor::new(b"fLaC\0\0\0\x22".to_vec());
        let err = open_header(&mut input, 8, &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnknownFormat));
    }

    #[test]
    fn test_open_header_short_stream() {
        let mut input = Cursor::new(b"RI".to_vec());
        let err = open_header(&mut input, 2, &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnknownFormat));
    }
}
