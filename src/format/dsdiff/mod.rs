//! Philips DSDIFF support
//!
//! DSDIFF is an IFF-style container: a big-endian `FRM8` form of type `DSD `
//! holding 12-byte chunk headers with 64-bit sizes, each chunk padded to an
//! even length. The sample rate, channel ids and compression type live in
//! sub-chunks of the `PROP` chunk.

pub mod parser;
pub mod writer;

pub use parser::DsdiffParser;
pub use writer::DsdiffWriter;

use crate::format::codec::{Field, Record, Value};
use crate::format::descriptor::Endianness;

pub const FORM_MAGIC: &[u8; 4] = b"FRM8";
pub const DSD_FORM: &[u8; 4] = b"DSD ";
pub const FVER_CHUNK: &[u8; 4] = b"FVER";
pub const PROP_CHUNK: &[u8; 4] = b"PROP";
pub const SND_PROPERTY: &[u8; 4] = b"SND ";
pub const FS_CHUNK: &[u8; 4] = b"FS  ";
pub const CHNL_CHUNK: &[u8; 4] = b"CHNL";
pub const CMPR_CHUNK: &[u8; 4] = b"CMPR";
pub const DSD_CHUNK: &[u8; 4] = b"DSD ";

/// Format version written to `FVER` (1.5.0.0)
pub const FORMAT_VERSION: u32 = 0x0105_0000;

/// Compression type of uncompressed DSD
pub const UNCOMPRESSED: &[u8; 4] = b"DSD ";
/// Human-readable compression name, stored as a Pascal string
pub const UNCOMPRESSED_NAME: &[u8] = b"not compressed";

/// Speaker channel ids and the canonical speaker each stands for
pub const CHANNEL_IDS: [(&[u8; 4], u32); 8] = [
    (b"SLFT", 1),
    (b"MLFT", 1),
    (b"SRGT", 2),
    (b"MRGT", 2),
    (b"C   ", 3),
    (b"LFE ", 4),
    (b"LS  ", 5),
    (b"RS  ", 6),
];

/// `FRM8` header: magic, form size, form type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsdiffFormHeader {
    pub id: [u8; 4],
    /// Bytes after this field, form type included
    pub size: u64,
    pub form_type: [u8; 4],
}

impl Record for DsdiffFormHeader {
    const LAYOUT: &'static [Field] = &[Field::Tag(4), Field::U64, Field::Tag(4)];
    const ORDER: Endianness = Endianness::Big;

    fn from_values(values: &[Value]) -> Self {
        DsdiffFormHeader {
            id: values[0].as_tag(),
            size: values[1].as_u64(),
            form_type: values[2].as_tag(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Tag(self.id.to_vec()),
            Value::U64(self.size),
            Value::Tag(self.form_type.to_vec()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsdiffChunkHeader {
    pub id: [u8; 4],
    /// Body size, not counting the pad byte
    pub size: u64,
}

impl DsdiffChunkHeader {
    pub fn new(id: &[u8; 4], size: u64) -> Self {
        DsdiffChunkHeader { id: *id, size }
    }
}

impl Record for DsdiffChunkHeader {
    const LAYOUT: &'static [Field] = &[Field::Tag(4), Field::U64];
    const ORDER: Endianness = Endianness::Big;

    fn from_values(values: &[Value]) -> Self {
        DsdiffChunkHeader {
            id: values[0].as_tag(),
            size: values[1].as_u64(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![Value::Tag(self.id.to_vec()), Value::U64(self.size)]
    }
}

/// Canonical speaker (1-based) for a channel id
pub fn speaker_for_id(id: &[u8; 4]) -> Option<u32> {
    CHANNEL_IDS
        .iter()
        .find(|(known, _)| *known == id)
        .map(|&(_, speaker)| speaker)
}

/// Channel id written for a channel with this identity at `index`
pub fn id_for_identity(identity: u8, index: usize) -> [u8; 4] {
    let named = match identity {
        1 => Some(b"SLFT"),
        2 => Some(b"SRGT"),
        3 => Some(b"C   "),
        4 => Some(b"LFE "),
        5 => Some(b"LS  "),
        6 => Some(b"RS  "),
        _ => None,
    };
    match named {
        Some(id) => *id,
        None => {
            let mut id = [b'C', b'0', b'0', b'0'];
            let digits = format!("{:03}", index % 1000);
            id[1..].copy_from_slice(digits.as_bytes());
            id
        }
    }
}

/// True for ids of the `C###` form written for unassigned channels
pub fn is_numbered_id(id: &[u8; 4]) -> bool {
    id[0] == b'C' && id[1..].iter().all(u8::is_ascii_digit)
}
