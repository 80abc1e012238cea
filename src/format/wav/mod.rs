//! RIFF WAVE and RF64 support
//!
//! Plain RIFF files use 32-bit sizes. RF64 (EBU Tech 3306) keeps the same
//! chunk layout but moves the sizes into a `ds64` chunk right after the file
//! header. The writer reserves room for `ds64` with a `junk` chunk so a file
//! can be promoted to RF64 in place.

pub mod header;
pub mod parser;
pub mod writer;

pub use header::{FormatTag, WaveHeader};
pub use parser::WavParser;
pub use writer::WavWriter;

use crate::format::codec::{Field, Record, Value};
use crate::format::descriptor::Endianness;

/// WAV format magic numbers
pub const RIFF_MAGIC: &[u8; 4] = b"RIFF";
pub const RF64_MAGIC: &[u8; 4] = b"RF64";
pub const WAVE_MAGIC: &[u8; 4] = b"WAVE";
pub const DS64_CHUNK: &[u8; 4] = b"ds64";
pub const JUNK_CHUNK: &[u8; 4] = b"junk";
pub const FMT_CHUNK: &[u8; 4] = b"fmt ";
pub const DATA_CHUNK: &[u8; 4] = b"data";

/// File header: magic, size of everything after it, form type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiffHeader {
    pub id: [u8; 4],
    pub size: u32,
    pub form_type: [u8; 4],
}

impl Record for RiffHeader {
    const LAYOUT: &'static [Field] = &[Field::Tag(4), Field::U32, Field::Tag(4)];
    const ORDER: Endianness = Endianness::Little;

    fn from_values(values: &[Value]) -> Self {
        RiffHeader {
            id: values[0].as_tag(),
            size: values[1].as_u32(),
            form_type: values[2].as_tag(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Tag(self.id.to_vec()),
            Value::U32(self.size),
            Value::Tag(self.form_type.to_vec()),
        ]
    }
}

/// Chunk header (4 byte ID + 4 byte size)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: [u8; 4],
    pub size: u32,
}

impl ChunkHeader {
    pub fn new(id: &[u8; 4], size: u32) -> Self {
        ChunkHeader { id: *id, size }
    }
}

impl Record for ChunkHeader {
    const LAYOUT: &'static [Field] = &[Field::Tag(4), Field::U32];
    const ORDER: Endianness = Endianness::Little;

    fn from_values(values: &[Value]) -> Self {
        ChunkHeader {
            id: values[0].as_tag(),
            size: values[1].as_u32(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![Value::Tag(self.id.to_vec()), Value::U32(self.size)]
    }
}

/// Body of the RF64 `ds64` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ds64Chunk {
    pub riff_size: u64,
    pub data_size: u64,
    pub sample_count: u64,
    /// Number of [`SizeTableEntry`] records that follow
    pub table_length: u32,
}

impl Record for Ds64Chunk {
    const LAYOUT: &'static [Field] = &[Field::U64, Field::U64, Field::U64, Field::U32];
    const ORDER: Endianness = Endianness::Little;

    fn from_values(values: &[Value]) -> Self {
        Ds64Chunk {
            riff_size: values[0].as_u64(),
            data_size: values[1].as_u64(),
            sample_count: values[2].as_u64(),
            table_length: values[3].as_u32(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::U64(self.riff_size),
            Value::U64(self.data_size),
            Value::U64(self.sample_count),
            Value::U32(self.table_length),
        ]
    }
}

/// 64-bit size of some other oversized chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeTableEntry {
    pub id: [u8; 4],
    pub size: u64,
}

impl Record for SizeTableEntry {
    const LAYOUT: &'static [Field] = &[Field::Tag(4), Field::U64];
    const ORDER: Endianness = Endianness::Little;

    fn from_values(values: &[Value]) -> Self {
        SizeTableEntry {
            id: values[0].as_tag(),
            size: values[1].as_u64(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![Value::Tag(self.id.to_vec()), Value::U64(self.size)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sizes() {
        assert_eq!(RiffHeader::SIZE, 12);
        assert_eq!(ChunkHeader::SIZE, 8);
        assert_eq!(Ds64Chunk::SIZE, 28);
        assert_eq!(SizeTableEntry::SIZE, 12);
    }
}
