//! Apple Core Audio Format support
//!
//! CAF is big-endian throughout, with 12-byte chunk headers carrying signed
//! 64-bit sizes. A `data` size of -1 means "runs to end of file". Channel
//! layouts come from the `chan` chunk as a named tag, a bitmap or a list of
//! per-channel labels.

pub mod layouts;
pub mod parser;
pub mod writer;

pub use parser::CafParser;
pub use writer::CafWriter;

use crate::format::codec::{Field, Record, Value};
use crate::format::descriptor::Endianness;

pub const CAFF_MAGIC: &[u8; 4] = b"caff";
pub const DESC_CHUNK: &[u8; 4] = b"desc";
pub const CHAN_CHUNK: &[u8; 4] = b"chan";
pub const DATA_CHUNK: &[u8; 4] = b"data";
pub const LPCM_FORMAT: &[u8; 4] = b"lpcm";

/// Only version of the file format
pub const CAF_VERSION: u16 = 1;

/// `desc` flag: samples are IEEE float
pub const FORMAT_FLAG_FLOAT: u32 = 1;
/// `desc` flag: samples are little-endian
pub const FORMAT_FLAG_LITTLE_ENDIAN: u32 = 2;

/// Layout tag: per-channel descriptions follow
pub const TAG_USE_DESCRIPTIONS: u32 = 0;
/// Layout tag: the bitmap field holds a speaker mask
pub const TAG_USE_BITMAP: u32 = 0x10000;

/// `data` chunk size meaning "unknown"
pub const UNKNOWN_DATA_SIZE: u64 = u64::MAX;

/// Bytes of edit count at the start of the `data` chunk
pub const EDIT_COUNT_SIZE: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CafFileHeader {
    pub file_type: [u8; 4],
    pub version: u16,
    pub flags: u16,
}

impl Record for CafFileHeader {
    const LAYOUT: &'static [Field] = &[Field::Tag(4), Field::U16, Field::U16];
    const ORDER: Endianness = Endianness::Big;

    fn from_values(values: &[Value]) -> Self {
        CafFileHeader {
            file_type: values[0].as_tag(),
            version: values[1].as_u16(),
            flags: values[2].as_u16(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Tag(self.file_type.to_vec()),
            Value::U16(self.version),
            Value::U16(self.flags),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CafChunkHeader {
    pub chunk_type: [u8; 4],
    /// Signed on disk; -1 reads as `u64::MAX`
    pub size: u64,
}

impl Record for CafChunkHeader {
    const LAYOUT: &'static [Field] = &[Field::Tag(4), Field::U64];
    const ORDER: Endianness = Endianness::Big;

    fn from_values(values: &[Value]) -> Self {
        CafChunkHeader {
            chunk_type: values[0].as_tag(),
            size: values[1].as_u64(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![Value::Tag(self.chunk_type.to_vec()), Value::U64(self.size)]
    }
}

/// Body of the `desc` chunk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CafAudioFormat {
    pub sample_rate: f64,
    pub format_id: [u8; 4],
    pub format_flags: u32,
    pub bytes_per_packet: u32,
    pub frames_per_packet: u32,
    pub channels_per_frame: u32,
    pub bits_per_channel: u32,
}

impl Record for CafAudioFormat {
    const LAYOUT: &'static [Field] = &[
        Field::F64,
        Field::Tag(4),
        Field::U32,
        Field::U32,
        Field::U32,
        Field::U32,
        Field::U32,
    ];
    const ORDER: Endianness = Endianness::Big;

    fn from_values(values: &[Value]) -> Self {
        CafAudioFormat {
            sample_rate: values[0].as_f64(),
            format_id: values[1].as_tag(),
            format_flags: values[2].as_u32(),
            bytes_per_packet: values[3].as_u32(),
            frames_per_packet: values[4].as_u32(),
            channels_per_frame: values[5].as_u32(),
            bits_per_channel: values[6].as_u32(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::F64(self.sample_rate),
            Value::Tag(self.format_id.to_vec()),
            Value::U32(self.format_flags),
            Value::U32(self.bytes_per_packet),
            Value::U32(self.frames_per_packet),
            Value::U32(self.channels_per_frame),
            Value::U32(self.bits_per_channel),
        ]
    }
}

/// Fixed part of the `chan` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CafChannelLayout {
    pub layout_tag: u32,
    pub bitmap: u32,
    pub num_descriptions: u32,
}

impl Record for CafChannelLayout {
    const LAYOUT: &'static [Field] = &[Field::U32, Field::U32, Field::U32];
    const ORDER: Endianness = Endianness::Big;

    fn from_values(values: &[Value]) -> Self {
        CafChannelLayout {
            layout_tag: values[0].as_u32(),
            bitmap: values[1].as_u32(),
            num_descriptions: values[2].as_u32(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::U32(self.layout_tag),
            Value::U32(self.bitmap),
            Value::U32(self.num_descriptions),
        ]
    }
}

/// One per-channel description; coordinates are kept as raw float bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CafChannelDescription {
    pub label: u32,
    pub flags: u32,
    pub coordinates: [u32; 3],
}

impl Record for CafChannelDescription {
    const LAYOUT: &'static [Field] = &[Field::U32, Field::U32, Field::U32, Field::U32, Field::U32];
    const ORDER: Endianness = Endianness::Big;

    fn from_values(values: &[Value]) -> Self {
        CafChannelDescription {
            label: values[0].as_u32(),
            flags: values[1].as_u32(),
            coordinates: [values[2].as_u32(), values[3].as_u32(), values[4].as_u32()],
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::U32(self.label),
            Value::U32(self.flags),
            Value::U32(self.coordinates[0]),
            Value::U32(self.coordinates[1]),
            Value::U32(self.coordinates[2]),
        ]
    }
}
