//! Sony DSF support
//!
//! DSF is little-endian with three fixed chunks: a 28-byte `DSD ` file chunk
//! pointing at optional trailing metadata, a 52-byte `fmt ` chunk and the
//! `data` chunk header. Channel data is stored in 4096-byte blocks per
//! channel.

pub mod parser;
pub mod writer;

pub use parser::DsfParser;
pub use writer::DsfWriter;

use crate::format::codec::{Field, Record, Value};
use crate::format::descriptor::Endianness;

pub const DSD_MAGIC: &[u8; 4] = b"DSD ";
pub const FMT_CHUNK: &[u8; 4] = b"fmt ";
pub const DATA_CHUNK: &[u8; 4] = b"data";

pub const FORMAT_VERSION: u32 = 1;
/// Format id of raw DSD
pub const FORMAT_DSD_RAW: u32 = 0;
/// Bytes per channel in one block
pub const BLOCK_SIZE: u32 = 4096;

/// Speaker mask of each chanType, indexed by chanType - 1
pub const CHANNEL_TYPE_MASKS: [u32; 7] = [0x4, 0x3, 0x7, 0x33, 0xf, 0x37, 0x3f];

/// Maximum channel count
pub const MAX_CHANNELS: u32 = 6;

/// Mask for a chanType, if valid
pub fn mask_for_channel_type(channel_type: u32) -> Option<u32> {
    let index = channel_type.checked_sub(1)? as usize;
    CHANNEL_TYPE_MASKS.get(index).copied()
}

/// chanType describing `mask`, else the usual one for the channel count
pub fn channel_type_for(num_channels: u32, mask: u32) -> Option<u32> {
    if let Some(index) = CHANNEL_TYPE_MASKS
        .iter()
        .position(|&m| m == mask && m.count_ones() == num_channels)
    {
        return Some(index as u32 + 1);
    }
    match num_channels {
        1..=4 => Some(num_channels),
        5 => Some(6),
        6 => Some(7),
        _ => None,
    }
}

/// Bytes of `data` body for `bytes_per_channel`, rounded up to whole blocks
///
/// Saturates at `u64::MAX`.
pub fn block_padded_size(bytes_per_channel: u64, num_channels: u32) -> u64 {
    bytes_per_channel
        .div_ceil(BLOCK_SIZE as u64)
        .saturating_mul(BLOCK_SIZE as u64)
        .saturating_mul(num_channels as u64)
}

/// The `DSD ` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsfFileChunk {
    pub id: [u8; 4],
    /// Always 28
    pub size: u64,
    pub file_size: u64,
    /// Offset of the metadata chunk, zero when absent
    pub metadata_offset: u64,
}

impl Record for DsfFileChunk {
    const LAYOUT: &'static [Field] = &[Field::Tag(4), Field::U64, Field::U64, Field::U64];
    const ORDER: Endianness = Endianness::Little;

    fn from_values(values: &[Value]) -> Self {
        DsfFileChunk {
            id: values[0].as_tag(),
            size: values[1].as_u64(),
            file_size: values[2].as_u64(),
            metadata_offset: values[3].as_u64(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Tag(self.id.to_vec()),
            Value::U64(self.size),
            Value::U64(self.file_size),
            Value::U64(self.metadata_offset),
        ]
    }
}

/// The `fmt ` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsfFormatChunk {
    pub id: [u8; 4],
    /// Always 52
    pub size: u64,
    pub version: u32,
    pub format_id: u32,
    pub channel_type: u32,
    pub num_channels: u32,
    /// DSD bit rate
    pub sample_rate: u32,
    /// 1 for LSB-first, 8 for MSB-first
    pub bits_per_sample: u32,
    /// 1-bit samples per channel
    pub sample_count: u64,
    pub block_size: u32,
    pub reserved: u32,
}

impl Record for DsfFormatChunk {
    const LAYOUT: &'static [Field] = &[
        Field::Tag(4),
        Field::U64,
        Field::U32,
        Field::U32,
        Field::U32,
        Field::U32,
        Field::U32,
        Field::U32,
        Field::U64,
        Field::U32,
        Field::U32,
    ];
    const ORDER: Endianness = Endianness::Little;

    fn from_values(values: &[Value]) -> Self {
        DsfFormatChunk {
            id: values[0].as_tag(),
            size: values[1].as_u64(),
            version: values[2].as_u32(),
            format_id: values[3].as_u32(),
            channel_type: values[4].as_u32(),
            num_channels: values[5].as_u32(),
            sample_rate: values[6].as_u32(),
            bits_per_sample: values[7].as_u32(),
            sample_count: values[8].as_u64(),
            block_size: values[9].as_u32(),
            reserved: values[10].as_u32(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Tag(self.id.to_vec()),
            Value::U64(self.size),
            Value::U32(self.version),
            Value::U32(self.format_id),
            Value::U32(self.channel_type),
            Value::U32(self.num_channels),
            Value::U32(self.sample_rate),
            Value::U32(self.bits_per_sample),
            Value::U64(self.sample_count),
            Value::U32(self.block_size),
            Value::U32(self.reserved),
        ]
    }
}

/// The `data` chunk header; `size` includes these 12 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsfDataHeader {
    pub id: [u8; 4],
    pub size: u64,
}

impl Record for DsfDataHeader {
    const LAYOUT: &'static [Field] = &[Field::Tag(4), Field::U64];
    const ORDER: Endianness = Endianness::Little;

    fn from_values(values: &[Value]) -> Self {
        DsfDataHeader {
            id: values[0].as_tag(),
            size: values[1].as_u64(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![Value::Tag(self.id.to_vec()), Value::U64(self.size)]
    }
}
