//! Sony Wave64 support
//!
//! Wave64 is RIFF WAVE with 16-byte GUID chunk ids and 64-bit chunk sizes
//! that count the 24-byte chunk header. The `fmt ` body is the same
//! [`WaveHeader`](crate::format::wav::WaveHeader) as in WAV.

pub mod parser;
pub mod writer;

pub use parser::Wave64Parser;
pub use writer::Wave64Writer;

use crate::format::codec::{Field, Record, Value};
use crate::format::descriptor::Endianness;

/// Shared tail of the `fmt `, `data` and `wave` GUIDs
const GUID_TAIL: [u8; 12] = [
    0xF3, 0xAC, 0xD3, 0x11, 0x8C, 0xD1, 0x00, 0xC0, 0x4F, 0x8E, 0xDB, 0x8A,
];

const fn guid(prefix: &[u8; 4], tail: &[u8; 12]) -> [u8; 16] {
    let mut out = [0u8; 16];
    let mut i = 0;
    while i < 4 {
        out[i] = prefix[i];
        i += 1;
    }
    while i < 16 {
        out[i] = tail[i - 4];
        i += 1;
    }
    out
}

pub const RIFF_GUID: [u8; 16] = guid(
    b"riff",
    &[0x2E, 0x91, 0xCF, 0x11, 0xA5, 0xD6, 0x28, 0xDB, 0x04, 0xC1, 0x00, 0x00],
);
pub const WAVE_GUID: [u8; 16] = guid(b"wave", &GUID_TAIL);
pub const FMT_GUID: [u8; 16] = guid(b"fmt ", &GUID_TAIL);
pub const DATA_GUID: [u8; 16] = guid(b"data", &GUID_TAIL);

/// File header: `riff` GUID, size of the whole file, `wave` GUID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wave64FileHeader {
    pub riff: [u8; 16],
    pub size: u64,
    pub wave: [u8; 16],
}

impl Record for Wave64FileHeader {
    const LAYOUT: &'static [Field] = &[Field::Tag(16), Field::U64, Field::Tag(16)];
    const ORDER: Endianness = Endianness::Little;

    fn from_values(values: &[Value]) -> Self {
        Wave64FileHeader {
            riff: values[0].as_tag(),
            size: values[1].as_u64(),
            wave: values[2].as_tag(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Tag(self.riff.to_vec()),
            Value::U64(self.size),
            Value::Tag(self.wave.to_vec()),
        ]
    }
}

/// Chunk header; `size` includes these 24 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wave64ChunkHeader {
    pub guid: [u8; 16],
    pub size: u64,
}

impl Record for Wave64ChunkHeader {
    const LAYOUT: &'static [Field] = &[Field::Tag(16), Field::U64];
    const ORDER: Endianness = Endianness::Little;

    fn from_values(values: &[Value]) -> Self {
        Wave64ChunkHeader {
            guid: values[0].as_tag(),
            size: values[1].as_u64(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![Value::Tag(self.guid.to_vec()), Value::U64(self.size)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guids() {
        assert_eq!(&RIFF_GUID[..4], b"riff");
        assert_eq!(RIFF_GUID[4], 0x2E);
        assert_eq!(&DATA_GUID[..4], b"data");
        assert_eq!(DATA_GUID[15], 0x8A);
        assert_eq!(Wave64FileHeader::SIZE, 40);
        assert_eq!(Wave64ChunkHeader::SIZE, 24);
    }
}
