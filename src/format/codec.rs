//! Declarative chunk record codec
//!
//! Every fixed-layout structure in the supported containers is described by a
//! static list of [`Field`]s plus a byte order. One generic routine turns bytes
//! into [`Value`]s and back, so each record type only maps values to its own
//! fields.

use super::descriptor::Endianness;
use super::registry::ContainerKind;
use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::io::{Read, Write};

/// One primitive in a record layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Raw bytes copied verbatim (four-character codes, GUID tails)
    Tag(usize),
    U16,
    U32,
    U64,
    /// IEEE 754 double
    F64,
}

impl Field {
    /// Encoded width in bytes
    pub const fn size(&self) -> usize {
        match self {
            Field::Tag(n) => *n,
            Field::U16 => 2,
            Field::U32 => 4,
            Field::U64 | Field::F64 => 8,
        }
    }
}

/// Total encoded width of a layout
pub const fn layout_size(fields: &[Field]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < fields.len() {
        total += fields[i].size();
        i += 1;
    }
    total
}

/// A decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Tag(Vec<u8>),
    U16(u16),
    U32(u32),
    U64(u64),
    F64(f64),
}

impl Value {
    /// Integer value widened to u64 (tags read as zero)
    pub fn as_u64(&self) -> u64 {
        match self {
            Value::U16(v) => *v as u64,
            Value::U32(v) => *v as u64,
            Value::U64(v) => *v,
            Value::F64(v) => *v as u64,
            Value::Tag(_) => 0,
        }
    }

    pub fn as_u32(&self) -> u32 {
        self.as_u64() as u32
    }

    pub fn as_u16(&self) -> u16 {
        self.as_u64() as u16
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Value::F64(v) => *v,
            other => other.as_u64() as f64,
        }
    }

    /// Tag bytes as a fixed array, zero-filled or cut to `N`
    pub fn as_tag<const N: usize>(&self) -> [u8; N] {
        let mut out = [0u8; N];
        if let Value::Tag(bytes) = self {
            let n = bytes.len().min(N);
            out[..n].copy_from_slice(&bytes[..n]);
        }
        out
    }
}

/// A fixed-layout structure
pub trait Record: Sized {
    /// Field list in stream order
    const LAYOUT: &'static [Field];
    /// Byte order of every numeric field
    const ORDER: Endianness;
    /// Encoded size
    const SIZE: usize = layout_size(Self::LAYOUT);

    /// Build from values decoded per `LAYOUT`
    fn from_values(values: &[Value]) -> Self;

    /// Produce values in `LAYOUT` order
    fn to_values(&self) -> Vec<Value>;
}

/// Decode `fields` from the front of `bytes`.
///
/// `bytes` must hold at least `layout_size(fields)` bytes.
pub fn decode_values(bytes: &[u8], fields: &[Field], order: Endianness) -> Vec<Value> {
    let mut values = Vec::with_capacity(fields.len());
    let mut pos = 0;

    for field in fields {
        let raw = &bytes[pos..pos + field.size()];
        let value = match (field, order) {
            (Field::Tag(_), _) => Value::Tag(raw.to_vec()),
            (Field::U16, Endianness::Little) => Value::U16(LittleEndian::read_u16(raw)),
            (Field::U16, Endianness::Big) => Value::U16(BigEndian::read_u16(raw)),
            (Field::U32, Endianness::Little) => Value::U32(LittleEndian::read_u32(raw)),
            (Field::U32, Endianness::Big) => Value::U32(BigEndian::read_u32(raw)),
            (Field::U64, Endianness::Little) => Value::U64(LittleEndian::read_u64(raw)),
            (Field::U64, Endianness::Big) => Value::U64(BigEndian::read_u64(raw)),
            (Field::F64, Endianness::Little) => Value::F64(LittleEndian::read_f64(raw)),
            (Field::F64, Endianness::Big) => Value::F64(BigEndian::read_f64(raw)),
        };
        values.push(value);
        pos += field.size();
    }

    values
}

/// Encode `values` per `fields`.
///
/// A value whose variant does not match its field is converted; tags are
/// zero-padded or cut to the field width.
pub fn encode_values(values: &[Value], fields: &[Field], order: Endianness) -> Vec<u8> {
    let mut out = vec![0u8; layout_size(fields)];
    let mut pos = 0;

    for (field, value) in fields.iter().zip(values) {
        let slot = &mut out[pos..pos + field.size()];
        match (field, order) {
            (Field::Tag(n), _) => {
                if let Value::Tag(bytes) = value {
                    let len = bytes.len().min(*n);
                    slot[..len].copy_from_slice(&bytes[..len]);
                }
            }
            (Field::U16, Endianness::Little) => LittleEndian::write_u16(slot, value.as_u16()),
            (Field::U16, Endianness::Big) => BigEndian::write_u16(slot, value.as_u16()),
            (Field::U32, Endianness::Little) => LittleEndian::write_u32(slot, value.as_u32()),
            (Field::U32, Endianness::Big) => BigEndian::write_u32(slot, value.as_u32()),
            (Field::U64, Endianness::Little) => LittleEndian::write_u64(slot, value.as_u64()),
            (Field::U64, Endianness::Big) => BigEndian::write_u64(slot, value.as_u64()),
            (Field::F64, Endianness::Little) => LittleEndian::write_f64(slot, value.as_f64()),
            (Field::F64, Endianness::Big) => BigEndian::write_f64(slot, value.as_f64()),
        }
        pos += field.size();
    }

    out
}

/// Reads and writes [`Record`]s on behalf of one container
///
/// The container kind only flavours error messages.
#[derive(Debug, Clone, Copy)]
pub struct ChunkCodec {
    container: ContainerKind,
}

impl ChunkCodec {
    pub fn new(container: ContainerKind) -> Self {
        ChunkCodec { container }
    }

    pub fn container(&self) -> ContainerKind {
        self.container
    }

    /// Decode a record from the front of `bytes`
    pub fn decode<T: Record>(&self, bytes: &[u8]) -> Result<T> {
        if bytes.len() < T::SIZE {
            return Err(Error::truncated(
                self.container,
                format!("record needs {} bytes, have {}", T::SIZE, bytes.len()),
            ));
        }
        Ok(T::from_values(&decode_values(bytes, T::LAYOUT, T::ORDER)))
    }

    /// Encode a record
    pub fn encode<T: Record>(&self, record: &T) -> Vec<u8> {
        encode_values(&record.to_values(), T::LAYOUT, T::ORDER)
    }

    /// Read one record, returning it with its raw bytes
    pub fn read<T: Record>(&self, reader: &mut dyn Read) -> Result<(T, Vec<u8>)> {
        let mut raw = vec![0u8; T::SIZE];
        reader
            .read_exact(&mut raw)
            .map_err(|e| Error::from_read(self.container, "reading chunk record", e))?;
        let record = self.decode(&raw)?;
        Ok((record, raw))
    }

    /// Write one record
    pub fn write<T: Record>(&self, writer: &mut dyn Write, record: &T) -> Result<()> {
        writer.write_all(&self.encode(record))?;
        Ok(())
    }
}
