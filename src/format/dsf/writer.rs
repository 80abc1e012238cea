//! DSF header writer

use super::{
    block_padded_size, channel_type_for, DsfDataHeader, DsfFileChunk, DsfFormatChunk, BLOCK_SIZE,
    DATA_CHUNK, DSD_MAGIC, FMT_CHUNK, FORMAT_DSD_RAW, FORMAT_VERSION, MAX_CHANNELS,
};
use crate::error::{Error, Result};
use crate::format::codec::{ChunkCodec, Record};
use crate::format::descriptor::{AudioFormatDescriptor, QualifyFlags};
use crate::format::registry::ContainerKind;
use crate::format::writer::{check_dsd, HeaderWriter};

const KIND: ContainerKind = ContainerKind::Dsf;

/// Writer for Sony DSF files
///
/// Only payloads in channel blocks with a known bit order can be stored.
/// MSB-first is declared as 8 bits per sample and LSB-first as 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct DsfWriter;

impl DsfWriter {
    pub fn new() -> Self {
        DsfWriter
    }
}

impl HeaderWriter for DsfWriter {
    fn kind(&self) -> ContainerKind {
        KIND
    }

    fn render_header(
        &self,
        format: &AudioFormatDescriptor,
        total_samples: Option<u64>,
    ) -> Result<Vec<u8>> {
        let bit_rate = check_dsd(format, KIND)?;
        if !format.qualify.contains(QualifyFlags::DSD_IN_BLOCKS) {
            return Err(Error::unsupported(KIND, "interleaved DSD"));
        }
        let bits_per_sample = if format.qualify.contains(QualifyFlags::DSD_MSB_FIRST) {
            8
        } else if format.qualify.contains(QualifyFlags::DSD_LSB_FIRST) {
            1
        } else {
            return Err(Error::unsupported(KIND, "DSD without a bit order"));
        };
        let channel_type = channel_type_for(format.num_channels, format.channel_mask)
            .filter(|_| format.num_channels <= MAX_CHANNELS)
            .ok_or_else(|| {
                Error::unsupported(KIND, format!("{} channels", format.num_channels))
            })?;

        let bytes_per_channel = total_samples.unwrap_or(0);
        let data_bytes = block_padded_size(bytes_per_channel, format.num_channels);
        let header_len = (DsfFileChunk::SIZE + DsfFormatChunk::SIZE + DsfDataHeader::SIZE) as u64;

        let codec = ChunkCodec::new(KIND);
        let mut out = codec.encode(&DsfFileChunk {
            id: *DSD_MAGIC,
            size: DsfFileChunk::SIZE as u64,
            file_size: header_len + data_bytes,
            metadata_offset: 0,
        });
        out.extend(codec.encode(&DsfFormatChunk {
            id: *FMT_CHUNK,
            size: DsfFormatChunk::SIZE as u64,
            version: FORMAT_VERSION,
            format_id: FORMAT_DSD_RAW,
            channel_type,
            num_channels: format.num_channels,
            sample_rate: bit_rate,
            bits_per_sample,
            sample_count: bytes_per_channel * 8,
            block_size: BLOCK_SIZE,
            reserved: 0,
        }));
        out.extend(codec.encode(&DsfDataHeader {
            id: *DATA_CHUNK,
            size: DsfDataHeader::SIZE as u64 + data_bytes,
        }));

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::dsf::DsfParser;
    use crate::format::parser::{HeaderParser, ParseOptions};
    use byteorder::{ByteOrder, LittleEndian};

    fn dsd(channels: u32, mask: u32) -> AudioFormatDescriptor {
        dsd_ordered(channels, mask, QualifyFlags::DSD_LSB_FIRST)
    }

    fn dsd_ordered(channels: u32, mask: u32, order: QualifyFlags) -> AudioFormatDescriptor {
        AudioFormatDescriptor::builder()
            .sample_rate(352_800)
            .bits(8)
            .channels(channels)
            .channel_mask(mask)
            .total_samples(Some(5000))
            .qualify(QualifyFlags::DSD_AUDIO | QualifyFlags::DSD_IN_BLOCKS | order)
            .build()
            .unwrap()
    }

    #[test]
    fn test_layout() {
        let header = DsfWriter.render_header(&dsd(2, 0x3), Some(5000)).unwrap();
        assert_eq!(header.len(), 92);
        assert_eq!(LittleEndian::read_u64(&header[12..20]), 92 + 16384);
        assert_eq!(LittleEndian::read_u32(&header[48..52]), 2);
        assert_eq!(LittleEndian::read_u32(&header[52..56]), 2);
        assert_eq!(LittleEndian::read_u32(&header[56..60]), 2_822_400);
        assert_eq!(LittleEndian::read_u32(&header[60..64]), 1);
        assert_eq!(LittleEndian::read_u64(&header[64..72]), 40_000);
        assert_eq!(LittleEndian::read_u64(&header[84..92]), 12 + 16384);
    }

    #[test]
    fn test_round_trip() {
        for (channels, mask) in [(1, 0x4), (2, 0x3), (4, 0xf), (5, 0x37), (6, 0x3f)] {
            let format = dsd(channels, mask);
            let header = DsfWriter.render_header(&format, Some(5000)).unwrap();
            let mut input: &[u8] = &header;
            let parsed = DsfParser
                .parse(&mut input, 0, &ParseOptions::default())
                .unwrap();
            assert_eq!(parsed.format, format);
        }
    }

    #[test]
    fn test_bit_order_round_trip() {
        for order in [QualifyFlags::DSD_LSB_FIRST, QualifyFlags::DSD_MSB_FIRST] {
            let format = dsd_ordered(2, 0x3, order);
            let header = DsfWriter.render_header(&format, Some(5000)).unwrap();
            let bits = if order == QualifyFlags::DSD_MSB_FIRST { 8 } else { 1 };
            assert_eq!(LittleEndian::read_u32(&header[60..64]), bits);

            let mut input: &[u8] = &header;
            let parsed = DsfParser
                .parse(&mut input, 0, &ParseOptions::default())
                .unwrap();
            assert_eq!(parsed.format, format);
        }
    }

    #[test]
    fn test_rejects_unlabelled_layouts() {
        let mut interleaved = dsd(2, 0x3);
        interleaved.qualify.remove(QualifyFlags::DSD_IN_BLOCKS);
        let mut unordered = dsd(2, 0x3);
        unordered.qualify.remove(QualifyFlags::DSD_LSB_FIRST);

        for format in [interleaved, unordered] {
            assert!(matches!(
                DsfWriter.render_header(&format, Some(1)),
                Err(Error::Unsupported { .. })
            ));
        }
    }

    #[test]
    fn test_rate_limit() {
        let mut format = dsd(2, 0x3);
        format.sample_rate = crate::format::descriptor::MAX_DSD_BYTE_RATE;
        let header = DsfWriter.render_header(&format, Some(1)).unwrap();
        assert_eq!(LittleEndian::read_u32(&header[56..60]), 0xFFFF_FFF8);

        format.sample_rate += 1;
        assert!(DsfWriter.render_header(&format, Some(1)).is_err());
    }

    #[test]
    fn test_channel_type_fallback() {
        let header = DsfWriter.render_header(&dsd(5, 0), Some(1)).unwrap();
        assert_eq!(LittleEndian::read_u32(&header[48..52]), 6);
    }

    #[test]
    fn test_too_many_channels() {
        assert!(matches!(
            DsfWriter.render_header(&dsd(7, 0), Some(1)),
            Err(Error::Unsupported { .. })
        ));
    }
}
