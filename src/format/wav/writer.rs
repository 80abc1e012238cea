//! RIFF / RF64 header writer

use super::header::{check_conventions, WaveHeader};
use super::{
    ChunkHeader, Ds64Chunk, RiffHeader, DATA_CHUNK, DS64_CHUNK, FMT_CHUNK, JUNK_CHUNK,
    RF64_MAGIC, RIFF_MAGIC, WAVE_MAGIC,
};
use crate::error::Result;
use crate::format::codec::{ChunkCodec, Record};
use crate::format::descriptor::AudioFormatDescriptor;
use crate::format::padding::padded_size;
use crate::format::registry::ContainerKind;
use crate::format::writer::{check_pcm, HeaderWriter};

/// Payload size above which the 64-bit form is used
pub const RF64_THRESHOLD: u64 = 0xFF00_0000;

/// Payload bytes assumed when the sample count is not yet known
pub const UNKNOWN_LENGTH_BYTES: u64 = 0x7FFF_F000;

/// Writer for RIFF WAVE files, switching to RF64 for large payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct WavWriter {
    force_rf64: bool,
}

impl WavWriter {
    pub fn new() -> Self {
        WavWriter { force_rf64: false }
    }

    /// Writer that always emits RF64
    pub fn rf64() -> Self {
        WavWriter { force_rf64: true }
    }
}

impl HeaderWriter for WavWriter {
    fn kind(&self) -> ContainerKind {
        if self.force_rf64 {
            ContainerKind::Rf64
        } else {
            ContainerKind::Wav
        }
    }

    /// Layout: file header, `ds64` or a same-sized `junk`, `fmt `, `data`
    /// header. The 64-bit sizes go in `ds64`; the 32-bit fields then hold
    /// `0xFFFFFFFF`.
    fn render_header(
        &self,
        format: &AudioFormatDescriptor,
        total_samples: Option<u64>,
    ) -> Result<Vec<u8>> {
        let kind = self.kind();
        check_pcm(format, kind)?;
        check_conventions(format, kind)?;

        let block_align = format.block_align();
        let frames = total_samples.unwrap_or(UNKNOWN_LENGTH_BYTES / block_align);
        let data_bytes = format.payload_bytes(frames);
        let rf64 = self.force_rf64 || data_bytes > RF64_THRESHOLD;

        let (wave, fmt_size) = WaveHeader::for_format(format);
        let reserved = (ChunkHeader::SIZE + Ds64Chunk::SIZE) as u64;
        let riff_size = WAVE_MAGIC.len() as u64
            + reserved
            + (ChunkHeader::SIZE + fmt_size + ChunkHeader::SIZE) as u64
            + padded_size(data_bytes, kind.alignment());

        let codec = ChunkCodec::new(if rf64 { ContainerKind::Rf64 } else { kind });
        let mut out = Vec::with_capacity(RiffHeader::SIZE + reserved as usize + 56);

        out.extend(codec.encode(&RiffHeader {
            id: if rf64 { *RF64_MAGIC } else { *RIFF_MAGIC },
            size: if rf64 { u32::MAX } else { riff_size as u32 },
            form_type: *WAVE_MAGIC,
        }));

        if rf64 {
            out.extend(codec.encode(&ChunkHeader::new(DS64_CHUNK, Ds64Chunk::SIZE as u32)));
            out.extend(codec.encode(&Ds64Chunk {
                riff_size,
                data_size: data_bytes,
                sample_count: frames,
                table_length: 0,
            }));
        } else {
            out.extend(codec.encode(&ChunkHeader::new(JUNK_CHUNK, Ds64Chunk::SIZE as u32)));
            out.extend(std::iter::repeat(0u8).take(Ds64Chunk::SIZE));
        }

        out.extend(codec.encode(&ChunkHeader::new(FMT_CHUNK, fmt_size as u32)));
        out.extend_from_slice(&codec.encode(&wave)[..fmt_size]);

        out.extend(codec.encode(&ChunkHeader::new(
            DATA_CHUNK,
            if rf64 { u32::MAX } else { data_bytes as u32 },
        )));

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::format::descriptor::{Endianness, QualifyFlags, SampleKind};
    use crate::format::parser::{HeaderParser, ParseOptions};
    use crate::format::wav::WavParser;
    use byteorder::{ByteOrder, LittleEndian};

    fn stereo() -> AudioFormatDescriptor {
        AudioFormatDescriptor::builder()
            .sample_rate(44100)
            .bits(16)
            .channels(2)
            .channel_mask(0x3)
            .total_samples(Some(1000))
            .build()
            .unwrap()
    }

    #[test]
    fn test_layout() {
        let header = WavWriter::new().render_header(&stereo(), Some(1000)).unwrap();
        assert_eq!(header.len(), 12 + 36 + 8 + 16 + 8);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(LittleEndian::read_u32(&header[4..8]), 4 + 36 + 24 + 8 + 4000);
        assert_eq!(&header[12..16], b"junk");
        assert_eq!(&header[48..52], b"fmt ");
        assert_eq!(&header[72..76], b"data");
        assert_eq!(LittleEndian::read_u32(&header[76..80]), 4000);
    }

    #[test]
    fn test_odd_payload_counts_padding() {
        let mono8 = AudioFormatDescriptor::builder()
            .sample_rate(8000)
            .bits(8)
            .channels(1)
            .channel_mask(0x4)
            .sample_kind(SampleKind::UnsignedInteger)
            .build()
            .unwrap();
        let header = WavWriter::new().render_header(&mono8, Some(3)).unwrap();
        assert_eq!(LittleEndian::read_u32(&header[4..8]), 4 + 36 + 24 + 8 + 4);
        assert_eq!(LittleEndian::read_u32(&header[76..80]), 3);
    }

    #[test]
    fn test_unknown_length_placeholder() {
        let header = WavWriter::new().render_header(&stereo(), None).unwrap();
        assert_eq!(
            LittleEndian::read_u32(&header[76..80]) as u64,
            UNKNOWN_LENGTH_BYTES / 4 * 4
        );
    }

    #[test]
    fn test_forced_rf64_parses() {
        let header = WavWriter::rf64().render_header(&stereo(), Some(1000)).unwrap();
        assert_eq!(&header[0..4], b"RF64");
        assert_eq!(&header[12..16], b"ds64");

        let mut file = header.clone();
        file.extend_from_slice(&[0u8; 4000]);
        let mut input: &[u8] = &file;
        let parsed = WavParser
            .parse(&mut input, file.len() as u64, &ParseOptions::default())
            .unwrap();
        assert_eq!(parsed.container, ContainerKind::Rf64);
        assert_eq!(parsed.format, stereo());
    }

    #[test]
    fn test_rejects() {
        let mut big = stereo();
        big.endianness = Endianness::Big;
        assert!(matches!(
            WavWriter::new().render_header(&big, None),
            Err(Error::Unsupported { .. })
        ));

        let mut dsd = stereo();
        dsd.qualify |= QualifyFlags::DSD_AUDIO;
        assert!(WavWriter::new().render_header(&dsd, None).is_err());
    }
}
