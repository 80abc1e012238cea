//! Wave64 header writer

use super::{Wave64ChunkHeader, Wave64FileHeader, DATA_GUID, FMT_GUID, RIFF_GUID, WAVE_GUID};
use crate::error::Result;
use crate::format::codec::{ChunkCodec, Record};
use crate::format::descriptor::AudioFormatDescriptor;
use crate::format::padding::padded_size;
use crate::format::registry::ContainerKind;
use crate::format::wav::header::{check_conventions, WaveHeader};
use crate::format::writer::{check_pcm, HeaderWriter};

const KIND: ContainerKind = ContainerKind::Wave64;

/// Writer for Sony Wave64 files
#[derive(Debug, Clone, Copy, Default)]
pub struct Wave64Writer;

impl Wave64Writer {
    pub fn new() -> Self {
        Wave64Writer
    }
}

impl HeaderWriter for Wave64Writer {
    fn kind(&self) -> ContainerKind {
        KIND
    }

    fn render_header(
        &self,
        format: &AudioFormatDescriptor,
        total_samples: Option<u64>,
    ) -> Result<Vec<u8>> {
        check_pcm(format, KIND)?;
        check_conventions(format, KIND)?;

        let data_bytes = format.payload_bytes(total_samples.unwrap_or(0));
        let (wave, fmt_size) = WaveHeader::for_format(format);
        let chunk_header = Wave64ChunkHeader::SIZE as u64;
        let fmt_chunk = padded_size(chunk_header + fmt_size as u64, KIND.alignment());
        let file_size = Wave64FileHeader::SIZE as u64
            + fmt_chunk
            + chunk_header
            + padded_size(data_bytes, KIND.alignment());

        let codec = ChunkCodec::new(KIND);
        let mut out = codec.encode(&Wave64FileHeader {
            riff: RIFF_GUID,
            size: file_size,
            wave: WAVE_GUID,
        });

        out.extend(codec.encode(&Wave64ChunkHeader {
            guid: FMT_GUID,
            size: chunk_header + fmt_size as u64,
        }));
        out.extend_from_slice(&codec.encode(&wave)[..fmt_size]);
        out.resize(Wave64FileHeader::SIZE + fmt_chunk as usize, 0);

        out.extend(codec.encode(&Wave64ChunkHeader {
            guid: DATA_GUID,
            size: chunk_header + data_bytes,
        }));

        Ok(out)
    }
}
