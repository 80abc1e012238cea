//! Wave64 header parser

use super::{Wave64ChunkHeader, Wave64FileHeader, DATA_GUID, FMT_GUID, RIFF_GUID, WAVE_GUID};
use crate::error::{Error, Result};
use crate::format::codec::Record;
use crate::format::descriptor::FormatBuilder;
use crate::format::padding::padded_size;
use crate::format::parser::{HeaderParser, ParseContext, ParseOptions, ParsedHeader};
use crate::format::registry::ContainerKind;
use crate::format::wav::header::{WaveHeader, FMT_SIZE_EXTENSIBLE, FMT_SIZE_PCM};
use std::io::Read;
use tracing::debug;

const KIND: ContainerKind = ContainerKind::Wave64;

/// Parser for Sony Wave64 files
#[derive(Debug, Clone, Copy, Default)]
pub struct Wave64Parser;

impl Wave64Parser {
    pub fn new() -> Self {
        Wave64Parser
    }
}

impl HeaderParser for Wave64Parser {
    fn kind(&self) -> ContainerKind {
        KIND
    }

    fn parse(
        &self,
        reader: &mut dyn Read,
        file_size: u64,
        options: &ParseOptions,
    ) -> Result<ParsedHeader> {
        let mut ctx = ParseContext::new(reader, KIND, options);

        let file: Wave64FileHeader = ctx.read_record("file header")?;
        if file.riff != RIFF_GUID || file.wave != WAVE_GUID {
            return Err(Error::invalid(KIND, "missing riff/wave GUIDs"));
        }

        let mut builder: Option<FormatBuilder> = None;

        loop {
            let chunk: Wave64ChunkHeader = ctx.read_record("chunk header")?;
            let size = chunk
                .size
                .checked_sub(Wave64ChunkHeader::SIZE as u64)
                .ok_or_else(|| Error::chunk_size(KIND, &chunk.guid[..4], chunk.size))?;

            if chunk.guid == FMT_GUID {
                if !(FMT_SIZE_PCM as u64..=FMT_SIZE_EXTENSIBLE as u64).contains(&size) {
                    return Err(Error::chunk_size(KIND, &chunk.guid[..4], chunk.size));
                }
                let body = ctx.read_bytes(size as usize, "fmt chunk")?;
                ctx.skip(padded_size(size, KIND.alignment()) - size, "fmt chunk padding")?;

                let mut warnings = Vec::new();
                let wave = WaveHeader::from_chunk(&body);
                builder = Some(wave.to_builder(size as u32, options, KIND, &mut warnings)?);
                for warning in warnings {
                    ctx.warn(warning);
                }
            } else if chunk.guid == DATA_GUID {
                let builder = builder
                    .take()
                    .ok_or_else(|| Error::invalid(KIND, "data chunk before fmt chunk"))?;
                let block_align = builder.bytes_per_sample as u64 * builder.num_channels as u64;
                let length = ctx.payload_frames(Some(size), block_align, file_size, options)?;

                let format = builder
                    .total_samples(length.frames)
                    .qualify(length.qualify())
                    .build()?;
                return Ok(ctx.finish(format));
            } else {
                debug!(
                    "Copying Wave64 chunk '{}' of {} bytes",
                    String::from_utf8_lossy(&chunk.guid[..4]),
                    size
                );
                ctx.skip(padded_size(size, KIND.alignment()), "unknown chunk")?;
            }
        }
    }
}
