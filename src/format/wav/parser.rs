//! RIFF / RF64 header parser

use super::header::{WaveHeader, FMT_SIZE_EXTENSIBLE, FMT_SIZE_PCM};
use super::{
    ChunkHeader, Ds64Chunk, RiffHeader, SizeTableEntry, DATA_CHUNK, DS64_CHUNK, FMT_CHUNK,
    RF64_MAGIC, RIFF_MAGIC, WAVE_MAGIC,
};
use crate::error::{Error, Result};
use crate::format::codec::Record;
use crate::format::descriptor::FormatBuilder;
use crate::format::padding::padded_size;
use crate::format::parser::{HeaderParser, ParseContext, ParseOptions, ParsedHeader};
use crate::format::registry::ContainerKind;
use std::io::Read;
use tracing::debug;

/// Parser for RIFF WAVE and RF64 files
#[derive(Debug, Clone, Copy, Default)]
pub struct WavParser;

impl WavParser {
    pub fn new() -> Self {
        WavParser
    }
}

impl HeaderParser for WavParser {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Wav
    }

    fn parse(
        &self,
        reader: &mut dyn Read,
        file_size: u64,
        options: &ParseOptions,
    ) -> Result<ParsedHeader> {
        let mut ctx = ParseContext::new(reader, ContainerKind::Wav, options);

        let riff: RiffHeader = ctx.read_record("RIFF header")?;
        let is_rf64 = if &riff.id == RF64_MAGIC {
            ctx.set_container(ContainerKind::Rf64);
            true
        } else if &riff.id == RIFF_MAGIC {
            false
        } else {
            return Err(Error::invalid(ContainerKind::Wav, "missing RIFF header"));
        };
        let container = ctx.container();

        if &riff.form_type != WAVE_MAGIC {
            return Err(Error::invalid(container, "form type is not WAVE"));
        }

        let mut ds64: Option<Ds64Chunk> = None;
        let mut builder: Option<FormatBuilder> = None;

        loop {
            let chunk: ChunkHeader = ctx.read_record("chunk header")?;
            let padded = padded_size(chunk.size as u64, container.alignment());

            if &chunk.id == DS64_CHUNK {
                if (chunk.size as usize) < Ds64Chunk::SIZE {
                    return Err(Error::chunk_size(container, &chunk.id, chunk.size as u64));
                }
                let body: Ds64Chunk = ctx.read_record("ds64 chunk")?;
                let mut consumed = Ds64Chunk::SIZE as u64;

                for _ in 0..body.table_length {
                    if consumed + SizeTableEntry::SIZE as u64 > chunk.size as u64 {
                        return Err(Error::chunk_size(container, &chunk.id, chunk.size as u64));
                    }
                    let entry: SizeTableEntry = ctx.read_record("ds64 size table")?;
                    debug!(
                        "ds64 table: '{}' is {} bytes",
                        String::from_utf8_lossy(&entry.id),
                        entry.size
                    );
                    consumed += SizeTableEntry::SIZE as u64;
                }

                ctx.skip(padded - consumed, "ds64 chunk")?;
                debug!(
                    "ds64: riff {} data {} samples {}",
                    body.riff_size, body.data_size, body.sample_count
                );
                ds64 = Some(body);
            } else if &chunk.id == FMT_CHUNK {
                let size = chunk.size as usize;
                if !(FMT_SIZE_PCM..=FMT_SIZE_EXTENSIBLE).contains(&size) {
                    return Err(Error::chunk_size(container, &chunk.id, chunk.size as u64));
                }
                let body = ctx.read_bytes(size, "fmt chunk")?;
                ctx.skip(padded - size as u64, "fmt chunk padding")?;

                let mut warnings = Vec::new();
                let wave = WaveHeader::from_chunk(&body);
                builder = Some(wave.to_builder(chunk.size, options, container, &mut warnings)?);
                for warning in warnings {
                    ctx.warn(warning);
                }
            } else if &chunk.id == DATA_CHUNK {
                let builder = builder
                    .take()
                    .ok_or_else(|| Error::invalid(container, "data chunk before fmt chunk"))?;
                if is_rf64 && ds64.is_none() {
                    return Err(Error::invalid(container, "RF64 file without ds64 chunk"));
                }

                let declared = match &ds64 {
                    Some(body) if chunk.size == u32::MAX => body.data_size,
                    _ => chunk.size as u64,
                };
                let block_align = builder.bytes_per_sample as u64 * builder.num_channels as u64;
                let length = ctx.payload_frames(Some(declared), block_align, file_size, options)?;

                if let (Some(body), Some(frames), false) = (&ds64, length.frames, length.ignored) {
                    if body.sample_count != frames {
                        return Err(Error::invalid(
                            container,
                            format!(
                                "ds64 sample count {} disagrees with {} samples of data",
                                body.sample_count, frames
                            ),
                        ));
                    }
                }

                let format = builder
                    .total_samples(length.frames)
                    .qualify(length.qualify())
                    .build()?;
                return Ok(ctx.finish(format));
            } else {
                debug!(
                    "Copying {} chunk '{}' of {} bytes",
                    container,
                    String::from_utf8_lossy(&chunk.id),
                    chunk.size
                );
                ctx.skip(padded, "unknown chunk")?;
            }
        }
    }
}
