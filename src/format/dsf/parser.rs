//! DSF header parser

use super::{
    block_padded_size, mask_for_channel_type, DsfDataHeader, DsfFileChunk, DsfFormatChunk,
    BLOCK_SIZE, DATA_CHUNK, DSD_MAGIC, FMT_CHUNK, FORMAT_DSD_RAW, FORMAT_VERSION, MAX_CHANNELS,
};
use crate::error::{Error, Result};
use crate::format::codec::Record;
use crate::format::descriptor::{AudioFormatDescriptor, QualifyFlags};
use crate::format::parser::{HeaderParser, ParseContext, ParseOptions, ParsedHeader};
use crate::format::registry::ContainerKind;
use std::io::Read;
use tracing::debug;

const KIND: ContainerKind = ContainerKind::Dsf;

/// Parser for Sony DSF files
#[derive(Debug, Clone, Copy, Default)]
pub struct DsfParser;

impl DsfParser {
    pub fn new() -> Self {
        DsfParser
    }
}

impl HeaderParser for DsfParser {
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

        let file: DsfFileChunk = ctx.read_record("DSD chunk")?;
        if &file.id != DSD_MAGIC || file.size != DsfFileChunk::SIZE as u64 {
            return Err(Error::invalid(KIND, "missing DSD chunk"));
        }

        let fmt: DsfFormatChunk = ctx.read_record("fmt chunk")?;
        if &fmt.id != FMT_CHUNK || fmt.size != DsfFormatChunk::SIZE as u64 {
            return Err(Error::invalid(KIND, "missing fmt chunk"));
        }
        debug!(
            "DSF fmt: version {}, chanType {}, {} channel(s), {} Hz, {} bits, {} samples",
            fmt.version,
            fmt.channel_type,
            fmt.num_channels,
            fmt.sample_rate,
            fmt.bits_per_sample,
            fmt.sample_count
        );

        let type_mask = mask_for_channel_type(fmt.channel_type)
            .ok_or_else(|| Error::unsupported(KIND, format!("chanType {}", fmt.channel_type)))?;
        if fmt.version != FORMAT_VERSION
            || fmt.format_id != FORMAT_DSD_RAW
            || fmt.block_size != BLOCK_SIZE
            || fmt.reserved != 0
        {
            return Err(Error::unsupported(
                KIND,
                format!(
                    "version {}, format {}, block size {}",
                    fmt.version, fmt.format_id, fmt.block_size
                ),
            ));
        }
        if fmt.num_channels == 0
            || fmt.num_channels > MAX_CHANNELS
            || fmt.num_channels != type_mask.count_ones()
        {
            return Err(Error::unsupported(
                KIND,
                format!("{} channels for chanType {}", fmt.num_channels, fmt.channel_type),
            ));
        }
        let bit_order = match fmt.bits_per_sample {
            1 => QualifyFlags::DSD_LSB_FIRST,
            8 => QualifyFlags::DSD_MSB_FIRST,
            bits => {
                return Err(Error::unsupported(
                    KIND,
                    format!("{} bits per sample", bits),
                ))
            }
        };
        if fmt.sample_rate < 8 {
            return Err(Error::unsupported(
                KIND,
                format!("sample rate {}", fmt.sample_rate),
            ));
        }

        let data: DsfDataHeader = ctx.read_record("data chunk")?;
        if &data.id != DATA_CHUNK {
            return Err(Error::invalid(KIND, "missing data chunk"));
        }
        let data_bytes = data
            .size
            .checked_sub(DsfDataHeader::SIZE as u64)
            .ok_or_else(|| Error::chunk_size(KIND, &data.id, data.size))?;

        let channels = fmt.num_channels as u64;
        let bytes_per_channel = fmt.sample_count.div_ceil(8);
        let length = if options.ignore_length {
            ctx.payload_frames(None, channels, file_size, options)?
        } else {
            if data_bytes != block_padded_size(bytes_per_channel, fmt.num_channels) {
                return Err(Error::chunk_size(KIND, &data.id, data.size));
            }
            let mut length = ctx.payload_frames(Some(data_bytes), channels, file_size, options)?;
            length.frames = Some(bytes_per_channel);
            length
        };

        let mask = if options.has_channel_order() {
            options.channel_mask.unwrap_or(0)
        } else {
            type_mask
        };

        let format = AudioFormatDescriptor::builder()
            .sample_rate(fmt.sample_rate / 8)
            .bits(8)
            .channels(fmt.num_channels)
            .channel_mask(mask)
            .total_samples(length.frames)
            .qualify(options.qualify())
            .qualify(length.qualify())
            .qualify(QualifyFlags::DSD_AUDIO | QualifyFlags::DSD_IN_BLOCKS | bit_order)
            .build()?;

        let mut parsed = ctx.finish(format);
        parsed.trailer_offset = (file.metadata_offset != 0).then_some(file.metadata_offset);
        Ok(parsed)
    }
}
