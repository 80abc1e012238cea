//! CAF header parser

use super::layouts;
use super::{
    CafAudioFormat, CafChannelDescription, CafChannelLayout, CafChunkHeader, CafFileHeader,
    CAFF_MAGIC, CAF_VERSION, CHAN_CHUNK, DATA_CHUNK, DESC_CHUNK, EDIT_COUNT_SIZE,
    FORMAT_FLAG_FLOAT, FORMAT_FLAG_LITTLE_ENDIAN, LPCM_FORMAT, TAG_USE_BITMAP,
    TAG_USE_DESCRIPTIONS, UNKNOWN_DATA_SIZE,
};
use crate::error::{Error, Result, Warning};
use crate::format::channels::{self, ChannelLabel, ChannelReorderPlan};
use crate::format::codec::Record;
use crate::format::descriptor::{
    AudioFormatDescriptor, Endianness, FormatBuilder, SampleKind, NORMALIZED_EXPONENT,
};
use crate::format::parser::{HeaderParser, ParseContext, ParseOptions, ParsedHeader};
use crate::format::registry::ContainerKind;
use std::io::Read;
use tracing::debug;

const KIND: ContainerKind = ContainerKind::Caf;

/// Largest sample rate a `desc` chunk may carry
const MAX_SAMPLE_RATE: f64 = 16_777_215.0;

/// Parser for Apple Core Audio files
#[derive(Debug, Clone, Copy, Default)]
pub struct CafParser;

impl CafParser {
    pub fn new() -> Self {
        CafParser
    }
}

impl HeaderParser for CafParser {
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

        let file: CafFileHeader = ctx.read_record("file header")?;
        if &file.file_type != CAFF_MAGIC {
            return Err(Error::invalid(KIND, "missing caff header"));
        }
        if file.version != CAF_VERSION {
            return Err(Error::unsupported(
                KIND,
                format!("can't handle version {} files", file.version),
            ));
        }

        let mut builder: Option<FormatBuilder> = None;
        let mut layout: Option<FileLayout> = None;
        let mut saw_chan = false;

        loop {
            let chunk: CafChunkHeader = ctx.read_record("chunk header")?;

            if &chunk.chunk_type == DESC_CHUNK {
                if chunk.size != CafAudioFormat::SIZE as u64 {
                    return Err(Error::chunk_size(KIND, &chunk.chunk_type, chunk.size));
                }
                let desc: CafAudioFormat = ctx.read_record("desc chunk")?;
                builder = Some(interpret_desc(&desc, options)?);
            } else if &chunk.chunk_type == CHAN_CHUNK {
                if chunk.size < CafChannelLayout::SIZE as u64 {
                    return Err(Error::chunk_size(KIND, &chunk.chunk_type, chunk.size));
                }
                if options.has_channel_order() {
                    return Err(Error::ChannelOrderConflict { container: KIND });
                }
                let num_channels = builder
                    .as_ref()
                    .map(|b| b.num_channels)
                    .ok_or_else(|| Error::invalid(KIND, "chan chunk before desc chunk"))?;

                saw_chan = true;
                layout = read_layout(&mut ctx, chunk.size, num_channels)?;
            } else if &chunk.chunk_type == DATA_CHUNK {
                let builder = builder
                    .take()
                    .ok_or_else(|| Error::invalid(KIND, "data chunk before desc chunk"))?;
                let _edit_count = ctx.read_bytes(EDIT_COUNT_SIZE as usize, "edit count")?;

                let frame_bytes = builder.bytes_per_sample as u64 * builder.num_channels as u64;
                let declared = if chunk.size == UNKNOWN_DATA_SIZE {
                    None
                } else {
                    let bytes = chunk
                        .size
                        .checked_sub(EDIT_COUNT_SIZE)
                        .ok_or_else(|| Error::chunk_size(KIND, &chunk.chunk_type, chunk.size))?;
                    if !options.ignore_length && bytes % frame_bytes != 0 {
                        return Err(Error::chunk_size(KIND, &chunk.chunk_type, chunk.size));
                    }
                    Some(bytes)
                };
                let length = ctx.payload_frames(declared, frame_bytes, file_size, options)?;

                let (mask, plan, tag) = match layout {
                    Some(found) => (found.mask, found.plan, found.tag),
                    None if !saw_chan && builder.num_channels <= 2 => (
                        options.fallback_mask(builder.num_channels),
                        ChannelReorderPlan::identity(),
                        None,
                    ),
                    None => (
                        options.channel_mask.unwrap_or(0),
                        ChannelReorderPlan::identity(),
                        None,
                    ),
                };
                let layout_tag = tag.filter(|&tag| {
                    layouts::derived_tag(builder.num_channels, mask, &plan) != Some(tag)
                });

                let format = builder
                    .channel_mask(mask)
                    .channel_plan(plan)
                    .layout_tag(layout_tag)
                    .total_samples(length.frames)
                    .qualify(length.qualify())
                    .build()?;
                return Ok(ctx.finish(format));
            } else {
                debug!(
                    "Copying CAF chunk '{}' of {} bytes",
                    String::from_utf8_lossy(&chunk.chunk_type),
                    chunk.size
                );
                ctx.skip(chunk.size, "unknown chunk")?;
            }
        }
    }
}

/// Validate the `desc` chunk and turn it into a partial descriptor
fn interpret_desc(desc: &CafAudioFormat, options: &ParseOptions) -> Result<FormatBuilder> {
    debug!(
        "CAF desc: {} flags {:x}, {} Hz, {} bytes/packet, {} channel(s) of {} bits",
        String::from_utf8_lossy(&desc.format_id),
        desc.format_flags,
        desc.sample_rate,
        desc.bytes_per_packet,
        desc.channels_per_frame,
        desc.bits_per_channel
    );

    let is_float = desc.format_flags & FORMAT_FLAG_FLOAT != 0;
    let channels = desc.channels_per_frame;
    let bits = desc.bits_per_channel;

    if &desc.format_id != LPCM_FORMAT
        || desc.format_flags & !(FORMAT_FLAG_FLOAT | FORMAT_FLAG_LITTLE_ENDIAN) != 0
    {
        return Err(Error::unsupported(
            KIND,
            format!(
                "format '{}' with flags {:x}",
                String::from_utf8_lossy(&desc.format_id),
                desc.format_flags
            ),
        ));
    }
    if !(1.0..=MAX_SAMPLE_RATE).contains(&desc.sample_rate)
        || desc.sample_rate != desc.sample_rate.floor()
    {
        return Err(Error::unsupported(
            KIND,
            format!("sample rate {}", desc.sample_rate),
        ));
    }
    if channels == 0 || channels > 256 {
        return Err(Error::unsupported(KIND, format!("{} channels", channels)));
    }
    if !(1..=32).contains(&bits) || (is_float && bits != 32) {
        return Err(Error::unsupported(KIND, format!("{} bits per channel", bits)));
    }
    let bytes = desc.bytes_per_packet / channels;
    if desc.frames_per_packet != 1
        || desc.bytes_per_packet % channels != 0
        || bytes < (bits + 7) / 8
        || bytes > 4
    {
        return Err(Error::unsupported(
            KIND,
            format!(
                "{} bytes and {} frames per packet",
                desc.bytes_per_packet, desc.frames_per_packet
            ),
        ));
    }

    let sample_kind = if is_float {
        SampleKind::Float {
            normalization_exponent: NORMALIZED_EXPONENT,
        }
    } else {
        SampleKind::SignedInteger
    };
    let endianness = if desc.format_flags & FORMAT_FLAG_LITTLE_ENDIAN != 0 {
        Endianness::Little
    } else {
        Endianness::Big
    };

    Ok(AudioFormatDescriptor::builder()
        .sample_rate(desc.sample_rate as u32)
        .bits(bits)
        .bytes_per_sample(bytes)
        .channels(channels)
        .sample_kind(sample_kind)
        .endianness(endianness)
        .qualify(options.qualify()))
}

/// Channel arrangement declared by a `chan` chunk
struct FileLayout {
    mask: u32,
    plan: ChannelReorderPlan,
    /// Table tag, when the layout was named
    tag: Option<u32>,
}

impl FileLayout {
    fn unnamed(mask: u32, plan: ChannelReorderPlan) -> Self {
        FileLayout {
            mask,
            plan,
            tag: None,
        }
    }
}

/// Read the `chan` chunk body and resolve it to a mask and plan
///
/// Returns `None` when the layout is to be ignored.
fn read_layout(
    ctx: &mut ParseContext<'_>,
    chunk_size: u64,
    num_channels: u32,
) -> Result<Option<FileLayout>> {
    let layout: CafChannelLayout = ctx.read_record("chan chunk")?;
    let rest = chunk_size - CafChannelLayout::SIZE as u64;

    match layout.layout_tag {
        TAG_USE_DESCRIPTIONS => {
            let n = layout.num_descriptions;
            let expected = n as u64 * CafChannelDescription::SIZE as u64;
            if rest != expected || n != num_channels {
                return Err(Error::invalid(
                    KIND,
                    "channel descriptions in chan chunk are the wrong size",
                ));
            }
            if n >= 256 {
                ctx.skip(rest, "channel descriptions")?;
                ctx.warn(Warning::TooManyDescriptions { count: n });
                return Ok(None);
            }

            let mut labels = Vec::with_capacity(n as usize);
            for _ in 0..n {
                let desc: CafChannelDescription = ctx.read_record("channel description")?;
                labels.push(ChannelLabel(desc.label));
            }

            let mut warnings = Vec::new();
            let (mask, plan) = channels::resolve_with_warnings(&labels, &mut warnings)?;
            for warning in warnings {
                ctx.warn(warning);
            }
            debug!("CAF descriptions give mask 0x{:x}, plan {:?}", mask, plan);
            Ok(Some(FileLayout::unnamed(mask, plan)))
        }
        TAG_USE_BITMAP => {
            ctx.skip(rest, "chan chunk")?;
            debug!("CAF bitmap layout 0x{:x}", layout.bitmap);
            Ok(Some(FileLayout::unnamed(
                layout.bitmap,
                ChannelReorderPlan::identity(),
            )))
        }
        tag => {
            ctx.skip(rest, "chan chunk")?;
            match layouts::lookup(tag) {
                Some(entry) if entry.num_channels() == num_channels => {
                    debug!("CAF layout tag 0x{:08x} found in table", tag);
                    Ok(Some(FileLayout {
                        mask: entry.mask,
                        plan: entry.plan(),
                        tag: Some(tag),
                    }))
                }
                Some(entry) => Err(Error::invalid(
                    KIND,
                    format!(
                        "layout tag 0x{:08x} is for {} channels, file has {}",
                        tag,
                        entry.num_channels(),
                        num_channels
                    ),
                )),
                None => {
                    ctx.warn(Warning::UnknownLayoutTag { tag });
                    Ok(Some(FileLayout::unnamed(0, ChannelReorderPlan::identity())))
                }
            }
        }
    }
}
