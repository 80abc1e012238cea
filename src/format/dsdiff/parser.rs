//! DSDIFF header parser

use super::{
    is_numbered_id, speaker_for_id, DsdiffChunkHeader, DsdiffFormHeader, CHNL_CHUNK, CMPR_CHUNK,
    DSD_CHUNK, DSD_FORM, FORM_MAGIC, FS_CHUNK, FVER_CHUNK, PROP_CHUNK, SND_PROPERTY,
    UNCOMPRESSED,
};
use crate::error::{Error, Result, Warning};
use crate::format::channels::{self, ChannelLabel, ChannelReorderPlan};
use crate::format::descriptor::{AudioFormatDescriptor, QualifyFlags};
use crate::format::padding::padded_size;
use crate::format::parser::{HeaderParser, ParseContext, ParseOptions, ParsedHeader};
use crate::format::registry::ContainerKind;
use byteorder::{BigEndian, ByteOrder};
use std::io::Read;
use tracing::debug;

const KIND: ContainerKind = ContainerKind::Dsdiff;

/// Parser for Philips DSDIFF files
#[derive(Debug, Clone, Copy, Default)]
pub struct DsdiffParser;

impl DsdiffParser {
    pub fn new() -> Self {
        DsdiffParser
    }
}

/// What the `PROP` chunk told us
#[derive(Debug, Default)]
struct SoundProperties {
    sample_rate: Option<u32>,
    channel_ids: Option<Vec<[u8; 4]>>,
}

impl HeaderParser for DsdiffParser {
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

        let form: DsdiffFormHeader = ctx.read_record("FRM8 header")?;
        if &form.id != FORM_MAGIC || &form.form_type != DSD_FORM {
            return Err(Error::invalid(KIND, "missing FRM8/DSD form header"));
        }

        let mut props: Option<SoundProperties> = None;

        loop {
            let chunk: DsdiffChunkHeader = ctx.read_record("chunk header")?;
            let padded = padded_size(chunk.size, KIND.alignment());

            if &chunk.id == FVER_CHUNK {
                if chunk.size != 4 {
                    return Err(Error::chunk_size(KIND, &chunk.id, chunk.size));
                }
                let version = ctx.read_bytes(4, "FVER chunk")?;
                debug!("DSDIFF version 0x{:08x}", BigEndian::read_u32(&version));
            } else if &chunk.id == PROP_CHUNK {
                props = Some(read_properties(&mut ctx, chunk.size)?);
                ctx.skip(padded - chunk.size, "PROP chunk padding")?;
            } else if &chunk.id == DSD_CHUNK {
                let props = props
                    .take()
                    .ok_or_else(|| Error::invalid(KIND, "DSD chunk before PROP chunk"))?;
                let sample_rate = props
                    .sample_rate
                    .ok_or_else(|| Error::invalid(KIND, "PROP chunk has no FS chunk"))?;
                let ids = props
                    .channel_ids
                    .ok_or_else(|| Error::invalid(KIND, "PROP chunk has no CHNL chunk"))?;

                let num_channels = ids.len() as u64;
                if !options.ignore_length && chunk.size % num_channels != 0 {
                    return Err(Error::chunk_size(KIND, &chunk.id, chunk.size));
                }
                let length = ctx.payload_frames(Some(chunk.size), num_channels, file_size, options)?;

                let (mask, plan) = channel_layout(&mut ctx, &ids, options)?;
                let format = AudioFormatDescriptor::builder()
                    .sample_rate(sample_rate / 8)
                    .bits(8)
                    .channels(ids.len() as u32)
                    .channel_mask(mask)
                    .channel_plan(plan)
                    .total_samples(length.frames)
                    .qualify(options.qualify())
                    .qualify(length.qualify())
                    .qualify(QualifyFlags::DSD_AUDIO | QualifyFlags::DSD_MSB_FIRST)
                    .build()?;
                return Ok(ctx.finish(format));
            } else {
                debug!(
                    "Copying DSDIFF chunk '{}' of {} bytes",
                    String::from_utf8_lossy(&chunk.id),
                    chunk.size
                );
                ctx.skip(padded, "unknown chunk")?;
            }
        }
    }
}

/// Walk the sub-chunks of a `PROP` chunk of `size` bytes
fn read_properties(ctx: &mut ParseContext<'_>, size: u64) -> Result<SoundProperties> {
    if size < 4 {
        return Err(Error::chunk_size(KIND, PROP_CHUNK, size));
    }
    let property = ctx.read_bytes(4, "PROP type")?;
    if property != SND_PROPERTY {
        return Err(Error::invalid(KIND, "PROP chunk is not of type SND"));
    }

    let end = ctx.position().saturating_add(size - 4);
    let mut props = SoundProperties::default();

    while ctx.position() < end {
        let chunk: DsdiffChunkHeader = ctx.read_record("property chunk header")?;
        let padded = padded_size(chunk.size, KIND.alignment());
        if ctx.position().saturating_add(padded) > end {
            return Err(Error::chunk_size(KIND, &chunk.id, chunk.size));
        }

        if &chunk.id == FS_CHUNK {
            if chunk.size != 4 {
                return Err(Error::chunk_size(KIND, &chunk.id, chunk.size));
            }
            let rate = BigEndian::read_u32(&ctx.read_bytes(4, "FS chunk")?);
            if rate < 8 {
                return Err(Error::unsupported(KIND, format!("sample rate {}", rate)));
            }
            debug!("DSDIFF sample rate {}", rate);
            props.sample_rate = Some(rate);
        } else if &chunk.id == CHNL_CHUNK {
            if chunk.size < 2 {
                return Err(Error::chunk_size(KIND, &chunk.id, chunk.size));
            }
            let count = BigEndian::read_u16(&ctx.read_bytes(2, "CHNL chunk")?) as u64;
            if count == 0 || count > 256 {
                return Err(Error::unsupported(KIND, format!("{} channels", count)));
            }
            if chunk.size < 2 + 4 * count {
                return Err(Error::chunk_size(KIND, &chunk.id, chunk.size));
            }
            let raw = ctx.read_bytes(4 * count as usize, "channel ids")?;
            let ids = raw
                .chunks_exact(4)
                .map(|id| [id[0], id[1], id[2], id[3]])
                .collect::<Vec<_>>();
            ctx.skip(padded - 2 - 4 * count, "CHNL chunk")?;
            props.channel_ids = Some(ids);
        } else if &chunk.id == CMPR_CHUNK {
            if chunk.size < 4 {
                return Err(Error::chunk_size(KIND, &chunk.id, chunk.size));
            }
            let compression = ctx.read_bytes(4, "CMPR chunk")?;
            if compression != UNCOMPRESSED {
                return Err(Error::unsupported(
                    KIND,
                    format!(
                        "compression type '{}'",
                        String::from_utf8_lossy(&compression)
                    ),
                ));
            }
            ctx.skip(padded - 4, "CMPR chunk")?;
        } else {
            debug!(
                "Copying DSDIFF property '{}' of {} bytes",
                String::from_utf8_lossy(&chunk.id),
                chunk.size
            );
            ctx.skip(padded, "property chunk")?;
        }
    }

    Ok(props)
}

/// Turn channel ids into a mask and plan, unless the caller chose one
fn channel_layout(
    ctx: &mut ParseContext<'_>,
    ids: &[[u8; 4]],
    options: &ParseOptions,
) -> Result<(u32, ChannelReorderPlan)> {
    let labels = ids
        .iter()
        .map(|id| match speaker_for_id(id) {
            Some(speaker) => ChannelLabel(speaker),
            None => {
                if !is_numbered_id(id) {
                    ctx.warn(Warning::UnknownChannelId {
                        id: String::from_utf8_lossy(id).into_owned(),
                    });
                }
                ChannelLabel::UNUSED
            }
        })
        .collect::<Vec<_>>();

    let resolved = channels::resolve(&labels)?;
    debug!("DSDIFF channel ids give mask 0x{:x}", resolved.0);

    if options.has_channel_order() {
        return Ok((options.channel_mask.unwrap_or(0), ChannelReorderPlan::identity()));
    }
    Ok(resolved)
}
