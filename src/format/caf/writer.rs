//! CAF header writer

use super::layouts;
use super::{
    CafAudioFormat, CafChannelDescription, CafChannelLayout, CafChunkHeader, CafFileHeader,
    CAFF_MAGIC, CAF_VERSION, CHAN_CHUNK, DATA_CHUNK, DESC_CHUNK, EDIT_COUNT_SIZE,
    FORMAT_FLAG_FLOAT, FORMAT_FLAG_LITTLE_ENDIAN, LPCM_FORMAT, TAG_USE_BITMAP,
    TAG_USE_DESCRIPTIONS, UNKNOWN_DATA_SIZE,
};
use crate::error::{Error, Result};
use crate::format::channels::ChannelLabel;
use crate::format::codec::{ChunkCodec, Record};
use crate::format::descriptor::{AudioFormatDescriptor, Endianness, SampleKind};
use crate::format::registry::ContainerKind;
use crate::format::writer::{check_pcm, HeaderWriter};
use tracing::debug;

const KIND: ContainerKind = ContainerKind::Caf;

/// Writer for Apple Core Audio files
#[derive(Debug, Clone, Copy, Default)]
pub struct CafWriter;

impl CafWriter {
    pub fn new() -> Self {
        CafWriter
    }
}

impl HeaderWriter for CafWriter {
    fn kind(&self) -> ContainerKind {
        KIND
    }

    fn render_header(
        &self,
        format: &AudioFormatDescriptor,
        total_samples: Option<u64>,
    ) -> Result<Vec<u8>> {
        check_pcm(format, KIND)?;
        if format.sample_kind == SampleKind::UnsignedInteger {
            return Err(Error::unsupported(KIND, "unsigned integer samples"));
        }

        let mut flags = 0;
        if format.sample_kind.is_float() {
            flags |= FORMAT_FLAG_FLOAT;
        }
        if format.endianness == Endianness::Little {
            flags |= FORMAT_FLAG_LITTLE_ENDIAN;
        }

        let codec = ChunkCodec::new(KIND);
        let mut out = codec.encode(&CafFileHeader {
            file_type: *CAFF_MAGIC,
            version: CAF_VERSION,
            flags: 0,
        });

        out.extend(codec.encode(&CafChunkHeader {
            chunk_type: *DESC_CHUNK,
            size: CafAudioFormat::SIZE as u64,
        }));
        out.extend(codec.encode(&CafAudioFormat {
            sample_rate: format.sample_rate as f64,
            format_id: *LPCM_FORMAT,
            format_flags: flags,
            bytes_per_packet: format.block_align() as u32,
            frames_per_packet: 1,
            channels_per_frame: format.num_channels,
            bits_per_channel: format.bits_per_sample,
        }));

        let n = format.num_channels;
        let preserved = format
            .layout_tag
            .and_then(layouts::lookup)
            .filter(|entry| entry.describes(n, format.channel_mask, &format.channel_plan));
        if preserved.is_some() || layouts::needs_chan(n, format.channel_mask, &format.channel_plan)
        {
            write_layout(&codec, format, preserved, &mut out);
        }

        let data_size = match total_samples {
            Some(total) => format.payload_bytes(total) + EDIT_COUNT_SIZE,
            None => UNKNOWN_DATA_SIZE,
        };
        out.extend(codec.encode(&CafChunkHeader {
            chunk_type: *DATA_CHUNK,
            size: data_size,
        }));
        out.extend_from_slice(&[0u8; EDIT_COUNT_SIZE as usize]);

        Ok(out)
    }
}

fn write_layout(
    codec: &ChunkCodec,
    format: &AudioFormatDescriptor,
    preserved: Option<&layouts::LayoutEntry>,
    out: &mut Vec<u8>,
) {
    let n = format.num_channels;
    let mask = format.channel_mask;
    let plan = &format.channel_plan;

    let named = preserved.or_else(|| layouts::find(n, mask, plan));
    let (layout, descriptions) = if let Some(entry) = named {
        debug!("CAF layout tag 0x{:08x}", entry.tag);
        (
            CafChannelLayout {
                layout_tag: entry.tag,
                bitmap: 0,
                num_descriptions: 0,
            },
            Vec::new(),
        )
    } else if mask.count_ones() == n && !plan.is_reordered() {
        (
            CafChannelLayout {
                layout_tag: TAG_USE_BITMAP,
                bitmap: mask,
                num_descriptions: 0,
            },
            Vec::new(),
        )
    } else {
        let labels = plan
            .file_order_identities(mask, n as usize)
            .into_iter()
            .map(|identity| CafChannelDescription {
                label: ChannelLabel::from_identity(identity).0,
                ..Default::default()
            })
            .collect::<Vec<_>>();
        (
            CafChannelLayout {
                layout_tag: TAG_USE_DESCRIPTIONS,
                bitmap: 0,
                num_descriptions: labels.len() as u32,
            },
            labels,
        )
    };

    let size = CafChannelLayout::SIZE + descriptions.len() * CafChannelDescription::SIZE;
    out.extend(codec.encode(&CafChunkHeader {
        chunk_type: *CHAN_CHUNK,
        size: size as u64,
    }));
    out.extend(codec.encode(&layout));
    for description in &descriptions {
        out.extend(codec.encode(description));
    }
}
