//! The `fmt ` chunk, shared by RIFF, RF64 and Wave64

use crate::error::{Error, Result, Warning};
use crate::format::channels::default_mask;
use crate::format::codec::{Field, Record, Value};
use crate::format::descriptor::{
    AudioFormatDescriptor, Endianness, FormatBuilder, SampleKind, NORMALIZED_EXPONENT,
};
use crate::format::parser::ParseOptions;
use crate::format::registry::ContainerKind;

/// Size of the compact PCM `fmt ` body
pub const FMT_SIZE_PCM: usize = 16;

/// Size of the WAVE_FORMAT_EXTENSIBLE `fmt ` body
pub const FMT_SIZE_EXTENSIBLE: usize = 40;

/// `cbSize` of the extensible form
pub const EXTENSIBLE_CB_SIZE: u16 = 22;

/// KSDATAFORMAT sub-format GUID after its leading format code
pub const SUB_FORMAT_GUID_TAIL: [u8; 14] = [
    0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
];

/// WAV format tag identifying the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    /// PCM (uncompressed)
    Pcm,
    /// IEEE Float
    IeeeFloat,
    /// Extensible format
    Extensible,
    /// Anything else
    Unknown(u16),
}

impl From<u16> for FormatTag {
    fn from(val: u16) -> Self {
        match val {
            0x0001 => FormatTag::Pcm,
            0x0003 => FormatTag::IeeeFloat,
            0xFFFE => FormatTag::Extensible,
            other => FormatTag::Unknown(other),
        }
    }
}

impl From<FormatTag> for u16 {
    fn from(tag: FormatTag) -> Self {
        match tag {
            FormatTag::Pcm => 0x0001,
            FormatTag::IeeeFloat => 0x0003,
            FormatTag::Extensible => 0xFFFE,
            FormatTag::Unknown(val) => val,
        }
    }
}

/// WAVEFORMATEXTENSIBLE, of which the first 16 bytes are the compact form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveHeader {
    pub format_tag: u16,
    pub num_channels: u16,
    pub sample_rate: u32,
    pub bytes_per_second: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub cb_size: u16,
    pub valid_bits_per_sample: u16,
    pub channel_mask: u32,
    pub sub_format: u16,
    pub guid: [u8; 14],
}

impl Record for WaveHeader {
    const LAYOUT: &'static [Field] = &[
        Field::U16,
        Field::U16,
        Field::U32,
        Field::U32,
        Field::U16,
        Field::U16,
        Field::U16,
        Field::U16,
        Field::U32,
        Field::U16,
        Field::Tag(14),
    ];
    const ORDER: Endianness = Endianness::Little;

    fn from_values(values: &[Value]) -> Self {
        WaveHeader {
            format_tag: values[0].as_u16(),
            num_channels: values[1].as_u16(),
            sample_rate: values[2].as_u32(),
            bytes_per_second: values[3].as_u32(),
            block_align: values[4].as_u16(),
            bits_per_sample: values[5].as_u16(),
            cb_size: values[6].as_u16(),
            valid_bits_per_sample: values[7].as_u16(),
            channel_mask: values[8].as_u32(),
            sub_format: values[9].as_u16(),
            guid: values[10].as_tag(),
        }
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::U16(self.format_tag),
            Value::U16(self.num_channels),
            Value::U32(self.sample_rate),
            Value::U32(self.bytes_per_second),
            Value::U16(self.block_align),
            Value::U16(self.bits_per_sample),
            Value::U16(self.cb_size),
            Value::U16(self.valid_bits_per_sample),
            Value::U32(self.channel_mask),
            Value::U16(self.sub_format),
            Value::Tag(self.guid.to_vec()),
        ]
    }
}

impl WaveHeader {
    /// Decode a `fmt ` body of 16..=40 bytes; missing fields read as zero
    pub fn from_chunk(body: &[u8]) -> WaveHeader {
        let mut full = [0u8; FMT_SIZE_EXTENSIBLE];
        let n = body.len().min(FMT_SIZE_EXTENSIBLE);
        full[..n].copy_from_slice(&body[..n]);
        WaveHeader::from_values(&crate::format::codec::decode_values(
            &full,
            Self::LAYOUT,
            Self::ORDER,
        ))
    }

    /// Effective format code (the sub-format for the extensible form)
    pub fn format(&self, chunk_size: u32) -> FormatTag {
        if FormatTag::from(self.format_tag) == FormatTag::Extensible
            && chunk_size as usize == FMT_SIZE_EXTENSIBLE
        {
            FormatTag::from(self.sub_format)
        } else {
            FormatTag::from(self.format_tag)
        }
    }

    /// Interpret the chunk into a partial descriptor
    ///
    /// The payload length is left for the caller. Warnings go into
    /// `warnings`.
    pub fn to_builder(
        &self,
        chunk_size: u32,
        options: &ParseOptions,
        container: ContainerKind,
        warnings: &mut Vec<Warning>,
    ) -> Result<FormatBuilder> {
        let extensible = chunk_size as usize == FMT_SIZE_EXTENSIBLE;
        let format = self.format(chunk_size);
        let bits = if extensible && self.valid_bits_per_sample != 0 {
            self.valid_bits_per_sample as u32
        } else {
            self.bits_per_sample as u32
        };
        let channels = self.num_channels as u32;
        let block_align = self.block_align as u32;

        match format {
            FormatTag::Pcm => {}
            FormatTag::IeeeFloat if bits == 32 => {}
            FormatTag::IeeeFloat => {
                return Err(Error::unsupported(
                    container,
                    format!("{}-bit floating point", bits),
                ))
            }
            other => {
                return Err(Error::unsupported(
                    container,
                    format!("format code 0x{:04x}", u16::from(other)),
                ))
            }
        }

        if channels == 0 || channels > 256 {
            return Err(Error::unsupported(
                container,
                format!("{} channels", channels),
            ));
        }
        if !(1..=32).contains(&bits) {
            return Err(Error::unsupported(container, format!("{} bits per sample", bits)));
        }
        let bytes = block_align / channels;
        if block_align % channels != 0 || bytes < (bits + 7) / 8 || bytes > 4 {
            return Err(Error::unsupported(
                container,
                format!(
                    "block align {} for {} channels of {} bits",
                    block_align, channels, bits
                ),
            ));
        }

        let channel_mask = if extensible && self.channel_mask != 0 {
            if options.has_channel_order() {
                return Err(Error::ChannelOrderConflict { container });
            }
            self.channel_mask
        } else if extensible {
            options.channel_mask.unwrap_or(0)
        } else {
            options.fallback_mask(channels)
        };

        let expected_rate = self.sample_rate as u64 * block_align as u64;
        if self.bytes_per_second as u64 != expected_rate {
            warnings.push(Warning::ByteRateMismatch {
                declared: self.bytes_per_second,
                expected: expected_rate,
            });
        }

        let sample_kind = match format {
            FormatTag::IeeeFloat => SampleKind::Float {
                normalization_exponent: NORMALIZED_EXPONENT,
            },
            _ if bytes == 1 => SampleKind::UnsignedInteger,
            _ => SampleKind::SignedInteger,
        };

        Ok(AudioFormatDescriptor::builder()
            .sample_rate(self.sample_rate)
            .bits(bits)
            .bytes_per_sample(bytes)
            .channels(channels)
            .channel_mask(channel_mask)
            .sample_kind(sample_kind)
            .endianness(Endianness::Little)
            .qualify(options.qualify()))
    }

    /// Build the `fmt ` chunk for a descriptor, with its body size
    ///
    /// The compact form is used only for mono or stereo with the default
    /// speakers and no padding bits; everything else is extensible.
    pub fn for_format(format: &AudioFormatDescriptor) -> (WaveHeader, usize) {
        let code: u16 = if format.sample_kind.is_float() {
            FormatTag::IeeeFloat.into()
        } else {
            FormatTag::Pcm.into()
        };
        let block_align = format.block_align() as u16;
        let container_bits = (format.bytes_per_sample * 8) as u16;
        let mut header = WaveHeader {
            format_tag: code,
            num_channels: format.num_channels as u16,
            sample_rate: format.sample_rate,
            bytes_per_second: format.sample_rate.wrapping_mul(block_align as u32),
            block_align,
            bits_per_sample: container_bits,
            cb_size: 0,
            valid_bits_per_sample: 0,
            channel_mask: 0,
            sub_format: 0,
            guid: [0; 14],
        };

        let compact = format.num_channels <= 2
            && format.channel_mask == default_mask(format.num_channels)
            && format.bits_per_sample == container_bits as u32;
        if compact {
            return (header, FMT_SIZE_PCM);
        }

        header.format_tag = FormatTag::Extensible.into();
        header.cb_size = EXTENSIBLE_CB_SIZE;
        header.valid_bits_per_sample = format.bits_per_sample as u16;
        header.channel_mask = format.channel_mask;
        header.sub_format = code;
        header.guid = SUB_FORMAT_GUID_TAIL;
        (header, FMT_SIZE_EXTENSIBLE)
    }
}

/// Reject sample conventions a WAVE `fmt ` chunk can't express
pub fn check_conventions(format: &AudioFormatDescriptor, container: ContainerKind) -> Result<()> {
    if format.endianness != Endianness::Little {
        return Err(Error::unsupported(container, "big-endian samples"));
    }
    match format.sample_kind {
        SampleKind::UnsignedInteger if format.bytes_per_sample != 1 => Err(Error::unsupported(
            container,
            "unsigned samples wider than 8 bits",
        )),
        SampleKind::SignedInteger if format.bytes_per_sample == 1 => {
            Err(Error::unsupported(container, "signed 8-bit samples"))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::codec::ChunkCodec;

    fn stereo16() -> WaveHeader {
        WaveHeader {
            format_tag: 1,
            num_channels: 2,
            sample_rate: 44100,
            bytes_per_second: 176400,
            block_align: 4,
            bits_per_sample: 16,
            cb_size: 0,
            valid_bits_per_sample: 0,
            channel_mask: 0,
            sub_format: 0,
            guid: [0; 14],
        }
    }

    #[test]
    fn test_format_tag_conversion() {
        assert_eq!(FormatTag::from(0x0001), FormatTag::Pcm);
        assert_eq!(FormatTag::from(0xFFFE), FormatTag::Extensible);
        assert_eq!(u16::from(FormatTag::Unknown(0x55)), 0x55);
    }

    #[test]
    fn test_compact_chunk() {
        let builder = stereo16()
            .to_builder(16, &ParseOptions::default(), ContainerKind::Wav, &mut Vec::new())
            .unwrap();
        let format = builder.build().unwrap();
        assert_eq!(format.channel_mask, 0x3);
        assert_eq!(format.sample_kind, SampleKind::SignedInteger);

        let (header, size) = WaveHeader::for_format(&format);
        assert_eq!(size, FMT_SIZE_PCM);
        assert_eq!(header, stereo16());
    }

    #[test]
    fn test_extensible_chunk() {
        let mut wave = stereo16();
        wave.format_tag = 0xFFFE;
        wave.num_channels = 6;
        wave.block_align = 18;
        wave.bits_per_sample = 24;
        wave.bytes_per_second = 44100 * 18;
        wave.cb_size = 22;
        wave.valid_bits_per_sample = 20;
        wave.channel_mask = 0x3f;
        wave.sub_format = 1;
        wave.guid = SUB_FORMAT_GUID_TAIL;

        let bytes = ChunkCodec::new(ContainerKind::Wav).encode(&wave);
        assert_eq!(bytes.len(), 40);
        let decoded = WaveHeader::from_chunk(&bytes);
        let format = decoded
            .to_builder(40, &ParseOptions::default(), ContainerKind::Wav, &mut Vec::new())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(format.bits_per_sample, 20);
        assert_eq!(format.bytes_per_sample, 3);
        assert_eq!(format.channel_mask, 0x3f);

        let (header, size) = WaveHeader::for_format(&format);
        assert_eq!(size, FMT_SIZE_EXTENSIBLE);
        assert_eq!(header, wave);
    }

    #[test]
    fn test_unsigned_bytes() {
        let mut wave = stereo16();
        wave.num_channels = 1;
        wave.block_align = 1;
        wave.bits_per_sample = 8;
        wave.bytes_per_second = 44100;
        let format = wave
            .to_builder(16, &ParseOptions::default(), ContainerKind::Wav, &mut Vec::new())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(format.sample_kind, SampleKind::UnsignedInteger);
        assert_eq!(format.channel_mask, 0x4);
    }

    #[test]
    fn test_mask_conflict() {
        let mut wave = stereo16();
        wave.format_tag = 0xFFFE;
        wave.sub_format = 1;
        wave.channel_mask = 0x3;
        let options = ParseOptions::default().channel_mask(0x3);
        let err = wave
            .to_builder(40, &options, ContainerKind::Wav, &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, Error::ChannelOrderConflict { .. }));
    }

    #[test]
    fn test_rejects_unsupported() {
        let mut float64 = stereo16();
        float64.format_tag = 3;
        float64.bits_per_sample = 64;
        float64.block_align = 16;
        assert!(float64
            .to_builder(16, &ParseOptions::default(), ContainerKind::Wav, &mut Vec::new())
            .is_err());

        let mut alaw = stereo16();
        alaw.format_tag = 6;
        assert!(matches!(
            alaw.to_builder(16, &ParseOptions::default(), ContainerKind::Wav, &mut Vec::new()),
            Err(Error::Unsupported { .. })
        ));

        let mut odd = stereo16();
        odd.block_align = 5;
        assert!(odd
            .to_builder(16, &ParseOptions::default(), ContainerKind::Wav, &mut Vec::new())
            .is_err());
    }

    #[test]
    fn test_byte_rate_warning() {
        let mut wave = stereo16();
        wave.bytes_per_second = 1;
        let mut warnings = Vec::new();
        wave.to_builder(16, &ParseOptions::default(), ContainerKind::Wav, &mut warnings)
            .unwrap();
        assert_eq!(
            warnings,
            vec![Warning::ByteRateMismatch {
                declared: 1,
                expected: 176400
            }]
        );
    }

    #[test]
    fn test_check_conventions() {
        let mut format = stereo16()
            .to_builder(16, &ParseOptions::default(), ContainerKind::Wav, &mut Vec::new())
            .unwrap()
            .build()
            .unwrap();
        assert!(check_conventions(&format, ContainerKind::Wav).is_ok());
        format.endianness = Endianness::Big;
        assert!(check_conventions(&format, ContainerKind::Wav).is_err());
    }
}
