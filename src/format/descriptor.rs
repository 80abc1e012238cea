//! Canonical audio format description shared by every container

use super::channels::ChannelReorderPlan;
use super::registry::ContainerKind;
use crate::error::{Error, Result};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Largest sample count any container may declare
pub const MAX_SAMPLES: u64 = (1 << 40) - 257;

/// Largest DSD byte rate whose bit rate still fits a `u32`
pub const MAX_DSD_BYTE_RATE: u32 = u32::MAX / 8;

/// Exponent of normalized (+/-1.0) floating point samples
pub const NORMALIZED_EXPONENT: u8 = 127;

/// Byte order of multi-byte samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endianness {
    Little,
    Big,
}

/// Numeric interpretation of samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleKind {
    SignedInteger,
    UnsignedInteger,
    /// IEEE float; 127 means full scale is +/-1.0
    Float { normalization_exponent: u8 },
}

impl SampleKind {
    pub fn is_float(&self) -> bool {
        matches!(self, SampleKind::Float { .. })
    }
}

bitflags! {
    /// Qualifiers on how the payload is to be read
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct QualifyFlags: u32 {
        /// Payload length was not trusted; it runs to end of file
        const IGNORE_LENGTH = 1 << 0;
        /// File channel order differs from canonical order
        const REORDERED_CHANNELS = 1 << 1;
        /// Payload is 1-bit DSD packed into bytes
        const DSD_AUDIO = 1 << 2;
        const DSD_LSB_FIRST = 1 << 3;
        const DSD_MSB_FIRST = 1 << 4;
        /// Channels are stored in per-channel blocks, not interleaved
        const DSD_IN_BLOCKS = 1 << 5;
        /// Caller asked that channels not be given speaker positions
        const CHANNELS_UNASSIGNED = 1 << 6;
    }
}

/// Everything needed to interpret or re-emit a payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFormatDescriptor {
    pub sample_rate: u32,
    /// Valid bits per sample (1..=32)
    pub bits_per_sample: u32,
    /// Container bytes per sample (1..=4)
    pub bytes_per_sample: u32,
    pub num_channels: u32,
    /// Speaker mask in Microsoft order; zero means unassigned
    pub channel_mask: u32,
    pub sample_kind: SampleKind,
    pub endianness: Endianness,
    /// Samples per channel; `None` when unknown
    pub total_samples: Option<u64>,
    pub qualify: QualifyFlags,
    pub channel_plan: ChannelReorderPlan,
    /// CAF layout tag to write back instead of the derived one
    ///
    /// Set only when a file named a layout that the derived choice would not
    /// reproduce. Ignored unless the tag still describes the mask and plan.
    #[serde(default)]
    pub layout_tag: Option<u32>,
}

impl AudioFormatDescriptor {
    /// Start building a descriptor
    pub fn builder() -> FormatBuilder {
        FormatBuilder::default()
    }

    /// Bytes in one multichannel frame
    pub fn block_align(&self) -> u64 {
        self.bytes_per_sample as u64 * self.num_channels as u64
    }

    /// Payload bytes for `samples` frames
    pub fn payload_bytes(&self, samples: u64) -> u64 {
        samples * self.block_align()
    }

    pub fn is_dsd(&self) -> bool {
        self.qualify.contains(QualifyFlags::DSD_AUDIO)
    }

    /// Number of channels that have a speaker or identity
    pub fn identified_channels(&self) -> usize {
        self.channel_plan
            .channel_identities(self.channel_mask, self.num_channels as usize)
            .iter()
            .filter(|&&id| id != super::channels::NO_IDENTITY)
            .count()
    }

    /// Check field ranges and cross-field rules
    pub fn validate(&self) -> Result<()> {
        if self.num_channels == 0 || self.num_channels > 256 {
            return Err(Error::invalid_input(format!(
                "invalid channel count {}",
                self.num_channels
            )));
        }
        if !(1..=32).contains(&self.bits_per_sample) {
            return Err(Error::invalid_input(format!(
                "invalid bits per sample {}",
                self.bits_per_sample
            )));
        }
        if !(1..=4).contains(&self.bytes_per_sample)
            || self.bytes_per_sample < (self.bits_per_sample + 7) / 8
        {
            return Err(Error::invalid_input(format!(
                "{} bytes can't hold {}-bit samples",
                self.bytes_per_sample, self.bits_per_sample
            )));
        }
        if self.sample_kind.is_float() && self.bytes_per_sample != 4 {
            return Err(Error::invalid_input("float samples must be 4 bytes"));
        }
        if self.sample_rate == 0 {
            return Err(Error::invalid_input("sample rate is zero"));
        }
        if self.is_dsd() && self.sample_rate > MAX_DSD_BYTE_RATE {
            return Err(Error::invalid_input(format!(
                "DSD byte rate {} is too high",
                self.sample_rate
            )));
        }
        if self
            .qualify
            .contains(QualifyFlags::DSD_LSB_FIRST | QualifyFlags::DSD_MSB_FIRST)
        {
            return Err(Error::invalid_input("DSD bit order is both LSB and MSB first"));
        }
        if self.channel_mask.count_ones() > self.num_channels {
            return Err(Error::invalid_input(format!(
                "channel mask 0x{:x} names more than {} channel(s)",
                self.channel_mask, self.num_channels
            )));
        }
        if let Some(total) = self.total_samples {
            if total > MAX_SAMPLES {
                return Err(Error::invalid_input(format!("{} samples is too many", total)));
            }
        }
        if !self
            .channel_plan
            .is_bijection(self.num_channels as usize)
        {
            return Err(Error::invalid_input(
                "channel reorder is not a permutation of the channels",
            ));
        }
        Ok(())
    }

    /// Rewrite sample conventions to what `kind` can store
    ///
    /// WAV and Wave64 hold little-endian samples with unsigned 8-bit PCM;
    /// CAF holds signed integers of either byte order. DSDIFF holds
    /// interleaved MSB-first DSD and DSF holds DSD in per-channel blocks.
    /// The payload must be converted to match. PCM into a DSD container, or
    /// DSD into a PCM one, is returned unchanged.
    pub fn conformed_to(&self, kind: ContainerKind) -> AudioFormatDescriptor {
        let mut out = self.clone();
        if kind != ContainerKind::Caf {
            out.layout_tag = None;
        }
        if self.is_dsd() != kind.is_dsd() {
            return out;
        }

        match kind {
            ContainerKind::Wav | ContainerKind::Rf64 | ContainerKind::Wave64 => {
                out.endianness = Endianness::Little;
                if !out.sample_kind.is_float() {
                    out.sample_kind = if out.bytes_per_sample == 1 {
                        SampleKind::UnsignedInteger
                    } else {
                        SampleKind::SignedInteger
                    };
                }
            }
            ContainerKind::Caf => {
                if out.sample_kind == SampleKind::UnsignedInteger {
                    out.sample_kind = SampleKind::SignedInteger;
                }
            }
            ContainerKind::Dsdiff => {
                out.qualify
                    .remove(QualifyFlags::DSD_LSB_FIRST | QualifyFlags::DSD_IN_BLOCKS);
                out.qualify.insert(QualifyFlags::DSD_MSB_FIRST);
            }
            ContainerKind::Dsf => {
                out.qualify.insert(QualifyFlags::DSD_IN_BLOCKS);
                if !out.qualify.contains(QualifyFlags::DSD_MSB_FIRST) {
                    out.qualify.insert(QualifyFlags::DSD_LSB_FIRST);
                }
            }
        }

        out
    }
}

/// Mutable staging area for a descriptor while a parser works through chunks
#[derive(Debug, Clone)]
pub struct FormatBuilder {
    pub sample_rate: u32,
    pub bits_per_sample: u32,
    pub bytes_per_sample: u32,
    pub num_channels: u32,
    pub channel_mask: u32,
    pub sample_kind: SampleKind,
    pub endianness: Endianness,
    pub total_samples: Option<u64>,
    pub qualify: QualifyFlags,
    pub channel_plan: ChannelReorderPlan,
    pub layout_tag: Option<u32>,
}

impl Default for FormatBuilder {
    fn default() -> Self {
        FormatBuilder {
            sample_rate: 0,
            bits_per_sample: 0,
            bytes_per_sample: 0,
            num_channels: 0,
            channel_mask: 0,
            sample_kind: SampleKind::SignedInteger,
            endianness: Endianness::Little,
            total_samples: None,
            qualify: QualifyFlags::empty(),
            channel_plan: ChannelReorderPlan::identity(),
            layout_tag: None,
        }
    }
}

impl FormatBuilder {
    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Set bits per sample, with the byte width they need
    pub fn bits(mut self, bits: u32) -> Self {
        self.bits_per_sample = bits;
        self.bytes_per_sample = (bits + 7) / 8;
        self
    }

    pub fn bytes_per_sample(mut self, bytes: u32) -> Self {
        self.bytes_per_sample = bytes;
        self
    }

    pub fn channels(mut self, channels: u32) -> Self {
        self.num_channels = channels;
        self
    }

    pub fn channel_mask(mut self, mask: u32) -> Self {
        self.channel_mask = mask;
        self
    }

    pub fn sample_kind(mut self, kind: SampleKind) -> Self {
        self.sample_kind = kind;
        self
    }

    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub fn total_samples(mut self, total: Option<u64>) -> Self {
        self.total_samples = total;
        self
    }

    pub fn qualify(mut self, flags: QualifyFlags) -> Self {
        self.qualify |= flags;
        self
    }

    pub fn channel_plan(mut self, plan: ChannelReorderPlan) -> Self {
        self.channel_plan = plan;
        self
    }

    pub fn layout_tag(mut self, tag: Option<u32>) -> Self {
        self.layout_tag = tag;
        self
    }

    /// Freeze into a validated descriptor
    ///
    /// `REORDERED_CHANNELS` is derived from the plan. A mask naming more
    /// speakers than there are channels keeps its lowest ones.
    pub fn build(self) -> Result<AudioFormatDescriptor> {
        let mut channel_mask = self.channel_mask;
        while channel_mask.count_ones() > self.num_channels {
            channel_mask &= !(1 << (31 - channel_mask.leading_zeros()));
        }

        let mut qualify = self.qualify;
        qualify.set(
            QualifyFlags::REORDERED_CHANNELS,
            self.channel_plan.is_reordered(),
        );

        let descriptor = AudioFormatDescriptor {
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            bytes_per_sample: self.bytes_per_sample,
            num_channels: self.num_channels,
            channel_mask,
            sample_kind: self.sample_kind,
            endianness: self.endianness,
            total_samples: self.total_samples,
            qualify,
            channel_plan: self.channel_plan,
            layout_tag: self.layout_tag,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

/// Container bytes kept verbatim around the payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperBytes {
    /// Everything from the start of the file through the payload chunk header
    pub header: Vec<u8>,
    /// Everything after the payload and its padding
    pub trailer: Vec<u8>,
}

impl WrapperBytes {
    pub fn new(header: Vec<u8>) -> Self {
        WrapperBytes {
            header,
            trailer: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.header.len() + self.trailer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.trailer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cd_audio() -> FormatBuilder {
        AudioFormatDescriptor::builder()
            .sample_rate(44100)
            .bits(16)
            .channels(2)
            .channel_mask(0x3)
            .total_samples(Some(44100))
    }

    #[test]
    fn test_builder_defaults() {
        let format = cd_audio().build().unwrap();
        assert_eq!(format.bytes_per_sample, 2);
        assert_eq!(format.block_align(), 4);
        assert_eq!(format.payload_bytes(10), 40);
        assert_eq!(format.endianness, Endianness::Little);
        assert!(format.qualify.is_empty());
    }

    #[test]
    fn test_builder_derives_reorder_flag() {
        let format = cd_audio()
            .channel_plan(ChannelReorderPlan::new(Some(vec![1, 0]), vec![]))
            .build()
            .unwrap();
        assert!(format.qualify.contains(QualifyFlags::REORDERED_CHANNELS));
    }

    #[test]
    fn test_validate_rejects() {
        assert!(cd_audio().channels(0).build().is_err());
        assert!(cd_audio().channels(257).build().is_err());
        assert!(cd_audio().bits(33).build().is_err());
        assert!(cd_audio().bits(24).bytes_per_sample(2).build().is_err());
        assert!(cd_audio().sample_rate(0).build().is_err());
        assert!(cd_audio().total_samples(Some(MAX_SAMPLES + 1)).build().is_err());
        assert!(cd_audio()
            .sample_kind(SampleKind::Float {
                normalization_exponent: 127
            })
            .build()
            .is_err());
        assert!(cd_audio()
            .channel_plan(ChannelReorderPlan::new(Some(vec![0, 2]), vec![]))
            .build()
            .is_err());
    }

    #[test]
    fn test_dsd_limits() {
        let dsd = || {
            AudioFormatDescriptor::builder()
                .bits(8)
                .channels(2)
                .qualify(QualifyFlags::DSD_AUDIO)
        };
        assert!(dsd().sample_rate(MAX_DSD_BYTE_RATE).build().is_ok());
        assert!(dsd().sample_rate(MAX_DSD_BYTE_RATE + 1).build().is_err());
        assert!(dsd()
            .sample_rate(352_800)
            .qualify(QualifyFlags::DSD_LSB_FIRST | QualifyFlags::DSD_MSB_FIRST)
            .build()
            .is_err());

        // only DSD rates are scaled by eight
        assert!(cd_audio().sample_rate(600_000_000).build().is_ok());
    }

    #[test]
    fn test_wide_mask_is_trimmed() {
        let mono = cd_audio().channels(1).channel_mask(0x3).build().unwrap();
        assert_eq!(mono.channel_mask, 0x1);

        let quad = cd_audio().channels(4).channel_mask(0x73f).build().unwrap();
        assert_eq!(quad.channel_mask, 0xf);

        let mut format = cd_audio().build().unwrap();
        format.channel_mask = 0x7;
        assert!(format.validate().is_err());
    }

    #[test]
    fn test_conformed_to_wav() {
        let caf_bytes = AudioFormatDescriptor::builder()
            .sample_rate(48000)
            .bits(8)
            .channels(1)
            .endianness(Endianness::Big)
            .build()
            .unwrap();
        let wav = caf_bytes.conformed_to(ContainerKind::Wav);
        assert_eq!(wav.sample_kind, SampleKind::UnsignedInteger);
        assert_eq!(wav.endianness, Endianness::Little);

        let back = wav.conformed_to(ContainerKind::Caf);
        assert_eq!(back.sample_kind, SampleKind::SignedInteger);
    }

    #[test]
    fn test_conformed_to_dsd() {
        let dsf = AudioFormatDescriptor::builder()
            .sample_rate(352_800)
            .bits(8)
            .channels(2)
            .qualify(
                QualifyFlags::DSD_AUDIO | QualifyFlags::DSD_IN_BLOCKS | QualifyFlags::DSD_LSB_FIRST,
            )
            .build()
            .unwrap();

        let dff = dsf.conformed_to(ContainerKind::Dsdiff);
        assert_eq!(dff.qualify, QualifyFlags::DSD_AUDIO | QualifyFlags::DSD_MSB_FIRST);

        let back = dff.conformed_to(ContainerKind::Dsf);
        assert_eq!(
            back.qualify,
            QualifyFlags::DSD_AUDIO | QualifyFlags::DSD_IN_BLOCKS | QualifyFlags::DSD_MSB_FIRST
        );

        let unordered = AudioFormatDescriptor {
            qualify: QualifyFlags::DSD_AUDIO,
            ..dsf.clone()
        };
        assert!(unordered
            .conformed_to(ContainerKind::Dsf)
            .qualify
            .contains(QualifyFlags::DSD_LSB_FIRST | QualifyFlags::DSD_IN_BLOCKS));

        // no DSD flags land on PCM containers
        assert_eq!(dsf.conformed_to(ContainerKind::Wav), dsf);
    }

    #[test]
    fn test_layout_tag_kept_for_caf_only() {
        let format = cd_audio().layout_tag(Some((102 << 16) | 2)).build().unwrap();
        assert_eq!(format.conformed_to(ContainerKind::Caf).layout_tag, format.layout_tag);
        assert_eq!(format.conformed_to(ContainerKind::Wave64).layout_tag, None);
    }

    #[test]
    fn test_identified_channels() {
        let format = cd_audio()
            .channels(4)
            .channel_plan(ChannelReorderPlan::new(None, vec![38]))
            .build()
            .unwrap();
        assert_eq!(format.identified_channels(), 3);
    }

    #[test]
    fn test_serde_round_trip() {
        let format = cd_audio().qualify(QualifyFlags::IGNORE_LENGTH).build().unwrap();
        let json = serde_json::to_string(&format).unwrap();
        let back: AudioFormatDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, format);
    }
}
