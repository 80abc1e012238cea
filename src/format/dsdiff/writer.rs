//! DSDIFF header writer

use super::{
    id_for_identity, DsdiffChunkHeader, DsdiffFormHeader, CHNL_CHUNK, CMPR_CHUNK, DSD_CHUNK,
    DSD_FORM, FORMAT_VERSION, FORM_MAGIC, FS_CHUNK, FVER_CHUNK, PROP_CHUNK, SND_PROPERTY,
    UNCOMPRESSED, UNCOMPRESSED_NAME,
};
use crate::error::{Error, Result};
use crate::format::codec::{ChunkCodec, Record};
use crate::format::descriptor::{AudioFormatDescriptor, QualifyFlags};
use crate::format::padding::padded_size;
use crate::format::registry::ContainerKind;
use crate::format::writer::{check_dsd, HeaderWriter};

const KIND: ContainerKind = ContainerKind::Dsdiff;

/// Writer for Philips DSDIFF files
///
/// Only interleaved MSB-first payloads can be stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct DsdiffWriter;

impl DsdiffWriter {
    pub fn new() -> Self {
        DsdiffWriter
    }
}

impl HeaderWriter for DsdiffWriter {
    fn kind(&self) -> ContainerKind {
        KIND
    }

    /// Layout: `FRM8` form, `FVER`, `PROP` holding `FS  `, `CHNL` and
    /// `CMPR`, then the `DSD ` chunk header. An unknown length writes zero
    /// sizes.
    fn render_header(
        &self,
        format: &AudioFormatDescriptor,
        total_samples: Option<u64>,
    ) -> Result<Vec<u8>> {
        let bit_rate = check_dsd(format, KIND)?;
        if !format.qualify.contains(QualifyFlags::DSD_MSB_FIRST) {
            return Err(Error::unsupported(KIND, "DSD that is not MSB-first"));
        }
        if format.qualify.contains(QualifyFlags::DSD_IN_BLOCKS) {
            return Err(Error::unsupported(KIND, "DSD in channel blocks"));
        }

        let codec = ChunkCodec::new(KIND);
        let header = DsdiffChunkHeader::SIZE as u64;
        let data_bytes = format.payload_bytes(total_samples.unwrap_or(0));

        let mut chnl = (format.num_channels as u16).to_be_bytes().to_vec();
        let identities = format
            .channel_plan
            .file_order_identities(format.channel_mask, format.num_channels as usize);
        for (index, &identity) in identities.iter().enumerate() {
            chnl.extend_from_slice(&id_for_identity(identity, index));
        }

        let mut cmpr = UNCOMPRESSED.to_vec();
        cmpr.push(UNCOMPRESSED_NAME.len() as u8);
        cmpr.extend_from_slice(UNCOMPRESSED_NAME);
        cmpr.resize(padded_size(cmpr.len() as u64, KIND.alignment()) as usize, 0);

        let mut prop = SND_PROPERTY.to_vec();
        prop.extend(codec.encode(&DsdiffChunkHeader::new(FS_CHUNK, 4)));
        prop.extend_from_slice(&bit_rate.to_be_bytes());
        prop.extend(codec.encode(&DsdiffChunkHeader::new(CHNL_CHUNK, chnl.len() as u64)));
        prop.extend(chnl);
        prop.extend(codec.encode(&DsdiffChunkHeader::new(CMPR_CHUNK, cmpr.len() as u64)));
        prop.extend(cmpr);

        let form_size = DSD_FORM.len() as u64
            + header
            + 4
            + header
            + prop.len() as u64
            + header
            + padded_size(data_bytes, KIND.alignment());

        let mut out = codec.encode(&DsdiffFormHeader {
            id: *FORM_MAGIC,
            size: if total_samples.is_some() { form_size } else { 0 },
            form_type: *DSD_FORM,
        });
        out.extend(codec.encode(&DsdiffChunkHeader::new(FVER_CHUNK, 4)));
        out.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
        out.extend(codec.encode(&DsdiffChunkHeader::new(PROP_CHUNK, prop.len() as u64)));
        out.extend(prop);
        out.extend(codec.encode(&DsdiffChunkHeader::new(DSD_CHUNK, data_bytes)));

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::channels::ChannelReorderPlan;
    use crate::format::dsdiff::DsdiffParser;
    use crate::format::parser::{HeaderParser, ParseOptions};
    use byteorder::{BigEndian, ByteOrder};

    fn dsd64(channels: u32, mask: u32) -> AudioFormatDescriptor {
        AudioFormatDescriptor::builder()
            .sample_rate(352_800)
            .bits(8)
            .channels(channels)
            .channel_mask(mask)
            .total_samples(Some(100))
            .qualify(QualifyFlags::DSD_AUDIO | QualifyFlags::DSD_MSB_FIRST)
            .build()
            .unwrap()
    }

    #[test]
    fn test_layout() {
        let header = DsdiffWriter.render_header(&dsd64(2, 0x3), Some(100)).unwrap();
        // form + FVER + PROP (66 + 4n) + DSD header
        assert_eq!(header.len(), 16 + 16 + 12 + 74 + 12);
        assert_eq!(&header[0..4], b"FRM8");
        assert_eq!(BigEndian::read_u64(&header[4..12]), header.len() as u64 - 12 + 200);
        assert_eq!(BigEndian::read_u32(&header[28..32]), 0x0105_0000);
        assert_eq!(BigEndian::read_u64(&header[36..44]), 74);
        assert_eq!(BigEndian::read_u32(&header[60..64]), 2_822_400);
        assert_eq!(&header[78..86], b"SLFTSRGT");
        assert_eq!(&header[98..102], b"DSD ");
        assert_eq!(header[102], 14);
        assert_eq!(BigEndian::read_u64(&header[122..130]), 200);
    }

    #[test]
    fn test_round_trip() {
        let format = dsd64(2, 0x3);
        let header = DsdiffWriter.render_header(&format, Some(100)).unwrap();
        let mut input: &[u8] = &header;
        let parsed = DsdiffParser
            .parse(&mut input, 0, &ParseOptions::default())
            .unwrap();
        assert_eq!(parsed.format, format);
        assert_eq!(parsed.header_len, header.len() as u64);
    }

    #[test]
    fn test_surround_ids() {
        let format = AudioFormatDescriptor::builder()
            .sample_rate(352_800)
            .bits(8)
            .channels(7)
            .channel_mask(0x3f)
            .channel_plan(ChannelReorderPlan::from_order(&[3, 1, 2, 4, 5, 6, 7], &[]))
            .total_samples(Some(1))
            .qualify(QualifyFlags::DSD_AUDIO | QualifyFlags::DSD_MSB_FIRST)
            .build()
            .unwrap();
        let header = DsdiffWriter.render_header(&format, Some(1)).unwrap();
        let ids = &header[78..78 + 28];
        assert_eq!(ids, b"C   SLFTSRGTLFE LS  RS  C006");
    }

    #[test]
    fn test_unknown_length_is_same_size() {
        let format = dsd64(1, 0x4);
        let unknown = DsdiffWriter.render_header(&format, None).unwrap();
        let known = DsdiffWriter.render_header(&format, Some(5)).unwrap();
        assert_eq!(unknown.len(), known.len());
        assert_eq!(BigEndian::read_u64(&unknown[4..12]), 0);
    }

    #[test]
    fn test_rejects_foreign_bit_layout() {
        for flags in [
            QualifyFlags::DSD_LSB_FIRST,
            QualifyFlags::DSD_IN_BLOCKS,
            QualifyFlags::DSD_IN_BLOCKS | QualifyFlags::DSD_MSB_FIRST,
        ] {
            let mut format = dsd64(2, 0x3);
            format.qualify.remove(QualifyFlags::DSD_MSB_FIRST);
            format.qualify.insert(flags);
            assert!(matches!(
                DsdiffWriter.render_header(&format, Some(1)),
                Err(Error::Unsupported { .. })
            ));

            let conformed = format.conformed_to(KIND);
            let header = DsdiffWriter.render_header(&conformed, Some(100)).unwrap();
            let mut input: &[u8] = &header;
            let parsed = DsdiffParser
                .parse(&mut input, 0, &ParseOptions::default())
                .unwrap();
            assert_eq!(parsed.format, conformed);
        }
    }

    #[test]
    fn test_rate_overflow_is_refused() {
        let mut format = dsd64(2, 0x3);
        format.sample_rate = 600_000_000;
        assert!(DsdiffWriter.render_header(&format, Some(1)).is_err());
        assert!(AudioFormatDescriptor::builder()
            .sample_rate(600_000_000)
            .bits(8)
            .channels(2)
            .qualify(QualifyFlags::DSD_AUDIO)
            .build()
            .is_err());
    }

    #[test]
    fn test_rejects_pcm() {
        let pcm = AudioFormatDescriptor::builder()
            .sample_rate(44100)
            .bits(16)
            .channels(2)
            .build()
            .unwrap();
        assert!(matches!(
            DsdiffWriter.render_header(&pcm, None),
            Err(Error::Unsupported { .. })
        ));
    }
}
