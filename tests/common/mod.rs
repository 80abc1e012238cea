//! Common test utilities for audiowrap integration tests
//!
//! This module provides helpers for building format descriptors for each
//! container and for assembling complete files (header, payload, padding,
//! trailer) in memory.

#![allow(dead_code)]

use audiowrap::format::padding::pad_after_payload;
use audiowrap::format::{
    writer_for, AudioFormatDescriptor, ChannelReorderPlan, ContainerKind, Endianness,
    QualifyFlags, SampleKind,
};

// ============================================================================
// Descriptor Generation
// ============================================================================

/// 16-bit stereo at 44.1 kHz
pub fn cd_stereo(total: u64) -> AudioFormatDescriptor {
    AudioFormatDescriptor::builder()
        .sample_rate(44100)
        .bits(16)
        .channels(2)
        .channel_mask(0x3)
        .total_samples(Some(total))
        .build()
        .expect("valid stereo descriptor")
}

/// 24-bit 5.1 at 48 kHz in Microsoft order
pub fn surround_51(total: u64) -> AudioFormatDescriptor {
    AudioFormatDescriptor::builder()
        .sample_rate(48000)
        .bits(24)
        .channels(6)
        .channel_mask(0x3f)
        .total_samples(Some(total))
        .build()
        .expect("valid 5.1 descriptor")
}

/// 32-bit float mono at 96 kHz
pub fn float_mono(total: u64) -> AudioFormatDescriptor {
    AudioFormatDescriptor::builder()
        .sample_rate(96000)
        .bits(32)
        .channels(1)
        .channel_mask(0x4)
        .sample_kind(SampleKind::Float {
            normalization_exponent: 127,
        })
        .total_samples(Some(total))
        .build()
        .expect("valid float descriptor")
}

/// Big-endian 5.1 with center first (C L R Ls Rs LFE)
pub fn caf_surround(total: u64) -> AudioFormatDescriptor {
    AudioFormatDescriptor::builder()
        .sample_rate(48000)
        .bits(24)
        .channels(6)
        .channel_mask(0x3f)
        .endianness(Endianness::Big)
        .channel_plan(ChannelReorderPlan::from_order(&[3, 1, 2, 5, 6, 4], &[]))
        .total_samples(Some(total))
        .build()
        .expect("valid CAF descriptor")
}

/// DSD64 stereo in byte frames
pub fn dsd_stereo(total: u64, flags: QualifyFlags) -> AudioFormatDescriptor {
    AudioFormatDescriptor::builder()
        .sample_rate(352_800)
        .bits(8)
        .channels(2)
        .channel_mask(0x3)
        .total_samples(Some(total))
        .qualify(QualifyFlags::DSD_AUDIO | flags)
        .build()
        .expect("valid DSD descriptor")
}

/// A descriptor each container can store, paired with its kind
pub fn sample_formats() -> Vec<(ContainerKind, AudioFormatDescriptor)> {
    vec![
        (ContainerKind::Wav, cd_stereo(1000)),
        (ContainerKind::Wav, surround_51(333)),
        (ContainerKind::Wav, float_mono(77)),
        (ContainerKind::Rf64, cd_stereo(1000)),
        (ContainerKind::Wave64, surround_51(333)),
        (ContainerKind::Wave64, float_mono(77)),
        (ContainerKind::Caf, caf_surround(50)),
        (ContainerKind::Caf, cd_stereo(1000).conformed_to(ContainerKind::Caf)),
        (
            ContainerKind::Dsdiff,
            dsd_stereo(4096, QualifyFlags::DSD_MSB_FIRST),
        ),
        (
            ContainerKind::Dsf,
            dsd_stereo(
                4097,
                QualifyFlags::DSD_IN_BLOCKS | QualifyFlags::DSD_LSB_FIRST,
            ),
        ),
        (
            ContainerKind::Dsf,
            dsd_stereo(
                100,
                QualifyFlags::DSD_IN_BLOCKS | QualifyFlags::DSD_MSB_FIRST,
            ),
        ),
    ]
}

// ============================================================================
// File Assembly
// ============================================================================

/// Bytes of payload a file of `kind` carries for `format`
pub fn payload_len(kind: ContainerKind, format: &AudioFormatDescriptor) -> usize {
    let total = format.total_samples.unwrap_or(0);
    if kind == ContainerKind::Dsf {
        (total.div_ceil(4096) * 4096 * format.num_channels as u64) as usize
    } else {
        format.payload_bytes(total) as usize
    }
}

/// A complete file: header, payload of `fill`, padding and `trailer`
pub fn build_file(
    kind: ContainerKind,
    format: &AudioFormatDescriptor,
    fill: u8,
    trailer: &[u8],
) -> Vec<u8> {
    let mut file = Vec::new();
    writer_for(kind)
        .write_header(&mut file, format, format.total_samples)
        .expect("header writes");

    let payload = payload_len(kind, format);
    file.extend(std::iter::repeat(fill).take(payload));
    file.extend(std::iter::repeat(0u8).take(pad_after_payload(payload as u64, kind.alignment())));
    file.extend_from_slice(trailer);
    file
}
