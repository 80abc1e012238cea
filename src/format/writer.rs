//! Header writer trait
//!
//! Writing is two-phase: the header goes out before the payload, possibly
//! without a final sample count, and is rewritten in place once the count is
//! known.

use super::descriptor::{AudioFormatDescriptor, NORMALIZED_EXPONENT};
use super::registry::ContainerKind;
use crate::error::{Error, Result};
use std::io::{Seek, SeekFrom, Write};
use tracing::debug;

/// A writer that can also seek, for patching
pub trait SeekWrite: Write + Seek {}

impl<T: Write + Seek + ?Sized> SeekWrite for T {}

/// Emits one container's header
pub trait HeaderWriter {
    /// Container this writer produces
    fn kind(&self) -> ContainerKind;

    /// Render the header bytes, from offset 0 through the payload chunk header
    ///
    /// `total_samples` of `None` renders the container's placeholder. The
    /// rendered length never depends on the sample count.
    fn render_header(
        &self,
        format: &AudioFormatDescriptor,
        total_samples: Option<u64>,
    ) -> Result<Vec<u8>>;

    /// Write the header, returning the number of bytes written
    fn write_header(
        &self,
        writer: &mut dyn Write,
        format: &AudioFormatDescriptor,
        total_samples: Option<u64>,
    ) -> Result<u64> {
        let header = self.render_header(format, total_samples)?;
        writer.write_all(&header)?;
        debug!(
            "Wrote {} byte {} header ({:?} samples)",
            header.len(),
            self.kind(),
            total_samples
        );
        Ok(header.len() as u64)
    }

    /// Rewrite the header at offset 0 with the final sample count
    ///
    /// The stream position is restored afterwards.
    fn patch_header(
        &self,
        writer: &mut dyn SeekWrite,
        format: &AudioFormatDescriptor,
        total_samples: u64,
    ) -> Result<()> {
        let expected = self.render_header(format, None)?.len() as u64;
        let header = self.render_header(format, Some(total_samples))?;
        if header.len() as u64 != expected {
            return Err(Error::PatchLengthMismatch {
                expected,
                actual: header.len() as u64,
            });
        }

        let resume = writer.stream_position()?;
        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(&header)?;
        writer.seek(SeekFrom::Start(resume))?;
        writer.flush()?;

        debug!("Patched {} header with {} samples", self.kind(), total_samples);
        Ok(())
    }
}

/// Checks common to the PCM writers
///
/// Rejects DSD descriptors and float data that isn't normalized.
pub(crate) fn check_pcm(format: &AudioFormatDescriptor, container: ContainerKind) -> Result<()> {
    format.validate()?;
    if format.is_dsd() {
        return Err(Error::unsupported(
            container,
            "DSD audio can't be stored in a PCM container",
        ));
    }
    if let super::descriptor::SampleKind::Float {
        normalization_exponent,
    } = format.sample_kind
    {
        if normalization_exponent != NORMALIZED_EXPONENT {
            return Err(Error::NonNormalizedFloat { container });
        }
    }
    Ok(())
}

/// Checks common to the DSD writers
///
/// Returns the rate in bits per second.
pub(crate) fn check_dsd(format: &AudioFormatDescriptor, container: ContainerKind) -> Result<u32> {
    format.validate()?;
    if !format.is_dsd() {
        return Err(Error::unsupported(container, "only DSD audio can be stored"));
    }
    if format.bytes_per_sample != 1 {
        return Err(Error::unsupported(
            container,
            format!("DSD frames must be one byte, not {}", format.bytes_per_sample),
        ));
    }
    format.sample_rate.checked_mul(8).ok_or_else(|| {
        Error::unsupported(container, format!("DSD byte rate {}", format.sample_rate))
    })
}
