//! Hand-off between container headers and a codec session
//!
//! The codec that compresses the payload keeps the format and the verbatim
//! wrapper bytes so the original file can be rebuilt on decode. This module
//! defines what such a session has to accept, an in-memory implementation,
//! and helpers that move headers in and out of one.

use crate::error::{Error, Result};
use crate::format::channels::ChannelReorderPlan;
use crate::format::descriptor::{AudioFormatDescriptor, QualifyFlags, WrapperBytes};
use crate::format::dsf::block_padded_size;
use crate::format::padding::{capture_trailer, skip_padding};
use crate::format::parser::{ParseOptions, ParsedHeader};
use crate::format::registry::{open_header, writer_for, ContainerKind};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, info};

/// What a codec session must accept from the header layer
pub trait CodecSession {
    /// Set the audio format
    fn set_format(&mut self, format: &AudioFormatDescriptor) -> Result<()>;

    /// Append header bytes to keep verbatim
    fn add_wrapper(&mut self, bytes: &[u8]);

    /// Append bytes that followed the payload
    fn add_trailer(&mut self, bytes: &[u8]);

    /// Replace the channel layout of the current format
    fn set_channel_plan(&mut self, channel_mask: u32, plan: &ChannelReorderPlan) -> Result<()>;

    /// Current format, if one was set
    fn format(&self) -> Option<AudioFormatDescriptor>;

    /// Header bytes kept so far
    fn wrapper(&self) -> &[u8];

    /// Trailer bytes kept so far
    fn trailer(&self) -> &[u8];
}

/// A session that keeps everything in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    format: Option<AudioFormatDescriptor>,
    wrapper: WrapperBytes,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CodecSession for MemorySession {
    fn set_format(&mut self, format: &AudioFormatDescriptor) -> Result<()> {
        format.validate()?;
        self.format = Some(format.clone());
        Ok(())
    }

    fn add_wrapper(&mut self, bytes: &[u8]) {
        self.wrapper.header.extend_from_slice(bytes);
    }

    fn add_trailer(&mut self, bytes: &[u8]) {
        self.wrapper.trailer.extend_from_slice(bytes);
    }

    fn set_channel_plan(&mut self, channel_mask: u32, plan: &ChannelReorderPlan) -> Result<()> {
        let format = self
            .format
            .as_mut()
            .ok_or_else(|| Error::invalid_input("no format set"))?;

        let mut updated = format.clone();
        updated.channel_mask = channel_mask;
        updated.channel_plan = plan.clone();
        updated
            .qualify
            .set(QualifyFlags::REORDERED_CHANNELS, plan.is_reordered());
        updated.validate()?;

        *format = updated;
        Ok(())
    }

    fn format(&self) -> Option<AudioFormatDescriptor> {
        self.format.clone()
    }

    fn wrapper(&self) -> &[u8] {
        &self.wrapper.header
    }

    fn trailer(&self) -> &[u8] {
        &self.wrapper.trailer
    }
}

/// Parse a header from `reader` into `session`
pub fn import_header(
    reader: &mut dyn Read,
    file_size: u64,
    options: &ParseOptions,
    session: &mut dyn CodecSession,
) -> Result<(ContainerKind, ParsedHeader)> {
    let (kind, header) = open_header(reader, file_size, options)?;
    session.set_format(&header.format)?;
    if let Some(wrapper) = &header.wrapper {
        session.add_wrapper(&wrapper.header);
    }
    Ok((kind, header))
}

/// Write a fresh header of `kind` for the session's format
pub fn export_header(
    session: &dyn CodecSession,
    kind: ContainerKind,
    writer: &mut dyn Write,
) -> Result<u64> {
    let format = session
        .format()
        .ok_or_else(|| Error::invalid_input("no format set"))?;
    writer_for(kind).write_header(writer, &format, format.total_samples)
}

/// Write the session's verbatim header bytes
pub fn export_wrapper(session: &dyn CodecSession, writer: &mut dyn Write) -> Result<u64> {
    let wrapper = session.wrapper();
    writer.write_all(wrapper)?;
    Ok(wrapper.len() as u64)
}

/// Write the session's verbatim trailer bytes
pub fn export_trailer(session: &dyn CodecSession, writer: &mut dyn Write) -> Result<u64> {
    let trailer = session.trailer();
    writer.write_all(trailer)?;
    Ok(trailer.len() as u64)
}

/// Parse a file's header into `session`, then skip its payload and keep
/// whatever follows as the trailer
///
/// Errors carry the file path.
pub fn import_file<P: AsRef<Path>>(
    path: P,
    options: &ParseOptions,
    session: &mut dyn CodecSession,
) -> Result<(ContainerKind, ParsedHeader)> {
    let path = path.as_ref();
    import_file_inner(path, options, session).map_err(|e| e.in_file(path))
}

fn import_file_inner(
    path: &Path,
    options: &ParseOptions,
    session: &mut dyn CodecSession,
) -> Result<(ContainerKind, ParsedHeader)> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let (kind, mut header) = import_header(&mut reader, file_size, options, session)?;
    info!(
        "{}: {} file, {} channel(s) at {} Hz",
        path.display(),
        kind,
        header.format.num_channels,
        header.format.sample_rate
    );

    let total = match header.format.total_samples {
        Some(total) if options.store_wrapper => total,
        _ => return Ok((kind, header)),
    };

    let format = &header.format;
    let payload_bytes = if format.qualify.contains(QualifyFlags::DSD_IN_BLOCKS) {
        block_padded_size(total, format.num_channels)
    } else {
        format.payload_bytes(total)
    };
    let payload_end = header.header_len + payload_bytes;
    let trailer_start = header.trailer_offset.unwrap_or(payload_end).max(payload_end);
    if trailer_start >= file_size {
        return Ok((kind, header));
    }

    reader.seek(SeekFrom::Start(payload_end))?;
    if let Some(warning) = skip_padding(&mut reader, kind.alignment(), payload_bytes)? {
        header.warnings.push(warning);
    }
    let position = reader.stream_position()?.max(trailer_start);
    reader.seek(SeekFrom::Start(position))?;

    let trailer = capture_trailer(&mut reader, file_size - position)?;
    debug!("Captured {} trailer bytes", trailer.len());
    session.add_trailer(&trailer);
    if let Some(wrapper) = header.wrapper.as_mut() {
        wrapper.trailer = trailer;
    }

    Ok((kind, header))
}
