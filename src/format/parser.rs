//! Header parser trait and the machinery shared by every container parser

use super::codec::{ChunkCodec, Record};
use super::descriptor::{AudioFormatDescriptor, QualifyFlags, WrapperBytes, MAX_SAMPLES};
use super::registry::ContainerKind;
use crate::error::{Error, Result, Warning};
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use tracing::{debug, warn};

/// Bytes of non-audio data after the payload that mark a file as corrupt
pub const MAX_EXTRA_BYTES: u64 = 16 * 1024 * 1024;

/// Caller configuration for parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Keep the raw header bytes
    pub store_wrapper: bool,
    /// Don't trust the declared payload length
    pub ignore_length: bool,
    /// Channel mask the caller wants instead of the file's
    pub channel_mask: Option<u32>,
    /// Leave all channels without speaker positions
    pub channels_unassigned: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            store_wrapper: true,
            ignore_length: false,
            channel_mask: None,
            channels_unassigned: false,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_wrapper(mut self, store: bool) -> Self {
        self.store_wrapper = store;
        self
    }

    pub fn ignore_length(mut self, ignore: bool) -> Self {
        self.ignore_length = ignore;
        self
    }

    pub fn channel_mask(mut self, mask: u32) -> Self {
        self.channel_mask = Some(mask);
        self
    }

    pub fn channels_unassigned(mut self, unassigned: bool) -> Self {
        self.channels_unassigned = unassigned;
        self
    }

    /// True when the caller has already decided the channel order
    pub fn has_channel_order(&self) -> bool {
        self.channel_mask.is_some() || self.channels_unassigned
    }

    /// Mask to use when the file carries none
    pub fn fallback_mask(&self, num_channels: u32) -> u32 {
        match (self.channel_mask, self.channels_unassigned) {
            (Some(mask), _) => mask,
            (None, true) => 0,
            (None, false) => super::channels::default_mask(num_channels),
        }
    }

    /// Flags implied by the options
    pub fn qualify(&self) -> QualifyFlags {
        let mut flags = QualifyFlags::empty();
        flags.set(QualifyFlags::IGNORE_LENGTH, self.ignore_length);
        flags.set(QualifyFlags::CHANNELS_UNASSIGNED, self.channels_unassigned);
        flags
    }
}

/// Result of parsing a container header
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedHeader {
    /// Container actually found (RIFF vs RF64 share a parser)
    pub container: ContainerKind,
    pub format: AudioFormatDescriptor,
    /// Raw header bytes, unless wrapper storage was disabled
    pub wrapper: Option<WrapperBytes>,
    /// Bytes consumed, i.e. the offset of the first payload byte
    pub header_len: u64,
    /// Offset of trailing metadata the header points at (DSF)
    pub trailer_offset: Option<u64>,
    pub warnings: Vec<Warning>,
}

/// Parses one container grammar
pub trait HeaderParser {
    /// Container this parser handles
    fn kind(&self) -> ContainerKind;

    /// Parse from the first byte of the file through the payload chunk header
    ///
    /// `file_size` is zero when unknown.
    fn parse(
        &self,
        reader: &mut dyn Read,
        file_size: u64,
        options: &ParseOptions,
    ) -> Result<ParsedHeader>;
}

/// Parser state: a position-tracking reader that records every byte into the
/// wrapper, plus collected warnings
pub struct ParseContext<'a> {
    reader: &'a mut dyn Read,
    position: u64,
    codec: ChunkCodec,
    wrapper: Option<Vec<u8>>,
    warnings: Vec<Warning>,
}

impl<'a> ParseContext<'a> {
    pub fn new(reader: &'a mut dyn Read, container: ContainerKind, options: &ParseOptions) -> Self {
        ParseContext {
            reader,
            position: 0,
            codec: ChunkCodec::new(container),
            wrapper: options.store_wrapper.then(Vec::new),
            warnings: Vec::new(),
        }
    }

    pub fn container(&self) -> ContainerKind {
        self.codec.container()
    }

    /// Switch the container reported in errors (RIFF turning out to be RF64)
    pub fn set_container(&mut self, container: ContainerKind) {
        self.codec = ChunkCodec::new(container);
    }

    /// Bytes consumed so far
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn codec(&self) -> &ChunkCodec {
        &self.codec
    }

    /// Read exactly `buf.len()` bytes
    pub fn read_exact(&mut self, buf: &mut [u8], what: &str) -> Result<()> {
        self.reader
            .read_exact(buf)
            .map_err(|e| Error::from_read(self.codec.container(), what, e))?;
        self.position += buf.len() as u64;
        if let Some(wrapper) = self.wrapper.as_mut() {
            wrapper.extend_from_slice(buf);
        }
        Ok(())
    }

    /// Read `len` bytes into a new buffer
    pub fn read_bytes(&mut self, len: usize, what: &str) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf, what)?;
        Ok(buf)
    }

    /// Read a fixed-layout record
    pub fn read_record<T: Record>(&mut self, what: &str) -> Result<T> {
        let raw = self.read_bytes(T::SIZE, what)?;
        self.codec.decode(&raw)
    }

    /// Read and discard `len` bytes (still copied into the wrapper)
    pub fn skip(&mut self, len: u64, what: &str) -> Result<()> {
        let copied = match self.wrapper.as_mut() {
            Some(wrapper) => io::copy(&mut (&mut *self.reader).take(len), wrapper),
            None => io::copy(&mut (&mut *self.reader).take(len), &mut io::sink()),
        }
        .map_err(Error::Io)?;

        self.position += copied;
        if copied < len {
            return Err(Error::truncated(self.codec.container(), what));
        }
        Ok(())
    }

    /// Record a warning and log it
    pub fn warn(&mut self, warning: Warning) {
        warn!("{}: {}", self.codec.container(), warning);
        self.warnings.push(warning);
    }

    /// Work out the payload length in frames
    ///
    /// `declared_bytes` is `None` when the header itself says the length is
    /// unknown. With an unknown or ignored length the payload runs to end of
    /// file, or stays unknown when the file size is. Otherwise the file must not
    /// carry more than [`MAX_EXTRA_BYTES`] beyond it, and must hold at least one
    /// and at most [`MAX_SAMPLES`] frames.
    pub fn payload_frames(
        &mut self,
        declared_bytes: Option<u64>,
        frame_bytes: u64,
        file_size: u64,
        options: &ParseOptions,
    ) -> Result<PayloadLength> {
        let container = self.codec.container();
        let frame_bytes = frame_bytes.max(1);

        let declared = match declared_bytes {
            Some(bytes) if !options.ignore_length => bytes,
            _ => {
                let frames = if file_size > 0 {
                    let remaining = file_size.saturating_sub(self.position);
                    if remaining % frame_bytes != 0 {
                        self.warn(Warning::LengthNotAligned {
                            bytes: remaining,
                            frame: frame_bytes,
                        });
                    }
                    Some(remaining / frame_bytes)
                } else {
                    None
                };
                debug!("{} payload length taken from file size: {:?}", container, frames);
                return Ok(PayloadLength {
                    frames,
                    ignored: true,
                });
            }
        };

        if file_size > 0 {
            let extra = file_size.saturating_sub(declared);
            if extra > MAX_EXTRA_BYTES {
                return Err(Error::ExcessData { container, extra });
            }
        }

        if declared % frame_bytes != 0 {
            self.warn(Warning::LengthNotAligned {
                bytes: declared,
                frame: frame_bytes,
            });
        }

        let frames = declared / frame_bytes;
        if frames == 0 {
            return Err(Error::NoSamples { container });
        }
        if frames > MAX_SAMPLES {
            return Err(Error::TooManySamples {
                container,
                samples: frames,
            });
        }

        Ok(PayloadLength {
            frames: Some(frames),
            ignored: false,
        })
    }

    /// Finish with the parsed descriptor
    pub fn finish(self, format: AudioFormatDescriptor) -> ParsedHeader {
        debug!(
            "Parsed {} header: {} bytes, {} Hz, {} channel(s), {} bits",
            self.codec.container(),
            self.position,
            format.sample_rate,
            format.num_channels,
            format.bits_per_sample
        );
        ParsedHeader {
            container: self.codec.container(),
            format,
            wrapper: self.wrapper.map(WrapperBytes::new),
            header_len: self.position,
            trailer_offset: None,
            warnings: self.warnings,
        }
    }
}

/// Payload length as derived by [`ParseContext::payload_frames`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLength {
    /// Frames per channel, `None` when unknown
    pub frames: Option<u64>,
    /// The length came from the file size, not the header
    pub ignored: bool,
}

impl PayloadLength {
    /// Flags this length implies
    pub fn qualify(&self) -> QualifyFlags {
        if self.ignored {
            QualifyFlags::IGNORE_LENGTH
        } else {
            QualifyFlags::empty()
        }
    }
}
