//! Payload padding and trailer capture

use crate::error::{Error, Result, Warning};
use std::io::{self, Read, Write};
use tracing::warn;

/// Padding needed after `bytes_written` payload bytes to reach `alignment`
pub fn pad_after_payload(bytes_written: u64, alignment: u8) -> usize {
    let alignment = alignment.max(1) as u64;
    ((alignment - bytes_written % alignment) % alignment) as usize
}

/// `size` rounded up to `alignment`, saturating at `u64::MAX`
pub fn padded_size(size: u64, alignment: u8) -> u64 {
    size.saturating_add(pad_after_payload(size, alignment) as u64)
}

/// Write zero padding after a payload, returning the bytes written
pub fn write_padding(writer: &mut dyn Write, bytes_written: u64, alignment: u8) -> Result<usize> {
    let pad = pad_after_payload(bytes_written, alignment);
    if pad > 0 {
        writer.write_all(&vec![0u8; pad])?;
    }
    Ok(pad)
}

/// Consume the padding after a payload
///
/// A missing or non-zero pad byte is reported, not rejected.
pub fn skip_padding(
    reader: &mut dyn Read,
    alignment: u8,
    bytes_written: u64,
) -> Result<Option<Warning>> {
    let pad = pad_after_payload(bytes_written, alignment);
    if pad == 0 {
        return Ok(None);
    }

    let mut bytes = vec![0u8; pad];
    let warning = match reader.read_exact(&mut bytes) {
        Ok(()) => bytes.iter().position(|&b| b != 0).map(|i| Warning::NonZeroPadding {
            offset: bytes_written + i as u64,
        }),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            Some(Warning::MissingPadding { expected: pad })
        }
        Err(e) => return Err(Error::Io(e)),
    };

    if let Some(w) = &warning {
        warn!("{}", w);
    }
    Ok(warning)
}

/// Read everything that follows the payload, up to `limit` bytes
pub fn capture_trailer(reader: &mut dyn Read, limit: u64) -> Result<Vec<u8>> {
    let mut trailer = Vec::new();
    reader.take(limit).read_to_end(&mut trailer)?;
    Ok(trailer)
}
