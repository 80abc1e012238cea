//! Error and warning types for audiowrap

use crate::format::ContainerKind;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for audiowrap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for audiowrap
///
/// Everything except [`Error::Io`] is a "soft" failure: the input is not
/// usable, but the stream itself is healthy and a batch job may move on to
/// the next file.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error other than a premature end of file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended inside a header structure
    #[error("{container} file is truncated: {context}")]
    Truncated {
        container: ContainerKind,
        context: String,
    },

    /// A structural rule of the container grammar was violated
    #[error("not a valid {container} file: {reason}")]
    InvalidHeader {
        container: ContainerKind,
        reason: String,
    },

    /// Well-formed, but describes audio this crate does not handle
    #[error("unsupported {container} format: {reason}")]
    Unsupported {
        container: ContainerKind,
        reason: String,
    },

    /// The file carries a channel layout but the caller supplied one too
    #[error("this {container} file already has channel order information")]
    ChannelOrderConflict { container: ContainerKind },

    /// More than 16 MiB of bytes follow the declared payload
    #[error("{container} file has {extra} bytes of extra data, probably is corrupt")]
    ExcessData { container: ContainerKind, extra: u64 },

    #[error("{container} file has no audio samples, probably is corrupt")]
    NoSamples { container: ContainerKind },

    #[error("{container} file has too many samples ({samples})")]
    TooManySamples { container: ContainerKind, samples: u64 },

    /// A chunk declares a size its grammar does not allow
    #[error("{container} chunk '{chunk}' has invalid size {size}")]
    InvalidChunkSize {
        container: ContainerKind,
        chunk: String,
        size: u64,
    },

    /// Two source channels resolve to the same speaker
    #[error("channel label {label} appears more than once")]
    DuplicateChannel { label: u32 },

    #[error("can't create a valid {container} header for non-normalized floating point data")]
    NonNormalizedFloat { container: ContainerKind },

    /// Leading bytes match no known container
    #[error("unrecognized file type")]
    UnknownFormat,

    /// Patching would change the size of the header region
    #[error("header length changed from {expected} to {actual} bytes while patching")]
    PatchLengthMismatch { expected: u64, actual: u64 },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Any error, tagged with the file it came from
    #[error("{}: {source}", .path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a truncation error
    pub fn truncated<S: Into<String>>(container: ContainerKind, context: S) -> Self {
        Error::Truncated {
            container,
            context: context.into(),
        }
    }

    /// Create a structural error
    pub fn invalid<S: Into<String>>(container: ContainerKind, reason: S) -> Self {
        Error::InvalidHeader {
            container,
            reason: reason.into(),
        }
    }

    /// Create an unsupported-format error
    pub fn unsupported<S: Into<String>>(container: ContainerKind, reason: S) -> Self {
        Error::Unsupported {
            container,
            reason: reason.into(),
        }
    }

    /// Create a chunk size error
    pub fn chunk_size(container: ContainerKind, chunk: &[u8], size: u64) -> Self {
        Error::InvalidChunkSize {
            container,
            chunk: String::from_utf8_lossy(chunk).into_owned(),
            size,
        }
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Attach a file path to this error
    pub fn in_file<P: Into<PathBuf>>(self, path: P) -> Self {
        Error::InFile {
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// Map an IO error raised while reading `context`.
    ///
    /// End-of-file becomes [`Error::Truncated`]; anything else stays a hard
    /// [`Error::Io`].
    pub fn from_read(container: ContainerKind, context: &str, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::truncated(container, context)
        } else {
            Error::Io(err)
        }
    }

    /// True when the underlying stream failed
    pub fn is_hard(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::InFile { source, .. } => source.is_hard(),
            _ => false,
        }
    }

    /// True when the input was rejected but the stream is still usable
    pub fn is_soft(&self) -> bool {
        !self.is_hard()
    }
}

/// Non-fatal conditions found while parsing
///
/// Parsers collect these into `ParsedHeader::warnings` and also log them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    #[error("padding byte at offset {offset} is non-zero")]
    NonZeroPadding { offset: u64 },

    #[error("expected {expected} padding byte(s) at end of payload, file ended")]
    MissingPadding { expected: usize },

    #[error("fmt chunk says {declared} bytes per second, expected {expected}")]
    ByteRateMismatch { declared: u32, expected: u64 },

    #[error("audio length of {bytes} bytes is not a multiple of the {frame}-byte frame")]
    LengthNotAligned { bytes: u64, frame: u64 },

    #[error("unknown channel label {label}, channel left unassigned")]
    UnknownChannelLabel { label: u32 },

    #[error("unknown channel layout tag 0x{tag:08x}, channels left unassigned")]
    UnknownLayoutTag { tag: u32 },

    #[error("{count} channel descriptions is too many, ignoring them")]
    TooManyDescriptions { count: u32 },

    #[error("unknown channel id '{id}', channel left unassigned")]
    UnknownChannelId { id: String },
}
