//! Audio container header handling
//!
//! This module parses and writes the headers of the supported container
//! formats. Every container is reduced to one [`AudioFormatDescriptor`] plus
//! the raw wrapper bytes, and can be re-emitted from it.

pub mod caf;
pub mod channels;
pub mod codec;
pub mod descriptor;
pub mod dsdiff;
pub mod dsf;
pub mod padding;
pub mod parser;
pub mod registry;
pub mod wav;
pub mod wave64;
pub mod writer;

pub use channels::{default_mask, resolve, ChannelLabel, ChannelReorderPlan, Speakers};
pub use descriptor::{
    AudioFormatDescriptor, Endianness, FormatBuilder, QualifyFlags, SampleKind, WrapperBytes,
    MAX_SAMPLES,
};
pub use parser::{HeaderParser, ParseOptions, ParsedHeader};
pub use registry::{
    alignment_of, identify, kind_from_extension, open_header, parser_for, writer_for,
    ContainerKind,
};
pub use writer::{HeaderWriter, SeekWrite};
