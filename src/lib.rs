//! audiowrap - audio container headers for lossless audio codecs
//!
//! audiowrap parses, writes and patches the headers of the containers a
//! lossless audio encoder typically has to accept and reproduce, so the
//! codec itself only ever sees raw payload bytes and one format description.
//!
//! # Architecture
//!
//! audiowrap is organized into a few modules:
//!
//! - `format`: container grammars (RIFF WAV/RF64, Wave64, CAF, DSDIFF, DSF),
//!   the shared record codec, channel layout resolution and the registry
//! - `session`: the hand-off between parsed headers and a codec session
//! - `error`: error and warning types
//!
//! # Example
//!
//! ```no_run
//! use audiowrap::format::{open_header, writer_for, ContainerKind, ParseOptions};
//! use std::fs::File;
//!
//! let mut input = File::open("input.wav")?;
//! let size = input.metadata()?.len();
//! let (kind, header) = open_header(&mut input, size, &ParseOptions::default())?;
//! println!("{} with {} channel(s)", kind, header.format.num_channels);
//!
//! let mut output = File::create("output.caf")?;
//! let format = header.format.conformed_to(ContainerKind::Caf);
//! writer_for(ContainerKind::Caf).write_header(&mut output, &format, format.total_samples)?;
//! # Ok::<(), audiowrap::Error>(())
//! ```

pub mod error;
pub mod format;
pub mod session;

pub use error::{Error, Result, Warning};
pub use format::{AudioFormatDescriptor, ContainerKind, ParseOptions, ParsedHeader};

use serde::{Deserialize, Serialize};

/// audiowrap version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 1;
pub const VERSION_PATCH: u32 = 0;

/// Configuration for the audiowrap library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Enable verbose logging
    pub verbose: bool,
    /// Enable debug output (chunk-level diagnostics)
    pub debug: bool,
}

/// Initialize the audiowrap library with the given configuration
pub fn init(config: Config) -> Result<()> {
    if config.verbose || config.debug {
        let level = if config.debug { "debug" } else { "info" };
        tracing_subscriber::fmt()
            .with_env_filter(level)
            .try_init()
            .map_err(|e| Error::invalid_input(format!("Failed to initialize logging: {}", e)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION_MAJOR, 0);
        assert_eq!(VERSION_MINOR, 1);
        assert_eq!(VERSION_PATCH, 0);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.verbose, false);
        assert_eq!(config.debug, false);
    }

    #[test]
    fn test_init() {
        let config = Config::default();
        assert!(init(config).is_ok());
    }
}
