//! # Error Types
//!
//! Fatal errors raised outside the conversion core: reading input files,
//! decoding Standard MIDI Files, loading configuration and writing output.
//!
//! Problems inside the core (overlapping notes, imprecise durations, a track
//! whose measure length cannot be computed) are never errors. They are
//! recorded as [`Diagnostic`](crate::diagnostics::Diagnostic) values next to
//! the text and the conversion carries on.
//!
//! ## Usage
//! ```rust,no_run
//! use miditext::{convert_file, ConvertConfig, ConvertError};
//! use std::path::Path;
//!
//! match convert_file(Path::new("song.mid"), &ConvertConfig::default()) {
//!     Ok(conversion) => println!("{}", conversion.text),
//!     Err(ConvertError::Io { path, source }) => {
//!         eprintln!("Cannot read {}: {}", path.display(), source);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    /// Reading or writing a file failed.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input bytes are not a readable Standard MIDI File.
    ///
    /// # Example
    /// ```
    /// # use miditext::ConvertError;
    /// let err = ConvertError::Midi("invalid header".to_string());
    /// assert_eq!(err.to_string(), "Invalid MIDI data: invalid header");
    /// ```
    #[error("Invalid MIDI data: {0}")]
    Midi(String),

    /// The YAML configuration is malformed or holds unsupported values.
    ///
    /// # Example
    /// ```
    /// # use miditext::ConvertError;
    /// let err = ConvertError::Config("min-rest-ticks must be positive".to_string());
    /// assert_eq!(err.to_string(), "Invalid configuration: min-rest-ticks must be positive");
    /// ```
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ConvertError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }
}
