use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised at the I/O edges of the engine.
///
/// Trigger resolution never produces one of these: a note that addresses no
/// region is a soft failure that is logged and skipped. Errors only come from
/// reading descriptors, SFZ text, configuration files and WAV headers.
#[derive(Error, Debug)]
pub enum Error {
    /// Input/Output error when reading files
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The instrument descriptor is not valid JSON for the expected shape
    #[error("Descriptor error: {0}")]
    Json(#[from] serde_json::Error),

    /// SFZ text that could not be parsed
    #[error("Failed to parse SFZ at line {line}: {message}")]
    Parse {
        /// Line number where the error occurred (1-based)
        line: usize,
        /// Error message describing the problem
        message: String,
    },

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A sample file that exists but is not a readable WAV file
    #[error("WAV error in {path}: {source}")]
    Wav {
        /// Path of the offending file
        path: PathBuf,
        /// Underlying decoder error
        source: hound::Error,
    },

    /// A referenced asset could not be found on disk
    #[error("Asset not found: {0}")]
    MissingAsset(PathBuf),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;
