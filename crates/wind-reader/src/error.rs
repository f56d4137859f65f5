//! Error types for wind reading.

use std::path::PathBuf;

use thiserror::Error;
use wind_container::ContainerError;

use crate::registry::FormatId;

/// Failures inside a decoder while reading one file.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The container could not provide a required array or attribute.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// A required file-level attribute is absent.
    #[error("missing attribute '{0}'")]
    MissingAttribute(String),

    /// An attribute exists but cannot be interpreted.
    #[error("invalid attribute '{name}': {reason}")]
    InvalidAttribute { name: String, reason: String },

    /// Two arrays that must line up have different shapes.
    #[error("shape mismatch: {left} {left_shape:?} vs {right} {right_shape:?}")]
    ShapeMismatch {
        left: String,
        left_shape: Vec<usize>,
        right: String,
        right_shape: Vec<usize>,
    },

    /// An array cannot be arranged as a grid.
    #[error("array '{name}' has unusable shape {shape:?}")]
    InvalidShape { name: String, shape: Vec<usize> },

    /// A band-specific value was requested before a band was chosen.
    #[error("{0} depends on the sub-band, load a band first")]
    BandNotSelected(&'static str),
}

impl DecodeError {
    /// Create a MissingAttribute error.
    pub fn missing_attribute(name: impl Into<String>) -> Self {
        Self::MissingAttribute(name.into())
    }

    /// Create an InvalidAttribute error.
    pub fn invalid_attribute(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(
        left: impl Into<String>,
        left_shape: &[usize],
        right: impl Into<String>,
        right_shape: &[usize],
    ) -> Self {
        Self::ShapeMismatch {
            left: left.into(),
            left_shape: left_shape.to_vec(),
            right: right.into(),
            right_shape: right_shape.to_vec(),
        }
    }
}

/// Errors surfaced by readers, the registry and the load pipeline.
#[derive(Error, Debug)]
pub enum ReaderError {
    /// The file does not carry this format's signature.
    #[error("{format} signature not matched: {detail}")]
    SignatureMismatch { format: FormatId, detail: String },

    /// The file could not be opened as the format's container kind.
    #[error("failed to open container: {0}")]
    Open(#[from] ContainerError),

    /// Decoding failed after the format was confirmed.
    #[error("failed to decode {} as {format}: {source}", path.display())]
    Decode {
        format: FormatId,
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    /// No candidate format accepted the file.
    #[error("no reader matched {}", path.display())]
    NoReaderMatched { path: PathBuf },

    /// A format name that is not in the registry.
    #[error("unknown reader format '{0}'")]
    UnknownFormat(String),

    /// An operation needs a loaded record.
    #[error("no wind data loaded, call load first")]
    NotLoaded,

    /// A multi-band format was loaded without naming a band.
    #[error("{format} requires a sub-band, one of {available:?}")]
    BandRequired {
        format: FormatId,
        available: Vec<String>,
    },

    /// The named band is not offered by the format.
    #[error("band '{band}' not available for {format}, expected one of {available:?}")]
    InvalidBand {
        format: FormatId,
        band: String,
        available: Vec<String>,
    },

    /// The reader already holds a different band.
    #[error("band '{loaded}' already loaded, cannot switch to '{requested}'")]
    BandAlreadyLoaded { loaded: String, requested: String },

    /// A lat/lon box that is not finite or has min above max.
    #[error("invalid lat/lon box: {0}")]
    InvalidBox(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ReaderError {
    /// Create an InvalidBox error.
    pub fn invalid_box(msg: impl Into<String>) -> Self {
        Self::InvalidBox(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this is a signature mismatch, which detection skips silently.
    pub fn is_mismatch(&self) -> bool {
        matches!(self, Self::SignatureMismatch { .. })
    }
}

/// Result type for reader operations.
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Result type inside decoders.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
