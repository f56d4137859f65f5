//! Format registry and auto-detection.
//!
//! Detection walks the candidate formats in a fixed priority order and runs
//! each format's signature check, which reads only the attribute the family
//! is recognised by. The first format whose check passes wins.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use wind_container::{ContainerKind, ContainerSource, FileSource};

use crate::decoder::{CfosatDecoder, HscatDecoder, SwathDecoder, WindDecoder, WindRadDecoder};
use crate::error::{ReaderError, Result};

/// Known product formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatId {
    AscatNc,
    OscatNc,
    HscatHdf,
    CscatNc,
    WindradHdf,
}

/// Priority order used when no explicit list is given.
pub const REGISTRY_ORDER: [FormatId; 5] = [
    FormatId::AscatNc,
    FormatId::OscatNc,
    FormatId::HscatHdf,
    FormatId::CscatNc,
    FormatId::WindradHdf,
];

impl FormatId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AscatNc => "ascat_nc",
            Self::OscatNc => "oscat_nc",
            Self::HscatHdf => "hscat_hdf",
            Self::CscatNc => "cscat_nc",
            Self::WindradHdf => "windrad_hdf",
        }
    }

    /// Container kind the format is stored in.
    pub fn container_kind(&self) -> ContainerKind {
        match self {
            Self::AscatNc | Self::OscatNc | Self::CscatNc => ContainerKind::NetCdf,
            Self::HscatHdf | Self::WindradHdf => ContainerKind::Hdf5,
        }
    }

    /// Open `path` and run this format's signature check.
    ///
    /// The container is dropped before returning.
    pub fn check_signature(&self, source: &dyn ContainerSource, path: &Path) -> Result<()> {
        let container = source.open(path, self.container_kind())?;
        let container = container.as_ref();
        match self {
            Self::AscatNc | Self::OscatNc => SwathDecoder::check_signature(*self, container),
            Self::CscatNc => CfosatDecoder::check_signature(container),
            Self::HscatHdf => HscatDecoder::check_signature(container),
            Self::WindradHdf => WindRadDecoder::check_signature(container),
        }
    }

    /// Open `path` and build this format's decoder.
    pub fn open_decoder(
        &self,
        source: &dyn ContainerSource,
        path: &Path,
    ) -> Result<Box<dyn WindDecoder>> {
        let container = source.open(path, self.container_kind())?;
        Ok(match self {
            Self::AscatNc | Self::OscatNc => Box::new(SwathDecoder::new(*self, container)?),
            Self::CscatNc => Box::new(CfosatDecoder::new(container)?),
            Self::HscatHdf => Box::new(HscatDecoder::new(container)?),
            Self::WindradHdf => Box::new(WindRadDecoder::new(container)?),
        })
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatId {
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_lowercase();
        REGISTRY_ORDER
            .iter()
            .copied()
            .find(|f| f.as_str() == name)
            .ok_or_else(|| ReaderError::UnknownFormat(s.to_string()))
    }
}

/// Which formats detection may try, and in what order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReaderSelection {
    /// Every registered format in priority order.
    #[default]
    Auto,
    /// A single named format.
    Named(String),
    /// An explicit ordered list of names.
    List(Vec<String>),
}

impl ReaderSelection {
    /// Parse `auto`, a single name or a comma separated list.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("auto") {
            return Self::Auto;
        }
        if s.contains(',') {
            return Self::List(
                s.split(',')
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .collect(),
            );
        }
        Self::Named(s.to_string())
    }

    /// Resolve names to formats. Unknown names are logged and skipped.
    pub fn candidates(&self) -> Vec<FormatId> {
        let names: Vec<&str> = match self {
            Self::Auto => return REGISTRY_ORDER.to_vec(),
            Self::Named(name) => vec![name.as_str()],
            Self::List(names) => names.iter().map(String::as_str).collect(),
        };
        names
            .into_iter()
            .filter_map(|name| match name.parse::<FormatId>() {
                Ok(format) => Some(format),
                Err(_) => {
                    warn!(reader = name, "Skipping unknown reader name");
                    None
                }
            })
            .collect()
    }
}

impl fmt::Display for ReaderSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Named(name) => f.write_str(name),
            Self::List(names) => f.write_str(&names.join(",")),
        }
    }
}

impl From<String> for ReaderSelection {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<ReaderSelection> for String {
    fn from(selection: ReaderSelection) -> Self {
        selection.to_string()
    }
}

impl From<FormatId> for ReaderSelection {
    fn from(format: FormatId) -> Self {
        Self::Named(format.as_str().to_string())
    }
}

/// Detect the format of a file on disk.
pub fn find_reader(path: impl AsRef<Path>, selection: &ReaderSelection) -> Option<FormatId> {
    find_reader_with(&FileSource, path.as_ref(), selection)
}

/// Detect the format of a file obtained from `source`.
///
/// Failures other than a signature mismatch are logged and treated as "not
/// this format".
pub fn find_reader_with(
    source: &dyn ContainerSource,
    path: &Path,
    selection: &ReaderSelection,
) -> Option<FormatId> {
    for format in selection.candidates() {
        debug!(format = %format, path = %path.display(), "Probing reader");
        match format.check_signature(source, path) {
            Ok(()) => {
                info!(format = %format, path = %path.display(), "Matched reader");
                return Some(format);
            }
            Err(e) if e.is_mismatch() => {
                debug!(format = %format, error = %e, "Signature not matched");
            }
            Err(e) => {
                warn!(format = %format, path = %path.display(), error = %e, "Reader probe failed");
            }
        }
    }
    None
}

/// Detect and open a decoder for a file on disk.
pub fn open_reader(
    path: impl AsRef<Path>,
    selection: &ReaderSelection,
) -> Result<Box<dyn WindDecoder>> {
    open_reader_with(&FileSource, path.as_ref(), selection)
}

/// Detect and open a decoder for a file obtained from `source`.
pub fn open_reader_with(
    source: &dyn ContainerSource,
    path: &Path,
    selection: &ReaderSelection,
) -> Result<Box<dyn WindDecoder>> {
    let format =
        find_reader_with(source, path, selection).ok_or_else(|| ReaderError::NoReaderMatched {
            path: path.to_path_buf(),
        })?;
    format.open_decoder(source, path)
}
