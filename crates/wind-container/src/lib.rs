//! Read-only container access for scatterometer wind files.
//!
//! Wind products arrive in two container kinds:
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐
//! │   NetCDF     │     │       HDF5        │
//! │ attrs + vars │     │ groups + datasets │
//! └──────┬───────┘     └─────────┬─────────┘
//!        │ mask + scale          │ raw values
//!        ▼                       ▼
//!   ┌─────────────────────────────────────┐
//!   │          dyn Container              │
//!   │ attributes / read_array / read_text │
//!   └─────────────────────────────────────┘
//! ```
//!
//! Decoders only see the [`Container`] trait. NetCDF variables are unpacked
//! following the CF conventions (fill values masked, scale and offset
//! applied). HDF5 datasets are returned as stored, since the HDF products
//! carry their own slope/intercept conventions.
//!
//! [`MemoryContainer`] implements the same trait for tests.

pub mod error;
pub mod hdf;
pub mod memory;
pub mod native;
pub mod value;

use std::fmt;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use error::{ContainerError, ContainerResult};
pub use hdf::HdfContainer;
pub use memory::{MemoryContainer, MemorySource};
pub use native::{silence_hdf5_errors, NetCdfContainer};
pub use value::{ArrayData, AttrValue, Attributes, MaskAndScale, TextArray};

/// The two supported container kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    NetCdf,
    Hdf5,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::NetCdf => write!(f, "NetCDF"),
            ContainerKind::Hdf5 => write!(f, "HDF5"),
        }
    }
}

/// Uniform read-only view of a NetCDF or HDF5 file.
///
/// Array paths may address nested arrays as `group/array`. Requests for
/// arrays that do not exist fail with [`ContainerError::MissingData`];
/// absent attributes are `Ok(None)`.
pub trait Container {
    fn kind(&self) -> ContainerKind;

    fn path(&self) -> &Path;

    /// All file-level attributes.
    fn attributes(&self) -> ContainerResult<Attributes>;

    /// One file-level attribute.
    fn attribute(&self, name: &str) -> ContainerResult<Option<AttrValue>> {
        Ok(self.attributes()?.remove(name))
    }

    /// Shape of a named array.
    fn array_shape(&self, path: &str) -> ContainerResult<Vec<usize>>;

    /// Numeric array widened to `f64`.
    fn read_array(&self, path: &str) -> ContainerResult<ArrayData>;

    /// String array. Character matrices are joined along their last axis.
    fn read_text(&self, path: &str) -> ContainerResult<TextArray>;

    /// Attribute attached to a named array.
    fn array_attribute(&self, path: &str, name: &str) -> ContainerResult<Option<AttrValue>>;

    /// Names of the top-level groups.
    fn groups(&self) -> ContainerResult<Vec<String>>;
}

/// Something that can hand out containers for paths.
///
/// Readers go through a source rather than opening files directly so that
/// detection and decoding run unchanged against in-memory containers.
pub trait ContainerSource {
    fn open(&self, path: &Path, kind: ContainerKind) -> ContainerResult<Box<dyn Container>>;
}

/// Opens containers from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl ContainerSource for FileSource {
    fn open(&self, path: &Path, kind: ContainerKind) -> ContainerResult<Box<dyn Container>> {
        open(path, kind)
    }
}

/// Open a file as the requested container kind.
pub fn open(path: &Path, kind: ContainerKind) -> ContainerResult<Box<dyn Container>> {
    let sniffed = sniff_kind(path)?;
    if !accepts(kind, sniffed) {
        return Err(ContainerError::WrongKind {
            path: path.to_path_buf(),
            requested: kind,
        });
    }

    match kind {
        ContainerKind::NetCdf => Ok(Box::new(NetCdfContainer::open(path)?)),
        ContainerKind::Hdf5 => Ok(Box::new(HdfContainer::open(path)?)),
    }
}

/// On-disk signature found at the start of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSignature {
    /// Classic or 64-bit offset NetCDF (`CDF\x01`, `CDF\x02`, `CDF\x05`)
    ClassicNetCdf,
    /// HDF5 superblock, which also covers NetCDF-4 files
    Hdf5,
    Unknown,
}

const HDF5_MAGIC: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1a, b'\n'];

/// Offsets where an HDF5 superblock may start (user block sizes).
const HDF5_SUPERBLOCK_OFFSETS: [usize; 4] = [0, 512, 1024, 2048];

/// Read the leading bytes of a file and classify them.
pub fn sniff_kind(path: &Path) -> ContainerResult<FileSignature> {
    let mut file = std::fs::File::open(path)?;
    let mut head = Vec::with_capacity(2056);
    file.by_ref().take(2056).read_to_end(&mut head)?;
    Ok(classify_signature(&head))
}

/// Classify a header buffer by its magic bytes.
pub fn classify_signature(head: &[u8]) -> FileSignature {
    if head.len() >= 4 && &head[0..3] == b"CDF" && matches!(head[3], 1 | 2 | 5) {
        return FileSignature::ClassicNetCdf;
    }
    let is_hdf = HDF5_SUPERBLOCK_OFFSETS
        .iter()
        .any(|&off| head.get(off..off + 8) == Some(&HDF5_MAGIC[..]));
    if is_hdf {
        FileSignature::Hdf5
    } else {
        FileSignature::Unknown
    }
}

/// Whether a file with the given signature can be opened as `kind`.
fn accepts(kind: ContainerKind, signature: FileSignature) -> bool {
    match kind {
        // NetCDF-4 files are HDF5 files underneath
        ContainerKind::NetCdf => signature != FileSignature::Unknown,
        ContainerKind::Hdf5 => signature == FileSignature::Hdf5,
    }
}

/// Split `group/array` into its group path and leaf name.
pub(crate) fn split_path(path: &str) -> (Option<&str>, &str) {
    let trimmed = path.trim_start_matches('/');
    match trimmed.rsplit_once('/') {
        Some((group, leaf)) => (Some(group), leaf),
        None => (None, trimmed),
    }
}
