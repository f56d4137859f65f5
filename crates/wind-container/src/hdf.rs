//! HDF5 containers backed by the HDF5 library.
//!
//! Datasets are returned as stored. HDF wind products describe their packing
//! with per-dataset attributes (`scale_factor`, `Slope`, ...) that decoders
//! apply themselves.

use std::path::{Path, PathBuf};

use hdf5::types::{TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5_metno_sys::h5i::hid_t;
use tracing::debug;

use crate::error::{ContainerError, ContainerResult};
use crate::native::silence_hdf5_errors;
use crate::value::{
    chars_to_text, element_count, split_fixed, ArrayData, AttrValue, Attributes, TextArray,
};
use crate::{Container, ContainerKind};

/// An open HDF5 file.
pub struct HdfContainer {
    path: PathBuf,
    file: hdf5::File,
}

impl HdfContainer {
    /// Open an HDF5 file read-only.
    pub fn open(path: &Path) -> ContainerResult<Self> {
        silence_hdf5_errors();

        let file = hdf5::File::open(path)?;
        debug!(path = %path.display(), "Opened HDF5 container");

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    fn dataset(&self, path: &str) -> ContainerResult<hdf5::Dataset> {
        let path = path.trim_start_matches('/');
        if !link_exists(&self.file, path) {
            return Err(ContainerError::missing(format!("dataset '{}'", path)));
        }
        Ok(self.file.dataset(path)?)
    }
}

impl Container for HdfContainer {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Hdf5
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn attributes(&self) -> ContainerResult<Attributes> {
        let mut attrs = Attributes::new();
        for name in self.file.attr_names()? {
            let attr = self.file.attr(&name)?;
            attrs.insert(name, read_attribute(&attr)?);
        }
        Ok(attrs)
    }

    fn attribute(&self, name: &str) -> ContainerResult<Option<AttrValue>> {
        if !self.file.attr_names()?.iter().any(|n| n == name) {
            return Ok(None);
        }
        let attr = self.file.attr(name)?;
        Ok(Some(read_attribute(&attr)?))
    }

    fn array_shape(&self, path: &str) -> ContainerResult<Vec<usize>> {
        Ok(self.dataset(path)?.shape())
    }

    fn read_array(&self, path: &str) -> ContainerResult<ArrayData> {
        let ds = self.dataset(path)?;
        let shape = ds.shape();
        let raw = ds.read_raw::<f64>()?;
        ArrayData::from_raw(shape, raw)
    }

    fn read_text(&self, path: &str) -> ContainerResult<TextArray> {
        let ds = self.dataset(path)?;
        let shape = ds.shape();
        let dtype = ds.dtype()?;

        match dtype.to_descriptor()? {
            TypeDescriptor::VarLenUnicode => {
                let values = ds.read_raw::<VarLenUnicode>()?;
                TextArray::new(shape, values.iter().map(|s| s.as_str().to_string()).collect())
            }
            TypeDescriptor::VarLenAscii => {
                let values = ds.read_raw::<VarLenAscii>()?;
                TextArray::new(shape, values.iter().map(|s| s.as_str().to_string()).collect())
            }
            TypeDescriptor::FixedAscii(width) | TypeDescriptor::FixedUnicode(width) => {
                let bytes = read_fixed_bytes(
                    ds.id(),
                    dtype.id(),
                    element_count(&shape) * width,
                    FixedSource::Dataset,
                )?;
                TextArray::new(shape, split_fixed(&bytes, width))
            }
            TypeDescriptor::Unsigned(_) | TypeDescriptor::Integer(_) => {
                // Character matrix stored as bytes
                let bytes = ds.read_raw::<u8>()?;
                chars_to_text(&shape, &bytes)
            }
            other => Err(ContainerError::invalid(format!(
                "dataset '{}' holds {:?}, not text",
                path, other
            ))),
        }
    }

    fn array_attribute(&self, path: &str, name: &str) -> ContainerResult<Option<AttrValue>> {
        let ds = self.dataset(path)?;
        if !ds.attr_names()?.iter().any(|n| n == name) {
            return Ok(None);
        }
        let attr = ds.attr(name)?;
        Ok(Some(read_attribute(&attr)?))
    }

    fn groups(&self) -> ContainerResult<Vec<String>> {
        Ok(self
            .file
            .groups()?
            .iter()
            .map(|g| g.name().trim_start_matches('/').to_string())
            .collect())
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Check every component of `path` so a missing link is reported without
/// going through the HDF5 error stack.
fn link_exists(file: &hdf5::File, path: &str) -> bool {
    let mut prefix = String::new();
    for part in path.split('/') {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(part);
        if !file.link_exists(&prefix) {
            return false;
        }
    }
    true
}

fn read_attribute(attr: &hdf5::Attribute) -> ContainerResult<AttrValue> {
    let dtype = attr.dtype()?;
    let count = attr.size();

    let value = match dtype.to_descriptor()? {
        TypeDescriptor::VarLenUnicode => {
            let values = attr.read_raw::<VarLenUnicode>()?;
            AttrValue::from_texts(values.iter().map(|s| s.as_str().to_string()).collect())
        }
        TypeDescriptor::VarLenAscii => {
            let values = attr.read_raw::<VarLenAscii>()?;
            AttrValue::from_texts(values.iter().map(|s| s.as_str().to_string()).collect())
        }
        TypeDescriptor::FixedAscii(width) | TypeDescriptor::FixedUnicode(width) => {
            let bytes =
                read_fixed_bytes(attr.id(), dtype.id(), count * width, FixedSource::Attribute)?;
            AttrValue::from_texts(split_fixed(&bytes, width))
        }
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) | TypeDescriptor::Float(_) => {
            AttrValue::from_numbers(attr.read_raw::<f64>()?)
        }
        other => {
            return Err(ContainerError::invalid(format!(
                "unsupported attribute type {:?}",
                other
            )))
        }
    };
    Ok(value)
}

#[derive(Debug, Clone, Copy)]
enum FixedSource {
    Attribute,
    Dataset,
}

/// Read fixed-length string storage into a byte buffer using the file type
/// as the memory type, so no string conversion takes place.
fn read_fixed_bytes(
    object: hid_t,
    dtype: hid_t,
    len: usize,
    source: FixedSource,
) -> ContainerResult<Vec<u8>> {
    let mut buf = vec![0u8; len];
    if len == 0 {
        return Ok(buf);
    }

    // SAFETY: `buf` holds exactly elements × width bytes, which is what the
    // library writes when the memory type equals the stored fixed string type.
    let status = unsafe {
        match source {
            FixedSource::Attribute => {
                hdf5_metno_sys::h5a::H5Aread(object, dtype, buf.as_mut_ptr().cast())
            }
            FixedSource::Dataset => hdf5_metno_sys::h5d::H5Dread(
                object,
                dtype,
                hdf5_metno_sys::h5s::H5S_ALL,
                hdf5_metno_sys::h5s::H5S_ALL,
                hdf5_metno_sys::h5p::H5P_DEFAULT,
                buf.as_mut_ptr().cast(),
            ),
        }
    };

    if status < 0 {
        return Err(ContainerError::invalid(format!(
            "failed to read fixed-length string {:?}",
            source
        )));
    }
    Ok(buf)
}
