//! NetCDF containers backed by libnetcdf.
//!
//! Variables are unpacked on read: elements equal to `_FillValue` or
//! `missing_value`, or outside `valid_min`/`valid_max`/`valid_range`, are
//! masked, and `scale_factor`/`add_offset` are applied to the rest.

use std::path::{Path, PathBuf};
use std::sync::Once;

use netcdf::AttributeValue;
use tracing::debug;

use crate::error::{ContainerError, ContainerResult};
use crate::value::{
    chars_to_text, element_count, unravel, ArrayData, AttrValue, Attributes, MaskAndScale,
    TextArray,
};
use crate::{split_path, Container, ContainerKind};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when probing a file for a
/// format signature attribute it does not have). This creates confusing log
/// spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// This function disables that output by calling H5Eset_auto2 with null handlers.
/// It only needs to be called once per process, but is safe to call multiple times.
/// Both container kinds call it before opening a file.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// An open NetCDF file.
pub struct NetCdfContainer {
    path: PathBuf,
    file: netcdf::File,
}

impl NetCdfContainer {
    /// Open a NetCDF file read-only.
    pub fn open(path: &Path) -> ContainerResult<Self> {
        silence_hdf5_errors();

        let file = netcdf::open(path)?;
        debug!(path = %path.display(), "Opened NetCDF container");

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Run `f` against the variable at `path`, resolving `group/var` paths.
    fn with_variable<T>(
        &self,
        path: &str,
        f: impl FnOnce(&netcdf::Variable) -> ContainerResult<T>,
    ) -> ContainerResult<T> {
        let (group_path, name) = split_path(path);
        let missing = || ContainerError::missing(format!("variable '{}'", path));

        let Some(group_path) = group_path else {
            let var = self.file.variable(name).ok_or_else(missing)?;
            return f(&var);
        };

        // Wind products nest arrays at most one group deep
        let group = self.file.group(group_path)?.ok_or_else(missing)?;
        let var = group.variable(name).ok_or_else(missing)?;
        f(&var)
    }
}

impl Container for NetCdfContainer {
    fn kind(&self) -> ContainerKind {
        ContainerKind::NetCdf
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn attributes(&self) -> ContainerResult<Attributes> {
        let mut attrs = Attributes::new();
        for attr in self.file.attributes() {
            let value = attr.value()?;
            attrs.insert(attr.name().to_string(), convert_attribute(value));
        }
        Ok(attrs)
    }

    fn attribute(&self, name: &str) -> ContainerResult<Option<AttrValue>> {
        match self.file.attribute(name) {
            Some(attr) => Ok(Some(convert_attribute(attr.value()?))),
            None => Ok(None),
        }
    }

    fn array_shape(&self, path: &str) -> ContainerResult<Vec<usize>> {
        self.with_variable(path, |var| Ok(variable_shape(var)))
    }

    fn read_array(&self, path: &str) -> ContainerResult<ArrayData> {
        self.with_variable(path, |var| {
            let shape = variable_shape(var);
            let raw: Vec<f64> = var.get_values::<f64, _>(..)?;
            let packing = MaskAndScale::from_lookup(|name| variable_attribute(var, name));
            packing.unpack(shape, raw)
        })
    }

    fn read_text(&self, path: &str) -> ContainerResult<TextArray> {
        self.with_variable(path, |var| {
            let shape = variable_shape(var);
            match var.vartype() {
                netcdf::types::NcVariableType::Char => {
                    let bytes = var.get_raw_values(..)?;
                    chars_to_text(&shape, &bytes)
                }
                netcdf::types::NcVariableType::String => {
                    let count = element_count(&shape);
                    let mut values = Vec::with_capacity(count);
                    for flat in 0..count {
                        let index = unravel(flat, &shape);
                        values.push(var.get_string(index.as_slice())?);
                    }
                    TextArray::new(shape, values)
                }
                other => Err(ContainerError::invalid(format!(
                    "variable '{}' holds {:?}, not text",
                    path, other
                ))),
            }
        })
    }

    fn array_attribute(&self, path: &str, name: &str) -> ContainerResult<Option<AttrValue>> {
        self.with_variable(path, |var| Ok(variable_attribute(var, name)))
    }

    fn groups(&self) -> ContainerResult<Vec<String>> {
        Ok(self.file.groups()?.map(|g| g.name()).collect())
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

fn variable_shape(var: &netcdf::Variable) -> Vec<usize> {
    var.dimensions().iter().map(|d| d.len()).collect()
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn variable_attribute(var: &netcdf::Variable, name: &str) -> Option<AttrValue> {
    if !has_attr(var, name) {
        return None;
    }
    let value = var.attribute_value(name)?.ok()?;
    Some(convert_attribute(value))
}

/// Map a libnetcdf attribute onto [`AttrValue`].
fn convert_attribute(value: AttributeValue) -> AttrValue {
    fn many<T: Into<f64>>(values: Vec<T>) -> AttrValue {
        AttrValue::from_numbers(values.into_iter().map(Into::into).collect())
    }

    match value {
        AttributeValue::Str(s) => AttrValue::Text(s.trim_end_matches('\0').to_string()),
        AttributeValue::Strs(v) => AttrValue::from_texts(
            v.into_iter()
                .map(|s| s.trim_end_matches('\0').to_string())
                .collect(),
        ),
        AttributeValue::Uchar(v) => AttrValue::Number(v.into()),
        AttributeValue::Schar(v) => AttrValue::Number(v.into()),
        AttributeValue::Ushort(v) => AttrValue::Number(v.into()),
        AttributeValue::Short(v) => AttrValue::Number(v.into()),
        AttributeValue::Uint(v) => AttrValue::Number(v.into()),
        AttributeValue::Int(v) => AttrValue::Number(v.into()),
        AttributeValue::Ulonglong(v) => AttrValue::Number(v as f64),
        AttributeValue::Longlong(v) => AttrValue::Number(v as f64),
        AttributeValue::Float(v) => AttrValue::Number(v.into()),
        AttributeValue::Double(v) => AttrValue::Number(v),
        AttributeValue::Uchars(v) => many(v),
        AttributeValue::Schars(v) => many(v),
        AttributeValue::Ushorts(v) => many(v),
        AttributeValue::Shorts(v) => many(v),
        AttributeValue::Uints(v) => many(v),
        AttributeValue::Ints(v) => many(v),
        AttributeValue::Ulonglongs(v) => {
            AttrValue::from_numbers(v.into_iter().map(|x| x as f64).collect())
        }
        AttributeValue::Longlongs(v) => {
            AttrValue::from_numbers(v.into_iter().map(|x| x as f64).collect())
        }
        AttributeValue::Floats(v) => many(v),
        AttributeValue::Doubles(v) => AttrValue::from_numbers(v),
    }
}
