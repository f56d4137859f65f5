//! In-memory containers.
//!
//! `MemoryContainer` holds attributes and arrays in plain maps and behaves
//! like a file-backed container of the chosen kind. Tests use it to build
//! synthetic wind products without touching libnetcdf or HDF5.
//!
//! Builders never fail. An array whose values do not fill its shape is kept
//! as a broken entry and reported as [`ContainerError::InvalidFormat`] when
//! it is read, the way a corrupt variable in a real file would be.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{ContainerError, ContainerResult};
use crate::value::{ArrayData, AttrValue, Attributes, TextArray};
use crate::{Container, ContainerKind, ContainerSource};

#[derive(Debug, Clone)]
enum Array {
    Numeric(ArrayData),
    Text(TextArray),
    /// Rejected at build time; the message is returned on every read.
    Broken(String),
}

impl Array {
    fn numeric(path: &str, result: ContainerResult<ArrayData>) -> Self {
        result.map_or_else(|e| Array::broken(path, e), Array::Numeric)
    }

    fn text(path: &str, result: ContainerResult<TextArray>) -> Self {
        result.map_or_else(|e| Array::broken(path, e), Array::Text)
    }

    fn broken(path: &str, error: ContainerError) -> Self {
        Array::Broken(format!("in-memory array '{}': {}", path, error))
    }

    fn shape(&self) -> ContainerResult<&[usize]> {
        match self {
            Array::Numeric(a) => Ok(&a.shape),
            Array::Text(t) => Ok(&t.shape),
            Array::Broken(msg) => Err(ContainerError::invalid(msg.clone())),
        }
    }
}

/// A container whose contents live in memory.
#[derive(Debug, Clone)]
pub struct MemoryContainer {
    kind: ContainerKind,
    path: PathBuf,
    attrs: Attributes,
    arrays: BTreeMap<String, Array>,
    array_attrs: BTreeMap<String, Attributes>,
}

impl MemoryContainer {
    pub fn new(kind: ContainerKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            attrs: Attributes::new(),
            arrays: BTreeMap::new(),
            array_attrs: BTreeMap::new(),
        }
    }

    /// Add a file-level attribute.
    pub fn with_attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    /// Add a numeric array with every element valid.
    pub fn with_array(self, path: &str, shape: &[usize], values: Vec<f64>) -> Self {
        self.with_masked_array(path, shape, values.into_iter().map(Some).collect())
    }

    /// Add a numeric array with explicit masking.
    pub fn with_masked_array(
        mut self,
        path: &str,
        shape: &[usize],
        values: Vec<Option<f64>>,
    ) -> Self {
        let array = Array::numeric(path, ArrayData::new(shape.to_vec(), values));
        self.arrays.insert(normalize(path).to_string(), array);
        self
    }

    /// Add a string array.
    pub fn with_text(mut self, path: &str, shape: &[usize], values: Vec<String>) -> Self {
        let array = Array::text(path, TextArray::new(shape.to_vec(), values));
        self.arrays.insert(normalize(path).to_string(), array);
        self
    }

    /// Attach an attribute to an array.
    pub fn with_array_attr(mut self, path: &str, name: &str, value: impl Into<AttrValue>) -> Self {
        self.array_attrs
            .entry(normalize(path).to_string())
            .or_default()
            .insert(name.to_string(), value.into());
        self
    }

    /// Remove an array, e.g. to simulate a truncated product.
    pub fn without_array(mut self, path: &str) -> Self {
        self.arrays.remove(normalize(path));
        self.array_attrs.remove(normalize(path));
        self
    }

    /// Remove a file-level attribute.
    pub fn without_attr(mut self, name: &str) -> Self {
        self.attrs.remove(name);
        self
    }

    fn array(&self, path: &str) -> ContainerResult<&Array> {
        self.arrays
            .get(normalize(path))
            .ok_or_else(|| ContainerError::missing(format!("array '{}'", path)))
    }
}

impl Container for MemoryContainer {
    fn kind(&self) -> ContainerKind {
        self.kind
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn attributes(&self) -> ContainerResult<Attributes> {
        Ok(self.attrs.clone())
    }

    fn attribute(&self, name: &str) -> ContainerResult<Option<AttrValue>> {
        Ok(self.attrs.get(name).cloned())
    }

    fn array_shape(&self, path: &str) -> ContainerResult<Vec<usize>> {
        Ok(self.array(path)?.shape()?.to_vec())
    }

    fn read_array(&self, path: &str) -> ContainerResult<ArrayData> {
        match self.array(path)? {
            Array::Numeric(data) => Ok(data.clone()),
            Array::Text(_) => Err(ContainerError::invalid(format!(
                "array '{}' holds text, not numbers",
                path
            ))),
            Array::Broken(msg) => Err(ContainerError::invalid(msg.clone())),
        }
    }

    fn read_text(&self, path: &str) -> ContainerResult<TextArray> {
        match self.array(path)? {
            Array::Text(data) => Ok(data.clone()),
            Array::Numeric(_) => Err(ContainerError::invalid(format!(
                "array '{}' holds numbers, not text",
                path
            ))),
            Array::Broken(msg) => Err(ContainerError::invalid(msg.clone())),
        }
    }

    fn array_attribute(&self, path: &str, name: &str) -> ContainerResult<Option<AttrValue>> {
        self.array(path)?;
        Ok(self
            .array_attrs
            .get(normalize(path))
            .and_then(|attrs| attrs.get(name))
            .cloned())
    }

    fn groups(&self) -> ContainerResult<Vec<String>> {
        let groups: BTreeSet<String> = self
            .arrays
            .keys()
            .filter_map(|p| p.split_once('/').map(|(g, _)| g.to_string()))
            .collect();
        Ok(groups.into_iter().collect())
    }
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches('/')
}

/// A [`ContainerSource`] that serves registered in-memory containers.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    containers: HashMap<PathBuf, MemoryContainer>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a container under its own path.
    pub fn insert(&mut self, container: MemoryContainer) {
        self.containers.insert(container.path.clone(), container);
    }

    /// Builder form of [`MemorySource::insert`].
    pub fn with(mut self, container: MemoryContainer) -> Self {
        self.insert(container);
        self
    }
}

impl ContainerSource for MemorySource {
    fn open(&self, path: &Path, kind: ContainerKind) -> ContainerResult<Box<dyn Container>> {
        let container = self.containers.get(path).ok_or_else(|| {
            ContainerError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no in-memory container at {}", path.display()),
            ))
        })?;

        if container.kind != kind {
            return Err(ContainerError::WrongKind {
                path: path.to_path_buf(),
                requested: kind,
            });
        }

        Ok(Box::new(container.clone()))
    }
}
