//! Backend-neutral values returned by containers.
//!
//! Both container kinds report attributes as [`AttrValue`] and numeric arrays
//! as [`ArrayData`], so decoders never touch libnetcdf or HDF5 types.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ContainerError, ContainerResult};

/// Flat mapping of attribute name to value.
pub type Attributes = BTreeMap<String, AttrValue>;

/// A scalar or array attribute value.
///
/// Single-element arrays are collapsed to their scalar form when read, so a
/// one-element string array and a plain string attribute look the same.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Texts(Vec<String>),
    Number(f64),
    Numbers(Vec<f64>),
}

impl AttrValue {
    /// Build a text value, collapsing a single element to a scalar.
    pub fn from_texts(mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            Self::Text(values.remove(0))
        } else {
            Self::Texts(values)
        }
    }

    /// Build a numeric value, collapsing a single element to a scalar.
    pub fn from_numbers(values: Vec<f64>) -> Self {
        if values.len() == 1 {
            Self::Number(values[0])
        } else {
            Self::Numbers(values)
        }
    }

    /// The value as text, if it is a scalar string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The last string of a string attribute.
    ///
    /// Some HDF producers store every global attribute as a short string
    /// array where only the final element carries the value.
    pub fn last_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Texts(v) => v.last().map(String::as_str),
            _ => None,
        }
    }

    /// The value as a number. Numeric text is parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Numbers(v) if v.len() == 1 => Some(v[0]),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Texts(v) => write!(f, "{}", v.join(", ")),
            Self::Number(v) => write!(f, "{}", v),
            Self::Numbers(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(v: Vec<String>) -> Self {
        Self::from_texts(v)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(v: Vec<f64>) -> Self {
        Self::from_numbers(v)
    }
}

/// A numeric array read from a container.
///
/// Values are widened to `f64`; `None` marks an element the container
/// considers invalid (fill value or outside the valid range).
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayData {
    pub shape: Vec<usize>,
    pub values: Vec<Option<f64>>,
}

impl ArrayData {
    /// Create an array, checking that the values fill the shape.
    pub fn new(shape: Vec<usize>, values: Vec<Option<f64>>) -> ContainerResult<Self> {
        let expected = element_count(&shape);
        if values.len() != expected {
            return Err(ContainerError::invalid(format!(
                "array of shape {:?} needs {} values, got {}",
                shape,
                expected,
                values.len()
            )));
        }
        Ok(Self { shape, values })
    }

    /// Create an array where every element is valid.
    pub fn from_raw(shape: Vec<usize>, raw: Vec<f64>) -> ContainerResult<Self> {
        Self::new(shape, raw.into_iter().map(Some).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }
}

/// A string array read from a container.
#[derive(Debug, Clone, PartialEq)]
pub struct TextArray {
    pub shape: Vec<usize>,
    pub values: Vec<String>,
}

impl TextArray {
    /// Create a string array, checking that the values fill the shape.
    pub fn new(shape: Vec<usize>, values: Vec<String>) -> ContainerResult<Self> {
        let expected = element_count(&shape);
        if values.len() != expected {
            return Err(ContainerError::invalid(format!(
                "text array of shape {:?} needs {} values, got {}",
                shape,
                expected,
                values.len()
            )));
        }
        Ok(Self { shape, values })
    }
}

/// CF-style packing attributes of a variable.
///
/// Reading through [`MaskAndScale::unpack`] masks fill values, missing values
/// and out-of-range packed values, then applies `scale_factor` and
/// `add_offset`, which is how NetCDF variables are conventionally consumed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaskAndScale {
    pub fill_value: Option<f64>,
    pub missing_values: Vec<f64>,
    pub valid_min: Option<f64>,
    pub valid_max: Option<f64>,
    pub scale_factor: Option<f64>,
    pub add_offset: Option<f64>,
}

impl MaskAndScale {
    /// Collect packing attributes from a variable's attribute lookup.
    pub fn from_lookup(mut lookup: impl FnMut(&str) -> Option<AttrValue>) -> Self {
        let numbers = |value: Option<AttrValue>| -> Vec<f64> {
            match value {
                Some(AttrValue::Number(v)) => vec![v],
                Some(AttrValue::Numbers(v)) => v,
                _ => Vec::new(),
            }
        };

        let mut packing = Self {
            fill_value: lookup("_FillValue").and_then(|v| v.as_f64()),
            missing_values: numbers(lookup("missing_value")),
            valid_min: lookup("valid_min").and_then(|v| v.as_f64()),
            valid_max: lookup("valid_max").and_then(|v| v.as_f64()),
            scale_factor: lookup("scale_factor").and_then(|v| v.as_f64()),
            add_offset: lookup("add_offset").and_then(|v| v.as_f64()),
        };

        // valid_range overrides valid_min/valid_max
        let range = numbers(lookup("valid_range"));
        if range.len() == 2 {
            packing.valid_min = Some(range[0]);
            packing.valid_max = Some(range[1]);
        }

        packing
    }

    /// Whether a packed value is invalid.
    pub fn is_masked(&self, raw: f64) -> bool {
        if raw.is_nan() {
            return true;
        }
        if self.fill_value == Some(raw) {
            return true;
        }
        if self.missing_values.iter().any(|&m| m == raw) {
            return true;
        }
        if let Some(min) = self.valid_min {
            if raw < min {
                return true;
            }
        }
        if let Some(max) = self.valid_max {
            if raw > max {
                return true;
            }
        }
        false
    }

    /// Mask and unpack raw values into an [`ArrayData`].
    pub fn unpack(&self, shape: Vec<usize>, raw: Vec<f64>) -> ContainerResult<ArrayData> {
        let scale = self.scale_factor.unwrap_or(1.0);
        let offset = self.add_offset.unwrap_or(0.0);
        let values = raw
            .into_iter()
            .map(|v| {
                if self.is_masked(v) {
                    None
                } else {
                    Some(v * scale + offset)
                }
            })
            .collect();
        ArrayData::new(shape, values)
    }
}

/// Number of elements in an array of the given shape (1 for scalars).
pub fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Convert a flat row-major index into a multi-dimensional index.
pub fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (slot, &dim) in index.iter_mut().zip(shape).rev() {
        if dim == 0 {
            continue;
        }
        *slot = flat % dim;
        flat /= dim;
    }
    index
}

/// Decode stored string bytes to text, dropping NUL padding.
pub fn decode_text(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map(|p| p + 1)
        .unwrap_or(0);
    let trimmed = &bytes[..end];
    // Embedded NULs terminate C strings
    let trimmed = match trimmed.iter().position(|&b| b == 0) {
        Some(p) => &trimmed[..p],
        None => trimmed,
    };
    String::from_utf8_lossy(trimmed).into_owned()
}

/// Split a buffer of fixed-width string elements into strings.
pub fn split_fixed(bytes: &[u8], width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }
    bytes.chunks(width).map(decode_text).collect()
}

/// Turn a character matrix (last axis = characters) into a string array.
pub fn chars_to_text(shape: &[usize], bytes: &[u8]) -> ContainerResult<TextArray> {
    let Some((&width, outer)) = shape.split_last() else {
        return Err(ContainerError::invalid("character array has no dimensions"));
    };
    if bytes.len() != element_count(shape) {
        return Err(ContainerError::invalid(format!(
            "character array of shape {:?} has {} bytes",
            shape,
            bytes.len()
        )));
    }
    let values = if outer.is_empty() {
        vec![decode_text(bytes)]
    } else {
        split_fixed(bytes, width)
    };
    let outer_shape = if outer.is_empty() {
        Vec::new()
    } else {
        outer.to_vec()
    };
    TextArray::new(outer_shape, values)
}
