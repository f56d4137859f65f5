//! Core types for wind reading.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReaderError;

/// A lat/lon box in degrees, edges inclusive.
///
/// Construction checks that all edges are finite and that each minimum is
/// not above its maximum, so every `GeoBox` in circulation is usable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct GeoBox {
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
}

impl GeoBox {
    /// Create a validated box.
    pub fn new(
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
    ) -> Result<Self, ReaderError> {
        let edges = [lat_min, lat_max, lon_min, lon_max];
        if edges.iter().any(|v| !v.is_finite()) {
            return Err(ReaderError::invalid_box(format!(
                "edges must be finite, got {:?}",
                edges
            )));
        }
        if lat_min > lat_max {
            return Err(ReaderError::invalid_box(format!(
                "lat_min {} > lat_max {}",
                lat_min, lat_max
            )));
        }
        if lon_min > lon_max {
            return Err(ReaderError::invalid_box(format!(
                "lon_min {} > lon_max {}",
                lon_min, lon_max
            )));
        }
        Ok(Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        })
    }

    /// The whole globe in 0..360 longitudes.
    pub fn global() -> Self {
        Self {
            lat_min: -90.0,
            lat_max: 90.0,
            lon_min: 0.0,
            lon_max: 360.0,
        }
    }

    /// Parse `latmin,latmax,lonmin,lonmax`.
    pub fn parse(s: &str) -> Result<Self, ReaderError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(ReaderError::invalid_box(format!(
                "expected latmin,latmax,lonmin,lonmax, got '{}'",
                s
            )));
        }

        let mut edges = [0.0; 4];
        for (edge, part) in edges.iter_mut().zip(&parts) {
            *edge = part
                .parse()
                .map_err(|_| ReaderError::invalid_box(format!("invalid number '{}'", part)))?;
        }
        Self::new(edges[0], edges[1], edges[2], edges[3])
    }

    pub fn lat_min(&self) -> f64 {
        self.lat_min
    }

    pub fn lat_max(&self) -> f64 {
        self.lat_max
    }

    pub fn lon_min(&self) -> f64 {
        self.lon_min
    }

    pub fn lon_max(&self) -> f64 {
        self.lon_max
    }

    /// Check if a point lies inside the box, edges included.
    ///
    /// NaN coordinates are never contained.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max && lon >= self.lon_min && lon <= self.lon_max
    }

    /// Centre point as `(lat, lon)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.lat_min + self.lat_max) / 2.0,
            (self.lon_min + self.lon_max) / 2.0,
        )
    }

    /// Exact bit pattern of the edges, usable as a hash key.
    pub fn cache_key(&self) -> [u64; 4] {
        [
            self.lat_min.to_bits(),
            self.lat_max.to_bits(),
            self.lon_min.to_bits(),
            self.lon_max.to_bits(),
        ]
    }
}

impl Default for GeoBox {
    fn default() -> Self {
        Self::global()
    }
}

impl fmt::Display for GeoBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.lat_min, self.lat_max, self.lon_min, self.lon_max
        )
    }
}

impl FromStr for GeoBox {
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<[f64; 4]> for GeoBox {
    type Error = ReaderError;

    fn try_from(v: [f64; 4]) -> Result<Self, Self::Error> {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<GeoBox> for [f64; 4] {
    fn from(b: GeoBox) -> Self {
        [b.lat_min, b.lat_max, b.lon_min, b.lon_max]
    }
}

/// A dense 2D array in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

/// Grid of optional values; `None` marks a masked cell.
pub type MaskedGrid = Grid<Option<f64>>;

impl<T> Grid<T> {
    /// Wrap row-major data. Returns `None` if the length does not match.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Option<Self> {
        if rows.checked_mul(cols)? != data.len() {
            return None;
        }
        Some(Self { rows, cols, data })
    }

    /// Wrap data with an n-dimensional shape.
    ///
    /// One-dimensional data becomes a single column. Shapes with more than
    /// two axes are accepted when every axis past the second has length 1.
    pub fn from_shape(shape: &[usize], data: Vec<T>) -> Option<Self> {
        match shape {
            [n] => Self::from_vec(*n, 1, data),
            [rows, cols] => Self::from_vec(*rows, *cols, data),
            [rows, cols, rest @ ..] if rest.iter().all(|&d| d == 1) => {
                Self::from_vec(*rows, *cols, data)
            }
            _ => None,
        }
    }

    /// A 0×0 grid.
    pub fn empty() -> Self {
        Self {
            rows: 0,
            cols: 0,
            data: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the value at a specific cell.
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col)
    }

    /// Row-major view of all values.
    pub fn values(&self) -> &[T] {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.data.iter_mut()
    }

    /// Iterate `((row, col), value)` in row-major order.
    pub fn indexed_iter(&self) -> impl Iterator<Item = ((usize, usize), &T)> {
        let cols = self.cols.max(1);
        self.data
            .iter()
            .enumerate()
            .map(move |(i, v)| ((i / cols, i % cols), v))
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Combine two grids of the same shape cell by cell.
    pub fn zip_map<U, V>(&self, other: &Grid<U>, mut f: impl FnMut(&T, &U) -> V) -> Option<Grid<V>> {
        if self.shape() != other.shape() {
            return None;
        }
        Some(Grid {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| f(a, b))
                .collect(),
        })
    }
}

impl<T: Clone> Grid<T> {
    /// A grid with every cell set to `value`.
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Copy out the sub-rectangle `rows × cols`, both ranges inclusive.
    ///
    /// Ranges are clamped to the grid.
    pub fn crop(&self, row_min: usize, row_max: usize, col_min: usize, col_max: usize) -> Self {
        if self.is_empty()
            || row_min > row_max
            || col_min > col_max
            || row_min >= self.rows
            || col_min >= self.cols
        {
            return Self::empty();
        }
        let row_max = row_max.min(self.rows - 1);
        let col_max = col_max.min(self.cols - 1);

        let cols = col_max - col_min + 1;
        let mut data = Vec::with_capacity((row_max - row_min + 1) * cols);
        for row in row_min..=row_max {
            let start = row * self.cols;
            data.extend_from_slice(&self.data[start + col_min..=start + col_max]);
        }
        Self {
            rows: row_max - row_min + 1,
            cols,
            data,
        }
    }
}

impl MaskedGrid {
    /// Number of unmasked cells.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_some()).count()
    }

    /// Largest unmasked value.
    pub fn max_valid(&self) -> Option<f64> {
        self.data.iter().flatten().copied().reduce(f64::max)
    }
}

/// Statistics about the bounds cache.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
