//! Spatial indexing over 2D geolocation grids.

use serde::Serialize;

use crate::types::{GeoBox, Grid};

/// Inclusive index rectangle `rows × cols` inside a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexBounds {
    pub row_min: usize,
    pub row_max: usize,
    pub col_min: usize,
    pub col_max: usize,
}

impl IndexBounds {
    /// `(rows, cols)` covered by the bounds.
    pub fn shape(&self) -> (usize, usize) {
        (
            self.row_max - self.row_min + 1,
            self.col_max - self.col_min + 1,
        )
    }

    /// Grow the bounds to include a cell.
    fn include(&mut self, row: usize, col: usize) {
        self.row_min = self.row_min.min(row);
        self.row_max = self.row_max.max(row);
        self.col_min = self.col_min.min(col);
        self.col_max = self.col_max.max(col);
    }
}

/// Tightest index rectangle around every cell whose position lies in the box.
///
/// Returns `None` when no cell is inside. Cells with NaN coordinates never
/// match. Cells missing from `lon` are skipped.
pub fn compute_bounds(
    lat: &Grid<f64>,
    lon: &Grid<f64>,
    geo_box: &GeoBox,
) -> Option<IndexBounds> {
    let mut bounds: Option<IndexBounds> = None;
    for ((row, col), &la) in lat.indexed_iter() {
        let Some(&lo) = lon.get(row, col) else {
            continue;
        };
        if !geo_box.contains(la, lo) {
            continue;
        }
        match bounds.as_mut() {
            Some(b) => b.include(row, col),
            None => {
                bounds = Some(IndexBounds {
                    row_min: row,
                    row_max: row,
                    col_min: col,
                    col_max: col,
                })
            }
        }
    }
    bounds
}

/// Starting distance for the nearest-cell search, in degrees.
const NO_CELL_DISTANCE: f64 = 1000.0;

/// Cell inside the box that is closest to the box centre.
///
/// Cells are visited in row-major order and a candidate replaces the current
/// best when its Euclidean degree distance is less than or equal to it, so
/// the last of several equally close cells wins. Cells farther than 1000
/// degrees from the centre are never chosen.
pub fn nearest_cell(
    lat: &Grid<f64>,
    lon: &Grid<f64>,
    geo_box: &GeoBox,
) -> Option<(usize, usize)> {
    let (lat_c, lon_c) = geo_box.center();
    let mut best = None;
    let mut best_dist = NO_CELL_DISTANCE;

    for ((row, col), &la) in lat.indexed_iter() {
        let Some(&lo) = lon.get(row, col) else {
            continue;
        };
        if !geo_box.contains(la, lo) {
            continue;
        }
        let dist = ((lo - lon_c).powi(2) + (la - lat_c).powi(2)).sqrt();
        if dist <= best_dist {
            best_dist = dist;
            best = Some((row, col));
        }
    }
    best
}
