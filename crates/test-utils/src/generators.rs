//! Generators for synthetic swath data.
//!
//! Values are laid out row-major, matching how containers return arrays.

/// Latitude and longitude grids of a regular swath.
///
/// Latitude grows by `step` per row from `lat0`; longitude grows by `step`
/// per column from `lon0`.
///
/// # Example
///
/// ```
/// use test_utils::lat_lon_grid;
///
/// let (lat, lon) = lat_lon_grid(3, 3, 10.0, 100.0, 1.0);
/// assert_eq!(lat, vec![10.0, 10.0, 10.0, 11.0, 11.0, 11.0, 12.0, 12.0, 12.0]);
/// assert_eq!(lon[..3], [100.0, 101.0, 102.0]);
/// ```
pub fn lat_lon_grid(
    rows: usize,
    cols: usize,
    lat0: f64,
    lon0: f64,
    step: f64,
) -> (Vec<f64>, Vec<f64>) {
    let mut lat = Vec::with_capacity(rows * cols);
    let mut lon = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            lat.push(lat0 + row as f64 * step);
            lon.push(lon0 + col as f64 * step);
        }
    }
    (lat, lon)
}

/// One-dimensional axis `start, start + step, ...` of length `n`.
pub fn axis(n: usize, start: f64, step: f64) -> Vec<f64> {
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// `n` copies of `value`.
pub fn constant(n: usize, value: f64) -> Vec<f64> {
    vec![value; n]
}

/// Row-major cell index `row * cols + col` for every cell, as `f64`.
///
/// Handy for per-cell time offsets that identify their cell.
pub fn cell_index(rows: usize, cols: usize) -> Vec<f64> {
    (0..rows * cols).map(|i| i as f64).collect()
}

/// Replace the value of one cell in a row-major vector.
pub fn with_cell(
    mut values: Vec<f64>,
    cols: usize,
    row: usize,
    col: usize,
    value: f64,
) -> Vec<f64> {
    values[row * cols + col] = value;
    values
}
