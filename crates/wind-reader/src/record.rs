//! The common wind record every decoder produces.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{DecodeError, DecodeResult};
use crate::index::IndexBounds;
use crate::registry::FormatId;
use crate::types::{Grid, MaskedGrid};

/// Optional UTC timestamp; `None` where the product has no valid time.
pub type ObsTime = Option<DateTime<Utc>>;

/// Wind direction decomposed into components, in knots.
///
/// `v = speed·sin(dir)` and `h = speed·cos(dir)`.
#[derive(Debug, Clone, PartialEq)]
pub struct WindComponents {
    pub v: MaskedGrid,
    pub h: MaskedGrid,
}

/// Observation times, either per cell or per swath row.
#[derive(Debug, Clone, PartialEq)]
pub enum ObsTimes {
    PerCell(Grid<ObsTime>),
    PerRow(Vec<ObsTime>),
}

impl ObsTimes {
    /// Time of the cell at `(row, col)`. Out-of-range lookups yield `None`.
    pub fn at(&self, row: usize, col: usize) -> ObsTime {
        match self {
            ObsTimes::PerCell(grid) => grid.get(row, col).copied().flatten(),
            ObsTimes::PerRow(rows) => rows.get(row).copied().flatten(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ObsTimes::PerCell(grid) => grid.len(),
            ObsTimes::PerRow(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Earliest and latest valid time.
    pub fn range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let times: Box<dyn Iterator<Item = &ObsTime>> = match self {
            ObsTimes::PerCell(grid) => Box::new(grid.iter()),
            ObsTimes::PerRow(rows) => Box::new(rows.iter()),
        };
        times.flatten().fold(None, |acc, &t| match acc {
            None => Some((t, t)),
            Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
        })
    }

    fn crop(&self, bounds: &IndexBounds) -> ObsTimes {
        match self {
            ObsTimes::PerCell(grid) => ObsTimes::PerCell(grid.crop(
                bounds.row_min,
                bounds.row_max,
                bounds.col_min,
                bounds.col_max,
            )),
            ObsTimes::PerRow(rows) => {
                let end = (bounds.row_max + 1).min(rows.len());
                let start = bounds.row_min.min(end);
                ObsTimes::PerRow(rows[start..end].to_vec())
            }
        }
    }

    fn cleared(&self) -> ObsTimes {
        match self {
            ObsTimes::PerCell(_) => ObsTimes::PerCell(Grid::empty()),
            ObsTimes::PerRow(_) => ObsTimes::PerRow(Vec::new()),
        }
    }
}

/// Decoded arrays of one product, before they are checked and wrapped into a
/// [`WindRecord`].
#[derive(Debug, Clone)]
pub struct WindFields {
    pub longitude: Grid<f64>,
    pub latitude: Grid<f64>,
    /// Knots
    pub wind_speed: MaskedGrid,
    pub wind_dir: WindComponents,
    pub wvc_time: ObsTimes,
}

/// Descriptive metadata attached to a loaded record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordMetadata {
    pub format: FormatId,
    pub platform_name: String,
    /// Always ends in `KM`
    pub resolution: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub sub_band: Option<String>,
}

/// Normalized wind observations of one file.
///
/// Longitude, latitude, speed and both direction components always share
/// one shape.
#[derive(Debug, Clone)]
pub struct WindRecord {
    longitude: Grid<f64>,
    latitude: Grid<f64>,
    wind_speed: MaskedGrid,
    wind_dir: WindComponents,
    wvc_time: ObsTimes,
    metadata: RecordMetadata,
}

impl WindRecord {
    /// Check the field shapes and build a record.
    pub fn new(fields: WindFields, metadata: RecordMetadata) -> DecodeResult<Self> {
        let expected = fields.wind_speed.shape();
        let others = [
            ("longitude", fields.longitude.shape()),
            ("latitude", fields.latitude.shape()),
            ("wind_dir.v", fields.wind_dir.v.shape()),
            ("wind_dir.h", fields.wind_dir.h.shape()),
        ];
        for (name, shape) in others {
            if shape != expected {
                return Err(shape_error("wind_speed", expected, name, shape));
            }
        }

        Ok(Self {
            longitude: fields.longitude,
            latitude: fields.latitude,
            wind_speed: fields.wind_speed,
            wind_dir: fields.wind_dir,
            wvc_time: fields.wvc_time,
            metadata,
        })
    }

    pub fn longitude(&self) -> &Grid<f64> {
        &self.longitude
    }

    pub fn latitude(&self) -> &Grid<f64> {
        &self.latitude
    }

    /// Wind speed in knots.
    pub fn wind_speed(&self) -> &MaskedGrid {
        &self.wind_speed
    }

    pub fn wind_dir(&self) -> &WindComponents {
        &self.wind_dir
    }

    pub fn wvc_time(&self) -> &ObsTimes {
        &self.wvc_time
    }

    pub fn metadata(&self) -> &RecordMetadata {
        &self.metadata
    }

    /// `(rows, cols)` shared by all grids.
    pub fn shape(&self) -> (usize, usize) {
        self.wind_speed.shape()
    }

    /// True for a record with no cells, e.g. after cropping to an empty box.
    pub fn is_empty(&self) -> bool {
        self.wind_speed.is_empty()
    }

    /// Number of cells with a valid wind speed.
    pub fn valid_count(&self) -> usize {
        self.wind_speed.valid_count()
    }

    /// Strongest valid wind in knots.
    pub fn max_speed(&self) -> Option<f64> {
        self.wind_speed.max_valid()
    }

    /// Shift negative longitudes by 360 degrees. Returns the number changed.
    pub(crate) fn normalize_longitudes(&mut self) -> usize {
        let mut changed = 0;
        for lon in self.longitude.iter_mut() {
            if *lon < 0.0 {
                *lon += 360.0;
                changed += 1;
            }
        }
        changed
    }

    /// Restrict every field to `bounds`, or clear the record when `None`.
    pub(crate) fn crop_to(&mut self, bounds: Option<&IndexBounds>) {
        match bounds {
            Some(b) => {
                let (r0, r1, c0, c1) = (b.row_min, b.row_max, b.col_min, b.col_max);
                self.longitude = self.longitude.crop(r0, r1, c0, c1);
                self.latitude = self.latitude.crop(r0, r1, c0, c1);
                self.wind_speed = self.wind_speed.crop(r0, r1, c0, c1);
                self.wind_dir = WindComponents {
                    v: self.wind_dir.v.crop(r0, r1, c0, c1),
                    h: self.wind_dir.h.crop(r0, r1, c0, c1),
                };
                self.wvc_time = self.wvc_time.crop(b);
            }
            None => {
                self.longitude = Grid::empty();
                self.latitude = Grid::empty();
                self.wind_speed = Grid::empty();
                self.wind_dir = WindComponents {
                    v: Grid::empty(),
                    h: Grid::empty(),
                };
                self.wvc_time = self.wvc_time.cleared();
            }
        }
    }

    /// Compact description for logs and reports.
    pub fn summary(&self) -> WindSummary {
        WindSummary {
            format: self.metadata.format,
            platform_name: self.metadata.platform_name.clone(),
            resolution: self.metadata.resolution.clone(),
            sub_band: self.metadata.sub_band.clone(),
            start_time: self.metadata.start_time,
            end_time: self.metadata.end_time,
            observed_range: self.wvc_time.range(),
            rows: self.shape().0,
            cols: self.shape().1,
            valid_cells: self.valid_count(),
            max_speed_knots: self.max_speed(),
        }
    }
}

fn shape_error(
    left: &str,
    left_shape: (usize, usize),
    right: &str,
    right_shape: (usize, usize),
) -> DecodeError {
    DecodeError::shape_mismatch(
        left,
        &[left_shape.0, left_shape.1],
        right,
        &[right_shape.0, right_shape.1],
    )
}

/// Serializable overview of a loaded record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindSummary {
    pub format: FormatId,
    pub platform_name: String,
    pub resolution: String,
    pub sub_band: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Earliest and latest cell time still in the record.
    pub observed_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub rows: usize,
    pub cols: usize,
    pub valid_cells: usize,
    pub max_speed_knots: Option<f64>,
}
