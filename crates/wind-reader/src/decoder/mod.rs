//! Instrument decoders.
//!
//! Each decoder wraps one open container and knows how a single instrument
//! family lays out its wind fields:
//!
//! ```text
//! ┌────────────────┬─────────────┬──────────────────────────────────┐
//! │ Decoder        │ Container   │ Family                           │
//! ├────────────────┼─────────────┼──────────────────────────────────┤
//! │ SwathDecoder   │ NetCDF      │ ASCAT, OSCAT (1990 epoch swaths) │
//! │ CfosatDecoder  │ NetCDF      │ CSCAT (ISO row times)            │
//! │ HscatDecoder   │ HDF5        │ HSCAT (packed i16, row times)    │
//! │ WindRadDecoder │ HDF5        │ WindRAD (four sub-bands)         │
//! └────────────────┴─────────────┴──────────────────────────────────┘
//! ```
//!
//! Decoders are stateless beyond their container. Loading, cropping and
//! time lookup live in [`crate::WindReader`].

mod cfosat;
mod hscat;
mod swath;
mod windrad;

pub use cfosat::CfosatDecoder;
pub use hscat::HscatDecoder;
pub use swath::SwathDecoder;
pub use windrad::{WindRadDecoder, WINDRAD_BANDS};

use chrono::{DateTime, Utc};
use wind_container::{AttrValue, Attributes, Container};

use crate::convert::{parse_utc, to_knots, wind_components, ScaleOffset};
use crate::error::{DecodeError, DecodeResult, ReaderError};
use crate::record::{ObsTime, ObsTimes, WindComponents, WindFields};
use crate::registry::FormatId;
use crate::types::{Grid, MaskedGrid};

/// Decoding interface implemented by every instrument family.
pub trait WindDecoder {
    fn format(&self) -> FormatId;

    fn container(&self) -> &dyn Container;

    /// File-level attributes as the family presents them.
    fn attributes(&self) -> DecodeResult<Attributes> {
        Ok(self.container().attributes()?)
    }

    /// Selectable sub-bands. Empty for single-band families.
    fn sub_bands(&self) -> &'static [&'static str] {
        &[]
    }

    fn platform_name(&self, band: Option<&str>) -> DecodeResult<String>;

    /// Nominal cell size, always ending in `KM`.
    fn resolution(&self, band: Option<&str>) -> DecodeResult<String>;

    fn start_time(&self) -> DecodeResult<DateTime<Utc>>;

    fn end_time(&self) -> DecodeResult<DateTime<Utc>>;

    /// Read and convert the wind fields. `band` has already been validated
    /// against [`WindDecoder::sub_bands`].
    fn decode(&self, band: Option<&str>, qc: bool) -> DecodeResult<WindFields>;
}

// =============================================================================
// Signature helpers
// =============================================================================

/// Read the attribute a signature check discriminates on.
///
/// A missing attribute is a decode failure rather than a mismatch, so the
/// registry reports it.
pub(crate) fn signature_text(
    container: &dyn Container,
    format: FormatId,
    name: &str,
) -> Result<String, ReaderError> {
    let wrap = |source: DecodeError| ReaderError::Decode {
        format,
        path: container.path().to_path_buf(),
        source,
    };
    text_attr(container, name).map_err(wrap)
}

pub(crate) fn mismatch(format: FormatId, detail: impl Into<String>) -> ReaderError {
    ReaderError::SignatureMismatch {
        format,
        detail: detail.into(),
    }
}

// =============================================================================
// Attribute helpers
// =============================================================================

/// Required text attribute. String arrays yield their last element.
pub(crate) fn text_attr(container: &dyn Container, name: &str) -> DecodeResult<String> {
    let value = container
        .attribute(name)?
        .ok_or_else(|| DecodeError::missing_attribute(name))?;
    attr_to_text(name, &value)
}

pub(crate) fn attr_to_text(name: &str, value: &AttrValue) -> DecodeResult<String> {
    value
        .last_text()
        .map(str::to_string)
        .ok_or_else(|| DecodeError::invalid_attribute(name, format!("expected text, got {}", value)))
}

/// Required numeric attribute. Numeric text is accepted.
pub(crate) fn number_attr(container: &dyn Container, name: &str) -> DecodeResult<f64> {
    let value = container
        .attribute(name)?
        .ok_or_else(|| DecodeError::missing_attribute(name))?;
    value
        .as_f64()
        .ok_or_else(|| DecodeError::invalid_attribute(name, format!("expected a number, got {}", value)))
}

/// Required timestamp built from one or more text attributes joined by spaces.
pub(crate) fn time_attr(
    container: &dyn Container,
    names: &[&str],
    format: &str,
) -> DecodeResult<DateTime<Utc>> {
    let parts = names
        .iter()
        .map(|name| text_attr(container, name))
        .collect::<DecodeResult<Vec<_>>>()?;
    let text = parts.join(" ");
    parse_utc(&text, format).ok_or_else(|| {
        DecodeError::invalid_attribute(
            names.join("+"),
            format!("'{}' does not match {}", text, format),
        )
    })
}

/// Required numeric attribute of an array.
pub(crate) fn array_number_attr(
    container: &dyn Container,
    path: &str,
    name: &str,
) -> DecodeResult<f64> {
    let qualified = || format!("{}@{}", path, name);
    let value = container
        .array_attribute(path, name)?
        .ok_or_else(|| DecodeError::missing_attribute(qualified()))?;
    value.as_f64().ok_or_else(|| {
        DecodeError::invalid_attribute(qualified(), format!("expected a number, got {}", value))
    })
}

/// Linear packing read from an array's attributes.
pub(crate) fn packing(
    container: &dyn Container,
    path: &str,
    scale_name: &str,
    offset_name: &str,
) -> DecodeResult<ScaleOffset> {
    Ok(ScaleOffset::new(
        array_number_attr(container, path, scale_name)?,
        array_number_attr(container, path, offset_name)?,
    ))
}

// =============================================================================
// Array helpers
// =============================================================================

/// Read a numeric array as a 2D grid.
pub(crate) fn read_grid(container: &dyn Container, path: &str) -> DecodeResult<MaskedGrid> {
    let data = container.read_array(path)?;
    let shape = data.shape.clone();
    Grid::from_shape(&shape, data.values).ok_or(DecodeError::InvalidShape {
        name: path.to_string(),
        shape,
    })
}

/// Read packed raw values, masking `sentinel` and applying the packing.
pub(crate) fn read_packed(
    container: &dyn Container,
    path: &str,
    sentinel: f64,
    packing: ScaleOffset,
) -> DecodeResult<MaskedGrid> {
    let raw = read_grid(container, path)?;
    Ok(raw.map(|v| v.filter(|&r| r != sentinel).map(|r| packing.apply(r))))
}

/// Read latitude and longitude grids. Masked positions become NaN and never
/// match a box. One-dimensional axes are expanded to a mesh with one row per
/// latitude and one column per longitude.
pub(crate) fn read_geolocation(
    container: &dyn Container,
    lat_path: &str,
    lon_path: &str,
) -> DecodeResult<(Grid<f64>, Grid<f64>)> {
    let lat = container.read_array(lat_path)?;
    let lon = container.read_array(lon_path)?;

    let to_plain = |values: Vec<Option<f64>>| -> Vec<f64> {
        values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
    };

    if lat.ndim() == 1 && lon.ndim() == 1 {
        let lats = to_plain(lat.values);
        let lons = to_plain(lon.values);
        let rows = lats.len();
        let cols = lons.len();
        let lat_mesh = lats
            .iter()
            .flat_map(|&la| std::iter::repeat(la).take(cols))
            .collect();
        let lon_mesh = (0..rows).flat_map(|_| lons.iter().copied()).collect();
        let lat_grid = Grid::from_vec(rows, cols, lat_mesh);
        let lon_grid = Grid::from_vec(rows, cols, lon_mesh);
        return match (lat_grid, lon_grid) {
            (Some(la), Some(lo)) => Ok((la, lo)),
            _ => Err(DecodeError::InvalidShape {
                name: lat_path.to_string(),
                shape: vec![rows, cols],
            }),
        };
    }

    let lat_shape = lat.shape.clone();
    let lon_shape = lon.shape.clone();
    let lat_grid = Grid::from_shape(&lat_shape, to_plain(lat.values)).ok_or(
        DecodeError::InvalidShape {
            name: lat_path.to_string(),
            shape: lat_shape,
        },
    )?;
    let lon_grid = Grid::from_shape(&lon_shape, to_plain(lon.values)).ok_or(
        DecodeError::InvalidShape {
            name: lon_path.to_string(),
            shape: lon_shape,
        },
    )?;
    Ok((lat_grid, lon_grid))
}

/// Arrange per-element times as rows (1D source) or cells (2D source).
pub(crate) fn arrange_times(
    path: &str,
    shape: &[usize],
    times: Vec<ObsTime>,
) -> DecodeResult<ObsTimes> {
    if shape.len() <= 1 {
        return Ok(ObsTimes::PerRow(times));
    }
    Grid::from_shape(shape, times)
        .map(ObsTimes::PerCell)
        .ok_or_else(|| DecodeError::InvalidShape {
            name: path.to_string(),
            shape: shape.to_vec(),
        })
}

/// Parse a text array of timestamps. Unparsable entries become `None`.
pub(crate) fn read_text_times(
    container: &dyn Container,
    path: &str,
    format: &str,
) -> DecodeResult<ObsTimes> {
    let text = container.read_text(path)?;
    let times = text.values.iter().map(|t| parse_utc(t, format)).collect();
    arrange_times(path, &text.shape, times)
}

// =============================================================================
// Wind helpers
// =============================================================================

/// Convert speed in m/s and direction in degrees to knots and components.
///
/// A cell masked in either input is masked in both components.
pub(crate) fn polar_to_wind(
    speed_ms: &MaskedGrid,
    dir_deg: &MaskedGrid,
) -> DecodeResult<(MaskedGrid, WindComponents)> {
    let speed = speed_ms.map(|v| v.map(to_knots));
    let components = speed
        .zip_map(dir_deg, |s, d| match (s, d) {
            (Some(s), Some(d)) => Some(wind_components(*s, *d)),
            _ => None,
        })
        .ok_or_else(|| {
            let (sr, sc) = speed_ms.shape();
            let (dr, dc) = dir_deg.shape();
            DecodeError::shape_mismatch("wind speed", &[sr, sc], "wind direction", &[dr, dc])
        })?;

    let wind_dir = WindComponents {
        v: components.map(|c| c.map(|(v, _)| v)),
        h: components.map(|c| c.map(|(_, h)| h)),
    };
    Ok((speed, wind_dir))
}

/// Mask every cell whose QC flag is masked or rejected by `keep`.
pub(crate) fn apply_qc(
    speed: &mut MaskedGrid,
    wind_dir: &mut WindComponents,
    flags: &MaskedGrid,
    keep: impl Fn(f64) -> bool,
) -> DecodeResult<usize> {
    if flags.shape() != speed.shape() {
        let (fr, fc) = flags.shape();
        let (sr, sc) = speed.shape();
        return Err(DecodeError::shape_mismatch(
            "wvc_quality_flag",
            &[fr, fc],
            "wind speed",
            &[sr, sc],
        ));
    }

    let rejected: Vec<bool> = flags
        .iter()
        .map(|f| !f.map(&keep).unwrap_or(false))
        .collect();

    for grid in [speed, &mut wind_dir.v, &mut wind_dir.h] {
        for (value, &reject) in grid.iter_mut().zip(&rejected) {
            if reject {
                *value = None;
            }
        }
    }
    Ok(rejected.iter().filter(|&&r| r).count())
}
