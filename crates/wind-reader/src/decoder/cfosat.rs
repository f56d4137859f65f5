//! CFOSAT scatterometer (CSCAT) level 2B.

use chrono::{DateTime, Utc};
use wind_container::Container;

use super::{
    mismatch, number_attr, polar_to_wind, read_geolocation, read_grid, read_text_times,
    text_attr, time_attr, WindDecoder,
};
use crate::error::{DecodeError, DecodeResult, ReaderError};
use crate::record::WindFields;
use crate::registry::FormatId;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub struct CfosatDecoder {
    container: Box<dyn Container>,
}

impl CfosatDecoder {
    pub fn new(container: Box<dyn Container>) -> Result<Self, ReaderError> {
        Self::check_signature(container.as_ref())?;
        Ok(Self { container })
    }

    /// The platform name must start with `CFOSAT`.
    pub fn check_signature(container: &dyn Container) -> Result<(), ReaderError> {
        let name = platform_name(container).map_err(|source| ReaderError::Decode {
            format: FormatId::CscatNc,
            path: container.path().to_path_buf(),
            source,
        })?;
        if name.starts_with("CFOSAT") {
            Ok(())
        } else {
            Err(mismatch(
                FormatId::CscatNc,
                format!("platform '{}' is not CFOSAT", name),
            ))
        }
    }
}

fn platform_name(container: &dyn Container) -> DecodeResult<String> {
    Ok(format!(
        "{} {} Level 2B",
        text_attr(container, "platform")?,
        text_attr(container, "sensor")?
    ))
}

/// Resolution in km from the longitude spacing in degrees, e.g. 0.125 → `12.0 KM`.
fn resolution_from_degrees(degrees: f64) -> String {
    format!("{:.1} KM", (degrees * 100.0).round_ties_even())
}

impl WindDecoder for CfosatDecoder {
    fn format(&self) -> FormatId {
        FormatId::CscatNc
    }

    fn container(&self) -> &dyn Container {
        self.container.as_ref()
    }

    fn platform_name(&self, _band: Option<&str>) -> DecodeResult<String> {
        platform_name(self.container())
    }

    fn resolution(&self, _band: Option<&str>) -> DecodeResult<String> {
        let degrees = number_attr(self.container(), "geospatial_lon_resolution")?;
        if !degrees.is_finite() {
            return Err(DecodeError::invalid_attribute(
                "geospatial_lon_resolution",
                "not a finite number",
            ));
        }
        Ok(resolution_from_degrees(degrees))
    }

    fn start_time(&self) -> DecodeResult<DateTime<Utc>> {
        time_attr(self.container(), &["time_coverage_start"], TIME_FORMAT)
    }

    fn end_time(&self) -> DecodeResult<DateTime<Utc>> {
        time_attr(self.container(), &["time_coverage_end"], TIME_FORMAT)
    }

    /// CSCAT products carry no QC flags; `qc` has no effect.
    fn decode(&self, _band: Option<&str>, _qc: bool) -> DecodeResult<WindFields> {
        let c = self.container();

        let wvc_time = read_text_times(c, "row_time", TIME_FORMAT)?;
        let speed_ms = read_grid(c, "wind_speed_selection")?;
        let dir = read_grid(c, "wind_dir_selection")?;
        let (wind_speed, wind_dir) = polar_to_wind(&speed_ms, &dir)?;
        let (latitude, longitude) = read_geolocation(c, "wvc_lat", "wvc_lon")?;

        Ok(WindFields {
            longitude,
            latitude,
            wind_speed,
            wind_dir,
            wvc_time,
        })
    }
}
