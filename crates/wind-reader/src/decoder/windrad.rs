//! FY-3 WindRAD level 2, four sub-bands per file.
//!
//! Each band is a group holding its own time, wind and geolocation arrays.
//! Packed arrays carry `Slope`/`Intercept` attributes. Daily gridded files
//! (`Projection Type` = `GLL`) hold a regular lat/lon grid instead of a swath.

use chrono::{DateTime, Utc};
use tracing::debug;
use wind_container::Container;

use super::{
    apply_qc, arrange_times, mismatch, packing, polar_to_wind, read_geolocation, read_grid,
    read_packed, signature_text, text_attr, time_attr, WindDecoder,
};
use crate::convert::{deny_any, from_j2000_noon, ScaleOffset};
use crate::error::{DecodeError, DecodeResult, ReaderError};
use crate::record::{ObsTimes, WindFields};
use crate::registry::FormatId;

/// Selectable sub-bands, in file order.
pub const WINDRAD_BANDS: &[&str] = &["C_band", "Dual_band", "Ku_band", "Ku_band_10km"];

/// Display names matching [`WINDRAD_BANDS`].
const BAND_NAMES: &[&str] = &["C Band", "Dual Band", "Ku Band", "Ku Band"];

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DAY_SENTINEL: f64 = 65535.0;
const MS_SENTINEL: f64 = 4294967295.0;
const WIND_SENTINEL: f64 = 32767.0;
const QC_BITS: u32 = 17;
/// Along-track rows of a 10 km swath.
const ROWS_10KM: usize = 2201;

pub struct WindRadDecoder {
    container: Box<dyn Container>,
}

impl WindRadDecoder {
    pub fn new(container: Box<dyn Container>) -> Result<Self, ReaderError> {
        Self::check_signature(container.as_ref())?;
        Ok(Self { container })
    }

    /// `Sensor Name` must be exactly `WindRAD`.
    pub fn check_signature(container: &dyn Container) -> Result<(), ReaderError> {
        let sensor = signature_text(container, FormatId::WindradHdf, "Sensor Name")?;
        if sensor == "WindRAD" {
            Ok(())
        } else {
            Err(mismatch(
                FormatId::WindradHdf,
                format!("sensor '{}' is not WindRAD", sensor),
            ))
        }
    }

    fn is_daily_grid(&self) -> DecodeResult<bool> {
        Ok(text_attr(self.container(), "Projection Type")? == "GLL")
    }

    fn read_times(&self, band: &str, daily: bool) -> DecodeResult<ObsTimes> {
        let c = self.container();
        let day_path = format!("{}/day_count", band);
        let ms_path = format!("{}/millisecond_count", band);

        // Day slope metadata is wrong in some daily products; days are whole
        // counts in every product, so only the intercept is honoured.
        let day_packing = packing(c, &day_path, "Slope", "Intercept")?;
        let day_packing = ScaleOffset {
            scale: 1.0,
            ..day_packing
        };
        let ms_packing = packing(c, &ms_path, "Slope", "Intercept")?;

        let days = c.read_array(&day_path)?;
        let ms = c.read_array(&ms_path)?;
        if days.shape != ms.shape {
            return Err(DecodeError::shape_mismatch(
                day_path, &days.shape, ms_path, &ms.shape,
            ));
        }

        let times = days
            .values
            .iter()
            .zip(&ms.values)
            .map(|(d, s)| {
                let (d, s) = ((*d)?, (*s)?);
                if !daily && (d == DAY_SENTINEL || s == MS_SENTINEL) {
                    return None;
                }
                from_j2000_noon(day_packing.apply(d), ms_packing.apply(s) * 1e-3)
            })
            .collect();
        arrange_times(&day_path, &days.shape, times)
    }
}

fn band_display_name(band: &str) -> Option<&'static str> {
    WINDRAD_BANDS
        .iter()
        .position(|b| *b == band)
        .map(|i| BAND_NAMES[i])
}

impl WindDecoder for WindRadDecoder {
    fn format(&self) -> FormatId {
        FormatId::WindradHdf
    }

    fn container(&self) -> &dyn Container {
        self.container.as_ref()
    }

    fn sub_bands(&self) -> &'static [&'static str] {
        WINDRAD_BANDS
    }

    fn platform_name(&self, band: Option<&str>) -> DecodeResult<String> {
        let c = self.container();
        let platform = format!(
            "{} {} Level 2",
            text_attr(c, "Satellite Name")?,
            text_attr(c, "Sensor Name")?
        );
        match band.and_then(band_display_name) {
            Some(name) => Ok(format!("{} {}", platform, name)),
            None => Ok(platform),
        }
    }

    fn resolution(&self, band: Option<&str>) -> DecodeResult<String> {
        if self.is_daily_grid()? {
            return Ok("25.0 KM (Daily)".to_string());
        }
        let band = band.ok_or(DecodeError::BandNotSelected("resolution"))?;
        let shape = self
            .container()
            .array_shape(&format!("{}/day_count", band))?;
        if shape.first() == Some(&ROWS_10KM) {
            Ok("10.0 KM".to_string())
        } else {
            Ok("20.0 KM".to_string())
        }
    }

    fn start_time(&self) -> DecodeResult<DateTime<Utc>> {
        time_attr(
            self.container(),
            &["Observing Beginning Date", "Observing Beginning Time"],
            TIME_FORMAT,
        )
    }

    fn end_time(&self) -> DecodeResult<DateTime<Utc>> {
        time_attr(
            self.container(),
            &["Observing Ending Date", "Observing Ending Time"],
            TIME_FORMAT,
        )
    }

    fn decode(&self, band: Option<&str>, qc: bool) -> DecodeResult<WindFields> {
        let band = band.ok_or(DecodeError::BandNotSelected("wind fields"))?;
        let c = self.container();
        let daily = self.is_daily_grid()?;
        let path = |name: &str| format!("{}/{}", band, name);

        let wvc_time = self.read_times(band, daily)?;

        let speed_path = path("wind_speed_selected");
        let dir_path = path("wind_dir_selected");
        let speed_packing = packing(c, &speed_path, "Slope", "Intercept")?;
        let dir_packing = packing(c, &dir_path, "Slope", "Intercept")?;
        let speed_ms = read_packed(c, &speed_path, WIND_SENTINEL, speed_packing)?;
        let dir = read_packed(c, &dir_path, WIND_SENTINEL, dir_packing)?;
        let (mut wind_speed, mut wind_dir) = polar_to_wind(&speed_ms, &dir)?;

        let (latitude, longitude) = if daily {
            read_geolocation(c, &path("grid_lat"), &path("grid_lon"))?
        } else {
            read_geolocation(c, &path("wvc_lat"), &path("wvc_lon"))?
        };

        // Daily grids have no per-cell quality flags
        if qc && !daily {
            let flags = read_grid(c, &path("wvc_quality_flag"))?;
            let masked = apply_qc(&mut wind_speed, &mut wind_dir, &flags, |f| {
                deny_any(f, QC_BITS)
            })?;
            debug!(format = %FormatId::WindradHdf, band, masked, "Applied QC flags");
        }

        Ok(WindFields {
            longitude,
            latitude,
            wind_speed,
            wind_dir,
            wvc_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_display_names() {
        assert_eq!(band_display_name("C_band"), Some("C Band"));
        assert_eq!(band_display_name("Ku_band_10km"), Some("Ku Band"));
        assert_eq!(band_display_name("X_band"), None);
    }
}
