//! ASCAT and OSCAT level 2 swaths.

use chrono::{DateTime, Utc};
use tracing::debug;
use wind_container::Container;

use super::{
    apply_qc, arrange_times, mismatch, polar_to_wind, read_geolocation, read_grid,
    signature_text, text_attr, time_attr, WindDecoder,
};
use crate::convert::{deny_any, from_1990_seconds};
use crate::error::{DecodeResult, ReaderError};
use crate::record::WindFields;
use crate::registry::FormatId;

const SIGNATURE_ATTR: &str = "title_short_name";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const OSCAT_QC_BITS: u32 = 22;

/// Decoder for the 1990-epoch NetCDF swath products.
pub struct SwathDecoder {
    format: FormatId,
    container: Box<dyn Container>,
}

impl SwathDecoder {
    /// Wrap a container after checking its signature.
    pub fn new(format: FormatId, container: Box<dyn Container>) -> Result<Self, ReaderError> {
        Self::check_signature(format, container.as_ref())?;
        Ok(Self { format, container })
    }

    /// `title_short_name` must start with the instrument name.
    pub fn check_signature(format: FormatId, container: &dyn Container) -> Result<(), ReaderError> {
        let prefix = match format {
            FormatId::AscatNc => "ASCAT",
            FormatId::OscatNc => "OSCAT",
            other => return Err(mismatch(other, "not a swath format")),
        };
        let title = signature_text(container, format, SIGNATURE_ATTR)?;
        if title.starts_with(prefix) {
            Ok(())
        } else {
            Err(mismatch(
                format,
                format!("{} '{}' does not start with {}", SIGNATURE_ATTR, title, prefix),
            ))
        }
    }
}

impl WindDecoder for SwathDecoder {
    fn format(&self) -> FormatId {
        self.format
    }

    fn container(&self) -> &dyn Container {
        self.container.as_ref()
    }

    fn platform_name(&self, _band: Option<&str>) -> DecodeResult<String> {
        Ok(format!("{} Level 2", text_attr(self.container(), "source")?))
    }

    fn resolution(&self, _band: Option<&str>) -> DecodeResult<String> {
        Ok(text_attr(self.container(), "pixel_size_on_horizontal")?.to_uppercase())
    }

    fn start_time(&self) -> DecodeResult<DateTime<Utc>> {
        time_attr(self.container(), &["start_date", "start_time"], TIME_FORMAT)
    }

    fn end_time(&self) -> DecodeResult<DateTime<Utc>> {
        time_attr(self.container(), &["stop_date", "stop_time"], TIME_FORMAT)
    }

    fn decode(&self, _band: Option<&str>, qc: bool) -> DecodeResult<WindFields> {
        let c = self.container();

        let seconds = c.read_array("time")?;
        let times = seconds
            .values
            .iter()
            .map(|s| s.and_then(from_1990_seconds))
            .collect();
        let wvc_time = arrange_times("time", &seconds.shape, times)?;

        let speed_ms = read_grid(c, "wind_speed")?;
        let dir = read_grid(c, "wind_dir")?;
        let (mut wind_speed, mut wind_dir) = polar_to_wind(&speed_ms, &dir)?;
        let (latitude, longitude) = read_geolocation(c, "lat", "lon")?;

        // ASCAT products are used as delivered
        if qc && self.format == FormatId::OscatNc {
            let flags = read_grid(c, "wvc_quality_flag")?;
            let masked = apply_qc(&mut wind_speed, &mut wind_dir, &flags, |f| {
                deny_any(f, OSCAT_QC_BITS)
            })?;
            debug!(format = %self.format, masked, "Applied QC flags");
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
