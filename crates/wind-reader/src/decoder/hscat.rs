//! HY-2 scatterometer (HSCAT) level 2B.
//!
//! Global attributes are stored as short string arrays and only the last
//! element is meaningful. Wind fields are packed 16-bit integers with
//! `scale_factor`/`add_offset` attributes and a -32767 fill value.

use chrono::{DateTime, Utc};
use tracing::debug;
use wind_container::{AttrValue, Attributes, Container};

use super::{
    apply_qc, mismatch, packing, polar_to_wind, read_geolocation, read_grid, read_packed,
    read_text_times, signature_text, text_attr, time_attr, WindDecoder,
};
use crate::convert::allow_only;
use crate::error::{DecodeResult, ReaderError};
use crate::record::WindFields;
use crate::registry::FormatId;

const SIGNATURE_ATTR: &str = "Instrument_ShorName";
const TIME_FORMAT: &str = "%Y%m%dT%H:%M:%S";
const FILL_VALUE: f64 = -32767.0;
const QC_BITS: u32 = 31;
/// Flags that do not invalidate a cell.
const QC_ALLOWED: u64 = (1 << 14) | (1 << 15);

pub struct HscatDecoder {
    container: Box<dyn Container>,
}

impl HscatDecoder {
    pub fn new(container: Box<dyn Container>) -> Result<Self, ReaderError> {
        Self::check_signature(container.as_ref())?;
        Ok(Self { container })
    }

    pub fn check_signature(container: &dyn Container) -> Result<(), ReaderError> {
        let instrument = signature_text(container, FormatId::HscatHdf, SIGNATURE_ATTR)?;
        if instrument.starts_with("HSCAT") {
            Ok(())
        } else {
            Err(mismatch(
                FormatId::HscatHdf,
                format!("instrument '{}' is not HSCAT", instrument),
            ))
        }
    }
}

/// Reduce array attributes to their last element.
fn last_element(value: AttrValue) -> AttrValue {
    match value {
        AttrValue::Texts(mut v) => match v.pop() {
            Some(last) => AttrValue::Text(last),
            None => AttrValue::Texts(v),
        },
        AttrValue::Numbers(mut v) => match v.pop() {
            Some(last) => AttrValue::Number(last),
            None => AttrValue::Numbers(v),
        },
        other => other,
    }
}

impl WindDecoder for HscatDecoder {
    fn format(&self) -> FormatId {
        FormatId::HscatHdf
    }

    fn container(&self) -> &dyn Container {
        self.container.as_ref()
    }

    fn attributes(&self) -> DecodeResult<Attributes> {
        Ok(self
            .container
            .attributes()?
            .into_iter()
            .map(|(k, v)| (k, last_element(v)))
            .collect())
    }

    fn platform_name(&self, _band: Option<&str>) -> DecodeResult<String> {
        let c = self.container();
        Ok(format!(
            "{} {} Level 2B",
            text_attr(c, "Platform_ShortName")?,
            text_attr(c, SIGNATURE_ATTR)?
        ))
    }

    fn resolution(&self, _band: Option<&str>) -> DecodeResult<String> {
        Ok("25.0 KM".to_string())
    }

    fn start_time(&self) -> DecodeResult<DateTime<Utc>> {
        time_attr(self.container(), &["Range_Beginning_Time"], TIME_FORMAT)
    }

    fn end_time(&self) -> DecodeResult<DateTime<Utc>> {
        time_attr(self.container(), &["Range_Ending_Time"], TIME_FORMAT)
    }

    fn decode(&self, _band: Option<&str>, qc: bool) -> DecodeResult<WindFields> {
        let c = self.container();

        let wvc_time = read_text_times(c, "wvc_row_time", TIME_FORMAT)?;

        let speed_packing = packing(c, "wind_speed_selection", "scale_factor", "add_offset")?;
        let dir_packing = packing(c, "wind_dir_selection", "scale_factor", "add_offset")?;
        let speed_ms = read_packed(c, "wind_speed_selection", FILL_VALUE, speed_packing)?;
        let dir = read_packed(c, "wind_dir_selection", FILL_VALUE, dir_packing)?;
        let (mut wind_speed, mut wind_dir) = polar_to_wind(&speed_ms, &dir)?;

        let (latitude, longitude) = read_geolocation(c, "wvc_lat", "wvc_lon")?;

        if qc {
            let flags = read_grid(c, "wvc_quality_flag")?;
            let masked = apply_qc(&mut wind_speed, &mut wind_dir, &flags, |f| {
                allow_only(f, QC_BITS, QC_ALLOWED)
            })?;
            debug!(format = %FormatId::HscatHdf, masked, "Applied QC flags");
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
