//! Load pipeline: detect, open, load, normalize, crop and pick a display time.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use wind_container::{ContainerSource, FileSource};

use crate::config::ReaderConfig;
use crate::error::{ReaderError, Result};
use crate::reader::WindReader;
use crate::registry::{find_reader_with, FormatId};

/// A loaded reader together with the values a plot header needs.
#[derive(Debug)]
pub struct LoadedWind {
    pub format: FormatId,
    pub reader: WindReader,
    /// Nearest observation time in the configured area, or the file start time.
    pub display_time: DateTime<Utc>,
    /// Whether `display_time` fell back to the file start time.
    pub used_start_time: bool,
}

impl LoadedWind {
    /// `platform resolution`, e.g. `Metop-B ASCAT Level 2 25.0 KM`.
    pub fn title(&self) -> Result<String> {
        Ok(format!(
            "{} {}",
            self.reader.platform_name()?,
            self.reader.resolution()?
        ))
    }

    /// Strongest valid wind in knots, `None` when every cell is masked or the
    /// record is empty.
    pub fn max_speed(&self) -> Option<f64> {
        self.reader.record().and_then(|r| r.max_speed())
    }
}

/// Load a wind file from disk.
pub fn load_wind_file(
    path: impl AsRef<Path>,
    band: Option<&str>,
    config: &ReaderConfig,
) -> Result<LoadedWind> {
    load_wind_file_with(&FileSource, path.as_ref(), band, config)
}

/// Load a wind file obtained from `source`.
///
/// `band` is only used by multi-band formats.
pub fn load_wind_file_with(
    source: &dyn ContainerSource,
    path: &Path,
    band: Option<&str>,
    config: &ReaderConfig,
) -> Result<LoadedWind> {
    config.validate().map_err(ReaderError::config)?;

    let format = find_reader_with(source, path, &config.readers).ok_or_else(|| {
        ReaderError::NoReaderMatched {
            path: path.to_path_buf(),
        }
    })?;

    let mut reader =
        WindReader::open_with(source, path, format)?.with_cache_size(config.bounds_cache_size);
    let band = if reader.available_sub_bands().is_empty() {
        None
    } else {
        band
    };
    reader.load(band, config.apply_qc)?;

    if config.normalize_longitude {
        reader.normalize_longitudes()?;
    }

    if config.crop_area {
        reader.crop(&config.georange)?;
    }

    let (display_time, used_start_time) = match reader.nearest_time(&config.georange)? {
        Some(time) => (time, false),
        None => {
            warn!(
                path = %path.display(),
                area = %config.georange,
                "No observation time in area, using file start time"
            );
            (reader.start_time()?, true)
        }
    };

    info!(
        format = %format,
        path = %path.display(),
        display_time = %display_time,
        "Wind file ready"
    );

    Ok(LoadedWind {
        format,
        reader,
        display_time,
        used_start_time,
    })
}
