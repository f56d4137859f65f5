//! A reader bound to one file and one format.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use wind_container::{Attributes, ContainerSource, FileSource};

use crate::cache::BoundsCache;
use crate::decoder::WindDecoder;
use crate::error::{DecodeError, ReaderError, Result};
use crate::index::{compute_bounds, nearest_cell, IndexBounds};
use crate::record::{ObsTime, RecordMetadata, WindComponents, WindRecord, WindSummary};
use crate::registry::FormatId;
use crate::types::{CacheStats, GeoBox, Grid, MaskedGrid};

/// Default number of boxes whose bounds are remembered.
pub const DEFAULT_BOUNDS_CACHE_SIZE: usize = 2;

/// Wind reader for a single product file.
///
/// Construction verifies the format signature. [`WindReader::load`] decodes
/// the wind fields into a [`WindRecord`]; cropping and time lookup then work
/// on that record in place.
///
/// # Example
///
/// ```ignore
/// use wind_reader::{FormatId, GeoBox, WindReader};
///
/// let mut reader = WindReader::open("ascat_20240101.nc", FormatId::AscatNc)?;
/// reader.load(None, true)?;
/// let area = GeoBox::new(10.0, 30.0, 120.0, 140.0)?;
/// let time = reader.nearest_time(&area)?;
/// reader.crop(&area)?;
/// ```
pub struct WindReader {
    decoder: Box<dyn WindDecoder>,
    path: PathBuf,
    record: Option<WindRecord>,
    band: Option<String>,
    cache: BoundsCache,
}

impl WindReader {
    /// Open a file on disk as `format`.
    pub fn open(path: impl AsRef<Path>, format: FormatId) -> Result<Self> {
        Self::open_with(&FileSource, path.as_ref(), format)
    }

    /// Open a file obtained from `source` as `format`.
    pub fn open_with(source: &dyn ContainerSource, path: &Path, format: FormatId) -> Result<Self> {
        let decoder = format.open_decoder(source, path)?;
        Ok(Self::from_decoder(decoder, path))
    }

    /// Wrap an already constructed decoder.
    pub fn from_decoder(decoder: Box<dyn WindDecoder>, path: &Path) -> Self {
        Self {
            decoder,
            path: path.to_path_buf(),
            record: None,
            band: None,
            cache: BoundsCache::new(DEFAULT_BOUNDS_CACHE_SIZE),
        }
    }

    /// Replace the bounds cache with one of the given capacity.
    pub fn with_cache_size(mut self, capacity: usize) -> Self {
        self.cache = BoundsCache::new(capacity);
        self
    }

    pub fn format(&self) -> FormatId {
        self.decoder.format()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode_error(&self, source: DecodeError) -> ReaderError {
        ReaderError::Decode {
            format: self.format(),
            path: self.path.clone(),
            source,
        }
    }

    /// Check `band` against the format's sub-bands and the band already loaded.
    fn resolve_band(&self, band: Option<&str>) -> Result<Option<String>> {
        let available = self.decoder.sub_bands();
        if available.is_empty() {
            return Ok(None);
        }
        let names = || available.iter().map(|b| b.to_string()).collect::<Vec<_>>();

        let band = band.ok_or_else(|| ReaderError::BandRequired {
            format: self.format(),
            available: names(),
        })?;
        if !available.contains(&band) {
            return Err(ReaderError::InvalidBand {
                format: self.format(),
                band: band.to_string(),
                available: names(),
            });
        }
        if let Some(loaded) = &self.band {
            if loaded != band {
                return Err(ReaderError::BandAlreadyLoaded {
                    loaded: loaded.clone(),
                    requested: band.to_string(),
                });
            }
        }
        Ok(Some(band.to_string()))
    }

    /// Decode the wind fields.
    ///
    /// `band` is required for multi-band formats and ignored otherwise. `qc`
    /// enables quality-flag masking where the format defines it. Loading
    /// again with the same band replaces the record. The record is only
    /// replaced when decoding succeeds.
    pub fn load(&mut self, band: Option<&str>, qc: bool) -> Result<()> {
        let band = self.resolve_band(band)?;
        let band_ref = band.as_deref();

        let record = self
            .build_record(band_ref, qc)
            .map_err(|e| self.decode_error(e))?;

        let (rows, cols) = record.shape();
        info!(
            format = %self.format(),
            path = %self.path.display(),
            band = band_ref.unwrap_or("-"),
            rows,
            cols,
            valid = record.valid_count(),
            "Loaded wind record"
        );

        self.record = Some(record);
        self.band = band;
        self.cache.clear();
        Ok(())
    }

    fn build_record(
        &self,
        band: Option<&str>,
        qc: bool,
    ) -> std::result::Result<WindRecord, DecodeError> {
        let fields = self.decoder.decode(band, qc)?;
        let metadata = RecordMetadata {
            format: self.format(),
            platform_name: self.decoder.platform_name(band)?,
            resolution: self.decoder.resolution(band)?,
            start_time: self.decoder.start_time()?,
            end_time: self.decoder.end_time()?,
            sub_band: band.map(str::to_string),
        };
        WindRecord::new(fields, metadata)
    }

    fn loaded(&self) -> Result<&WindRecord> {
        self.record.as_ref().ok_or(ReaderError::NotLoaded)
    }

    /// Index bounds of the cells inside `geo_box`, through the bounds cache.
    pub fn bounds(&mut self, geo_box: &GeoBox) -> Result<Option<IndexBounds>> {
        let record = self.record.as_ref().ok_or(ReaderError::NotLoaded)?;
        Ok(self.cache.get_or_compute(geo_box, || {
            compute_bounds(record.latitude(), record.longitude(), geo_box)
        }))
    }

    /// Restrict the record to the cells inside `geo_box`.
    ///
    /// A box that contains no cell leaves an empty record.
    pub fn crop(&mut self, geo_box: &GeoBox) -> Result<()> {
        let bounds = self.bounds(geo_box)?;
        let record = self.record.as_mut().ok_or(ReaderError::NotLoaded)?;
        record.crop_to(bounds.as_ref());
        let (rows, cols) = record.shape();
        debug!(area = %geo_box, rows, cols, "Cropped wind record");
        self.cache.clear();
        Ok(())
    }

    /// Observation time of the cell inside `geo_box` closest to its centre.
    pub fn nearest_time(&self, geo_box: &GeoBox) -> Result<ObsTime> {
        let record = self.loaded()?;
        Ok(
            nearest_cell(record.latitude(), record.longitude(), geo_box)
                .and_then(|(row, col)| record.wvc_time().at(row, col)),
        )
    }

    /// Shift negative longitudes into `[0, 360)`. Returns the number changed.
    pub fn normalize_longitudes(&mut self) -> Result<usize> {
        let record = self.record.as_mut().ok_or(ReaderError::NotLoaded)?;
        let changed = record.normalize_longitudes();
        self.cache.clear();
        Ok(changed)
    }

    /// Longitude and latitude grids.
    pub fn get_lonlats(&self) -> Result<(&Grid<f64>, &Grid<f64>)> {
        let record = self.loaded()?;
        Ok((record.longitude(), record.latitude()))
    }

    /// Wind speed in knots and the direction components.
    pub fn get_values(&self) -> Result<(&MaskedGrid, &WindComponents)> {
        let record = self.loaded()?;
        Ok((record.wind_speed(), record.wind_dir()))
    }

    pub fn record(&self) -> Option<&WindRecord> {
        self.record.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.record.is_some()
    }

    /// File-level attributes as the format presents them.
    pub fn attributes(&self) -> Result<Attributes> {
        self.decoder
            .attributes()
            .map_err(|e| self.decode_error(e))
    }

    /// Platform name, including the band once one is loaded.
    pub fn platform_name(&self) -> Result<String> {
        self.decoder
            .platform_name(self.band.as_deref())
            .map_err(|e| self.decode_error(e))
    }

    pub fn resolution(&self) -> Result<String> {
        self.decoder
            .resolution(self.band.as_deref())
            .map_err(|e| self.decode_error(e))
    }

    pub fn start_time(&self) -> Result<DateTime<Utc>> {
        self.decoder.start_time().map_err(|e| self.decode_error(e))
    }

    pub fn end_time(&self) -> Result<DateTime<Utc>> {
        self.decoder.end_time().map_err(|e| self.decode_error(e))
    }

    /// Selectable sub-bands; empty for single-band formats.
    pub fn available_sub_bands(&self) -> &'static [&'static str] {
        self.decoder.sub_bands()
    }

    /// Band of the loaded record.
    pub fn sub_band(&self) -> Option<&str> {
        self.band.as_deref()
    }

    pub fn summary(&self) -> Result<WindSummary> {
        Ok(self.loaded()?.summary())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl std::fmt::Debug for WindReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindReader")
            .field("format", &self.format())
            .field("path", &self.path)
            .field("band", &self.band)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
