//! Configuration for loading wind files.

use serde::{Deserialize, Serialize};

use crate::reader::DEFAULT_BOUNDS_CACHE_SIZE;
use crate::registry::ReaderSelection;
use crate::types::GeoBox;

/// Configuration for the load pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Formats detection may try.
    pub readers: ReaderSelection,

    /// Apply quality-flag masking where the format defines it.
    pub apply_qc: bool,

    /// Number of boxes whose index bounds each reader remembers.
    pub bounds_cache_size: usize,

    /// Shift negative longitudes into [0, 360) after loading.
    pub normalize_longitude: bool,

    /// Crop the record to `georange` after loading.
    pub crop_area: bool,

    /// Area of interest for cropping and the display time.
    pub georange: GeoBox,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            readers: ReaderSelection::Auto,
            apply_qc: true,
            bounds_cache_size: DEFAULT_BOUNDS_CACHE_SIZE,
            normalize_longitude: true,
            crop_area: false,
            georange: GeoBox::global(),
        }
    }
}

fn parse_bool(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

impl ReaderConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("WIND_READERS") {
            config.readers = ReaderSelection::parse(&val);
        }

        if let Ok(val) = std::env::var("WIND_APPLY_QC") {
            config.apply_qc = parse_bool(&val);
        }

        if let Ok(val) = std::env::var("WIND_BOUNDS_CACHE_SIZE") {
            if let Ok(size) = val.parse() {
                config.bounds_cache_size = size;
            }
        }

        if let Ok(val) = std::env::var("WIND_NORMALIZE_LONGITUDE") {
            config.normalize_longitude = parse_bool(&val);
        }

        if let Ok(val) = std::env::var("WIND_CROP_AREA") {
            config.crop_area = parse_bool(&val);
        }

        if let Ok(val) = std::env::var("WIND_GEORANGE") {
            if let Ok(area) = GeoBox::parse(&val) {
                config.georange = area;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.bounds_cache_size == 0 {
            return Err("bounds_cache_size must be > 0".to_string());
        }

        if self.readers.candidates().is_empty() {
            return Err(format!("readers '{}' names no known format", self.readers));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReaderConfig::default();
        assert_eq!(config.readers, ReaderSelection::Auto);
        assert!(config.apply_qc);
        assert_eq!(config.bounds_cache_size, 2);
        assert!(config.normalize_longitude);
        assert!(!config.crop_area);
        assert_eq!(config.georange, GeoBox::global());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let config = ReaderConfig {
            bounds_cache_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ReaderConfig {
            readers: ReaderSelection::parse("quikscat"),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("yes"));
    }

    #[test]
    fn test_serde_partial() {
        let config: ReaderConfig =
            serde_json::from_str(r#"{"crop_area": true, "georange": [0.0, 40.0, 100.0, 160.0]}"#)
                .unwrap();
        assert!(config.crop_area);
        assert!(config.apply_qc);
        assert_eq!(config.georange.lat_max(), 40.0);
    }
}
