//! Multi-format scatterometer wind reader.
//!
//! Reads level 2 wind products from several satellite scatterometers and
//! normalizes them into one [`WindRecord`]: geolocation, wind speed in knots,
//! direction components and observation times.
//!
//! # Architecture
//!
//! ```text
//! path
//!  │
//!  ▼
//! find_reader ──► FormatId::check_signature (per candidate, priority order)
//!  │
//!  ▼
//! WindReader::open ──► decoder (Swath / Cfosat / Hscat / WindRad)
//!  │                         │
//!  │                         └─► Container (NetCDF / HDF5 / memory)
//!  ▼
//! load(band, qc) ──► WindRecord
//!  │
//!  ├─► normalize_longitudes
//!  ├─► crop(GeoBox)        ──► BoundsCache ─► compute_bounds
//!  └─► nearest_time(GeoBox) ─► nearest_cell
//! ```
//!
//! # Example
//!
//! ```ignore
//! use wind_reader::{load_wind_file, ReaderConfig};
//!
//! let config = ReaderConfig::from_env();
//! let loaded = load_wind_file("H2B_OPER_SCA_L2B.h5", None, &config)?;
//! println!("{} at {}", loaded.title()?, loaded.display_time);
//! ```

pub mod cache;
pub mod config;
pub mod convert;
pub mod decoder;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod reader;
pub mod record;
pub mod registry;
pub mod types;

pub use cache::{BoundsCache, BoundsKey};
pub use config::ReaderConfig;
pub use decoder::{WindDecoder, WINDRAD_BANDS};
pub use error::{DecodeError, DecodeResult, ReaderError, Result};
pub use index::{compute_bounds, nearest_cell, IndexBounds};
pub use pipeline::{load_wind_file, load_wind_file_with, LoadedWind};
pub use reader::{WindReader, DEFAULT_BOUNDS_CACHE_SIZE};
pub use record::{
    ObsTime, ObsTimes, RecordMetadata, WindComponents, WindFields, WindRecord, WindSummary,
};
pub use registry::{
    find_reader, find_reader_with, open_reader, open_reader_with, FormatId, ReaderSelection,
    REGISTRY_ORDER,
};
pub use types::{CacheStats, GeoBox, Grid, MaskedGrid};
