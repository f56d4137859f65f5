//! Synthetic wind products for every supported instrument family.
//!
//! Every fixture is a 3×3 swath with latitude 10/11/12 by row and longitude
//! 100/101/102 by column. Wind speed is 10.28 m/s (20 knots) blowing from
//! 90 degrees in every cell. Observation times start at 2024-01-01T00:00:00Z;
//! per-cell products advance one minute per cell in row-major order,
//! per-row products one minute per row.
//!
//! Fixtures are plain [`MemoryContainer`]s, so tests can override any array
//! by chaining another `with_array` call.

use wind_container::{ContainerKind, MemoryContainer, MemorySource};

use crate::generators::{axis, cell_index, constant, lat_lon_grid};

pub const ROWS: usize = 3;
pub const COLS: usize = 3;
pub const SHAPE: [usize; 2] = [ROWS, COLS];
pub const CELLS: usize = ROWS * COLS;

/// Wind speed stored in every fixture, m/s.
pub const SPEED_MS: f64 = 10.28;
/// The same speed in knots.
pub const SPEED_KNOTS: f64 = 20.0;
pub const DIRECTION_DEG: f64 = 90.0;

/// 2024-01-01T00:00:00Z as Unix seconds.
pub const START_UNIX: i64 = 1_704_067_200;
/// 2024-01-01T00:00:00Z in seconds since 1990-01-01.
pub const START_1990: f64 = 1_072_915_200.0;
/// 2024-01-01T00:00:00Z as whole days since 2000-01-01T12:00:00Z ...
pub const START_J2000_DAY: f64 = 8765.0;
/// ... plus this many milliseconds.
pub const START_J2000_MS: f64 = 43_200_000.0;

/// WindRAD sub-band group names.
pub const WINDRAD_BANDS: [&str; 4] = ["C_band", "Dual_band", "Ku_band", "Ku_band_10km"];

/// File paths the fixtures are registered under in [`fixture_source`].
pub mod files {
    pub const ASCAT: &str = "/fixtures/ascat_20240101_000000_metopb_l2.nc";
    pub const OSCAT: &str = "/fixtures/oscat_20240101_000000_scatsat1_l2.nc";
    pub const HSCAT: &str = "/fixtures/H2B_OPER_SCA_L2B_20240101.h5";
    pub const CSCAT: &str = "/fixtures/CFO_OPER_SCA_L2B_20240101.nc";
    pub const WINDRAD: &str = "/fixtures/FY3E_WRADA_ORBT_L2_OWV_20240101.HDF";
    pub const WINDRAD_GLL: &str = "/fixtures/FY3E_WRADA_GLL_L2_OWV_20240101.HDF";
}

fn geolocation() -> (Vec<f64>, Vec<f64>) {
    lat_lon_grid(ROWS, COLS, 10.0, 100.0, 1.0)
}

fn swath_base(path: &str, title: &str, source: &str) -> MemoryContainer {
    let (lat, lon) = geolocation();
    let seconds = cell_index(ROWS, COLS)
        .into_iter()
        .map(|i| START_1990 + i * 60.0)
        .collect();
    MemoryContainer::new(ContainerKind::NetCdf, path)
        .with_attr("title_short_name", title)
        .with_attr("source", source)
        .with_attr("pixel_size_on_horizontal", "25.0 km")
        .with_attr("start_date", "2024-01-01")
        .with_attr("start_time", "00:00:00")
        .with_attr("stop_date", "2024-01-01")
        .with_attr("stop_time", "00:10:00")
        .with_array("lat", &SHAPE, lat)
        .with_array("lon", &SHAPE, lon)
        .with_array("time", &SHAPE, seconds)
        .with_array("wind_speed", &SHAPE, constant(CELLS, SPEED_MS))
        .with_array("wind_dir", &SHAPE, constant(CELLS, DIRECTION_DEG))
}

/// ASCAT level 2 swath (NetCDF).
pub fn ascat_container(path: &str) -> MemoryContainer {
    swath_base(path, "ASCAT-B L2 25.0km", "MetOp-B ASCAT")
}

/// OSCAT level 2 swath (NetCDF) with all QC flags clear.
pub fn oscat_container(path: &str) -> MemoryContainer {
    swath_base(path, "OSCAT L2 25.0km", "ScatSat-1 OSCAT")
        .with_array("wvc_quality_flag", &SHAPE, constant(CELLS, 0.0))
}

/// CFOSAT level 2B swath (NetCDF) with ISO row times.
pub fn cscat_container(path: &str) -> MemoryContainer {
    let (lat, lon) = geolocation();
    let row_times = (0..ROWS)
        .map(|r| format!("2024-01-01T00:{:02}:00Z", r))
        .collect();
    MemoryContainer::new(ContainerKind::NetCdf, path)
        .with_attr("platform", "CFOSAT")
        .with_attr("sensor", "SCAT")
        .with_attr("geospatial_lon_resolution", "0.125")
        .with_attr("time_coverage_start", "2024-01-01T00:00:00Z")
        .with_attr("time_coverage_end", "2024-01-01T00:10:00Z")
        .with_array("wvc_lat", &SHAPE, lat)
        .with_array("wvc_lon", &SHAPE, lon)
        .with_text("row_time", &[ROWS], row_times)
        .with_array("wind_speed_selection", &SHAPE, constant(CELLS, SPEED_MS))
        .with_array("wind_dir_selection", &SHAPE, constant(CELLS, DIRECTION_DEG))
}

/// HY-2 level 2B swath (HDF5) with packed wind fields.
pub fn hscat_container(path: &str) -> MemoryContainer {
    let (lat, lon) = geolocation();
    let row_times = (0..ROWS)
        .map(|r| format!("20240101T00:{:02}:00", r))
        .collect();
    MemoryContainer::new(ContainerKind::Hdf5, path)
        .with_attr("Platform_ShortName", vec!["HY-2B".to_string()])
        .with_attr(
            "Instrument_ShorName",
            vec!["Scatterometer".to_string(), "HSCAT-B".to_string()],
        )
        .with_attr("Range_Beginning_Time", "20240101T00:00:00")
        .with_attr("Range_Ending_Time", "20240101T00:10:00")
        .with_array("wvc_lat", &SHAPE, lat)
        .with_array("wvc_lon", &SHAPE, lon)
        .with_text("wvc_row_time", &[ROWS], row_times)
        .with_array("wind_speed_selection", &SHAPE, constant(CELLS, 1028.0))
        .with_array_attr("wind_speed_selection", "scale_factor", 0.01)
        .with_array_attr("wind_speed_selection", "add_offset", 0.0)
        .with_array("wind_dir_selection", &SHAPE, constant(CELLS, 900.0))
        .with_array_attr("wind_dir_selection", "scale_factor", 0.1)
        .with_array_attr("wind_dir_selection", "add_offset", 0.0)
        .with_array("wvc_quality_flag", &SHAPE, constant(CELLS, 0.0))
}

fn windrad_base(path: &str, projection: &str) -> MemoryContainer {
    MemoryContainer::new(ContainerKind::Hdf5, path)
        .with_attr("Satellite Name", "FY-3E")
        .with_attr("Sensor Name", "WindRAD")
        .with_attr("Projection Type", projection)
        .with_attr("Observing Beginning Date", "2024-01-01")
        .with_attr("Observing Beginning Time", "00:00:00.000")
        .with_attr("Observing Ending Date", "2024-01-01")
        .with_attr("Observing Ending Time", "00:10:00.000")
}

fn windrad_band(container: MemoryContainer, band: &str) -> MemoryContainer {
    let p = |name: &str| format!("{}/{}", band, name);
    let ms = cell_index(ROWS, COLS)
        .into_iter()
        .map(|i| START_J2000_MS + i * 60_000.0)
        .collect();
    container
        .with_array(&p("day_count"), &SHAPE, constant(CELLS, START_J2000_DAY))
        .with_array_attr(&p("day_count"), "Slope", 1.0)
        .with_array_attr(&p("day_count"), "Intercept", 0.0)
        .with_array(&p("millisecond_count"), &SHAPE, ms)
        .with_array_attr(&p("millisecond_count"), "Slope", 1.0)
        .with_array_attr(&p("millisecond_count"), "Intercept", 0.0)
        .with_array(&p("wind_speed_selected"), &SHAPE, constant(CELLS, 1028.0))
        .with_array_attr(&p("wind_speed_selected"), "Slope", 0.01)
        .with_array_attr(&p("wind_speed_selected"), "Intercept", 0.0)
        .with_array(&p("wind_dir_selected"), &SHAPE, constant(CELLS, 900.0))
        .with_array_attr(&p("wind_dir_selected"), "Slope", 0.1)
        .with_array_attr(&p("wind_dir_selected"), "Intercept", 0.0)
        .with_array(&p("wvc_quality_flag"), &SHAPE, constant(CELLS, 0.0))
}

/// FY-3 WindRAD level 2 swath (HDF5) with all four sub-bands.
pub fn windrad_container(path: &str) -> MemoryContainer {
    let (lat, lon) = geolocation();
    WINDRAD_BANDS
        .iter()
        .fold(windrad_base(path, "SWATH"), |c, band| {
            windrad_band(c, band)
                .with_array(&format!("{}/wvc_lat", band), &SHAPE, lat.clone())
                .with_array(&format!("{}/wvc_lon", band), &SHAPE, lon.clone())
        })
}

/// FY-3 WindRAD daily product on a regular lat/lon grid (`GLL`).
///
/// Geolocation is stored as 1D axes; QC flags are all set and must be
/// ignored.
pub fn windrad_gll_container(path: &str) -> MemoryContainer {
    WINDRAD_BANDS
        .iter()
        .fold(windrad_base(path, "GLL"), |c, band| {
            windrad_band(c, band)
                .with_array(&format!("{}/grid_lat", band), &[ROWS], axis(ROWS, 10.0, 1.0))
                .with_array(&format!("{}/grid_lon", band), &[COLS], axis(COLS, 100.0, 1.0))
                .with_array(
                    &format!("{}/wvc_quality_flag", band),
                    &SHAPE,
                    constant(CELLS, 1.0),
                )
        })
}

/// A source holding one fixture per family under [`files`].
pub fn fixture_source() -> MemorySource {
    MemorySource::new()
        .with(ascat_container(files::ASCAT))
        .with(oscat_container(files::OSCAT))
        .with(hscat_container(files::HSCAT))
        .with(cscat_container(files::CSCAT))
        .with(windrad_container(files::WINDRAD))
        .with(windrad_gll_container(files::WINDRAD_GLL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use wind_container::{Container, ContainerSource};

    #[test]
    fn test_fixture_kinds() {
        let source = fixture_source();
        assert!(source
            .open(Path::new(files::ASCAT), ContainerKind::NetCdf)
            .is_ok());
        assert!(source
            .open(Path::new(files::WINDRAD), ContainerKind::Hdf5)
            .is_ok());
        assert!(source
            .open(Path::new(files::HSCAT), ContainerKind::NetCdf)
            .is_err());
    }

    #[test]
    fn test_windrad_bands_present() {
        let c = windrad_container(files::WINDRAD);
        let groups = c.groups().unwrap();
        for band in WINDRAD_BANDS {
            assert!(groups.iter().any(|g| g == band), "missing {}", band);
        }
        assert_eq!(c.array_shape("Ku_band/day_count").unwrap(), vec![3, 3]);
    }

    #[test]
    fn test_swath_times_advance_per_cell() {
        let c = ascat_container(files::ASCAT);
        let time = c.read_array("time").unwrap();
        assert_eq!(time.values[0], Some(START_1990));
        assert_eq!(time.values[4], Some(START_1990 + 240.0));
    }
}
