//! Per-family decoding of the synthetic fixtures.

use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use test_utils::{
    assert_approx_eq, constant, cscat_container, files, fixture_source, hscat_container,
    init_test_tracing, oscat_container, windrad_container, windrad_gll_container, with_cell, CELLS,
    SHAPE, SPEED_KNOTS,
};
use wind_container::MemorySource;
use wind_reader::{DecodeError, FormatId, ObsTimes, ReaderError, WindReader};

fn open(source: &MemorySource, path: &str, format: FormatId) -> WindReader {
    WindReader::open_with(source, Path::new(path), format).expect("fixture should open")
}

fn loaded(path: &str, format: FormatId, band: Option<&str>) -> WindReader {
    init_test_tracing();
    let mut reader = open(&fixture_source(), path, format);
    reader.load(band, true).expect("fixture should load");
    reader
}

fn t(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, h, m, s).unwrap()
}

/// WindRAD fixture milliseconds (one minute per cell) with one cell replaced.
fn cell_ms_with(row: usize, col: usize, value: f64) -> Vec<f64> {
    let ms = (0..CELLS)
        .map(|i| test_utils::START_J2000_MS + i as f64 * 60_000.0)
        .collect();
    with_cell(ms, 3, row, col, value)
}

/// Every field has the record shape and every cell is 20 knots from 90°.
fn assert_uniform_wind(reader: &WindReader) {
    let (lons, lats) = reader.get_lonlats().unwrap();
    let (speed, dir) = reader.get_values().unwrap();
    assert_eq!(lons.shape(), (3, 3));
    assert_eq!(lats.shape(), (3, 3));
    assert_eq!(speed.shape(), (3, 3));
    assert_eq!(dir.v.shape(), (3, 3));
    assert_eq!(dir.h.shape(), (3, 3));

    for value in speed.iter() {
        assert_approx_eq!(value.expect("speed should be valid"), SPEED_KNOTS, 0.01);
    }
    for (v, h) in dir.v.iter().zip(dir.h.iter()) {
        assert_approx_eq!(v.unwrap(), SPEED_KNOTS, 0.01);
        assert_approx_eq!(h.unwrap(), 0.0, 1e-9);
    }
    assert_eq!(lats.get(2, 0), Some(&12.0));
    assert_eq!(lons.get(0, 2), Some(&102.0));
}

// =============================================================================
// ASCAT / OSCAT
// =============================================================================

#[test]
fn test_ascat_load() {
    let reader = loaded(files::ASCAT, FormatId::AscatNc, None);
    assert_uniform_wind(&reader);

    assert_eq!(reader.platform_name().unwrap(), "MetOp-B ASCAT Level 2");
    assert_eq!(reader.resolution().unwrap(), "25.0 KM");
    assert_eq!(reader.start_time().unwrap(), t(0, 0, 0));
    assert_eq!(reader.end_time().unwrap(), t(0, 10, 0));

    let times = reader.record().unwrap().wvc_time();
    assert!(matches!(times, ObsTimes::PerCell(_)));
    assert_eq!(times.at(1, 1), Some(t(0, 4, 0)));
    assert_eq!(times.at(2, 2), Some(t(0, 8, 0)));
}

#[test]
fn test_ascat_ignores_qc() {
    let path = "/fixtures/ascat_flagged.nc";
    let source = MemorySource::new().with(
        test_utils::ascat_container(path).with_array("wvc_quality_flag", &SHAPE, constant(CELLS, 1.0)),
    );
    let mut reader = open(&source, path, FormatId::AscatNc);
    reader.load(None, true).unwrap();
    assert_eq!(reader.record().unwrap().valid_count(), CELLS);
}

#[test]
fn test_oscat_qc_masks_flagged_cells() {
    let path = "/fixtures/oscat_flagged.nc";
    let flags = with_cell(constant(CELLS, 0.0), 3, 0, 1, (1 << 21) as f64);
    // Bits above the low 22 are ignored
    let flags = with_cell(flags, 3, 2, 2, (1u64 << 22) as f64);
    let source = MemorySource::new()
        .with(oscat_container(path).with_array("wvc_quality_flag", &SHAPE, flags));

    let mut reader = open(&source, path, FormatId::OscatNc);
    reader.load(None, true).unwrap();
    let (speed, dir) = reader.get_values().unwrap();
    assert_eq!(speed.get(0, 1), Some(&None));
    assert_eq!(dir.v.get(0, 1), Some(&None));
    assert!(speed.get(2, 2).unwrap().is_some());
    assert_eq!(reader.record().unwrap().valid_count(), CELLS - 1);

    let mut reader = open(&source, path, FormatId::OscatNc);
    reader.load(None, false).unwrap();
    assert_eq!(reader.record().unwrap().valid_count(), CELLS);
}

#[test]
fn test_masked_speed_masks_components() {
    let path = "/fixtures/oscat_gap.nc";
    let source = MemorySource::new().with(oscat_container(path).with_masked_array(
        "wind_speed",
        &SHAPE,
        (0..CELLS).map(|i| if i == 4 { None } else { Some(10.28) }).collect(),
    ));
    let mut reader = open(&source, path, FormatId::OscatNc);
    reader.load(None, false).unwrap();

    let (speed, dir) = reader.get_values().unwrap();
    assert_eq!(speed.get(1, 1), Some(&None));
    assert_eq!(dir.v.get(1, 1), Some(&None));
    assert_eq!(dir.h.get(1, 1), Some(&None));
}

#[test]
fn test_shape_mismatch_is_decode_error() {
    let path = "/fixtures/ascat_bad.nc";
    let source = MemorySource::new().with(
        test_utils::ascat_container(path).with_array("lat", &[3, 2], constant(6, 10.0)),
    );
    let mut reader = open(&source, path, FormatId::AscatNc);
    let err = reader.load(None, true).unwrap_err();
    match err {
        ReaderError::Decode {
            format,
            path: p,
            source,
        } => {
            assert_eq!(format, FormatId::AscatNc);
            assert_eq!(p, Path::new(path));
            assert!(matches!(source, DecodeError::ShapeMismatch { .. }));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!reader.is_loaded());
}

#[test]
fn test_missing_array_is_decode_error() {
    let path = "/fixtures/ascat_truncated.nc";
    let source =
        MemorySource::new().with(test_utils::ascat_container(path).without_array("wind_dir"));
    let mut reader = open(&source, path, FormatId::AscatNc);
    let err = reader.load(None, true).unwrap_err();
    assert!(matches!(err, ReaderError::Decode { .. }));
    assert!(err.to_string().contains("ascat_nc"));
}

// =============================================================================
// CSCAT
// =============================================================================

#[test]
fn test_cscat_load() {
    let reader = loaded(files::CSCAT, FormatId::CscatNc, None);
    assert_uniform_wind(&reader);

    assert_eq!(reader.platform_name().unwrap(), "CFOSAT SCAT Level 2B");
    assert_eq!(reader.resolution().unwrap(), "12.0 KM");
    assert_eq!(reader.start_time().unwrap(), t(0, 0, 0));

    let times = reader.record().unwrap().wvc_time();
    assert!(matches!(times, ObsTimes::PerRow(_)));
    assert_eq!(times.at(2, 0), Some(t(0, 2, 0)));
    assert_eq!(times.at(2, 2), Some(t(0, 2, 0)));
}

#[test]
fn test_cscat_bad_row_time_is_null() {
    let path = "/fixtures/cscat_bad_time.nc";
    let source = MemorySource::new().with(cscat_container(path).with_text(
        "row_time",
        &[3],
        vec![
            "2024-01-01T00:00:00Z".to_string(),
            "not a time".to_string(),
            "2024-01-01T00:02:00Z".to_string(),
        ],
    ));
    let mut reader = open(&source, path, FormatId::CscatNc);
    reader.load(None, true).unwrap();
    let times = reader.record().unwrap().wvc_time();
    assert_eq!(times.at(1, 0), None);
    assert_eq!(times.at(2, 0), Some(t(0, 2, 0)));
}

// =============================================================================
// HSCAT
// =============================================================================

#[test]
fn test_hscat_load() {
    let reader = loaded(files::HSCAT, FormatId::HscatHdf, None);
    assert_uniform_wind(&reader);

    assert_eq!(reader.platform_name().unwrap(), "HY-2B HSCAT-B Level 2B");
    assert_eq!(reader.resolution().unwrap(), "25.0 KM");
    assert_eq!(reader.end_time().unwrap(), t(0, 10, 0));
    assert_eq!(
        reader.record().unwrap().wvc_time().at(1, 2),
        Some(t(0, 1, 0))
    );

    let attrs = reader.attributes().unwrap();
    assert_eq!(
        attrs.get("Instrument_ShorName").and_then(|v| v.as_text()),
        Some("HSCAT-B")
    );
}

#[test]
fn test_hscat_qc_allow_list() {
    let path = "/fixtures/hscat_flags.h5";
    let mut flags = constant(CELLS, 0.0);
    flags[0] = (1 << 14) as f64;
    flags[1] = (1 << 15) as f64;
    flags[2] = ((1 << 14) | (1 << 15)) as f64;
    flags[3] = (1 << 3) as f64;
    flags[4] = ((1 << 14) | 1) as f64;
    flags[5] = (1u64 << 31) as f64;
    let source = MemorySource::new()
        .with(hscat_container(path).with_array("wvc_quality_flag", &SHAPE, flags));

    let mut reader = open(&source, path, FormatId::HscatHdf);
    reader.load(None, true).unwrap();
    let (speed, _) = reader.get_values().unwrap();
    let valid: Vec<bool> = speed.iter().map(Option::is_some).collect();
    assert_eq!(
        valid,
        vec![true, true, true, false, false, true, true, true, true]
    );
}

#[test]
fn test_hscat_fill_value_masked() {
    let path = "/fixtures/hscat_fill.h5";
    let speeds = with_cell(constant(CELLS, 1028.0), 3, 1, 0, -32767.0);
    let source = MemorySource::new()
        .with(hscat_container(path).with_array("wind_speed_selection", &SHAPE, speeds));
    let mut reader = open(&source, path, FormatId::HscatHdf);
    reader.load(None, false).unwrap();
    let (speed, dir) = reader.get_values().unwrap();
    assert_eq!(speed.get(1, 0), Some(&None));
    assert_eq!(dir.h.get(1, 0), Some(&None));
    assert_eq!(reader.record().unwrap().valid_count(), CELLS - 1);
}

#[test]
fn test_hscat_zero_scale_is_one() {
    let path = "/fixtures/hscat_zero_scale.h5";
    let source = MemorySource::new().with(
        hscat_container(path)
            .with_array("wind_speed_selection", &SHAPE, constant(CELLS, 10.28))
            .with_array_attr("wind_speed_selection", "scale_factor", 0.0),
    );
    let mut reader = open(&source, path, FormatId::HscatHdf);
    reader.load(None, false).unwrap();
    let max = reader.record().unwrap().max_speed().unwrap();
    assert_approx_eq!(max, SPEED_KNOTS, 0.01);
}

// =============================================================================
// WindRAD
// =============================================================================

#[test]
fn test_windrad_load_band() {
    let reader = loaded(files::WINDRAD, FormatId::WindradHdf, Some("C_band"));
    assert_uniform_wind(&reader);

    assert_eq!(reader.sub_band(), Some("C_band"));
    assert_eq!(reader.platform_name().unwrap(), "FY-3E WindRAD Level 2 C Band");
    assert_eq!(reader.resolution().unwrap(), "20.0 KM");
    assert_eq!(reader.start_time().unwrap(), t(0, 0, 0));
    assert_eq!(
        reader.record().unwrap().wvc_time().at(1, 1),
        Some(t(0, 4, 0))
    );
    assert_eq!(
        reader.available_sub_bands(),
        &["C_band", "Dual_band", "Ku_band", "Ku_band_10km"]
    );
}

#[test]
fn test_windrad_band_required() {
    let mut reader = open(&fixture_source(), files::WINDRAD, FormatId::WindradHdf);
    assert!(matches!(
        reader.load(None, true),
        Err(ReaderError::BandRequired { .. })
    ));
    assert!(matches!(
        reader.load(Some("X_band"), true),
        Err(ReaderError::InvalidBand { .. })
    ));
    assert!(!reader.is_loaded());
    // Platform without a band has no band suffix
    assert_eq!(reader.platform_name().unwrap(), "FY-3E WindRAD Level 2");
}

#[test]
fn test_windrad_band_is_fixed_once_loaded() {
    let mut reader = open(&fixture_source(), files::WINDRAD, FormatId::WindradHdf);
    reader.load(Some("Ku_band"), true).unwrap();
    reader.load(Some("Ku_band"), false).unwrap();
    assert!(matches!(
        reader.load(Some("C_band"), true),
        Err(ReaderError::BandAlreadyLoaded { .. })
    ));
    assert_eq!(reader.sub_band(), Some("Ku_band"));
}

#[test]
fn test_windrad_qc() {
    let path = "/fixtures/windrad_flags.HDF";
    let flags = with_cell(constant(CELLS, 0.0), 3, 0, 0, 1.0);
    let flags = with_cell(flags, 3, 0, 1, (1u64 << 17) as f64);
    let source = MemorySource::new()
        .with(windrad_container(path).with_array("Dual_band/wvc_quality_flag", &SHAPE, flags));

    let mut reader = open(&source, path, FormatId::WindradHdf);
    reader.load(Some("Dual_band"), true).unwrap();
    let (speed, _) = reader.get_values().unwrap();
    assert_eq!(speed.get(0, 0), Some(&None));
    assert!(speed.get(0, 1).unwrap().is_some());
    assert!(speed.get(1, 1).unwrap().is_some());
}

#[test]
fn test_windrad_time_sentinels() {
    let path = "/fixtures/windrad_sentinel.HDF";
    let days = with_cell(constant(CELLS, 8765.0), 3, 0, 0, 65535.0);
    let source = MemorySource::new()
        .with(windrad_container(path).with_array("C_band/day_count", &SHAPE, days));
    let mut reader = open(&source, path, FormatId::WindradHdf);
    reader.load(Some("C_band"), true).unwrap();
    let times = reader.record().unwrap().wvc_time();
    assert_eq!(times.at(0, 0), None);
    assert_eq!(times.at(0, 1), Some(t(0, 1, 0)));
}

#[test]
fn test_windrad_millisecond_sentinel() {
    let path = "/fixtures/windrad_ms_sentinel.HDF";
    let ms = cell_ms_with(1, 2, 4_294_967_295.0);
    let source = MemorySource::new()
        .with(windrad_container(path).with_array("C_band/millisecond_count", &SHAPE, ms));
    let mut reader = open(&source, path, FormatId::WindradHdf);
    reader.load(Some("C_band"), true).unwrap();

    let times = reader.record().unwrap().wvc_time();
    assert_eq!(times.at(1, 2), None);
    assert_eq!(times.at(1, 1), Some(t(0, 4, 0)));
    // Wind in that cell is untouched
    let (speed, _) = reader.get_values().unwrap();
    assert!(speed.get(1, 2).unwrap().is_some());
}

#[test]
fn test_windrad_wind_sentinel_masked_before_scaling() {
    let path = "/fixtures/windrad_wind_sentinel.HDF";
    let speed = with_cell(constant(CELLS, 1028.0), 3, 1, 1, 32767.0);
    let dir = with_cell(constant(CELLS, 900.0), 3, 2, 2, 32767.0);
    let source = MemorySource::new().with(
        windrad_container(path)
            .with_array("Ku_band/wind_speed_selected", &SHAPE, speed)
            .with_array("Ku_band/wind_dir_selected", &SHAPE, dir),
    );
    let mut reader = open(&source, path, FormatId::WindradHdf);
    reader.load(Some("Ku_band"), false).unwrap();

    let (speed, components) = reader.get_values().unwrap();
    assert_eq!(speed.get(1, 1), Some(&None));
    assert_eq!(components.v.get(1, 1), Some(&None));
    assert_eq!(components.h.get(1, 1), Some(&None));
    // A missing direction keeps the speed but drops the components
    assert_approx_eq!(speed.get(2, 2).unwrap().unwrap(), SPEED_KNOTS, 0.01);
    assert_eq!(components.v.get(2, 2), Some(&None));
    assert_eq!(reader.record().unwrap().valid_count(), CELLS - 1);
}

#[test]
fn test_windrad_daily_grid_keeps_time_sentinels() {
    let path = "/fixtures/windrad_gll_sentinel.HDF";
    let days = with_cell(constant(CELLS, 8765.0), 3, 0, 0, 65535.0);
    let ms = cell_ms_with(0, 1, 4_294_967_295.0);
    let source = MemorySource::new().with(
        windrad_gll_container(path)
            .with_array("Ku_band/day_count", &SHAPE, days)
            .with_array("Ku_band/millisecond_count", &SHAPE, ms),
    );
    let mut reader = open(&source, path, FormatId::WindradHdf);
    reader.load(Some("Ku_band"), true).unwrap();

    let times = reader.record().unwrap().wvc_time();
    let j2000_noon = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
    assert_eq!(
        times.at(0, 0),
        Some(j2000_noon + Duration::days(65535) + Duration::hours(12))
    );
    assert_eq!(
        times.at(0, 1),
        Some(j2000_noon + Duration::days(8765) + Duration::milliseconds(4_294_967_295))
    );
    assert_eq!(times.at(1, 1), Some(t(0, 4, 0)));
}

#[test]
fn test_windrad_zero_slope_is_one() {
    let path = "/fixtures/windrad_zero_slope.HDF";
    let source = MemorySource::new().with(
        windrad_container(path)
            .with_array("C_band/wind_speed_selected", &SHAPE, constant(CELLS, 10.28))
            .with_array_attr("C_band/wind_speed_selected", "Slope", 0.0)
            .with_array_attr("C_band/millisecond_count", "Slope", 0.0),
    );
    let mut reader = open(&source, path, FormatId::WindradHdf);
    reader.load(Some("C_band"), true).unwrap();

    let record = reader.record().unwrap();
    assert_approx_eq!(record.max_speed().unwrap(), SPEED_KNOTS, 0.01);
    // Raw milliseconds pass through unchanged
    assert_eq!(record.wvc_time().at(1, 1), Some(t(0, 4, 0)));
}

#[test]
fn test_windrad_day_slope_ignored() {
    let path = "/fixtures/windrad_slope.HDF";
    let source = MemorySource::new().with(
        windrad_container(path)
            .with_array_attr("C_band/day_count", "Slope", 2.0)
            .with_array_attr("C_band/day_count", "Intercept", 1.0),
    );
    let mut reader = open(&source, path, FormatId::WindradHdf);
    reader.load(Some("C_band"), true).unwrap();
    let first = reader.record().unwrap().wvc_time().at(0, 0);
    assert_eq!(first, Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()));
}

#[test]
fn test_windrad_time_shape_mismatch() {
    let path = "/fixtures/windrad_short.HDF";
    let source = MemorySource::new().with(windrad_container(path).with_array(
        "C_band/millisecond_count",
        &[3],
        constant(3, 0.0),
    ));
    let mut reader = open(&source, path, FormatId::WindradHdf);
    match reader.load(Some("C_band"), true) {
        Err(ReaderError::Decode { source, .. }) => {
            assert!(matches!(source, DecodeError::ShapeMismatch { .. }))
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_windrad_10km_resolution() {
    let path = "/fixtures/windrad_10km.HDF";
    let rows = 2201;
    let n = rows * 3;
    let shape = [rows, 3];
    let (lat, lon) = test_utils::lat_lon_grid(rows, 3, -60.0, 100.0, 0.05);
    let b = "Ku_band_10km";
    let p = |name: &str| format!("{}/{}", b, name);
    let source = MemorySource::new().with(
        windrad_container(path)
            .with_array(&p("day_count"), &shape, constant(n, 8765.0))
            .with_array(&p("millisecond_count"), &shape, constant(n, 43_200_000.0))
            .with_array(&p("wind_speed_selected"), &shape, constant(n, 1028.0))
            .with_array(&p("wind_dir_selected"), &shape, constant(n, 900.0))
            .with_array(&p("wvc_quality_flag"), &shape, constant(n, 0.0))
            .with_array(&p("wvc_lat"), &shape, lat)
            .with_array(&p("wvc_lon"), &shape, lon),
    );
    let mut reader = open(&source, path, FormatId::WindradHdf);
    reader.load(Some(b), true).unwrap();
    assert_eq!(reader.resolution().unwrap(), "10.0 KM");
    assert_eq!(reader.record().unwrap().shape(), (rows, 3));
}

#[test]
fn test_windrad_daily_grid() {
    let reader = loaded(files::WINDRAD_GLL, FormatId::WindradHdf, Some("Ku_band"));
    // Fixture flags are all set; daily grids skip QC
    assert_uniform_wind(&reader);
    assert_eq!(reader.resolution().unwrap(), "25.0 KM (Daily)");
}
