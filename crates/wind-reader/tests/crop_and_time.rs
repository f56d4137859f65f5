//! Cropping, nearest-time lookup and longitude normalization.

use std::path::Path;

use chrono::{TimeZone, Utc};
use test_utils::{
    assert_coords_approx_eq, ascat_container, constant, cscat_container, files, fixture_source,
    init_test_tracing, CELLS, SHAPE,
};
use wind_container::MemorySource;
use wind_reader::{FormatId, GeoBox, ObsTimes, ReaderError, WindReader};

fn loaded(path: &str, format: FormatId) -> WindReader {
    init_test_tracing();
    let mut reader = WindReader::open_with(&fixture_source(), Path::new(path), format)
        .expect("fixture should open");
    reader.load(None, true).expect("fixture should load");
    reader
}

/// `(lon, lat)` of one cell of the loaded record.
fn cell_coords(reader: &WindReader, row: usize, col: usize) -> (f64, f64) {
    let (lons, lats) = reader.get_lonlats().expect("record should be loaded");
    let lon = *lons.get(row, col).expect("cell should exist");
    let lat = *lats.get(row, col).expect("cell should exist");
    (lon, lat)
}

fn area(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> GeoBox {
    GeoBox::new(lat_min, lat_max, lon_min, lon_max).expect("valid box")
}

// =============================================================================
// Crop
// =============================================================================

#[test]
fn test_crop_to_sub_rectangle() {
    let mut reader = loaded(files::ASCAT, FormatId::AscatNc);
    reader.crop(&area(10.5, 12.0, 100.5, 101.5)).unwrap();

    let record = reader.record().unwrap();
    assert_eq!(record.shape(), (2, 1));
    assert_coords_approx_eq!(cell_coords(&reader, 0, 0), (101.0, 11.0), 1e-9);
    assert_coords_approx_eq!(cell_coords(&reader, 1, 0), (101.0, 12.0), 1e-9);
    assert_eq!(record.wind_dir().v.shape(), (2, 1));
    // Per-cell times follow the crop: cells (1,1) and (2,1)
    let times = record.wvc_time();
    assert_eq!(times.len(), 2);
    assert_eq!(
        times.at(0, 0),
        Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 4, 0).unwrap())
    );
    assert_eq!(
        record.summary().observed_range,
        Some((
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 4, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 7, 0).unwrap(),
        ))
    );
}

#[test]
fn test_crop_edges_inclusive() {
    let mut reader = loaded(files::ASCAT, FormatId::AscatNc);
    reader.crop(&area(10.0, 11.0, 101.0, 102.0)).unwrap();
    assert_eq!(reader.record().unwrap().shape(), (2, 2));
}

#[test]
fn test_crop_then_wider_box_is_noop() {
    let mut reader = loaded(files::ASCAT, FormatId::AscatNc);
    reader.crop(&area(10.5, 11.5, 100.5, 101.5)).unwrap();
    let before = reader.record().unwrap().summary();

    reader.crop(&GeoBox::global()).unwrap();
    let after = reader.record().unwrap().summary();
    assert_eq!(before, after);
    assert_eq!(after.rows, 1);
    assert_eq!(after.cols, 1);
    assert_coords_approx_eq!(cell_coords(&reader, 0, 0), (101.0, 11.0), 1e-9);
}

#[test]
fn test_crop_without_cells_gives_empty_record() {
    let mut reader = loaded(files::ASCAT, FormatId::AscatNc);
    reader.crop(&area(-40.0, -30.0, 0.0, 10.0)).unwrap();

    let record = reader.record().unwrap();
    assert!(record.is_empty());
    assert_eq!(record.shape(), (0, 0));
    assert_eq!(record.max_speed(), None);
    assert_eq!(record.summary().observed_range, None);
    assert!(record.wvc_time().is_empty());
}

#[test]
fn test_crop_per_row_times() {
    let mut reader = loaded(files::CSCAT, FormatId::CscatNc);
    reader.crop(&area(11.0, 12.0, 100.0, 100.0)).unwrap();

    let record = reader.record().unwrap();
    assert_eq!(record.shape(), (2, 1));
    match record.wvc_time() {
        ObsTimes::PerRow(rows) => {
            assert_eq!(rows.len(), 2);
            assert_eq!(
                rows[0],
                Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap())
            );
        }
        other => panic!("expected per-row times, got {:?}", other),
    }
}

#[test]
fn test_crop_keeps_masking() {
    let path = "/fixtures/ascat_gap.nc";
    let source = MemorySource::new().with(ascat_container(path).with_masked_array(
        "wind_speed",
        &SHAPE,
        (0..CELLS).map(|i| if i == 4 { None } else { Some(10.28) }).collect(),
    ));
    let mut reader = WindReader::open_with(&source, Path::new(path), FormatId::AscatNc).unwrap();
    reader.load(None, true).unwrap();
    reader.crop(&area(11.0, 11.0, 100.0, 101.0)).unwrap();

    let (speed, _) = reader.get_values().unwrap();
    assert_eq!(speed.shape(), (1, 2));
    assert!(speed.get(0, 0).unwrap().is_some());
    assert_eq!(speed.get(0, 1), Some(&None));
}

#[test]
fn test_crop_before_load() {
    let mut reader =
        WindReader::open_with(&fixture_source(), Path::new(files::ASCAT), FormatId::AscatNc)
            .unwrap();
    assert!(matches!(
        reader.crop(&GeoBox::global()),
        Err(ReaderError::NotLoaded)
    ));
    assert!(matches!(
        reader.nearest_time(&GeoBox::global()),
        Err(ReaderError::NotLoaded)
    ));
    assert!(matches!(reader.get_lonlats(), Err(ReaderError::NotLoaded)));
}

#[test]
fn test_reload_after_crop_restores_full_record() {
    let mut reader = loaded(files::ASCAT, FormatId::AscatNc);
    reader.crop(&area(10.0, 10.0, 100.0, 100.0)).unwrap();
    assert_eq!(reader.record().unwrap().shape(), (1, 1));
    reader.load(None, true).unwrap();
    assert_eq!(reader.record().unwrap().shape(), (3, 3));
}

// =============================================================================
// Nearest time
// =============================================================================

#[test]
fn test_nearest_time_centre_cell() {
    let reader = loaded(files::ASCAT, FormatId::AscatNc);
    let time = reader.nearest_time(&area(10.5, 11.5, 100.5, 101.5)).unwrap();
    assert_eq!(time, Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 4, 0).unwrap()));
}

#[test]
fn test_nearest_time_empty_box() {
    let reader = loaded(files::ASCAT, FormatId::AscatNc);
    assert_eq!(reader.nearest_time(&area(50.0, 60.0, 0.0, 10.0)).unwrap(), None);
}

#[test]
fn test_nearest_time_last_tie_wins() {
    // Centre (11, 101.5) is equally close to (1,1) and (1,2)
    let reader = loaded(files::ASCAT, FormatId::AscatNc);
    let time = reader.nearest_time(&area(10.0, 12.0, 101.0, 102.0)).unwrap();
    assert_eq!(time, Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap()));
}

#[test]
fn test_nearest_time_null_timestamp() {
    let path = "/fixtures/cscat_no_time.nc";
    let source = MemorySource::new().with(cscat_container(path).with_text(
        "row_time",
        &[3],
        vec![String::new(), String::new(), String::new()],
    ));
    let mut reader = WindReader::open_with(&source, Path::new(path), FormatId::CscatNc).unwrap();
    reader.load(None, true).unwrap();
    assert_eq!(reader.nearest_time(&GeoBox::global()).unwrap(), None);
}

// =============================================================================
// Longitudes and bounds cache
// =============================================================================

#[test]
fn test_normalize_longitudes() {
    let path = "/fixtures/ascat_west.nc";
    let lon: Vec<f64> = constant(CELLS, -10.0);
    let source = MemorySource::new().with(ascat_container(path).with_array("lon", &SHAPE, lon));
    let mut reader = WindReader::open_with(&source, Path::new(path), FormatId::AscatNc).unwrap();
    reader.load(None, true).unwrap();

    assert_eq!(reader.bounds(&area(10.0, 12.0, 340.0, 360.0)).unwrap(), None);
    assert_eq!(reader.normalize_longitudes().unwrap(), CELLS);
    assert_coords_approx_eq!(cell_coords(&reader, 0, 0), (350.0, 10.0), 1e-9);
    // The cached miss for this box was dropped
    assert!(reader.bounds(&area(10.0, 12.0, 340.0, 360.0)).unwrap().is_some());
    assert_eq!(reader.normalize_longitudes().unwrap(), 0);
}

#[test]
fn test_bounds_cache_hits() {
    let mut reader = loaded(files::ASCAT, FormatId::AscatNc);
    let a = area(10.0, 11.0, 100.0, 101.0);

    let first = reader.bounds(&a).unwrap();
    let second = reader.bounds(&a).unwrap();
    assert_eq!(first, second);
    let stats = reader.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.capacity, 2);

    reader.crop(&a).unwrap();
    assert_eq!(reader.cache_stats().entries, 0);
}

#[test]
fn test_cache_size_configurable() {
    let reader = WindReader::open_with(&fixture_source(), Path::new(files::ASCAT), FormatId::AscatNc)
        .unwrap()
        .with_cache_size(8);
    assert_eq!(reader.cache_stats().capacity, 8);
}
