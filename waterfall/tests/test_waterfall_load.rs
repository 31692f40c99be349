use std::io::Write;
use std::num::NonZeroUsize;

use tempfile::NamedTempFile;
use waterfall::analysis::{size_bucket_index, TimeWindow, WindowMode, OVERFLOW_BUCKET};
use waterfall::domain::{AllocationEvent, LoadError};
use waterfall::export::AggregateExport;
use waterfall::model::WaterfallModel;
use waterfall::source::CsvSource;

fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).expect("Failed to write temp file");
    file.flush().unwrap();
    file
}

fn width(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[test]
fn test_load_skips_malformed_lines() {
    let file = csv_file("timestamp_ms,size_bytes\n0,10\n# comment\n1,10\n\n5000,70000\n1,2,3\n");
    let events = CsvSource::new(file.path()).load_once().expect("load succeeds");

    assert_eq!(
        events,
        vec![
            AllocationEvent::new(0.0, 10),
            AllocationEvent::new(1.0, 10),
            AllocationEvent::new(5000.0, 70_000),
        ]
    );
}

#[test]
fn test_load_without_events_is_an_error() {
    let empty = csv_file("");
    assert!(matches!(
        CsvSource::new(empty.path()).load_once(),
        Err(LoadError::NoEvents { skipped: 0, .. })
    ));

    let header_only = csv_file("time,size\nnot,numbers\n");
    assert!(matches!(
        CsvSource::new(header_only.path()).load_once(),
        Err(LoadError::NoEvents { skipped: 2, .. })
    ));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = CsvSource::new(dir.path().join("missing.csv")).load_once().unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
    assert!(err.to_string().contains("missing.csv"));
}

#[test]
fn test_loaded_file_aggregates_statically() {
    let file = csv_file("0,10\n1,10\n5000,70000\n");
    let mut model = WaterfallModel::default();
    model.set_data(CsvSource::new(file.path()).load_once().unwrap());

    let result = model.refresh(width(2));

    assert_eq!(result.window, Some(TimeWindow::new(0.0, 5000.0)));
    assert_eq!(result.stats.time_bucket_width_ms, 2500.0);
    assert_eq!(result.histogram.get(0, size_bucket_index(10)), 2);
    assert_eq!(result.histogram.get(1, size_bucket_index(70_000)), 1);
    assert_eq!(result.stats.total_allocations, 3);
    assert_eq!(result.stats.total_size_bytes, 70_020);
    assert_eq!(result.stats.max_size_bytes, 70_000);
    assert_eq!(result.stats.max_bucket_count, 2);
}

#[test]
fn test_huge_allocation_lands_in_overflow_row() {
    let file = csv_file("0,4294967296\n10,8\n");
    let mut model = WaterfallModel::default();
    model.set_data(CsvSource::new(file.path()).load_once().unwrap());

    let result = model.refresh(width(10));
    assert_eq!(result.histogram.get(0, OVERFLOW_BUCKET), 1);
    assert_eq!(result.stats.max_size_bytes, 4_294_967_296);
}

#[test]
fn test_export_to_file() {
    let file = csv_file("0,10\n1,10\n5000,70000\n");
    let mut model = WaterfallModel::default();
    model.set_data(CsvSource::new(file.path()).load_once().unwrap());
    let result = model.refresh(width(2));

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("aggregate.json");
    AggregateExport::new(&result, WindowMode::Static, 2).write_to_path(&out).unwrap();

    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).expect("Invalid JSON");
    assert_eq!(parsed["mode"], "static");
    assert_eq!(parsed["display_width"], 2);
    assert_eq!(parsed["window"]["end_ms"], 5000.0);
    assert_eq!(parsed["stats"]["max_bucket_count"], 2);
    assert_eq!(parsed["cells"].as_array().map(Vec::len), Some(2));
}
