mod common;

use common::{file_names, kml_document, overlay_kmz, write_kmz, BAY_AREA_QUAD};
use kmz2geotiff::{convert_directory, BatchDriver, CancelFlag, ConverterConfig};

const SMALL_QUAD: &str = "10.0,50.0 10.01,50.0 10.01,49.99 10.0,49.99";

#[test]
fn test_batch_run_and_log() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    // Created in reverse order; the log must still list A before B
    overlay_kmz(dir.path(), "B.kmz", SMALL_QUAD, 32, 32);
    overlay_kmz(dir.path(), "A.kmz", BAY_AREA_QUAD, 40, 20);
    let broken = kml_document(None, Some("overlay.png"));
    write_kmz(dir.path(), "broken.kmz", &[("doc.kml", broken.as_bytes())]);
    std::fs::write(dir.path().join("readme.txt"), b"ignored").unwrap();

    let mut config = ConverterConfig::new(dir.path());
    config.jobs = 2;
    let output_dir = config.output_dir.clone();
    let log_path = config.log_file_path();

    let result = convert_directory(config.clone()).expect("Batch run failed");
    println!("{}", result);

    let mut successful = result.successful.clone();
    successful.sort();
    assert_eq!(successful, vec!["A", "B"]);
    assert!(result.skipped.is_empty());
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].0, "broken");
    assert!(result.failed[0].1.contains("LatLonQuad"));

    assert_eq!(file_names(&output_dir), vec!["A.tif", "B.tif", "conversion_log.txt"]);

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.starts_with("\n--- Conversion on "));
    let names: Vec<&str> = log
        .lines()
        .filter(|l| !l.is_empty() && !l.starts_with("---"))
        .collect();
    assert_eq!(names, vec!["A", "B"]);

    // Second run: converted archives are skipped, the broken one is retried
    let rerun = convert_directory(config).expect("Second batch run failed");
    let mut skipped = rerun.skipped.clone();
    skipped.sort();
    assert_eq!(skipped, vec!["A", "B"]);
    assert!(rerun.successful.is_empty());
    assert_eq!(rerun.failed.len(), 1);

    // Nothing new converted, so no new log section
    assert_eq!(std::fs::read_to_string(&log_path).unwrap(), log);
}

#[test]
fn test_empty_input_directory() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConverterConfig::new(dir.path());
    let log_path = config.log_file_path();

    let result = convert_directory(config).unwrap();
    assert!(result.is_empty());
    assert!(!log_path.exists());
}

#[test]
fn test_missing_input_directory_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConverterConfig::new(dir.path().join("nope"));
    assert!(BatchDriver::new(config).is_err());
}

#[test]
fn test_shared_cancel_flag() {
    let dir = tempfile::tempdir().unwrap();
    overlay_kmz(dir.path(), "only.kmz", SMALL_QUAD, 16, 16);

    let cancel = CancelFlag::new();
    let driver = BatchDriver::new(ConverterConfig::new(dir.path()))
        .unwrap()
        .with_cancel_flag(cancel.clone());

    cancel.cancel();
    let result = driver.run().unwrap();
    assert_eq!(result.cancelled, vec!["only"]);
    assert!(!driver.config().output_dir.join("only.tif").exists());
}
