use harpin_upload::{render_error, render_summary};
use harpin_upload_core::contract::Source;
use harpin_upload_core::error::UploadError;
use harpin_upload_core::ingest::UploadReport;
use std::time::Duration;

#[test]
fn summary_reports_file_records_and_duration() {
    let report = UploadReport {
        source_id: "vMiY4q".into(),
        upload_id: "u-1".into(),
        file_name: "data_2026_01_06.csv".into(),
        file_size: 10 * 1024 * 1024,
        total_records: 100,
        imported_records: 100,
        duration: Duration::from_millis(12_340),
    };

    let summary = render_summary(&report);

    assert!(summary.contains("UPLOAD SUMMARY"));
    assert!(summary.contains("✓ File: data_2026_01_06.csv"));
    assert!(summary.contains("✓ Total Records: 100"));
    assert!(summary.contains("✓ Imported Records: 100"));
    assert!(summary.contains("✓ Duration: 12.3 seconds"));
}

#[test]
fn unknown_source_error_lists_eligible_sources() {
    let err = UploadError::SourceNotFound {
        source_id: "nope".into(),
        source_system: "flatFile".into(),
        available: vec![Source {
            id: Some("A".into()),
            name: Some("Alpha".into()),
            source_system: Some("flatFile".into()),
        }],
    };

    let rendered = render_error(&err);

    assert!(rendered.starts_with("✗ invalid source ID: nope"));
    assert!(rendered.contains("ID: A, Name: Alpha"));
}

#[test]
fn unknown_source_error_without_candidates_says_so() {
    let err = UploadError::SourceNotFound {
        source_id: "nope".into(),
        source_system: "flatFile".into(),
        available: Vec::new(),
    };

    assert!(render_error(&err).contains("No flatFile sources available"));
}

#[test]
fn unknown_source_error_names_the_configured_source_system() {
    let err = UploadError::SourceNotFound {
        source_id: "nope".into(),
        source_system: "sftp".into(),
        available: Vec::new(),
    };

    let rendered = render_error(&err);

    assert!(rendered.contains("No sftp sources available"));
    assert!(!rendered.contains("flatFile"));
}
