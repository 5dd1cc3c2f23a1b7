use std::fs;

use vmaudit_core::OrphanRow;
use vmaudit_engine::{
    ensure_output_dir, render_report, write_report, AtomicFileWriter, ExportOptions, ReportFormat,
};
use tempfile::TempDir;

fn rows() -> Vec<OrphanRow> {
    vec![OrphanRow {
        datastore: "ds1".into(),
        folder: "old vm".into(),
        file: "disk;1.vmdk".into(),
        size_bytes: 512,
        modified: "2024-01-01T00:00:00Z".into(),
    }]
}

#[test]
fn delimited_report_uses_configured_delimiter() {
    let options = ExportOptions {
        format: ReportFormat::Delimited,
        delimiter: ';',
    };
    let text = render_report(&rows(), &options).unwrap();
    assert_eq!(
        text,
        "Datastore;Folder;File;SizeBytes;Modified\nds1;old vm;\"disk;1.vmdk\";512;2024-01-01T00:00:00Z\n"
    );
}

#[test]
fn json_report_uses_column_names() {
    let options = ExportOptions {
        format: ReportFormat::Json,
        ..ExportOptions::default()
    };
    let text = render_report(&rows(), &options).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value[0]["Datastore"], "ds1");
    assert_eq!(value[0]["SizeBytes"], 512);
    assert_eq!(ReportFormat::Json.extension(), "json");
}

#[test]
fn write_report_creates_missing_directory() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("reports").join("orphans.csv");

    let written = write_report(&target, &rows(), &ExportOptions::default()).unwrap();

    assert_eq!(written, target);
    let content = fs::read_to_string(&written).unwrap();
    assert!(content.starts_with("Datastore,Folder,File,SizeBytes,Modified\n"));
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("report.csv", "a").unwrap();
    let second = writer.write("report.csv", "b").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "b");
}

#[test]
fn output_dir_that_is_a_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    assert!(ensure_output_dir(&file_path).is_err());
    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("report.csv", "data").is_err());
}
