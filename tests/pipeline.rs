#![cfg(unix)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use safe2tiff::config::{ConverterConfig, FailurePolicy};
use safe2tiff::{Config, Pipeline, PipelineError};
use tempfile::tempdir;

fn create_zip(dir: &Path, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
    let zip_path = dir.join(name);
    let mut writer = zip::ZipWriter::new(File::create(&zip_path).unwrap());
    let options = zip::write::SimpleFileOptions::default();

    for (entry_name, content) in files {
        writer.start_file(entry_name.to_string(), options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
    zip_path
}

/// Converter that appends "<input> <outdir>" to calls.log in the output directory.
fn logging_converter(script: &str) -> ConverterConfig {
    ConverterConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        search_path_var: None,
        working_dir: None,
    }
}

const LOG_CALL: &str = r#"echo "$0 $1" >> "$1/calls.log""#;

#[test]
fn converts_every_measurement_file_once() {
    let zips = tempdir().unwrap();
    let out = tempdir().unwrap();
    let staging = tempdir().unwrap();

    create_zip(
        zips.path(),
        "a.zip",
        &[("X.SAFE/measurement/s1a-foo.nc", b"foo")],
    );
    create_zip(
        zips.path(),
        "b.zip",
        &[("Y.SAFE/measurement/s1b-bar.nc", b"bar")],
    );

    let config = Config::default()
        .with_staging_root(staging.path())
        .with_shared_staging(true)
        .with_converter(logging_converter(LOG_CALL));
    let report = Pipeline::new(config)
        .run(zips.path(), out.path())
        .unwrap();

    let log = fs::read_to_string(out.path().join("calls.log")).unwrap();
    let expected = format!(
        "{} {}\n{} {}\n",
        staging.path().join("X.SAFE/measurement/s1a-foo.nc").display(),
        out.path().display(),
        staging.path().join("Y.SAFE/measurement/s1b-bar.nc").display(),
        out.path().display(),
    );
    assert_eq!(log, expected);
    assert_eq!(report.conversions.len(), 2);
    assert!(report.succeeded());
}

#[test]
fn failing_converter_under_each_policy() {
    let zips = tempdir().unwrap();
    let staging = tempdir().unwrap();
    create_zip(
        zips.path(),
        "a.zip",
        &[
            ("X.SAFE/measurement/s1a-foo.nc", b"foo"),
            ("X.SAFE/measurement/s1a-baz.nc", b"baz"),
        ],
    );
    let failing = r#"echo "$0" >> "$1/calls.log"; echo "cannot read $0" >&2; exit 1"#;

    let config = |policy| {
        Config::default()
            .with_staging_root(staging.path())
            .with_converter(logging_converter(failing))
            .with_on_failure(policy)
    };
    let calls = |out: &Path| {
        fs::read_to_string(out.join("calls.log"))
            .unwrap()
            .lines()
            .count()
    };

    let out = tempdir().unwrap();
    let failure = Pipeline::new(config(FailurePolicy::Abort))
        .run(zips.path(), out.path())
        .unwrap_err();
    assert!(matches!(failure.error, PipelineError::Dispatch(_)));
    assert_eq!(calls(out.path()), 1);
    assert!(failure.report.conversions[0].stderr.starts_with("cannot read"));

    let out = tempdir().unwrap();
    let report = Pipeline::new(config(FailurePolicy::Continue))
        .run(zips.path(), out.path())
        .unwrap();
    assert_eq!(calls(out.path()), 2);
    assert!(!report.succeeded());

    let out = tempdir().unwrap();
    let report = Pipeline::new(config(FailurePolicy::Ignore))
        .run(zips.path(), out.path())
        .unwrap();
    assert_eq!(calls(out.path()), 2);
    assert!(report.succeeded());
}

#[test]
fn search_path_is_extended_with_working_dir() {
    let zips = tempdir().unwrap();
    let out = tempdir().unwrap();
    let workdir = tempdir().unwrap();
    create_zip(
        zips.path(),
        "a.zip",
        &[("X.SAFE/measurement/s1a-foo.nc", b"foo")],
    );

    let converter = ConverterConfig {
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            r#"echo "$SAFE2TIFF_TEST_PATH" > "$1/path.txt""#.to_string(),
        ],
        search_path_var: Some("SAFE2TIFF_TEST_PATH".to_string()),
        working_dir: Some(workdir.path().to_path_buf()),
    };
    let config = Config::default()
        .with_staging_root(zips.path().join("staging"))
        .with_converter(converter);
    Pipeline::new(config).run(zips.path(), out.path()).unwrap();

    let value = fs::read_to_string(out.path().join("path.txt")).unwrap();
    assert_eq!(value.trim_end(), workdir.path().display().to_string());
}

#[test]
fn missing_converter_is_fatal() {
    let zips = tempdir().unwrap();
    let out = tempdir().unwrap();
    create_zip(
        zips.path(),
        "a.zip",
        &[("X.SAFE/measurement/s1a-foo.nc", b"foo")],
    );

    let config = Config::default()
        .with_staging_root(zips.path().join("staging"))
        .with_on_failure(FailurePolicy::Ignore)
        .with_converter(ConverterConfig {
            program: "/nonexistent/nc2tiff".to_string(),
            ..ConverterConfig::default()
        });
    let failure = Pipeline::new(config)
        .run(zips.path(), out.path())
        .unwrap_err();

    assert!(matches!(failure.error, PipelineError::Dispatch(_)));
}
