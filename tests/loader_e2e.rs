//! Loader tests against a real preprocessor process.

#![cfg(unix)]

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::tempdir;

use lpjml_config::{
    ConfigError, ConfigLoader, ExternalError, LoadOptions, LoaderConfig, ValidationError,
};

/// A preprocessor that substitutes `@SIM@` in the source. The shell gets
/// the macros as `$0..` and the source path as the last argument.
fn sed_config() -> LoaderConfig {
    LoaderConfig {
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            r#"for last; do :; done; sed "s/@SIM@/\"expanded\"/" "$last""#.to_string(),
        ],
        timeout: Some(Duration::from_secs(10)),
        ..LoaderConfig::default()
    }
}

fn template(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("lpjml.js");
    fs::write(&path, "{\"sim_name\": @SIM@, \"firstyear\": 1901, \"outputvar\": []}\n").unwrap();
    path
}

#[test]
fn test_template_is_expanded_by_preprocessor() {
    let dir = tempdir().unwrap();
    let source = template(dir.path());
    let loader = ConfigLoader::new(sed_config()).unwrap();

    let desc = loader.load(&source, &LoadOptions::new()).unwrap();
    assert_eq!(desc.sim_name(), Some("expanded"));
    assert_eq!(desc.firstyear().unwrap(), 1901);
}

#[test]
fn test_serialized_source_is_read_directly() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("config_historic.json");
    fs::write(&source, r#"{"sim_name": "historic"}"#).unwrap();

    // `false` would fail if it were ever run.
    let config = LoaderConfig {
        program: "false".to_string(),
        args: Vec::new(),
        ..LoaderConfig::default()
    };
    let desc = ConfigLoader::new(config).unwrap().load(&source, &LoadOptions::new()).unwrap();
    assert_eq!(desc.sim_name(), Some("historic"));
}

#[test]
fn test_preprocessor_failure_is_reported() {
    let dir = tempdir().unwrap();
    let source = template(dir.path());
    let config = LoaderConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), "echo 'lpjml.js:3: missing include' >&2; exit 2".to_string()],
        ..LoaderConfig::default()
    };

    let err = ConfigLoader::new(config).unwrap().load(&source, &LoadOptions::new()).unwrap_err();
    match err {
        ConfigError::External(ExternalError::Preprocess { status, stderr, .. }) => {
            assert!(status.contains('2'), "{status}");
            assert_eq!(stderr, "lpjml.js:3: missing include");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_preprocessor_timeout() {
    let dir = tempdir().unwrap();
    let source = template(dir.path());
    let config = LoaderConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), "sleep 30".to_string()],
        timeout: Some(Duration::from_millis(200)),
        ..LoaderConfig::default()
    };

    let err = ConfigLoader::new(config).unwrap().load(&source, &LoadOptions::new()).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::External(ExternalError::PreprocessTimeout { duration_ms: 200, .. })
    ));
}

#[test]
fn test_invalid_macro_is_rejected_before_running() {
    let dir = tempdir().unwrap();
    let source = template(dir.path());
    let loader = ConfigLoader::new(sed_config()).unwrap();

    let err = loader
        .load(&source, &LoadOptions::new().macro_def("FROM_RESTART"))
        .unwrap_err();
    assert!(matches!(
        err.as_validation(),
        Some(ValidationError::InvalidMacro { value }) if value == "FROM_RESTART"
    ));
}
