use std::fs;
use std::path::PathBuf;

use assert_matches::assert_matches;

use sratools_driver::config::{ConfigLoader, DEFAULT_RESOLVER_URL, DEFAULT_TIMEOUT_SECS};
use sratools_driver::error::DriverError;

#[test]
fn loads_every_key_from_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("config.json");
    fs::write(
        &path,
        r#"{
            "resolver_url": "https://locate.example.org/sdl/2/retrieve",
            "tool_directory": "/opt/sra/libexec",
            "remote_disabled": true,
            "ce_token": "token-123",
            "timeout_secs": 5
        }"#,
    )
    .unwrap();

    let config = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(config.resolver_url, "https://locate.example.org/sdl/2/retrieve");
    assert_eq!(config.tool_directory, Some(PathBuf::from("/opt/sra/libexec")));
    assert!(config.remote_disabled);
    assert_eq!(config.ce_token.as_deref(), Some("token-123"));
    assert_eq!(config.timeout_secs, 5);
}

#[test]
fn partial_file_keeps_defaults() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("config.json");
    fs::write(&path, r#"{ "ce_token": "abc" }"#).unwrap();

    let config = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(config.resolver_url, DEFAULT_RESOLVER_URL);
    assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    assert!(!config.remote_disabled);
    assert_eq!(config.tool_directory, None);
}

#[test]
fn invalid_json_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("config.json");
    fs::write(&path, "{ resolver_url = 1 }").unwrap();

    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, DriverError::ConfigParse(_));
}
