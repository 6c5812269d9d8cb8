use archive_fs::{ConfigStore, Error};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TestConfig {
    name: String,
    count: i32,
}

#[test]
fn test_load_toml() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("config.toml");
    fs::write(&file_path, "name = \"test\"\ncount = 42\n").unwrap();

    let config: TestConfig = ConfigStore::new().load(&file_path).unwrap();

    assert_eq!(
        config,
        TestConfig {
            name: "test".into(),
            count: 42
        }
    );
}

#[test]
fn test_load_json() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("config.json");
    fs::write(&file_path, r#"{"name": "test", "count": 42}"#).unwrap();

    let config: TestConfig = ConfigStore::new().load(&file_path).unwrap();

    assert_eq!(config.count, 42);
}

#[test]
fn test_save_then_load_toml() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join(".archive").join("config.toml");
    let store = ConfigStore::new();

    store
        .save(
            &file_path,
            &TestConfig {
                name: "saved".into(),
                count: 7,
            },
        )
        .unwrap();

    let raw = fs::read_to_string(&file_path).unwrap();
    assert!(raw.contains("name = \"saved\""));
    let loaded: TestConfig = store.load(&file_path).unwrap();
    assert_eq!(loaded.count, 7);
}

#[test]
fn test_unsupported_extension() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("config.ini");
    fs::write(&file_path, "name=x").unwrap();

    let err = ConfigStore::new().load::<TestConfig>(&file_path).unwrap_err();

    assert!(matches!(err, Error::UnsupportedFormat { extension } if extension == "ini"));
}

#[test]
fn test_parse_error_names_format() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("config.toml");
    fs::write(&file_path, "name = ").unwrap();

    let err = ConfigStore::new().load::<TestConfig>(&file_path).unwrap_err();

    assert!(err.to_string().contains("TOML"));
}
