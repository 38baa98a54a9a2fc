use pretty_assertions::assert_eq;
use pulse_server::config::{ModelKind, StorageBackend, CONFIG_PATH_VAR};
use pulse_server::{ConfigError, ServiceConfig};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn required() -> Vec<(&'static str, &'static str)> {
    vec![
        ("BASE_IMAGE_PATH", "https://storage.googleapis.com/pulse-charts/"),
        ("BUCKET_NAME", "pulse-charts"),
    ]
}

#[test]
fn test_env_only() {
    let mut pairs = required();
    pairs.extend([
        ("PORT", "9090"),
        ("STORAGE_BACKEND", "memory"),
        ("FORECAST_MODEL", "Naive"),
        ("TRAINING_TIMEOUT_SECS", "30"),
    ]);
    let config = ServiceConfig::from_sources(&vars(&pairs)).unwrap();

    assert_eq!(config.port, 9090);
    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.storage_backend, StorageBackend::Memory);
    assert_eq!(config.forecast_model, ModelKind::Naive);
    assert_eq!(config.training_timeout_secs, 30);
    assert_eq!(config.bucket_name, "pulse-charts");
}

#[test]
fn test_missing_required_values() {
    let result = ServiceConfig::from_sources(&vars(&[("BUCKET_NAME", "pulse-charts")]));
    assert_eq!(result.unwrap_err(), ConfigError::Missing("BASE_IMAGE_PATH"));

    let result = ServiceConfig::from_sources(&vars(&[
        ("BASE_IMAGE_PATH", "https://example.com/"),
        ("BUCKET_NAME", "  "),
    ]));
    assert_eq!(result.unwrap_err(), ConfigError::Missing("BUCKET_NAME"));
}

#[test]
fn test_invalid_values() {
    let mut pairs = required();
    pairs.push(("PORT", "eighty"));
    assert!(matches!(
        ServiceConfig::from_sources(&vars(&pairs)),
        Err(ConfigError::Invalid { key, .. }) if key == "PORT"
    ));

    let mut pairs = required();
    pairs.push(("STORAGE_BACKEND", "s3"));
    assert!(matches!(
        ServiceConfig::from_sources(&vars(&pairs)),
        Err(ConfigError::Invalid { key, .. }) if key == "STORAGE_BACKEND"
    ));

    let mut pairs = required();
    pairs.push(("TRAINING_TIMEOUT_SECS", "0"));
    assert!(matches!(
        ServiceConfig::from_sources(&vars(&pairs)),
        Err(ConfigError::Invalid { .. })
    ));
}

#[test]
fn test_local_backend_needs_directory() {
    let mut pairs = required();
    pairs.push(("STORAGE_BACKEND", "local"));
    assert_eq!(
        ServiceConfig::from_sources(&vars(&pairs)).unwrap_err(),
        ConfigError::Missing("LOCAL_STORAGE_DIR")
    );

    pairs.push(("LOCAL_STORAGE_DIR", "/var/lib/pulse"));
    let config = ServiceConfig::from_sources(&vars(&pairs)).unwrap();
    assert_eq!(config.local_storage_dir, Some(PathBuf::from("/var/lib/pulse")));
}

#[test]
fn test_toml_file_with_env_override() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
base_image_path = "https://cdn.example.com/charts/"
bucket_name = "from-file"
port = 7000
storage_backend = "memory"
forecast_model = "naive"
"#
    )
    .unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let config = ServiceConfig::from_sources(&vars(&[
        (CONFIG_PATH_VAR, path.as_str()),
        ("PORT", "7001"),
    ]))
    .unwrap();

    assert_eq!(config.base_image_path, "https://cdn.example.com/charts/");
    assert_eq!(config.bucket_name, "from-file");
    assert_eq!(config.port, 7001);
    assert_eq!(config.storage_backend, StorageBackend::Memory);
    assert_eq!(config.training_timeout_secs, 120);
}

#[test]
fn test_unreadable_and_invalid_files() {
    let result = ServiceConfig::from_sources(&vars(&[(CONFIG_PATH_VAR, "/nonexistent/pulse.toml")]));
    assert!(matches!(result, Err(ConfigError::IoError(_))));

    let result = ServiceConfig::from_toml_str("port = \"not a number\"");
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}
