//! Integration tests for lintel-config

use lintel_config::*;
use lintel_core::CachingPolicy;
use std::env;
use std::fs;
use std::path::PathBuf;

fn scratch_file(name: &str, content: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("lintel-config-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_builder_loads_toml_file() {
    let path = scratch_file(
        "engine.toml",
        r#"
        max_page_size = 40
        port = 8081

        [default_caching]
        policy = "validate_by_timestamp"
        directives = ["public"]
        max_age = 300
        "#,
    );

    let config = ConfigBuilder::new().add_file(&path).build_engine_config().unwrap();
    assert_eq!(config.max_page_size, 40);
    assert_eq!(config.port, 8081);

    let defaults = config.to_defaults().unwrap();
    assert_eq!(defaults.caching.policy, CachingPolicy::ValidateByTimestamp);
    assert_eq!(defaults.caching.directives.to_header_value(), "public, max-age=300");
}

#[test]
fn test_dotenv_overrides_file_without_touching_env() {
    let toml = scratch_file("layered.toml", "api_key_header = \"X-From-File\"\n");
    let dotenv = scratch_file("layered.env", "LINTEL_API_KEY_HEADER=X-From-Dotenv\n");

    let defaults = ConfigBuilder::new()
        .add_file(&toml)
        .load_dotenv(Some(dotenv))
        .build_defaults()
        .unwrap();

    assert_eq!(defaults.api_key_header, "X-From-Dotenv");
    assert!(env::var("LINTEL_API_KEY_HEADER").is_err());
}

#[test]
fn test_env_overrides_everything() {
    let toml = scratch_file("env.toml", "default_page_size = 5\n");
    unsafe {
        env::set_var("LINTELTEST_DEFAULT_PAGE_SIZE", "7");
    }

    let config = ConfigBuilder::new()
        .with_prefix("LINTELTEST")
        .add_file(&toml)
        .load_env()
        .build_engine_config()
        .unwrap();
    assert_eq!(config.default_page_size, 7);

    unsafe {
        env::remove_var("LINTELTEST_DEFAULT_PAGE_SIZE");
    }
}

#[test]
fn test_invalid_file_reports_parse_error() {
    let path = scratch_file("broken.json", "{ not json");
    let err = ConfigBuilder::new().add_file(&path).build().err().unwrap();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
fn test_unknown_extension_rejected() {
    let path = scratch_file("engine.yaml", "port: 1");
    let err = ConfigBuilder::new().add_file(&path).build().err().unwrap();
    assert!(matches!(err, ConfigError::LoadError(_)));
}

#[test]
fn test_invalid_values_surface_key() {
    let manager = ConfigManager::new();
    manager.set("max_page_size", "lots").unwrap();
    let err = manager.engine_config().unwrap_err();
    assert!(err.to_string().contains("max_page_size"));
}

#[test]
fn test_config_error_display() {
    let err = ConfigError::ParseError("test_key".to_string());
    assert!(format!("{}", err).contains("test_key"));
}
