// Configuration management for the Lintel engine

pub mod builder;
pub mod engine;
pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use builder::ConfigBuilder;
pub use engine::{CachingSettings, EngineConfig};
pub use env::{DEFAULT_ENV_PREFIX, EnvLoader};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Flat key/value store filled from files and the environment.
///
/// Later loads override earlier ones key by key.
#[derive(Clone, Default)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, Value>>>,
    env: EnvLoader,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::default(),
            env: EnvLoader::new(Some(prefix.into())),
        }
    }

    pub fn load_env(&self) -> Result<()> {
        let vars = self.env.load()?;
        self.insert_strings(vars);
        Ok(())
    }

    /// Read a `.env` file without touching the process environment.
    /// Without a path, a missing `.env` in the working directory is ignored.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        let iter = match path {
            Some(path) => dotenvy::from_path_iter(path)
                .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?,
            None => match dotenvy::dotenv_iter() {
                Ok(iter) => iter,
                Err(err) if err.not_found() => {
                    lintel_log::debug!("no .env file found");
                    return Ok(());
                }
                Err(err) => return Err(ConfigError::LoadError(err.to_string())),
            },
        };

        let mut vars = Vec::new();
        for item in iter {
            vars.push(item.map_err(|e| ConfigError::ParseError(e.to_string()))?);
        }
        self.insert_strings(self.env.collect(vars));
        Ok(())
    }

    /// Load a file, picking the format from its name.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = ConfigLoader::auto(path)?.format();
        self.load_file_as(path, format)
    }

    pub fn load_file_as(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path.as_ref())?;
        lintel_log::debug!("loaded configuration from {}", path.as_ref().display());
        self.insert_object(data);
        Ok(())
    }

    pub fn load_str(&self, content: &str, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).parse(content)?;
        self.insert_object(data);
        Ok(())
    }

    fn insert_object(&self, data: Value) {
        if let Value::Object(map) = data {
            self.config.write().extend(map);
        }
    }

    fn insert_strings(&self, vars: impl IntoIterator<Item = (String, String)>) {
        let mut config = self.config.write();
        for (key, value) in vars {
            config.insert(key, Value::String(value));
        }
    }

    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        self.config.write().insert(key.to_string(), json_value);
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.lookup(key)?
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))
    }

    /// `Ok(None)` when absent. String values from the environment are
    /// reinterpreted as JSON scalars when the target type needs it.
    pub fn lookup<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(value) = self.config.read().get(key).cloned() else {
            return Ok(None);
        };

        let coerced = match serde_json::from_value::<T>(value.clone()) {
            Ok(parsed) => parsed,
            Err(err) => match &value {
                Value::String(raw) => serde_json::from_str::<T>(raw.trim())
                    .map_err(|_| ConfigError::invalid(key, err.to_string()))?,
                _ => return Err(ConfigError::invalid(key, err.to_string())),
            },
        };
        Ok(Some(coerced))
    }

    /// A list given either as an array or as a comma-separated string.
    pub fn get_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        let Some(value) = self.config.read().get(key).cloned() else {
            return Ok(None);
        };
        match value {
            Value::String(raw) => Ok(Some(
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            )),
            other => serde_json::from_value(other)
                .map(Some)
                .map_err(|e| ConfigError::invalid(key, e.to_string())),
        }
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.lookup(key).ok().flatten().unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.config.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.config.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Copy every entry of `other` over this manager's.
    pub fn merge(&self, other: &ConfigManager) {
        let entries: Vec<(String, Value)> = other
            .config
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.config.write().extend(entries);
    }

    /// Deserialize the whole store into `T` and validate it.
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let object: serde_json::Map<String, Value> = self
            .config
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let validated: T = serde_json::from_value(Value::Object(object))
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        validated.validate()?;
        Ok(validated)
    }

    pub fn engine_config(&self) -> Result<EngineConfig> {
        EngineConfig::from_manager(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let manager = ConfigManager::new();
        manager.set("api_key_header", "X-Key").unwrap();

        let value: String = manager.get("api_key_header").unwrap();
        assert_eq!(value, "X-Key");
    }

    #[test]
    fn test_missing_key() {
        let manager = ConfigManager::new();
        assert!(matches!(
            manager.get::<String>("missing"),
            Err(ConfigError::KeyNotFound(_))
        ));
        assert_eq!(manager.lookup::<u64>("missing").unwrap(), None);
        assert_eq!(manager.get_or("missing", 7u64), 7);
    }

    #[test]
    fn test_string_values_coerced() {
        let manager = ConfigManager::new();
        manager.set("max_page_size", "50").unwrap();
        manager.set("flag", "true").unwrap();

        assert_eq!(manager.get::<u64>("max_page_size").unwrap(), 50);
        assert!(manager.get_bool("flag").unwrap());
        assert_eq!(manager.get_string("max_page_size").unwrap(), "50");
    }

    #[test]
    fn test_uncoercible_value_is_invalid() {
        let manager = ConfigManager::new();
        manager.set("port", "eighty").unwrap();
        assert!(matches!(
            manager.get::<u16>("port"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_get_list_accepts_both_shapes() {
        let manager = ConfigManager::new();
        manager.set("a", "public, max-age").unwrap();
        manager.set("b", vec!["no-store"]).unwrap();

        assert_eq!(
            manager.get_list("a").unwrap(),
            Some(vec!["public".to_string(), "max-age".to_string()])
        );
        assert_eq!(manager.get_list("b").unwrap(), Some(vec!["no-store".to_string()]));
    }

    #[test]
    fn test_later_loads_override() {
        let manager = ConfigManager::new();
        manager
            .load_str(r#"{"port": 8080, "api_key_header": "X-A"}"#, FileFormat::Json)
            .unwrap();
        manager.load_str("port = 9090", FileFormat::Toml).unwrap();

        assert_eq!(manager.get::<u16>("port").unwrap(), 9090);
        assert_eq!(manager.get_string("api_key_header").unwrap(), "X-A");
        assert_eq!(manager.keys(), vec!["api_key_header", "port"]);
    }

    #[test]
    fn test_merge() {
        let base = ConfigManager::new();
        base.set("port", 1).unwrap();
        let other = ConfigManager::new();
        other.set("port", 2).unwrap();

        base.merge(&other);
        assert_eq!(base.get_int("port").unwrap(), 2);
    }
}
