// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Prefix for engine settings, e.g. `LINTEL_MAX_PAGE_SIZE`.
pub const DEFAULT_ENV_PREFIX: &str = "LINTEL";

/// Reads `PREFIX_KEY` variables as lowercase `key` entries.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Loader for the `LINTEL_` namespace.
    pub fn lintel() -> Self {
        Self::new(Some(DEFAULT_ENV_PREFIX.to_string()))
    }

    /// Map a variable name to a config key, or `None` if it is outside the prefix.
    pub fn config_key(&self, var: &str) -> Option<String> {
        match &self.prefix {
            Some(prefix) => var
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .filter(|rest| !rest.is_empty())
                .map(str::to_lowercase),
            None => Some(var.to_lowercase()),
        }
    }

    /// All variables in the namespace.
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.collect(env::vars()))
    }

    /// Same as [`load`](Self::load) over an explicit variable list.
    pub fn collect<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter_map(|(var, value)| self.config_key(&var).map(|key| (key, value)))
            .collect()
    }

    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };
        env::var(&full_key).map_err(ConfigError::EnvError)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::lintel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_config_key_requires_separator() {
        let loader = EnvLoader::lintel();
        assert_eq!(
            loader.config_key("LINTEL_MAX_PAGE_SIZE"),
            Some("max_page_size".to_string())
        );
        assert_eq!(loader.config_key("LINTELX_PORT"), None);
        assert_eq!(loader.config_key("LINTEL_"), None);
        assert_eq!(loader.config_key("PATH"), None);
    }

    #[test]
    fn test_collect_filters_namespace() {
        let loader = EnvLoader::lintel();
        let config = loader.collect(vars(&[
            ("LINTEL_PORT", "8080"),
            ("LINTEL_API_KEY_HEADER", "X-Key"),
            ("HOME", "/root"),
        ]));
        assert_eq!(config.len(), 2);
        assert_eq!(config.get("port").map(String::as_str), Some("8080"));
        assert_eq!(config.get("api_key_header").map(String::as_str), Some("X-Key"));
    }

    #[test]
    fn test_no_prefix_keeps_everything() {
        let loader = EnvLoader::new(None);
        let config = loader.collect(vars(&[("HOME", "/root")]));
        assert_eq!(config.get("home").map(String::as_str), Some("/root"));
    }

    #[test]
    fn test_load_var_or_default() {
        let loader = EnvLoader::lintel();
        assert_eq!(loader.load_var_or("NONEXISTENT_VAR_12345", "fallback"), "fallback");
        assert!(loader.load_var("MISSING_VAR_67890").is_err());
    }
}
