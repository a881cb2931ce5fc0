// Layered configuration assembly

use crate::{ConfigManager, EngineConfig, Result};
use lintel_core::EngineDefaults;
use std::path::PathBuf;

/// Assembles a [`ConfigManager`] from files, then `.env`, then the
/// process environment. Each layer overrides the previous ones.
pub struct ConfigBuilder {
    prefix: String,
    files: Vec<PathBuf>,
    dotenv: Option<Option<PathBuf>>,
    load_env: bool,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            prefix: crate::DEFAULT_ENV_PREFIX.to_string(),
            files: Vec::new(),
            dotenv: None,
            load_env: false,
        }
    }

    /// Environment prefix, `LINTEL` by default.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn add_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Read a `.env` file; `None` looks for one in the working directory.
    pub fn load_dotenv(mut self, path: Option<PathBuf>) -> Self {
        self.dotenv = Some(path);
        self
    }

    pub fn load_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn build(self) -> Result<ConfigManager> {
        let manager = ConfigManager::with_prefix(self.prefix);

        for path in &self.files {
            manager.load_file(path)?;
        }
        if let Some(path) = &self.dotenv {
            manager.load_dotenv(path.as_deref())?;
        }
        if self.load_env {
            manager.load_env()?;
        }

        lintel_log::debug!("configuration assembled with {} keys", manager.keys().len());
        Ok(manager)
    }

    pub fn build_engine_config(self) -> Result<EngineConfig> {
        self.build()?.engine_config()
    }

    pub fn build_defaults(self) -> Result<EngineDefaults> {
        self.build_engine_config()?.to_defaults()
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
