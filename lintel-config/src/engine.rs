// Engine-wide defaults

use crate::{ConfigError, ConfigManager, ConfigValidator, Result, Validate};
use lintel_core::{
    CacheControl, CachingConfig, CachingPolicy, DEFAULT_API_KEY_HEADER, DEFAULT_PAGE_SIZE,
    EngineDefaults, MAX_PAGE_SIZE, PagingLimits,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3000;

const DIRECTIVES: [&str; 6] = [
    "public",
    "private",
    "must-revalidate",
    "no-cache",
    "no-store",
    "no-transform",
];

/// Caching applied to resources that do not configure their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachingSettings {
    /// `deactivate`, `expires`, `validate_by_etag` or `validate_by_timestamp`.
    pub policy: String,
    /// Flag directives such as `public` or `must-revalidate`.
    pub directives: Vec<String>,
    pub max_age: u64,
    pub shared_max_age: u64,
}

impl Default for CachingSettings {
    fn default() -> Self {
        Self {
            policy: "deactivate".to_string(),
            directives: Vec::new(),
            max_age: 0,
            shared_max_age: 0,
        }
    }
}

impl CachingSettings {
    pub fn to_caching_config(&self) -> Result<CachingConfig> {
        let policy = CachingPolicy::parse(&self.policy)
            .ok_or_else(|| ConfigError::invalid("default_caching.policy", &self.policy))?;

        let mut directives = CacheControl::new();
        for directive in &self.directives {
            directives = match directive.trim().to_ascii_lowercase().as_str() {
                "public" => directives.public(),
                "private" => directives.private(),
                "must-revalidate" => directives.must_revalidate(),
                "no-cache" => directives.no_cache(),
                "no-store" => directives.no_store(),
                "no-transform" => directives.no_transform(),
                other => {
                    return Err(ConfigError::invalid(
                        "default_caching.directives",
                        format!("unknown directive `{}`", other),
                    ));
                }
            };
        }
        directives.max_age = self.max_age;
        directives.shared_max_age = self.shared_max_age;

        Ok(CachingConfig { policy, directives })
    }
}

/// Engine configuration as read from files and `LINTEL_*` variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub default_page_size: u64,
    /// Zero leaves client page sizes unbounded.
    pub max_page_size: u64,
    pub api_key_header: String,
    pub default_caching: CachingSettings,
    pub port: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            default_caching: CachingSettings::default(),
            port: DEFAULT_PORT,
        }
    }
}

impl EngineConfig {
    /// Read from a manager. Nested `default_caching` tables and flat
    /// `caching_*` keys are both understood; flat keys win.
    pub fn from_manager(manager: &ConfigManager) -> Result<Self> {
        let mut config = Self::default();

        if let Some(size) = manager.lookup("default_page_size")? {
            config.default_page_size = size;
        }
        if let Some(size) = manager.lookup("max_page_size")? {
            config.max_page_size = size;
        }
        if let Some(header) = manager.lookup("api_key_header")? {
            config.api_key_header = header;
        }
        if let Some(port) = manager.lookup("port")? {
            config.port = port;
        }
        if let Some(caching) = manager.lookup("default_caching")? {
            config.default_caching = caching;
        }

        let caching = &mut config.default_caching;
        if let Some(policy) = manager.lookup("caching_policy")? {
            caching.policy = policy;
        }
        if let Some(directives) = manager.get_list("caching_directives")? {
            caching.directives = directives;
        }
        if let Some(max_age) = manager.lookup("caching_max_age")? {
            caching.max_age = max_age;
        }
        if let Some(shared) = manager.lookup("caching_shared_max_age")? {
            caching.shared_max_age = shared;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn to_defaults(&self) -> Result<EngineDefaults> {
        self.validate()?;
        Ok(EngineDefaults {
            paging: PagingLimits {
                default_size: self.default_page_size,
                max_size: self.max_page_size,
            },
            api_key_header: self.api_key_header.clone(),
            caching: self.default_caching.to_caching_config()?,
        })
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        ConfigValidator::at_least(self.default_page_size, 1, "default_page_size")?;
        if self.max_page_size > 0 {
            ConfigValidator::in_range(
                self.default_page_size,
                1,
                self.max_page_size,
                "default_page_size",
            )?;
        }
        ConfigValidator::is_header_name(&self.api_key_header, "api_key_header")?;
        ConfigValidator::is_port(self.port, "port")?;

        if CachingPolicy::parse(&self.default_caching.policy).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "default_caching.policy must be one of [deactivate, expires, validate_by_etag, validate_by_timestamp], got {}",
                self.default_caching.policy
            )));
        }
        for directive in &self.default_caching.directives {
            let directive = directive.trim().to_ascii_lowercase();
            ConfigValidator::one_of(
                &directive.as_str(),
                &DIRECTIVES,
                "default_caching.directives",
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileFormat;

    #[test]
    fn test_defaults_match_engine() {
        let defaults = EngineConfig::default().to_defaults().unwrap();
        assert_eq!(defaults, EngineDefaults::default());
    }

    #[test]
    fn test_from_toml() {
        let manager = ConfigManager::new();
        manager
            .load_str(
                r#"
                default_page_size = 10
                max_page_size = 50
                api_key_header = "X-Service-Key"

                [default_caching]
                policy = "validate_by_etag"
                directives = ["must-revalidate"]
                max_age = 60
            "#,
                FileFormat::Toml,
            )
            .unwrap();

        let config = manager.engine_config().unwrap();
        let defaults = config.to_defaults().unwrap();
        assert_eq!(defaults.paging.default_size, 10);
        assert_eq!(defaults.paging.max_size, 50);
        assert_eq!(defaults.api_key_header, "X-Service-Key");
        assert_eq!(defaults.caching.policy, CachingPolicy::ValidateByEtag);
        assert_eq!(
            defaults.caching.directives.to_header_value(),
            "must-revalidate, max-age=60"
        );
    }

    #[test]
    fn test_flat_keys_from_env_strings() {
        let manager = ConfigManager::new();
        manager
            .load_str(
                "LINTEL_MAX_PAGE_SIZE=30\nLINTEL_CACHING_POLICY=expires\nLINTEL_CACHING_DIRECTIVES=public,no-transform\nLINTEL_CACHING_MAX_AGE=120\n",
                FileFormat::Env,
            )
            .unwrap();

        let config = manager.engine_config().unwrap();
        assert_eq!(config.max_page_size, 30);
        assert_eq!(config.default_caching.policy, "expires");
        let caching = config.default_caching.to_caching_config().unwrap();
        assert_eq!(caching.policy, CachingPolicy::Expires);
        assert_eq!(
            caching.directives.to_header_value(),
            "public, no-transform, max-age=120"
        );
    }

    #[test]
    fn test_default_larger_than_max_rejected() {
        let config = EngineConfig {
            default_page_size: 200,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unbounded_max() {
        let config = EngineConfig {
            default_page_size: 500,
            max_page_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_policy_and_directive_rejected() {
        let mut config = EngineConfig::default();
        config.default_caching.policy = "forever".to_string();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.default_caching.directives = vec!["immutable".to_string()];
        assert!(config.to_defaults().is_err());
    }

    #[test]
    fn test_bad_header_name_rejected() {
        let config = EngineConfig {
            api_key_header: "X Key".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
