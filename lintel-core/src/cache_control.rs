//! `Cache-Control` rendering and caching policies (RFC 7234).
//!
//! ```
//! use lintel_core::cache_control::CacheControl;
//!
//! let cc = CacheControl::new().public().max_age(3600).shared_max_age(600);
//! assert_eq!(cc.to_string(), "public, max-age=3600, s-maxage=600");
//!
//! assert_eq!(CacheControl::deactivate().to_string(), "no-cache, no-store, no-transform");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// One year, the conventional "never expires" lifetime.
pub const CACHE_FOREVER_SECONDS: u64 = 31_536_000;

/// Cache-Control directives.
///
/// `no_store` and `no_cache` suppress both durations; `private` suppresses
/// `s-maxage`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheControl {
    pub public: bool,
    pub private: bool,
    pub must_revalidate: bool,
    pub no_cache: bool,
    pub no_store: bool,
    pub no_transform: bool,
    /// Seconds; zero means unset.
    pub max_age: u64,
    /// Seconds; zero means unset.
    pub shared_max_age: u64,
}

impl CacheControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// `no-cache, no-store, no-transform`
    pub fn deactivate() -> Self {
        Self::new().no_cache().no_store().no_transform()
    }

    /// `max-age=31536000`
    pub fn cache_forever() -> Self {
        Self::new().max_age(CACHE_FOREVER_SECONDS)
    }

    /// `no-cache, no-store`, used for collections.
    pub fn uncacheable() -> Self {
        Self::new().no_cache().no_store()
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    pub fn must_revalidate(mut self) -> Self {
        self.must_revalidate = true;
        self
    }

    pub fn no_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }

    pub fn no_store(mut self) -> Self {
        self.no_store = true;
        self
    }

    pub fn no_transform(mut self) -> Self {
        self.no_transform = true;
        self
    }

    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = seconds;
        self
    }

    pub fn shared_max_age(mut self, seconds: u64) -> Self {
        self.shared_max_age = seconds;
        self
    }

    /// Directives in emission order, invariants applied.
    pub fn directives(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (set, name) in [
            (self.public, "public"),
            (self.private, "private"),
            (self.must_revalidate, "must-revalidate"),
            (self.no_cache, "no-cache"),
            (self.no_store, "no-store"),
            (self.no_transform, "no-transform"),
        ] {
            if set {
                out.push(name.to_string());
            }
        }

        let durations_allowed = !self.no_store && !self.no_cache;
        if durations_allowed && self.max_age > 0 {
            out.push(format!("max-age={}", self.max_age));
        }
        if durations_allowed && !self.private && self.shared_max_age > 0 {
            out.push(format!("s-maxage={}", self.shared_max_age));
        }
        out
    }

    pub fn to_header_value(&self) -> String {
        self.directives().join(", ")
    }

    pub fn is_empty(&self) -> bool {
        self.directives().is_empty()
    }
}

impl fmt::Display for CacheControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

/// Which caching headers a GET response carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachingPolicy {
    /// `Cache-Control: no-cache, no-store, no-transform`
    #[default]
    Deactivate,
    /// Directives plus an `Expires` header `max_age` seconds ahead.
    Expires,
    /// Directives plus `ETag`.
    ValidateByEtag,
    /// Directives plus `Last-Modified`.
    ValidateByTimestamp,
}

impl CachingPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "deactivate" => Some(CachingPolicy::Deactivate),
            "expires" => Some(CachingPolicy::Expires),
            "validate_by_etag" | "etag" => Some(CachingPolicy::ValidateByEtag),
            "validate_by_timestamp" | "timestamp" => Some(CachingPolicy::ValidateByTimestamp),
            _ => None,
        }
    }

    pub fn uses_etag(&self) -> bool {
        matches!(self, CachingPolicy::ValidateByEtag)
    }

    pub fn uses_timestamp(&self) -> bool {
        matches!(self, CachingPolicy::ValidateByTimestamp)
    }
}

/// A policy together with the directives it renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachingConfig {
    pub policy: CachingPolicy,
    pub directives: CacheControl,
}

impl CachingConfig {
    pub fn deactivate() -> Self {
        Self::default()
    }

    pub fn expires(directives: CacheControl) -> Self {
        Self {
            policy: CachingPolicy::Expires,
            directives,
        }
    }

    pub fn validate_by_etag(directives: CacheControl) -> Self {
        Self {
            policy: CachingPolicy::ValidateByEtag,
            directives,
        }
    }

    pub fn validate_by_timestamp(directives: CacheControl) -> Self {
        Self {
            policy: CachingPolicy::ValidateByTimestamp,
            directives,
        }
    }

    /// The `Cache-Control` value this configuration emits.
    pub fn cache_control(&self) -> CacheControl {
        match self.policy {
            CachingPolicy::Deactivate => CacheControl::deactivate(),
            _ => self.directives.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_renders_nothing() {
        assert_eq!(CacheControl::new().to_string(), "");
        assert!(CacheControl::new().is_empty());
    }

    #[test]
    fn test_fixed_emission_order() {
        let cc = CacheControl::new()
            .shared_max_age(60)
            .max_age(120)
            .no_transform()
            .must_revalidate()
            .public();
        assert_eq!(
            cc.to_string(),
            "public, must-revalidate, no-transform, max-age=120, s-maxage=60"
        );
    }

    #[test]
    fn test_presets() {
        assert_eq!(
            CacheControl::deactivate().to_string(),
            "no-cache, no-store, no-transform"
        );
        assert_eq!(CacheControl::cache_forever().to_string(), "max-age=31536000");
        assert_eq!(CacheControl::uncacheable().to_string(), "no-cache, no-store");
    }

    #[test]
    fn test_no_store_suppresses_durations() {
        let cc = CacheControl::new().no_store().max_age(3600).shared_max_age(600);
        let rendered = cc.to_string();
        assert_eq!(rendered, "no-store");
        assert!(!rendered.contains("max-age"));
        assert!(!rendered.contains("s-maxage"));
    }

    #[test]
    fn test_no_cache_suppresses_durations() {
        let cc = CacheControl::new().no_cache().max_age(10).shared_max_age(10);
        assert_eq!(cc.to_string(), "no-cache");
    }

    #[test]
    fn test_private_suppresses_shared_max_age() {
        let cc = CacheControl::new().private().max_age(300).shared_max_age(600);
        assert_eq!(cc.to_string(), "private, max-age=300");
    }

    #[test]
    fn test_zero_durations_omitted() {
        let cc = CacheControl::new().public().max_age(0);
        assert_eq!(cc.to_string(), "public");
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            CachingPolicy::parse("validate-by-etag"),
            Some(CachingPolicy::ValidateByEtag)
        );
        assert_eq!(CachingPolicy::parse("EXPIRES"), Some(CachingPolicy::Expires));
        assert_eq!(CachingPolicy::parse("forever"), None);
    }

    #[test]
    fn test_deactivate_policy_ignores_directives() {
        let config = CachingConfig {
            policy: CachingPolicy::Deactivate,
            directives: CacheControl::new().public().max_age(60),
        };
        assert_eq!(config.cache_control(), CacheControl::deactivate());
    }

    #[test]
    fn test_caching_config_deserializes() {
        let config: CachingConfig = serde_json::from_value(serde_json::json!({
            "policy": "validate_by_etag",
            "directives": {"private": true, "max_age": 30}
        }))
        .unwrap();
        assert_eq!(config.policy, CachingPolicy::ValidateByEtag);
        assert_eq!(config.cache_control().to_string(), "private, max-age=30");
    }
}
