//! ETags and conditional request evaluation (RFC 7232).
//!
//! [`evaluate`] compares the client's validators with the resource's current
//! ones. The two lifecycle call sites wrap it with their own meaning:
//!
//! - [`is_resource_unchanged`] - GET with `If-None-Match` / `If-Modified-Since`;
//!   `true` means answer `304 Not Modified`.
//! - [`client_has_current_version`] - PUT/DELETE with `If-Match` /
//!   `If-Unmodified-Since`; `false` means answer `412 Precondition Failed`.
//!
//! ```
//! use lintel_core::conditional::{evaluate, ETag};
//! use std::time::{Duration, SystemTime};
//!
//! let etag = ETag::strong("abc");
//! let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
//! assert!(evaluate(Some(&etag), Some(modified), Some("\"abc\""), None));
//! assert!(!evaluate(Some(&etag), Some(modified), None, Some("not-a-valid-date")));
//! ```

use crate::HttpRequest;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// ============================================================================
// ETag
// ============================================================================

/// An HTTP entity tag, strong (`"abc"`) or weak (`W/"abc"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ETag {
    pub value: String,
    pub weak: bool,
}

impl ETag {
    pub fn strong(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            weak: false,
        }
    }

    pub fn weak(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            weak: true,
        }
    }

    /// Parse a single quoted entity tag.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (weak, quoted) = match s.strip_prefix("W/").or_else(|| s.strip_prefix("w/")) {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let value = quoted.strip_prefix('"')?.strip_suffix('"')?;
        Some(Self {
            value: value.to_string(),
            weak,
        })
    }

    /// Strong tag from a hash of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        data.hash(&mut hasher);
        Self::strong(format!("{:x}", hasher.finish()))
    }

    /// Content hash of a model's JSON serialization.
    pub fn from_model<T: Serialize>(model: &T) -> Result<Self, crate::Error> {
        let bytes =
            serde_json::to_vec(model).map_err(|e| crate::Error::Serialization(e.to_string()))?;
        Ok(Self::from_bytes(&bytes))
    }

    pub fn to_header_value(&self) -> String {
        if self.weak {
            format!("W/\"{}\"", self.value)
        } else {
            format!("\"{}\"", self.value)
        }
    }

    /// Both tags strong with identical values.
    pub fn strong_match(&self, other: &ETag) -> bool {
        !self.weak && !other.weak && self.value == other.value
    }

    /// Identical values, weakness ignored.
    pub fn weak_match(&self, other: &ETag) -> bool {
        self.value == other.value
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

/// The entity tags of an `If-Match` / `If-None-Match` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ETagList {
    pub etags: Vec<ETag>,
    /// The header was `*`.
    pub any: bool,
}

impl ETagList {
    pub fn parse(header: &str) -> Self {
        let header = header.trim();
        if header == "*" {
            return Self {
                etags: Vec::new(),
                any: true,
            };
        }
        Self {
            etags: header.split(',').filter_map(ETag::parse).collect(),
            any: false,
        }
    }

    pub fn contains_weak(&self, etag: &ETag) -> bool {
        self.any || self.etags.iter().any(|e| e.weak_match(etag))
    }

    pub fn contains_strong(&self, etag: &ETag) -> bool {
        if self.any {
            return !etag.weak;
        }
        self.etags.iter().any(|e| e.strong_match(etag))
    }

    pub fn is_empty(&self) -> bool {
        !self.any && self.etags.is_empty()
    }
}

// ============================================================================
// Validators
// ============================================================================

/// The current state fingerprint of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validator {
    pub etag: Option<ETag>,
    pub last_modified: Option<SystemTime>,
}

impl Validator {
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// Conditional headers exactly as the client sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientValidators {
    pub if_match: Option<String>,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
    pub if_unmodified_since: Option<String>,
}

impl ClientValidators {
    pub fn from_request(request: &HttpRequest) -> Self {
        let get = |name: &str| request.header(name).map(str::to_string);
        Self {
            if_match: get("if-match"),
            if_none_match: get("if-none-match"),
            if_modified_since: get("if-modified-since"),
            if_unmodified_since: get("if-unmodified-since"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Weak,
    Strong,
}

fn etag_matches(current: &ETag, client: &str, comparison: Comparison) -> bool {
    let client = client.trim();
    if client == current.to_header_value() {
        return match comparison {
            Comparison::Weak => true,
            Comparison::Strong => !current.weak,
        };
    }
    let list = ETagList::parse(client);
    match comparison {
        Comparison::Weak => list.contains_weak(current),
        Comparison::Strong => list.contains_strong(current),
    }
}

fn truncate_to_seconds(time: SystemTime) -> SystemTime {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    UNIX_EPOCH + Duration::from_secs(secs)
}

/// HTTP dates carry whole seconds; compare at that resolution.
fn date_is_later(current_last_modified: Option<SystemTime>, client_date: Option<&str>) -> bool {
    let (Some(last_modified), Some(raw)) = (current_last_modified, client_date) else {
        return false;
    };
    match httpdate::parse_http_date(raw.trim()) {
        Ok(client) => client > truncate_to_seconds(last_modified),
        Err(_) => false,
    }
}

fn evaluate_with(
    comparison: Comparison,
    current_etag: Option<&ETag>,
    current_last_modified: Option<SystemTime>,
    client_etag: Option<&str>,
    client_date: Option<&str>,
) -> bool {
    let etag_hit = match (current_etag, client_etag) {
        (Some(current), Some(client)) => etag_matches(current, client, comparison),
        _ => false,
    };
    etag_hit || date_is_later(current_last_modified, client_date)
}

/// True when the client's entity tag matches the current one, or the client
/// date parses and is strictly later than the current modification time.
///
/// A date that fails to parse never satisfies the condition.
pub fn evaluate(
    current_etag: Option<&ETag>,
    current_last_modified: Option<SystemTime>,
    client_etag: Option<&str>,
    client_date: Option<&str>,
) -> bool {
    evaluate_with(
        Comparison::Weak,
        current_etag,
        current_last_modified,
        client_etag,
        client_date,
    )
}

/// GET: whether the client's cached copy is still current, i.e. answer 304.
///
/// Requests without `If-None-Match` and `If-Modified-Since` are never unchanged.
pub fn is_resource_unchanged(validator: &Validator, client: &ClientValidators) -> bool {
    if client.if_none_match.is_none() && client.if_modified_since.is_none() {
        return false;
    }
    evaluate(
        validator.etag.as_ref(),
        validator.last_modified,
        client.if_none_match.as_deref(),
        client.if_modified_since.as_deref(),
    )
}

/// PUT/DELETE: whether the client edited the current version, i.e. may proceed.
///
/// Unconditional requests (no `If-Match`, no `If-Unmodified-Since`) proceed.
/// `If-Match` uses strong comparison.
pub fn client_has_current_version(validator: &Validator, client: &ClientValidators) -> bool {
    if client.if_match.is_none() && client.if_unmodified_since.is_none() {
        return true;
    }
    evaluate_with(
        Comparison::Strong,
        validator.etag.as_ref(),
        validator.last_modified,
        client.if_match.as_deref(),
        client.if_unmodified_since.as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn http_date(secs: u64) -> String {
        httpdate::fmt_http_date(at(secs))
    }

    #[test]
    fn test_etag_parse() {
        assert_eq!(ETag::parse("\"abc\""), Some(ETag::strong("abc")));
        assert_eq!(ETag::parse(" W/\"abc\" "), Some(ETag::weak("abc")));
        assert_eq!(ETag::parse("abc"), None);
    }

    #[test]
    fn test_etag_header_value() {
        assert_eq!(ETag::strong("v1").to_header_value(), "\"v1\"");
        assert_eq!(ETag::weak("v1").to_string(), "W/\"v1\"");
    }

    #[test]
    fn test_etag_from_model_is_deterministic() {
        let a = ETag::from_model(&serde_json::json!({"id": 1, "name": "ada"})).unwrap();
        let b = ETag::from_model(&serde_json::json!({"id": 1, "name": "ada"})).unwrap();
        let c = ETag::from_model(&serde_json::json!({"id": 1, "name": "bob"})).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.weak);
    }

    #[test]
    fn test_etag_list() {
        let list = ETagList::parse("\"a\", W/\"b\"");
        assert_eq!(list.etags.len(), 2);
        assert!(list.contains_weak(&ETag::strong("b")));
        assert!(!list.contains_strong(&ETag::strong("b")));
        assert!(ETagList::parse("*").contains_strong(&ETag::strong("zzz")));
        assert!(ETagList::parse("").is_empty());
    }

    #[test]
    fn test_equal_etag_always_true() {
        let etag = ETag::strong("same");
        let header = etag.to_header_value();
        assert!(evaluate(Some(&etag), Some(at(1_000)), Some(&header), None));
        assert!(evaluate(
            Some(&etag),
            Some(at(1_000)),
            Some(&header),
            Some(&http_date(10))
        ));
        assert!(evaluate(
            Some(&etag),
            Some(at(1_000)),
            Some(&header),
            Some("garbage")
        ));
    }

    #[test]
    fn test_later_date_true_despite_etag_mismatch() {
        let current = ETag::strong("a");
        assert!(evaluate(
            Some(&current),
            Some(at(1_700_000_000)),
            Some("\"b\""),
            Some(&http_date(1_700_000_060)),
        ));
    }

    #[test]
    fn test_date_must_be_strictly_later() {
        assert!(!evaluate(
            None,
            Some(at(1_700_000_000)),
            None,
            Some(&http_date(1_700_000_000))
        ));
        assert!(!evaluate(
            None,
            Some(at(1_700_000_000)),
            None,
            Some(&http_date(1_699_999_000))
        ));
    }

    #[test]
    fn test_subsecond_modification_time_is_truncated() {
        let modified = at(1_700_000_000) + Duration::from_millis(750);
        assert!(evaluate(
            None,
            Some(modified),
            None,
            Some(&http_date(1_700_000_001))
        ));
    }

    #[test]
    fn test_malformed_date_is_false() {
        let etag = ETag::strong("e");
        assert!(!evaluate(
            Some(&etag),
            Some(at(1_000)),
            None,
            Some("not-a-valid-date")
        ));
    }

    #[test]
    fn test_unchanged_requires_client_validators() {
        let validator = Validator {
            etag: Some(ETag::strong("e")),
            last_modified: Some(at(1_000)),
        };
        assert!(!is_resource_unchanged(&validator, &ClientValidators::default()));

        let client = ClientValidators {
            if_none_match: Some("\"e\"".to_string()),
            ..Default::default()
        };
        assert!(is_resource_unchanged(&validator, &client));

        let weak_client = ClientValidators {
            if_none_match: Some("W/\"e\"".to_string()),
            ..Default::default()
        };
        assert!(is_resource_unchanged(&validator, &weak_client));
    }

    #[test]
    fn test_current_version_for_unconditional_request() {
        let validator = Validator {
            etag: Some(ETag::strong("e")),
            last_modified: None,
        };
        assert!(client_has_current_version(
            &validator,
            &ClientValidators::default()
        ));
    }

    #[test]
    fn test_current_version_uses_strong_comparison() {
        let validator = Validator {
            etag: Some(ETag::strong("e")),
            last_modified: None,
        };
        let weak = ClientValidators {
            if_match: Some("W/\"e\"".to_string()),
            ..Default::default()
        };
        assert!(!client_has_current_version(&validator, &weak));

        let strong = ClientValidators {
            if_match: Some("\"x\", \"e\"".to_string()),
            ..Default::default()
        };
        assert!(client_has_current_version(&validator, &strong));
    }

    #[test]
    fn test_unmodified_since_earlier_than_stored_fails() {
        let validator = Validator {
            etag: None,
            last_modified: Some(at(1_700_000_000)),
        };
        let client = ClientValidators {
            if_unmodified_since: Some(http_date(1_600_000_000)),
            ..Default::default()
        };
        assert!(!client_has_current_version(&validator, &client));
    }

    #[test]
    fn test_client_validators_from_request() {
        let request = HttpRequest::new("PUT", "/users/1")
            .with_header("If-Match", "\"abc\"")
            .with_header("If-Unmodified-Since", "Sun, 06 Nov 1994 08:49:37 GMT");
        let client = ClientValidators::from_request(&request);
        assert_eq!(client.if_match.as_deref(), Some("\"abc\""));
        assert!(client.if_none_match.is_none());
        assert!(client.if_unmodified_since.is_some());
    }
}
