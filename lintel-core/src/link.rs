//! Hypermedia link relations and URI templates.
//!
//! Each [`LinkRelation`] renders to one `Link` header value:
//! `<uri>;rel="name"` or `<uri>;rel="name";type="media/type"`.
//!
//! ```
//! use lintel_core::link::{LinkRelation, UriTemplate};
//!
//! let template = UriTemplate::new("/users/{id}/orders");
//! let href = template.expand(&["42"]).unwrap();
//! let link = LinkRelation::new(href, "orders").with_type("application/json");
//! assert_eq!(link.to_string(), "</users/42/orders>;rel=\"orders\";type=\"application/json\"");
//! ```

use crate::auth::AuthInfo;
use crate::constraint::Constraint;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

static LINK_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^<([^>]*)>;rel="([^"]*)"(?:;type="([^"]*)")?$"#).unwrap());

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("template `{template}` expects {expected} parameters, got {actual}")]
    ParameterCount {
        template: String,
        expected: usize,
        actual: usize,
    },

    #[error("template `{template}` references missing field `{field}`")]
    MissingField { template: String, field: String },
}

impl From<LinkError> for crate::Error {
    fn from(err: LinkError) -> Self {
        crate::Error::Internal(err.to_string())
    }
}

// ============================================================================
// Link Relation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRelation {
    pub href: String,
    pub rel: String,
    pub media_type: Option<String>,
}

impl LinkRelation {
    pub fn new(href: impl Into<String>, rel: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rel: rel.into(),
            media_type: None,
        }
    }

    pub fn with_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn to_header_value(&self) -> String {
        match &self.media_type {
            Some(mt) => format!("<{}>;rel=\"{}\";type=\"{}\"", self.href, self.rel, mt),
            None => format!("<{}>;rel=\"{}\"", self.href, self.rel),
        }
    }

    /// Parse a single `Link` header value in the format this type renders.
    pub fn parse(value: &str) -> Option<Self> {
        let captures = LINK_VALUE.captures(value.trim())?;
        Some(Self {
            href: captures.get(1)?.as_str().to_string(),
            rel: captures.get(2)?.as_str().to_string(),
            media_type: captures.get(3).map(|m| m.as_str().to_string()),
        })
    }
}

impl fmt::Display for LinkRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

// ============================================================================
// URI Templates
// ============================================================================

/// A URI with `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    template: String,
}

impl UriTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Placeholder names in order of appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        PLACEHOLDER
            .captures_iter(&self.template)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect()
    }

    /// Substitute placeholders positionally.
    pub fn expand<S: AsRef<str>>(&self, params: &[S]) -> Result<String, LinkError> {
        let expected = PLACEHOLDER.find_iter(&self.template).count();
        if expected != params.len() {
            return Err(LinkError::ParameterCount {
                template: self.template.clone(),
                expected,
                actual: params.len(),
            });
        }

        let mut values = params.iter();
        Ok(PLACEHOLDER
            .replace_all(&self.template, |_: &regex::Captures<'_>| {
                values
                    .next()
                    .map(|v| urlencoding::encode(v.as_ref()).into_owned())
                    .unwrap_or_default()
            })
            .into_owned())
    }

    /// Substitute placeholders from the fields of a JSON object.
    ///
    /// Strings are used verbatim, numbers and booleans via their JSON text.
    /// Missing or `null` fields are an error.
    pub fn expand_from(&self, fields: &Value) -> Result<String, LinkError> {
        let params = self
            .placeholders()
            .into_iter()
            .map(|name| {
                field_text(fields, name).ok_or_else(|| LinkError::MissingField {
                    template: self.template.clone(),
                    field: name.to_string(),
                })
            })
            .collect::<Result<Vec<String>, LinkError>>()?;
        self.expand(&params)
    }
}

fn field_text(fields: &Value, name: &str) -> Option<String> {
    match fields.get(name)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other @ (Value::Number(_) | Value::Bool(_)) => Some(other.to_string()),
        _ => None,
    }
}

// ============================================================================
// Transitions
// ============================================================================

type ParamFn<T> = dyn Fn(&T) -> Vec<String> + Send + Sync;

/// An author-declared next step a client may take from the current state.
///
/// Placeholders come from the representation's fields unless positional
/// parameters are supplied. A guard that rejects omits the link.
pub struct Transition<T: ?Sized> {
    pub rel: String,
    pub template: UriTemplate,
    pub media_type: Option<String>,
    params: Option<Arc<ParamFn<T>>>,
    guard: Option<Constraint<T>>,
}

impl<T: ?Sized> Clone for Transition<T> {
    fn clone(&self) -> Self {
        Self {
            rel: self.rel.clone(),
            template: self.template.clone(),
            media_type: self.media_type.clone(),
            params: self.params.clone(),
            guard: self.guard.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Transition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("rel", &self.rel)
            .field("template", &self.template)
            .field("media_type", &self.media_type)
            .field("guard", &self.guard)
            .finish()
    }
}

impl<T: ?Sized> Transition<T> {
    pub fn new(rel: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            template: UriTemplate::new(template),
            media_type: None,
            params: None,
            guard: None,
        }
    }

    pub fn with_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_params<F>(mut self, params: F) -> Self
    where
        F: Fn(&T) -> Vec<String> + Send + Sync + 'static,
    {
        self.params = Some(Arc::new(params));
        self
    }

    pub fn guarded_by(mut self, guard: Constraint<T>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Resolve into a link, or `None` when the guard rejects.
    pub fn resolve(
        &self,
        subject: &T,
        fields: &Value,
        auth: Option<&AuthInfo>,
    ) -> Result<Option<LinkRelation>, LinkError> {
        if let Some(guard) = &self.guard {
            if !guard.check(subject, auth) {
                return Ok(None);
            }
        }

        let href = match &self.params {
            Some(params) => self.template.expand(&params(subject))?,
            None => self.template.expand_from(fields)?,
        };

        let mut link = LinkRelation::new(href, self.rel.clone());
        link.media_type = self.media_type.clone();
        Ok(Some(link))
    }
}

/// A link template resolved into the representation's `_links` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedLink {
    pub rel: String,
    pub template: UriTemplate,
    pub media_type: Option<String>,
}

impl EmbeddedLink {
    pub fn new(rel: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            template: UriTemplate::new(template),
            media_type: None,
        }
    }

    pub fn with_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

/// Add a `_links` object to a JSON object representation.
///
/// Links whose fields are absent or null are left out.
pub fn embed_links(representation: &mut Value, links: &[EmbeddedLink]) {
    if links.is_empty() {
        return;
    }

    let mut resolved = serde_json::Map::new();
    for link in links {
        match link.template.expand_from(representation) {
            Ok(href) => {
                let mut entry = serde_json::Map::new();
                entry.insert("href".to_string(), Value::String(href));
                if let Some(mt) = &link.media_type {
                    entry.insert("type".to_string(), Value::String(mt.clone()));
                }
                resolved.insert(link.rel.clone(), Value::Object(entry));
            }
            Err(err) => {
                lintel_log::debug!("omitting embedded link `{}`: {}", link.rel, err);
            }
        }
    }

    if let Value::Object(map) = representation {
        if !resolved.is_empty() {
            map.insert("_links".to_string(), Value::Object(resolved));
        }
    }
}
