//! Content negotiation for route groups.
//!
//! A [`ContentNegotiator`] is built once per `(path, verb)` group from the
//! media types each handler produces and consumes. Per request it picks the
//! handler and the accepted media type from the `Accept` and `Content-Type`
//! headers, or fails with `406 Not Acceptable` / `415 Unsupported Media Type`.
//!
//! ```
//! use lintel_core::content_negotiation::{ContentNegotiator, MediaType, RouteCapability};
//!
//! let negotiator = ContentNegotiator::new(vec![
//!     RouteCapability::new("admin").produces(MediaType::parse("application/vnd.user-admin+json").unwrap()),
//!     RouteCapability::new("user").produces(MediaType::parse("application/vnd.user+json").unwrap()),
//! ])
//! .unwrap();
//!
//! let result = negotiator
//!     .retrieve_handler(Some("application/vnd.user+json"), None)
//!     .unwrap();
//! assert_eq!(result.handler, "user");
//! ```

use crate::Error;
use std::fmt;

// ============================================================================
// Media Types
// ============================================================================

/// A media type with optional parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    pub type_: String,
    pub subtype: String,
    /// Parameters other than `q`, sorted by name.
    pub params: Vec<(String, String)>,
}

impl MediaType {
    pub fn new(type_: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            type_: type_.into().to_ascii_lowercase(),
            subtype: subtype.into().to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into().to_ascii_lowercase(), value.into()));
        self.params.sort();
        self
    }

    pub fn json() -> Self {
        Self::new("application", "json")
    }

    pub fn any() -> Self {
        Self::new("*", "*")
    }

    /// Parse a media type, ignoring any quality parameter.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split(';');

        let (type_, subtype) = parts.next()?.trim().split_once('/')?;
        let type_ = type_.trim().to_ascii_lowercase();
        let subtype = subtype.trim().to_ascii_lowercase();
        if type_.is_empty() || subtype.is_empty() || (type_ == "*" && subtype != "*") {
            return None;
        }

        let mut params: Vec<(String, String)> = parts
            .filter_map(|param| param.split_once('='))
            .map(|(key, value)| {
                (
                    key.trim().to_ascii_lowercase(),
                    value.trim().trim_matches('"').to_string(),
                )
            })
            .filter(|(key, _)| key != "q")
            .collect();
        params.sort();

        Some(Self {
            type_,
            subtype,
            params,
        })
    }

    /// Wildcard-aware match on type and subtype; parameters are ignored.
    pub fn matches(&self, other: &MediaType) -> bool {
        let type_matches = self.type_ == "*" || other.type_ == "*" || self.type_ == other.type_;
        let subtype_matches =
            self.subtype == "*" || other.subtype == "*" || self.subtype == other.subtype;
        type_matches && subtype_matches
    }

    pub fn is_any(&self) -> bool {
        self.type_ == "*" && self.subtype == "*"
    }

    /// A range such as `*/*` or `application/*` rather than a concrete type.
    pub fn is_range(&self) -> bool {
        self.type_ == "*" || self.subtype == "*"
    }

    /// `type/subtype` without parameters.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }

    /// Media-range precedence: `type/subtype;params` > `type/subtype` > `type/*` > `*/*`.
    pub fn specificity(&self) -> u8 {
        match (self.type_.as_str(), self.subtype.as_str()) {
            ("*", _) => 0,
            (_, "*") => 1,
            _ if self.params.is_empty() => 2,
            _ => 3,
        }
    }

    fn params_satisfied_by(&self, other: &MediaType) -> bool {
        self.params
            .iter()
            .all(|(key, value)| other.params.iter().any(|(k, v)| k == key && v == value))
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (key, value) in &self.params {
            write!(f, ";{}={}", key, value)?;
        }
        Ok(())
    }
}

// ============================================================================
// Accept Header
// ============================================================================

/// A parsed `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct Accept {
    /// Media ranges with their quality, in header order.
    pub ranges: Vec<(MediaType, f32)>,
}

impl Default for Accept {
    fn default() -> Self {
        Self::any()
    }
}

impl Accept {
    /// `*/*`, the meaning of a missing `Accept` header.
    pub fn any() -> Self {
        Self {
            ranges: vec![(MediaType::any(), 1.0)],
        }
    }

    /// Parse a header value. Unparseable ranges are skipped; an empty
    /// result is treated as `*/*`.
    pub fn parse(header: &str) -> Self {
        let ranges: Vec<(MediaType, f32)> = header
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .filter_map(|part| {
                let quality = Self::extract_quality(part);
                MediaType::parse(part).map(|mt| (mt, quality))
            })
            .collect();

        if ranges.is_empty() {
            return Self::any();
        }
        Self { ranges }
    }

    pub fn from_header(header: Option<&str>) -> Self {
        header.map(Self::parse).unwrap_or_default()
    }

    fn extract_quality(part: &str) -> f32 {
        part.split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("q"))
            .and_then(|(_, value)| value.trim().parse::<f32>().ok())
            .map(|q| q.clamp(0.0, 1.0))
            .unwrap_or(1.0)
    }

    /// True when every range is `*/*`.
    pub fn is_wildcard(&self) -> bool {
        self.ranges.iter().all(|(mt, _)| mt.is_any())
    }

    /// Quality and matched-range specificity for `media_type`.
    ///
    /// The most specific matching range decides the quality (RFC 7231 §5.3.2).
    pub fn preference_for(&self, media_type: &MediaType) -> Option<(f32, u8)> {
        self.ranges
            .iter()
            .filter(|(range, _)| range.matches(media_type) && range.params_satisfied_by(media_type))
            .max_by_key(|(range, _)| range.specificity())
            .map(|(range, quality)| (*quality, range.specificity()))
    }

    pub fn quality_for(&self, media_type: &MediaType) -> f32 {
        self.preference_for(media_type).map(|(q, _)| q).unwrap_or(0.0)
    }

    pub fn accepts(&self, media_type: &MediaType) -> bool {
        self.quality_for(media_type) > 0.0
    }
}

// ============================================================================
// Negotiator
// ============================================================================

/// What one handler in a group produces and consumes.
#[derive(Debug, Clone)]
pub struct RouteCapability<H> {
    pub produces: Option<MediaType>,
    pub consumes: Option<MediaType>,
    pub handler: H,
}

impl<H> RouteCapability<H> {
    pub fn new(handler: H) -> Self {
        Self {
            produces: None,
            consumes: None,
            handler,
        }
    }

    pub fn produces(mut self, media_type: MediaType) -> Self {
        self.produces = Some(media_type);
        self
    }

    pub fn consumes(mut self, media_type: MediaType) -> Self {
        self.consumes = Some(media_type);
        self
    }

    fn is_neither(&self) -> bool {
        self.produces.is_none() && self.consumes.is_none()
    }
}

/// The negotiated handler for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiationResult<H> {
    pub handler: H,
    /// Position of the handler in registration order.
    pub index: usize,
    pub accepted_media_type: Option<MediaType>,
}

/// Two capabilities in one group declare the same `(consumes, produces)` pair.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("capabilities #{first} and #{second} both declare consumes={} produces={}", describe(.consumes), describe(.produces))]
pub struct NegotiationConflict {
    pub first: usize,
    pub second: usize,
    pub consumes: Option<MediaType>,
    pub produces: Option<MediaType>,
}

pub(crate) fn describe(media_type: &Option<MediaType>) -> String {
    media_type
        .as_ref()
        .map(MediaType::to_string)
        .unwrap_or_else(|| "-".to_string())
}

/// Immutable per-group negotiator.
#[derive(Debug, Clone)]
pub struct ContentNegotiator<H> {
    capabilities: Vec<RouteCapability<H>>,
    neither: Option<usize>,
}

impl<H: Clone> ContentNegotiator<H> {
    /// Build a negotiator, rejecting duplicate `(consumes, produces)` pairs.
    pub fn new(capabilities: Vec<RouteCapability<H>>) -> Result<Self, NegotiationConflict> {
        for (second, candidate) in capabilities.iter().enumerate() {
            if let Some(first) = capabilities[..second].iter().position(|existing| {
                existing.consumes == candidate.consumes && existing.produces == candidate.produces
            }) {
                return Err(NegotiationConflict {
                    first,
                    second,
                    consumes: candidate.consumes.clone(),
                    produces: candidate.produces.clone(),
                });
            }
        }

        let neither = capabilities.iter().position(RouteCapability::is_neither);
        Ok(Self {
            capabilities,
            neither,
        })
    }

    pub fn capabilities(&self) -> &[RouteCapability<H>] {
        &self.capabilities
    }

    /// Negotiate from raw `Accept` and `Content-Type` header values.
    pub fn retrieve_handler(
        &self,
        accept: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<NegotiationResult<H>, Error> {
        let accept = Accept::from_header(accept);
        match content_type {
            None => self.negotiate_without_body(&accept),
            Some(raw) => match MediaType::parse(raw) {
                Some(content_type) => self.negotiate_with_body(&accept, &content_type),
                None => self.fallback_to_neither(|| {
                    Error::NotAcceptable(format!("malformed Content-Type `{}`", raw))
                }),
            },
        }
    }

    fn negotiate_without_body(&self, accept: &Accept) -> Result<NegotiationResult<H>, Error> {
        let producers = self
            .enumerate()
            .filter(|(_, cap)| cap.consumes.is_none() && cap.produces.is_some());
        if let Some(result) = self.best_producer(accept, producers) {
            return Ok(result);
        }

        if let Some(index) = self.neither {
            return Ok(self.result(index, None));
        }

        let producible_with_body = self.capabilities.iter().any(|cap| {
            cap.consumes.is_some()
                && cap
                    .produces
                    .as_ref()
                    .is_some_and(|produces| accept.accepts(produces))
        });
        if producible_with_body {
            return Err(Error::UnsupportedMediaType(
                "the acceptable representations require a request body with a Content-Type"
                    .to_string(),
            ));
        }

        Err(Error::NotAcceptable(format!(
            "no representation satisfies Accept; available: {}",
            self.producible()
        )))
    }

    fn negotiate_with_body(
        &self,
        accept: &Accept,
        content_type: &MediaType,
    ) -> Result<NegotiationResult<H>, Error> {
        if content_type.is_range() {
            return Err(Error::UnsupportedMediaType(format!(
                "Content-Type `{}` is a media range, not a media type",
                content_type
            )));
        }

        let consumers: Vec<(usize, &RouteCapability<H>)> = self
            .enumerate()
            .filter(|(_, cap)| {
                cap.consumes
                    .as_ref()
                    .is_some_and(|consumes| consumes.matches(content_type))
            })
            .collect();

        if consumers.is_empty() {
            return self.fallback_to_neither(|| {
                Error::NotAcceptable(format!("no handler consumes `{}`", content_type))
            });
        }

        let producers = consumers
            .iter()
            .copied()
            .filter(|(_, cap)| cap.produces.is_some());
        if let Some(result) = self.best_producer(accept, producers) {
            return Ok(result);
        }

        if !accept.is_wildcard() {
            return Err(Error::UnsupportedMediaType(format!(
                "no handler consuming `{}` produces an acceptable representation",
                content_type
            )));
        }

        consumers
            .iter()
            .find(|(_, cap)| cap.produces.is_none())
            .map(|(index, _)| self.result(*index, None))
            .ok_or_else(|| {
                Error::NotAcceptable(format!(
                    "no representation available for `{}`",
                    content_type
                ))
            })
    }

    fn fallback_to_neither(
        &self,
        error: impl FnOnce() -> Error,
    ) -> Result<NegotiationResult<H>, Error> {
        match self.neither {
            Some(index) => Ok(self.result(index, None)),
            None => Err(error()),
        }
    }

    /// Highest quality, then most specific matched range, then first registered.
    fn best_producer<'a>(
        &'a self,
        accept: &Accept,
        candidates: impl Iterator<Item = (usize, &'a RouteCapability<H>)>,
    ) -> Option<NegotiationResult<H>> {
        let mut best: Option<(usize, f32, u8)> = None;

        for (index, cap) in candidates {
            let Some(produces) = cap.produces.as_ref() else {
                continue;
            };
            let Some((quality, specificity)) = accept.preference_for(produces) else {
                continue;
            };
            if quality <= 0.0 {
                continue;
            }
            let better = match best {
                None => true,
                Some((_, best_q, best_s)) => {
                    quality > best_q || (quality == best_q && specificity > best_s)
                }
            };
            if better {
                best = Some((index, quality, specificity));
            }
        }

        best.map(|(index, _, _)| {
            let accepted = self.capabilities[index].produces.clone();
            self.result(index, accepted)
        })
    }

    fn result(&self, index: usize, accepted: Option<MediaType>) -> NegotiationResult<H> {
        NegotiationResult {
            handler: self.capabilities[index].handler.clone(),
            index,
            accepted_media_type: accepted,
        }
    }

    fn enumerate(&self) -> impl Iterator<Item = (usize, &RouteCapability<H>)> {
        self.capabilities.iter().enumerate()
    }

    fn producible(&self) -> String {
        let types: Vec<String> = self
            .capabilities
            .iter()
            .filter_map(|cap| cap.produces.as_ref().map(MediaType::to_string))
            .collect();
        if types.is_empty() {
            "none".to_string()
        } else {
            types.join(", ")
        }
    }
}
