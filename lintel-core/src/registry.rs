//! Explicit route registration and dispatch.
//!
//! Routes are registered once at startup. Handlers sharing a method and path
//! form a negotiation group whose [`ContentNegotiator`] is rebuilt, and
//! checked for conflicts, on every registration. [`RouterRegistry::into_router`]
//! freezes the groups into an immutable [`Router`] that serves requests
//! concurrently without locking.

use crate::content_negotiation::{ContentNegotiator, MediaType, RouteCapability, describe};
use crate::endpoint::{Endpoint, Operation, ResourceBinding};
use crate::error::RegistrationError;
use crate::resource::Resource;
use crate::{Error, HttpMethod, HttpRequest, HttpResponse};
use std::collections::HashMap;
use std::sync::Arc;

// ===== Route Specs =====

/// Where and how a handler is reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub method: HttpMethod,
    /// Path pattern; `:name` segments are parameters.
    pub path: String,
    pub produces: Option<String>,
    pub consumes: Option<String>,
}

impl RouteSpec {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            produces: None,
            consumes: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn produces(mut self, media_type: impl Into<String>) -> Self {
        self.produces = Some(media_type.into());
        self
    }

    pub fn consumes(mut self, media_type: impl Into<String>) -> Self {
        self.consumes = Some(media_type.into());
        self
    }
}

fn validate_pattern(pattern: &str) -> Result<String, RegistrationError> {
    if !pattern.starts_with('/') {
        return Err(RegistrationError::InvalidPattern(pattern.to_string()));
    }
    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    for segment in &segments {
        if let Some(name) = segment.strip_prefix(':') {
            let valid = !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(RegistrationError::InvalidPattern(pattern.to_string()));
            }
        }
    }
    Ok(format!("/{}", segments.join("/")))
}

fn parse_media_type(raw: Option<&str>) -> Result<Option<MediaType>, RegistrationError> {
    match raw {
        None => Ok(None),
        Some(raw) => MediaType::parse(raw)
            .map(Some)
            .ok_or_else(|| RegistrationError::InvalidMediaType(raw.to_string())),
    }
}

// ===== Registry =====

type Capability = RouteCapability<Arc<dyn Endpoint>>;

struct Group {
    method: HttpMethod,
    pattern: String,
    negotiator: ContentNegotiator<Arc<dyn Endpoint>>,
}

/// Collects routes at startup.
#[derive(Default)]
pub struct RouterRegistry {
    groups: Vec<Group>,
}

impl RouterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one handler. A conflicting registration is rejected and
    /// logged; the group keeps its previous handlers.
    pub fn register(
        &mut self,
        spec: RouteSpec,
        endpoint: Arc<dyn Endpoint>,
    ) -> Result<(), RegistrationError> {
        let pattern = validate_pattern(&spec.path)?;
        let produces = parse_media_type(spec.produces.as_deref())?;
        let consumes = parse_media_type(spec.consumes.as_deref())?;

        let mut capability = RouteCapability::new(Arc::clone(&endpoint));
        capability.produces = produces;
        capability.consumes = consumes;

        let position = self
            .groups
            .iter()
            .position(|g| g.method == spec.method && g.pattern == pattern);

        let mut capabilities: Vec<Capability> = match position {
            Some(index) => self.groups[index].negotiator.capabilities().to_vec(),
            None => Vec::new(),
        };
        capabilities.push(capability);

        let negotiator = match ContentNegotiator::new(capabilities) {
            Ok(negotiator) => negotiator,
            Err(conflict) => {
                let existing = match position {
                    Some(index) => self.groups[index].negotiator.capabilities()[conflict.first]
                        .handler
                        .name()
                        .to_string(),
                    None => String::new(),
                };
                let err = RegistrationError::DuplicateCapability {
                    method: spec.method.to_string(),
                    path: pattern,
                    consumes: describe(&conflict.consumes),
                    produces: describe(&conflict.produces),
                    existing,
                    incoming: endpoint.name().to_string(),
                };
                lintel_log::error!("route registration rejected: {}", err);
                return Err(err);
            }
        };

        lintel_log::debug!(
            "registered {} {} -> {} (consumes={} produces={})",
            spec.method,
            pattern,
            endpoint.name(),
            spec.consumes.as_deref().unwrap_or("-"),
            spec.produces.as_deref().unwrap_or("-")
        );

        match position {
            Some(index) => self.groups[index].negotiator = negotiator,
            None => self.groups.push(Group {
                method: spec.method,
                pattern,
                negotiator,
            }),
        }
        Ok(())
    }

    /// Register every route, continuing past failures.
    pub fn register_all<I>(&mut self, routes: I) -> Vec<RegistrationError>
    where
        I: IntoIterator<Item = (RouteSpec, Arc<dyn Endpoint>)>,
    {
        routes
            .into_iter()
            .filter_map(|(spec, endpoint)| self.register(spec, endpoint).err())
            .collect()
    }

    /// Register the standard routes of a resource: GET/POST on `collection`,
    /// GET/PUT/DELETE on `collection/:<id param>`.
    ///
    /// `media_type`, when given, is produced by the read routes and consumed
    /// by the write routes.
    pub fn bind<R: Resource>(
        &mut self,
        collection: &str,
        binding: &ResourceBinding<R>,
        id_param: &str,
        media_type: Option<&str>,
    ) -> Vec<RegistrationError> {
        let item = format!("{}/:{}", collection.trim_end_matches('/'), id_param);
        let with_type = |spec: RouteSpec, reads: bool, writes: bool| match media_type {
            Some(mt) => {
                let spec = if reads { spec.produces(mt) } else { spec };
                if writes { spec.consumes(mt) } else { spec }
            }
            None => spec,
        };

        self.register_all([
            (
                with_type(RouteSpec::get(collection), true, false),
                binding.endpoint(Operation::GetCollection),
            ),
            (
                with_type(RouteSpec::post(collection), false, true),
                binding.endpoint(Operation::Post),
            ),
            (
                with_type(RouteSpec::get(item.clone()), true, false),
                binding.endpoint(Operation::Get),
            ),
            (
                with_type(RouteSpec::put(item.clone()), true, true),
                binding.endpoint(Operation::Put),
            ),
            (
                with_type(RouteSpec::delete(item), false, false),
                binding.endpoint(Operation::Delete),
            ),
        ])
    }

    /// `(method, pattern, handler count)` per negotiation group.
    pub fn routes(&self) -> Vec<(HttpMethod, &str, usize)> {
        self.groups
            .iter()
            .map(|g| (g.method, g.pattern.as_str(), g.negotiator.capabilities().len()))
            .collect()
    }

    /// Freeze the table. Static segments outrank `:param` segments at the
    /// same position; equally ranked groups keep registration order.
    pub fn into_router(mut self) -> Router {
        self.groups.sort_by_cached_key(|group| route_rank(&group.pattern));
        lintel_log::info!("router built with {} route groups", self.groups.len());
        Router {
            groups: self.groups,
        }
    }
}

// ===== Router =====

/// Frozen routing table.
pub struct Router {
    groups: Vec<Group>,
}

impl Router {
    fn allowed_methods(&self, path: &str) -> Vec<HttpMethod> {
        let mut allowed = Vec::new();
        for group in &self.groups {
            if match_path(&group.pattern, path).is_some() && !allowed.contains(&group.method) {
                allowed.push(group.method);
            }
        }
        allowed
    }

    /// Route, negotiate and run a request. Every outcome is a response.
    pub async fn dispatch(&self, mut request: HttpRequest) -> HttpResponse {
        let method = request.method();
        let found = method.and_then(|method| {
            self.groups.iter().find_map(|group| {
                if group.method != method {
                    return None;
                }
                match_path(&group.pattern, &request.path).map(|params| (group, params))
            })
        });

        let Some((group, params)) = found else {
            let allowed = self.allowed_methods(&request.path);
            if allowed.is_empty() {
                let err = Error::NotFound(format!("no route for {}", request.path));
                return HttpResponse::from_error(&err);
            }
            let allow = allowed
                .iter()
                .map(HttpMethod::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            let err = Error::MethodNotAllowed(format!(
                "{} is not supported on {}",
                request.method, request.path
            ));
            let mut response = HttpResponse::from_error(&err);
            response.insert_header("Allow", allow);
            return response;
        };

        request.path_params = params;
        let negotiated = group
            .negotiator
            .retrieve_handler(request.header("accept"), request.header("content-type"));

        match negotiated {
            Ok(result) => {
                lintel_log::trace!(
                    "{} {} negotiated to {}",
                    request.method,
                    request.path,
                    result.handler.name()
                );
                result
                    .handler
                    .handle(request, result.accepted_media_type)
                    .await
            }
            Err(err) => {
                lintel_log::debug!(
                    "negotiation failed for {} {}: {}",
                    request.method,
                    request.path,
                    err
                );
                HttpResponse::from_error(&err)
            }
        }
    }
}

// ===== Path & Query Matching =====

/// One flag per segment, `false` for static; sorts static-first.
fn route_rank(pattern: &str) -> Vec<bool> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| segment.starts_with(':'))
        .collect()
}

/// Match a route path pattern against a request path
/// Returns Some(params) if matched, None otherwise
pub fn match_path(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if pattern_parts.len() != path_parts.len() {
        return None;
    }

    let mut params = HashMap::new();

    for (pattern_part, path_part) in pattern_parts.iter().zip(path_parts.iter()) {
        if let Some(param_name) = pattern_part.strip_prefix(':') {
            params.insert(param_name.to_string(), decode(path_part));
        } else if pattern_part != path_part {
            return None;
        }
    }

    Some(params)
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl Endpoint for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn handle(&self, request: HttpRequest, accepted: Option<MediaType>) -> HttpResponse {
            let mut response = HttpResponse::new(200).with_body(self.0.as_bytes().to_vec());
            if let Some(mt) = accepted {
                response.insert_header("X-Accepted", mt.to_string());
            }
            if let Some(id) = request.param("id") {
                response.insert_header("X-Id", id.clone());
            }
            response
        }
    }

    fn named(name: &'static str) -> Arc<dyn Endpoint> {
        Arc::new(Named(name))
    }

    fn body(response: &HttpResponse) -> String {
        String::from_utf8_lossy(&response.body).into_owned()
    }

    #[test]
    fn test_match_path_static() {
        let result = match_path("/users", "/users");
        assert!(result.is_some());
        assert_eq!(result.unwrap().len(), 0);
    }

    #[test]
    fn test_match_path_with_param() {
        let params = match_path("/users/:id", "/users/a%20b").unwrap();
        assert_eq!(params.get("id"), Some(&"a b".to_string()));
    }

    #[test]
    fn test_match_path_no_match() {
        assert!(match_path("/users/:id", "/posts/123").is_none());
        assert!(match_path("/users/:id", "/users").is_none());
    }

    #[test]
    fn test_invalid_registrations() {
        let mut registry = RouterRegistry::new();
        assert!(matches!(
            registry.register(RouteSpec::get("users"), named("a")),
            Err(RegistrationError::InvalidPattern(_))
        ));
        assert!(matches!(
            registry.register(RouteSpec::get("/users/:"), named("a")),
            Err(RegistrationError::InvalidPattern(_))
        ));
        assert!(matches!(
            registry.register(RouteSpec::get("/users").produces("json"), named("a")),
            Err(RegistrationError::InvalidMediaType(_))
        ));
    }

    #[test]
    fn test_conflict_keeps_existing_group() {
        let mut registry = RouterRegistry::new();
        registry
            .register(RouteSpec::get("/users").produces("application/json"), named("first"))
            .unwrap();
        let err = registry
            .register(RouteSpec::get("/users").produces("application/json"), named("second"))
            .unwrap_err();
        match err {
            RegistrationError::DuplicateCapability {
                existing, incoming, ..
            } => {
                assert_eq!(existing, "first");
                assert_eq!(incoming, "second");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(registry.routes(), vec![(HttpMethod::Get, "/users", 1)]);
    }

    #[test]
    fn test_register_all_continues_past_conflicts() {
        let mut registry = RouterRegistry::new();
        let errors = registry.register_all([
            (RouteSpec::get("/a"), named("a1")),
            (RouteSpec::get("/a"), named("a2")),
            (RouteSpec::get("/b"), named("b")),
        ]);
        assert_eq!(errors.len(), 1);
        assert_eq!(registry.routes().len(), 2);
    }

    #[tokio::test]
    async fn test_static_segment_wins_over_param() {
        let mut registry = RouterRegistry::new();
        registry.register(RouteSpec::get("/users/:id"), named("by-id")).unwrap();
        registry.register(RouteSpec::get("/users/me"), named("me")).unwrap();
        let router = registry.into_router();

        let response = router.dispatch(HttpRequest::new("GET", "/users/me")).await;
        assert_eq!(body(&response), "me");

        let response = router.dispatch(HttpRequest::new("GET", "/users/42")).await;
        assert_eq!(body(&response), "by-id");
        assert_eq!(response.header("X-Id"), Some("42"));
    }

    #[tokio::test]
    async fn test_dispatch_negotiates_within_group() {
        let mut registry = RouterRegistry::new();
        registry
            .register(
                RouteSpec::get("/users/:id").produces("application/vnd.user-admin+json"),
                named("admin"),
            )
            .unwrap();
        registry
            .register(
                RouteSpec::get("/users/:id").produces("application/vnd.user+json"),
                named("user"),
            )
            .unwrap();
        let router = registry.into_router();

        let response = router.dispatch(HttpRequest::new("GET", "/users/7")).await;
        assert_eq!(body(&response), "admin");
        assert_eq!(response.header("X-Id"), Some("7"));

        let request =
            HttpRequest::new("GET", "/users/7").with_header("Accept", "application/vnd.user+json");
        let response = router.dispatch(request).await;
        assert_eq!(body(&response), "user");
        assert_eq!(response.header("X-Accepted"), Some("application/vnd.user+json"));

        let request = HttpRequest::new("GET", "/users/7").with_header("Accept", "text/html");
        assert_eq!(router.dispatch(request).await.status, 406);
    }

    #[tokio::test]
    async fn test_dispatch_not_found_and_method_not_allowed() {
        let mut registry = RouterRegistry::new();
        registry.register(RouteSpec::get("/users"), named("list")).unwrap();
        registry.register(RouteSpec::post("/users"), named("create")).unwrap();
        let router = registry.into_router();

        let response = router.dispatch(HttpRequest::new("GET", "/nothing")).await;
        assert_eq!(response.status, 404);
        assert_eq!(response.header("Content-Type"), Some("application/vnd.error+json"));

        let response = router.dispatch(HttpRequest::new("DELETE", "/users")).await;
        assert_eq!(response.status, 405);
        assert_eq!(response.header("Allow"), Some("GET, POST"));
    }
}
