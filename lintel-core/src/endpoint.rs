//! Endpoints: a resource lifecycle bound to its collaborators.
//!
//! ```no_run
//! # use lintel_core::{Operation, Repository, Resource, ResourceBinding};
//! # fn wire<R: Resource>(resource: R, repo: std::sync::Arc<dyn Repository<R::Model>>) {
//! let binding = ResourceBinding::new(resource, repo);
//! let get = binding.endpoint(Operation::Get);
//! let list = binding.endpoint(Operation::GetCollection);
//! # }
//! ```

use crate::auth::{ApiKeyInfoProvider, AuthenticationInfoProvider};
use crate::content_negotiation::MediaType;
use crate::lifecycle::{self, Collaborators, Context, Pipeline};
use crate::pagination::{OffsetSizePaging, PagingStrategy};
use crate::repository::Repository;
use crate::resource::{CompiledResource, EngineDefaults, Resource};
use crate::{Error, HttpMethod, HttpRequest, HttpResponse};
use async_trait::async_trait;
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// A request handler the router dispatches to after negotiation.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Identifies the handler in logs and registration errors.
    fn name(&self) -> &str;

    /// Run the request to completion. Never fails: every outcome is a response.
    async fn handle(&self, request: HttpRequest, accepted: Option<MediaType>) -> HttpResponse;
}

/// Which lifecycle an endpoint runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    GetCollection,
    Post,
    Put,
    Delete,
}

impl Operation {
    pub fn method(&self) -> HttpMethod {
        match self {
            Operation::Get | Operation::GetCollection => HttpMethod::Get,
            Operation::Post => HttpMethod::Post,
            Operation::Put => HttpMethod::Put,
            Operation::Delete => HttpMethod::Delete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::GetCollection => "list",
            Operation::Post => "create",
            Operation::Put => "update",
            Operation::Delete => "delete",
        }
    }

    pub fn pipeline<R: Resource>(&self) -> Pipeline<Context<R>> {
        match self {
            Operation::Get => lifecycle::get::pipeline(),
            Operation::GetCollection => lifecycle::collection::pipeline(),
            Operation::Post => lifecycle::post::pipeline(),
            Operation::Put => lifecycle::put::pipeline(),
            Operation::Delete => lifecycle::delete::pipeline(),
        }
    }
}

// ===== Binding =====

/// Collects a resource's collaborators before endpoints are built.
pub struct ResourceBinding<R: Resource> {
    resource: Arc<R>,
    repository: Arc<dyn Repository<R::Model>>,
    auth_provider: Option<Arc<dyn AuthenticationInfoProvider>>,
    api_key_provider: Option<Arc<dyn ApiKeyInfoProvider>>,
    paging: Option<Arc<dyn PagingStrategy>>,
    defaults: EngineDefaults,
}

impl<R: Resource> ResourceBinding<R> {
    pub fn new(resource: R, repository: Arc<dyn Repository<R::Model>>) -> Self {
        Self {
            resource: Arc::new(resource),
            repository,
            auth_provider: None,
            api_key_provider: None,
            paging: None,
            defaults: EngineDefaults::default(),
        }
    }

    pub fn with_auth_provider(mut self, provider: Arc<dyn AuthenticationInfoProvider>) -> Self {
        self.auth_provider = Some(provider);
        self
    }

    pub fn with_api_key_provider(mut self, provider: Arc<dyn ApiKeyInfoProvider>) -> Self {
        self.api_key_provider = Some(provider);
        self
    }

    /// Replace the default `?offset=&size=` paging.
    pub fn with_paging(mut self, paging: Arc<dyn PagingStrategy>) -> Self {
        self.paging = Some(paging);
        self
    }

    pub fn with_defaults(mut self, defaults: EngineDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    fn collaborators(&self) -> Arc<Collaborators<R>> {
        let paging = self
            .paging
            .clone()
            .unwrap_or_else(|| {
                Arc::new(OffsetSizePaging::new(self.defaults.paging)) as Arc<dyn PagingStrategy>
            });
        Arc::new(Collaborators {
            resource: Arc::clone(&self.resource),
            compiled: CompiledResource::compile(&*self.resource),
            repository: Arc::clone(&self.repository),
            auth_provider: self.auth_provider.clone(),
            api_key_provider: self.api_key_provider.clone(),
            paging,
            defaults: self.defaults.clone(),
        })
    }

    pub fn endpoint(&self, operation: Operation) -> Arc<dyn Endpoint> {
        Arc::new(ResourceEndpoint::new(operation, self.collaborators()))
    }
}

// ===== Endpoint =====

/// Runs one verb's lifecycle for one resource.
pub struct ResourceEndpoint<R: Resource> {
    name: String,
    operation: Operation,
    deps: Arc<Collaborators<R>>,
    pipeline: Pipeline<Context<R>>,
}

impl<R: Resource> ResourceEndpoint<R> {
    pub fn new(operation: Operation, deps: Arc<Collaborators<R>>) -> Self {
        let name = format!("{}.{}", deps.resource.name(), operation.as_str());
        Self {
            name,
            operation,
            pipeline: operation.pipeline::<R>(),
            deps,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn pipeline(&self) -> &Pipeline<Context<R>> {
        &self.pipeline
    }

    fn failure(&self, err: &Error) -> HttpResponse {
        if err.is_server_error() {
            lintel_log::error!("{} failed: {}", self.name, err);
        } else {
            lintel_log::debug!("{} rejected request: {}", self.name, err);
        }
        HttpResponse::from_error(err)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_string()
}

#[async_trait]
impl<R: Resource> Endpoint for ResourceEndpoint<R> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, request: HttpRequest, accepted: Option<MediaType>) -> HttpResponse {
        let mut cx = Context::new(Arc::clone(&self.deps), request, accepted);
        let outcome = AssertUnwindSafe(self.pipeline.run(&mut cx))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => cx.response,
            Ok(Err(err)) => self.failure(&err),
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                self.failure(&Error::Internal(format!("panic: {}", detail)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{INTERNAL_ERROR_MESSAGE, PersistenceError, PersistenceResult};
    use crate::error::ErrorBody;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Widget {
        id: String,
    }

    struct Widgets;

    impl Resource for Widgets {
        type Model = Widget;
        type View = Widget;

        fn name(&self) -> &str {
            "widgets"
        }

        fn model_id(&self, model: &Widget) -> String {
            model.id.clone()
        }
    }

    struct Exploding;

    #[async_trait]
    impl Repository<Widget> for Exploding {
        async fn load(&self, id: &str) -> PersistenceResult<Option<Widget>> {
            if id == "panic" {
                panic!("connection pool poisoned");
            }
            Err(PersistenceError::Storage("password=hunter2".to_string()))
        }
    }

    fn endpoint(operation: Operation) -> Arc<dyn Endpoint> {
        ResourceBinding::new(Widgets, Arc::new(Exploding)).endpoint(operation)
    }

    #[test]
    fn test_operation_methods() {
        assert_eq!(Operation::GetCollection.method(), HttpMethod::Get);
        assert_eq!(Operation::Delete.method(), HttpMethod::Delete);
    }

    #[test]
    fn test_endpoint_name() {
        assert_eq!(endpoint(Operation::Put).name(), "widgets.update");
    }

    #[tokio::test]
    async fn test_persistence_detail_not_leaked() {
        let mut request = HttpRequest::new("GET", "/widgets/1");
        request.path_params.insert("id".into(), "1".into());
        let response = endpoint(Operation::Get).handle(request, None).await;

        assert_eq!(response.status, 500);
        let body: ErrorBody = response.json().unwrap();
        assert_eq!(body.message, INTERNAL_ERROR_MESSAGE);
        assert!(!String::from_utf8_lossy(&response.body).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_panic_becomes_generic_500() {
        let mut request = HttpRequest::new("DELETE", "/widgets/panic");
        request.path_params.insert("id".into(), "panic".into());
        let response = endpoint(Operation::Delete).handle(request, None).await;

        assert_eq!(response.status, 500);
        let body: ErrorBody = response.json().unwrap();
        assert_eq!(body.message, INTERNAL_ERROR_MESSAGE);
        assert_eq!(
            response.header("Cache-Control"),
            Some("no-cache, no-store, no-transform")
        );
    }

    #[tokio::test]
    async fn test_missing_id_is_bad_request() {
        let request = HttpRequest::new("GET", "/widgets");
        let response = endpoint(Operation::Get).handle(request, None).await;
        assert_eq!(response.status, 400);
    }
}
