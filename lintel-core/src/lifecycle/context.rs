// Request-scoped lifecycle state

use crate::auth::{ApiKeyInfo, ApiKeyInfoProvider, AuthInfo, AuthenticationInfoProvider};
use crate::conditional::Validator;
use crate::content_negotiation::MediaType;
use crate::pagination::{PageRequest, PagingStrategy};
use crate::repository::{Page, Repository};
use crate::resource::{CompiledResource, EngineDefaults, Resource, ResourceSettings};
use crate::{HttpRequest, HttpResponse};
use std::sync::Arc;

/// Everything a lifecycle consumes but does not own. Shared by all requests
/// of one endpoint and never mutated after construction.
pub struct Collaborators<R: Resource> {
    pub resource: Arc<R>,
    pub compiled: CompiledResource<R>,
    pub repository: Arc<dyn Repository<R::Model>>,
    pub auth_provider: Option<Arc<dyn AuthenticationInfoProvider>>,
    pub api_key_provider: Option<Arc<dyn ApiKeyInfoProvider>>,
    pub paging: Arc<dyn PagingStrategy>,
    pub defaults: EngineDefaults,
}

/// Working state of a single request, owned exclusively by its lifecycle.
pub struct Context<R: Resource> {
    pub deps: Arc<Collaborators<R>>,
    pub request: HttpRequest,
    pub response: HttpResponse,
    /// Media type chosen by the negotiator, if any.
    pub accepted: Option<MediaType>,
    pub settings: ResourceSettings,
    pub id: Option<String>,
    pub auth: Option<AuthInfo>,
    pub api_key: Option<ApiKeyInfo>,
    /// The stored model: loaded, created or updated.
    pub model: Option<R::Model>,
    /// The parsed request body.
    pub payload: Option<R::View>,
    pub page_request: PageRequest,
    pub page: Option<Page<R::Model>>,
    pub validator: Validator,
}

impl<R: Resource> Context<R> {
    pub fn new(
        deps: Arc<Collaborators<R>>,
        request: HttpRequest,
        accepted: Option<MediaType>,
    ) -> Self {
        let settings = ResourceSettings::from_defaults(&deps.defaults);
        Self {
            deps,
            request,
            response: HttpResponse::default(),
            accepted,
            settings,
            id: None,
            auth: None,
            api_key: None,
            model: None,
            payload: None,
            page_request: PageRequest::default(),
            page: None,
            validator: Validator::default(),
        }
    }

    /// Content type for representations this request emits.
    pub fn media_type(&self) -> String {
        self.accepted
            .as_ref()
            .map(MediaType::to_string)
            .unwrap_or_else(|| self.settings.default_media_type.clone())
    }

    pub fn resource(&self) -> &R {
        &self.deps.resource
    }
}
