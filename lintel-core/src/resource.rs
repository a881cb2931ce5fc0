//! Resource hooks and per-resource settings.
//!
//! A [`Resource`] declares what a REST resource is: its model and view types,
//! how ids and timestamps are read, which constraints gate entry and which
//! transitions it offers. The lifecycle pipelines decide everything else.

use crate::auth::RoleRequirement;
use crate::cache_control::CachingConfig;
use crate::conditional::ETag;
use crate::constraint::Constraint;
use crate::link::{EmbeddedLink, Transition, embed_links};
use crate::pagination::PagingLimits;
use crate::repository::Page;
use crate::schema::Schema;
use crate::Error;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::SystemTime;

pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Engine-wide defaults every resource starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineDefaults {
    pub paging: PagingLimits,
    pub api_key_header: String,
    pub caching: CachingConfig,
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            paging: PagingLimits::default(),
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            caching: CachingConfig::default(),
        }
    }
}

/// Per-request knobs, seeded from engine defaults and adjusted by
/// [`Resource::configure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSettings {
    pub caching: CachingConfig,
    pub roles: RoleRequirement,
    /// Require a valid API key before anything else.
    pub api_key_required: bool,
    /// Name of the header carrying the API key.
    pub api_key_header: String,
    /// PUT on a missing id creates the model instead of answering 404.
    pub allow_put_create: bool,
    /// PUT answers 204 without a representation.
    pub omit_put_representation: bool,
    /// DELETE answers 200 with the last known representation instead of 204.
    pub return_deleted_representation: bool,
    /// Content type used when negotiation did not settle on one.
    pub default_media_type: String,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self::from_defaults(&EngineDefaults::default())
    }
}

impl ResourceSettings {
    pub fn from_defaults(defaults: &EngineDefaults) -> Self {
        Self {
            caching: defaults.caching.clone(),
            roles: RoleRequirement::None,
            api_key_required: false,
            api_key_header: defaults.api_key_header.clone(),
            allow_put_create: false,
            omit_put_representation: false,
            return_deleted_representation: false,
            default_media_type: "application/json".to_string(),
        }
    }
}

/// Author-supplied hooks for one REST resource.
pub trait Resource: Send + Sync + 'static {
    /// What the repository stores.
    type Model: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;
    /// What clients send in POST/PUT bodies.
    type View: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Name used in logs and registration errors.
    fn name(&self) -> &str;

    /// Adjust settings at the start of every request.
    fn configure(&self, settings: &mut ResourceSettings) {
        let _ = settings;
    }

    /// Path parameter holding the model id.
    fn id_param(&self) -> &str {
        "id"
    }

    fn model_id(&self, model: &Self::Model) -> String;

    fn last_modified(&self, model: &Self::Model) -> Option<SystemTime> {
        let _ = model;
        None
    }

    /// Content hash of the model by default.
    fn etag(&self, model: &Self::Model) -> Result<ETag, Error> {
        ETag::from_model(model)
    }

    /// Writable shape of the view, read once when an endpoint is built.
    fn schema(&self) -> Schema {
        Schema::new()
    }

    /// POST: turn the incoming view into a new model.
    fn create_model(&self, schema: &Schema, view: &Self::View) -> Result<Self::Model, Error> {
        let mut value = Value::Object(serde_json::Map::new());
        let view = serde_json::to_value(view).map_err(|e| Error::Serialization(e.to_string()))?;
        schema.merge(&mut value, &view)?;
        serde_json::from_value(value).map_err(|e| Error::BadRequest(e.to_string()))
    }

    /// PUT: merge the incoming view into the stored model.
    fn merge_model(
        &self,
        schema: &Schema,
        existing: &Self::Model,
        view: &Self::View,
    ) -> Result<Self::Model, Error> {
        Ok(schema.merge_models(existing, view)?)
    }

    /// PUT to a missing id, when allowed.
    fn create_model_with_id(
        &self,
        schema: &Schema,
        id: &str,
        view: &Self::View,
    ) -> Result<Self::Model, Error> {
        let _ = id;
        self.create_model(schema, view)
    }

    /// Entry constraints over a loaded model (GET, DELETE).
    fn constraints(&self) -> Vec<Constraint<Self::Model>> {
        Vec::new()
    }

    /// Entry constraints over an incoming view (POST, PUT).
    fn payload_constraints(&self) -> Vec<Constraint<Self::View>> {
        Vec::new()
    }

    fn transitions(&self) -> Vec<Transition<Self::Model>> {
        Vec::new()
    }

    fn collection_transitions(&self) -> Vec<Transition<Page<Self::Model>>> {
        Vec::new()
    }

    /// Link templates resolved into the representation's `_links`.
    fn embedded_links(&self) -> Vec<EmbeddedLink> {
        Vec::new()
    }

    /// Hypermedia representation of one model.
    fn to_representation(
        &self,
        model: &Self::Model,
        embedded: &[EmbeddedLink],
    ) -> Result<Value, Error> {
        let mut value =
            serde_json::to_value(model).map_err(|e| Error::Serialization(e.to_string()))?;
        embed_links(&mut value, embedded);
        Ok(value)
    }

    /// Representation of one page of a collection.
    fn collection_representation(
        &self,
        page: &Page<Self::Model>,
        embedded: &[EmbeddedLink],
    ) -> Result<Value, Error> {
        page.items
            .iter()
            .map(|model| self.to_representation(model, embedded))
            .collect::<Result<Vec<Value>, Error>>()
            .map(Value::Array)
    }
}

/// Hooks read once per endpoint rather than per request.
pub struct CompiledResource<R: Resource> {
    pub schema: Schema,
    pub constraints: Vec<Constraint<R::Model>>,
    pub payload_constraints: Vec<Constraint<R::View>>,
    pub transitions: Vec<Transition<R::Model>>,
    pub collection_transitions: Vec<Transition<Page<R::Model>>>,
    pub embedded_links: Vec<EmbeddedLink>,
}

impl<R: Resource> CompiledResource<R> {
    pub fn compile(resource: &R) -> Self {
        Self {
            schema: resource.schema(),
            constraints: resource.constraints(),
            payload_constraints: resource.payload_constraints(),
            transitions: resource.transitions(),
            collection_transitions: resource.collection_transitions(),
            embedded_links: resource.embedded_links(),
        }
    }
}
