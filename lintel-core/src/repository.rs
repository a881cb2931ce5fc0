// Persistence collaborator consumed by the lifecycle

use crate::error::{PersistenceError, PersistenceResult};
use crate::pagination::PageRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One page of a collection plus the size of the whole collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<M> {
    pub items: Vec<M>,
    /// Matching items, ignoring paging.
    pub total: u64,
}

impl<M> Page<M> {
    pub fn new(items: Vec<M>, total: u64) -> Self {
        Self { items, total }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The page being asked for, with the request's remaining query parameters
/// available as filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub page: PageRequest,
    pub filters: HashMap<String, String>,
}

/// Storage for one resource's models.
///
/// Every operation is a suspension point of the lifecycle. Operations a
/// repository does not implement report [`PersistenceError::Unsupported`].
#[async_trait]
pub trait Repository<M>: Send + Sync
where
    M: Send + Sync + 'static,
{
    /// `Ok(None)` when no model has this id.
    async fn load(&self, id: &str) -> PersistenceResult<Option<M>>;

    async fn load_page(&self, query: &PageQuery) -> PersistenceResult<Page<M>> {
        let _ = query;
        Err(PersistenceError::Unsupported("load_page"))
    }

    /// Store a new model, returning it as stored (with its id assigned).
    async fn create(&self, model: M) -> PersistenceResult<M> {
        let _ = model;
        Err(PersistenceError::Unsupported("create"))
    }

    /// Replace the model stored under `id`. Also used for PUT-to-create.
    async fn update(&self, id: &str, model: M) -> PersistenceResult<M> {
        let _ = (id, model);
        Err(PersistenceError::Unsupported("update"))
    }

    async fn delete(&self, id: &str) -> PersistenceResult<()> {
        let _ = id;
        Err(PersistenceError::Unsupported("delete"))
    }
}
