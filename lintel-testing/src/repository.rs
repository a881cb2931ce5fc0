// In-memory repository with call recording and failure injection

use async_trait::async_trait;
use lintel_core::{Page, PageQuery, PersistenceError, PersistenceResult, Repository};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Repository operations, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoOp {
    Load,
    LoadPage,
    Create,
    Update,
    Delete,
}

impl fmt::Display for RepoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RepoOp::Load => "load",
            RepoOp::LoadPage => "load_page",
            RepoOp::Create => "create",
            RepoOp::Update => "update",
            RepoOp::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCall {
    pub op: RepoOp,
    /// Model id, when the operation targets one.
    pub id: Option<String>,
}

/// How `create` names new models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStrategy {
    /// `1`, `2`, ... continuing after the seeded rows.
    Sequential,
    Uuid,
    /// Keep whatever id the model already carries.
    Provided,
}

type IdOf<M> = Arc<dyn Fn(&M) -> String + Send + Sync>;
type AssignId<M> = Arc<dyn Fn(&mut M, String) + Send + Sync>;
type Filter<M> = Arc<dyn Fn(&M, &HashMap<String, String>) -> bool + Send + Sync>;

/// Insertion-ordered storage for tests.
pub struct InMemoryRepository<M> {
    rows: Mutex<Vec<M>>,
    calls: Mutex<Vec<RepoCall>>,
    failures: Mutex<HashMap<RepoOp, PersistenceError>>,
    sequence: AtomicU64,
    ids: IdStrategy,
    id_of: IdOf<M>,
    assign_id: Option<AssignId<M>>,
    filter: Option<Filter<M>>,
}

impl<M: Clone + Send + Sync + 'static> InMemoryRepository<M> {
    pub fn new<F>(id_of: F) -> Self
    where
        F: Fn(&M) -> String + Send + Sync + 'static,
    {
        Self {
            rows: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(0),
            ids: IdStrategy::Provided,
            id_of: Arc::new(id_of),
            assign_id: None,
            filter: None,
        }
    }

    /// Give created models fresh ids via `assign`.
    pub fn with_ids<F>(mut self, strategy: IdStrategy, assign: F) -> Self
    where
        F: Fn(&mut M, String) + Send + Sync + 'static,
    {
        self.ids = strategy;
        self.assign_id = Some(Arc::new(assign));
        self
    }

    /// Apply request filters in `load_page`.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&M, &HashMap<String, String>) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_rows(self, rows: impl IntoIterator<Item = M>) -> Self {
        {
            let mut stored = self.rows.lock();
            stored.extend(rows);
            self.sequence.store(stored.len() as u64, Ordering::SeqCst);
        }
        self
    }

    pub fn insert(&self, model: M) {
        let id = (self.id_of)(&model);
        let mut rows = self.rows.lock();
        match rows.iter_mut().find(|m| (self.id_of)(m) == id) {
            Some(existing) => *existing = model,
            None => rows.push(model),
        }
    }

    pub fn get(&self, id: &str) -> Option<M> {
        self.rows.lock().iter().find(|m| (self.id_of)(m) == id).cloned()
    }

    pub fn all(&self) -> Vec<M> {
        self.rows.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    /// Make every future `op` fail with `error`.
    pub fn fail_on(&self, op: RepoOp, error: PersistenceError) {
        self.failures.lock().insert(op, error);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    pub fn calls(&self) -> Vec<RepoCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, op: RepoOp) -> usize {
        self.calls.lock().iter().filter(|c| c.op == op).count()
    }

    pub fn was_called(&self, op: RepoOp) -> bool {
        self.call_count(op) > 0
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, op: RepoOp, id: Option<&str>) -> PersistenceResult<()> {
        self.calls.lock().push(RepoCall {
            op,
            id: id.map(str::to_string),
        });
        match self.failures.lock().get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn next_id(&self) -> Option<String> {
        match self.ids {
            IdStrategy::Provided => None,
            IdStrategy::Sequential => {
                Some((self.sequence.fetch_add(1, Ordering::SeqCst) + 1).to_string())
            }
            IdStrategy::Uuid => Some(uuid::Uuid::new_v4().to_string()),
        }
    }
}

#[async_trait]
impl<M: Clone + Send + Sync + 'static> Repository<M> for InMemoryRepository<M> {
    async fn load(&self, id: &str) -> PersistenceResult<Option<M>> {
        self.record(RepoOp::Load, Some(id))?;
        Ok(self.get(id))
    }

    async fn load_page(&self, query: &PageQuery) -> PersistenceResult<Page<M>> {
        self.record(RepoOp::LoadPage, None)?;
        let rows = self.rows.lock();
        let matching: Vec<&M> = rows
            .iter()
            .filter(|m| self.filter.as_ref().is_none_or(|f| f(m, &query.filters)))
            .collect();

        let offset = usize::try_from(query.page.offset).unwrap_or(usize::MAX);
        let size = usize::try_from(query.page.size).unwrap_or(usize::MAX);
        let items = matching.iter().skip(offset).take(size).map(|m| (*m).clone()).collect();
        Ok(Page::new(items, matching.len() as u64))
    }

    async fn create(&self, mut model: M) -> PersistenceResult<M> {
        self.record(RepoOp::Create, None)?;
        if let (Some(id), Some(assign)) = (self.next_id(), &self.assign_id) {
            assign(&mut model, id);
        }

        let id = (self.id_of)(&model);
        let mut rows = self.rows.lock();
        if rows.iter().any(|m| (self.id_of)(m) == id) {
            return Err(PersistenceError::Conflict(format!("`{}` already exists", id)));
        }
        rows.push(model.clone());
        Ok(model)
    }

    async fn update(&self, id: &str, model: M) -> PersistenceResult<M> {
        self.record(RepoOp::Update, Some(id))?;
        let mut rows = self.rows.lock();
        match rows.iter_mut().find(|m| (self.id_of)(m) == id) {
            Some(existing) => *existing = model.clone(),
            None => rows.push(model.clone()),
        }
        Ok(model)
    }

    async fn delete(&self, id: &str) -> PersistenceResult<()> {
        self.record(RepoOp::Delete, Some(id))?;
        self.rows.lock().retain(|m| (self.id_of)(m) != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lintel_core::PageRequest;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        tag: String,
    }

    fn item(id: &str, tag: &str) -> Item {
        Item {
            id: id.to_string(),
            tag: tag.to_string(),
        }
    }

    fn repo() -> InMemoryRepository<Item> {
        InMemoryRepository::new(|i: &Item| i.id.clone())
            .with_ids(IdStrategy::Sequential, |i, id| i.id = id)
            .with_rows([item("1", "a"), item("2", "b"), item("3", "a")])
    }

    fn query(offset: u64, size: u64) -> PageQuery {
        PageQuery {
            page: PageRequest::new(offset, size),
            filters: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_load_and_calls() {
        let repo = repo();
        assert_eq!(repo.load("2").await.unwrap(), Some(item("2", "b")));
        assert_eq!(repo.load("9").await.unwrap(), None);
        assert_eq!(repo.call_count(RepoOp::Load), 2);
        assert_eq!(repo.calls()[1].id.as_deref(), Some("9"));
    }

    #[tokio::test]
    async fn test_page_window() {
        let repo = repo();
        let page = repo.load_page(&query(1, 1)).await.unwrap();
        assert_eq!(page.items, vec![item("2", "b")]);
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn test_page_filter() {
        let repo = repo().with_filter(|i, filters| {
            filters.get("tag").is_none_or(|tag| &i.tag == tag)
        });
        let mut q = query(0, 10);
        q.filters.insert("tag".into(), "a".into());

        let page = repo.load_page(&q).await.unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_id() {
        let repo = repo();
        let created = repo.create(item("", "c")).await.unwrap();
        assert_eq!(created.id, "4");
        assert_eq!(repo.len(), 4);
    }

    #[tokio::test]
    async fn test_create_provided_conflict() {
        let repo = InMemoryRepository::new(|i: &Item| i.id.clone()).with_rows([item("1", "a")]);
        let err = repo.create(item("1", "b")).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Conflict(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_with_same_id() {
        let repo = Arc::new(InMemoryRepository::new(|i: &Item| i.id.clone()));
        let tasks: Vec<_> = (0..32)
            .map(|n| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move { repo.create(item("dup", &n.to_string())).await })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_uuid_ids() {
        let repo = InMemoryRepository::new(|i: &Item| i.id.clone())
            .with_ids(IdStrategy::Uuid, |i, id| i.id = id);
        let created = repo.create(item("", "x")).await.unwrap();
        assert_eq!(created.id.len(), 36);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let repo = repo();
        repo.fail_on(RepoOp::Delete, PersistenceError::Storage("disk full".into()));

        assert!(repo.delete("1").await.is_err());
        assert_eq!(repo.len(), 3);
        assert!(repo.was_called(RepoOp::Delete));

        repo.clear_failures();
        repo.delete("1").await.unwrap();
        assert_eq!(repo.len(), 2);
    }
}
