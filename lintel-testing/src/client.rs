// In-process client over a compiled router

use crate::TestRequest;
use lintel_core::{HttpResponse, Router};
use std::sync::Arc;

/// Dispatches requests straight into a [`Router`], no sockets involved.
#[derive(Clone)]
pub struct TestClient {
    router: Arc<Router>,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
        }
    }

    pub fn from_shared(router: Arc<Router>) -> Self {
        Self { router }
    }

    pub async fn send(&self, request: TestRequest) -> HttpResponse {
        self.router.dispatch(request.build()).await
    }

    pub async fn get(&self, path: &str) -> HttpResponse {
        self.send(TestRequest::get(path)).await
    }

    pub async fn delete(&self, path: &str) -> HttpResponse {
        self.send(TestRequest::delete(path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lintel_core::RouterRegistry;

    #[tokio::test]
    async fn test_unrouted_is_404() {
        let client = TestClient::new(RouterRegistry::new().into_router());
        assert_eq!(client.get("/nothing").await.status, 404);
    }
}
