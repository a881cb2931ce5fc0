//! Testing utilities for Lintel resources.
//!
//! - **TestRequest** - request builder with conditional and auth helpers
//! - **TestClient** - in-process dispatch through a compiled router
//! - **InMemoryRepository** - storage with a call log and failure injection
//! - **StaticAuthProvider / StaticApiKeyProvider** - fixed credential tables
//! - **Assertions** - status, header, link and error-body checks
//!
//! ## Quick Start
//!
//! ```no_run
//! use lintel_testing::*;
//! use lintel_core::RouterRegistry;
//!
//! # tokio_test::block_on(async {
//! let client = TestClient::new(RouterRegistry::new().into_router());
//! let response = client.send(TestRequest::get("/users").page(0, 10)).await;
//! assert_error_body(&response, 404);
//! # });
//! ```
//!
//! ## Repositories
//!
//! ```
//! use lintel_testing::{InMemoryRepository, IdStrategy, RepoOp};
//!
//! #[derive(Clone)]
//! struct Note { id: String }
//!
//! let repo = InMemoryRepository::new(|n: &Note| n.id.clone())
//!     .with_ids(IdStrategy::Sequential, |n, id| n.id = id)
//!     .with_rows([Note { id: "1".into() }]);
//!
//! assert_eq!(repo.len(), 1);
//! assert!(!repo.was_called(RepoOp::Load));
//! ```

pub mod assertions;
pub mod auth;
pub mod client;
pub mod repository;
pub mod request;

pub use assertions::*;
pub use auth::{StaticApiKeyProvider, StaticAuthProvider};
pub use client::TestClient;
pub use repository::{IdStrategy, InMemoryRepository, RepoCall, RepoOp};
pub use request::TestRequest;
