// Core library for the Lintel REST engine
// Content negotiation, conditional requests, caching headers and hypermedia
// links, sequenced per HTTP verb by the request lifecycles

pub mod auth;
pub mod cache_control;
pub mod conditional;
pub mod constraint;
pub mod content_negotiation;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod link;
pub mod pagination;
pub mod registry;
pub mod repository;
pub mod resource;
pub mod response;
pub mod schema;
pub mod server;
pub mod status;

// Re-export commonly used types
pub use auth::*;
pub use cache_control::*;
pub use conditional::*;
pub use constraint::*;
pub use content_negotiation::*;
pub use endpoint::*;
pub use error::*;
pub use http::*;
pub use lifecycle::{Flow, Pipeline, Step};
pub use link::*;
pub use pagination::*;
pub use registry::{Router, RouterRegistry, RouteSpec};
pub use repository::*;
pub use resource::*;
pub use response::ResponseBuilder;
pub use schema::*;
pub use server::Server;
pub use status::*;
