// Lintel - REST resource lifecycles for Rust
//
// Resources declare their models, caching, authorization and links; the
// engine runs each verb's lifecycle and answers with the right status,
// headers and hypermedia.

// Re-export core functionality
pub use lintel_core::*;

// Logging macros
pub use lintel_log;

// Re-export optional crates
#[cfg(feature = "config")]
pub use lintel_config;

#[cfg(feature = "testing")]
pub use lintel_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        AuthInfo,
        AuthenticationInfoProvider,
        CacheControl,
        CachingConfig,
        Constraint,
        EmbeddedLink,
        EngineDefaults,
        Error,
        HttpMethod,
        HttpRequest,
        HttpResponse,
        Operation,
        Page,
        PageQuery,
        PersistenceError,
        PersistenceResult,
        Repository,
        Resource,
        ResourceBinding,
        ResourceSettings,
        RoleRequirement,
        RouteSpec,
        Router,
        RouterRegistry,
        Schema,
        Server,
        Transition,
    };
}
