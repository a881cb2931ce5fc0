//! A notes API served over HTTP.
//!
//! ```text
//! cargo run --example notes_api --features config,testing
//! curl -i localhost:3000/notes?offset=0&size=2
//! curl -i -X POST -H 'Content-Type: application/json' -d '{"text":"hi"}' localhost:3000/notes
//! ```
//!
//! Settings come from `lintel.toml` (if present), `.env` and `LINTEL_*` variables.

use lintel::lintel_config::ConfigBuilder;
use lintel::lintel_testing::{IdStrategy, InMemoryRepository, StaticAuthProvider};
use lintel::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Note {
    #[serde(default)]
    id: String,
    text: String,
    #[serde(default)]
    author: Option<String>,
}

struct Notes;

impl Resource for Notes {
    type Model = Note;
    type View = Note;

    fn name(&self) -> &str {
        "notes"
    }

    fn configure(&self, settings: &mut ResourceSettings) {
        settings.caching =
            CachingConfig::validate_by_etag(CacheControl::new().must_revalidate().max_age(10));
    }

    fn model_id(&self, model: &Note) -> String {
        model.id.clone()
    }

    fn schema(&self) -> Schema {
        Schema::new().read_only("id").primitive("text").primitive("author")
    }

    fn transitions(&self) -> Vec<Transition<Note>> {
        vec![
            Transition::new("collection", "/notes"),
            Transition::new("edit", "/notes/{id}").guarded_by(Constraint::role("editor")),
        ]
    }

    fn embedded_links(&self) -> Vec<EmbeddedLink> {
        vec![EmbeddedLink::new("author", "/authors/{author}")]
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lintel::lintel_log::init();

    let mut config = ConfigBuilder::new().load_dotenv(None).load_env();
    if Path::new("lintel.toml").exists() {
        config = config.add_file("lintel.toml");
    }
    let engine = config.build_engine_config()?;

    let repo = Arc::new(
        InMemoryRepository::new(|n: &Note| n.id.clone())
            .with_ids(IdStrategy::Uuid, |n, id| n.id = id),
    );
    let auth = StaticAuthProvider::new().with_user("editor-token", "eve", &["editor"]);

    let notes = ResourceBinding::new(Notes, repo)
        .with_auth_provider(Arc::new(auth))
        .with_defaults(engine.to_defaults()?);

    let mut registry = RouterRegistry::new();
    for err in registry.bind("/notes", &notes, "id", Some("application/json")) {
        lintel::lintel_log::error!("route not registered: {}", err);
    }

    Server::new(registry.into_router()).listen(engine.port).await?;
    Ok(())
}
