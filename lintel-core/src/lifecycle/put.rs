// PUT updating (or, when allowed, creating) a resource

use super::steps;
use super::{Context, Flow, Pipeline, StepFuture, StepResult, ready};
use crate::resource::Resource;
use crate::response::ResponseBuilder;
use crate::Error;
use std::sync::Arc;

/// Load the stored model; a missing one is 404 unless PUT may create.
pub fn load_existing<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    Box::pin(load_for_update(cx))
}

async fn load_for_update<R: Resource>(cx: &mut Context<R>) -> StepResult {
    let deps = Arc::clone(&cx.deps);
    let id = steps::require_id(cx)?;
    match deps.repository.load(&id).await? {
        Some(model) => {
            cx.model = Some(model);
            Ok(Flow::Continue)
        }
        None if cx.settings.allow_put_create => {
            lintel_log::debug!("{} `{}` absent, PUT will create it", deps.resource.name(), id);
            Ok(Flow::Continue)
        }
        None => Err(steps::not_found(&*deps.resource, &id)),
    }
}

/// Merge the payload into the stored model, or build a new one.
pub fn merge_payload<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    ready(merge(cx).map(|()| Flow::Continue))
}

fn merge<R: Resource>(cx: &mut Context<R>) -> Result<(), Error> {
    let deps = Arc::clone(&cx.deps);
    let schema = &deps.compiled.schema;
    let view = cx
        .payload
        .as_ref()
        .ok_or_else(|| Error::BadRequest("missing request body".to_string()))?;

    let merged = match cx.model.as_ref() {
        Some(existing) => deps.resource.merge_model(schema, existing, view)?,
        None => {
            let id = steps::require_id(cx)?;
            deps.resource.create_model_with_id(schema, &id, view)?
        }
    };
    cx.model = Some(merged);
    Ok(())
}

pub fn persist_update<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    Box::pin(store_update(cx))
}

async fn store_update<R: Resource>(cx: &mut Context<R>) -> StepResult {
    let deps = Arc::clone(&cx.deps);
    let id = steps::require_id(cx)?;
    let Some(model) = cx.model.take() else {
        return Err(Error::Internal("no model to persist".to_string()));
    };
    let stored = deps.repository.update(&id, model).await?;
    cx.model = Some(stored);
    Ok(Flow::Continue)
}

/// `200` with the representation, or `204` when the resource omits it.
pub fn render_updated<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    if cx.settings.omit_put_representation {
        cx.response.no_content();
        return ready(Ok(Flow::Continue));
    }
    ready(steps::write_representation(cx).map(|()| {
        cx.response.ok();
        Flow::Continue
    }))
}

pub fn pipeline<R: Resource>() -> Pipeline<Context<R>> {
    Pipeline::new("PUT")
        .step("configure", steps::configure::<R>)
        .step("extract_params", steps::extract_params::<R>)
        .step("verify_api_key", steps::verify_api_key::<R>)
        .step("authenticate", steps::authenticate::<R>)
        .step("verify_roles", steps::verify_roles::<R>)
        .step("load_model", load_existing::<R>)
        .step("read_payload", steps::read_payload::<R>)
        .step("check_constraints", steps::check_payload_constraints::<R>)
        .step("compute_validator", steps::compute_validator::<R>)
        .step("verify_preconditions", steps::verify_preconditions::<R>)
        .step("merge_payload", merge_payload::<R>)
        .step("persist", persist_update::<R>)
        .step("refresh_validator", steps::compute_validator::<R>)
        .step("emit_caching", steps::emit_caching::<R>)
        .step("emit_self_link", steps::emit_self_link::<R>)
        .step("emit_transitions", steps::emit_transitions::<R>)
        .step("render", render_updated::<R>)
        .step("emit_auth_headers", steps::emit_auth_headers::<R>)
}
