// POST creating a new resource

use super::steps;
use super::{Context, Flow, Pipeline, StepFuture, StepResult, ready};
use crate::resource::Resource;
use crate::response::ResponseBuilder;
use crate::Error;
use std::sync::Arc;

/// Let the resource build the new model from the payload.
pub fn build_model<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    let outcome = match cx.payload.as_ref() {
        Some(view) => cx
            .deps
            .resource
            .create_model(&cx.deps.compiled.schema, view),
        None => Err(Error::BadRequest("missing request body".to_string())),
    };
    ready(outcome.map(|model| {
        cx.model = Some(model);
        Flow::Continue
    }))
}

pub fn persist_created<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    Box::pin(store_new(cx))
}

async fn store_new<R: Resource>(cx: &mut Context<R>) -> StepResult {
    let deps = Arc::clone(&cx.deps);
    let Some(model) = cx.model.take() else {
        return Err(Error::Internal("no model to persist".to_string()));
    };
    let stored = deps.repository.create(model).await?;
    cx.id = Some(deps.resource.model_id(&stored));
    cx.model = Some(stored);
    Ok(Flow::Continue)
}

/// `201 Created` with `Location: <request URL>/<new id>`.
pub fn emit_location<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    let Some(id) = cx.id.as_deref() else {
        return ready(Err(Error::Internal(
            "created model has no id".to_string(),
        )));
    };
    let location = format!(
        "{}/{}",
        cx.request.url().trim_end_matches('/'),
        urlencoding::encode(id)
    );
    cx.response.created(&location);
    ready(Ok(Flow::Continue))
}

pub fn pipeline<R: Resource>() -> Pipeline<Context<R>> {
    Pipeline::new("POST")
        .step("configure", steps::configure::<R>)
        .step("extract_params", steps::extract_params::<R>)
        .step("verify_api_key", steps::verify_api_key::<R>)
        .step("authenticate", steps::authenticate::<R>)
        .step("verify_roles", steps::verify_roles::<R>)
        .step("read_payload", steps::read_payload::<R>)
        .step("check_constraints", steps::check_payload_constraints::<R>)
        .step("build_model", build_model::<R>)
        .step("persist", persist_created::<R>)
        .step("emit_location", emit_location::<R>)
        .step("emit_transitions", steps::emit_transitions::<R>)
        .step("emit_auth_headers", steps::emit_auth_headers::<R>)
}
