// DELETE removing a resource

use super::steps;
use super::{Context, Flow, Pipeline, StepFuture, StepResult, ready};
use crate::resource::Resource;
use crate::response::ResponseBuilder;
use std::sync::Arc;

pub fn delete_model<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    Box::pin(remove(cx))
}

async fn remove<R: Resource>(cx: &mut Context<R>) -> StepResult {
    let deps = Arc::clone(&cx.deps);
    let id = steps::require_id(cx)?;
    deps.repository.delete(&id).await?;
    lintel_log::debug!("{} `{}` deleted", deps.resource.name(), id);
    Ok(Flow::Continue)
}

/// `204`, or `200` with the last known representation when configured.
pub fn render_deleted<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    if !cx.settings.return_deleted_representation {
        cx.response.no_content();
        return ready(Ok(Flow::Continue));
    }
    ready(steps::write_representation(cx).map(|()| {
        cx.response.ok();
        Flow::Continue
    }))
}

pub fn pipeline<R: Resource>() -> Pipeline<Context<R>> {
    Pipeline::new("DELETE")
        .step("configure", steps::configure::<R>)
        .step("extract_params", steps::extract_params::<R>)
        .step("verify_api_key", steps::verify_api_key::<R>)
        .step("authenticate", steps::authenticate::<R>)
        .step("verify_roles", steps::verify_roles::<R>)
        .step("load_model", steps::load_model::<R>)
        .step("check_constraints", steps::check_constraints::<R>)
        .step("compute_validator", steps::compute_validator::<R>)
        .step("verify_preconditions", steps::verify_preconditions::<R>)
        .step("delete", delete_model::<R>)
        .step("emit_transitions", steps::emit_transitions::<R>)
        .step("render", render_deleted::<R>)
        .step("emit_auth_headers", steps::emit_auth_headers::<R>)
}
