// GET on a single resource

use super::steps;
use super::{Context, Flow, Pipeline, StepFuture, ready};
use crate::conditional::{ClientValidators, is_resource_unchanged};
use crate::resource::Resource;
use crate::response::ResponseBuilder;

/// Answer `304` with the caching headers and no entity when the client's
/// copy is still current.
pub fn evaluate_not_modified<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    let client = ClientValidators::from_request(&cx.request);
    if !is_resource_unchanged(&cx.validator, &client) {
        return ready(Ok(Flow::Continue));
    }
    steps::apply_caching(cx);
    cx.response.not_modified();
    ready(Ok(Flow::Done))
}

pub fn pipeline<R: Resource>() -> Pipeline<Context<R>> {
    Pipeline::new("GET")
        .step("configure", steps::configure::<R>)
        .step("extract_params", steps::extract_params::<R>)
        .step("verify_api_key", steps::verify_api_key::<R>)
        .step("authenticate", steps::authenticate::<R>)
        .step("verify_roles", steps::verify_roles::<R>)
        .step("load_model", steps::load_model::<R>)
        .step("check_constraints", steps::check_constraints::<R>)
        .step("compute_validator", steps::compute_validator::<R>)
        .step("evaluate_not_modified", evaluate_not_modified::<R>)
        .step("emit_caching", steps::emit_caching::<R>)
        .step("render_model", steps::render_model::<R>)
        .step("emit_self_link", steps::emit_self_link::<R>)
        .step("emit_transitions", steps::emit_transitions::<R>)
        .step("emit_auth_headers", steps::emit_auth_headers::<R>)
        .step("respond", steps::respond_ok::<R>)
}
