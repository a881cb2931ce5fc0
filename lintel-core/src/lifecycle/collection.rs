// GET on a collection

use super::steps;
use super::{Context, Flow, Pipeline, StepFuture, StepResult, ready};
use crate::cache_control::CacheControl;
use crate::repository::PageQuery;
use crate::resource::Resource;
use crate::response::ResponseBuilder;
use crate::Error;
use std::sync::Arc;

pub const TOTAL_RESULTS_HEADER: &str = "X-totalnumberofresults";

pub const RETURNED_RESULTS_HEADER: &str = "X-numberofresults";

fn missing_page() -> Error {
    Error::Internal("collection page was not loaded".to_string())
}

pub fn load_page<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    Box::pin(fetch_page(cx))
}

async fn fetch_page<R: Resource>(cx: &mut Context<R>) -> StepResult {
    let deps = Arc::clone(&cx.deps);
    let query = PageQuery {
        page: cx.page_request,
        filters: cx.request.query_params.clone(),
    };
    let mut page = deps.repository.load_page(&query).await?;

    // never return more than was asked for
    let size = usize::try_from(cx.page_request.size).unwrap_or(usize::MAX);
    page.items.truncate(size);

    cx.page = Some(page);
    Ok(Flow::Continue)
}

/// Collections are never validator-cacheable.
pub fn emit_collection_caching<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    cx.response.cache_control(&CacheControl::uncacheable());
    ready(Ok(Flow::Continue))
}

pub fn emit_result_counts<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    let Some(page) = cx.page.as_ref() else {
        return ready(Err(missing_page()));
    };
    cx.response
        .set_header(TOTAL_RESULTS_HEADER, &page.total.to_string())
        .set_header(RETURNED_RESULTS_HEADER, &page.len().to_string());
    ready(Ok(Flow::Continue))
}

pub fn render_collection<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    ready(write_collection(cx).map(|()| Flow::Continue))
}

fn write_collection<R: Resource>(cx: &mut Context<R>) -> Result<(), Error> {
    let page = cx.page.as_ref().ok_or_else(missing_page)?;
    let representation = cx
        .deps
        .resource
        .collection_representation(page, &cx.deps.compiled.embedded_links)?;
    let media_type = cx.media_type();
    cx.response.set_json(&media_type, &representation)?;
    Ok(())
}

/// `self`, then `prev`/`next`/`first`/`last` as the paging strategy decides.
pub fn emit_paging_links<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    let Some(page) = cx.page.as_ref() else {
        return ready(Err(missing_page()));
    };
    let links = cx
        .deps
        .paging
        .links(&cx.request, cx.page_request, page.total);
    for link in &links {
        cx.response.link(link);
    }
    ready(Ok(Flow::Continue))
}

pub fn emit_collection_transitions<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    let Some(page) = cx.page.as_ref() else {
        return ready(Err(missing_page()));
    };
    let fields = match steps::to_fields(page) {
        Ok(fields) => fields,
        Err(err) => return ready(Err(err)),
    };
    let links = steps::resolve_transitions(
        &cx.deps.compiled.collection_transitions,
        page,
        &fields,
        cx.auth.as_ref(),
    );
    for link in &links {
        cx.response.link(link);
    }
    ready(Ok(Flow::Continue))
}

pub fn pipeline<R: Resource>() -> Pipeline<Context<R>> {
    Pipeline::new("GET collection")
        .step("configure", steps::configure::<R>)
        .step("extract_params", steps::extract_params::<R>)
        .step("verify_api_key", steps::verify_api_key::<R>)
        .step("authenticate", steps::authenticate::<R>)
        .step("verify_roles", steps::verify_roles::<R>)
        .step("load_page", load_page::<R>)
        .step("emit_caching", emit_collection_caching::<R>)
        .step("emit_result_counts", emit_result_counts::<R>)
        .step("render_collection", render_collection::<R>)
        .step("emit_paging_links", emit_paging_links::<R>)
        .step("emit_transitions", emit_collection_transitions::<R>)
        .step("emit_auth_headers", steps::emit_auth_headers::<R>)
        .step("respond", steps::respond_ok::<R>)
}
