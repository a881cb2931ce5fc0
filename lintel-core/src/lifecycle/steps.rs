// Steps shared by several verbs

use super::{Context, Flow, StepFuture, StepResult, ready};
use crate::auth::AuthInfo;
use crate::cache_control::CachingPolicy;
use crate::conditional::{ClientValidators, Validator, client_has_current_version};
use crate::constraint::first_violation;
use crate::link::{LinkRelation, Transition};
use crate::resource::Resource;
use crate::response::ResponseBuilder;
use crate::Error;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

// ===== Setup =====

/// Let the resource adjust its settings for this request.
pub fn configure<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    let deps = Arc::clone(&cx.deps);
    deps.resource.configure(&mut cx.settings);
    ready(Ok(Flow::Continue))
}

pub fn extract_params<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    cx.id = cx.request.param(cx.deps.resource.id_param()).cloned();
    cx.page_request = cx.deps.paging.page_request(&cx.request);
    ready(Ok(Flow::Continue))
}

// ===== Authentication & Authorization =====

pub fn verify_api_key<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    Box::pin(check_api_key(cx))
}

async fn check_api_key<R: Resource>(cx: &mut Context<R>) -> StepResult {
    if !cx.settings.api_key_required {
        return Ok(Flow::Continue);
    }

    let header = cx.settings.api_key_header.clone();
    let Some(key) = cx.request.header(&header).map(str::to_string) else {
        return Err(Error::Unauthorized(format!("missing `{}` header", header)));
    };

    let Some(provider) = cx.deps.api_key_provider.clone() else {
        lintel_log::error!(
            "resource `{}` requires an API key but has no API key provider",
            cx.deps.resource.name()
        );
        return Err(Error::Internal("no API key provider configured".to_string()));
    };

    match provider.get(&key).await? {
        Some(info) => {
            lintel_log::debug!("API key `{}` accepted", info.key_id);
            cx.api_key = Some(info);
            Ok(Flow::Continue)
        }
        None => Err(Error::Unauthorized("invalid API key".to_string())),
    }
}

/// Resolve the caller's identity when an authentication provider is bound.
pub fn authenticate<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    Box::pin(resolve_caller(cx))
}

async fn resolve_caller<R: Resource>(cx: &mut Context<R>) -> StepResult {
    if let Some(provider) = cx.deps.auth_provider.clone() {
        cx.auth = provider.get(&cx.request).await?;
    }
    Ok(Flow::Continue)
}

/// 401 without credentials, 403 when a required role is missing.
pub fn verify_roles<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    let roles = &cx.settings.roles;
    let outcome = if !roles.is_required() {
        Ok(Flow::Continue)
    } else {
        match &cx.auth {
            None => Err(Error::Unauthorized("authentication required".to_string())),
            Some(auth) if roles.is_satisfied_by(auth) => Ok(Flow::Continue),
            Some(auth) => Err(Error::Forbidden(format!(
                "`{}` lacks the required roles: {}",
                auth.subject,
                roles.describe()
            ))),
        }
    };
    ready(outcome)
}

// ===== Loading =====

pub(crate) fn require_id<R: Resource>(cx: &Context<R>) -> Result<String, Error> {
    cx.id.clone().ok_or_else(|| {
        Error::BadRequest(format!(
            "missing path parameter `{}`",
            cx.deps.resource.id_param()
        ))
    })
}

pub(crate) fn not_found<R: Resource>(resource: &R, id: &str) -> Error {
    Error::NotFound(format!("{} `{}` not found", resource.name(), id))
}

/// Load the model named by the path; 404 when absent.
pub fn load_model<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    Box::pin(load_by_id(cx))
}

async fn load_by_id<R: Resource>(cx: &mut Context<R>) -> StepResult {
    let deps = Arc::clone(&cx.deps);
    let id = require_id(cx)?;
    match deps.repository.load(&id).await? {
        Some(model) => {
            cx.model = Some(model);
            Ok(Flow::Continue)
        }
        None => Err(not_found(&*deps.resource, &id)),
    }
}

/// Parse the request body into the resource's view type.
pub fn read_payload<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    let outcome = match cx.request.json::<R::View>() {
        Ok(view) => {
            cx.payload = Some(view);
            Ok(Flow::Continue)
        }
        Err(err) => Err(err),
    };
    ready(outcome)
}

// ===== Constraints =====

fn rejected(name: &str) -> Error {
    Error::Forbidden(format!("constraint `{}` rejected the request", name))
}

/// Entry constraints over the loaded model.
pub fn check_constraints<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    let outcome = match cx.model.as_ref() {
        Some(model) => {
            match first_violation(&cx.deps.compiled.constraints, model, cx.auth.as_ref()) {
                Some(violated) => Err(rejected(violated.name())),
                None => Ok(Flow::Continue),
            }
        }
        None => Ok(Flow::Continue),
    };
    ready(outcome)
}

/// Entry constraints over the incoming view, before it touches any model.
pub fn check_payload_constraints<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    let outcome = match cx.payload.as_ref() {
        Some(view) => match first_violation(
            &cx.deps.compiled.payload_constraints,
            view,
            cx.auth.as_ref(),
        ) {
            Some(violated) => Err(rejected(violated.name())),
            None => Ok(Flow::Continue),
        },
        None => Ok(Flow::Continue),
    };
    ready(outcome)
}

// ===== Conditional Requests =====

pub(crate) fn refresh_validator<R: Resource>(cx: &mut Context<R>) -> Result<(), Error> {
    let validator = match cx.model.as_ref() {
        Some(model) => Validator {
            etag: Some(cx.deps.resource.etag(model)?),
            last_modified: cx.deps.resource.last_modified(model),
        },
        None => Validator::default(),
    };
    cx.validator = validator;
    Ok(())
}

/// Fingerprint the current model (ETag and Last-Modified).
pub fn compute_validator<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    ready(refresh_validator(cx).map(|()| Flow::Continue))
}

/// PUT/DELETE: 412 unless the client edited the current version.
pub fn verify_preconditions<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    let client = ClientValidators::from_request(&cx.request);
    let outcome = if cx.model.is_none() {
        // nothing stored yet: only an unconditional create may proceed
        match client.if_match {
            Some(_) => Err(Error::PreconditionFailed(
                "no current representation to match".to_string(),
            )),
            None => Ok(Flow::Continue),
        }
    } else if client_has_current_version(&cx.validator, &client) {
        Ok(Flow::Continue)
    } else {
        Err(Error::PreconditionFailed(
            "the resource has changed since the client's version".to_string(),
        ))
    };
    ready(outcome)
}

// ===== Response =====

/// Caching headers the configured policy calls for.
pub(crate) fn apply_caching<R: Resource>(cx: &mut Context<R>) {
    let caching = &cx.settings.caching;
    cx.response.cache_control(&caching.cache_control());
    if caching.policy.uses_etag() {
        if let Some(etag) = &cx.validator.etag {
            cx.response.etag(etag);
        }
    } else if caching.policy.uses_timestamp() {
        if let Some(modified) = cx.validator.last_modified {
            cx.response.last_modified(modified);
        }
    } else if caching.policy == CachingPolicy::Expires {
        let max_age = caching.directives.max_age;
        if max_age > 0 && !caching.directives.no_store {
            cx.response
                .expires(SystemTime::now() + Duration::from_secs(max_age));
        }
    }
}

pub fn emit_caching<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    apply_caching(cx);
    ready(Ok(Flow::Continue))
}

pub(crate) fn write_representation<R: Resource>(cx: &mut Context<R>) -> Result<(), Error> {
    let Some(model) = cx.model.as_ref() else {
        return Err(Error::Internal("no model to represent".to_string()));
    };
    let representation = cx
        .deps
        .resource
        .to_representation(model, &cx.deps.compiled.embedded_links)?;
    let media_type = cx.media_type();
    cx.response.set_json(&media_type, &representation)?;
    Ok(())
}

pub fn render_model<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    ready(write_representation(cx).map(|()| Flow::Continue))
}

pub fn emit_self_link<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    let mut link = LinkRelation::new(cx.request.url(), "self");
    if let Some(media_type) = &cx.accepted {
        link = link.with_type(media_type.to_string());
    }
    cx.response.link(&link);
    ready(Ok(Flow::Continue))
}

/// Resolve transitions, leaving out guarded and unresolvable ones.
pub(crate) fn resolve_transitions<T: ?Sized>(
    transitions: &[Transition<T>],
    subject: &T,
    fields: &Value,
    auth: Option<&AuthInfo>,
) -> Vec<LinkRelation> {
    transitions
        .iter()
        .filter_map(|transition| match transition.resolve(subject, fields, auth) {
            Ok(link) => link,
            Err(err) => {
                lintel_log::warn!("omitting transition `{}`: {}", transition.rel, err);
                None
            }
        })
        .collect()
}

pub(crate) fn to_fields<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|e| Error::Serialization(e.to_string()))
}

/// Author-defined transition links of the current model.
pub fn emit_transitions<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    let links = match cx.model.as_ref() {
        Some(model) => match to_fields(model) {
            Ok(fields) => resolve_transitions(
                &cx.deps.compiled.transitions,
                model,
                &fields,
                cx.auth.as_ref(),
            ),
            Err(err) => return ready(Err(err)),
        },
        None => Vec::new(),
    };
    for link in &links {
        cx.response.link(link);
    }
    ready(Ok(Flow::Continue))
}

/// Pending headers from the authentication provider, e.g. a refreshed token.
pub fn emit_auth_headers<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    if let Some(auth) = &cx.auth {
        for (name, value) in &auth.response_headers {
            cx.response.append_header(name, value);
        }
    }
    ready(Ok(Flow::Continue))
}

pub fn respond_ok<R: Resource>(cx: &mut Context<R>) -> StepFuture<'_> {
    cx.response.ok();
    ready(Ok(Flow::Continue))
}
