// Test assertions for lifecycle responses

use lintel_core::error::{ERROR_MEDIA_TYPE, ErrorBody};
use lintel_core::{HttpResponse, LinkRelation};
use serde::de::DeserializeOwned;

/// Every `Link` header, parsed.
pub fn links(response: &HttpResponse) -> Vec<LinkRelation> {
    response
        .header_values("Link")
        .into_iter()
        .filter_map(LinkRelation::parse)
        .collect()
}

pub fn assert_status(response: &HttpResponse, expected: u16) {
    assert_eq!(
        response.status,
        expected,
        "Expected status {}, got {}. Body: {}",
        expected,
        response.status,
        String::from_utf8_lossy(&response.body)
    );
}

pub fn assert_header(response: &HttpResponse, name: &str, expected: &str) {
    let actual = response.header(name);
    assert_eq!(
        actual,
        Some(expected),
        "Expected header '{}' to be '{}', got {:?}",
        name,
        expected,
        actual
    );
}

pub fn assert_no_header(response: &HttpResponse, name: &str) {
    let actual = response.header(name);
    assert!(
        actual.is_none(),
        "Expected no '{}' header, got {:?}",
        name,
        actual
    );
}

/// Assert a link with `rel` exists and points at `href`.
pub fn assert_link(response: &HttpResponse, rel: &str, href: &str) -> LinkRelation {
    let all = links(response);
    let Some(link) = all.iter().find(|l| l.rel == rel) else {
        panic!("Expected a '{}' link, got {:?}", rel, all);
    };
    assert_eq!(link.href, href, "Link '{}' points elsewhere", rel);
    link.clone()
}

pub fn assert_no_link(response: &HttpResponse, rel: &str) {
    let all = links(response);
    assert!(
        all.iter().all(|l| l.rel != rel),
        "Expected no '{}' link, got {:?}",
        rel,
        all
    );
}

pub fn assert_no_links(response: &HttpResponse) {
    let values = response.header_values("Link");
    assert!(values.is_empty(), "Expected no links, got {:?}", values);
}

/// Assert a vnd.error body with `status` and return it.
pub fn assert_error_body(response: &HttpResponse, status: u16) -> ErrorBody {
    assert_status(response, status);
    assert_header(response, "Content-Type", ERROR_MEDIA_TYPE);
    let body: ErrorBody = match response.json() {
        Ok(body) => body,
        Err(err) => panic!("Expected an error body: {}", err),
    };
    assert_eq!(body.status, status, "Error body status mismatch");
    body
}

pub fn assert_json<T>(response: &HttpResponse, expected: &T)
where
    T: DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let actual: T = match response.json() {
        Ok(actual) => actual,
        Err(err) => panic!("Failed to deserialize response body: {}", err),
    };
    assert_eq!(actual, *expected, "JSON bodies do not match");
}

pub fn assert_empty_body(response: &HttpResponse) {
    assert!(
        response.body.is_empty(),
        "Expected an empty body, got {}",
        String::from_utf8_lossy(&response.body)
    );
}
