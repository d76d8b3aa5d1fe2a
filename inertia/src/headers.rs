//! Protocol headers and the request classifier.
//!
//! Every read is a pure header lookup: a missing or non-UTF-8 header yields an
//! empty result rather than an error.

use http::header::{HeaderMap, HeaderName, HeaderValue, REFERER};
use http::Method;

/// Marks a request made by the client runtime, and a response carrying a page payload.
pub const X_INERTIA: HeaderName = HeaderName::from_static("x-inertia");
/// Target of a forced full-browser navigation.
pub const X_INERTIA_LOCATION: HeaderName = HeaderName::from_static("x-inertia-location");
/// Asset version known to the client (request) or the server (response).
pub const X_INERTIA_VERSION: HeaderName = HeaderName::from_static("x-inertia-version");
/// Comma-separated prop keys a partial reload asks for.
pub const X_INERTIA_PARTIAL_DATA: HeaderName = HeaderName::from_static("x-inertia-partial-data");
/// Comma-separated prop keys a partial reload wants left out.
pub const X_INERTIA_PARTIAL_EXCEPT: HeaderName =
    HeaderName::from_static("x-inertia-partial-except");
/// Component a partial reload targets.
pub const X_INERTIA_PARTIAL_COMPONENT: HeaderName =
    HeaderName::from_static("x-inertia-partial-component");
/// Comma-separated merge prop keys the client wants replaced instead of merged.
pub const X_INERTIA_RESET: HeaderName = HeaderName::from_static("x-inertia-reset");

pub(crate) const TRUE_VALUE: HeaderValue = HeaderValue::from_static("true");
pub(crate) const VARY_VALUE: HeaderValue = HeaderValue::from_static("X-Inertia");
pub(crate) const JSON_CONTENT_TYPE: HeaderValue = HeaderValue::from_static("application/json");
pub(crate) const HTML_CONTENT_TYPE: HeaderValue = HeaderValue::from_static("text/html");

/// Returns true if the request was made by the client runtime.
pub fn is_inertia_request(headers: &HeaderMap) -> bool {
    headers.get(X_INERTIA).is_some_and(|v| !v.is_empty())
}

/// Component named by a partial reload, empty if none.
pub fn partial_component(headers: &HeaderMap) -> &str {
    header_str(headers, &X_INERTIA_PARTIAL_COMPONENT)
}

pub fn only_keys(headers: &HeaderMap) -> Vec<String> {
    header_list(headers, &X_INERTIA_PARTIAL_DATA)
}

pub fn except_keys(headers: &HeaderMap) -> Vec<String> {
    header_list(headers, &X_INERTIA_PARTIAL_EXCEPT)
}

pub fn reset_keys(headers: &HeaderMap) -> Vec<String> {
    header_list(headers, &X_INERTIA_RESET)
}

/// Asset version the client was built against, empty if none.
pub fn client_version(headers: &HeaderMap) -> &str {
    header_str(headers, &X_INERTIA_VERSION)
}

pub fn referer(headers: &HeaderMap) -> &str {
    header_str(headers, &REFERER)
}

/// PUT, PATCH and DELETE must be redirected with 303 instead of 302.
pub fn is_see_other_method(method: &Method) -> bool {
    matches!(*method, Method::PUT | Method::PATCH | Method::DELETE)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

// Entries are trimmed and empty ones dropped, so "a, b," reads as ["a", "b"]
// rather than ["a", " b", ""].
fn header_list(headers: &HeaderMap, name: &HeaderName) -> Vec<String> {
    header_str(headers, name)
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}
