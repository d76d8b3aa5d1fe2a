//! In-memory capture of a handler response.
//!
//! The final status and headers of a protocol response can only be decided
//! once the handler has fully run, so its response is recorded, possibly
//! rewritten, and only then turned back into a real response.

use http::header::{HeaderMap, HeaderValue, LOCATION, VARY};
use http::{Response, StatusCode};
use hyper::body::Bytes;

#[derive(Debug)]
pub struct ResponseRecorder {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ResponseRecorder {
    pub fn record(response: Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Turns the recorded response into `redirect`: its status, headers and
    /// body win, other recorded headers such as `Set-Cookie` are kept.
    pub fn redirect_to(&mut self, redirect: Response<Bytes>) {
        let (parts, body) = redirect.into_parts();
        self.status = parts.status;
        self.headers = merge_headers(std::mem::take(&mut self.headers), parts.headers);
        self.body = body;
    }

    /// Builds the real response. Headers recorded from the handler replace
    /// `pending` headers of the same name, except `Vary`, which accumulates.
    pub fn into_response(self, pending: HeaderMap) -> Response<Bytes> {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = merge_headers(pending, self.headers);
        response
    }
}

/// Applies `overrides` on top of `base`, name by name.
///
/// `Vary` values from both sides are kept, so a handler varying on another
/// header cannot drop `Vary: X-Inertia`.
pub fn merge_headers(mut base: HeaderMap, overrides: HeaderMap) -> HeaderMap {
    let mut current = None;
    for (name, value) in overrides {
        if let Some(name) = name {
            if name != VARY {
                base.remove(&name);
            }
            current = Some(name);
        }
        if let Some(name) = &current {
            if *name == VARY && base.get_all(VARY).iter().any(|v| *v == value) {
                continue;
            }
            base.append(name.clone(), value);
        }
    }
    base
}

/// Plain redirect response.
pub fn redirect_response(location: &str, status: StatusCode) -> Result<Response<Bytes>, http::Error> {
    Response::builder()
        .status(status)
        .header(LOCATION, HeaderValue::try_from(location)?)
        .body(Bytes::new())
}
