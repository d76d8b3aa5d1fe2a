use http::header::HeaderMap;
use http::request::Parts;
use http::{Method, Request, Uri};
use hyper::body::Bytes;

use crate::headers;
use crate::state::RequestState;

/// Everything the middleware and the wrapped handler know about one request.
///
/// Besides the request itself it carries the [`RequestState`] and the headers
/// the middleware wants on the final response.
#[derive(Debug)]
pub struct RequestContext {
    parts: Parts,
    body: Bytes,
    state: RequestState,
    response_headers: HeaderMap,
}

impl RequestContext {
    pub fn new(request: Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body,
            state: RequestState::new(),
            response_headers: HeaderMap::new(),
        }
    }

    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut RequestState {
        &mut self.state
    }

    /// Path and query of the request, as sent by the client.
    pub fn url(&self) -> String {
        self.parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| self.parts.uri.path().to_string())
    }

    pub fn is_inertia_request(&self) -> bool {
        headers::is_inertia_request(&self.parts.headers)
    }

    /// Headers the middleware applies to the final response, beneath any set by the handler.
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    pub fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response_headers
    }
}
