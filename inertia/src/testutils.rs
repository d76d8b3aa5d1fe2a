use async_trait::async_trait;
use http::Response;
use http::request::Builder;
use hyper::body::Bytes;
use std::pin::Pin;

use crate::context::RequestContext;
use crate::errors::Result;
use crate::headers::{X_INERTIA, X_INERTIA_VERSION};
use crate::inertia::Inertia;
use crate::middleware::Handler;
use crate::version::hash_version;

pub const TEMPLATE: &str =
    "<html><head>{{ inertiaHead }}</head><body>{{ inertia }}</body></html>";

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<Response<Bytes>>> + Send + 'a>>;

type HandlerFn =
    dyn for<'a> Fn(&'a Inertia, &'a mut RequestContext) -> HandlerFuture<'a> + Send + Sync;

/// Handler backed by a closure.
pub struct FnHandler(Box<HandlerFn>);

impl FnHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a Inertia, &'a mut RequestContext) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        FnHandler(Box::new(f))
    }
}

#[async_trait]
impl Handler for FnHandler {
    async fn handle(&self, inertia: &Inertia, cx: &mut RequestContext) -> Result<Response<Bytes>> {
        (self.0)(inertia, cx).await
    }
}

/// Engine on the default template with version "1".
pub fn engine() -> Inertia {
    Inertia::new(TEMPLATE)
        .expect("test template is valid")
        .with_version("1")
        .build()
}

pub fn get(uri: &str) -> Builder {
    http::Request::builder().uri(uri)
}

/// Protocol GET from a client on the version of [`engine`].
pub fn inertia_get(uri: &str) -> Builder {
    get(uri)
        .header(X_INERTIA, "true")
        .header(X_INERTIA_VERSION, hash_version("1"))
}

pub fn context(builder: Builder) -> RequestContext {
    RequestContext::new(builder.body(Bytes::new()).expect("valid test request"))
}

pub fn body_string(response: &Response<Bytes>) -> String {
    String::from_utf8(response.body().to_vec()).expect("utf-8 body")
}

pub fn body_json(response: &Response<Bytes>) -> serde_json::Value {
    serde_json::from_slice(response.body()).expect("json body")
}
