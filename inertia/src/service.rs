//! hyper [`Service`] running the middleware in front of a [`Handler`].

use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use shared::http::{full_body, make_boxed_error_response, make_error_response};
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::InertiaError;
use crate::inertia::Inertia;
use crate::middleware::Handler;

pub struct InertiaService<H> {
    inertia: Inertia,
    handler: Arc<H>,
}

impl<H> InertiaService<H> {
    pub fn new(inertia: Inertia, handler: H) -> Self {
        Self {
            inertia,
            handler: Arc::new(handler),
        }
    }
}

impl<H> Service<Request<Incoming>> for InertiaService<H>
where
    H: Handler + 'static,
{
    type Response = Response<BoxBody<Bytes, Self::Error>>;
    type Error = InertiaError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let inertia = self.inertia.clone();
        let handler = self.handler.clone();

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let body = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    let err = InertiaError::RequestBody(e);
                    tracing::warn!(error = %err, "Cannot read request body");
                    return Ok(make_boxed_error_response(StatusCode::BAD_REQUEST));
                }
            };

            let method = parts.method.clone();
            let uri = parts.uri.clone();

            let response = match inertia
                .handle(Request::from_parts(parts, body), handler.as_ref())
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(error = %e, method = %method, uri = %uri, "Request failed");
                    make_error_response(StatusCode::INTERNAL_SERVER_ERROR)
                }
            };

            Ok(response.map(|body| full_body(body)))
        })
    }
}
