//! The protocol middleware wrapped around every handler.
//!
//! For one request:
//!
//! 1. `Vary: X-Inertia` and the current version header are queued for the
//!    response, and one-shot flash data is moved into the request state.
//! 2. Plain requests go straight to the handler.
//! 3. Protocol requests have the handler response recorded, then:
//!    a. a GET from a client with another version is answered with a forced
//!       reload and the recorded response is dropped,
//!    b. an empty 200 becomes a redirect back,
//!    c. a 302 answering PUT, PATCH or DELETE becomes a 303,
//!    d. the recorded response is written out.

use async_trait::async_trait;
use http::header::{HeaderValue, VARY};
use http::{Method, Request, Response, StatusCode};
use hyper::body::Bytes;
use serde_json::Value;
use shared::counter;

use crate::context::RequestContext;
use crate::errors::Result;
use crate::flash::ERRORS_KEY;
use crate::headers::{self, VARY_VALUE, X_INERTIA_VERSION};
use crate::inertia::Inertia;
use crate::metrics_defs::{FORCED_RELOADS, REDIRECT_BACKS};
use crate::recorder::ResponseRecorder;

/// Application code running behind the middleware.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, inertia: &Inertia, cx: &mut RequestContext) -> Result<Response<Bytes>>;
}

impl Inertia {
    /// Runs `handler` for `request` under the protocol rules.
    pub async fn handle<H>(&self, request: Request<Bytes>, handler: &H) -> Result<Response<Bytes>>
    where
        H: Handler + ?Sized,
    {
        let mut cx = RequestContext::new(request);

        let version = HeaderValue::from_str(self.version()).map_err(http::Error::from)?;
        let pending = cx.response_headers_mut();
        pending.insert(VARY, VARY_VALUE);
        pending.insert(X_INERTIA_VERSION, version);

        self.resolve_flash(&mut cx).await;

        if !cx.is_inertia_request() {
            let response = handler.handle(self, &mut cx).await?;
            return Ok(finish(ResponseRecorder::record(response), &mut cx));
        }

        let result = handler.handle(self, &mut cx).await;

        if cx.method() == Method::GET && headers::client_version(cx.headers()) != self.version() {
            if let Err(e) = &result {
                tracing::debug!(error = %e, "Discarding handler error of outdated client");
            }
            tracing::debug!(
                url = %cx.url(),
                client_version = headers::client_version(cx.headers()),
                "Asset version mismatch, forcing reload"
            );
            counter!(FORCED_RELOADS).increment(1);

            let url = cx.url();
            let response = self.location(&mut cx, &url).await?;
            return Ok(finish(ResponseRecorder::record(response), &mut cx));
        }

        let mut recorder = ResponseRecorder::record(result?);

        if recorder.status() == StatusCode::OK && recorder.is_empty() {
            counter!(REDIRECT_BACKS).increment(1);
            recorder.redirect_to(self.back(&cx).await?);
        }

        if recorder.status() == StatusCode::FOUND && headers::is_see_other_method(cx.method()) {
            recorder.set_status(StatusCode::SEE_OTHER);
        }

        Ok(finish(recorder, &mut cx))
    }

    /// Moves validation errors, the clear-history flag and the flash bag from
    /// the flash provider into the request state. Provider failures only get logged.
    async fn resolve_flash(&self, cx: &mut RequestContext) {
        let Some(flash) = self.flash_provider() else {
            return;
        };

        match flash.get(cx.parts(), ERRORS_KEY).await {
            Ok(Some(Value::Object(errors))) if !errors.is_empty() => {
                cx.state_mut().set_validation_errors(errors);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Cannot get validation errors from flash provider"),
        }

        match flash.should_clear_history(cx.parts()).await {
            Ok(true) => {
                cx.state_mut().clear_history();
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "Cannot get clear history flag from flash provider"),
        }

        match flash.get_all(cx.parts()).await {
            Ok(values) => cx.state_mut().set_flash(values),
            Err(e) => tracing::warn!(error = %e, "Cannot get flash data from flash provider"),
        }
    }
}

fn finish(recorder: ResponseRecorder, cx: &mut RequestContext) -> Response<Bytes> {
    recorder.into_response(std::mem::take(cx.response_headers_mut()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{BoxError, InertiaError};
    use crate::flash::{FlashError, FlashProvider, MemoryFlashProvider};
    use crate::headers::{X_INERTIA, X_INERTIA_LOCATION};
    use crate::props::Props;
    use crate::testutils::{body_json, engine, get, inertia_get, FnHandler, TEMPLATE};
    use http::header::{CONTENT_TYPE, COOKIE, LOCATION, REFERER, SET_COOKIE};
    use http::request::Parts;
    use serde_json::{Map, json};
    use std::sync::Arc;

    fn request(builder: http::request::Builder) -> Request<Bytes> {
        builder.body(Bytes::new()).unwrap()
    }

    fn render(component: &'static str) -> FnHandler {
        FnHandler::new(move |inertia, cx| {
            Box::pin(async move { inertia.render(cx, component, Props::new()).await })
        })
    }

    fn respond(status: StatusCode, body: &'static str) -> FnHandler {
        FnHandler::new(move |_, _| {
            Box::pin(async move {
                let response = Response::builder()
                    .status(status)
                    .header(LOCATION, "/somewhere")
                    .body(Bytes::from_static(body.as_bytes()))
                    .unwrap();
                Ok::<_, InertiaError>(response)
            })
        })
    }

    #[tokio::test]
    async fn test_plain_request_passes_through() {
        let inertia = engine();
        let response = inertia
            .handle(request(get("/")), &respond(StatusCode::OK, ""))
            .await
            .unwrap();

        // No protocol rewriting for plain requests, even for an empty 200.
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[VARY], "X-Inertia");
        assert_eq!(response.headers()[X_INERTIA_VERSION], inertia.version());
    }

    #[tokio::test]
    async fn test_protocol_render() {
        let inertia = engine();
        let response = inertia
            .handle(request(inertia_get("/dashboard")), &render("Dashboard"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[X_INERTIA], "true");
        assert_eq!(response.headers()[VARY], "X-Inertia");
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_json(&response)["component"], "Dashboard");
    }

    #[tokio::test]
    async fn test_version_mismatch_forces_reload() {
        let inertia = engine();
        let request = request(
            get("/users?page=2")
                .header(X_INERTIA, "true")
                .header(X_INERTIA_VERSION, "outdated"),
        );

        let response = inertia.handle(request, &render("Users")).await.unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response.headers()[X_INERTIA_LOCATION], "/users?page=2");
        assert!(response.headers().get(VARY).is_none());
        assert!(response.headers().get(X_INERTIA).is_none());
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn test_version_mismatch_discards_handler_error() {
        let inertia = engine();
        let failing = FnHandler::new(|_, _| {
            Box::pin(async { Err::<Response<Bytes>, _>(InertiaError::handler("boom")) })
        });

        let response = inertia
            .handle(request(get("/").header(X_INERTIA, "true")), &failing)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_version_mismatch_ignored_for_post() {
        let inertia = engine();
        let request = request(
            get("/users")
                .method(Method::POST)
                .header(X_INERTIA, "true")
                .header(X_INERTIA_VERSION, "outdated"),
        );

        let response = inertia
            .handle(request, &respond(StatusCode::FOUND, ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    #[tokio::test]
    async fn test_empty_response_redirects_back() {
        let inertia = engine();
        let request = request(inertia_get("/users").header(REFERER, "/users/create"));

        let response = inertia
            .handle(request, &respond(StatusCode::OK, ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "/users/create");
    }

    #[tokio::test]
    async fn test_empty_response_redirect_keeps_handler_headers() {
        let inertia = engine();
        let with_cookie = FnHandler::new(|_, _| {
            Box::pin(async {
                let response = Response::builder()
                    .header(SET_COOKIE, "sid=1")
                    .body(Bytes::new())
                    .unwrap();
                Ok::<_, InertiaError>(response)
            })
        });
        let request = request(
            inertia_get("/form")
                .method(Method::POST)
                .header(REFERER, "/form"),
        );

        let response = inertia.handle(request, &with_cookie).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "/form");
        assert_eq!(response.headers()[SET_COOKIE], "sid=1");
        assert_eq!(response.headers()[VARY], "X-Inertia");
    }

    #[tokio::test]
    async fn test_handler_vary_keeps_protocol_marker() {
        let inertia = engine();
        let varying = FnHandler::new(|_, _| {
            Box::pin(async {
                let response = Response::builder()
                    .header(VARY, "Accept-Encoding")
                    .body(Bytes::from_static(b"x"))
                    .unwrap();
                Ok::<_, InertiaError>(response)
            })
        });

        for req in [request(get("/")), request(inertia_get("/"))] {
            let response = inertia.handle(req, &varying).await.unwrap();
            let vary: Vec<&str> = response
                .headers()
                .get_all(VARY)
                .iter()
                .map(|v| v.to_str().unwrap())
                .collect();
            assert_eq!(vary, ["X-Inertia", "Accept-Encoding"]);
        }
    }

    #[tokio::test]
    async fn test_non_empty_response_kept() {
        let inertia = engine();
        let response = inertia
            .handle(request(inertia_get("/")), &respond(StatusCode::OK, "ok"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"ok");
    }

    #[tokio::test]
    async fn test_see_other_coercion() {
        let inertia = engine();

        for method in [Method::PUT, Method::PATCH, Method::DELETE] {
            let request = request(inertia_get("/users/1").method(method.clone()));
            let response = inertia
                .handle(request, &respond(StatusCode::FOUND, ""))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{method}");
        }

        let response = inertia
            .handle(request(inertia_get("/users/1")), &respond(StatusCode::FOUND, ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);

        let request = request(inertia_get("/users/1").method(Method::POST));
        let response = inertia
            .handle(request, &respond(StatusCode::FOUND, ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    #[tokio::test]
    async fn test_empty_put_redirects_back_with_see_other() {
        let inertia = engine();
        let request = request(
            inertia_get("/users/1")
                .method(Method::PUT)
                .header(REFERER, "/users/1/edit"),
        );

        let response = inertia
            .handle(request, &respond(StatusCode::OK, ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/users/1/edit");
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let inertia = engine();
        let failing = FnHandler::new(|_, _| {
            Box::pin(async { Err::<Response<Bytes>, _>(InertiaError::handler("boom")) })
        });

        let err = inertia
            .handle(request(inertia_get("/")), &failing)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "handler error: boom");
    }

    #[tokio::test]
    async fn test_flash_round_trip() {
        let flash = Arc::new(MemoryFlashProvider::new());
        let inertia = Inertia::new(TEMPLATE)
            .unwrap()
            .with_version("1")
            .with_flash_provider(flash.clone())
            .build();

        let store = FnHandler::new(|inertia, cx| {
            Box::pin(async move {
                cx.state_mut().set_validation_error("email", "invalid").clear_history();
                inertia.back(cx).await
            })
        });
        let post = request(
            inertia_get("/signup")
                .method(Method::POST)
                .header(COOKIE, "inertia_session=u1")
                .header(REFERER, "/signup"),
        );
        let response = inertia.handle(post, &store).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);

        let follow = request(inertia_get("/signup").header(COOKIE, "inertia_session=u1"));
        let response = inertia.handle(follow, &render("Signup")).await.unwrap();
        let page = body_json(&response);
        assert_eq!(page["props"]["errors"], json!({"email": "invalid"}));
        assert_eq!(page["clearHistory"], json!(true));

        // One-shot: the next visit starts clean.
        let again = request(inertia_get("/signup").header(COOKIE, "inertia_session=u1"));
        let response = inertia.handle(again, &render("Signup")).await.unwrap();
        let page = body_json(&response);
        assert_eq!(page["props"]["errors"], json!({}));
        assert_eq!(page["clearHistory"], json!(false));
    }

    #[tokio::test]
    async fn test_flash_bag_exposed_as_prop() {
        let flash = Arc::new(MemoryFlashProvider::new());
        let inertia = Inertia::new(TEMPLATE)
            .unwrap()
            .with_version("1")
            .with_flash_provider(flash.clone())
            .build();

        let cookie = "inertia_session=u2";
        let parts = request(get("/").header(COOKIE, cookie)).into_parts().0;
        flash.flash(&parts, "message", json!("Saved")).await.unwrap();

        let response = inertia
            .handle(
                request(inertia_get("/").header(COOKIE, cookie)),
                &render("Home"),
            )
            .await
            .unwrap();
        assert_eq!(body_json(&response)["props"]["flash"], json!({"message": "Saved"}));
    }

    struct BrokenFlash;

    #[async_trait]
    impl FlashProvider for BrokenFlash {
        async fn flash(&self, _: &Parts, _: &str, _: Value) -> std::result::Result<(), FlashError> {
            Err(FlashError::new("store down"))
        }

        async fn get(&self, _: &Parts, _: &str) -> std::result::Result<Option<Value>, FlashError> {
            Err(FlashError::new("store down"))
        }

        async fn get_all(&self, _: &Parts) -> std::result::Result<Map<String, Value>, FlashError> {
            Err(FlashError(BoxError::from("store down")))
        }

        async fn flash_clear_history(&self, _: &Parts) -> std::result::Result<(), FlashError> {
            Err(FlashError::new("store down"))
        }

        async fn should_clear_history(&self, _: &Parts) -> std::result::Result<bool, FlashError> {
            Err(FlashError::new("store down"))
        }
    }

    #[tokio::test]
    async fn test_flash_provider_errors_are_absorbed() {
        let inertia = Inertia::new(TEMPLATE)
            .unwrap()
            .with_version("1")
            .with_flash_provider(Arc::new(BrokenFlash))
            .build();

        let response = inertia
            .handle(request(inertia_get("/")), &render("Home"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(&response)["props"]["errors"], json!({}));

        let redirecting = FnHandler::new(|inertia, cx| {
            Box::pin(async move {
                cx.state_mut().set_validation_error("a", "b");
                inertia.redirect(cx, "/next").await
            })
        });
        let response = inertia
            .handle(request(inertia_get("/").method(Method::POST)), &redirecting)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
    }
}
