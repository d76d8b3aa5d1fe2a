//! Demo application: a handful of pages exercising the protocol features.

use async_trait::async_trait;
use http::{Method, Response, StatusCode};
use hyper::body::Bytes;
use inertia::flash::{FlashProvider, MemoryFlashProvider};
use inertia::template::TemplateValue;
use inertia::{Handler, Inertia, InertiaError, Prop, PropValue, Props, RequestContext};
use serde_json::{Value, json};
use shared::http::make_error_response;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

const PAGE_SIZE: usize = 3;

/// Shares the props, template data and template funcs every page relies on.
pub fn configure(inertia: &Inertia) -> Result<(), InertiaError> {
    inertia.share_prop("app", Prop::always(json!({"name": "Inertia demo"})));
    inertia.share_template_data("title", "Inertia demo");

    let version = inertia.version().to_string();
    inertia.share_template_func(
        "asset",
        Arc::new(move |args: &[TemplateValue]| {
            let path = args.first().map(TemplateValue::render).unwrap_or_default();
            Ok::<_, inertia::BoxError>(TemplateValue::markup(format!(
                r#"<script type="module" src="/build/{path}?v={version}"></script>"#
            )))
        }),
    )
}

pub struct DemoApp {
    flash: Arc<MemoryFlashProvider>,
    users: RwLock<Vec<String>>,
}

impl DemoApp {
    pub fn new(flash: Arc<MemoryFlashProvider>) -> Self {
        DemoApp {
            flash,
            users: RwLock::new(
                ["Ada", "Grace", "Linus", "Barbara", "Ken"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            ),
        }
    }

    async fn home(&self, inertia: &Inertia, cx: &mut RequestContext) -> Result<Response<Bytes>, InertiaError> {
        let mut props = Props::new();
        props.insert("greeting".into(), json!("Hello from the server").into());
        props.insert(
            "time".into(),
            PropValue::lazy(|| {
                let secs = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default();
                json!(secs)
            })
            .into(),
        );
        props.insert(
            "stats".into(),
            Prop::defer_in(
                PropValue::contextual(|cx| async move {
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(50)) => json!({"visits": 42}),
                        _ = cx.cancelled() => Value::Null,
                    }
                }),
                "sidebar",
            ),
        );

        cx.state_mut().set_template_datum("title", "Home");
        inertia.render(cx, "Home", props).await
    }

    async fn users(&self, inertia: &Inertia, cx: &mut RequestContext) -> Result<Response<Bytes>, InertiaError> {
        let page = query_param(cx, "page")
            .and_then(|p| p.parse::<usize>().ok())
            .unwrap_or(1)
            .max(1);

        let (slice, total) = {
            let users = self.users.read().await;
            let slice: Vec<String> = users
                .iter()
                .skip((page - 1) * PAGE_SIZE)
                .take(PAGE_SIZE)
                .cloned()
                .collect();
            (slice, users.len())
        };

        let mut props = Props::new();
        props.insert("users".into(), Prop::merge(json!(slice)));
        props.insert("page".into(), json!(page).into());
        props.insert(
            "total".into(),
            Prop::optional(PropValue::lazy(move || json!(total))),
        );

        cx.state_mut().set_template_datum("title", "Users");
        inertia.render(cx, "Users/Index", props).await
    }

    async fn create_user(&self, inertia: &Inertia, cx: &mut RequestContext) -> Result<Response<Bytes>, InertiaError> {
        let name = form_field(cx.body(), "name").unwrap_or_default();
        let name = name.trim();

        if name.is_empty() {
            cx.state_mut()
                .set_validation_error("name", "The name field is required.");
            return inertia.back(cx).await;
        }

        self.users.write().await.push(name.to_string());
        if let Err(e) = self
            .flash
            .flash(cx.parts(), "message", json!(format!("Created {name}.")))
            .await
        {
            tracing::warn!(error = %e, "Cannot flash message");
        }

        inertia.redirect(cx, "/users").await
    }
}

#[async_trait]
impl Handler for DemoApp {
    async fn handle(&self, inertia: &Inertia, cx: &mut RequestContext) -> Result<Response<Bytes>, InertiaError> {
        let method = cx.method().clone();
        let path = cx.uri().path().to_string();

        match (method, path.as_str()) {
            (Method::GET, "/") => self.home(inertia, cx).await,
            (Method::GET, "/users") => self.users(inertia, cx).await,
            (Method::POST, "/users") => self.create_user(inertia, cx).await,
            (Method::PUT | Method::PATCH | Method::DELETE, p) if p.starts_with("/users/") => {
                inertia.redirect(cx, "/users").await
            }
            (Method::GET, "/docs") => inertia.location(cx, "https://inertiajs.com").await,
            (Method::POST, "/logout") => {
                cx.state_mut().clear_history();
                inertia.redirect(cx, "/").await
            }
            // Nothing to render: the middleware sends the client back.
            (Method::POST, "/ping") => Ok(Response::new(Bytes::new())),
            _ => Ok(make_error_response(StatusCode::NOT_FOUND)),
        }
    }
}

fn query_param(cx: &RequestContext, key: &str) -> Option<String> {
    form_field(cx.uri().query()?.as_bytes(), key)
}

fn form_field(input: &[u8], key: &str) -> Option<String> {
    url::form_urlencoded::parse(input)
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
