//! The engine: configuration, shared state and the render/redirect API used by handlers.

use http::{Response, StatusCode};
use hyper::body::Bytes;
use serde_json::Value;
use shared::{counter, histogram};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tokio::time::Instant;
use url::Url;

use crate::config::Config;
use crate::context::RequestContext;
use crate::errors::{InertiaError, Result};
use crate::flash::{ERRORS_KEY, FlashProvider};
use crate::headers::{self, X_INERTIA, X_INERTIA_LOCATION};
use crate::metrics_defs::{RENDER_DURATION, RENDERS};
use crate::page::{PageDefaults, build_page};
use crate::props::{Prop, Props};
use crate::recorder::redirect_response;
use crate::response::{HtmlEmitter, json_response};
use crate::ssr::SsrClient;
use crate::store::SharedStore;
use crate::template::{RootTemplate, TemplateFunc, TemplateRenderer, TemplateValue};
use crate::version::{hash_file, hash_version};

/// A configured engine. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Inertia {
    inner: Arc<InertiaInner>,
}

struct InertiaInner {
    renderer: Box<dyn TemplateRenderer>,
    store: SharedStore,
    flash: Option<Arc<dyn FlashProvider>>,
    ssr: Option<SsrClient>,
    container_id: String,
    version: String,
    encrypt_history: bool,
}

impl Inertia {
    /// Starts building an engine around a root template source.
    pub fn new(template: &str) -> Result<InertiaBuilder> {
        if template.trim().is_empty() {
            return Err(InertiaError::BlankTemplate);
        }
        Ok(Self::from_renderer(RootTemplate::parse(template)?))
    }

    pub fn from_bytes(template: &[u8]) -> Result<InertiaBuilder> {
        Self::new(std::str::from_utf8(template)?)
    }

    pub fn from_reader(mut reader: impl Read) -> Result<InertiaBuilder> {
        let mut template = Vec::new();
        reader.read_to_end(&mut template)?;
        Self::from_bytes(&template)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<InertiaBuilder> {
        let path = path.as_ref();
        let template = std::fs::read(path).map_err(|source| InertiaError::ReadTemplate {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(&template)
    }

    /// Starts building an engine around a custom template renderer.
    pub fn from_renderer(renderer: impl TemplateRenderer + 'static) -> InertiaBuilder {
        InertiaBuilder {
            renderer: Box::new(renderer),
            flash: None,
            ssr: None,
            container_id: crate::config::DEFAULT_CONTAINER_ID.to_string(),
            version: String::new(),
            encrypt_history: false,
        }
    }

    /// Wire version sent to clients.
    pub fn version(&self) -> &str {
        &self.inner.version
    }

    pub fn container_id(&self) -> &str {
        &self.inner.container_id
    }

    pub fn ssr_enabled(&self) -> bool {
        self.inner.ssr.is_some()
    }

    pub(crate) fn flash_provider(&self) -> Option<&dyn FlashProvider> {
        self.inner.flash.as_deref()
    }

    pub fn share_prop(&self, key: impl Into<String>, prop: impl Into<Prop>) {
        self.inner.store.share_prop(key, prop);
    }

    pub fn shared_prop(&self, key: &str) -> Option<Prop> {
        self.inner.store.prop(key)
    }

    /// Copy of the shared props.
    pub fn shared_props(&self) -> Props {
        self.inner.store.props()
    }

    pub fn share_template_data(&self, key: impl Into<String>, value: impl Into<TemplateValue>) {
        self.inner.store.share_template_data(key, value);
    }

    /// Makes a func callable from the root template.
    ///
    /// Fails when the engine renders through a renderer that cannot call funcs.
    pub fn share_template_func(&self, key: impl Into<String>, func: TemplateFunc) -> Result<()> {
        if !self.inner.renderer.supports_funcs() {
            return Err(InertiaError::TemplateFuncsUnsupported);
        }
        self.inner.store.share_template_func(key, func);
        Ok(())
    }

    /// Renders `component` with the given call-site props.
    ///
    /// Protocol requests get the page as JSON, everything else gets the root
    /// HTML document.
    pub async fn render(&self, cx: &RequestContext, component: &str, props: Props) -> Result<Response<Bytes>> {
        let start = Instant::now();
        let inner = &self.inner;

        let page = build_page(
            cx,
            component,
            inner.store.props(),
            props,
            PageDefaults {
                version: &inner.version,
                encrypt_history: inner.encrypt_history,
            },
        )
        .await?;

        let (response_type, response) = if cx.is_inertia_request() {
            ("json", json_response(&page)?)
        } else {
            let emitter = HtmlEmitter {
                renderer: inner.renderer.as_ref(),
                ssr: inner.ssr.as_ref(),
                container_id: &inner.container_id,
            };
            let response = emitter
                .render(
                    &page,
                    inner.store.template_data(),
                    cx.state().template_data(),
                    &inner.store.template_funcs(),
                )
                .await?;
            ("html", response)
        };

        counter!(RENDERS, "type" => response_type).increment(1);
        histogram!(RENDER_DURATION, "type" => response_type).record(start.elapsed().as_secs_f64());

        Ok(response)
    }

    /// Redirects with 302 after flashing pending errors and the clear-history flag.
    pub async fn redirect(&self, cx: &RequestContext, url: &str) -> Result<Response<Bytes>> {
        self.redirect_with_status(cx, url, StatusCode::FOUND).await
    }

    pub async fn redirect_with_status(
        &self,
        cx: &RequestContext,
        url: &str,
        status: StatusCode,
    ) -> Result<Response<Bytes>> {
        self.flash_context(cx).await;
        Ok(redirect_response(url, status)?)
    }

    /// Sends the client to `url` with a full browser navigation.
    ///
    /// Protocol requests get a 409 carrying the target in `X-Inertia-Location`,
    /// and lose the pending `Vary` and `X-Inertia` headers. Other requests are
    /// redirected with 302.
    pub async fn location(&self, cx: &mut RequestContext, url: &str) -> Result<Response<Bytes>> {
        self.location_with_status(cx, url, StatusCode::FOUND).await
    }

    pub async fn location_with_status(
        &self,
        cx: &mut RequestContext,
        url: &str,
        status: StatusCode,
    ) -> Result<Response<Bytes>> {
        self.flash_context(cx).await;

        if !cx.is_inertia_request() {
            return Ok(redirect_response(url, status)?);
        }

        let pending = cx.response_headers_mut();
        pending.remove(X_INERTIA);
        pending.remove(http::header::VARY);

        Ok(Response::builder()
            .status(StatusCode::CONFLICT)
            .header(X_INERTIA_LOCATION, url)
            .body(Bytes::new())?)
    }

    /// Redirects to the referring page.
    pub async fn back(&self, cx: &RequestContext) -> Result<Response<Bytes>> {
        self.back_with_status(cx, StatusCode::FOUND).await
    }

    pub async fn back_with_status(&self, cx: &RequestContext, status: StatusCode) -> Result<Response<Bytes>> {
        let url = headers::referer(cx.headers()).to_string();
        self.redirect_with_status(cx, &url, status).await
    }

    /// Hands pending validation errors and the clear-history flag to the flash
    /// provider so they survive the redirect.
    async fn flash_context(&self, cx: &RequestContext) {
        let Some(flash) = self.flash_provider() else {
            return;
        };
        let state = cx.state();

        if !state.validation_errors().is_empty() {
            let errors = Value::Object(state.validation_errors().clone());
            if let Err(e) = flash.flash(cx.parts(), ERRORS_KEY, errors).await {
                tracing::warn!(error = %e, "Cannot flash validation errors");
            }
        }

        if state.should_clear_history()
            && let Err(e) = flash.flash_clear_history(cx.parts()).await
        {
            tracing::warn!(error = %e, "Cannot flash clear history");
        }
    }
}

/// Configures an [`Inertia`] engine.
pub struct InertiaBuilder {
    renderer: Box<dyn TemplateRenderer>,
    flash: Option<Arc<dyn FlashProvider>>,
    ssr: Option<SsrClient>,
    container_id: String,
    version: String,
    encrypt_history: bool,
}

impl InertiaBuilder {
    /// Sets the version from a version string; the string itself is hashed.
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = hash_version(version);
        self
    }

    /// Sets the version from the content hash of a file, usually an asset manifest.
    pub fn with_version_from_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        self.version = hash_file(path).map_err(|source| InertiaError::VersionFile {
            path: path.display().to_string(),
            source,
        })?;
        Ok(self)
    }

    pub fn with_container_id(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = container_id.into();
        self
    }

    /// Enables server-side rendering against the renderer at `url`.
    pub fn with_ssr(mut self, url: Url) -> Self {
        self.ssr = Some(SsrClient::new(url));
        self
    }

    pub fn with_ssr_client(mut self, client: SsrClient) -> Self {
        self.ssr = Some(client);
        self
    }

    pub fn with_flash_provider(mut self, flash: Arc<dyn FlashProvider>) -> Self {
        self.flash = Some(flash);
        self
    }

    pub fn with_encrypt_history(mut self, encrypt: bool) -> Self {
        self.encrypt_history = encrypt;
        self
    }

    /// Applies a validated [`Config`].
    pub fn with_config(mut self, config: &Config) -> Result<Self> {
        config.validate()?;

        if let Some(version) = &config.version {
            self = self.with_version(version);
        }
        if let Some(path) = &config.version_file {
            self = self.with_version_from_file(path)?;
        }
        if let Some(ssr) = &config.ssr {
            let client = SsrClient::from_config(ssr).map_err(InertiaError::SsrClient)?;
            self = self.with_ssr_client(client);
        }

        Ok(self
            .with_container_id(config.container_id.clone())
            .with_encrypt_history(config.encrypt_history))
    }

    pub fn build(self) -> Inertia {
        Inertia {
            inner: Arc::new(InertiaInner {
                renderer: self.renderer,
                store: SharedStore::new(),
                flash: self.flash,
                ssr: self.ssr,
                container_id: self.container_id,
                version: self.version,
                encrypt_history: self.encrypt_history,
            }),
        }
    }
}
