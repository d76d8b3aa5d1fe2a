//! Response emitter: protocol JSON or the root HTML document.

use http::header::CONTENT_TYPE;
use http::{Response, StatusCode};
use hyper::body::Bytes;
use shared::counter;

use crate::errors::Result;
use crate::headers::{HTML_CONTENT_TYPE, JSON_CONTENT_TYPE, TRUE_VALUE, X_INERTIA};
use crate::metrics_defs::SSR_FALLBACKS;
use crate::page::Page;
use crate::ssr::SsrClient;
use crate::template::{TemplateData, TemplateFuncs, TemplateRenderer, TemplateValue, escape_html};

/// Template data key of the page container (or the SSR body).
pub const INERTIA_KEY: &str = "inertia";
/// Template data key of the SSR head markup.
pub const INERTIA_HEAD_KEY: &str = "inertiaHead";

/// Page payload as a protocol response.
pub fn json_response(page: &Page) -> Result<Response<Bytes>> {
    let body = serde_json::to_vec(page)?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(X_INERTIA, TRUE_VALUE)
        .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(Bytes::from(body))?)
}

/// Element the client runtime mounts into, carrying the page as an attribute.
pub fn container_markup(container_id: &str, page_json: &[u8]) -> String {
    format!(
        r#"<div id="{}" data-page="{}"></div>"#,
        container_id,
        escape_html(&String::from_utf8_lossy(page_json))
    )
}

/// Renders root documents for one engine.
pub struct HtmlEmitter<'a> {
    pub renderer: &'a dyn TemplateRenderer,
    pub ssr: Option<&'a SsrClient>,
    pub container_id: &'a str,
}

impl HtmlEmitter<'_> {
    /// Renders the page into the root template.
    ///
    /// Template data is layered as the page markup, then `shared`, then
    /// `request`. SSR failures fall back to the client-side container.
    pub async fn render(
        &self,
        page: &Page,
        shared: TemplateData,
        request: &TemplateData,
        funcs: &TemplateFuncs,
    ) -> Result<Response<Bytes>> {
        let page_json = serde_json::to_vec(page)?;
        let (inertia, inertia_head) = self.page_markup(page_json).await;

        let mut data = TemplateData::with_capacity(2 + shared.len() + request.len());
        data.insert(INERTIA_KEY.to_string(), TemplateValue::Markup(inertia));
        data.insert(INERTIA_HEAD_KEY.to_string(), TemplateValue::Markup(inertia_head));
        data.extend(shared);
        data.extend(request.iter().map(|(k, v)| (k.clone(), v.clone())));

        let html = self.renderer.render(&data, funcs)?;

        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, HTML_CONTENT_TYPE)
            .body(Bytes::from(html))?)
    }

    async fn page_markup(&self, page_json: Vec<u8>) -> (String, String) {
        if let Some(ssr) = self.ssr {
            match ssr.render(page_json.clone()).await {
                Ok(rendered) => {
                    let head = rendered.head_markup();
                    return (rendered.body, head);
                }
                Err(e) => {
                    tracing::error!(error = %e, url = %ssr.url(), "SSR rendering failed, falling back to client-side rendering");
                    counter!(SSR_FALLBACKS).increment(1);
                }
            }
        }

        (container_markup(self.container_id, &page_json), String::new())
    }
}
