//! The page payload and its assembly.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::accounting::{deferred_props, merge_props};
use crate::collector::collect_props;
use crate::context::RequestContext;
use crate::errors::Result;
use crate::filter::{PartialReload, filter_props};
use crate::headers;
use crate::props::Props;
use crate::resolver::resolve_props;

/// Wire payload consumed by the client runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub component: String,
    pub props: IndexMap<String, Value>,
    pub url: String,
    pub version: String,
    pub encrypt_history: bool,
    pub clear_history: bool,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub deferred_props: IndexMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merge_props: Vec<String>,
}

/// Engine-level values a page is assembled with.
#[derive(Clone, Copy, Debug)]
pub struct PageDefaults<'a> {
    pub version: &'a str,
    pub encrypt_history: bool,
}

/// Assembles the page from already resolved props. No I/O.
pub fn assemble_page(
    cx: &RequestContext,
    component: &str,
    props: IndexMap<String, Value>,
    deferred_props: IndexMap<String, Vec<String>>,
    merge_props: Vec<String>,
    defaults: PageDefaults<'_>,
) -> Page {
    Page {
        component: component.to_string(),
        props,
        url: cx.url(),
        version: defaults.version.to_string(),
        encrypt_history: cx
            .state()
            .encrypt_history()
            .unwrap_or(defaults.encrypt_history),
        clear_history: cx.state().should_clear_history(),
        deferred_props,
        merge_props,
    }
}

/// Collects, filters and resolves the props of a render and assembles the page.
pub async fn build_page(
    cx: &RequestContext,
    component: &str,
    shared: Props,
    call_site: Props,
    defaults: PageDefaults<'_>,
) -> Result<Page> {
    let mut props = collect_props(cx.state(), shared, call_site);

    let partial = PartialReload::from_headers(cx.headers(), component);
    let deferred = deferred_props(&props, partial.is_some());
    let merge = merge_props(&props, &headers::reset_keys(cx.headers()));

    filter_props(&mut props, partial.as_ref());
    let resolved = resolve_props(props).await?;

    Ok(assemble_page(cx, component, resolved, deferred, merge, defaults))
}
