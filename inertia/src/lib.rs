//! Server-side adapter for the Inertia protocol.
//!
//! An [`Inertia`] engine wraps request handlers (see [`Handler`]) and turns
//! their [`Inertia::render`] calls into either the root HTML document or a JSON
//! page payload, depending on the request. It takes care of shared and
//! request-scoped props, partial reloads, deferred and merge props, concurrent
//! prop resolution, flash data and the redirect rules of the protocol.

mod accounting;
mod collector;
pub mod config;
mod context;
pub mod errors;
mod filter;
pub mod flash;
pub mod headers;
mod inertia;
pub mod metrics_defs;
mod middleware;
mod page;
mod props;
mod recorder;
mod resolver;
mod response;
mod service;
pub mod ssr;
mod state;
mod store;
pub mod template;
pub mod version;

#[cfg(test)]
mod testutils;

pub use accounting::{deferred_props, merge_props};
pub use collector::{FLASH_KEY, collect_props};
pub use context::RequestContext;
pub use errors::{BoxError, InertiaError, PropError, Result};
pub use filter::{PartialReload, filter_props};
pub use inertia::{Inertia, InertiaBuilder};
pub use middleware::Handler;
pub use page::{Page, PageDefaults, assemble_page, build_page};
pub use props::{
    DEFAULT_DEFER_GROUP, Prop, PropFuture, PropKind, PropProvider, PropResult, PropValue, Props,
    ValidationErrors,
};
pub use recorder::ResponseRecorder;
pub use resolver::{PropContext, resolve_props, resolve_value};
pub use response::{HtmlEmitter, INERTIA_HEAD_KEY, INERTIA_KEY, container_markup, json_response};
pub use service::InertiaService;
pub use state::RequestState;
pub use store::SharedStore;
