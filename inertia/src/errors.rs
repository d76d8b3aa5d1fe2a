use thiserror::Error;

use crate::config::ValidationError;
use crate::template::TemplateError;

/// Result type alias for inertia operations
pub type Result<T, E = InertiaError> = std::result::Result<T, E>;

/// Boxed error used at the user-supplied capability boundaries (props, providers, handlers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while configuring the engine or rendering a response
#[derive(Error, Debug)]
pub enum InertiaError {
    #[error("blank root template")]
    BlankTemplate,

    #[error("root template is not valid UTF-8: {0}")]
    TemplateEncoding(#[from] std::str::Utf8Error),

    #[error("read root template {path:?}: {source}")]
    ReadTemplate {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("calculate version hash of {path:?}: {source}")]
    VersionFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template funcs can only be shared with a root template source")]
    TemplateFuncsUnsupported,

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("build ssr client: {0}")]
    SsrClient(#[source] reqwest::Error),

    #[error("resolve prop {key:?}: {source}")]
    ResolveProp {
        key: String,
        #[source]
        source: PropError,
    },

    #[error("json marshal: {0}")]
    Json(#[from] serde_json::Error),

    #[error("root template: {0}")]
    Template(#[from] TemplateError),

    #[error("build response: {0}")]
    Http(#[from] http::Error),

    #[error("read request body: {0}")]
    RequestBody(#[source] hyper::Error),

    #[error("handler error: {0}")]
    Handler(#[source] BoxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InertiaError {
    /// Wraps an arbitrary handler failure.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        InertiaError::Handler(err.into())
    }
}

/// Errors produced while resolving a single prop value
#[derive(Error, Debug)]
pub enum PropError {
    #[error("{0}")]
    Provider(#[source] BoxError),

    #[error("closure prop resolving: {0}")]
    Closure(#[source] BoxError),

    #[error("provider returned another provider")]
    NestedProvider,

    #[error("resolution task panicked")]
    Panicked,
}
