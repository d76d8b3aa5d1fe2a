//! Prop values and the kinds that decide when a prop is sent.
//!
//! A [`Prop`] pairs a [`PropKind`] (when the prop is included and how the client
//! treats it) with a [`PropValue`] (how the value is obtained). Values are only
//! evaluated by the resolver, after partial reload filtering, so an excluded
//! lazy prop never runs.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::BoxError;
use crate::resolver::PropContext;

/// Props keyed by name, in insertion order.
pub type Props = IndexMap<String, Prop>;

/// Validation messages exposed under the `errors` prop. Values may nest.
pub type ValidationErrors = serde_json::Map<String, Value>;

/// Group used for deferred props declared without one.
pub const DEFAULT_DEFER_GROUP: &str = "default";

pub type PropFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;
pub type PropResult = Result<Value, BoxError>;

/// Custom type producing a prop value at resolution time.
///
/// The returned value may itself be a callable, which is then invoked. A
/// provider returning another provider is an error.
#[async_trait]
pub trait PropProvider: Send + Sync {
    async fn provide(&self, cx: &PropContext) -> Result<PropValue, BoxError>;
}

/// How the value of a prop is obtained.
#[derive(Clone)]
pub enum PropValue {
    /// Literal value.
    Value(Value),
    /// Custom provider, invoked first.
    Provider(Arc<dyn PropProvider>),
    /// Zero-argument callable.
    Lazy(Arc<dyn Fn() -> Value + Send + Sync>),
    /// Zero-argument callable that may fail.
    TryLazy(Arc<dyn Fn() -> PropResult + Send + Sync>),
    /// Callable receiving the resolution context.
    Contextual(Arc<dyn Fn(PropContext) -> PropFuture<Value> + Send + Sync>),
    /// Callable receiving the resolution context that may fail.
    TryContextual(Arc<dyn Fn(PropContext) -> PropFuture<PropResult> + Send + Sync>),
}

impl PropValue {
    pub fn lazy<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        PropValue::Lazy(Arc::new(f))
    }

    pub fn try_lazy<F, E>(f: F) -> Self
    where
        F: Fn() -> Result<Value, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        PropValue::TryLazy(Arc::new(move || -> PropResult { f().map_err(Into::into) }))
    }

    pub fn contextual<F, Fut>(f: F) -> Self
    where
        F: Fn(PropContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Value> + Send + 'static,
    {
        PropValue::Contextual(Arc::new(move |cx| -> PropFuture<Value> { Box::pin(f(cx)) }))
    }

    pub fn try_contextual<F, Fut, E>(f: F) -> Self
    where
        F: Fn(PropContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        PropValue::TryContextual(Arc::new(move |cx| -> PropFuture<PropResult> {
            let fut = f(cx);
            Box::pin(async move { fut.await.map_err(Into::into) })
        }))
    }

    pub fn provider(provider: impl PropProvider + 'static) -> Self {
        PropValue::Provider(Arc::new(provider))
    }
}

impl From<Value> for PropValue {
    fn from(value: Value) -> Self {
        PropValue::Value(value)
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            PropValue::Provider(_) => f.write_str("Provider"),
            PropValue::Lazy(_) => f.write_str("Lazy"),
            PropValue::TryLazy(_) => f.write_str("TryLazy"),
            PropValue::Contextual(_) => f.write_str("Contextual"),
            PropValue::TryContextual(_) => f.write_str("TryContextual"),
        }
    }
}

/// When a prop is included in a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropKind {
    /// Included on full loads, subject to partial reload filters.
    Plain,
    /// Never filtered.
    Always,
    /// Excluded from the first full load, included on partial reloads.
    Optional,
    /// Excluded from the first response and announced in `deferredProps`.
    Deferred { group: String, merge: bool },
    /// Announced in `mergeProps` unless reset by the client.
    Merge { merge: bool },
}

impl PropKind {
    /// Whether the prop is left out of a first (non-partial) load.
    pub fn ignores_first_load(&self) -> bool {
        matches!(self, PropKind::Optional | PropKind::Deferred { .. })
    }

    pub fn is_always(&self) -> bool {
        matches!(self, PropKind::Always)
    }

    pub fn should_merge(&self) -> bool {
        match self {
            PropKind::Deferred { merge, .. } | PropKind::Merge { merge } => *merge,
            _ => false,
        }
    }

    /// Deferred group, if the prop is deferred.
    pub fn defer_group(&self) -> Option<&str> {
        match self {
            PropKind::Deferred { group, .. } => Some(group),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Prop {
    kind: PropKind,
    value: PropValue,
}

impl Prop {
    pub fn new(value: impl Into<PropValue>) -> Self {
        Self::with_kind(PropKind::Plain, value)
    }

    pub fn always(value: impl Into<PropValue>) -> Self {
        Self::with_kind(PropKind::Always, value)
    }

    pub fn optional(value: impl Into<PropValue>) -> Self {
        Self::with_kind(PropKind::Optional, value)
    }

    /// Deferred prop in the default group.
    pub fn defer(value: impl Into<PropValue>) -> Self {
        Self::defer_in(value, DEFAULT_DEFER_GROUP)
    }

    /// Deferred prop fetched together with the other props of `group`.
    pub fn defer_in(value: impl Into<PropValue>, group: impl Into<String>) -> Self {
        Self::with_kind(
            PropKind::Deferred {
                group: group.into(),
                merge: false,
            },
            value,
        )
    }

    pub fn merge(value: impl Into<PropValue>) -> Self {
        Self::with_kind(PropKind::Merge { merge: true }, value)
    }

    /// Marks a deferred or merge prop as mergeable. Other kinds are left as is.
    pub fn merged(mut self) -> Self {
        match &mut self.kind {
            PropKind::Deferred { merge, .. } | PropKind::Merge { merge } => *merge = true,
            _ => {}
        }
        self
    }

    pub fn with_kind(kind: PropKind, value: impl Into<PropValue>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn kind(&self) -> &PropKind {
        &self.kind
    }

    pub fn value(&self) -> &PropValue {
        &self.value
    }

    pub fn into_value(self) -> PropValue {
        self.value
    }
}

impl From<Value> for Prop {
    fn from(value: Value) -> Self {
        Prop::new(value)
    }
}

impl From<PropValue> for Prop {
    fn from(value: PropValue) -> Self {
        Prop::new(value)
    }
}
