//! Concurrent prop resolution.
//!
//! Every surviving prop is evaluated in its own task. The first failure cancels
//! the shared [`CancellationToken`]; remaining tasks are still joined before
//! returning, and whatever they produce is discarded.

use indexmap::IndexMap;
use serde_json::Value;
use shared::{counter, histogram};
use std::collections::HashMap;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::{InertiaError, PropError, Result};
use crate::metrics_defs::{PROP_ERRORS, PROP_RESOLVE_DURATION};
use crate::props::{PropValue, Props};

/// Context handed to contextual callables and providers.
///
/// Cancellation is cooperative: long-running props may poll
/// [`PropContext::is_cancelled`] or await [`PropContext::cancelled`] to stop early
/// once another prop has failed.
#[derive(Clone, Debug, Default)]
pub struct PropContext {
    cancellation: CancellationToken,
}

impl PropContext {
    pub fn new(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Completes once resolution of the page has been abandoned.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }
}

enum UnitOutcome {
    Resolved(Value),
    Failed(PropError),
    Cancelled,
}

/// Result of one resolution task, tagged with the position of its prop.
struct UnitResult {
    index: usize,
    outcome: UnitOutcome,
}

/// Resolves all props concurrently.
///
/// On success the returned map has exactly the keys of `props`, in the same
/// order. On failure the error names the first prop that failed and no values
/// are returned.
pub async fn resolve_props(props: Props) -> Result<IndexMap<String, Value>> {
    let start = Instant::now();
    let cancellation = CancellationToken::new();

    let mut join_set = JoinSet::new();
    let mut task_index = HashMap::new();
    let mut keys = Vec::with_capacity(props.len());

    for (index, (key, prop)) in props.into_iter().enumerate() {
        let cx = PropContext::new(cancellation.clone());

        let abort_handle = join_set.spawn(async move {
            let outcome = match resolve_value(prop.into_value(), &cx).await {
                Ok(_) if cx.is_cancelled() => UnitOutcome::Cancelled,
                Ok(value) => UnitOutcome::Resolved(value),
                Err(e) => UnitOutcome::Failed(e),
            };
            UnitResult { index, outcome }
        });

        task_index.insert(abort_handle.id(), index);
        keys.push(key);
    }

    let mut values: Vec<Option<Value>> = vec![None; keys.len()];
    let mut first_error: Option<InertiaError> = None;

    while let Some(join_result) = join_set.join_next_with_id().await {
        let UnitResult { index, outcome } = match join_result {
            Ok((_, result)) => result,
            Err(e) => {
                tracing::error!(error = %e, "Prop resolution task failed");
                let Some(index) = task_index.get(&e.id()).copied() else {
                    continue;
                };
                UnitResult {
                    index,
                    outcome: UnitOutcome::Failed(PropError::Panicked),
                }
            }
        };

        if first_error.is_some() {
            continue;
        }

        match outcome {
            UnitOutcome::Resolved(value) => values[index] = Some(value),
            UnitOutcome::Failed(source) => {
                cancellation.cancel();
                first_error = Some(InertiaError::ResolveProp {
                    key: keys[index].clone(),
                    source,
                });
            }
            UnitOutcome::Cancelled => {}
        }
    }

    histogram!(PROP_RESOLVE_DURATION).record(start.elapsed().as_secs_f64());

    if let Some(err) = first_error {
        counter!(PROP_ERRORS).increment(1);
        return Err(err);
    }

    Ok(keys
        .into_iter()
        .zip(values)
        .map(|(key, value)| (key, value.unwrap_or(Value::Null)))
        .collect())
}

/// Evaluates a single prop value.
///
/// A provider is invoked first; if the value it yields (or the original value)
/// is callable, the callable is invoked to obtain the final value.
pub async fn resolve_value(value: PropValue, cx: &PropContext) -> Result<Value, PropError> {
    let value = match value {
        PropValue::Provider(provider) => provider.provide(cx).await.map_err(PropError::Provider)?,
        other => other,
    };

    match value {
        PropValue::Value(value) => Ok(value),
        PropValue::Provider(_) => Err(PropError::NestedProvider),
        PropValue::Lazy(f) => Ok(f()),
        PropValue::TryLazy(f) => f().map_err(PropError::Closure),
        PropValue::Contextual(f) => Ok(f(cx.clone()).await),
        PropValue::TryContextual(f) => f(cx.clone()).await.map_err(PropError::Closure),
    }
}
