//! Partial reload filtering.

use http::HeaderMap;

use crate::headers;
use crate::props::Props;

/// Keys requested by a partial reload of the current component.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartialReload {
    pub only: Vec<String>,
    pub except: Vec<String>,
}

impl PartialReload {
    /// Returns the partial reload described by the request headers, if they
    /// target exactly `component`.
    pub fn from_headers(headers: &HeaderMap, component: &str) -> Option<Self> {
        if headers::partial_component(headers) != component {
            return None;
        }

        Some(Self {
            only: headers::only_keys(headers),
            except: headers::except_keys(headers),
        })
    }
}

/// Drops the props that must not be part of the response.
///
/// On a partial reload `only` keeps just the listed keys and `except` then
/// removes keys, so a key named in both is dropped. `Always` props survive
/// both. On a full load, props that opt out of the first load are dropped.
pub fn filter_props(props: &mut Props, partial: Option<&PartialReload>) {
    match partial {
        Some(partial) => {
            if !partial.only.is_empty() {
                props.retain(|key, prop| prop.kind().is_always() || partial.only.contains(key));
            }

            props.retain(|key, prop| prop.kind().is_always() || !partial.except.contains(key));
        }
        None => props.retain(|_, prop| !prop.kind().ignores_first_load()),
    }
}
