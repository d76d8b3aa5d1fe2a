//! Deferred and merge prop bookkeeping.
//!
//! Both computations look at the props before filtering. Deferred props are
//! only announced on full loads, while merge props are announced on every
//! response.

use indexmap::IndexMap;

use crate::props::Props;

/// Deferred prop keys grouped by their group name, in prop order.
pub fn deferred_props(props: &Props, partial: bool) -> IndexMap<String, Vec<String>> {
    let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
    if partial {
        return groups;
    }

    for (key, prop) in props {
        if let Some(group) = prop.kind().defer_group() {
            groups.entry(group.to_string()).or_default().push(key.clone());
        }
    }

    groups
}

/// Keys of mergeable props the client did not ask to reset.
pub fn merge_props(props: &Props, reset: &[String]) -> Vec<String> {
    props
        .iter()
        .filter(|(key, prop)| prop.kind().should_merge() && !reset.contains(*key))
        .map(|(key, _)| key.clone())
        .collect()
}
