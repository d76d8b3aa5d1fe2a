use serde_json::Value;

use crate::flash::ERRORS_KEY;
use crate::props::{Prop, Props};
use crate::state::RequestState;

/// Prop key holding the flash bag read at the start of the request.
pub const FLASH_KEY: &str = "flash";

/// Merges every prop scope of a render into one ordered map.
///
/// Precedence, lowest first: validation errors, flash bag, shared props,
/// request-scoped props, call-site props. Later scopes replace earlier ones
/// key by key; nothing is merged deeply.
pub fn collect_props(state: &RequestState, shared: Props, call_site: Props) -> Props {
    let mut props = Props::with_capacity(2 + shared.len() + state.props().len() + call_site.len());

    props.insert(
        ERRORS_KEY.to_string(),
        Prop::always(Value::Object(state.validation_errors().clone())),
    );

    if !state.flash().is_empty() {
        props.insert(
            FLASH_KEY.to_string(),
            Prop::new(Value::Object(state.flash().clone())),
        );
    }

    props.extend(shared);
    props.extend(state.props().clone());
    props.extend(call_site);

    props
}
