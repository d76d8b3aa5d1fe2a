//! Request-scoped state.
//!
//! Owned by exactly one request: the middleware creates it, handlers mutate it
//! through the [`RequestContext`](crate::context::RequestContext), and it is
//! dropped with the request.

use serde_json::{Map, Value};

use crate::props::{Prop, Props, ValidationErrors};
use crate::template::{TemplateData, TemplateValue};

#[derive(Clone, Debug, Default)]
pub struct RequestState {
    validation_errors: ValidationErrors,
    props: Props,
    template_data: TemplateData,
    flash: Map<String, Value>,
    clear_history: bool,
    encrypt_history: Option<bool>,
}

impl RequestState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validation_errors(&self) -> &ValidationErrors {
        &self.validation_errors
    }

    /// Replaces all validation errors.
    pub fn set_validation_errors(&mut self, errors: ValidationErrors) -> &mut Self {
        self.validation_errors = errors;
        self
    }

    /// Adds validation errors, overwriting existing messages for the same keys.
    pub fn add_validation_errors(&mut self, errors: ValidationErrors) -> &mut Self {
        self.validation_errors.extend(errors);
        self
    }

    pub fn set_validation_error(&mut self, key: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.validation_errors
            .insert(key.into(), Value::String(message.into()));
        self
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn set_props(&mut self, props: Props) -> &mut Self {
        self.props = props;
        self
    }

    pub fn set_prop(&mut self, key: impl Into<String>, prop: impl Into<Prop>) -> &mut Self {
        self.props.insert(key.into(), prop.into());
        self
    }

    pub fn template_data(&self) -> &TemplateData {
        &self.template_data
    }

    pub fn set_template_data(&mut self, data: TemplateData) -> &mut Self {
        self.template_data = data;
        self
    }

    pub fn set_template_datum(&mut self, key: impl Into<String>, value: impl Into<TemplateValue>) -> &mut Self {
        self.template_data.insert(key.into(), value.into());
        self
    }

    /// One-shot data read from the flash provider at the start of the request.
    pub fn flash(&self) -> &Map<String, Value> {
        &self.flash
    }

    pub(crate) fn set_flash(&mut self, flash: Map<String, Value>) {
        self.flash = flash;
    }

    /// Asks the client to clear its history state.
    pub fn clear_history(&mut self) -> &mut Self {
        self.clear_history = true;
        self
    }

    pub fn should_clear_history(&self) -> bool {
        self.clear_history
    }

    /// Overrides the engine's history encryption setting for this request.
    pub fn set_encrypt_history(&mut self, encrypt: bool) -> &mut Self {
        self.encrypt_history = Some(encrypt);
        self
    }

    pub fn encrypt_history(&self) -> Option<bool> {
        self.encrypt_history
    }
}
