//! Process-wide shared props, template data and template funcs.
//!
//! Each map sits behind its own read-write lock. Readers only ever get a copy,
//! so a render never aliases a map another request may be writing to.

use parking_lot::RwLock;

use crate::props::{Prop, Props};
use crate::template::{TemplateData, TemplateFunc, TemplateFuncs, TemplateValue};

#[derive(Default)]
pub struct SharedStore {
    props: RwLock<Props>,
    template_data: RwLock<TemplateData>,
    template_funcs: RwLock<TemplateFuncs>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn share_prop(&self, key: impl Into<String>, prop: impl Into<Prop>) {
        self.props.write().insert(key.into(), prop.into());
    }

    /// Copy of a single shared prop.
    pub fn prop(&self, key: &str) -> Option<Prop> {
        self.props.read().get(key).cloned()
    }

    /// Copy of all shared props.
    pub fn props(&self) -> Props {
        self.props.read().clone()
    }

    pub fn share_template_data(&self, key: impl Into<String>, value: impl Into<TemplateValue>) {
        self.template_data.write().insert(key.into(), value.into());
    }

    pub fn template_data(&self) -> TemplateData {
        self.template_data.read().clone()
    }

    pub fn share_template_func(&self, key: impl Into<String>, func: TemplateFunc) {
        self.template_funcs.write().insert(key.into(), func);
    }

    pub fn template_funcs(&self) -> TemplateFuncs {
        self.template_funcs.read().clone()
    }
}
