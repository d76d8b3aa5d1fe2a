//! Root template rendering.
//!
//! The engine only needs a [`TemplateRenderer`]: something that turns template
//! data into the HTML document. [`RootTemplate`] is the built-in renderer,
//! backed by minijinja with HTML auto-escaping:
//!
//! ```text
//! {{ inertia }}               value of a data key
//! {{ asset("app.js", title) }} call of a shared template func
//! ```
//!
//! Markup values are inserted verbatim, data values are HTML-escaped.

use indexmap::IndexMap;
use minijinja::value::{Rest, Value as JinjaValue};
use minijinja::{AutoEscape, Environment, ErrorKind};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::errors::BoxError;

const ROOT_TEMPLATE_NAME: &str = "root";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("parse root template: {0}")]
    Syntax(#[source] minijinja::Error),

    #[error("render: {0}")]
    Render(#[source] minijinja::Error),
}

/// A value available to the root template.
#[derive(Clone, Debug, PartialEq)]
pub enum TemplateValue {
    /// Trusted markup, written as is.
    Markup(String),
    /// Data, HTML-escaped when written.
    Data(Value),
}

impl TemplateValue {
    pub fn markup(markup: impl Into<String>) -> Self {
        TemplateValue::Markup(markup.into())
    }

    /// Text as it appears in the rendered document.
    pub fn render(&self) -> String {
        match self {
            TemplateValue::Markup(markup) => markup.clone(),
            TemplateValue::Data(Value::Null) => String::new(),
            TemplateValue::Data(Value::String(s)) => escape_html(s),
            TemplateValue::Data(other) => escape_html(&other.to_string()),
        }
    }

    fn to_jinja(&self) -> JinjaValue {
        match self {
            TemplateValue::Markup(markup) => JinjaValue::from_safe_string(markup.clone()),
            // Missing and null data both render as nothing.
            TemplateValue::Data(Value::Null) => JinjaValue::UNDEFINED,
            TemplateValue::Data(value) => JinjaValue::from_serialize(value),
        }
    }

    fn from_jinja(value: &JinjaValue) -> Self {
        if value.is_safe() {
            return TemplateValue::Markup(value.to_string());
        }
        TemplateValue::Data(serde_json::to_value(value).unwrap_or(Value::Null))
    }
}

impl From<Value> for TemplateValue {
    fn from(value: Value) -> Self {
        TemplateValue::Data(value)
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        TemplateValue::Data(Value::String(value.to_string()))
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        TemplateValue::Data(Value::String(value))
    }
}

pub type TemplateData = IndexMap<String, TemplateValue>;

pub type TemplateFunc =
    Arc<dyn Fn(&[TemplateValue]) -> Result<TemplateValue, BoxError> + Send + Sync>;

pub type TemplateFuncs = IndexMap<String, TemplateFunc>;

/// Renders the root HTML document.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, data: &TemplateData, funcs: &TemplateFuncs) -> Result<String, TemplateError>;

    /// Whether shared template funcs can be called from this template.
    fn supports_funcs(&self) -> bool {
        false
    }
}

/// Built-in minijinja template, compiled once at setup.
pub struct RootTemplate {
    env: Environment<'static>,
}

impl RootTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.add_template_owned(ROOT_TEMPLATE_NAME, source.to_string())
            .map_err(TemplateError::Syntax)?;
        Ok(Self { env })
    }
}

impl TemplateRenderer for RootTemplate {
    fn render(&self, data: &TemplateData, funcs: &TemplateFuncs) -> Result<String, TemplateError> {
        let mut context: IndexMap<String, JinjaValue> = data
            .iter()
            .map(|(key, value)| (key.clone(), value.to_jinja()))
            .collect();
        for (name, func) in funcs {
            context.insert(name.clone(), func_value(name.clone(), func.clone()));
        }

        self.env
            .get_template(ROOT_TEMPLATE_NAME)
            .and_then(|template| template.render(context))
            .map_err(TemplateError::Render)
    }

    fn supports_funcs(&self) -> bool {
        true
    }
}

fn func_value(name: String, func: TemplateFunc) -> JinjaValue {
    JinjaValue::from_function(
        move |args: Rest<JinjaValue>| -> Result<JinjaValue, minijinja::Error> {
            let args: Vec<TemplateValue> = args.iter().map(TemplateValue::from_jinja).collect();
            func(&args).map(|value| value.to_jinja()).map_err(|e| {
                minijinja::Error::new(
                    ErrorKind::InvalidOperation,
                    format!("template func {name:?} failed: {e}"),
                )
            })
        },
    )
}

/// Escapes text for use in HTML content and quoted attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\0' => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(pairs: &[(&str, TemplateValue)]) -> TemplateData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"{"a":"<b>&'x'"}"#),
            "{&#34;a&#34;:&#34;&lt;b&gt;&amp;&#39;x&#39;&#34;}"
        );
        assert_eq!(escape_html("a\0b"), "a\u{FFFD}b");
    }

    #[test]
    fn test_render_markup_and_data() {
        let tmpl = RootTemplate::parse(
            "<html><head>{{ inertiaHead }}<title>{{ title }}</title></head><body>{{inertia}}</body></html>",
        )
        .unwrap();

        let out = tmpl
            .render(
                &data(&[
                    ("inertia", TemplateValue::markup("<div id=\"app\"></div>")),
                    ("inertiaHead", TemplateValue::markup("<meta x>")),
                    ("title", TemplateValue::from("Tom & Jerry")),
                ]),
                &TemplateFuncs::new(),
            )
            .unwrap();

        assert_eq!(
            out,
            "<html><head><meta x><title>Tom &amp; Jerry</title></head><body><div id=\"app\"></div></body></html>"
        );
    }

    #[test]
    fn test_missing_and_null_render_empty() {
        let tmpl = RootTemplate::parse("a{{ missing }}{{ nothing }}b").unwrap();
        let out = tmpl
            .render(
                &data(&[("nothing", TemplateValue::Data(Value::Null))]),
                &TemplateFuncs::new(),
            )
            .unwrap();
        assert_eq!(out, "ab");
    }

    #[test]
    fn test_func_call() {
        let tmpl = RootTemplate::parse(r#"{{ asset("app.js", version) }}"#).unwrap();

        let mut funcs = TemplateFuncs::new();
        funcs.insert(
            "asset".into(),
            Arc::new(|args: &[TemplateValue]| {
                let rendered: Vec<String> = args.iter().map(TemplateValue::render).collect();
                Ok::<_, BoxError>(TemplateValue::markup(format!(
                    "<script src=\"/{}?v={}\"></script>",
                    rendered[0], rendered[1]
                )))
            }),
        );

        let out = tmpl
            .render(&data(&[("version", TemplateValue::Data(json!(3)))]), &funcs)
            .unwrap();
        assert_eq!(out, "<script src=\"/app.js?v=3\"></script>");
    }

    #[test]
    fn test_failing_func() {
        let tmpl = RootTemplate::parse(r#"{{ broken("x") }}"#).unwrap();

        let mut funcs = TemplateFuncs::new();
        funcs.insert(
            "broken".into(),
            Arc::new(|_: &[TemplateValue]| Err::<TemplateValue, BoxError>("no manifest".into())),
        );

        let err = tmpl.render(&TemplateData::new(), &funcs).unwrap_err();
        assert!(matches!(err, TemplateError::Render(_)));
        assert!(err.to_string().contains("no manifest"));
    }

    #[test]
    fn test_unknown_func() {
        let tmpl = RootTemplate::parse(r#"{{ nope("x") }}"#).unwrap();
        let err = tmpl
            .render(&TemplateData::new(), &TemplateFuncs::new())
            .unwrap_err();
        assert!(matches!(err, TemplateError::Render(_)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            RootTemplate::parse("<div>{{ inertia </div>"),
            Err(TemplateError::Syntax(_))
        ));
        assert!(matches!(
            RootTemplate::parse("{% if x %}"),
            Err(TemplateError::Syntax(_))
        ));
    }
}
