//! Prompt template rendering.
//!
//! Templates use the Handlebars dialect (`{{name}}`, `{{#if}}`, `{{#each}}`)
//! with HTML escaping disabled. Unknown variables render as empty text.

use super::thread::{
    compute_thread_template_vars, format_message, format_message_array_as_text, is_message_array,
    is_role_content_message, template_uses_thread_variables,
};
use crate::util::canonical_json;
use autoevals_core::{EvalError, Result};
use handlebars::Handlebars;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static RENDERER: LazyLock<Handlebars<'static>> = LazyLock::new(|| {
    let mut registry = Handlebars::new();
    registry.register_escape_fn(handlebars::no_escape);
    registry.set_strict_mode(false);
    registry
});

/// Template form of one argument value.
///
/// Message lists and single messages become role-labeled text; other objects
/// and arrays become canonical JSON. Scalars pass through unchanged.
pub fn renderable(value: &Value) -> Value {
    match value {
        Value::Array(items) if !items.is_empty() && is_message_array(value) => {
            Value::String(format_message_array_as_text(items))
        }
        Value::Object(_) if is_role_content_message(value) => Value::String(format_message(value)),
        Value::Array(_) | Value::Object(_) => Value::String(canonical_json(value)),
        other => other.clone(),
    }
}

/// Variables visible to `template` for the given arguments.
///
/// Thread variables are derived from a `thread` argument only when the
/// template references one of them; explicit arguments of the same name win.
pub fn template_vars(template: &str, args: &Map<String, Value>) -> Map<String, Value> {
    let mut vars: Map<String, Value> =
        args.iter().map(|(key, value)| (key.clone(), renderable(value))).collect();

    if template_uses_thread_variables(template) {
        if let Some(Value::Array(thread)) = args.get("thread") {
            for (key, value) in compute_thread_template_vars(thread) {
                if key == "thread" || !vars.contains_key(&key) {
                    vars.insert(key, value);
                }
            }
        }
    }
    vars
}

/// Render `template` (trimmed) against `args`.
pub fn render_template(template: &str, args: &Map<String, Value>) -> Result<String> {
    let template = template.trim();
    let vars = template_vars(template, args);
    RENDERER
        .render_template(template, &Value::Object(vars))
        .map_err(|e| EvalError::Template(e.to_string()))
}
