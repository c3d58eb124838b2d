//! Conversation threads as template variables.
//!
//! A thread is a list of `{role, content}` messages. Templates see it as
//! role-labeled text with tool calls and results summarized, not as raw JSON.

use crate::util::canonical_json;
use regex::Regex;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::LazyLock;

pub const THREAD_VARIABLE_NAMES: [&str; 7] = [
    "thread",
    "thread_count",
    "first_message",
    "last_message",
    "user_messages",
    "assistant_messages",
    "human_ai_pairs",
];

const MAX_TOOL_TEXT: usize = 500;

static THREAD_VARIABLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\{\{[{#^/]?\s*(?:(?:if|each|with|unless)\s+)?(?:thread|thread_count|first_message|last_message|user_messages|assistant_messages|human_ai_pairs)\b",
    )
    .expect("Invalid regex pattern")
});

static ERROR_PAYLOAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^error:\s*'(.+)'$").expect("Invalid regex pattern"));

/// Whether `template` references any thread-derived variable.
pub fn template_uses_thread_variables(template: &str) -> bool {
    THREAD_VARIABLE_PATTERN.is_match(template)
}

pub fn is_role_content_message(value: &Value) -> bool {
    value.as_object().is_some_and(|m| m.contains_key("role") && m.contains_key("content"))
}

pub fn is_message_array(value: &Value) -> bool {
    value.as_array().is_some_and(|items| items.iter().all(is_role_content_message))
}

fn indent(text: &str) -> String {
    text.split('\n').map(|line| format!("  {line}")).collect::<Vec<_>>().join("\n")
}

/// Keep both ends of `text`, replacing the middle with a marker.
pub(crate) fn truncate_middle(text: &str, max_len: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_len {
        return text.to_string();
    }
    let removed = chars.len() - max_len + 30;
    let marker = format!(" [...{removed} chars truncated...] ");
    let marker_len = marker.chars().count();
    if marker_len >= max_len {
        return chars[..max_len].iter().collect();
    }
    let available = max_len - marker_len;
    let left = available / 2;
    let right = available - left;
    let head: String = chars[..left].iter().collect();
    let tail: String = chars[chars.len() - right..].iter().collect();
    format!("{head}{marker}{tail}")
}

fn typed_part<'a>(part: &'a Value, kind: &str) -> Option<&'a Map<String, Value>> {
    part.as_object().filter(|m| m.get("type").and_then(Value::as_str) == Some(kind))
}

fn str_field<'a>(part: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    part.get(key).and_then(Value::as_str)
}

struct PendingToolCall {
    name: String,
    args: String,
}

fn extract_tool_calls(content: &[Value], pending: &mut HashMap<String, PendingToolCall>) {
    for part in content.iter().filter_map(|p| typed_part(p, "tool_call")) {
        let Some(id) = str_field(part, "tool_call_id").filter(|id| !id.is_empty()) else {
            continue;
        };
        let name = str_field(part, "tool_name").unwrap_or("unknown").to_string();
        let args = match part.get("arguments").and_then(Value::as_object) {
            Some(arguments) => match arguments.get("value") {
                Some(Value::String(raw)) if arguments.get("type").and_then(Value::as_str) != Some("valid") => {
                    raw.clone()
                }
                Some(value) => value.to_string(),
                None => "null".to_string(),
            },
            None => String::new(),
        };
        pending.insert(id.to_string(), PendingToolCall { name, args });
    }
}

/// Best-effort plain text of a tool result payload.
fn unwrap_content(content: &Value) -> String {
    match content {
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(parsed) => unwrap_content(&parsed),
            Err(_) => match ERROR_PAYLOAD.captures(text).and_then(|c| c.get(1)) {
                Some(inner) => inner.as_str().to_string(),
                None => text.clone(),
            },
        },
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(m) => m.get("text").filter(|t| t.is_string()).map(unwrap_content),
                    Value::String(_) => Some(unwrap_content(item)),
                    _ => None,
                })
                .collect();
            if parts.is_empty() { content.to_string() } else { parts.join("\n") }
        }
        Value::Object(m) => match m.get("text") {
            Some(text @ Value::String(_)) => unwrap_content(text),
            _ => content.to_string(),
        },
        other => other.to_string(),
    }
}

fn format_tool_result(
    tool_call_id: &str,
    tool_name: &str,
    output: &Value,
    pending: &mut HashMap<String, PendingToolCall>,
) -> String {
    let call = pending.remove(tool_call_id);
    let name = if !tool_name.is_empty() {
        tool_name.to_string()
    } else {
        call.as_ref().map_or_else(|| "tool".to_string(), |c| c.name.clone())
    };
    let result = unwrap_content(output);

    let mut lines = vec![format!("Tool ({name}):")];
    if let Some(call) = call.filter(|c| !c.args.is_empty()) {
        lines.push("  Args:".to_string());
        lines.push(format!("    {}", truncate_middle(&call.args, MAX_TOOL_TEXT)));
    }
    let lowered = result.to_lowercase();
    let is_error = lowered.contains("error:") || lowered.contains("\"error\"") || lowered.starts_with("error");
    lines.push(if is_error { "  Error:" } else { "  Result:" }.to_string());
    lines.push(format!("    {}", truncate_middle(&result, MAX_TOOL_TEXT)));
    lines.join("\n")
}

fn extract_text_content(content: &Value) -> String {
    match content {
        Value::String(text) if text.trim().is_empty() => String::new(),
        Value::String(text) => text.clone(),
        Value::Array(items) => {
            let mut parts = Vec::new();
            for part in items {
                match part {
                    Value::String(text) if !text.trim().is_empty() => parts.push(text.clone()),
                    Value::Object(m) => {
                        let text = m.get("text").and_then(Value::as_str);
                        match (m.get("type").and_then(Value::as_str), text) {
                            (Some("reasoning"), Some(text)) => {
                                let preview: String = text.chars().take(100).collect();
                                parts.push(format!("[thinking: {preview}...]"));
                            }
                            (Some("text") | None, Some(text)) => parts.push(text.to_string()),
                            _ => {}
                        }
                    }
                    _ => {}
                }
            }
            parts.join("\n")
        }
        _ => String::new(),
    }
}

fn capitalize(role: &str) -> String {
    let mut chars = role.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Render a message list as `Role:\n  text` blocks separated by blank lines.
pub fn format_message_array_as_text(messages: &[Value]) -> String {
    let mut pending = HashMap::new();
    for message in messages {
        if message.get("role").and_then(Value::as_str) == Some("assistant") {
            if let Some(content) = message.get("content").and_then(Value::as_array) {
                extract_tool_calls(content, &mut pending);
            }
        }
    }

    let mut parts = Vec::new();
    for message in messages {
        let role = match message.get("role") {
            Some(Value::String(role)) => role.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let content = message.get("content").unwrap_or(&Value::Null);
        match content {
            Value::Array(items) if role == "tool" => {
                for part in items.iter().filter_map(|p| typed_part(p, "tool_result")) {
                    let id = str_field(part, "tool_call_id").unwrap_or_default();
                    let name = str_field(part, "tool_name").unwrap_or_default();
                    let output = part.get("output").unwrap_or(&Value::Null);
                    parts.push(format_tool_result(id, name, output, &mut pending));
                }
            }
            _ => {
                let text = extract_text_content(content);
                if !text.is_empty() {
                    parts.push(format!("{}:\n{}", capitalize(&role), indent(&text)));
                }
            }
        }
    }
    parts.join("\n\n")
}

/// `role: content` form of a single message.
pub fn format_message(message: &Value) -> String {
    let role = message.get("role").and_then(Value::as_str).unwrap_or_default();
    match message.get("content") {
        Some(Value::String(content)) => format!("{role}: {content}"),
        Some(other) => format!("{role}: {other}"),
        None => format!("{role}: null"),
    }
}

fn message_text(message: &Value) -> Value {
    if is_role_content_message(message) {
        Value::String(format_message(message))
    } else {
        match message {
            Value::String(_) => message.clone(),
            other => Value::String(canonical_json(other)),
        }
    }
}

fn with_role<'a>(thread: &'a [Value], role: &'a str) -> impl Iterator<Item = &'a Value> {
    thread
        .iter()
        .filter(move |m| is_role_content_message(m) && m.get("role").and_then(Value::as_str) == Some(role))
}

/// Template variables derived from a thread.
pub fn compute_thread_template_vars(thread: &[Value]) -> Map<String, Value> {
    let is_messages = thread.iter().all(is_role_content_message);
    let rendered_thread = if is_messages {
        format_message_array_as_text(thread)
    } else {
        canonical_json(&Value::Array(thread.to_vec()))
    };

    let users: Vec<Value> = with_role(thread, "user").cloned().collect();
    let assistants: Vec<Value> = with_role(thread, "assistant").cloned().collect();
    let pairs: Vec<Value> = users
        .iter()
        .zip(&assistants)
        .map(|(human, assistant)| {
            json!({"human": format_message(human), "assistant": format_message(assistant)})
        })
        .collect();

    let mut vars = Map::new();
    vars.insert("thread".into(), Value::String(rendered_thread));
    vars.insert("thread_count".into(), json!(thread.len()));
    vars.insert("first_message".into(), thread.first().map_or(Value::Null, message_text));
    vars.insert("last_message".into(), thread.last().map_or(Value::Null, message_text));
    vars.insert("user_messages".into(), Value::String(format_message_array_as_text(&users)));
    vars.insert(
        "assistant_messages".into(),
        Value::String(format_message_array_as_text(&assistants)),
    );
    vars.insert("human_ai_pairs".into(), Value::Array(pairs));
    vars
}
