//! `{{path}}` placeholder substitution and dot-path lookup.
//!
//! Placeholders are plain lookups into the node's input scope; nothing is
//! ever evaluated.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{([^}]+)\}\}").expect("placeholder regex"))
}

/// Resolve a dot-path such as `prev.data.status` against `scope`.
///
/// Numeric segments index into arrays. Returns `None` when any segment is
/// missing.
pub fn resolve_path<'a>(scope: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = scope;
    for part in path.trim().split('.') {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Render a value as template text: strings as-is, null as empty, anything
/// else as compact JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Substitute every `{{path}}` in `template`. Unresolved paths become empty.
pub fn render(template: &str, scope: &Value) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures<'_>| {
            resolve_path(scope, &caps[1]).map(display).unwrap_or_default()
        })
        .into_owned()
}

/// Render every string inside `value`, recursing into arrays and objects.
pub fn render_value(value: &Value, scope: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(render(s, scope)),
        Value::Array(items) => Value::Array(items.iter().map(|v| render_value(v, scope)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_value(v, scope)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scope() -> Value {
        json!({
            "prev": {"status": 200, "data": {"user": {"name": "Ada"}, "tags": ["a", "b"]}},
            "parents": {}
        })
    }

    #[test]
    fn test_resolve_nested_path() {
        let s = scope();
        assert_eq!(resolve_path(&s, "prev.status"), Some(&json!(200)));
        assert_eq!(resolve_path(&s, " prev.data.user.name "), Some(&json!("Ada")));
        assert_eq!(resolve_path(&s, "prev.data.tags.1"), Some(&json!("b")));
        assert_eq!(resolve_path(&s, "prev.missing.deeper"), None);
        assert_eq!(resolve_path(&s, "prev.status.code"), None);
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let s = scope();
        assert_eq!(
            render("https://api.test/users/{{prev.data.user.name}}?s={{ prev.status }}", &s),
            "https://api.test/users/Ada?s=200"
        );
    }

    #[test]
    fn test_render_missing_and_objects() {
        let s = scope();
        assert_eq!(render("[{{nope}}]", &s), "[]");
        assert_eq!(render("{{prev.data.tags}}", &s), r#"["a","b"]"#);
        assert_eq!(render("no placeholders", &s), "no placeholders");
    }

    #[test]
    fn test_render_value_recurses() {
        let s = scope();
        let tpl = json!({"who": "{{prev.data.user.name}}", "list": ["{{prev.status}}", 3], "n": true});
        assert_eq!(
            render_value(&tpl, &s),
            json!({"who": "Ada", "list": ["200", 3], "n": true})
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(display(&Value::Null), "");
        assert_eq!(display(&json!("x")), "x");
        assert_eq!(display(&json!(1.5)), "1.5");
        assert_eq!(display(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
