//! Output formatting: plain text (human-readable) and JSON.

use serde_json::Value;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Indented key-value
    #[default]
    Plain,
    /// JSON (pretty-printed)
    Json,
}

/// Render `value` in the requested format.
pub fn render(value: &Value, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Plain => Ok(format_plain(value)),
        OutputFormat::Json => serde_json::to_string_pretty(value),
    }
}

/// Format value as plain text. Stack frames print as `function (file:line)`.
pub fn format_plain(value: &Value) -> String {
    let mut out = String::new();
    format_plain_impl(value, &mut out, 0);
    out
}

fn format_plain_impl(v: &Value, out: &mut String, indent: usize) {
    let pad = "  ".repeat(indent);
    match v {
        Value::Array(arr) => {
            if arr.is_empty() {
                let _ = writeln!(out, "{}<empty>", pad);
                return;
            }
            for item in arr {
                if let Some(frame) = frame_line(item) {
                    let _ = writeln!(out, "{}{}", pad, frame);
                } else if item.is_object() || item.is_array() {
                    let _ = writeln!(out, "{}-", pad);
                    format_plain_impl(item, out, indent + 1);
                } else {
                    let _ = writeln!(out, "{}{}", pad, scalar(item));
                }
            }
        }
        Value::Object(map) => {
            for (k, val) in map {
                if val.as_object().is_some_and(|m| m.is_empty()) {
                    let _ = writeln!(out, "{}{}: {{}}", pad, k);
                } else if val.is_object() || val.is_array() {
                    let _ = writeln!(out, "{}{}:", pad, k);
                    format_plain_impl(val, out, indent + 1);
                } else {
                    let _ = writeln!(out, "{}{}: {}", pad, k, scalar(val));
                }
            }
        }
        other => {
            let _ = writeln!(out, "{}{}", pad, scalar(other));
        }
    }
}

fn frame_line(v: &Value) -> Option<String> {
    let function = v.get("function")?.as_str()?;
    let filename = v.get("filename")?.as_str()?;
    let lineno = v.get("lineno")?.as_u64()?;
    Some(format!("{} ({}:{})", function, filename, lineno))
}

fn scalar(v: &Value) -> String {
    match v {
        Value::String(s) => s.replace('\n', " "),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_plain_scalars() {
        assert!(format_plain(&Value::Null).contains("null"));
        assert!(format_plain(&json!(true)).contains("true"));
        assert!(format_plain(&json!("hello")).contains("hello"));
    }

    #[test]
    fn format_plain_nested_object() {
        let out = format_plain(&json!({"event_id": "abc", "tags": {"env": "prod"}, "env": {}}));
        assert!(out.contains("event_id: abc"));
        assert!(out.contains("tags:\n  env: prod"));
        assert!(out.contains("env: {}"));
    }

    #[test]
    fn format_plain_frames() {
        let out = format_plain(&json!({"frames": [
            {"function": "app::main", "filename": "src/main.rs", "lineno": 3}
        ]}));
        assert!(out.contains("app::main (src/main.rs:3)"));
    }

    #[test]
    fn format_plain_empty_array() {
        assert!(format_plain(&json!([])).contains("<empty>"));
    }

    #[test]
    fn render_json_roundtrip() {
        let v = json!({"x": 1, "y": [2, 3]});
        let s = render(&v, OutputFormat::Json).unwrap();
        let parsed: Value = serde_json::from_str(&s).unwrap();
        assert_eq!(parsed, v);
    }
}
