//! Helpers for DSN resolution, host identity, timestamps, ids, and message rendering.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::iter::Peekable;
use std::str::CharIndices;
use uuid::Uuid;

/// Environment variable read by [`dsn_from_env`].
pub const DSN_ENV: &str = "SENTRY_DSN";

/// Read the DSN from `SENTRY_DSN`, ignoring blank values.
pub fn dsn_from_env() -> Option<String> {
    non_blank(std::env::var(DSN_ENV).ok())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Best-effort host name: `HOSTNAME`, then the kernel's hostname file, then `localhost`.
pub fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/proc/sys/kernel/hostname").ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// New event id: random UUID v4, hyphens removed (32 lowercase hex digits).
pub fn generate_event_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Event timestamp, UTC with second precision.
pub fn format_time(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Parse an event timestamp produced by [`format_time`] (a trailing `Z` is tolerated).
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim().trim_end_matches('Z').trim_end_matches('z');
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| e.to_string())
}

/// Auth-header timestamp: Unix seconds with microsecond fraction.
pub fn auth_timestamp(dt: DateTime<Utc>) -> String {
    format!("{}.{:06}", dt.timestamp(), dt.timestamp_subsec_micros())
}

/// Render a printf-style template with positional params.
///
/// Supports `%s`, `%d`/`%i`/`%u`, `%f` (with optional `.N` precision), `%x`, `%%`, and
/// explicit argument indexes (`%2$s`). A minimum width pads on the left (`%5d`), or on the
/// right with the `-` flag (`%-5s`). The `0` flag zero-pads numbers (`%03d`).
/// Directives without a matching param are kept verbatim.
pub fn format_message(template: &str, params: &[Value]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    let mut next_arg = 0usize;

    while let Some((start, c)) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if let Some(&(_, '%')) = chars.peek() {
            chars.next();
            out.push('%');
            continue;
        }

        let mut explicit_index = None;
        let mut left = false;
        let mut zero = false;
        let mut end = start + 1;
        let mut digits = take_digits(&mut chars, &mut end);
        if !digits.is_empty() {
            if let Some(&(i, '$')) = chars.peek() {
                explicit_index = digits.parse::<usize>().ok().filter(|n| *n > 0);
                end = i + 1;
                chars.next();
                digits.clear();
            }
        }
        if digits.is_empty() {
            while let Some(&(i, flag)) = chars.peek() {
                match flag {
                    '-' => left = true,
                    '0' => zero = true,
                    _ => break,
                }
                end = i + 1;
                chars.next();
            }
            digits = take_digits(&mut chars, &mut end);
        }
        if digits.starts_with('0') {
            zero = true;
        }
        let width = digits.parse::<usize>().unwrap_or(0);
        let mut precision = None;
        if let Some(&(i, '.')) = chars.peek() {
            end = i + 1;
            chars.next();
            precision = take_digits(&mut chars, &mut end)
                .parse::<usize>()
                .ok()
                .or(Some(0));
        }

        let conv = match chars.peek() {
            Some(&(i, conv)) if "sdiufx".contains(conv) => {
                end = i + conv.len_utf8();
                chars.next();
                conv
            }
            _ => {
                out.push_str(&template[start..end]);
                continue;
            }
        };

        let index = match explicit_index {
            Some(n) => n - 1,
            None => {
                next_arg += 1;
                next_arg - 1
            }
        };
        match params.get(index) {
            Some(value) => {
                let rendered = render_param(value, conv, precision);
                out.push_str(&pad(rendered, width, left, zero && conv != 's'));
            }
            None => out.push_str(&template[start..end]),
        }
    }
    out
}

fn take_digits(chars: &mut Peekable<CharIndices<'_>>, end: &mut usize) -> String {
    let mut digits = String::new();
    while let Some(&(i, d)) = chars.peek() {
        if !d.is_ascii_digit() {
            break;
        }
        digits.push(d);
        *end = i + 1;
        chars.next();
    }
    digits
}

/// Pad to `width` characters. Zero padding goes after a leading sign.
fn pad(rendered: String, width: usize, left: bool, zero: bool) -> String {
    let len = rendered.chars().count();
    if len >= width {
        return rendered;
    }
    let fill = width - len;
    if left {
        format!("{}{}", rendered, " ".repeat(fill))
    } else if zero {
        let (sign, digits) = match rendered.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", rendered.as_str()),
        };
        format!("{}{}{}", sign, "0".repeat(fill), digits)
    } else {
        format!("{}{}", " ".repeat(fill), rendered)
    }
}

fn render_param(value: &Value, conv: char, precision: Option<usize>) -> String {
    match conv {
        'd' | 'i' | 'u' => as_integer(value).to_string(),
        'x' => format!("{:x}", as_integer(value)),
        'f' => format!("{:.*}", precision.unwrap_or(6), as_float(value)),
        _ => match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        },
    }
}

fn as_integer(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}

fn as_float(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_format_message() {
        assert_eq!(format_message("Hello %s", &[json!("world")]), "Hello world");
        assert_eq!(
            format_message("%d of %d", &[json!(3), json!("7")]),
            "3 of 7"
        );
        assert_eq!(format_message("100%% done", &[]), "100% done");
        assert_eq!(format_message("%.2f ms", &[json!(1.23456)]), "1.23 ms");
        assert_eq!(
            format_message("%2$s %1$s", &[json!("world"), json!("hello")]),
            "hello world"
        );
        assert_eq!(format_message("%x", &[json!(255)]), "ff");
    }

    #[test]
    fn test_format_message_width() {
        assert_eq!(format_message("[%5d]", &[json!(3)]), "[    3]");
        assert_eq!(format_message("[%-3s]", &[json!("ab")]), "[ab ]");
        assert_eq!(format_message("%03d", &[json!(7)]), "007");
        assert_eq!(format_message("%04d", &[json!(-7)]), "-007");
        assert_eq!(format_message("[%8.2f]", &[json!(3.14159)]), "[    3.14]");
        assert_eq!(format_message("[%1$4s]", &[json!("x")]), "[   x]");
        assert_eq!(format_message("%2s", &[json!("long")]), "long");
        assert_eq!(format_message("a %5s", &[]), "a %5s");
    }

    #[test]
    fn test_format_message_missing_params_kept() {
        assert_eq!(format_message("a %s b %s", &[json!(1)]), "a 1 b %s");
        assert_eq!(format_message("50% off", &[]), "50% off");
        assert_eq!(format_message("trailing %", &[]), "trailing %");
    }

    #[test]
    fn test_event_id_shape_and_uniqueness() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let id = generate_event_id();
            assert_eq!(id.len(), 32);
            assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
            // version nibble of a v4 UUID
            assert_eq!(&id[12..13], "4");
            assert!(seen.insert(id));
        }
    }

    #[test]
    fn test_time_formats() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(format_time(dt), "2024-03-09T07:05:01");
        assert_eq!(parse_time("2024-03-09T07:05:01Z").unwrap(), dt);
        assert_eq!(auth_timestamp(dt), format!("{}.000000", dt.timestamp()));
    }

    #[test]
    fn test_dsn_value_ignores_blank() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(
            non_blank(Some(" https://p:s@h/1\n".to_string())).as_deref(),
            Some("https://p:s@h/1")
        );
    }

    #[test]
    fn test_hostname_not_empty() {
        assert!(!hostname().is_empty());
    }
}
