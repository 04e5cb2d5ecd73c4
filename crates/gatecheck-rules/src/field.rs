//! Generic field access over JSON entities.
//!
//! Paths are dot-separated. Numeric segments index into arrays and `*`
//! expands every element of an array:
//!
//! - `guestContact.address.line1`
//! - `items.0.sku`
//! - `items.*.lineTotal`

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Resolve a path that may not contain wildcards.
///
/// Returns `None` when any segment is missing. A present `null` is returned
/// as `Some(Value::Null)`.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments(path) {
        current = step(current, segment)?;
    }
    Some(current)
}

/// Resolve a path, expanding `*` segments over arrays.
///
/// Missing branches are skipped, so the result may be shorter than the
/// number of array elements.
pub fn resolve_all<'a>(root: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut frontier = vec![root];
    for segment in segments(path) {
        let mut next = Vec::with_capacity(frontier.len());
        for value in frontier {
            if segment == "*" {
                if let Value::Array(items) = value {
                    next.extend(items.iter());
                }
            } else if let Some(child) = step(value, segment) {
                next.push(child);
            }
        }
        frontier = next;
    }
    frontier
}

/// Whether a path contains a wildcard segment
pub fn has_wildcard(path: &str) -> bool {
    segments(path).any(|s| s == "*")
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').map(str::trim).filter(|s| !s.is_empty())
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Absent, null, blank string, empty array, or empty object
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

/// Absent or null
pub fn is_absent(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

/// Numeric view of a value; numeric strings (serialized decimals) count
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Date/time view of a string value: RFC 3339 timestamps (normalized to
/// UTC), naive `YYYY-MM-DDTHH:MM:SS` timestamps, or `YYYY-MM-DD` dates
/// (midnight)
pub fn as_datetime(value: &Value) -> Option<NaiveDateTime> {
    let raw = value.as_str()?.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).naive_utc());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// String view used for enum membership and equality: strings as-is,
/// numbers and booleans in their JSON form
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Short description of a value's kind for failure messages
pub fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cart() -> Value {
        json!({
            "guestContact": { "name": "Ada", "address": null },
            "lines": [
                { "sku": "A", "quantity": 2, "lineTotal": "10.50" },
                { "sku": "B", "quantity": 1, "lineTotal": 4.5 },
                { "sku": "C" }
            ]
        })
    }

    #[test]
    fn test_lookup_nested_and_indexed() {
        let cart = cart();
        assert_eq!(lookup(&cart, "guestContact.name"), Some(&json!("Ada")));
        assert_eq!(lookup(&cart, "guestContact.address"), Some(&Value::Null));
        assert_eq!(lookup(&cart, "lines.1.sku"), Some(&json!("B")));
        assert_eq!(lookup(&cart, "lines.9.sku"), None);
        assert_eq!(lookup(&cart, "guestContact.name.first"), None);
    }

    #[test]
    fn test_resolve_all_expands_wildcards() {
        let cart = cart();
        let totals = resolve_all(&cart, "lines.*.lineTotal");
        assert_eq!(totals.len(), 2);
        assert_eq!(resolve_all(&cart, "lines.*.sku").len(), 3);
        assert!(has_wildcard("lines.*.sku"));
        assert!(!has_wildcard("lines.0.sku"));
    }

    #[test]
    fn test_blank_values() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&Value::Null)));
        assert!(is_blank(Some(&json!("   "))));
        assert!(is_blank(Some(&json!([]))));
        assert!(is_blank(Some(&json!({}))));
        assert!(!is_blank(Some(&json!(0))));
        assert!(!is_blank(Some(&json!(false))));
        assert!(!is_blank(Some(&json!("x"))));
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(as_number(&json!(12)), Some(12.0));
        assert_eq!(as_number(&json!(" 99.99 ")), Some(99.99));
        assert_eq!(as_number(&json!("NaN")), None);
        assert_eq!(as_number(&json!("abc")), None);
        assert_eq!(as_number(&json!(true)), None);
    }

    #[test]
    fn test_datetime_view() {
        let date = as_datetime(&json!("2024-03-01")).unwrap();
        let ts = as_datetime(&json!("2024-03-01T10:00:00+02:00")).unwrap();
        let naive = as_datetime(&json!("2024-03-01T08:00:00")).unwrap();
        assert!(date < ts);
        assert_eq!(ts, naive);
        assert!(as_datetime(&json!("01/03/2024")).is_none());
        assert!(as_datetime(&json!(20240301)).is_none());
    }
}
