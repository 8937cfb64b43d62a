//! Flatten JSON records into a CSV document for download endpoints.
//!
//! Nested objects become `parent_child` columns, arrays are joined with `"; "`,
//! booleans render as `Yes`/`No` and date-like keys (`*date*`, `*_at*`) render
//! as `MM-DD-YYYY`. Header labels are title-cased words.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

pub const CONTENT_TYPE: &str = "text/csv; charset=utf-8";

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("csv write error: {0}")]
    Write(#[from] csv::Error),
    #[error("csv buffer error: {0}")]
    Buffer(String),
}

/// Render `rows` (JSON objects) as CSV text. Non-object rows are ignored.
pub fn generate_csv(rows: &[Value]) -> Result<String, CsvError> {
    let flattened: Vec<Vec<(String, String)>> = rows
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| {
            let mut out = Vec::new();
            flatten_object(obj, "", &mut out);
            out
        })
        .collect();
    if flattened.is_empty() {
        return Ok(String::new());
    }

    let mut headers: Vec<String> = Vec::new();
    for row in &flattened {
        for (key, _) in row {
            if !headers.iter().any(|h| h == key) {
                headers.push(key.clone());
            }
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(headers.iter().map(|h| format_header(h)))?;
    for row in &flattened {
        let record = headers.iter().map(|h| {
            row.iter()
                .find(|(k, _)| k == h)
                .map(|(_, v)| v.as_str())
                .unwrap_or("")
        });
        writer.write_record(record)?;
    }
    let bytes = writer.into_inner().map_err(|e| CsvError::Buffer(e.to_string()))?;
    let mut text = String::from_utf8(bytes).map_err(|e| CsvError::Buffer(e.to_string()))?;
    while text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// `roles` + now -> `roles_2024-05-01T10-20-30.csv`
pub fn csv_filename(name: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}.csv", name, now.format("%Y-%m-%dT%H-%M-%S"))
}

fn flatten_object(obj: &Map<String, Value>, prefix: &str, out: &mut Vec<(String, String)>) {
    for (key, value) in obj {
        let column = if prefix.is_empty() { key.clone() } else { format!("{}_{}", prefix, key) };
        match value {
            Value::Null => out.push((column, String::new())),
            Value::Array(items) => out.push((column, join_array(items))),
            Value::Object(inner) => flatten_object(inner, &column, out),
            Value::Bool(b) => out.push((column, if *b { "Yes" } else { "No" }.to_string())),
            other if is_date_key(key) => out.push((column, format_date(other))),
            Value::String(s) => out.push((column, s.clone())),
            Value::Number(n) => out.push((column, n.to_string())),
        }
    }
}

/// Nulls are dropped, as are objects that render to nothing.
fn join_array(items: &[Value]) -> String {
    items
        .iter()
        .filter_map(|item| match item {
            Value::Null => None,
            Value::Object(obj) => Some(object_label(obj)).filter(|s| !s.is_empty()),
            other => Some(scalar_text(other)),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn object_label(obj: &Map<String, Value>) -> String {
    ["name", "title"]
        .iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            obj.values()
                .filter(|v| !v.is_null())
                .map(scalar_text)
                .collect::<Vec<_>>()
                .join(" ")
        })
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_date_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    lower.contains("date") || lower.contains("_at")
}

fn format_date(v: &Value) -> String {
    let parsed: Option<NaiveDate> = match v {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|d| d.date_naive())
            .ok()
            .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|d| d.date_naive()),
        _ => None,
    };
    parsed.map(|d| d.format("%m-%d-%Y").to_string()).unwrap_or_default()
}

/// `organization_organizationName` -> `Organization Organization Name`.
/// Words break only where a lowercase letter meets an uppercase one, so `userID` -> `User Id`.
pub fn format_header(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 8);
    let mut prev_lower = false;
    for ch in key.chars() {
        if ch == '_' {
            spaced.push(' ');
        } else {
            if prev_lower && ch.is_ascii_uppercase() {
                spaced.push(' ');
            }
            spaced.push(ch);
        }
        prev_lower = ch.is_ascii_lowercase();
    }
    spaced
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn empty_input_gives_empty_document() {
        assert_eq!(generate_csv(&[]).unwrap(), "");
    }

    #[test]
    fn flattens_nested_objects_and_formats_headers() {
        let rows = vec![json!({
            "name": "Berlin Office",
            "organization": {"organizationName": "Acme", "email": "ops@acme.io"},
            "active": true
        })];
        let csv = generate_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Name,Organization Organization Name,Organization Email,Active"));
        assert_eq!(lines.next(), Some("Berlin Office,Acme,ops@acme.io,Yes"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn quotes_values_that_need_escaping() {
        let rows = vec![json!({"name": "Acme, Inc", "description": "say \"hi\""})];
        let csv = generate_csv(&rows).unwrap();
        assert_eq!(csv, "Name,Description\n\"Acme, Inc\",\"say \"\"hi\"\"\"");
    }

    #[test]
    fn arrays_use_name_or_title() {
        let rows = vec![json!({
            "members": [{"name": "Ann"}, {"title": "Lead"}, {"first": "Bo", "last": "Li"}],
            "tags": ["a", "b"]
        })];
        let csv = generate_csv(&rows).unwrap();
        assert!(csv.ends_with("Ann; Lead; Bo Li,a; b"));
    }

    #[test]
    fn date_keys_render_month_day_year() {
        let rows = vec![json!({"created_at": "2024-03-07T10:00:00Z", "dueDate": "not a date"})];
        let csv = generate_csv(&rows).unwrap();
        assert!(csv.ends_with("03-07-2024,"));
    }

    #[test]
    fn missing_columns_are_blank() {
        let rows = vec![json!({"a": 1}), json!({"b": 2})];
        let csv = generate_csv(&rows).unwrap();
        assert_eq!(csv, "A,B\n1,\n,2");
    }

    #[test]
    fn filename_has_timestamp_suffix() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 20, 30).unwrap();
        assert_eq!(csv_filename("roles", now), "roles_2024-05-01T10-20-30.csv");
    }

    #[test]
    fn header_splits_camel_case() {
        assert_eq!(format_header("Role Name"), "Role Name");
        assert_eq!(format_header("timeZone"), "Time Zone");
        assert_eq!(format_header("user_count"), "User Count");
        assert_eq!(format_header("userID"), "User Id");
        assert_eq!(format_header("HTTPStatus"), "Httpstatus");
    }

    #[test]
    fn arrays_skip_nulls_and_blank_items() {
        let rows = vec![json!({
            "members": [{"name": "Ann"}, {"name": null, "email": null}, null, {"name": "", "title": "Lead"}],
            "tags": ["a", null, "b"]
        })];
        let csv = generate_csv(&rows).unwrap();
        assert!(csv.ends_with("Ann; Lead,a; b"));
    }
}
