//! Tolerant field lookup over loosely typed JSON documents
//!
//! Source payloads rename keys between template revisions and sometimes send
//! numbers as strings. Every accessor here takes a list of candidate dotted
//! paths and returns the first one that resolves to a usable value.

use serde_json::Value;

/// Resolves a dotted path such as `rangeFloor.min`; `null` counts as absent
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for key in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// First candidate path that resolves to a non-null value
pub fn first<'a>(value: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    candidates.iter().find_map(|path| lookup(value, path))
}

pub fn first_f64(value: &Value, candidates: &[&str]) -> Option<f64> {
    candidates
        .iter()
        .find_map(|path| lookup(value, path).and_then(as_f64))
}

/// Like `first_f64` but reads strings as money (`R$ 1.200` is 1200)
pub fn first_amount(value: &Value, candidates: &[&str]) -> Option<f64> {
    candidates
        .iter()
        .find_map(|path| lookup(value, path).and_then(as_amount))
}

pub fn first_i64(value: &Value, candidates: &[&str]) -> Option<i64> {
    candidates
        .iter()
        .find_map(|path| lookup(value, path).and_then(as_i64))
}

pub fn first_bool(value: &Value, candidates: &[&str]) -> Option<bool> {
    candidates
        .iter()
        .find_map(|path| lookup(value, path).and_then(as_bool))
}

/// First candidate that yields a non-blank string
pub fn first_string(value: &Value, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find_map(|path| {
            lookup(value, path)
                .and_then(as_string)
                .filter(|s| !s.trim().is_empty())
        })
}

/// Numbers pass through; strings are read as plain decimals first
///
/// Only a string that is not a plain decimal (`R$ 800`, `65,5`, `1.250.000`)
/// falls back to `parse_amount`, so `"-23.555"` stays `-23.555`.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .or_else(|| parse_amount(s)),
        _ => None,
    }
}

/// Monetary view of a value; strings always go through `parse_amount`
pub fn as_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

/// Integral view of a value; fractional numbers are truncated
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| parse_amount(trimmed).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "sim" | "yes" | "s" | "1" => Some(true),
            "false" | "nao" | "não" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parses a monetary or numeric string
///
/// A comma is treated as the decimal separator when present, in which case
/// dots are thousands separators. Without a comma, dot groups of exactly three
/// digits (`1.200.000`) are thousands separators too.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',' || *c == '-')
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else if is_thousands_grouped(&cleaned) {
        cleaned.replace('.', "")
    } else {
        cleaned
    };

    normalized.parse::<f64>().ok()
}

fn is_thousands_grouped(s: &str) -> bool {
    let mut parts = s.trim_start_matches('-').split('.');
    let head = parts.next().unwrap_or_default();
    let tail: Vec<&str> = parts.collect();
    !tail.is_empty()
        && (1..=3).contains(&head.len())
        && tail.iter().all(|p| p.len() == 3)
}
