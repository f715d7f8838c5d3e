//! Best-effort field coercion.
//!
//! Upstream values arrive as loosely typed JSON or CSV text. Every
//! coercion here returns `Option`: an unparseable value becomes `None`
//! for that field and the row is retained, never aborted.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde_json::Value;

/// Non-empty trimmed string field. Numbers are accepted and stringified,
/// which covers zip codes served as JSON numbers.
pub fn get_str(row: &Value, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn get_i32(row: &Value, key: &str) -> Option<i32> {
    match row.get(key)? {
        Value::Number(n) => n.as_i64().map(|v| v as i32).or_else(|| {
            n.as_f64().map(|f| f.round() as i32)
        }),
        Value::String(s) => parse_i32(s),
        _ => None,
    }
}

pub fn get_f64(row: &Value, key: &str) -> Option<f64> {
    match row.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn get_bool(row: &Value, key: &str) -> Option<bool> {
    match row.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Some(true),
            "false" | "f" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        _ => None,
    }
}

pub fn parse_i32(s: &str) -> Option<i32> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<i32>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().map(|f| f.round() as i32))
}

/// Timestamp in any of the shapes the sources use: ISO with or without a
/// `T`, optional fractional seconds, or a bare date (midnight).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    parse_timestamp(s).map(|ts| ts.date())
}

/// GeoJSON point under `key`: coordinates are `[lng, lat]`. Returns
/// `(lat, lng)`.
pub fn geo_point(row: &Value, key: &str) -> Option<(f64, f64)> {
    let coords = row.get(key)?.get("coordinates")?.as_array()?;
    let lng = coord_value(coords.first()?)?;
    let lat = coord_value(coords.get(1)?)?;
    Some((lat, lng))
}

fn coord_value(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Day of week numbered Sunday = 0, the convention the rollups use.
pub fn dow_sunday0(d: NaiveDate) -> i32 {
    match d.weekday() {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}

pub fn quarter(d: NaiveDate) -> i32 {
    ((d.month0() / 3) + 1) as i32
}

/// First day of the row's month (the month bucket).
pub fn month_start(d: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(d.year(), d.month(), 1).unwrap_or(d)
}
