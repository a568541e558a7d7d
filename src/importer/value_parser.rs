// ==========================================
// Tabular Import - Value grammar
// ==========================================
// Shared by SchemaInferencer (classification) and Importer (binding),
// so a value typed at inference time always binds at insert time.
// ==========================================

use crate::domain::InferredType;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

pub fn parse_integer(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

/// Finite floating-point values only; `inf`/`nan` spellings stay text.
pub fn parse_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Narrowest type tag of a single present value.
pub fn classify(raw: &str) -> InferredType {
    if parse_integer(raw).is_some() {
        InferredType::Integer
    } else if parse_float(raw).is_some() {
        InferredType::Float
    } else if parse_boolean(raw).is_some() {
        InferredType::Boolean
    } else if parse_timestamp(raw).is_some() {
        InferredType::Timestamp
    } else {
        InferredType::Text
    }
}
