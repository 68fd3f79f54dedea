//! Record value model.
//!
//! An ODS record is a flat mapping from field name to a scalar [`Value`].
//! Time-valued fields live in one of two representations: the serialized
//! ISO-8601 string form ([`Value::Str`]) or the parsed form ([`Value::Time`]).
//! Which one holds is tracked per store, never per record.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::tools;

/// A single ODS record: field name to scalar value.
pub type OdsRecord = HashMap<String, Value>;

/// Scalar value of one record field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence marker for fields not yet populated.
    Null,
    Str(String),
    Float(f64),
    Bool(bool),
    /// Parsed representation of a time field.
    Time(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Canonical string form used for sorting, equality, and flat export.
    ///
    /// Times format as ISO-8601 to seconds precision, which sorts correctly
    /// as a plain string.
    pub fn string_form(&self) -> String {
        match self {
            Value::Null => "None".to_string(),
            Value::Str(s) => s.clone(),
            Value::Float(f) => format_float(*f),
            Value::Bool(b) => b.to_string(),
            Value::Time(t) => tools::format_time(*t),
        }
    }

    /// Parsed time, if this value holds or parses as one.
    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Time(t) => Some(*t),
            Value::Str(s) => tools::parse_time(s).ok(),
            _ => None,
        }
    }

    /// Numeric view, accepting floats and numeric strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Convert from a JSON scalar. Arrays and objects stringify to their
    /// compact JSON text so they surface later as type failures rather than
    /// aborting a read.
    pub fn from_json(value: &serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Number(n) => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::Bool(b) => Value::Bool(*b),
            other => Value::Str(other.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Time(t) => serde_json::Value::String(tools::format_time(*t)),
        }
    }
}

/// Format a float the way serde_json renders it, so values round-trip
/// through the persisted format with identical string forms.
fn format_float(f: f64) -> String {
    if f == f.trunc() && f.is_finite() && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

/// Convert a JSON object into an [`OdsRecord`]. Unknown keys are kept;
/// validation reports them.
pub fn record_from_json(obj: &serde_json::Map<String, serde_json::Value>) -> OdsRecord {
    obj.iter()
        .map(|(k, v)| (k.clone(), Value::from_json(v)))
        .collect()
}

/// Render a record as a JSON object with fields in the supplied order,
/// followed by any keys outside that order (sorted, for determinism).
pub fn record_to_json(rec: &OdsRecord, field_order: &[&str]) -> serde_json::Value {
    let mut obj = serde_json::Map::new();
    for field in field_order {
        if let Some(v) = rec.get(*field) {
            obj.insert((*field).to_string(), v.to_json());
        }
    }
    let mut extras: Vec<&String> = rec
        .keys()
        .filter(|k| !field_order.contains(&k.as_str()))
        .collect();
    extras.sort();
    for key in extras {
        obj.insert(key.clone(), rec[key].to_json());
    }
    serde_json::Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_form_time_is_iso_seconds() {
        let t = tools::parse_time("2025-01-01T00:00:00").unwrap();
        assert_eq!(Value::Time(t).string_form(), "2025-01-01T00:00:00");
    }

    #[test]
    fn test_string_form_sorts_like_time() {
        let a = Value::Str("2025-01-01T09:59:00".to_string());
        let b = Value::Str("2025-01-01T10:00:00".to_string());
        assert!(a.string_form() < b.string_form());
    }

    #[test]
    fn test_float_string_form_round_trips_json() {
        let v = Value::from_json(&serde_json::json!(40.0));
        assert_eq!(v.string_form(), "40.0");
        let v = Value::from_json(&serde_json::json!(40.8165));
        assert_eq!(v.string_form(), "40.8165");
    }

    #[test]
    fn test_as_time_from_string() {
        let v = Value::Str("2025-03-01T12:30".to_string());
        assert!(v.as_time().is_some());
        assert!(Value::Str("not a time".to_string()).as_time().is_none());
    }

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(Value::from_json(&serde_json::json!(null)), Value::Null);
        assert_eq!(Value::from_json(&serde_json::json!(true)), Value::Bool(true));
        assert_eq!(Value::from_json(&serde_json::json!(1.5)), Value::Float(1.5));
        assert_eq!(
            Value::from_json(&serde_json::json!("x")),
            Value::Str("x".to_string())
        );
    }

    #[test]
    fn test_record_to_json_orders_fields() {
        let mut rec = OdsRecord::new();
        rec.insert("b".to_string(), Value::Float(1.0));
        rec.insert("a".to_string(), Value::Str("x".to_string()));
        let json = record_to_json(&rec, &["a", "b"]);
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["a", "b"]);
    }
}
