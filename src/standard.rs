//! ODS standard registry: versioned field schemas and record validation.
//!
//! Each registered version defines the set of valid fields with expected
//! scalar types, which fields are time-valued, the sort key used for
//! canonical ordering and deduplication, and the aliases mapping short
//! logical names (start, stop, lat, ...) to full field names. Adding a
//! version means registering a new entry, not adding a new type.

use crate::record::{OdsRecord, Value};
use crate::error::{OdsError, OdsResult};
use crate::tools;

/// Version resolved by `"latest"`.
pub const LATEST: &str = "A";

/// Expected scalar type of one schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Str,
    Float,
    Bool,
}

impl FieldType {
    /// Whether a present, non-null value is coercible to this type.
    pub fn coerces(&self, value: &Value) -> bool {
        match self {
            // Any scalar stringifies.
            FieldType::Str => !value.is_null(),
            FieldType::Float => match value {
                Value::Float(_) => true,
                Value::Bool(_) => true,
                Value::Str(s) => s.trim().parse::<f64>().is_ok(),
                _ => false,
            },
            FieldType::Bool => match value {
                Value::Bool(_) => true,
                Value::Float(f) => *f == 0.0 || *f == 1.0,
                Value::Str(s) => {
                    matches!(s.trim(), "true" | "false" | "True" | "False" | "0" | "1")
                }
                _ => false,
            },
        }
    }

    /// Parse a string form into a typed value, used when deriving defaults
    /// and when ingesting delimited text.
    pub fn parse(&self, s: &str) -> Option<Value> {
        let s = s.trim();
        match self {
            FieldType::Str => Some(Value::Str(s.to_string())),
            FieldType::Float => s.parse::<f64>().ok().map(Value::Float),
            FieldType::Bool => match s {
                "true" | "True" | "1" => Some(Value::Bool(true)),
                "false" | "False" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
        }
    }
}

/// Version A field set.
const FIELDS_A: &[(&str, FieldType)] = &[
    ("site_id", FieldType::Str),
    ("site_lat_deg", FieldType::Float),
    ("site_lon_deg", FieldType::Float),
    ("site_el_m", FieldType::Float),
    ("src_id", FieldType::Str),
    ("src_is_pulsar_bool", FieldType::Bool),
    ("corr_integ_time_sec", FieldType::Float),
    ("src_ra_j2000_deg", FieldType::Float),
    ("src_dec_j2000_deg", FieldType::Float),
    ("src_radius", FieldType::Float),
    ("src_start_utc", FieldType::Str),
    ("src_end_utc", FieldType::Str),
    ("slew_sec", FieldType::Float),
    ("trk_rate_dec_deg_per_sec", FieldType::Float),
    ("trk_rate_ra_deg_per_sec", FieldType::Float),
    ("freq_lower_hz", FieldType::Float),
    ("freq_upper_hz", FieldType::Float),
    ("notes", FieldType::Str),
];

const TIME_FIELDS_A: &[&str] = &["src_start_utc", "src_end_utc"];

/// Canonical sort key: time-major, then site and source for stable ties.
const SORT_ORDER_TIME_A: &[&str] = &["src_start_utc", "src_end_utc", "site_id", "src_id"];

/// One registered version of the ODS standard.
#[derive(Debug, Clone)]
pub struct Standard {
    version: String,
    fields: &'static [(&'static str, FieldType)],
    time_fields: &'static [&'static str],
    sort_order_time: &'static [&'static str],
    data_key: &'static str,
}

impl Standard {
    /// Resolve a version identifier; `"latest"` maps to the current version.
    pub fn new(version: &str) -> OdsResult<Self> {
        let version = if version == "latest" { LATEST } else { version };
        match version {
            "A" => Ok(Self {
                version: version.to_string(),
                fields: FIELDS_A,
                time_fields: TIME_FIELDS_A,
                sort_order_time: SORT_ORDER_TIME_A,
                data_key: "ods_data",
            }),
            other => Err(OdsError::UnknownVersion(other.to_string())),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Top-level key holding the record array in the persisted format.
    pub fn data_key(&self) -> &'static str {
        self.data_key
    }

    /// Schema fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, FieldType)> + '_ {
        self.fields.iter().copied()
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(name, _)| *name).collect()
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, ty)| *ty)
    }

    pub fn is_field(&self, name: &str) -> bool {
        self.field_type(name).is_some()
    }

    pub fn time_fields(&self) -> &'static [&'static str] {
        self.time_fields
    }

    pub fn sort_order_time(&self) -> &'static [&'static str] {
        self.sort_order_time
    }

    // Transfer keys: short logical names to full field names.
    pub fn start(&self) -> &'static str {
        "src_start_utc"
    }
    pub fn stop(&self) -> &'static str {
        "src_end_utc"
    }
    pub fn lat(&self) -> &'static str {
        "site_lat_deg"
    }
    pub fn lon(&self) -> &'static str {
        "site_lon_deg"
    }
    pub fn ele(&self) -> &'static str {
        "site_el_m"
    }
    pub fn ra(&self) -> &'static str {
        "src_ra_j2000_deg"
    }
    pub fn dec(&self) -> &'static str {
        "src_dec_j2000_deg"
    }
    pub fn source(&self) -> &'static str {
        "src_id"
    }

    /// Validate one record, accumulating every failure rather than
    /// short-circuiting, in check order:
    ///
    /// 1. every key is a known field
    /// 2. no present key holds the absence marker
    /// 3. every known field is present
    /// 4. every present, non-null value coerces to its declared type
    /// 5. every present, non-null time value parses as an absolute time
    ///
    /// Missing or null time fields already produced their reason under
    /// checks 2/3, so each defect yields exactly one reason.
    pub fn validate(&self, rec: &OdsRecord) -> (bool, Vec<String>) {
        let mut reasons = Vec::new();

        let mut extra_keys: Vec<&String> =
            rec.keys().filter(|k| !self.is_field(k)).collect();
        extra_keys.sort();
        for key in extra_keys {
            reasons.push(format!("'{key}' is not an ODS field"));
        }
        for (field, _) in self.fields {
            if let Some(value) = rec.get(*field) {
                if value.is_null() {
                    reasons.push(format!("value for '{field}' is null"));
                }
            }
        }
        for (field, ty) in self.fields {
            match rec.get(*field) {
                None => reasons.push(format!("missing '{field}'")),
                Some(value) if !value.is_null() && !ty.coerces(value) => {
                    reasons.push(format!(
                        "'{}' is the wrong type for '{field}'",
                        value.string_form()
                    ));
                }
                Some(_) => {}
            }
        }
        for field in self.time_fields {
            if let Some(value) = rec.get(*field) {
                if !value.is_null() && parse_time_value(value).is_none() {
                    reasons.push(format!(
                        "'{}' is not a valid time for '{field}'",
                        value.string_form()
                    ));
                }
            }
        }

        (reasons.is_empty(), reasons)
    }
}

fn parse_time_value(value: &Value) -> Option<chrono::DateTime<chrono::Utc>> {
    match value {
        Value::Time(t) => Some(*t),
        Value::Str(s) => tools::parse_time(s).ok(),
        _ => None,
    }
}
