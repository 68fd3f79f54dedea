//! Record store: a named, schema-bound, ordered collection of ODS records
//! plus derived aggregates.
//!
//! Insertion order is not semantically meaningful; canonical order is always
//! re-derived from the standard's sort key when needed. Derived state
//! (earliest/latest, per-field value sets, valid/invalid partition) is owned
//! exclusively by [`OdsInstance::gen_info`], which must run after any bulk
//! mutation of the record sequence.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::error::{OdsError, OdsResult};
use crate::record::{self, OdsRecord, Value};
use crate::standard::Standard;
use crate::tools;

/// Sentinel used to initialize the earliest-start aggregate (far future).
pub const REF_LATEST_TIME: &str = "2026-12-31T23:59";
/// Sentinel used to initialize the latest-stop aggregate (far past).
pub const REF_EARLIEST_TIME: &str = "2020-01-01T00:00";

/// Which representation the store's time fields currently hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    /// ISO-8601 strings, as persisted.
    Strings,
    /// Parsed absolute times.
    Parsed,
}

/// Where the store's records came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// Freshly initialized, no ingest yet.
    Init,
    /// Literal in-memory mapping.
    Literal,
    File(PathBuf),
    Url(String),
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Init => write!(f, "init"),
            Provenance::Literal => write!(f, "dictionary"),
            Provenance::File(path) => write!(f, "{}", path.display()),
            Provenance::Url(url) => write!(f, "{url}"),
        }
    }
}

/// One named ODS record collection bound to a standard version.
#[derive(Debug, Clone)]
pub struct OdsInstance {
    pub name: String,
    pub standard: Standard,
    pub provenance: Provenance,
    pub entries: Vec<OdsRecord>,
    /// Indices of records passing validation, rebuilt by `gen_info`.
    pub valid_records: Vec<usize>,
    /// Invalid record indices mapped to their accumulated reasons.
    pub invalid_records: BTreeMap<usize, Vec<String>>,
    /// Distinct observed string forms per schema field.
    pub input_sets: BTreeMap<String, BTreeSet<String>>,
    /// Keys encountered that are not valid schema fields.
    pub unknown_keys: BTreeSet<String>,
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
    pub time_format: TimeFormat,
}

impl OdsInstance {
    /// Create an empty store bound to a standard version. The binding is
    /// immutable for the life of the store.
    pub fn new(name: &str, version: &str) -> OdsResult<Self> {
        Ok(Self {
            name: name.to_string(),
            standard: Standard::new(version)?,
            provenance: Provenance::Init,
            entries: Vec::new(),
            valid_records: Vec::new(),
            invalid_records: BTreeMap::new(),
            input_sets: BTreeMap::new(),
            unknown_keys: BTreeSet::new(),
            earliest: far_future(),
            latest: far_past(),
            time_format: TimeFormat::Strings,
        })
    }

    pub fn number_of_records(&self) -> usize {
        self.entries.len()
    }

    /// Build a record: every schema field starts at the absence marker,
    /// defaults overlay it, supplied values overlay defaults. Keys outside
    /// the schema are not carried. Does not validate or append.
    pub fn construct_record(&self, supplied: &OdsRecord, defaults: &OdsRecord) -> OdsRecord {
        let mut rec = OdsRecord::new();
        for (field, _) in self.standard.fields() {
            let value = supplied
                .get(field)
                .or_else(|| defaults.get(field))
                .cloned()
                .unwrap_or(Value::Null);
            rec.insert(field.to_string(), value);
        }
        rec
    }

    /// Construct a record with defaulting and append it.
    pub fn new_record(&mut self, supplied: &OdsRecord, defaults: &OdsRecord) {
        let rec = self.construct_record(supplied, defaults);
        self.entries.push(rec);
    }

    /// Ingest records from a decoded payload in the persisted-collection
    /// format. The read is all-or-nothing: a malformed payload leaves the
    /// store untouched. Keys outside the schema are kept so validation can
    /// report them.
    pub fn read_value(
        &mut self,
        data: &serde_json::Value,
        provenance: Provenance,
    ) -> OdsResult<usize> {
        let obj = data
            .as_object()
            .ok_or_else(|| OdsError::format("payload is not a JSON object"))?;
        let key = self.standard.data_key();
        let records = obj
            .get(key)
            .ok_or_else(|| OdsError::format(format!("payload is missing the '{key}' data key")))?
            .as_array()
            .ok_or_else(|| OdsError::format(format!("'{key}' is not an array")))?;

        let mut incoming = Vec::with_capacity(records.len());
        for (i, item) in records.iter().enumerate() {
            let rec = item
                .as_object()
                .ok_or_else(|| OdsError::format(format!("record {i} is not a JSON object")))?;
            incoming.push(record::record_from_json(rec));
        }

        let count = incoming.len();
        self.entries.extend(incoming);
        self.provenance = provenance;
        self.time_format = TimeFormat::Strings;
        self.gen_info();
        Ok(count)
    }

    /// Ingest records from a persisted JSON file.
    pub fn read_file(&mut self, path: impl AsRef<Path>) -> OdsResult<usize> {
        let path = tools::json_path(path);
        let data = tools::read_json_file(&path)?;
        self.read_value(&data, Provenance::File(path))
    }

    /// Recompute all derived state in a single pass: earliest/latest bounds,
    /// per-field value sets, the unknown-key bucket, and the valid/invalid
    /// partition. The single source of truth for aggregates.
    pub fn gen_info(&mut self) {
        self.earliest = far_future();
        self.latest = far_past();
        self.input_sets.clear();
        self.unknown_keys.clear();
        self.valid_records.clear();
        self.invalid_records.clear();

        let start_field = self.standard.start();
        let stop_field = self.standard.stop();
        for (ctr, entry) in self.entries.iter().enumerate() {
            for (key, value) in entry {
                if !self.standard.is_field(key) {
                    self.unknown_keys.insert(key.clone());
                    continue;
                }
                if !value.is_null() {
                    self.input_sets
                        .entry(key.clone())
                        .or_default()
                        .insert(value.string_form());
                }
                if key == start_field {
                    if let Some(t) = value.as_time() {
                        self.earliest = self.earliest.min(t);
                    }
                } else if key == stop_field {
                    if let Some(t) = value.as_time() {
                        self.latest = self.latest.max(t);
                    }
                }
            }
            let (is_valid, reasons) = self.standard.validate(entry);
            if is_valid {
                self.valid_records.push(ctr);
            } else {
                self.invalid_records.insert(ctr, reasons);
            }
        }
    }

    /// Convert every time field to the parsed representation. Idempotent;
    /// values that do not parse are left as-is.
    pub fn make_time(&mut self) {
        if self.time_format == TimeFormat::Parsed {
            return;
        }
        self.time_format = TimeFormat::Parsed;
        for entry in &mut self.entries {
            for field in self.standard.time_fields() {
                if let Some(value) = entry.get_mut(*field) {
                    if let Some(t) = value.as_time() {
                        *value = Value::Time(t);
                    }
                }
            }
        }
    }

    /// Inverse of [`make_time`](Self::make_time). Idempotent.
    pub fn convert_time_to_str(&mut self) {
        if self.time_format == TimeFormat::Strings {
            return;
        }
        self.time_format = TimeFormat::Strings;
        for entry in &mut self.entries {
            for field in self.standard.time_fields() {
                if let Some(Value::Time(t)) = entry.get(*field) {
                    let s = tools::format_time(*t);
                    entry.insert((*field).to_string(), Value::Str(s));
                }
            }
        }
    }

    /// Apply field updates to one record by index, then recompute
    /// aggregates.
    pub fn update_entry(&mut self, index: usize, updates: &OdsRecord) -> OdsResult<()> {
        let len = self.entries.len();
        let entry = self.entries.get_mut(index).ok_or_else(|| {
            OdsError::parameter(format!(
                "entry {index} out of range for '{}' ({len} records)",
                self.name
            ))
        })?;
        for (key, value) in updates {
            entry.insert(key.clone(), value.clone());
        }
        self.gen_info();
        Ok(())
    }

    /// Replace the record sequence wholesale and recompute aggregates.
    /// Culling and deduplication funnel through here.
    pub fn replace_entries(&mut self, entries: Vec<OdsRecord>) {
        self.entries = entries;
        self.gen_info();
    }

    /// Parsed start time of one record, if present and parseable.
    pub fn start_time_of(&self, rec: &OdsRecord) -> Option<DateTime<Utc>> {
        rec.get(self.standard.start()).and_then(Value::as_time)
    }

    /// Parsed stop time of one record, if present and parseable.
    pub fn stop_time_of(&self, rec: &OdsRecord) -> Option<DateTime<Utc>> {
        rec.get(self.standard.stop()).and_then(Value::as_time)
    }

    /// Export to the persisted JSON format, time fields in string form.
    pub fn write(&mut self, path: impl AsRef<Path>) -> OdsResult<()> {
        self.convert_time_to_str();
        let order = self.standard.field_names();
        let records: Vec<serde_json::Value> = self
            .entries
            .iter()
            .map(|rec| record::record_to_json(rec, &order))
            .collect();
        let payload = serde_json::json!({ self.standard.data_key(): records });
        tools::write_json_file(tools::json_path(path), &payload)
    }

    /// Export as delimited text, header row plus one row per record.
    /// `cols = None` writes every schema field in declaration order.
    pub fn export_to_file(
        &mut self,
        path: impl AsRef<Path>,
        cols: Option<&[&str]>,
        sep: char,
    ) -> OdsResult<()> {
        self.convert_time_to_str();
        let all = self.standard.field_names();
        let cols = cols.unwrap_or(&all);
        tools::write_data_file(path, &self.entries, cols, sep)
    }
}

static FAR_FUTURE: Lazy<DateTime<Utc>> =
    Lazy::new(|| tools::parse_time(REF_LATEST_TIME).expect("sentinel time parses"));
static FAR_PAST: Lazy<DateTime<Utc>> =
    Lazy::new(|| tools::parse_time(REF_EARLIEST_TIME).expect("sentinel time parses"));

fn far_future() -> DateTime<Utc> {
    *FAR_FUTURE
}

fn far_past() -> DateTime<Utc> {
    *FAR_PAST
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> serde_json::Value {
        serde_json::json!({
            "ods_data": [
                {
                    "site_id": "hcro", "site_lat_deg": 40.8172, "site_lon_deg": -121.47,
                    "site_el_m": 986.0, "src_id": "X", "src_is_pulsar_bool": false,
                    "corr_integ_time_sec": 1.0, "src_ra_j2000_deg": 180.0,
                    "src_dec_j2000_deg": 45.0, "src_radius": 1.0,
                    "src_start_utc": "2025-01-01T00:00:00",
                    "src_end_utc": "2025-01-01T01:00:00",
                    "slew_sec": 10.0, "trk_rate_dec_deg_per_sec": 0.0,
                    "trk_rate_ra_deg_per_sec": 0.0, "freq_lower_hz": 1e9,
                    "freq_upper_hz": 2e9, "notes": ""
                },
                {
                    "site_id": "hcro", "site_lat_deg": 40.8172, "site_lon_deg": -121.47,
                    "site_el_m": 986.0, "src_id": "Y", "src_is_pulsar_bool": false,
                    "corr_integ_time_sec": 1.0, "src_ra_j2000_deg": 90.0,
                    "src_dec_j2000_deg": 30.0, "src_radius": 1.0,
                    "src_start_utc": "2025-01-01T02:00:00",
                    "src_end_utc": "2025-01-01T03:00:00",
                    "slew_sec": 10.0, "trk_rate_dec_deg_per_sec": 0.0,
                    "trk_rate_ra_deg_per_sec": 0.0, "freq_lower_hz": 1e9,
                    "freq_upper_hz": 2e9, "notes": ""
                }
            ]
        })
    }

    #[test]
    fn test_read_value_counts_and_aggregates() {
        let mut inst = OdsInstance::new("primary", "latest").unwrap();
        let count = inst.read_value(&payload(), Provenance::Literal).unwrap();
        assert_eq!(count, 2);
        assert_eq!(inst.valid_records, vec![0, 1]);
        assert!(inst.invalid_records.is_empty());
        assert_eq!(tools::format_time(inst.earliest), "2025-01-01T00:00:00");
        assert_eq!(tools::format_time(inst.latest), "2025-01-01T03:00:00");
        // Shared site collapses to a single observed value; sources do not.
        assert_eq!(inst.input_sets["site_id"].len(), 1);
        assert_eq!(inst.input_sets["src_id"].len(), 2);
    }

    #[test]
    fn test_read_missing_data_key_leaves_store_untouched() {
        let mut inst = OdsInstance::new("primary", "latest").unwrap();
        inst.read_value(&payload(), Provenance::Literal).unwrap();
        let err = inst.read_value(&serde_json::json!({"wrong": []}), Provenance::Literal);
        assert!(matches!(err, Err(OdsError::Format(_))));
        assert_eq!(inst.number_of_records(), 2);
    }

    #[test]
    fn test_construct_record_supplied_wins_over_defaults() {
        let inst = OdsInstance::new("primary", "latest").unwrap();
        let mut supplied = OdsRecord::new();
        supplied.insert("src_id".to_string(), Value::Str("A".to_string()));
        let mut defaults = OdsRecord::new();
        defaults.insert("src_id".to_string(), Value::Str("B".to_string()));
        defaults.insert("site_id".to_string(), Value::Str("hcro".to_string()));

        let rec = inst.construct_record(&supplied, &defaults);
        assert_eq!(rec["src_id"], Value::Str("A".to_string()));
        assert_eq!(rec["site_id"], Value::Str("hcro".to_string()));
        assert_eq!(rec["notes"], Value::Null);
        // Every schema field is present after construction.
        assert_eq!(rec.len(), inst.standard.field_names().len());
    }

    #[test]
    fn test_construct_record_drops_unknown_keys() {
        let inst = OdsInstance::new("primary", "latest").unwrap();
        let mut supplied = OdsRecord::new();
        supplied.insert("bogus".to_string(), Value::Float(1.0));
        let rec = inst.construct_record(&supplied, &OdsRecord::new());
        assert!(!rec.contains_key("bogus"));
    }

    #[test]
    fn test_time_conversion_is_idempotent_and_whole_store() {
        let mut inst = OdsInstance::new("primary", "latest").unwrap();
        inst.read_value(&payload(), Provenance::Literal).unwrap();

        inst.make_time();
        assert_eq!(inst.time_format, TimeFormat::Parsed);
        assert!(matches!(inst.entries[0]["src_start_utc"], Value::Time(_)));
        inst.make_time(); // no-op
        assert!(matches!(inst.entries[1]["src_end_utc"], Value::Time(_)));

        inst.convert_time_to_str();
        assert_eq!(inst.time_format, TimeFormat::Strings);
        assert_eq!(
            inst.entries[0]["src_start_utc"],
            Value::Str("2025-01-01T00:00:00".to_string())
        );
    }

    #[test]
    fn test_update_entry_out_of_range_is_parameter_error() {
        let mut inst = OdsInstance::new("primary", "latest").unwrap();
        let updates = OdsRecord::new();
        assert!(matches!(
            inst.update_entry(5, &updates),
            Err(OdsError::Parameter(_))
        ));
    }

    #[test]
    fn test_update_entry_recomputes_aggregates() {
        let mut inst = OdsInstance::new("primary", "latest").unwrap();
        inst.read_value(&payload(), Provenance::Literal).unwrap();
        let mut updates = OdsRecord::new();
        updates.insert(
            "src_end_utc".to_string(),
            Value::Str("2025-01-01T05:00:00".to_string()),
        );
        inst.update_entry(1, &updates).unwrap();
        assert_eq!(tools::format_time(inst.latest), "2025-01-01T05:00:00");
    }

    #[test]
    fn test_unknown_keys_land_in_sentinel_bucket() {
        let mut inst = OdsInstance::new("primary", "latest").unwrap();
        let mut data = payload();
        data["ods_data"][0]["bogus_key"] = serde_json::json!("x");
        inst.read_value(&data, Provenance::Literal).unwrap();
        assert!(inst.unknown_keys.contains("bogus_key"));
        assert_eq!(inst.valid_records, vec![1]);
        assert_eq!(inst.invalid_records[&0].len(), 1);
    }
}
