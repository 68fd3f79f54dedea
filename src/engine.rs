//! Engine facade: owns the named record stores and exposes the mutation
//! and query API used by callers (CLI wrappers, monitors).
//!
//! One engine holds zero or more named [`OdsInstance`] stores (e.g.
//! `primary`, `from_web`, `from_log`) plus the engine-level defaults applied
//! when constructing records. Operations that recover from partial problems
//! return structured reports alongside `log` output, so callers never
//! depend on a logger being installed.

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::check::{self, ContinuityAdjust, CoverageReport, ObservationWindow};
use crate::config::MonitorConfig;
use crate::error::{OdsError, OdsResult};
use crate::instance::{OdsInstance, Provenance};
use crate::record::{OdsRecord, Value};
use crate::tools::{self, RemoteFetch};
use crate::visibility::ElevationModel;

/// Name of the store created with the engine.
pub const DEFAULT_WORKING_INSTANCE: &str = "primary";

/// Scratch store names used by the online monitor cycle.
const FROM_WEB: &str = "from_web";
const FROM_LOG: &str = "from_log";

/// Time-based culling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    /// Drop records whose stop precedes the cull time.
    Stale,
    /// Additionally drop records whose start is after the cull time,
    /// retaining only currently active records.
    Inactive,
}

impl FromStr for CullMode {
    type Err = OdsError;

    fn from_str(s: &str) -> OdsResult<Self> {
        match s {
            "stale" => Ok(CullMode::Stale),
            "inactive" => Ok(CullMode::Inactive),
            other => Err(OdsError::parameter(format!(
                "invalid cull mode '{other}' (expected 'stale' or 'inactive')"
            ))),
        }
    }
}

/// Where engine-level defaults come from.
#[derive(Debug, Clone)]
pub enum DefaultsSource {
    /// Each field whose observed-value set in the working instance has
    /// exactly one distinct value becomes a default.
    FromStore,
    /// Literal mapping.
    Literal(OdsRecord),
    /// JSON file, optionally a sub-key within it.
    File(PathBuf, Option<String>),
}

/// Outcome of a cull operation.
#[derive(Debug, Clone, Copy)]
pub struct CullReport {
    pub retained: usize,
    pub dropped: usize,
}

/// Outcome of an elevation update.
#[derive(Debug, Clone)]
pub struct ElevationReport {
    /// Records kept, with their windows rewritten.
    pub kept: usize,
    /// Records dropped because the source never rises above the limit.
    pub dropped: usize,
    /// Records left unchanged because their fields could not be used,
    /// with the reason.
    pub skipped: Vec<(usize, String)>,
}

/// Per-instance validity summary.
#[derive(Debug, Clone)]
pub struct InstanceReport {
    pub name: String,
    pub provenance: String,
    pub records: usize,
    pub invalid: BTreeMap<usize, Vec<String>>,
}

impl InstanceReport {
    pub fn all_valid(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// Outcome of one online monitor cycle.
#[derive(Debug, Clone, Copy)]
pub struct MonitorReport {
    /// Records fetched from the remote source.
    pub fetched: usize,
    /// Remote records still active after the inactive cull.
    pub active: usize,
    /// Log size after merge and dedup.
    pub log_records: usize,
}

/// The ODS engine: named record stores plus engine-level defaults.
pub struct Ods {
    instances: BTreeMap<String, OdsInstance>,
    working_instance: String,
    defaults: OdsRecord,
    version: String,
}

impl Ods {
    /// Create an engine with one empty working instance bound to `version`.
    pub fn new(version: &str) -> OdsResult<Self> {
        let mut instances = BTreeMap::new();
        instances.insert(
            DEFAULT_WORKING_INSTANCE.to_string(),
            OdsInstance::new(DEFAULT_WORKING_INSTANCE, version)?,
        );
        Ok(Self {
            instances,
            working_instance: DEFAULT_WORKING_INSTANCE.to_string(),
            defaults: OdsRecord::new(),
            version: version.to_string(),
        })
    }

    pub fn working_instance(&self) -> &str {
        &self.working_instance
    }

    /// Point the working-instance name at an existing store.
    pub fn set_working_instance(&mut self, name: &str) -> OdsResult<()> {
        if !self.instances.contains_key(name) {
            return Err(OdsError::UnknownInstance(name.to_string()));
        }
        self.working_instance = name.to_string();
        info!("the ODS working instance is now '{name}'");
        Ok(())
    }

    /// Resolve an optional name to an existing instance name; `None` means
    /// the working instance.
    fn resolve(&self, name: Option<&str>) -> OdsResult<String> {
        let name = name.unwrap_or(&self.working_instance);
        if self.instances.contains_key(name) {
            Ok(name.to_string())
        } else {
            Err(OdsError::UnknownInstance(name.to_string()))
        }
    }

    fn get(&self, name: &str) -> OdsResult<&OdsInstance> {
        self.instances
            .get(name)
            .ok_or_else(|| OdsError::UnknownInstance(name.to_string()))
    }

    fn get_mut(&mut self, name: &str) -> OdsResult<&mut OdsInstance> {
        self.instances
            .get_mut(name)
            .ok_or_else(|| OdsError::UnknownInstance(name.to_string()))
    }

    /// Shared access to a store; `None` means the working instance.
    pub fn instance(&self, name: Option<&str>) -> OdsResult<&OdsInstance> {
        let name = self.resolve(name)?;
        self.get(&name)
    }

    /// Create a new empty store. The name must be unused.
    pub fn new_instance(&mut self, name: &str, version: &str) -> OdsResult<()> {
        if self.instances.contains_key(name) {
            return Err(OdsError::DuplicateInstance(name.to_string()));
        }
        self.instances
            .insert(name.to_string(), OdsInstance::new(name, version)?);
        Ok(())
    }

    /// Create a store, or replace it with an empty one if it exists.
    pub fn reset_instance(&mut self, name: &str, version: &str) -> OdsResult<()> {
        self.instances
            .insert(name.to_string(), OdsInstance::new(name, version)?);
        Ok(())
    }

    /// Discard a named store.
    pub fn remove_instance(&mut self, name: &str) -> OdsResult<()> {
        self.instances
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| OdsError::UnknownInstance(name.to_string()))
    }

    pub fn instance_names(&self) -> Vec<&str> {
        self.instances.keys().map(String::as_str).collect()
    }

    // ------------------------------------------------------------------
    // Ingest

    /// Read records from a decoded payload in the persisted format.
    pub fn read_ods_value(
        &mut self,
        name: Option<&str>,
        data: &serde_json::Value,
    ) -> OdsResult<InstanceReport> {
        let name = self.resolve(name)?;
        let count = self
            .get_mut(&name)?
            .read_value(data, Provenance::Literal)?;
        info!("read {count} records into '{name}'");
        self.instance_report(Some(&name))
    }

    /// Read records from a persisted JSON file.
    pub fn read_ods_file(
        &mut self,
        name: Option<&str>,
        path: impl AsRef<Path>,
    ) -> OdsResult<InstanceReport> {
        let name = self.resolve(name)?;
        let count = self.get_mut(&name)?.read_file(path)?;
        info!("read {count} records into '{name}'");
        self.instance_report(Some(&name))
    }

    /// Fetch the persisted format from a URL and read it.
    pub fn read_ods_url(
        &mut self,
        name: Option<&str>,
        url: &str,
        fetcher: &dyn RemoteFetch,
    ) -> OdsResult<InstanceReport> {
        let name = self.resolve(name)?;
        let payload = fetcher.fetch_json(url)?;
        let count = self
            .get_mut(&name)?
            .read_value(&payload, Provenance::Url(url.to_string()))?;
        info!("read {count} records into '{name}' from {url}");
        self.instance_report(Some(&name))
    }

    /// Append one record built from the supplied fields over the engine
    /// defaults.
    pub fn add_record(&mut self, name: Option<&str>, supplied: &OdsRecord) -> OdsResult<()> {
        let name = self.resolve(name)?;
        let defaults = self.defaults.clone();
        let inst = self.get_mut(&name)?;
        inst.new_record(supplied, &defaults);
        inst.gen_info();
        Ok(())
    }

    /// Append records from a list, constructing each over the engine
    /// defaults, optionally deduplicating afterwards.
    pub fn add_from_list(
        &mut self,
        name: Option<&str>,
        entries: &[OdsRecord],
        remove_duplicates: bool,
    ) -> OdsResult<InstanceReport> {
        let name = self.resolve(name)?;
        let defaults = self.defaults.clone();
        {
            let inst = self.get_mut(&name)?;
            for entry in entries {
                inst.new_record(entry, &defaults);
            }
            inst.gen_info();
        }
        info!("read {} records from list into '{name}'", entries.len());
        if remove_duplicates {
            self.cull_by_duplicate(Some(&name))?;
        }
        self.instance_report(Some(&name))
    }

    /// Append records from a delimited data file with a header row.
    ///
    /// Cell values are coerced to their schema-declared types where the
    /// column is a known field; unknown columns are dropped by record
    /// construction.
    #[allow(clippy::too_many_arguments)]
    pub fn add_from_file(
        &mut self,
        name: Option<&str>,
        path: impl AsRef<Path>,
        sep: Option<char>,
        replace: Option<(&str, &str)>,
        header_map: Option<&HashMap<String, String>>,
        remove_duplicates: bool,
    ) -> OdsResult<InstanceReport> {
        let name = self.resolve(name)?;
        let path = path.as_ref();
        let rows = tools::read_data_file(path, sep, replace, header_map)?;
        let entries: Vec<OdsRecord> = {
            let standard = &self.get(&name)?.standard;
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|(col, cell)| {
                            let value = standard
                                .field_type(col)
                                .and_then(|ty| ty.parse(cell))
                                .unwrap_or_else(|| Value::Str(cell.clone()));
                            (col.clone(), value)
                        })
                        .collect()
                })
                .collect()
        };
        info!("read {} records from {}", entries.len(), path.display());
        let report = self.add_from_list(Some(&name), &entries, remove_duplicates)?;
        self.get_mut(&name)?.provenance = Provenance::File(path.to_path_buf());
        Ok(report)
    }

    /// Apply field updates to one record by index.
    pub fn update_entry(
        &mut self,
        name: Option<&str>,
        index: usize,
        updates: &OdsRecord,
    ) -> OdsResult<()> {
        let name = self.resolve(name)?;
        self.get_mut(&name)?.update_entry(index, updates)
    }

    /// Merge every record of `from` into `to`, optionally deduplicating the
    /// result.
    pub fn merge(
        &mut self,
        from: &str,
        to: &str,
        remove_duplicates: bool,
    ) -> OdsResult<InstanceReport> {
        let entries = self.get(from)?.entries.clone();
        self.resolve(Some(to))?;
        info!("merging '{from}' into '{to}'");
        self.add_from_list(Some(to), &entries, remove_duplicates)
    }

    // ------------------------------------------------------------------
    // Culls

    /// Drop records by time relative to `cull_time` under the given mode.
    pub fn cull_by_time(
        &mut self,
        name: Option<&str>,
        cull_time: DateTime<Utc>,
        mode: CullMode,
    ) -> OdsResult<CullReport> {
        let name = self.resolve(name)?;
        let inst = self.get_mut(&name)?;
        let starting = inst.number_of_records();
        let retained: Vec<OdsRecord> = inst
            .entries
            .iter()
            .filter(|rec| {
                let stop = inst.stop_time_of(rec);
                let start = inst.start_time_of(rec);
                match (start, stop) {
                    (Some(start), Some(stop)) => {
                        if cull_time > stop {
                            false
                        } else {
                            mode == CullMode::Stale || cull_time >= start
                        }
                    }
                    // Unparseable windows are validation's concern.
                    _ => true,
                }
            })
            .cloned()
            .collect();
        inst.replace_entries(retained);
        let report = CullReport {
            retained: inst.number_of_records(),
            dropped: starting - inst.number_of_records(),
        };
        info!(
            "culled '{name}' by time ({mode:?}): retaining {} of {starting}",
            report.retained
        );
        Ok(report)
    }

    /// Keep only records passing validation. A no-op when all records are
    /// already valid.
    pub fn cull_by_invalid(&mut self, name: Option<&str>) -> OdsResult<CullReport> {
        let name = self.resolve(name)?;
        let inst = self.get_mut(&name)?;
        inst.gen_info();
        let starting = inst.number_of_records();
        if inst.invalid_records.is_empty() {
            info!("culled '{name}' by invalid: retaining all");
            return Ok(CullReport {
                retained: starting,
                dropped: 0,
            });
        }
        let retained: Vec<OdsRecord> = inst
            .valid_records
            .iter()
            .map(|&i| inst.entries[i].clone())
            .collect();
        inst.replace_entries(retained);
        let report = CullReport {
            retained: inst.number_of_records(),
            dropped: starting - inst.number_of_records(),
        };
        if report.retained == 0 {
            warn!("culled '{name}' by invalid: retaining no records");
        } else {
            info!(
                "culled '{name}' by invalid: retaining {} of {starting}",
                report.retained
            );
        }
        Ok(report)
    }

    /// Remove duplicates via the canonical-sort-collapse primitive, leaving
    /// the store in canonical order.
    pub fn cull_by_duplicate(&mut self, name: Option<&str>) -> OdsResult<CullReport> {
        let name = self.resolve(name)?;
        let inst = self.get_mut(&name)?;
        inst.convert_time_to_str();
        let starting = inst.number_of_records();
        let deduped = check::dedup_entries(&inst.entries, &inst.standard);
        inst.replace_entries(deduped);
        let report = CullReport {
            retained: inst.number_of_records(),
            dropped: starting - inst.number_of_records(),
        };
        if report.dropped == 0 {
            info!("culled '{name}' for duplicates: retaining all");
        } else {
            info!(
                "culled '{name}' for duplicates: retaining {} of {starting}",
                report.retained
            );
        }
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Defaults

    pub fn defaults(&self) -> &OdsRecord {
        &self.defaults
    }

    /// Set the engine-level defaults applied during record construction.
    pub fn set_defaults(&mut self, source: DefaultsSource) -> OdsResult<()> {
        match source {
            DefaultsSource::Literal(map) => {
                self.defaults = map;
            }
            DefaultsSource::FromStore => {
                let inst = self.get(&self.working_instance)?;
                let mut defaults = OdsRecord::new();
                for (field, observed) in &inst.input_sets {
                    if observed.len() != 1 {
                        continue;
                    }
                    let Some(value) = observed.iter().next() else {
                        continue;
                    };
                    if let Some(ty) = inst.standard.field_type(field) {
                        if let Some(parsed) = ty.parse(value) {
                            defaults.insert(field.clone(), parsed);
                        }
                    }
                }
                self.defaults = defaults;
            }
            DefaultsSource::File(path, key) => {
                let data = tools::read_json_file(&path)?;
                let data = match key {
                    Some(key) => data
                        .get(&key)
                        .cloned()
                        .ok_or_else(|| {
                            OdsError::format(format!(
                                "defaults file {} has no key '{key}'",
                                path.display()
                            ))
                        })?,
                    None => data,
                };
                let obj = data.as_object().ok_or_else(|| {
                    OdsError::format(format!("defaults in {} are not a mapping", path.display()))
                })?;
                self.defaults = crate::record::record_from_json(obj);
            }
        }
        for (key, value) in &self.defaults {
            info!("default {key:26} {}", value.string_form());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reconciliation

    /// Resolve time overlaps in a store. An unrecognized `side` is a no-op
    /// that returns its warning instead of mutating the store.
    pub fn update_by_continuity(
        &mut self,
        name: Option<&str>,
        offset_sec: i64,
        side: &str,
    ) -> OdsResult<Vec<String>> {
        let name = self.resolve(name)?;
        let adjust = match ContinuityAdjust::from_str(side) {
            Ok(adjust) => adjust,
            Err(err) => {
                let message = err.to_string();
                warn!("{message}");
                return Ok(vec![message]);
            }
        };
        let inst = self.get_mut(&name)?;
        inst.convert_time_to_str();
        let report = check::resolve_continuity(inst, offset_sec, adjust);
        for warning in &report.warnings {
            warn!("continuity on '{name}': {warning}");
        }
        info!(
            "continuity on '{name}': adjusted {} boundaries",
            report.adjusted
        );
        inst.replace_entries(report.entries);
        Ok(report.warnings)
    }

    /// Restrict each record's window to when its source is above the
    /// elevation limit, dropping records never above it.
    ///
    /// Record-level problems (missing coordinates, bad times) skip that
    /// record with a warning; a collaborator failure aborts the batch
    /// before any mutation, reporting which records were not processed.
    pub fn update_by_elevation(
        &mut self,
        name: Option<&str>,
        el_lim_deg: f64,
        dt_sec: i64,
        model: &dyn ElevationModel,
    ) -> OdsResult<ElevationReport> {
        let name = self.resolve(name)?;
        self.get_mut(&name)?.convert_time_to_str();
        let start_field = self.get(&name)?.standard.start().to_string();
        let stop_field = self.get(&name)?.standard.stop().to_string();

        let mut updated = Vec::new();
        let mut report = ElevationReport {
            kept: 0,
            dropped: 0,
            skipped: Vec::new(),
        };
        let inst = self.get(&name)?;
        for (i, rec) in inst.entries.iter().enumerate() {
            let window =
                check::observation_window(rec, el_lim_deg, dt_sec, &inst.standard, model);
            match window {
                Ok(ObservationWindow::Window { first, last }) => {
                    let mut rec = rec.clone();
                    rec.insert(start_field.clone(), Value::Str(tools::format_time(first)));
                    rec.insert(stop_field.clone(), Value::Str(tools::format_time(last)));
                    updated.push(rec);
                    report.kept += 1;
                }
                Ok(ObservationWindow::NeverAbove) | Ok(ObservationWindow::Empty) => {
                    report.dropped += 1;
                }
                Err(OdsError::Collaborator(message)) => {
                    return Err(OdsError::collaborator(format!(
                        "{message}; records {i}..{} not processed",
                        inst.number_of_records()
                    )));
                }
                Err(err) => {
                    warn!("elevation check skipped record {i}: {err}");
                    report.skipped.push((i, err.to_string()));
                    updated.push(rec.clone());
                }
            }
        }
        self.get_mut(&name)?.replace_entries(updated);
        info!(
            "elevation update on '{name}': kept {}, dropped {}, skipped {}",
            report.kept,
            report.dropped,
            report.skipped.len()
        );
        Ok(report)
    }

    /// Overwrite every record's start/stop window from a parallel list of
    /// spans. A length mismatch is a no-op with a warning.
    pub fn update_ods_times(
        &mut self,
        name: Option<&str>,
        spans: &[(DateTime<Utc>, DateTime<Utc>)],
    ) -> OdsResult<bool> {
        let name = self.resolve(name)?;
        let inst = self.get_mut(&name)?;
        if spans.len() != inst.number_of_records() {
            warn!(
                "times list has {} entries, '{name}' has {} records; not updating",
                spans.len(),
                inst.number_of_records()
            );
            return Ok(false);
        }
        let start_field = inst.standard.start().to_string();
        let stop_field = inst.standard.stop().to_string();
        for (rec, (start, stop)) in inst.entries.iter_mut().zip(spans) {
            rec.insert(start_field.clone(), Value::Str(tools::format_time(*start)));
            rec.insert(stop_field.clone(), Value::Str(tools::format_time(*stop)));
        }
        inst.gen_info();
        Ok(true)
    }

    /// Generate consecutive windows from a start time and per-record
    /// lengths, then apply them. A single length broadcasts to every
    /// record; any other mismatch is a no-op with a warning.
    pub fn generate_ods_times(
        &mut self,
        name: Option<&str>,
        start: DateTime<Utc>,
        obs_len_sec: &[f64],
        gap_sec: f64,
    ) -> OdsResult<bool> {
        let name = self.resolve(name)?;
        let count = self.get(&name)?.number_of_records();
        let lengths: Vec<f64> = if obs_len_sec.len() == 1 {
            vec![obs_len_sec[0]; count]
        } else if obs_len_sec.len() == count {
            obs_len_sec.to_vec()
        } else {
            warn!(
                "obs_len_sec has {} entries, '{name}' has {count} records; not updating",
                obs_len_sec.len()
            );
            return Ok(false);
        };
        let spans = tools::generate_observation_times(start, &lengths, gap_sec);
        self.update_ods_times(Some(&name), &spans)
    }

    // ------------------------------------------------------------------
    // Reports and output

    /// Validity summary for a store, logged in the usual register.
    pub fn instance_report(&self, name: Option<&str>) -> OdsResult<InstanceReport> {
        let name = self.resolve(name)?;
        let inst = self.get(&name)?;
        let report = InstanceReport {
            name: name.clone(),
            provenance: inst.provenance.to_string(),
            records: inst.number_of_records(),
            invalid: inst.invalid_records.clone(),
        };
        if report.records > 0 && report.invalid.len() == report.records {
            error!("all {} records in '{name}' are invalid", report.records);
        } else if !report.invalid.is_empty() {
            warn!(
                "{} / {} records in '{name}' are not valid",
                report.invalid.len(),
                report.records
            );
            for (ctr, reasons) in &report.invalid {
                warn!("entry {ctr}: {}", reasons.join(", "));
            }
        } else {
            info!("{} records in '{name}' are all valid", report.records);
        }
        Ok(report)
    }

    /// Coverage over an explicit span.
    pub fn coverage(
        &self,
        name: Option<&str>,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
        step_sec: i64,
    ) -> OdsResult<CoverageReport> {
        let name = self.resolve(name)?;
        check::coverage(self.get(&name)?, start, stop, step_sec)
    }

    /// Coverage over the store's own earliest-start to latest-stop span.
    pub fn coverage_report(&self, name: Option<&str>, step_sec: i64) -> OdsResult<CoverageReport> {
        let name = self.resolve(name)?;
        let inst = self.get(&name)?;
        check::coverage(inst, inst.earliest, inst.latest, step_sec)
    }

    /// Write a store in the persisted JSON format.
    pub fn write_ods(&mut self, name: Option<&str>, path: impl AsRef<Path>) -> OdsResult<()> {
        let name = self.resolve(name)?;
        let inst = self.get_mut(&name)?;
        if inst.number_of_records() == 0 {
            warn!("writing an empty ODS file for '{name}'");
        }
        inst.write(path)
    }

    /// Write a store as delimited text, all schema fields.
    pub fn write_file(
        &mut self,
        name: Option<&str>,
        path: impl AsRef<Path>,
        sep: char,
    ) -> OdsResult<()> {
        let name = self.resolve(name)?;
        let inst = self.get_mut(&name)?;
        if inst.number_of_records() == 0 {
            warn!("writing an empty data file for '{name}'");
        }
        inst.export_to_file(path, None, sep)
    }

    // ------------------------------------------------------------------
    // Online monitor

    /// One reconciliation cycle against a posted remote ODS: fetch into a
    /// scratch store, cull to active records, merge into the local log with
    /// dedup, rewrite the log. Re-running with unchanged remote data does
    /// not grow the log.
    pub fn online_monitor_cycle(
        &mut self,
        cfg: &MonitorConfig,
        fetcher: &dyn RemoteFetch,
    ) -> OdsResult<MonitorReport> {
        let version = self.version.clone();
        self.reset_instance(FROM_WEB, &version)?;
        let payload = fetcher.fetch_json(&cfg.url)?;
        let fetched = self
            .get_mut(FROM_WEB)?
            .read_value(&payload, Provenance::Url(cfg.url.clone()))?;
        let cull = self.cull_by_time(Some(FROM_WEB), Utc::now(), CullMode::Inactive)?;

        self.reset_instance(FROM_LOG, &version)?;
        if cfg.logfile.exists() {
            self.add_from_file(Some(FROM_LOG), &cfg.logfile, Some(cfg.sep), None, None, true)?;
        }
        self.merge(FROM_WEB, FROM_LOG, true)?;
        self.write_file(Some(FROM_LOG), &cfg.logfile, cfg.sep)?;

        let report = MonitorReport {
            fetched,
            active: cull.retained,
            log_records: self.get(FROM_LOG)?.number_of_records(),
        };
        info!(
            "monitor cycle: fetched {}, active {}, log now {}",
            report.fetched, report.active, report.log_records
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_instance_duplicate_name_fails() {
        let mut ods = Ods::new("latest").unwrap();
        ods.new_instance("extra", "latest").unwrap();
        assert!(matches!(
            ods.new_instance("extra", "latest"),
            Err(OdsError::DuplicateInstance(_))
        ));
    }

    #[test]
    fn test_unknown_instance_is_name_error() {
        let mut ods = Ods::new("latest").unwrap();
        assert!(matches!(
            ods.cull_by_invalid(Some("nope")),
            Err(OdsError::UnknownInstance(_))
        ));
        assert!(matches!(
            ods.set_working_instance("nope"),
            Err(OdsError::UnknownInstance(_))
        ));
    }

    #[test]
    fn test_cull_mode_parse() {
        assert_eq!(CullMode::from_str("stale").unwrap(), CullMode::Stale);
        assert_eq!(CullMode::from_str("inactive").unwrap(), CullMode::Inactive);
        assert!(CullMode::from_str("fresh").is_err());
    }

    #[test]
    fn test_bad_continuity_side_is_noop_with_warning() {
        let mut ods = Ods::new("latest").unwrap();
        let warnings = ods.update_by_continuity(None, 1, "sideways").unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("sideways"));
    }
}
