//! Reconciliation algorithms over a record store: duplicate detection,
//! canonical sorting, continuity (overlap) resolution, coverage fraction,
//! and the observation-window contract.
//!
//! Everything here is stateless; algorithms take the store (or its record
//! sequence) and return new sequences or reports, never mutating in place.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{OdsError, OdsResult};
use crate::instance::OdsInstance;
use crate::record::{OdsRecord, Value};
use crate::standard::Standard;
use crate::tools;
use crate::visibility::{ElevationModel, EquatorialCoord, SiteLocation};

/// Which boundary `resolve_continuity` shifts when two records overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuityAdjust {
    /// Push the next record's start to the current stop plus the offset.
    Start,
    /// Pull the current record's stop to the next start minus the offset.
    Stop,
}

impl FromStr for ContinuityAdjust {
    type Err = OdsError;

    fn from_str(s: &str) -> OdsResult<Self> {
        match s {
            "start" => Ok(ContinuityAdjust::Start),
            "stop" => Ok(ContinuityAdjust::Stop),
            other => Err(OdsError::parameter(format!(
                "invalid continuity adjust side '{other}' (expected 'start' or 'stop')"
            ))),
        }
    }
}

/// Adjusted record sequence plus warnings for overlaps the single pass
/// could not fully resolve.
#[derive(Debug, Clone)]
pub struct ContinuityReport {
    pub entries: Vec<OdsRecord>,
    pub warnings: Vec<String>,
    pub adjusted: usize,
}

/// Tick-by-tick coverage over a time span.
#[derive(Debug, Clone)]
pub struct CoverageReport {
    pub times: Vec<DateTime<Utc>>,
    /// 1 where at least one record's window contains the tick, else 0.
    pub flags: Vec<u8>,
}

impl CoverageReport {
    /// Fraction of ticks covered; 0 for an empty span.
    pub fn fraction(&self) -> f64 {
        if self.flags.is_empty() {
            return 0.0;
        }
        let ones: usize = self.flags.iter().map(|f| *f as usize).sum();
        ones as f64 / self.flags.len() as f64
    }
}

/// Sub-window of a record's span during which the source is above the
/// elevation limit.
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationWindow {
    Window {
        first: DateTime<Utc>,
        last: DateTime<Utc>,
    },
    /// No sample exceeded the elevation limit.
    NeverAbove,
    /// The record's interval contains zero samples (start >= stop).
    Empty,
}

/// Two records are equal iff the string form of every schema field matches.
/// A record missing a schema field is not equal to anything; equality never
/// reaches across standards.
pub fn records_equal(a: &OdsRecord, b: &OdsRecord, standard: &Standard) -> bool {
    for (field, _) in standard.fields() {
        match (a.get(field), b.get(field)) {
            (Some(va), Some(vb)) => {
                if va.string_form() != vb.string_form() {
                    return false;
                }
            }
            _ => return false,
        }
    }
    true
}

/// Whether any existing record in the store equals the candidate.
pub fn is_duplicate(instance: &OdsInstance, candidate: &OdsRecord) -> bool {
    instance
        .entries
        .iter()
        .any(|entry| records_equal(entry, candidate, &instance.standard))
}

/// Canonically sort records by the string-form tuple of `terms`, with the
/// original index as a final tie-breaker unless `collapse` is set.
///
/// With `collapse = true` records whose full sort-key tuples coincide are
/// indistinguishable and only one survives; this is the deduplication
/// primitive. String comparison is lexicographic, so time fields must be
/// ISO-8601 string forms to sort chronologically.
pub fn sort_entries(entries: &[OdsRecord], terms: &[&str], collapse: bool) -> Vec<OdsRecord> {
    let mut keyed: BTreeMap<(Vec<String>, usize), usize> = BTreeMap::new();
    for (i, rec) in entries.iter().enumerate() {
        let tuple: Vec<String> = terms
            .iter()
            .map(|key| rec.get(*key).map(|v| v.string_form()).unwrap_or_default())
            .collect();
        let tie = if collapse { 0 } else { i };
        keyed.insert((tuple, tie), i);
    }
    keyed.into_values().map(|i| entries[i].clone()).collect()
}

/// Deduplicate by canonical sort key: sort with `collapse` and accept the
/// reduced sequence.
pub fn dedup_entries(entries: &[OdsRecord], standard: &Standard) -> Vec<OdsRecord> {
    sort_entries(entries, standard.sort_order_time(), true)
}

/// Resolve time overlaps between adjacent records in canonical
/// (start, stop) order, single pass, best effort.
///
/// Whenever the next record's start precedes the current record's stop, the
/// boundary named by `adjust` is shifted by `offset_sec` and written back as
/// an ISO string. If the shifted boundary still overlaps, or the adjusted
/// window inverts, a warning is surfaced; there is no re-resolution loop.
pub fn resolve_continuity(
    instance: &OdsInstance,
    offset_sec: i64,
    adjust: ContinuityAdjust,
) -> ContinuityReport {
    let standard = &instance.standard;
    let mut entries = sort_entries(
        &instance.entries,
        &[standard.start(), standard.stop()],
        false,
    );
    let mut warnings = Vec::new();
    let mut adjusted = 0;
    let offset = Duration::seconds(offset_sec);

    for i in 0..entries.len().saturating_sub(1) {
        let (Some(mut this_stop), Some(mut next_start)) = (
            instance.stop_time_of(&entries[i]),
            instance.start_time_of(&entries[i + 1]),
        ) else {
            continue; // unparseable times are validation's problem
        };
        if next_start >= this_stop {
            continue;
        }
        match adjust {
            ContinuityAdjust::Start => {
                next_start = this_stop + offset;
                entries[i + 1].insert(
                    standard.start().to_string(),
                    Value::Str(tools::format_time(next_start)),
                );
                if let Some(stop) = instance.stop_time_of(&entries[i + 1]) {
                    if next_start > stop {
                        warnings.push(format!(
                            "adjusted start {} is after its stop {}",
                            tools::format_time(next_start),
                            tools::format_time(stop)
                        ));
                    }
                }
            }
            ContinuityAdjust::Stop => {
                this_stop = next_start - offset;
                entries[i].insert(
                    standard.stop().to_string(),
                    Value::Str(tools::format_time(this_stop)),
                );
                if let Some(start) = instance.start_time_of(&entries[i]) {
                    if this_stop < start {
                        warnings.push(format!(
                            "adjusted stop {} is before its start {}",
                            tools::format_time(this_stop),
                            tools::format_time(start)
                        ));
                    }
                }
            }
        }
        adjusted += 1;
        if next_start < this_stop {
            warnings.push(format!(
                "records {i} and {} still overlap after adjustment",
                i + 1
            ));
        }
    }

    ContinuityReport {
        entries,
        warnings,
        adjusted,
    }
}

/// Discretize `[start_bound, stop_bound]` into `step_sec` ticks and flag
/// each tick covered iff at least one record's [start, stop] contains it.
///
/// Ticks never fall outside the bounds, and times outside them never count
/// as covered. A moving lower index over the stop-then-start sorted records
/// skips records already passed, keeping the scan amortized linear in ticks
/// plus records.
pub fn coverage(
    instance: &OdsInstance,
    start_bound: DateTime<Utc>,
    stop_bound: DateTime<Utc>,
    step_sec: i64,
) -> OdsResult<CoverageReport> {
    if step_sec <= 0 {
        return Err(OdsError::parameter("coverage step must be positive"));
    }
    let standard = &instance.standard;
    let sorted = sort_entries(
        &instance.entries,
        &[standard.stop(), standard.start()],
        false,
    );
    // Records without parseable windows cannot cover anything.
    let spans: Vec<(DateTime<Utc>, DateTime<Utc>)> = sorted
        .iter()
        .filter_map(|rec| {
            match (instance.start_time_of(rec), instance.stop_time_of(rec)) {
                (Some(start), Some(stop)) => Some((start, stop)),
                _ => None,
            }
        })
        .collect();

    let step = Duration::seconds(step_sec);
    let mut times = Vec::new();
    let mut flags = Vec::new();
    let mut low = 0;
    let mut tick = start_bound;
    while tick <= stop_bound {
        while low < spans.len() && spans[low].1 < tick {
            low += 1;
        }
        let covered = spans[low..]
            .iter()
            .any(|(start, stop)| *start <= tick && tick <= *stop);
        times.push(tick);
        flags.push(u8::from(covered));
        tick += step;
    }

    Ok(CoverageReport { times, flags })
}

/// Sample a record's [start, stop) interval at `dt_sec` and return the
/// first and last sample times above the elevation limit.
///
/// The elevation numbers come from the supplied collaborator; this function
/// only owns the sampling policy and window semantics. A collaborator
/// failure is a recoverable failure of this one record's computation.
pub fn observation_window(
    rec: &OdsRecord,
    el_lim_deg: f64,
    dt_sec: i64,
    standard: &Standard,
    model: &dyn ElevationModel,
) -> OdsResult<ObservationWindow> {
    if dt_sec <= 0 {
        return Err(OdsError::parameter("observation step must be positive"));
    }
    let start = time_field(rec, standard.start())?;
    let stop = time_field(rec, standard.stop())?;

    let site = SiteLocation {
        lat_deg: float_field(rec, standard.lat())?,
        lon_deg: float_field(rec, standard.lon())?,
        height_m: float_field(rec, standard.ele())?,
    };
    let target = EquatorialCoord {
        ra_deg: float_field(rec, standard.ra())?,
        dec_deg: float_field(rec, standard.dec())?,
    };

    let step = Duration::seconds(dt_sec);
    let mut above: Vec<DateTime<Utc>> = Vec::new();
    let mut sampled = false;
    let mut t = start;
    while t < stop {
        sampled = true;
        let elevation = model.elevation_deg(&site, &target, t)?;
        if elevation > el_lim_deg {
            above.push(t);
        }
        t += step;
    }

    if !sampled {
        return Ok(ObservationWindow::Empty);
    }
    match (above.first(), above.last()) {
        (Some(first), Some(last)) => Ok(ObservationWindow::Window {
            first: *first,
            last: *last,
        }),
        _ => Ok(ObservationWindow::NeverAbove),
    }
}

fn time_field(rec: &OdsRecord, field: &str) -> OdsResult<DateTime<Utc>> {
    rec.get(field)
        .and_then(Value::as_time)
        .ok_or_else(|| OdsError::parameter(format!("record has no parseable '{field}'")))
}

fn float_field(rec: &OdsRecord, field: &str) -> OdsResult<f64> {
    rec.get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| OdsError::parameter(format!("record has no numeric '{field}'")))
}
