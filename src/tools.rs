//! Boundary I/O helpers: JSON files, delimited data files, remote JSON,
//! and time parse/format utilities.
//!
//! Everything here is thin and synchronous. The record-set engine itself
//! never touches the filesystem or the network except through this module.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{OdsError, OdsResult};
use crate::record::OdsRecord;

/// ISO-8601 to seconds precision, no zone suffix. Sorts correctly as a
/// plain string.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse an absolute timestamp. Accepts ISO-8601 with or without seconds,
/// with fractional seconds, or with an explicit offset/Z suffix.
pub fn parse_time(s: &str) -> OdsResult<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in [TIME_FORMAT, "%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(OdsError::format(format!("'{s}' is not a valid time")))
}

/// Format a timestamp in the canonical string form.
pub fn format_time(t: DateTime<Utc>) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// Read a JSON file into a value. A missing extension defaults to `.json`,
/// matching the original file-naming convention.
pub fn read_json_file(path: impl AsRef<Path>) -> OdsResult<serde_json::Value> {
    let mut path = path.as_ref().to_path_buf();
    if path.extension().is_none() {
        path.set_extension("json");
    }
    let text = fs::read_to_string(&path).map_err(|e| OdsError::io(&path, e))?;
    Ok(serde_json::from_str(&text)?)
}

/// Write a JSON value to a file, pretty-printed.
pub fn write_json_file(path: impl AsRef<Path>, payload: &serde_json::Value) -> OdsResult<()> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(payload)?;
    fs::write(path, text).map_err(|e| OdsError::io(path, e))
}

/// Detect the column separator from a header line: comma, tab, space, or
/// semicolon, in that preference order.
pub fn detect_separator(header: &str) -> Option<char> {
    [',', '\t', ' ', ';'].into_iter().find(|s| header.contains(*s))
}

/// Read a delimited data file with a header row into one string map per row.
///
/// * `sep`: column separator; `None` auto-detects from the header line.
/// * `replace`: substitution applied to header names before interpretation
///   (e.g. stripping a leading comment marker).
/// * `header_map`: renames applied to header names after substitution.
pub fn read_data_file(
    path: impl AsRef<Path>,
    sep: Option<char>,
    replace: Option<(&str, &str)>,
    header_map: Option<&HashMap<String, String>>,
) -> OdsResult<Vec<HashMap<String, String>>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| OdsError::io(path, e))?;
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header_line = lines
        .next()
        .ok_or_else(|| OdsError::format(format!("{} has no header row", path.display())))?;
    let sep = match sep {
        Some(s) => s,
        None => detect_separator(header_line).ok_or_else(|| {
            OdsError::format(format!("cannot detect separator in {}", path.display()))
        })?,
    };

    let mut columns: Vec<String> = split_row(header_line, sep);
    if let Some((from, to)) = replace {
        columns = columns.iter().map(|c| c.replace(from, to)).collect();
    }
    if let Some(map) = header_map {
        columns = columns
            .iter()
            .map(|c| map.get(c).cloned().unwrap_or_else(|| c.clone()))
            .collect();
    }

    let mut rows = Vec::new();
    for line in lines {
        let cells = split_row(line, sep);
        if cells.len() != columns.len() {
            return Err(OdsError::format(format!(
                "row has {} columns, header has {} in {}",
                cells.len(),
                columns.len(),
                path.display()
            )));
        }
        rows.push(columns.iter().cloned().zip(cells).collect());
    }
    Ok(rows)
}

fn split_row(line: &str, sep: char) -> Vec<String> {
    if sep == ' ' {
        // Runs of whitespace collapse to a single separator.
        line.split_whitespace().map(str::to_string).collect()
    } else {
        line.split(sep).map(|c| c.trim().to_string()).collect()
    }
}

/// Write records as delimited text: header row of `cols`, one row per
/// record, values in string form.
pub fn write_data_file(
    path: impl AsRef<Path>,
    entries: &[OdsRecord],
    cols: &[&str],
    sep: char,
) -> OdsResult<()> {
    let path = path.as_ref();
    let sep = sep.to_string();
    let mut out = cols.join(&sep);
    out.push('\n');
    for rec in entries {
        let row: Vec<String> = cols
            .iter()
            .map(|key| rec.get(*key).map(|v| v.string_form()).unwrap_or_default())
            .collect();
        out.push_str(&row.join(&sep));
        out.push('\n');
    }
    fs::write(path, out).map_err(|e| OdsError::io(path, e))
}

/// Remote JSON source. The HTTP implementation lives behind this trait so
/// the monitor loop can be exercised without a network.
pub trait RemoteFetch {
    fn fetch_json(&self, url: &str) -> OdsResult<serde_json::Value>;
}

/// Blocking HTTP fetcher for the persisted-collection format.
pub struct HttpFetch {
    client: reqwest::blocking::Client,
}

impl HttpFetch {
    pub fn new() -> OdsResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| OdsError::collaborator(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

impl RemoteFetch for HttpFetch {
    fn fetch_json(&self, url: &str) -> OdsResult<serde_json::Value> {
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| OdsError::collaborator(format!("GET {url}: {e}")))?;
        response
            .json()
            .map_err(|e| OdsError::collaborator(format!("decode {url}: {e}")))
    }
}

/// Generate consecutive start/stop spans: each observation lasts its entry
/// in `lengths_sec`, separated by `gap_sec`.
pub fn generate_observation_times(
    start: DateTime<Utc>,
    lengths_sec: &[f64],
    gap_sec: f64,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut times = Vec::with_capacity(lengths_sec.len());
    let mut current = start;
    for len in lengths_sec {
        let stop = current + Duration::milliseconds((len * 1e3) as i64);
        times.push((current, stop));
        current = stop + Duration::milliseconds((gap_sec * 1e3) as i64);
    }
    times
}

/// Append `.json` when the path lacks an extension.
pub fn json_path(path: impl AsRef<Path>) -> PathBuf {
    let mut path = path.as_ref().to_path_buf();
    if path.extension().is_none() {
        path.set_extension("json");
    }
    path
}
