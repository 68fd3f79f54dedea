//! Functional tests for the reconciliation algorithms: canonical sorting,
//! deduplication, continuity resolution, coverage, and observation windows.

use chrono::{DateTime, Utc};

use odsutils::check::{
    self, ContinuityAdjust, ObservationWindow,
};
use odsutils::instance::OdsInstance;
use odsutils::record::{OdsRecord, Value};
use odsutils::standard::Standard;
use odsutils::tools;
use odsutils::visibility::{ElevationModel, EquatorialCoord, SiteLocation};
use odsutils::OdsResult;

fn base_record(src: &str, start: &str, stop: &str) -> OdsRecord {
    let mut rec = OdsRecord::new();
    rec.insert("site_id".into(), Value::Str("hcro".into()));
    rec.insert("site_lat_deg".into(), Value::Float(40.8172));
    rec.insert("site_lon_deg".into(), Value::Float(-121.47));
    rec.insert("site_el_m".into(), Value::Float(986.0));
    rec.insert("src_id".into(), Value::Str(src.into()));
    rec.insert("src_is_pulsar_bool".into(), Value::Bool(false));
    rec.insert("corr_integ_time_sec".into(), Value::Float(1.0));
    rec.insert("src_ra_j2000_deg".into(), Value::Float(180.0));
    rec.insert("src_dec_j2000_deg".into(), Value::Float(45.0));
    rec.insert("src_radius".into(), Value::Float(1.0));
    rec.insert("src_start_utc".into(), Value::Str(start.into()));
    rec.insert("src_end_utc".into(), Value::Str(stop.into()));
    rec.insert("slew_sec".into(), Value::Float(10.0));
    rec.insert("trk_rate_dec_deg_per_sec".into(), Value::Float(0.0));
    rec.insert("trk_rate_ra_deg_per_sec".into(), Value::Float(0.0));
    rec.insert("freq_lower_hz".into(), Value::Float(1.0e9));
    rec.insert("freq_upper_hz".into(), Value::Float(2.0e9));
    rec.insert("notes".into(), Value::Str(String::new()));
    rec
}

fn instance_with(records: Vec<OdsRecord>) -> OdsInstance {
    let mut inst = OdsInstance::new("test", "latest").unwrap();
    let defaults = OdsRecord::new();
    for rec in &records {
        inst.new_record(rec, &defaults);
    }
    inst.gen_info();
    inst
}

fn t(s: &str) -> DateTime<Utc> {
    tools::parse_time(s).unwrap()
}

#[test]
fn test_sort_entries_orders_by_string_tuple() {
    let entries = vec![
        base_record("B", "2025-01-02T00:00:00", "2025-01-02T01:00:00"),
        base_record("A", "2025-01-01T00:00:00", "2025-01-01T01:00:00"),
        base_record("C", "2025-01-01T00:00:00", "2025-01-01T02:00:00"),
    ];
    let standard = Standard::new("latest").unwrap();
    let sorted = check::sort_entries(&entries, standard.sort_order_time(), false);
    let sources: Vec<_> = sorted
        .iter()
        .map(|r| r["src_id"].string_form())
        .collect();
    assert_eq!(sources, ["A", "C", "B"]);
}

#[test]
fn test_sort_entries_preserves_equal_keys_without_collapse() {
    // Eleven records with identical sort keys: the tie-breaker must keep
    // all of them, in original order.
    let entries: Vec<OdsRecord> = (0..11)
        .map(|i| {
            let mut rec = base_record("A", "2025-01-01T00:00:00", "2025-01-01T01:00:00");
            rec.insert("notes".into(), Value::Str(format!("n{i}")));
            rec
        })
        .collect();
    let standard = Standard::new("latest").unwrap();
    let sorted = check::sort_entries(&entries, standard.sort_order_time(), false);
    assert_eq!(sorted.len(), 11);
    let notes: Vec<_> = sorted.iter().map(|r| r["notes"].string_form()).collect();
    let expected: Vec<_> = (0..11).map(|i| format!("n{i}")).collect();
    assert_eq!(notes, expected);
}

#[test]
fn test_dedup_collapses_equal_sort_keys() {
    let entries = vec![
        base_record("A", "2025-01-01T00:00:00", "2025-01-01T01:00:00"),
        base_record("B", "2025-01-01T02:00:00", "2025-01-01T03:00:00"),
        base_record("A", "2025-01-01T00:00:00", "2025-01-01T01:00:00"),
    ];
    let standard = Standard::new("latest").unwrap();
    let deduped = check::dedup_entries(&entries, &standard);
    assert_eq!(deduped.len(), 2);
    assert_eq!(deduped[0]["src_id"].string_form(), "A");
    assert_eq!(deduped[1]["src_id"].string_form(), "B");

    // Idempotent: a second pass changes nothing.
    let again = check::dedup_entries(&deduped, &standard);
    assert_eq!(again, deduped);
}

#[test]
fn test_records_equal_compares_string_forms() {
    let standard = Standard::new("latest").unwrap();
    let a = base_record("A", "2025-01-01T00:00:00", "2025-01-01T01:00:00");
    let b = a.clone();
    assert!(check::records_equal(&a, &b, &standard));

    let mut c = a.clone();
    c.insert("notes".into(), Value::Str("changed".into()));
    assert!(!check::records_equal(&a, &c, &standard));

    // A record missing a schema field is not equal to anything.
    let mut d = a.clone();
    d.remove("slew_sec");
    assert!(!check::records_equal(&a, &d, &standard));
    assert!(!check::records_equal(&d, &d, &standard));
}

#[test]
fn test_is_duplicate_against_store() {
    let inst = instance_with(vec![base_record(
        "A",
        "2025-01-01T00:00:00",
        "2025-01-01T01:00:00",
    )]);
    let same = inst.construct_record(
        &base_record("A", "2025-01-01T00:00:00", "2025-01-01T01:00:00"),
        &OdsRecord::new(),
    );
    assert!(check::is_duplicate(&inst, &same));
    let other = inst.construct_record(
        &base_record("B", "2025-01-01T00:00:00", "2025-01-01T01:00:00"),
        &OdsRecord::new(),
    );
    assert!(!check::is_duplicate(&inst, &other));
}

#[test]
fn test_continuity_adjust_stop_pulls_first_record_back() {
    let inst = instance_with(vec![
        base_record("A", "2025-01-01T10:00:00", "2025-01-01T11:00:00"),
        base_record("B", "2025-01-01T10:30:00", "2025-01-01T11:30:00"),
    ]);
    let report = check::resolve_continuity(&inst, 60, ContinuityAdjust::Stop);
    assert_eq!(report.adjusted, 1);
    assert!(report.warnings.is_empty());
    assert_eq!(
        report.entries[0]["src_end_utc"].string_form(),
        "2025-01-01T10:29:00"
    );
    assert_eq!(
        report.entries[1]["src_start_utc"].string_form(),
        "2025-01-01T10:30:00"
    );
}

#[test]
fn test_continuity_adjust_start_pushes_second_record_out() {
    let inst = instance_with(vec![
        base_record("A", "2025-01-01T10:00:00", "2025-01-01T11:00:00"),
        base_record("B", "2025-01-01T10:30:00", "2025-01-01T11:30:00"),
    ]);
    let report = check::resolve_continuity(&inst, 60, ContinuityAdjust::Start);
    assert_eq!(report.adjusted, 1);
    assert!(report.warnings.is_empty());
    assert_eq!(
        report.entries[1]["src_start_utc"].string_form(),
        "2025-01-01T11:01:00"
    );
}

#[test]
fn test_continuity_warns_on_inverted_window() {
    // The second record ends before the adjusted start can fit.
    let inst = instance_with(vec![
        base_record("A", "2025-01-01T10:00:00", "2025-01-01T11:00:00"),
        base_record("B", "2025-01-01T10:30:00", "2025-01-01T10:45:00"),
    ]);
    let report = check::resolve_continuity(&inst, 60, ContinuityAdjust::Start);
    assert_eq!(report.adjusted, 1);
    assert!(!report.warnings.is_empty());
    assert!(report.warnings[0].contains("after its stop"));
}

#[test]
fn test_continuity_no_overlap_is_noop() {
    let inst = instance_with(vec![
        base_record("A", "2025-01-01T10:00:00", "2025-01-01T11:00:00"),
        base_record("B", "2025-01-01T11:00:00", "2025-01-01T12:00:00"),
    ]);
    let report = check::resolve_continuity(&inst, 60, ContinuityAdjust::Stop);
    assert_eq!(report.adjusted, 0);
    assert!(report.warnings.is_empty());
    assert_eq!(
        report.entries[0]["src_end_utc"].string_form(),
        "2025-01-01T11:00:00"
    );
}

#[test]
fn test_coverage_counts_only_ticks_inside_bounds() {
    let inst = instance_with(vec![base_record(
        "A",
        "2025-01-01T00:00:00",
        "2025-01-01T01:00:00",
    )]);
    let report = check::coverage(
        &inst,
        t("2025-01-01T00:00:00"),
        t("2025-01-01T02:00:00"),
        1800,
    )
    .unwrap();
    assert_eq!(report.flags, [1, 1, 1, 0, 0]);
    assert!((report.fraction() - 0.6).abs() < 1e-12);
}

#[test]
fn test_coverage_fraction_extremes() {
    let inst = instance_with(vec![base_record(
        "A",
        "2025-01-01T00:00:00",
        "2025-01-01T06:00:00",
    )]);
    // Span entirely outside the record's interval.
    let outside = check::coverage(
        &inst,
        t("2025-01-02T00:00:00"),
        t("2025-01-02T01:00:00"),
        600,
    )
    .unwrap();
    assert_eq!(outside.fraction(), 0.0);
    // Span fully inside it.
    let inside = check::coverage(
        &inst,
        t("2025-01-01T01:00:00"),
        t("2025-01-01T02:00:00"),
        600,
    )
    .unwrap();
    assert_eq!(inside.fraction(), 1.0);
}

#[test]
fn test_coverage_empty_span_and_bad_step() {
    let inst = instance_with(vec![]);
    let report = check::coverage(
        &inst,
        t("2025-01-01T01:00:00"),
        t("2025-01-01T00:00:00"),
        60,
    )
    .unwrap();
    assert!(report.times.is_empty());
    assert_eq!(report.fraction(), 0.0);

    assert!(check::coverage(&inst, t("2025-01-01T00:00:00"), t("2025-01-01T01:00:00"), 0).is_err());
}

/// Deterministic model: a fixed elevation before `rise`, another after.
struct StepElevation {
    rise: DateTime<Utc>,
    below: f64,
    above: f64,
}

impl ElevationModel for StepElevation {
    fn elevation_deg(
        &self,
        _site: &SiteLocation,
        _target: &EquatorialCoord,
        at: DateTime<Utc>,
    ) -> OdsResult<f64> {
        Ok(if at >= self.rise { self.above } else { self.below })
    }
}

#[test]
fn test_observation_window_trims_to_above_limit() {
    let standard = Standard::new("latest").unwrap();
    let rec = base_record("A", "2025-01-01T00:00:00", "2025-01-01T02:00:00");
    let model = StepElevation {
        rise: t("2025-01-01T01:00:00"),
        below: -5.0,
        above: 50.0,
    };
    let window = check::observation_window(&rec, 10.0, 600, &standard, &model).unwrap();
    assert_eq!(
        window,
        ObservationWindow::Window {
            first: t("2025-01-01T01:00:00"),
            last: t("2025-01-01T01:50:00"),
        }
    );
}

#[test]
fn test_observation_window_never_above() {
    let standard = Standard::new("latest").unwrap();
    let rec = base_record("A", "2025-01-01T00:00:00", "2025-01-01T01:00:00");
    let model = StepElevation {
        rise: t("2025-01-02T00:00:00"),
        below: -5.0,
        above: 50.0,
    };
    let window = check::observation_window(&rec, 10.0, 600, &standard, &model).unwrap();
    assert_eq!(window, ObservationWindow::NeverAbove);
}

#[test]
fn test_observation_window_empty_interval() {
    let standard = Standard::new("latest").unwrap();
    let rec = base_record("A", "2025-01-01T01:00:00", "2025-01-01T01:00:00");
    let model = StepElevation {
        rise: t("2025-01-01T00:00:00"),
        below: -5.0,
        above: 50.0,
    };
    let window = check::observation_window(&rec, 10.0, 600, &standard, &model).unwrap();
    assert_eq!(window, ObservationWindow::Empty);
}

#[test]
fn test_observation_window_missing_coordinates_is_parameter_error() {
    let standard = Standard::new("latest").unwrap();
    let mut rec = base_record("A", "2025-01-01T00:00:00", "2025-01-01T01:00:00");
    rec.insert("src_ra_j2000_deg".into(), Value::Null);
    let model = StepElevation {
        rise: t("2025-01-01T00:00:00"),
        below: -5.0,
        above: 50.0,
    };
    assert!(check::observation_window(&rec, 10.0, 600, &standard, &model).is_err());
}
