//! Validator: ordered data-quality battery over the run's outputs.
//!
//! Every check is independent and read-only; the battery always runs to
//! the end and reports an issue count instead of aborting. WARN and FAIL
//! raise the count, INFO never does. Checks whose source table was
//! skipped this run pass vacuously.

use crate::aggregate::{AggregatedViews, EXPECTED_VIEWS};
use crate::canonical::{CanonicalTables, CrimeIncident};
use crate::config::PipelineConfig;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Info,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pass => "PASS",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
            Self::Info => "INFO",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub checks: Vec<CheckResult>,
    issues: u32,
}

impl ValidationReport {
    pub fn issues(&self) -> u32 {
        self.issues
    }

    fn record(&mut self, name: &'static str, status: CheckStatus, message: impl Into<String>) {
        let message = message.into();
        match status {
            CheckStatus::Pass | CheckStatus::Info => info!("[{status}] {name}: {message}"),
            CheckStatus::Warn => warn!("[{status}] {name}: {message}"),
            CheckStatus::Fail => error!("[{status}] {name}: {message}"),
        }
        if matches!(status, CheckStatus::Warn | CheckStatus::Fail) {
            self.issues += 1;
        }
        self.checks.push(CheckResult {
            name,
            status,
            message,
        });
    }

    fn skip(&mut self, name: &'static str, table: &str) {
        self.record(name, CheckStatus::Pass, format!("{table} table absent, skipped"));
    }
}

/// Run the full battery. Diagnostic only: the caller decides what a
/// non-zero issue count means.
pub fn validate(
    cfg: &PipelineConfig,
    tables: &CanonicalTables,
    views: &AggregatedViews,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_canonical_files(&mut report, tables);

    match &tables.crime {
        Some(crime) => {
            let rows = &crime.rows;
            check_crime_rows(&mut report, cfg, rows.len());
            check_crime_years(&mut report, cfg, rows);
            check_geo_outliers(&mut report, cfg, rows);
            check_null_rates(&mut report, cfg, rows);
            check_agency_distribution(&mut report, rows);
            check_crime_categories(&mut report, rows);
            check_yoy_volume(&mut report, cfg, rows);
            check_duplicates(&mut report, rows);
        }
        None => {
            for name in [
                "crime_rows",
                "crime_years",
                "geo_outliers",
                "null_rates",
                "agency_distribution",
                "crime_categories",
                "yoy_volume",
                "duplicates",
            ] {
                report.skip(name, "crime");
            }
        }
    }

    match &tables.arrests {
        Some(arrests) => {
            check_arrest_rows(&mut report, cfg, &arrests.rows);
            check_arrest_years(&mut report, &arrests.rows);
        }
        None => {
            report.skip("arrest_rows", "arrests");
            report.skip("arrest_years", "arrests");
        }
    }

    match &tables.calls {
        Some(calls) => {
            check_cfs_rows(&mut report, cfg, calls.rows.len());
            check_cfs_years(&mut report, cfg, &calls.rows);
            check_cfs_beats(&mut report, &calls.rows);
        }
        None => {
            report.skip("cfs_rows", "calls");
            report.skip("cfs_years", "calls");
            report.skip("cfs_beats", "calls");
        }
    }

    check_aggregated_files(&mut report, views);

    info!(
        "validation: {} checks, {} issues",
        report.checks.len(),
        report.issues
    );
    report
}

fn check_canonical_files(report: &mut ValidationReport, tables: &CanonicalTables) {
    let slots = [
        ("crime", tables.crime.as_ref().map(|t| &t.handle)),
        ("arrests", tables.arrests.as_ref().map(|t| &t.handle)),
        ("cfs", tables.calls.as_ref().map(|t| &t.handle)),
    ];
    for (label, handle) in slots {
        match handle {
            Some(h) if h.path.exists() => report.record(
                "canonical_files",
                CheckStatus::Pass,
                format!("{label}: {} rows, {} bytes", h.rows, h.size_bytes()),
            ),
            Some(h) => report.record(
                "canonical_files",
                CheckStatus::Fail,
                format!("{label}: {} missing on disk", h.path.display()),
            ),
            None => report.record(
                "canonical_files",
                CheckStatus::Fail,
                format!("{label}: table not produced this run"),
            ),
        }
    }
}

fn check_crime_rows(report: &mut ValidationReport, cfg: &PipelineConfig, rows: usize) {
    if rows as u64 > cfg.thresholds.crime_min_rows {
        report.record("crime_rows", CheckStatus::Pass, format!("{rows} incidents"));
    } else {
        report.record(
            "crime_rows",
            CheckStatus::Warn,
            format!(
                "{rows} incidents, expected > {}",
                cfg.thresholds.crime_min_rows
            ),
        );
    }
}

fn year_bounds<'a, I>(years: I) -> Option<(i32, i32)>
where
    I: Iterator<Item = &'a Option<i32>>,
{
    let mut bounds: Option<(i32, i32)> = None;
    for y in years.flatten() {
        bounds = Some(match bounds {
            Some((lo, hi)) => (lo.min(*y), hi.max(*y)),
            None => (*y, *y),
        });
    }
    bounds
}

fn check_crime_years(report: &mut ValidationReport, cfg: &PipelineConfig, rows: &[CrimeIncident]) {
    let Some((lo, hi)) = year_bounds(rows.iter().map(|r| &r.year)) else {
        report.record("crime_years", CheckStatus::Warn, "no dated incidents");
        return;
    };
    if lo <= cfg.thresholds.crime_earliest_year && hi >= cfg.current_year - 1 {
        report.record("crime_years", CheckStatus::Pass, format!("{lo}..{hi}"));
    } else {
        report.record(
            "crime_years",
            CheckStatus::Warn,
            format!(
                "{lo}..{hi}, expected {}..{}",
                cfg.thresholds.crime_earliest_year,
                cfg.current_year - 1
            ),
        );
    }
}

fn check_geo_outliers(report: &mut ValidationReport, cfg: &PipelineConfig, rows: &[CrimeIncident]) {
    let mut located = 0u64;
    let mut outside = 0u64;
    for r in rows {
        if let (Some(lat), Some(lng)) = (r.lat, r.lng) {
            located += 1;
            if !cfg.bounds.contains(lat, lng) {
                outside += 1;
            }
        }
    }
    if located == 0 {
        report.record("geo_outliers", CheckStatus::Pass, "no geolocated rows");
        return;
    }
    let pct = outside as f64 * 100.0 / located as f64;
    if pct < cfg.thresholds.geo_outlier_max_pct {
        report.record(
            "geo_outliers",
            CheckStatus::Pass,
            format!("{outside}/{located} outside county ({pct:.2}%)"),
        );
    } else {
        report.record(
            "geo_outliers",
            CheckStatus::Warn,
            format!("{outside}/{located} outside county ({pct:.2}%)"),
        );
    }
}

fn check_null_rates(report: &mut ValidationReport, cfg: &PipelineConfig, rows: &[CrimeIncident]) {
    if rows.is_empty() {
        report.record("null_rates", CheckStatus::Pass, "no rows");
        return;
    }
    // agency_short itself is total; UNKNOWN stands in for a missing agency.
    let columns: [(&str, Box<dyn Fn(&CrimeIncident) -> bool>); 4] = [
        ("incident_date", Box::new(|r| r.incident_date.is_none())),
        (
            "agency_short",
            Box::new(|r| r.agency_short == crate::canonical::agency::UNKNOWN_AGENCY),
        ),
        ("crime_against", Box::new(|r| r.crime_against.is_none())),
        ("offense_group", Box::new(|r| r.offense_group.is_none())),
    ];
    for (name, is_null) in columns {
        let nulls = rows.iter().filter(|r| is_null(r)).count();
        let pct = nulls as f64 * 100.0 / rows.len() as f64;
        if pct < cfg.thresholds.null_rate_max_pct {
            report.record(
                "null_rates",
                CheckStatus::Pass,
                format!("{name}: {pct:.2}% null"),
            );
        } else {
            report.record(
                "null_rates",
                CheckStatus::Warn,
                format!("{name}: {pct:.2}% null"),
            );
        }
    }
}

fn check_agency_distribution(report: &mut ValidationReport, rows: &[CrimeIncident]) {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for r in rows {
        *counts.entry(r.agency_short.as_str()).or_default() += 1;
    }
    let mut top: Vec<_> = counts.into_iter().collect();
    top.sort_by(|a, b| b.1.cmp(&a.1));
    let summary: Vec<String> = top
        .iter()
        .take(5)
        .map(|(a, n)| format!("{a}={n}"))
        .collect();
    report.record(
        "agency_distribution",
        CheckStatus::Info,
        format!("top agencies: {}", summary.join(", ")),
    );
}

fn check_crime_categories(report: &mut ValidationReport, rows: &[CrimeIncident]) {
    let missing: Vec<&str> = ["People", "Property", "Society"]
        .into_iter()
        .filter(|cat| !rows.iter().any(|r| r.crime_against.as_deref() == Some(*cat)))
        .collect();
    if missing.is_empty() {
        report.record(
            "crime_categories",
            CheckStatus::Pass,
            "People, Property, Society all present",
        );
    } else {
        report.record(
            "crime_categories",
            CheckStatus::Warn,
            format!("missing categories: {}", missing.join(", ")),
        );
    }
}

fn check_yoy_volume(report: &mut ValidationReport, cfg: &PipelineConfig, rows: &[CrimeIncident]) {
    let mut by_year: BTreeMap<i32, u64> = BTreeMap::new();
    for r in rows {
        if let Some(y) = r.year {
            *by_year.entry(y).or_default() += 1;
        }
    }
    let years: Vec<_> = by_year.into_iter().collect();
    let mut flagged = false;
    for pair in years.windows(2) {
        let ((y0, n0), (y1, n1)) = (pair[0], pair[1]);
        if y1 != y0 + 1 || n0 == 0 {
            continue;
        }
        let delta = (n1 as f64 - n0 as f64).abs() * 100.0 / n0 as f64;
        if delta > cfg.thresholds.yoy_change_max_pct {
            flagged = true;
            report.record(
                "yoy_volume",
                CheckStatus::Warn,
                format!("{y0}->{y1}: {n0} -> {n1} ({delta:.1}% change)"),
            );
        }
    }
    if !flagged {
        report.record("yoy_volume", CheckStatus::Pass, "year-over-year volume stable");
    }
}

fn check_duplicates(report: &mut ValidationReport, rows: &[CrimeIncident]) {
    let mut seen: HashMap<(Option<&str>, Option<&str>), u32> = HashMap::new();
    for r in rows {
        *seen
            .entry((r.incident_uid.as_deref(), r.offense_description.as_deref()))
            .or_default() += 1;
    }
    let dupes = seen.values().filter(|n| **n > 1).count();
    if dupes == 0 {
        report.record("duplicates", CheckStatus::Pass, "no duplicate incident keys");
    } else {
        report.record(
            "duplicates",
            CheckStatus::Fail,
            format!("{dupes} duplicated incident keys"),
        );
    }
}

fn check_arrest_rows(
    report: &mut ValidationReport,
    cfg: &PipelineConfig,
    rows: &[crate::canonical::ArrestRecord],
) {
    if rows.len() as u64 > cfg.thresholds.arrests_min_rows {
        report.record("arrest_rows", CheckStatus::Pass, format!("{} arrests", rows.len()));
    } else {
        report.record(
            "arrest_rows",
            CheckStatus::Warn,
            format!(
                "{} arrests, expected > {}",
                rows.len(),
                cfg.thresholds.arrests_min_rows
            ),
        );
    }
    let types: std::collections::BTreeSet<_> = rows
        .iter()
        .filter_map(|r| r.offense_description.as_deref())
        .collect();
    report.record(
        "arrest_rows",
        CheckStatus::Info,
        format!("{} distinct offense types", types.len()),
    );
}

fn check_arrest_years(report: &mut ValidationReport, rows: &[crate::canonical::ArrestRecord]) {
    match year_bounds(rows.iter().map(|r| &r.year)) {
        Some((lo, hi)) => {
            report.record("arrest_years", CheckStatus::Info, format!("{lo}..{hi}"))
        }
        None => report.record("arrest_years", CheckStatus::Info, "no dated arrests"),
    }
}

fn check_cfs_rows(report: &mut ValidationReport, cfg: &PipelineConfig, rows: usize) {
    if rows as u64 > cfg.thresholds.cfs_min_rows {
        report.record("cfs_rows", CheckStatus::Pass, format!("{rows} calls"));
    } else {
        report.record(
            "cfs_rows",
            CheckStatus::Warn,
            format!("{rows} calls, expected > {}", cfg.thresholds.cfs_min_rows),
        );
    }
}

fn check_cfs_years(
    report: &mut ValidationReport,
    cfg: &PipelineConfig,
    rows: &[crate::canonical::ServiceCall],
) {
    let Some((lo, hi)) = year_bounds(rows.iter().map(|r| &r.year)) else {
        report.record("cfs_years", CheckStatus::Warn, "no dated calls");
        return;
    };
    if lo <= cfg.thresholds.cfs_earliest_year && hi >= cfg.current_year - 1 {
        report.record("cfs_years", CheckStatus::Pass, format!("{lo}..{hi}"));
    } else {
        report.record(
            "cfs_years",
            CheckStatus::Warn,
            format!(
                "{lo}..{hi}, expected {}..{}",
                cfg.thresholds.cfs_earliest_year,
                cfg.current_year - 1
            ),
        );
    }
    report.record(
        "cfs_years",
        CheckStatus::Info,
        format!("{} years of coverage", hi - lo + 1),
    );
}

fn check_cfs_beats(report: &mut ValidationReport, rows: &[crate::canonical::ServiceCall]) {
    let beats: std::collections::BTreeSet<_> =
        rows.iter().filter_map(|r| r.beat.as_deref()).collect();
    report.record(
        "cfs_beats",
        CheckStatus::Info,
        format!("{} distinct beats", beats.len()),
    );
}

fn check_aggregated_files(report: &mut ValidationReport, views: &AggregatedViews) {
    for name in EXPECTED_VIEWS {
        match views.get(name) {
            Some(h) if h.path.exists() => report.record(
                "aggregated_files",
                CheckStatus::Pass,
                format!("{name}: {} rows, {} bytes", h.rows, h.size_bytes()),
            ),
            Some(h) => report.record(
                "aggregated_files",
                CheckStatus::Fail,
                format!("{name}: {} missing on disk", h.path.display()),
            ),
            None => report.record(
                "aggregated_files",
                CheckStatus::Fail,
                format!("{name}: not built this run"),
            ),
        }
    }
}
