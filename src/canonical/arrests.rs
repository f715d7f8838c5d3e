//! Arrest track: CIBRS Group B JSON -> canonical arrests table.
//!
//! Group B arrives pre-filtered to the tracked offense codes and carries
//! no revision semantics, so there is no dedup pass here.

use crate::canonical::{agency, coerce};
use crate::table::ColumnData;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ArrestRecord {
    pub incident_uid: Option<String>,
    pub arrest_date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub quarter: Option<i32>,
    pub dow: Option<i32>,
    pub month_start: Option<NaiveDate>,
    pub agency: Option<String>,
    pub agency_short: String,
    pub offense_code: Option<String>,
    pub offense_description: Option<String>,
}

pub fn load(raw_path: &Path) -> Result<Vec<ArrestRecord>> {
    let bytes = fs::read(raw_path)
        .with_context(|| format!("reading {}", raw_path.display()))?;
    let raw: Vec<Value> = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing {}", raw_path.display()))?;
    let rows: Vec<ArrestRecord> = raw.iter().map(from_raw).collect();
    info!("arrests: {} records", rows.len());
    Ok(rows)
}

pub fn from_raw(row: &Value) -> ArrestRecord {
    let raw_agency = coerce::get_str(row, "arrest_agency");
    let date = coerce::get_str(row, "arrest_date").and_then(|s| coerce::parse_date(&s));
    ArrestRecord {
        incident_uid: coerce::get_str(row, "incident_uid"),
        arrest_date: date,
        year: date.map(|d| d.year()),
        month: date.map(|d| d.month() as i32),
        quarter: date.map(coerce::quarter),
        dow: date.map(coerce::dow_sunday0),
        month_start: date.map(coerce::month_start),
        agency_short: agency::short_code(raw_agency.as_deref()),
        agency: raw_agency,
        offense_code: coerce::get_str(row, "offense_code"),
        offense_description: coerce::get_str(row, "offense_description"),
    }
}

pub fn columns(rows: &[ArrestRecord]) -> Vec<(&'static str, ColumnData)> {
    vec![
        (
            "incidentuid",
            ColumnData::Str(rows.iter().map(|r| r.incident_uid.clone()).collect()),
        ),
        (
            "incident_date",
            ColumnData::Date(rows.iter().map(|r| r.arrest_date).collect()),
        ),
        ("year", ColumnData::Int(rows.iter().map(|r| r.year).collect())),
        ("month", ColumnData::Int(rows.iter().map(|r| r.month).collect())),
        (
            "quarter",
            ColumnData::Int(rows.iter().map(|r| r.quarter).collect()),
        ),
        ("dow", ColumnData::Int(rows.iter().map(|r| r.dow).collect())),
        (
            "month_start",
            ColumnData::Date(rows.iter().map(|r| r.month_start).collect()),
        ),
        (
            "agency",
            ColumnData::Str(rows.iter().map(|r| r.agency.clone()).collect()),
        ),
        (
            "agency_short",
            ColumnData::Str(rows.iter().map(|r| Some(r.agency_short.clone())).collect()),
        ),
        (
            "offense_code",
            ColumnData::Str(rows.iter().map(|r| r.offense_code.clone()).collect()),
        ),
        (
            "offense_description",
            ColumnData::Str(rows.iter().map(|r| r.offense_description.clone()).collect()),
        ),
    ]
}
