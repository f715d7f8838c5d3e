//! Crime incident track: CIBRS Group A JSON -> canonical crime table.

use crate::canonical::{agency, coerce, dedup::dedup_latest};
use crate::table::ColumnData;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct CrimeIncident {
    pub incident_uid: Option<String>,
    pub incident_date: Option<NaiveDate>,
    /// Full-precision timestamp of the incident date field; orders
    /// revisions during dedup.
    pub incident_ts: Option<NaiveDateTime>,
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub quarter: Option<i32>,
    pub dow: Option<i32>,
    pub month_start: Option<NaiveDate>,
    pub agency: Option<String>,
    pub agency_short: String,
    pub crime_against: Option<String>,
    pub offense_group: Option<String>,
    pub offense_description: Option<String>,
    pub victim_age: Option<i32>,
    pub victim_race: Option<String>,
    pub victim_sex: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub is_domestic_violence: bool,
    pub is_stolen_vehicle: bool,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Load, coerce, and deduplicate the Group A artifact. One row survives
/// per (incident id, offense description), the one with the latest
/// incident timestamp.
pub fn load(raw_path: &Path) -> Result<Vec<CrimeIncident>> {
    let bytes = fs::read(raw_path)
        .with_context(|| format!("reading {}", raw_path.display()))?;
    let raw: Vec<Value> = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing {}", raw_path.display()))?;
    let total = raw.len();

    let rows: Vec<CrimeIncident> = raw.iter().map(from_raw).collect();
    let deduped = dedup_latest(
        rows,
        |r| (r.incident_uid.clone(), r.offense_description.clone()),
        |r| r.incident_ts,
    );
    info!(
        "crime: {} raw rows -> {} deduplicated incidents",
        total,
        deduped.len()
    );
    Ok(deduped)
}

pub fn from_raw(row: &Value) -> CrimeIncident {
    let raw_agency = coerce::get_str(row, "agency");
    let ts = coerce::get_str(row, "incident_date").and_then(|s| coerce::parse_timestamp(&s));
    let date = ts.map(|t| t.date());

    let offense_description = coerce::get_str(row, "cibrs_offense_description");
    let stolen_count = coerce::get_i32(row, "stolen_vehicles").unwrap_or(0);
    let is_stolen_vehicle = stolen_count > 0
        || offense_description
            .as_deref()
            .map(|d| d.to_lowercase().contains("motor vehicle theft"))
            .unwrap_or(false);

    let (lat, lng) = match coerce::geo_point(row, "location") {
        Some((lat, lng)) => (Some(lat), Some(lng)),
        None => (None, None),
    };

    CrimeIncident {
        incident_uid: coerce::get_str(row, "incidentuid"),
        incident_date: date,
        incident_ts: ts,
        year: date.map(|d| d.year()),
        month: date.map(|d| d.month() as i32),
        quarter: date.map(coerce::quarter),
        dow: date.map(coerce::dow_sunday0),
        month_start: date.map(coerce::month_start),
        agency_short: agency::short_code(raw_agency.as_deref()),
        agency: raw_agency,
        crime_against: coerce::get_str(row, "crime_against_category"),
        offense_group: coerce::get_str(row, "cibrs_grouped_offense_description"),
        offense_description,
        victim_age: coerce::get_i32(row, "victim_age"),
        victim_race: coerce::get_str(row, "victim_race"),
        victim_sex: coerce::get_str(row, "victim_sex"),
        zip_code: coerce::get_str(row, "zip_code"),
        city: coerce::get_str(row, "city"),
        is_domestic_violence: coerce::get_bool(row, "domestic_violence_incident").unwrap_or(false),
        is_stolen_vehicle,
        lat,
        lng,
    }
}

pub fn columns(rows: &[CrimeIncident]) -> Vec<(&'static str, ColumnData)> {
    vec![
        (
            "incidentuid",
            ColumnData::Str(rows.iter().map(|r| r.incident_uid.clone()).collect()),
        ),
        (
            "incident_date",
            ColumnData::Date(rows.iter().map(|r| r.incident_date).collect()),
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
            "crime_against",
            ColumnData::Str(rows.iter().map(|r| r.crime_against.clone()).collect()),
        ),
        (
            "offense_group",
            ColumnData::Str(rows.iter().map(|r| r.offense_group.clone()).collect()),
        ),
        (
            "offense_description",
            ColumnData::Str(rows.iter().map(|r| r.offense_description.clone()).collect()),
        ),
        (
            "victim_age",
            ColumnData::Int(rows.iter().map(|r| r.victim_age).collect()),
        ),
        (
            "victim_race",
            ColumnData::Str(rows.iter().map(|r| r.victim_race.clone()).collect()),
        ),
        (
            "victim_sex",
            ColumnData::Str(rows.iter().map(|r| r.victim_sex.clone()).collect()),
        ),
        (
            "zip_code",
            ColumnData::Str(rows.iter().map(|r| r.zip_code.clone()).collect()),
        ),
        (
            "city",
            ColumnData::Str(rows.iter().map(|r| r.city.clone()).collect()),
        ),
        (
            "is_domestic_violence",
            ColumnData::Bool(rows.iter().map(|r| Some(r.is_domestic_violence)).collect()),
        ),
        (
            "is_stolen_vehicle",
            ColumnData::Bool(rows.iter().map(|r| Some(r.is_stolen_vehicle)).collect()),
        ),
        ("lat", ColumnData::Float(rows.iter().map(|r| r.lat).collect())),
        ("lng", ColumnData::Float(rows.iter().map(|r| r.lng).collect())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_row_is_coerced_and_enriched() {
        let row = json!({
            "incidentuid": "I-100",
            "incident_date": "2023-06-15T00:00:00.000",
            "agency": "San Diego",
            "crime_against_category": "Property",
            "cibrs_grouped_offense_description": "Larceny/Theft Offenses",
            "cibrs_offense_description": "Motor Vehicle Theft",
            "victim_age": "34",
            "victim_sex": "F",
            "zip_code": "92101",
            "city": "SAN DIEGO",
            "domestic_violence_incident": false,
            "stolen_vehicles": "1",
            "location": {"type": "Point", "coordinates": [-117.16, 32.72]}
        });
        let rec = from_raw(&row);
        assert_eq!(rec.agency_short, "SDPD");
        assert_eq!(rec.year, Some(2023));
        assert_eq!(rec.quarter, Some(2));
        assert!(rec.is_stolen_vehicle);
        assert!(!rec.is_domestic_violence);
        assert_eq!(rec.lat, Some(32.72));
        assert_eq!(rec.lng, Some(-117.16));
    }

    #[test]
    fn stolen_vehicle_flag_ors_count_and_description() {
        let by_desc = json!({
            "incidentuid": "I-1",
            "cibrs_offense_description": "MOTOR VEHICLE THEFT - AUTO"
        });
        assert!(from_raw(&by_desc).is_stolen_vehicle);

        let by_count = json!({
            "incidentuid": "I-2",
            "cibrs_offense_description": "Burglary",
            "stolen_vehicles": 2
        });
        assert!(from_raw(&by_count).is_stolen_vehicle);

        let neither = json!({
            "incidentuid": "I-3",
            "cibrs_offense_description": "Burglary",
            "stolen_vehicles": 0
        });
        assert!(!from_raw(&neither).is_stolen_vehicle);
    }

    #[test]
    fn bad_date_keeps_row_with_empty_calendar() {
        let row = json!({"incidentuid": "I-9", "incident_date": "pending"});
        let rec = from_raw(&row);
        assert_eq!(rec.year, None);
        assert_eq!(rec.month_start, None);
        assert_eq!(rec.incident_uid.as_deref(), Some("I-9"));
    }

    #[test]
    fn load_dedups_by_uid_and_offense() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cibrs_group_a.json");
        let raw = json!([
            {"incidentuid": "X1", "cibrs_offense_description": "Theft",
             "incident_date": "2024-01-01T00:00:00.000"},
            {"incidentuid": "X1", "cibrs_offense_description": "Theft",
             "incident_date": "2024-03-01T00:00:00.000"},
            {"incidentuid": "X1", "cibrs_offense_description": "Assault",
             "incident_date": "2024-01-01T00:00:00.000"}
        ]);
        std::fs::write(&path, raw.to_string()).unwrap();

        let rows = load(&path).unwrap();
        assert_eq!(rows.len(), 2);
        let theft = rows
            .iter()
            .find(|r| r.offense_description.as_deref() == Some("Theft"))
            .unwrap();
        assert_eq!(
            theft.incident_date,
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cibrs_group_a.json");
        let raw = json!([
            {"incidentuid": "A", "cibrs_offense_description": "Theft",
             "incident_date": "2024-01-01T00:00:00.000", "agency": "Vista"},
            {"incidentuid": "B", "cibrs_offense_description": "Theft",
             "incident_date": "2024-02-01T00:00:00.000", "agency": "Carlsbad"}
        ]);
        std::fs::write(&path, raw.to_string()).unwrap();

        let first = load(&path).unwrap();
        let second = load(&path).unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.incident_uid, b.incident_uid);
            assert_eq!(a.incident_ts, b.incident_ts);
            assert_eq!(a.agency_short, b.agency_short);
        }
    }
}
