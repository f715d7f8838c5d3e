//! Calls-for-service track: per-year CSVs -> canonical calls table.
//!
//! Source headers are uppercase (INCIDENT_NUM, DATE_TIME, CALL_TYPE,
//! PRIORITY, DISPOSITION, BEAT) but column order varies across years, so
//! fields are resolved by name per file. Unreadable records are skipped.
//! Call-type and disposition descriptions come from the optional lookup
//! tables; with a lookup absent the raw code is used verbatim.

use crate::canonical::lookup::{describe, CodeLookup};
use crate::canonical::{coerce, dedup::dedup_latest};
use crate::table::ColumnData;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ServiceCall {
    pub incident_num: Option<String>,
    pub call_timestamp: Option<NaiveDateTime>,
    pub call_date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub dow: Option<i32>,
    pub hour: Option<i32>,
    pub month_start: Option<NaiveDate>,
    pub call_type: Option<String>,
    pub call_type_desc: Option<String>,
    pub priority: Option<i32>,
    pub disposition: Option<String>,
    pub dispo_desc: Option<String>,
    pub beat: Option<String>,
}

struct ColumnMap {
    incident_num: Option<usize>,
    date_time: Option<usize>,
    call_type: Option<usize>,
    priority: Option<usize>,
    disposition: Option<usize>,
    beat: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        Self {
            incident_num: find("INCIDENT_NUM"),
            date_time: find("DATE_TIME"),
            call_type: find("CALL_TYPE"),
            priority: find("PRIORITY"),
            disposition: find("DISPOSITION"),
            beat: find("BEAT"),
        }
    }
}

fn cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    let value = record.get(idx?)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Load every per-year CSV, coerce, enrich, and deduplicate by call id,
/// keeping the row with the latest call timestamp.
pub fn load(
    paths: &[impl AsRef<Path>],
    call_type_lookup: Option<&CodeLookup>,
    dispo_lookup: Option<&CodeLookup>,
) -> Result<Vec<ServiceCall>> {
    let mut rows: Vec<ServiceCall> = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("reading header of {}", path.display()))?
            .clone();
        let map = ColumnMap::from_headers(&headers);
        if map.incident_num.is_none() {
            warn!("{}: no INCIDENT_NUM column, file skipped", path.display());
            continue;
        }

        let before = rows.len();
        for record in reader.records() {
            let record = match record {
                Ok(r) => r,
                Err(_) => continue, // malformed line, skip the record
            };
            rows.push(from_record(&record, &map, call_type_lookup, dispo_lookup));
        }
        info!("{}: {} calls", path.display(), rows.len() - before);
    }

    let total = rows.len();
    let deduped = dedup_latest(rows, |r| r.incident_num.clone(), |r| r.call_timestamp);
    info!("cfs: {} raw rows -> {} deduplicated calls", total, deduped.len());
    Ok(deduped)
}

fn from_record(
    record: &csv::StringRecord,
    map: &ColumnMap,
    call_type_lookup: Option<&CodeLookup>,
    dispo_lookup: Option<&CodeLookup>,
) -> ServiceCall {
    let ts = cell(record, map.date_time).and_then(|s| coerce::parse_timestamp(&s));
    let date = ts.map(|t| t.date());
    let call_type = cell(record, map.call_type);
    let disposition = cell(record, map.disposition);

    ServiceCall {
        incident_num: cell(record, map.incident_num),
        call_timestamp: ts,
        call_date: date,
        year: date.map(|d| d.year()),
        month: date.map(|d| d.month() as i32),
        dow: date.map(coerce::dow_sunday0),
        hour: ts.map(|t| t.hour() as i32),
        month_start: date.map(coerce::month_start),
        call_type_desc: call_type.as_deref().map(|c| describe(call_type_lookup, c)),
        call_type,
        priority: cell(record, map.priority).and_then(|s| coerce::parse_i32(&s)),
        dispo_desc: disposition.as_deref().map(|d| describe(dispo_lookup, d)),
        disposition,
        beat: cell(record, map.beat),
    }
}

pub fn columns(rows: &[ServiceCall]) -> Vec<(&'static str, ColumnData)> {
    vec![
        (
            "incident_num",
            ColumnData::Str(rows.iter().map(|r| r.incident_num.clone()).collect()),
        ),
        (
            "call_timestamp",
            ColumnData::Timestamp(rows.iter().map(|r| r.call_timestamp).collect()),
        ),
        (
            "call_date",
            ColumnData::Date(rows.iter().map(|r| r.call_date).collect()),
        ),
        ("year", ColumnData::Int(rows.iter().map(|r| r.year).collect())),
        ("month", ColumnData::Int(rows.iter().map(|r| r.month).collect())),
        ("dow", ColumnData::Int(rows.iter().map(|r| r.dow).collect())),
        ("hour", ColumnData::Int(rows.iter().map(|r| r.hour).collect())),
        (
            "month_start",
            ColumnData::Date(rows.iter().map(|r| r.month_start).collect()),
        ),
        (
            "call_type",
            ColumnData::Str(rows.iter().map(|r| r.call_type.clone()).collect()),
        ),
        (
            "call_type_desc",
            ColumnData::Str(rows.iter().map(|r| r.call_type_desc.clone()).collect()),
        ),
        (
            "priority",
            ColumnData::Int(rows.iter().map(|r| r.priority).collect()),
        ),
        (
            "disposition",
            ColumnData::Str(rows.iter().map(|r| r.disposition.clone()).collect()),
        ),
        (
            "dispo_desc",
            ColumnData::Str(rows.iter().map(|r| r.dispo_desc.clone()).collect()),
        ),
        (
            "beat",
            ColumnData::Str(rows.iter().map(|r| r.beat.clone()).collect()),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{contents}").unwrap();
        path
    }

    #[test]
    fn calls_parse_and_dedup_by_incident_num() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_csv(
            dir.path(),
            "cfs_2023.csv",
            "INCIDENT_NUM,DATE_TIME,CALL_TYPE,PRIORITY,DISPOSITION,BEAT\n\
             E23010001,2023-01-01 08:00:00,459A,2,K,122\n\
             E23010001,2023-01-02 09:30:00,459A,2,K,122\n\
             E23010002,2023-01-01 10:00:00,415,3,CAN,433\n",
        );

        let rows = load(&[p], None, None).unwrap();
        assert_eq!(rows.len(), 2);
        let first = rows
            .iter()
            .find(|r| r.incident_num.as_deref() == Some("E23010001"))
            .unwrap();
        // Later revision survives.
        assert_eq!(first.call_date, NaiveDate::from_ymd_opt(2023, 1, 2));
        assert_eq!(first.hour, Some(9));
        assert_eq!(first.dow, Some(1)); // 2023-01-02 was a Monday
    }

    #[test]
    fn absent_lookups_use_codes_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_csv(
            dir.path(),
            "cfs_2022.csv",
            "INCIDENT_NUM,DATE_TIME,CALL_TYPE,PRIORITY,DISPOSITION,BEAT\n\
             E22000001,2022-05-05 12:00:00,459A,1,K,110\n",
        );
        let rows = load(&[p], None, None).unwrap();
        assert_eq!(rows[0].call_type_desc.as_deref(), Some("459A"));
        assert_eq!(rows[0].dispo_desc.as_deref(), Some("K"));
    }

    #[test]
    fn lookups_enrich_descriptions() {
        let dir = tempfile::tempdir().unwrap();
        let lookup_path = write_csv(
            dir.path(),
            "call_type_desc.csv",
            "CALL_TYPE,DESCRIPTION\n459A,AUDIBLE BURGLARY ALARM\n",
        );
        let ct = CodeLookup::load(Some(&lookup_path), "CALL_TYPE", "DESCRIPTION").unwrap();
        let p = write_csv(
            dir.path(),
            "cfs_2022.csv",
            "INCIDENT_NUM,DATE_TIME,CALL_TYPE,PRIORITY,DISPOSITION,BEAT\n\
             E22000001,2022-05-05 12:00:00,459A,1,K,110\n",
        );
        let rows = load(&[p], Some(&ct), None).unwrap();
        assert_eq!(
            rows[0].call_type_desc.as_deref(),
            Some("AUDIBLE BURGLARY ALARM")
        );
    }

    #[test]
    fn shuffled_headers_and_bad_fields_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_csv(
            dir.path(),
            "cfs_2019.csv",
            "DATE_TIME,BEAT,INCIDENT_NUM,CALL_TYPE,PRIORITY,DISPOSITION\n\
             2019-03-03 03:00:00,521,E19000001,11-6,P,W\n",
        );
        let rows = load(&[p], None, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].incident_num.as_deref(), Some("E19000001"));
        assert_eq!(rows[0].beat.as_deref(), Some("521"));
        // Non-numeric priority coerces to None, row retained.
        assert_eq!(rows[0].priority, None);
    }
}
