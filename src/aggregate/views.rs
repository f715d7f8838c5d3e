//! The 14 fixed rollup definitions.
//!
//! Every view is a pure group-by over one canonical table: fixed key
//! set, fixed metric (count, or sum of a boolean), fixed sort order.
//! Grouping goes through a `BTreeMap` and count-ordered views use a
//! stable sort, so equal counts fall back to key order and the output
//! is deterministic run to run.

use crate::canonical::{ArrestRecord, CrimeIncident, ServiceCall};
use crate::config::GeoBounds;
use crate::table::ColumnData;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Fixed age bands, applied wherever victim age appears.
pub fn age_bucket(age: Option<i32>) -> &'static str {
    match age {
        Some(a) if a < 18 => "Under 18",
        Some(a) if a <= 24 => "18-24",
        Some(a) if a <= 34 => "25-34",
        Some(a) if a <= 44 => "35-44",
        Some(a) if a <= 54 => "45-54",
        Some(a) if a <= 64 => "55-64",
        Some(_) => "65+",
        None => "Unknown",
    }
}

fn sorted_count_desc<K>(map: BTreeMap<K, i64>) -> Vec<(K, i64)>
where
    K: Ord,
{
    let mut rows: Vec<_> = map.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));
    rows
}

// ── Crime views ─────────────────────────────────────────────────────────

pub fn crime_overview_monthly(rows: &[CrimeIncident]) -> Vec<(&'static str, ColumnData)> {
    let mut map: BTreeMap<(NaiveDate, String, Option<String>), i64> = BTreeMap::new();
    for r in rows {
        if let Some(ms) = r.month_start {
            *map.entry((ms, r.agency_short.clone(), r.crime_against.clone()))
                .or_default() += 1;
        }
    }
    let rows: Vec<_> = map.into_iter().collect();
    vec![
        (
            "month_start",
            ColumnData::Date(rows.iter().map(|((ms, _, _), _)| Some(*ms)).collect()),
        ),
        (
            "agency_short",
            ColumnData::Str(rows.iter().map(|((_, a, _), _)| Some(a.clone())).collect()),
        ),
        (
            "crime_against",
            ColumnData::Str(rows.iter().map(|((_, _, c), _)| c.clone()).collect()),
        ),
        (
            "total_incidents",
            ColumnData::Long(rows.iter().map(|(_, n)| Some(*n)).collect()),
        ),
    ]
}

pub fn crime_by_type(rows: &[CrimeIncident]) -> Vec<(&'static str, ColumnData)> {
    type Key = (Option<String>, Option<String>, Option<String>, i32);
    let mut map: BTreeMap<Key, i64> = BTreeMap::new();
    for r in rows {
        if let Some(year) = r.year {
            *map.entry((
                r.offense_group.clone(),
                r.offense_description.clone(),
                r.crime_against.clone(),
                year,
            ))
            .or_default() += 1;
        }
    }
    let rows = sorted_count_desc(map);
    vec![
        (
            "offense_group",
            ColumnData::Str(rows.iter().map(|((g, _, _, _), _)| g.clone()).collect()),
        ),
        (
            "offense_description",
            ColumnData::Str(rows.iter().map(|((_, d, _, _), _)| d.clone()).collect()),
        ),
        (
            "crime_against",
            ColumnData::Str(rows.iter().map(|((_, _, c, _), _)| c.clone()).collect()),
        ),
        (
            "year",
            ColumnData::Int(rows.iter().map(|((_, _, _, y), _)| Some(*y)).collect()),
        ),
        (
            "count",
            ColumnData::Long(rows.iter().map(|(_, n)| Some(*n)).collect()),
        ),
    ]
}

pub fn crime_by_zip(rows: &[CrimeIncident]) -> Vec<(&'static str, ColumnData)> {
    type Key = (String, Option<String>, i32, Option<String>);
    let mut map: BTreeMap<Key, i64> = BTreeMap::new();
    for r in rows {
        if let (Some(zip), Some(year)) = (&r.zip_code, r.year) {
            *map.entry((zip.clone(), r.city.clone(), year, r.crime_against.clone()))
                .or_default() += 1;
        }
    }
    let rows = sorted_count_desc(map);
    vec![
        (
            "zip_code",
            ColumnData::Str(rows.iter().map(|((z, _, _, _), _)| Some(z.clone())).collect()),
        ),
        (
            "city",
            ColumnData::Str(rows.iter().map(|((_, c, _, _), _)| c.clone()).collect()),
        ),
        (
            "year",
            ColumnData::Int(rows.iter().map(|((_, _, y, _), _)| Some(*y)).collect()),
        ),
        (
            "crime_against",
            ColumnData::Str(rows.iter().map(|((_, _, _, c), _)| c.clone()).collect()),
        ),
        (
            "count",
            ColumnData::Long(rows.iter().map(|(_, n)| Some(*n)).collect()),
        ),
    ]
}

pub fn crime_by_agency(rows: &[CrimeIncident]) -> Vec<(&'static str, ColumnData)> {
    #[derive(Default)]
    struct Agg {
        count: i64,
        dv_count: i64,
    }
    type Key = (String, i32, Option<String>);
    let mut map: BTreeMap<Key, Agg> = BTreeMap::new();
    for r in rows {
        if let Some(year) = r.year {
            let agg = map
                .entry((r.agency_short.clone(), year, r.crime_against.clone()))
                .or_default();
            agg.count += 1;
            if r.is_domestic_violence {
                agg.dv_count += 1;
            }
        }
    }
    let mut rows: Vec<_> = map.into_iter().collect();
    rows.sort_by(|a, b| b.1.count.cmp(&a.1.count));
    vec![
        (
            "agency_short",
            ColumnData::Str(rows.iter().map(|((a, _, _), _)| Some(a.clone())).collect()),
        ),
        (
            "year",
            ColumnData::Int(rows.iter().map(|((_, y, _), _)| Some(*y)).collect()),
        ),
        (
            "crime_against",
            ColumnData::Str(rows.iter().map(|((_, _, c), _)| c.clone()).collect()),
        ),
        (
            "count",
            ColumnData::Long(rows.iter().map(|(_, a)| Some(a.count)).collect()),
        ),
        (
            "dv_count",
            ColumnData::Long(rows.iter().map(|(_, a)| Some(a.dv_count)).collect()),
        ),
    ]
}

pub fn victim_demographics(rows: &[CrimeIncident]) -> Vec<(&'static str, ColumnData)> {
    type Key = (
        &'static str,
        Option<String>,
        Option<String>,
        Option<String>,
        i32,
    );
    let mut map: BTreeMap<Key, i64> = BTreeMap::new();
    for r in rows {
        if let Some(year) = r.year {
            *map.entry((
                age_bucket(r.victim_age),
                r.victim_race.clone(),
                r.victim_sex.clone(),
                r.crime_against.clone(),
                year,
            ))
            .or_default() += 1;
        }
    }
    let rows = sorted_count_desc(map);
    vec![
        (
            "age_bin",
            ColumnData::Str(
                rows.iter()
                    .map(|((a, _, _, _, _), _)| Some((*a).to_string()))
                    .collect(),
            ),
        ),
        (
            "victim_race",
            ColumnData::Str(rows.iter().map(|((_, r, _, _, _), _)| r.clone()).collect()),
        ),
        (
            "victim_sex",
            ColumnData::Str(rows.iter().map(|((_, _, s, _, _), _)| s.clone()).collect()),
        ),
        (
            "crime_against",
            ColumnData::Str(rows.iter().map(|((_, _, _, c, _), _)| c.clone()).collect()),
        ),
        (
            "year",
            ColumnData::Int(rows.iter().map(|((_, _, _, _, y), _)| Some(*y)).collect()),
        ),
        (
            "count",
            ColumnData::Long(rows.iter().map(|(_, n)| Some(*n)).collect()),
        ),
    ]
}

pub fn domestic_violence(rows: &[CrimeIncident]) -> Vec<(&'static str, ColumnData)> {
    type Key = (
        Option<NaiveDate>,
        String,
        Option<String>,
        Option<String>,
        i32,
    );
    let mut map: BTreeMap<Key, i64> = BTreeMap::new();
    for r in rows {
        if !r.is_domestic_violence {
            continue;
        }
        if let Some(year) = r.year {
            *map.entry((
                r.month_start,
                r.agency_short.clone(),
                r.offense_group.clone(),
                r.victim_sex.clone(),
                year,
            ))
            .or_default() += 1;
        }
    }
    // Keyed month-bucket first, so iteration order is the sort order.
    let rows: Vec<_> = map.into_iter().collect();
    vec![
        (
            "agency",
            ColumnData::Str(rows.iter().map(|((_, a, _, _, _), _)| Some(a.clone())).collect()),
        ),
        (
            "offense_group",
            ColumnData::Str(rows.iter().map(|((_, _, g, _, _), _)| g.clone()).collect()),
        ),
        (
            "victim_sex",
            ColumnData::Str(rows.iter().map(|((_, _, _, s, _), _)| s.clone()).collect()),
        ),
        (
            "year",
            ColumnData::Int(rows.iter().map(|((_, _, _, _, y), _)| Some(*y)).collect()),
        ),
        (
            "month_start",
            ColumnData::Date(rows.iter().map(|((ms, _, _, _, _), _)| *ms).collect()),
        ),
        (
            "count",
            ColumnData::Long(rows.iter().map(|(_, n)| Some(*n)).collect()),
        ),
    ]
}

pub fn temporal_patterns(rows: &[CrimeIncident]) -> Vec<(&'static str, ColumnData)> {
    type Key = (Option<i32>, Option<i32>, i32, Option<String>);
    let mut map: BTreeMap<Key, i64> = BTreeMap::new();
    for r in rows {
        if let Some(year) = r.year {
            *map.entry((r.dow, r.month, year, r.crime_against.clone()))
                .or_default() += 1;
        }
    }
    let rows: Vec<_> = map.into_iter().collect();
    vec![
        (
            "dow",
            ColumnData::Int(rows.iter().map(|((d, _, _, _), _)| *d).collect()),
        ),
        (
            "month",
            ColumnData::Int(rows.iter().map(|((_, m, _, _), _)| *m).collect()),
        ),
        (
            "year",
            ColumnData::Int(rows.iter().map(|((_, _, y, _), _)| Some(*y)).collect()),
        ),
        (
            "crime_against",
            ColumnData::Str(rows.iter().map(|((_, _, _, c), _)| c.clone()).collect()),
        ),
        (
            "count",
            ColumnData::Long(rows.iter().map(|(_, n)| Some(*n)).collect()),
        ),
    ]
}

/// The one unaggregated view: point rows inside the county box, carried
/// through in input order for the map layer.
pub fn map_points(rows: &[CrimeIncident], bounds: &GeoBounds) -> Vec<(&'static str, ColumnData)> {
    let pts: Vec<&CrimeIncident> = rows
        .iter()
        .filter(|r| match (r.lat, r.lng) {
            (Some(lat), Some(lng)) => bounds.contains(lat, lng),
            _ => false,
        })
        .collect();
    vec![
        ("lat", ColumnData::Float(pts.iter().map(|r| r.lat).collect())),
        ("lng", ColumnData::Float(pts.iter().map(|r| r.lng).collect())),
        (
            "offense_group",
            ColumnData::Str(pts.iter().map(|r| r.offense_group.clone()).collect()),
        ),
        (
            "crime_against",
            ColumnData::Str(pts.iter().map(|r| r.crime_against.clone()).collect()),
        ),
        (
            "agency",
            ColumnData::Str(pts.iter().map(|r| Some(r.agency_short.clone())).collect()),
        ),
        ("year", ColumnData::Int(pts.iter().map(|r| r.year).collect())),
        (
            "city",
            ColumnData::Str(pts.iter().map(|r| r.city.clone()).collect()),
        ),
    ]
}

pub fn yearly_summary(rows: &[CrimeIncident]) -> Vec<(&'static str, ColumnData)> {
    #[derive(Default)]
    struct Sums {
        total: i64,
        person: i64,
        property: i64,
        society: i64,
        dv: i64,
        stolen_vehicle: i64,
    }
    let mut map: BTreeMap<i32, Sums> = BTreeMap::new();
    for r in rows {
        if let Some(year) = r.year {
            let s = map.entry(year).or_default();
            s.total += 1;
            match r.crime_against.as_deref() {
                Some("People") => s.person += 1,
                Some("Property") => s.property += 1,
                Some("Society") => s.society += 1,
                _ => {}
            }
            if r.is_domestic_violence {
                s.dv += 1;
            }
            if r.is_stolen_vehicle {
                s.stolen_vehicle += 1;
            }
        }
    }
    let rows: Vec<_> = map.into_iter().collect();
    vec![
        (
            "year",
            ColumnData::Int(rows.iter().map(|(y, _)| Some(*y)).collect()),
        ),
        (
            "total",
            ColumnData::Long(rows.iter().map(|(_, s)| Some(s.total)).collect()),
        ),
        (
            "person_crimes",
            ColumnData::Long(rows.iter().map(|(_, s)| Some(s.person)).collect()),
        ),
        (
            "property_crimes",
            ColumnData::Long(rows.iter().map(|(_, s)| Some(s.property)).collect()),
        ),
        (
            "society_crimes",
            ColumnData::Long(rows.iter().map(|(_, s)| Some(s.society)).collect()),
        ),
        (
            "dv_total",
            ColumnData::Long(rows.iter().map(|(_, s)| Some(s.dv)).collect()),
        ),
        (
            "stolen_vehicle_total",
            ColumnData::Long(rows.iter().map(|(_, s)| Some(s.stolen_vehicle)).collect()),
        ),
    ]
}

pub fn crime_by_city(rows: &[CrimeIncident]) -> Vec<(&'static str, ColumnData)> {
    type Key = (String, i32, Option<String>);
    let mut map: BTreeMap<Key, i64> = BTreeMap::new();
    for r in rows {
        if let (Some(city), Some(year)) = (&r.city, r.year) {
            *map.entry((city.clone(), year, r.crime_against.clone()))
                .or_default() += 1;
        }
    }
    let rows = sorted_count_desc(map);
    vec![
        (
            "city",
            ColumnData::Str(rows.iter().map(|((c, _, _), _)| Some(c.clone())).collect()),
        ),
        (
            "year",
            ColumnData::Int(rows.iter().map(|((_, y, _), _)| Some(*y)).collect()),
        ),
        (
            "crime_against",
            ColumnData::Str(rows.iter().map(|((_, _, c), _)| c.clone()).collect()),
        ),
        (
            "count",
            ColumnData::Long(rows.iter().map(|(_, n)| Some(*n)).collect()),
        ),
    ]
}

// ── Arrest views ────────────────────────────────────────────────────────

pub fn arrests_by_type(rows: &[ArrestRecord]) -> Vec<(&'static str, ColumnData)> {
    type Key = (Option<NaiveDate>, Option<String>, String, i32);
    let mut map: BTreeMap<Key, i64> = BTreeMap::new();
    for r in rows {
        if let Some(year) = r.year {
            *map.entry((
                r.month_start,
                r.offense_description.clone(),
                r.agency_short.clone(),
                year,
            ))
            .or_default() += 1;
        }
    }
    let rows: Vec<_> = map.into_iter().collect();
    vec![
        (
            "offense_description",
            ColumnData::Str(rows.iter().map(|((_, d, _, _), _)| d.clone()).collect()),
        ),
        (
            "agency_short",
            ColumnData::Str(rows.iter().map(|((_, _, a, _), _)| Some(a.clone())).collect()),
        ),
        (
            "year",
            ColumnData::Int(rows.iter().map(|((_, _, _, y), _)| Some(*y)).collect()),
        ),
        (
            "month_start",
            ColumnData::Date(rows.iter().map(|((ms, _, _, _), _)| *ms).collect()),
        ),
        (
            "count",
            ColumnData::Long(rows.iter().map(|(_, n)| Some(*n)).collect()),
        ),
    ]
}

// ── Calls-for-service views ─────────────────────────────────────────────

pub fn cfs_monthly(rows: &[ServiceCall]) -> Vec<(&'static str, ColumnData)> {
    type Key = (NaiveDate, Option<i32>, Option<String>, Option<i32>);
    let mut map: BTreeMap<Key, i64> = BTreeMap::new();
    for r in rows {
        if let Some(ms) = r.month_start {
            *map.entry((ms, r.year, r.call_type_desc.clone(), r.priority))
                .or_default() += 1;
        }
    }
    let rows: Vec<_> = map.into_iter().collect();
    vec![
        (
            "month_start",
            ColumnData::Date(rows.iter().map(|((ms, _, _, _), _)| Some(*ms)).collect()),
        ),
        (
            "year",
            ColumnData::Int(rows.iter().map(|((_, y, _, _), _)| *y).collect()),
        ),
        (
            "call_type_desc",
            ColumnData::Str(rows.iter().map(|((_, _, d, _), _)| d.clone()).collect()),
        ),
        (
            "priority",
            ColumnData::Int(rows.iter().map(|((_, _, _, p), _)| *p).collect()),
        ),
        (
            "total_calls",
            ColumnData::Long(rows.iter().map(|(_, n)| Some(*n)).collect()),
        ),
    ]
}

pub fn cfs_by_beat(rows: &[ServiceCall]) -> Vec<(&'static str, ColumnData)> {
    type Key = (String, i32, Option<String>, Option<i32>, Option<String>);
    let mut map: BTreeMap<Key, i64> = BTreeMap::new();
    for r in rows {
        if let (Some(beat), Some(year)) = (&r.beat, r.year) {
            *map.entry((
                beat.clone(),
                year,
                r.call_type_desc.clone(),
                r.priority,
                r.disposition.clone(),
            ))
            .or_default() += 1;
        }
    }
    let rows = sorted_count_desc(map);
    vec![
        (
            "beat",
            ColumnData::Str(rows.iter().map(|((b, _, _, _, _), _)| Some(b.clone())).collect()),
        ),
        (
            "year",
            ColumnData::Int(rows.iter().map(|((_, y, _, _, _), _)| Some(*y)).collect()),
        ),
        (
            "call_type_desc",
            ColumnData::Str(rows.iter().map(|((_, _, d, _, _), _)| d.clone()).collect()),
        ),
        (
            "priority",
            ColumnData::Int(rows.iter().map(|((_, _, _, p, _), _)| *p).collect()),
        ),
        (
            "disposition",
            ColumnData::Str(rows.iter().map(|((_, _, _, _, d), _)| d.clone()).collect()),
        ),
        (
            "total_calls",
            ColumnData::Long(rows.iter().map(|(_, n)| Some(*n)).collect()),
        ),
    ]
}

pub fn cfs_temporal(rows: &[ServiceCall]) -> Vec<(&'static str, ColumnData)> {
    type Key = (i32, i32, Option<i32>);
    let mut map: BTreeMap<Key, i64> = BTreeMap::new();
    for r in rows {
        if let (Some(dow), Some(hour)) = (r.dow, r.hour) {
            *map.entry((dow, hour, r.priority)).or_default() += 1;
        }
    }
    let rows: Vec<_> = map.into_iter().collect();
    vec![
        (
            "dow",
            ColumnData::Int(rows.iter().map(|((d, _, _), _)| Some(*d)).collect()),
        ),
        (
            "hour",
            ColumnData::Int(rows.iter().map(|((_, h, _), _)| Some(*h)).collect()),
        ),
        (
            "priority",
            ColumnData::Int(rows.iter().map(|((_, _, p), _)| *p).collect()),
        ),
        (
            "total_calls",
            ColumnData::Long(rows.iter().map(|(_, n)| Some(*n)).collect()),
        ),
    ]
}
