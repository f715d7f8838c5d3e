//! Offline end-to-end run over synthetic raw artifacts.
//!
//! Stages 2-4 are exercised directly (canonicalize -> aggregate ->
//! validate) by seeding the raw directory with the same artifact shapes
//! the fetcher produces. No network is touched.

use sd_safety_pipeline::aggregate;
use sd_safety_pipeline::canonical;
use sd_safety_pipeline::config::PipelineConfig;
use sd_safety_pipeline::fetch::{
    FetchedArtifacts, CALL_TYPE_LOOKUP_FILE, DISPO_LOOKUP_FILE, GROUP_A_FILE, GROUP_B_FILE,
};
use sd_safety_pipeline::validate;

use serde_json::json;
use std::fs;
use std::path::PathBuf;

fn seed_artifacts(cfg: &PipelineConfig) -> FetchedArtifacts {
    fs::create_dir_all(&cfg.raw_dir).unwrap();

    let group_a = cfg.raw_dir.join(GROUP_A_FILE);
    fs::write(
        &group_a,
        json!([
            {"incidentuid": "I-1", "incident_date": "2023-02-10T00:00:00.000",
             "agency": "San Diego", "crime_against_category": "Property",
             "cibrs_grouped_offense_description": "Larceny/Theft Offenses",
             "cibrs_offense_description": "Theft From Motor Vehicle",
             "zip_code": "92101", "city": "SAN DIEGO",
             "location": {"type": "Point", "coordinates": [-117.16, 32.72]}},
            // Revision of I-1: same offense, later date, must win dedup.
            {"incidentuid": "I-1", "incident_date": "2023-03-01T00:00:00.000",
             "agency": "San Diego", "crime_against_category": "Property",
             "cibrs_grouped_offense_description": "Larceny/Theft Offenses",
             "cibrs_offense_description": "Theft From Motor Vehicle",
             "zip_code": "92101", "city": "SAN DIEGO"},
            {"incidentuid": "I-2", "incident_date": "2023-02-11T00:00:00.000",
             "agency": "Sheriff - Vista", "crime_against_category": "People",
             "cibrs_grouped_offense_description": "Assault Offenses",
             "cibrs_offense_description": "Simple Assault",
             "domestic_violence_incident": "Y",
             "victim_age": "29", "victim_sex": "F",
             "zip_code": "92084", "city": "VISTA"},
            {"incidentuid": "I-3", "incident_date": "2023-02-12T00:00:00.000",
             "agency": "Chula Vista", "crime_against_category": "Society",
             "cibrs_grouped_offense_description": "Drug/Narcotic Offenses",
             "cibrs_offense_description": "Drug Equipment Violations",
             "city": "CHULA VISTA"}
        ])
        .to_string(),
    )
    .unwrap();

    let group_b = cfg.raw_dir.join(GROUP_B_FILE);
    fs::write(
        &group_b,
        json!([
            {"incident_uid": "B-1", "arrest_date": "2023-02-10T00:00:00.000",
             "arrest_agency": "San Diego", "offense_code": "90D",
             "offense_description": "Driving Under the Influence"},
            {"incident_uid": "B-2", "arrest_date": "2023-02-15T00:00:00.000",
             "arrest_agency": "Oceanside", "offense_code": "90C",
             "offense_description": "Disorderly Conduct"}
        ])
        .to_string(),
    )
    .unwrap();

    let cfs = cfg.raw_dir.join("pd_calls_for_service_2023_datasd.csv");
    fs::write(
        &cfs,
        "INCIDENT_NUM,DATE_TIME,CALL_TYPE,PRIORITY,DISPOSITION,BEAT\n\
         E23000001,2023-02-10 08:15:00,459A,2,K,122\n\
         E23000001,2023-02-10 08:45:00,459A,2,CAN,122\n\
         E23000002,2023-02-10 22:30:00,415,3,K,433\n",
    )
    .unwrap();

    let call_types = cfg.raw_dir.join(CALL_TYPE_LOOKUP_FILE);
    fs::write(
        &call_types,
        "CALL_TYPE,DESCRIPTION\n459A,AUDIBLE BURGLARY ALARM\n415,DISTURBANCE\n",
    )
    .unwrap();

    let dispos = cfg.raw_dir.join(DISPO_LOOKUP_FILE);
    fs::write(&dispos, "DISPO_CODE,DESCRIPTION\nK,REPORT\nCAN,CANCELLED\n").unwrap();

    FetchedArtifacts {
        crime: Some(group_a),
        arrests: Some(group_b),
        cfs: vec![cfs],
        call_type_lookup: Some(call_types),
        dispo_lookup: Some(dispos),
    }
}

#[test]
fn full_offline_run_produces_tables_views_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = PipelineConfig::new(dir.path());
    let artifacts = seed_artifacts(&cfg);

    let tables = canonical::canonicalize_all(&cfg, &artifacts).unwrap();
    assert_eq!(tables.count(), 3);

    let crime = tables.crime.as_ref().unwrap();
    // Four raw rows, I-1 deduplicated to its latest revision.
    assert_eq!(crime.rows.len(), 3);
    assert!(crime.handle.path.exists());
    let i1 = crime
        .rows
        .iter()
        .find(|r| r.incident_uid.as_deref() == Some("I-1"))
        .unwrap();
    assert_eq!(
        i1.incident_date,
        chrono::NaiveDate::from_ymd_opt(2023, 3, 1)
    );

    let calls = tables.calls.as_ref().unwrap();
    assert_eq!(calls.rows.len(), 2);
    let e1 = calls
        .rows
        .iter()
        .find(|r| r.incident_num.as_deref() == Some("E23000001"))
        .unwrap();
    // Later revision survives, lookup applied.
    assert_eq!(e1.disposition.as_deref(), Some("CAN"));
    assert_eq!(e1.dispo_desc.as_deref(), Some("CANCELLED"));
    assert_eq!(e1.call_type_desc.as_deref(), Some("AUDIBLE BURGLARY ALARM"));

    let views = aggregate::aggregate_all(&cfg, &tables).unwrap();
    assert_eq!(views.tables.len(), aggregate::EXPECTED_VIEWS.len());
    for name in aggregate::EXPECTED_VIEWS {
        let handle = views.get(name).unwrap();
        assert!(handle.path.exists(), "{name} not materialized");
    }

    // yearly_summary total equals the deduplicated incident count.
    assert_eq!(views.get("yearly_summary").unwrap().rows, 1);
    // Only I-1 carries coordinates inside the county box.
    assert_eq!(views.get("map_points").unwrap().rows, 1);

    let report = validate::validate(&cfg, &tables, &views);
    // Small synthetic run: every file exists, the quality checks hold,
    // only the row-count and coverage floors warn.
    assert!(report
        .checks
        .iter()
        .all(|c| c.status != validate::CheckStatus::Fail));
    assert!(report
        .checks
        .iter()
        .any(|c| c.name == "crime_rows" && c.status == validate::CheckStatus::Warn));
}

#[test]
fn missing_domains_are_contained() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = PipelineConfig::new(dir.path());
    let full = seed_artifacts(&cfg);

    // Crime only: arrests and calls tracks skip, crime still lands.
    let artifacts = FetchedArtifacts {
        crime: full.crime.clone(),
        arrests: None,
        cfs: Vec::new(),
        call_type_lookup: None,
        dispo_lookup: None,
    };
    let tables = canonical::canonicalize_all(&cfg, &artifacts).unwrap();
    assert!(tables.crime.is_some());
    assert!(tables.arrests.is_none());
    assert!(tables.calls.is_none());

    let views = aggregate::aggregate_all(&cfg, &tables).unwrap();
    assert_eq!(views.tables.len(), 10);
    assert!(views.get("cfs_monthly").is_none());

    let report = validate::validate(&cfg, &tables, &views);
    // Missing canonical tables and their views fail; crime checks run.
    assert!(report.issues() > 0);
    assert!(report
        .checks
        .iter()
        .any(|c| c.name == "duplicates" && c.status == validate::CheckStatus::Pass));
}

#[test]
fn rerun_overwrites_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = PipelineConfig::new(dir.path());
    let artifacts = seed_artifacts(&cfg);

    let first = canonical::canonicalize_all(&cfg, &artifacts).unwrap();
    let first_rows = first.crime.as_ref().unwrap().rows.len();
    aggregate::aggregate_all(&cfg, &first).unwrap();

    let second = canonical::canonicalize_all(&cfg, &artifacts).unwrap();
    assert_eq!(second.crime.as_ref().unwrap().rows.len(), first_rows);
    let views = aggregate::aggregate_all(&cfg, &second).unwrap();
    assert_eq!(views.tables.len(), aggregate::EXPECTED_VIEWS.len());

    // No temp files left behind anywhere.
    let leftovers: Vec<PathBuf> = walk(&dir.path().to_path_buf())
        .into_iter()
        .filter(|p| {
            p.extension()
                .map(|e| e.to_string_lossy().ends_with("tmp"))
                .unwrap_or(false)
        })
        .collect();
    assert!(leftovers.is_empty(), "stray temp files: {leftovers:?}");
}

fn walk(dir: &PathBuf) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                out.extend(walk(&path));
            } else {
                out.push(path);
            }
        }
    }
    out
}
