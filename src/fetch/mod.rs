//! Source Fetcher: remote datasets into the raw-artifact cache.
//!
//! Raw artifacts are immutable once written and persist across runs; a
//! cached artifact is only re-fetched on `--force`. All cache writes go
//! through a temp file and a rename, so a crash mid-download can never be
//! mistaken for a valid artifact on the next run. Failures are contained
//! per artifact: a dead source leaves its slot empty and the sibling
//! domain tracks keep going.

pub mod soda;
pub mod stream;

use crate::config::PipelineConfig;
use crate::query::PredicateBuilder;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub use soda::SodaClient;
pub use stream::fetch_stream;

/// Raw artifact file names inside the cache directory.
pub const GROUP_A_FILE: &str = "cibrs_group_a.json";
pub const GROUP_B_FILE: &str = "cibrs_group_b.json";
pub const CALL_TYPE_LOOKUP_FILE: &str = "call_type_desc.csv";
pub const DISPO_LOOKUP_FILE: &str = "dispo_code_desc.csv";

/// Typed handle to the fetch stage's output, consumed by the
/// canonicalizer. `None`/missing entries mean the artifact could not be
/// produced this run and its domain track is skipped downstream.
#[derive(Debug, Default)]
pub struct FetchedArtifacts {
    pub crime: Option<PathBuf>,
    pub arrests: Option<PathBuf>,
    pub cfs: Vec<PathBuf>,
    pub call_type_lookup: Option<PathBuf>,
    pub dispo_lookup: Option<PathBuf>,
}

impl FetchedArtifacts {
    pub fn count(&self) -> usize {
        self.crime.iter().count()
            + self.arrests.iter().count()
            + self.cfs.len()
            + self.call_type_lookup.iter().count()
            + self.dispo_lookup.iter().count()
    }
}

/// Atomically place `bytes` at `path` (temp file + rename).
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating cache dir {}", parent.display()))?;
    }
    let tmp = path.with_extension("download.tmp");
    fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("moving {} into place", path.display()))?;
    Ok(())
}

/// Fetch every source sequentially. Per-artifact failures are logged and
/// leave the corresponding slot empty; they never abort the whole stage.
pub async fn fetch_all(cfg: &PipelineConfig, force: bool) -> Result<FetchedArtifacts> {
    let soda = SodaClient::new()?;
    let mut out = FetchedArtifacts::default();

    // Group A: CIBRS incidents, full dataset.
    info!("CIBRS Group A (incidents)");
    let group_a_path = cfg.raw_dir.join(GROUP_A_FILE);
    match soda
        .fetch_paginated(
            &cfg.soda_base,
            &cfg.group_a_id,
            &group_a_path,
            None,
            cfg.soda_page_size,
            force,
        )
        .await
    {
        Ok(path) => out.crime = Some(path),
        Err(e) => error!("group A fetch failed, crime track unavailable: {e:#}"),
    }

    // Group B: CIBRS arrests, server-side filtered to the tracked offense
    // codes. The filter is rendered by the predicate builder, which owns
    // quoting.
    info!("CIBRS Group B (arrests)");
    let codes: Vec<&str> = cfg.group_b_codes.iter().map(String::as_str).collect();
    let where_clause = PredicateBuilder::new()
        .one_of("offense_code", &codes)
        .condition();
    let group_b_path = cfg.raw_dir.join(GROUP_B_FILE);
    match soda
        .fetch_paginated(
            &cfg.soda_base,
            &cfg.group_b_id,
            &group_b_path,
            Some(&where_clause),
            cfg.soda_page_size,
            force,
        )
        .await
    {
        Ok(path) => out.arrests = Some(path),
        Err(e) => error!("group B fetch failed, arrests track unavailable: {e:#}"),
    }

    // Calls for service: one static CSV per year. Future years come back
    // 403 until published; that is an expected absence, not an error.
    info!("Calls for service CSVs");
    let client = stream::download_client()?;
    for year in cfg.cfs_years() {
        let url = format!("{}/pd_calls_for_service_{year}_datasd.csv", cfg.cfs_base);
        let path = cfg.raw_dir.join(format!("cfs_{year}.csv"));
        match fetch_stream(&client, &url, &path, force).await {
            Ok(Some(path)) => out.cfs.push(path),
            Ok(None) => info!("cfs {year}: not yet published, skipped"),
            Err(e) => error!("cfs {year} fetch failed, year omitted: {e:#}"),
        }
    }

    // Reference lookups are best-effort; canonicalization falls back to
    // raw codes when either is missing.
    info!("Reference lookups");
    let call_type_url = format!("{}/pd_cfs_calltypes_datasd.csv", cfg.cfs_base);
    let call_type_path = cfg.raw_dir.join(CALL_TYPE_LOOKUP_FILE);
    match fetch_stream(&client, &call_type_url, &call_type_path, force).await {
        Ok(Some(path)) => out.call_type_lookup = Some(path),
        Ok(None) => warn!("call type lookup not available"),
        Err(e) => warn!("call type lookup fetch failed: {e:#}"),
    }
    let dispo_url = format!("{}/pd_dispo_codes_datasd.csv", cfg.cfs_dispo_base);
    let dispo_path = cfg.raw_dir.join(DISPO_LOOKUP_FILE);
    match fetch_stream(&client, &dispo_url, &dispo_path, force).await {
        Ok(Some(path)) => out.dispo_lookup = Some(path),
        Ok(None) => warn!("disposition lookup not available"),
        Err(e) => warn!("disposition lookup fetch failed: {e:#}"),
    }

    info!("{} artifacts ready", out.count());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.json");
        atomic_write(&path, b"[]").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"[]");
        assert!(!path.with_extension("download.tmp").exists());
    }

    #[test]
    fn artifact_count_ignores_empty_slots() {
        let mut arts = FetchedArtifacts::default();
        assert_eq!(arts.count(), 0);
        arts.crime = Some(PathBuf::from("/x/cibrs_group_a.json"));
        arts.cfs.push(PathBuf::from("/x/cfs_2020.csv"));
        assert_eq!(arts.count(), 2);
    }
}
