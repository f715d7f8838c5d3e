//! Canonicalizer: raw artifacts -> per-domain canonical tables.
//!
//! Each domain track loads its raw artifacts, coerces fields
//! best-effort, derives calendar and geographic fields, normalizes
//! agency identity, deduplicates by natural key, and overwrites one
//! Parquet table. A missing raw artifact skips that track (and
//! everything downstream of it) without aborting the siblings.

pub mod agency;
pub mod arrests;
pub mod calls;
pub mod coerce;
pub mod crime;
pub mod dedup;
pub mod lookup;

use crate::config::PipelineConfig;
use crate::fetch::FetchedArtifacts;
use crate::table::{write_table, TableHandle};
use anyhow::Result;
use lookup::CodeLookup;
use tracing::{error, info, warn};

pub use arrests::ArrestRecord;
pub use calls::ServiceCall;
pub use crime::CrimeIncident;

pub const CRIME_TABLE: &str = "crime.parquet";
pub const ARRESTS_TABLE: &str = "arrests.parquet";
pub const CFS_TABLE: &str = "cfs.parquet";

/// One materialized canonical table plus its in-memory rows, handed to
/// the aggregator and validator as read-only input.
pub struct DomainTable<T> {
    pub rows: Vec<T>,
    pub handle: TableHandle,
}

/// Typed handle to the canonicalize stage's output. `None` means the
/// domain was skipped this run.
#[derive(Default)]
pub struct CanonicalTables {
    pub crime: Option<DomainTable<CrimeIncident>>,
    pub arrests: Option<DomainTable<ArrestRecord>>,
    pub calls: Option<DomainTable<ServiceCall>>,
}

impl CanonicalTables {
    pub fn count(&self) -> usize {
        self.crime.iter().count() + self.arrests.iter().count() + self.calls.iter().count()
    }
}

/// Run all three domain tracks. Per-track failures are contained: they
/// log and leave that table empty while the other tracks proceed.
pub fn canonicalize_all(
    cfg: &PipelineConfig,
    artifacts: &FetchedArtifacts,
) -> Result<CanonicalTables> {
    let mut out = CanonicalTables::default();

    info!("track 1: CIBRS group A -> {CRIME_TABLE}");
    match &artifacts.crime {
        Some(raw) => match crime::load(raw)
            .and_then(|rows| {
                let handle =
                    write_table(&cfg.processed_dir.join(CRIME_TABLE), crime::columns(&rows))?;
                Ok(DomainTable { rows, handle })
            }) {
            Ok(table) => out.crime = Some(table),
            Err(e) => error!("crime track failed, skipped: {e:#}"),
        },
        None => warn!("no group A artifact, crime track skipped"),
    }

    info!("track 2: CIBRS group B -> {ARRESTS_TABLE}");
    match &artifacts.arrests {
        Some(raw) => match arrests::load(raw)
            .and_then(|rows| {
                let handle = write_table(
                    &cfg.processed_dir.join(ARRESTS_TABLE),
                    arrests::columns(&rows),
                )?;
                Ok(DomainTable { rows, handle })
            }) {
            Ok(table) => out.arrests = Some(table),
            Err(e) => error!("arrests track failed, skipped: {e:#}"),
        },
        None => warn!("no group B artifact, arrests track skipped"),
    }

    info!("track 3: CFS -> {CFS_TABLE}");
    if artifacts.cfs.is_empty() {
        warn!("no CFS CSV artifacts, calls track skipped");
    } else {
        let call_type_lookup = CodeLookup::load(
            artifacts.call_type_lookup.as_deref(),
            "CALL_TYPE",
            "DESCRIPTION",
        );
        let dispo_lookup =
            CodeLookup::load(artifacts.dispo_lookup.as_deref(), "DISPO_CODE", "DESCRIPTION");
        match calls::load(&artifacts.cfs, call_type_lookup.as_ref(), dispo_lookup.as_ref())
            .and_then(|rows| {
                let handle =
                    write_table(&cfg.processed_dir.join(CFS_TABLE), calls::columns(&rows))?;
                Ok(DomainTable { rows, handle })
            }) {
            Ok(table) => out.calls = Some(table),
            Err(e) => error!("calls track failed, skipped: {e:#}"),
        }
    }

    info!("{} canonical tables materialized", out.count());
    Ok(out)
}
