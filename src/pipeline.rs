//! End-to-end pipeline driver.
//!
//! Four stages run strictly in order, each consuming the typed handle
//! the previous stage produced. A domain that fails inside a stage is
//! dropped from everything downstream rather than aborting the run;
//! only a stage that cannot produce its handle at all is fatal.

use crate::aggregate::{self, AggregatedViews};
use crate::canonical::{self, CanonicalTables};
use crate::config::PipelineConfig;
use crate::fetch::{self, FetchedArtifacts};
use crate::validate::{self, ValidationReport};
use anyhow::Result;
use tracing::info;

pub struct PipelineRun {
    pub artifacts: FetchedArtifacts,
    pub tables: CanonicalTables,
    pub views: AggregatedViews,
    pub report: ValidationReport,
}

/// Run fetch -> canonicalize -> aggregate -> validate.
pub async fn run(cfg: &PipelineConfig, force: bool) -> Result<PipelineRun> {
    info!("stage 1/4: fetch");
    let artifacts = fetch::fetch_all(cfg, force).await?;
    info!("fetch done: {} artifacts", artifacts.count());

    info!("stage 2/4: canonicalize");
    let tables = canonical::canonicalize_all(cfg, &artifacts)?;
    info!("canonicalize done: {} tables", tables.count());

    info!("stage 3/4: aggregate");
    let views = aggregate::aggregate_all(cfg, &tables)?;
    info!("aggregate done: {} views", views.tables.len());

    info!("stage 4/4: validate");
    let report = validate::validate(cfg, &tables, &views);
    info!("validate done: {} issues", report.issues());

    Ok(PipelineRun {
        artifacts,
        tables,
        views,
        report,
    })
}
