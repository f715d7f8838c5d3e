//! Aggregator: canonical tables -> fixed set of Parquet rollups.
//!
//! The set of views and their shapes never varies at runtime; what
//! varies is which get built, since a view whose source table was
//! skipped this run is skipped with it. Each view is recomputed from
//! scratch and atomically overwritten, so the aggregated directory is
//! always a pure function of the canonical tables.

pub mod views;

use crate::canonical::CanonicalTables;
use crate::config::PipelineConfig;
use crate::table::{write_table, ColumnData, TableHandle};
use anyhow::Result;
use tracing::{error, info, warn};

/// Every view the pipeline is expected to produce, in build order.
pub const EXPECTED_VIEWS: [&str; 14] = [
    "crime_overview_monthly",
    "crime_by_type",
    "crime_by_zip",
    "crime_by_agency",
    "victim_demographics",
    "domestic_violence",
    "temporal_patterns",
    "map_points",
    "yearly_summary",
    "crime_by_city",
    "arrests_by_type",
    "cfs_monthly",
    "cfs_by_beat",
    "cfs_temporal",
];

/// Typed handle to the aggregate stage's output.
#[derive(Default)]
pub struct AggregatedViews {
    pub tables: Vec<TableHandle>,
}

impl AggregatedViews {
    pub fn get(&self, name: &str) -> Option<&TableHandle> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Build every view whose source table is present. A single view
/// failing to write is logged and skipped; the rest still build.
pub fn aggregate_all(cfg: &PipelineConfig, tables: &CanonicalTables) -> Result<AggregatedViews> {
    let mut out = AggregatedViews::default();
    let mut emit = |name: &'static str, columns: Vec<(&'static str, ColumnData)>| {
        let path = cfg.aggregated_dir.join(format!("{name}.parquet"));
        match write_table(&path, columns) {
            Ok(handle) => {
                info!("view {name}: {} rows", handle.rows);
                out.tables.push(handle);
            }
            Err(e) => error!("view {name} failed, skipped: {e:#}"),
        }
    };

    match &tables.crime {
        Some(crime) => {
            let rows = &crime.rows;
            emit("crime_overview_monthly", views::crime_overview_monthly(rows));
            emit("crime_by_type", views::crime_by_type(rows));
            emit("crime_by_zip", views::crime_by_zip(rows));
            emit("crime_by_agency", views::crime_by_agency(rows));
            emit("victim_demographics", views::victim_demographics(rows));
            emit("domestic_violence", views::domestic_violence(rows));
            emit("temporal_patterns", views::temporal_patterns(rows));
            emit("map_points", views::map_points(rows, &cfg.bounds));
            emit("yearly_summary", views::yearly_summary(rows));
            emit("crime_by_city", views::crime_by_city(rows));
        }
        None => warn!("crime table absent, 10 crime views skipped"),
    }

    match &tables.arrests {
        Some(arrests) => emit("arrests_by_type", views::arrests_by_type(&arrests.rows)),
        None => warn!("arrests table absent, arrests_by_type skipped"),
    }

    match &tables.calls {
        Some(calls) => {
            let rows = &calls.rows;
            emit("cfs_monthly", views::cfs_monthly(rows));
            emit("cfs_by_beat", views::cfs_by_beat(rows));
            emit("cfs_temporal", views::cfs_temporal(rows));
        }
        None => warn!("calls table absent, 3 CFS views skipped"),
    }

    info!(
        "{}/{} views materialized",
        out.tables.len(),
        EXPECTED_VIEWS.len()
    );
    Ok(out)
}
