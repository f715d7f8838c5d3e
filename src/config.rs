//! Pipeline configuration.
//!
//! One `PipelineConfig` is built at process start and passed into each
//! stage; nothing reads ambient globals. Validator thresholds are tuned to
//! the current dataset scale and carried here as plain fields so they can
//! be adjusted without touching check logic.

use chrono::{Datelike, Utc};
use std::path::{Path, PathBuf};

/// County bounding box for geolocated crime rows.
#[derive(Debug, Clone, Copy)]
pub struct GeoBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

impl GeoBounds {
    /// San Diego county.
    pub fn san_diego() -> Self {
        Self {
            lat_min: 32.5,
            lat_max: 33.3,
            lng_min: -117.7,
            lng_max: -116.8,
        }
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max && lng >= self.lng_min && lng <= self.lng_max
    }
}

/// Data-quality thresholds used by the validator.
#[derive(Debug, Clone)]
pub struct ValidationThresholds {
    pub crime_min_rows: u64,
    pub arrests_min_rows: u64,
    pub cfs_min_rows: u64,
    /// Earliest year the crime table must reach back to.
    pub crime_earliest_year: i32,
    /// Earliest year the calls table must reach back to.
    pub cfs_earliest_year: i32,
    /// Max share of geolocated rows outside the county box, percent.
    pub geo_outlier_max_pct: f64,
    /// Max null rate on critical crime columns, percent.
    pub null_rate_max_pct: f64,
    /// Max absolute year-over-year volume change, percent.
    pub yoy_change_max_pct: f64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            crime_min_rows: 500_000,
            arrests_min_rows: 40_000,
            cfs_min_rows: 3_000_000,
            crime_earliest_year: 2021,
            cfs_earliest_year: 2015,
            geo_outlier_max_pct: 1.0,
            null_rate_max_pct: 5.0,
            yoy_change_max_pct: 50.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub aggregated_dir: PathBuf,

    pub soda_base: String,
    pub group_a_id: String,
    pub group_b_id: String,
    pub soda_page_size: usize,
    /// Group B server-side filter: only these offense codes
    /// (DUI, disorderly, trespass, vagrancy; the catch-all is excluded).
    pub group_b_codes: Vec<String>,

    pub cfs_base: String,
    pub cfs_dispo_base: String,
    pub cfs_start_year: i32,
    pub current_year: i32,

    pub bounds: GeoBounds,
    pub thresholds: ValidationThresholds,
}

impl PipelineConfig {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            raw_dir: data_dir.join("raw"),
            processed_dir: data_dir.join("processed"),
            aggregated_dir: data_dir.join("aggregated"),
            soda_base: "https://opendata.sandag.org/resource".to_string(),
            group_a_id: "7sps-5pd9".to_string(),
            group_b_id: "huzf-mi2z".to_string(),
            soda_page_size: 50_000,
            group_b_codes: ["90D", "90C", "90B", "90E"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cfs_base: "https://seshat.datasd.org/police_calls_for_service".to_string(),
            cfs_dispo_base: "https://seshat.datasd.org/pd".to_string(),
            cfs_start_year: 2015,
            current_year: Utc::now().year(),
            bounds: GeoBounds::san_diego(),
            thresholds: ValidationThresholds::default(),
        }
    }

    pub fn cfs_years(&self) -> std::ops::RangeInclusive<i32> {
        self.cfs_start_year..=self.current_year
    }
}
