//! San Diego public-safety data pipeline.
//!
//! Batch ETL over three county open-data sources: CIBRS crime
//! incidents, CIBRS Group B arrests, and SDPD calls for service.
//! Raw artifacts are fetched with caching, canonicalized into typed
//! Parquet tables, rolled up into a fixed set of aggregation views,
//! and checked by a data-quality battery.

pub mod aggregate;
pub mod canonical;
pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod query;
pub mod table;
pub mod validate;
