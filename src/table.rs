//! Columnar table materialization.
//!
//! Every canonical and aggregated table is written as one ZSTD-compressed
//! Parquet file. Writes go to a sibling temp path and are renamed into
//! place so a crash mid-write can never leave a partial file under an
//! expected output name.

use anyhow::{Context, Result};
use arrow_array::{
    ArrayRef, BooleanArray, Date32Array, Float64Array, Int32Array, Int64Array, RecordBatch,
    StringArray, TimestampMicrosecondArray,
};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use chrono::{NaiveDate, NaiveDateTime};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// One column of a table, nullable throughout.
pub enum ColumnData {
    Str(Vec<Option<String>>),
    Int(Vec<Option<i32>>),
    Long(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Date(Vec<Option<NaiveDate>>),
    Timestamp(Vec<Option<NaiveDateTime>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            Self::Str(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::Date(v) => v.len(),
            Self::Timestamp(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn data_type(&self) -> DataType {
        match self {
            Self::Str(_) => DataType::Utf8,
            Self::Int(_) => DataType::Int32,
            Self::Long(_) => DataType::Int64,
            Self::Float(_) => DataType::Float64,
            Self::Bool(_) => DataType::Boolean,
            Self::Date(_) => DataType::Date32,
            Self::Timestamp(_) => DataType::Timestamp(TimeUnit::Microsecond, None),
        }
    }

    fn into_array(self) -> ArrayRef {
        match self {
            Self::Str(v) => Arc::new(StringArray::from(v)),
            Self::Int(v) => Arc::new(Int32Array::from(v)),
            Self::Long(v) => Arc::new(Int64Array::from(v)),
            Self::Float(v) => Arc::new(Float64Array::from(v)),
            Self::Bool(v) => Arc::new(BooleanArray::from(v)),
            Self::Date(v) => {
                let days: Vec<Option<i32>> = v.into_iter().map(|d| d.map(date_to_days)).collect();
                Arc::new(Date32Array::from(days))
            }
            Self::Timestamp(v) => {
                let micros: Vec<Option<i64>> = v
                    .into_iter()
                    .map(|t| t.map(|t| t.and_utc().timestamp_micros()))
                    .collect();
                Arc::new(TimestampMicrosecondArray::from(micros))
            }
        }
    }
}

fn date_to_days(d: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    d.signed_duration_since(epoch).num_days() as i32
}

/// A materialized table: where it lives and how many rows it holds.
#[derive(Debug, Clone)]
pub struct TableHandle {
    pub name: String,
    pub path: PathBuf,
    pub rows: usize,
}

impl TableHandle {
    pub fn size_bytes(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }
}

/// Write a full table to `path` atomically. All columns must share a length.
pub fn write_table(path: &Path, columns: Vec<(&str, ColumnData)>) -> Result<TableHandle> {
    let rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
    for (name, col) in &columns {
        anyhow::ensure!(
            col.len() == rows,
            "column {} has {} rows, expected {}",
            name,
            col.len(),
            rows
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output dir {}", parent.display()))?;
    }

    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, col)| Field::new(*name, col.data_type(), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    let arrays: Vec<ArrayRef> = columns.into_iter().map(|(_, col)| col.into_array()).collect();
    let batch = RecordBatch::try_new(schema.clone(), arrays)
        .with_context(|| format!("assembling record batch for {}", path.display()))?;

    let tmp = path.with_extension("parquet.tmp");
    {
        let file = File::create(&tmp)
            .with_context(|| format!("creating temp file {}", tmp.display()))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(ZstdLevel::default()))
            .build();
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))
            .context("opening parquet writer")?;
        writer.write(&batch).context("writing record batch")?;
        writer.close().context("finalizing parquet file")?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("moving {} into place", path.display()))?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    debug!("wrote {}: {} rows", path.display(), rows);

    Ok(TableHandle {
        name,
        path: path.to_path_buf(),
        rows,
    })
}
